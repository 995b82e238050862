//! MBC3 Real-Time Clock
//!
//! The clock keeps live counters that follow the host clock and a latched
//! copy that the CPU reads. The latched copy only changes when the game
//! writes 0x00 then 0x01 to the latch register (0x6000-0x7FFF).
//!
//! # RTC Registers
//!
//! Selected by writing 0x08-0x0C to the RAM bank register (0x4000-0x5FFF):
//!
//! - 0x08: Seconds (0-59)
//! - 0x09: Minutes (0-59)
//! - 0x0A: Hours (0-23)
//! - 0x0B: Days (lower 8 bits)
//! - 0x0C: Days (bit 0 = day bit 8, bit 6 = halt, bit 7 = day carry)
//!
//! Time is accounted in whole seconds. The live counters are brought up to
//! date lazily, whenever they are latched or written.

use emu_core::backend::ClockBackend;
use emu_core::logging::{log, LogCategory, LogLevel};
use serde::{Deserialize, Serialize};

const DAY_HIGH_DAY8: u8 = 0x01;
const DAY_HIGH_HALT: u8 = 0x40;
const DAY_HIGH_CARRY: u8 = 0x80;

const MAX_DAYS: u64 = 0x1FF;

/// One of the five clock registers mapped into the RAM bank space
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RtcRegister {
    Seconds,
    Minutes,
    Hours,
    DayLow,
    DayHigh,
}

impl RtcRegister {
    /// Register selected by a RAM bank number, if it is one of the clock slots
    pub fn from_bank(bank: u8) -> Option<Self> {
        match bank {
            0x08 => Some(RtcRegister::Seconds),
            0x09 => Some(RtcRegister::Minutes),
            0x0A => Some(RtcRegister::Hours),
            0x0B => Some(RtcRegister::DayLow),
            0x0C => Some(RtcRegister::DayHigh),
            _ => None,
        }
    }

    /// Bits that exist in hardware
    pub fn mask(self) -> u8 {
        match self {
            RtcRegister::Seconds | RtcRegister::Minutes => 0x3F,
            RtcRegister::Hours => 0x1F,
            RtcRegister::DayLow => 0xFF,
            RtcRegister::DayHigh => DAY_HIGH_CARRY | DAY_HIGH_HALT | DAY_HIGH_DAY8,
        }
    }
}

/// Clock counters in their register encoding
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RtcRegisters {
    pub seconds: u8,
    pub minutes: u8,
    pub hours: u8,
    pub day_low: u8,
    pub day_high: u8,
}

impl RtcRegisters {
    /// 9-bit day counter
    pub fn days(&self) -> u16 {
        (((self.day_high & DAY_HIGH_DAY8) as u16) << 8) | self.day_low as u16
    }

    pub fn halted(&self) -> bool {
        self.day_high & DAY_HIGH_HALT != 0
    }

    pub fn carry(&self) -> bool {
        self.day_high & DAY_HIGH_CARRY != 0
    }

    pub fn get(&self, reg: RtcRegister) -> u8 {
        match reg {
            RtcRegister::Seconds => self.seconds,
            RtcRegister::Minutes => self.minutes,
            RtcRegister::Hours => self.hours,
            RtcRegister::DayLow => self.day_low,
            RtcRegister::DayHigh => self.day_high,
        }
    }

    fn set(&mut self, reg: RtcRegister, value: u8) {
        let value = value & reg.mask();
        match reg {
            RtcRegister::Seconds => self.seconds = value,
            RtcRegister::Minutes => self.minutes = value,
            RtcRegister::Hours => self.hours = value,
            RtcRegister::DayLow => self.day_low = value,
            RtcRegister::DayHigh => self.day_high = value,
        }
    }

    /// Copy with every register reduced to the bits that exist in hardware
    pub fn masked(&self) -> Self {
        Self {
            seconds: self.seconds & RtcRegister::Seconds.mask(),
            minutes: self.minutes & RtcRegister::Minutes.mask(),
            hours: self.hours & RtcRegister::Hours.mask(),
            day_low: self.day_low & RtcRegister::DayLow.mask(),
            day_high: self.day_high & RtcRegister::DayHigh.mask(),
        }
    }

    fn set_days(&mut self, days: u16) {
        self.day_low = days as u8;
        self.day_high = (self.day_high & !DAY_HIGH_DAY8) | ((days >> 8) as u8 & DAY_HIGH_DAY8);
    }

    fn in_range(&self) -> bool {
        self.seconds < 60 && self.minutes < 60 && self.hours < 24
    }

    /// Advance by `seconds`, rolling over 60/60/24 into the 9-bit day counter
    fn advance(&mut self, mut seconds: u64) {
        // Values written out of range count up to their bit width and wrap
        // without carrying, so step those one second at a time.
        while seconds > 0 && !self.in_range() {
            self.tick();
            seconds -= 1;
        }
        if seconds == 0 {
            return;
        }

        let total = self.seconds as u64
            + self.minutes as u64 * 60
            + self.hours as u64 * 3600
            + seconds;
        self.seconds = (total % 60) as u8;
        self.minutes = (total / 60 % 60) as u8;
        self.hours = (total / 3600 % 24) as u8;

        let days = self.days() as u64 + total / 86_400;
        if days > MAX_DAYS {
            self.day_high |= DAY_HIGH_CARRY;
        }
        self.set_days((days % (MAX_DAYS + 1)) as u16);
    }

    fn tick(&mut self) {
        if self.seconds != 59 {
            self.seconds = self.seconds.wrapping_add(1) & 0x3F;
            return;
        }
        self.seconds = 0;

        if self.minutes != 59 {
            self.minutes = self.minutes.wrapping_add(1) & 0x3F;
            return;
        }
        self.minutes = 0;

        if self.hours != 23 {
            self.hours = self.hours.wrapping_add(1) & 0x1F;
            return;
        }
        self.hours = 0;

        let days = self.days();
        if days as u64 >= MAX_DAYS {
            self.set_days(0);
            self.day_high |= DAY_HIGH_CARRY;
        } else {
            self.set_days(days + 1);
        }
    }
}

/// Serializable clock state, without the clock backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RtcSnapshot {
    pub live: RtcRegisters,
    pub latched: RtcRegisters,
    pub latch_state: u8,
    pub last_sync: u64,
}

/// MBC3 real-time clock driven by a borrowed clock backend
pub struct Mbc3Rtc<'c> {
    live: RtcRegisters,
    latched: RtcRegisters,
    latch_state: u8,
    last_sync: u64,
    clock: &'c dyn ClockBackend,
}

impl std::fmt::Debug for Mbc3Rtc<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mbc3Rtc")
            .field("live", &self.live)
            .field("latched", &self.latched)
            .field("latch_state", &self.latch_state)
            .field("last_sync", &self.last_sync)
            .finish_non_exhaustive()
    }
}

impl<'c> Mbc3Rtc<'c> {
    /// Clock starting at 0d 00:00:00, running, synchronised to `clock.now()`
    pub fn new(clock: &'c dyn ClockBackend) -> Self {
        Self {
            live: RtcRegisters::default(),
            latched: RtcRegisters::default(),
            latch_state: 0xFF,
            last_sync: clock.now(),
            clock,
        }
    }

    /// Fold the time elapsed since the last synchronisation into the live counters.
    ///
    /// Time that passes while halted is discarded. A clock that stalls or steps
    /// backwards contributes nothing, and the reference never moves backwards.
    pub fn sync(&mut self) {
        let now = self.clock.now();
        let elapsed = now.saturating_sub(self.last_sync);
        self.last_sync = self.last_sync.max(now);

        if elapsed == 0 || self.live.halted() {
            return;
        }
        self.live.advance(elapsed);
        log(LogCategory::Rtc, LogLevel::Trace, || {
            format!(
                "RTC: +{}s -> day {} {:02}:{:02}:{:02}",
                elapsed,
                self.live.days(),
                self.live.hours,
                self.live.minutes,
                self.live.seconds
            )
        });
    }

    pub fn power_on(&mut self) {
        self.sync();
    }

    /// Write to the latch register; 0x00 followed by 0x01 latches the live counters
    pub fn write_latch(&mut self, value: u8) {
        if self.latch_state == 0x00 && value == 0x01 {
            self.sync();
            self.latched = self.live;
            log(LogCategory::Rtc, LogLevel::Debug, || {
                format!("RTC: latched {:?}", self.latched)
            });
        }
        self.latch_state = value;
    }

    /// Latched value of `reg`
    pub fn read_register(&self, reg: RtcRegister) -> u8 {
        self.latched.get(reg)
    }

    /// Set a live counter directly; elapsed-time accounting restarts from now
    pub fn write_register(&mut self, reg: RtcRegister, value: u8) {
        self.sync();
        self.last_sync = self.clock.now();
        let was_halted = self.live.halted();
        self.live.set(reg, value);
        if was_halted != self.live.halted() {
            log(LogCategory::Rtc, LogLevel::Debug, || {
                format!(
                    "RTC: {}",
                    if self.live.halted() { "halted" } else { "running" }
                )
            });
        }
    }

    pub fn live(&self) -> &RtcRegisters {
        &self.live
    }

    pub fn latched(&self) -> &RtcRegisters {
        &self.latched
    }

    pub fn halted(&self) -> bool {
        self.live.halted()
    }

    pub fn last_sync(&self) -> u64 {
        self.last_sync
    }

    pub fn snapshot(&self) -> RtcSnapshot {
        RtcSnapshot {
            live: self.live,
            latched: self.latched,
            latch_state: self.latch_state,
            last_sync: self.last_sync,
        }
    }

    /// Restore saved counters. Time elapsed since `last_sync` is folded in on the next sync.
    ///
    /// Bits the hardware does not have are dropped.
    pub fn restore(&mut self, snapshot: &RtcSnapshot) {
        self.live = snapshot.live.masked();
        self.latched = snapshot.latched.masked();
        self.latch_state = snapshot.latch_state;
        self.last_sync = snapshot.last_sync;
    }
}
