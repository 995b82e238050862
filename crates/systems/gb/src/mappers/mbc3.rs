//! MBC3 (Memory Bank Controller 3)
//!
//! Used by many Game Boy games, especially those with battery-backed saves.
//! Some cartridges include a Real-Time Clock (RTC), see [`crate::rtc`].
//!
//! Supports up to 2MB ROM and 32KB RAM.
//!
//! # Register Map
//!
//! - 0x0000-0x1FFF: RAM and Timer Enable (write 0x0A to enable)
//! - 0x2000-0x3FFF: ROM Bank Number (7 bits, 0 selects 1)
//! - 0x4000-0x5FFF: RAM Bank Number (0x00-0x03) or RTC Register Select (0x08-0x0C)
//! - 0x6000-0x7FFF: Latch Clock Data (write 0x00 then 0x01 to latch)

use super::{ram_enable_value, BankRegisters, RamTarget};
use crate::rtc::{Mbc3Rtc, RtcRegister};
use emu_core::logging::{log, LogCategory, LogLevel};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mbc3 {
    has_rtc: bool,
}

impl Mbc3 {
    pub fn new(has_rtc: bool) -> Self {
        Self { has_rtc }
    }

    pub fn write_control(
        &self,
        regs: &mut BankRegisters,
        rtc: Option<&mut Mbc3Rtc<'_>>,
        addr: u16,
        val: u8,
    ) {
        match addr {
            0x0000..=0x1FFF => regs.ram_enable = ram_enable_value(val),
            0x2000..=0x3FFF => {
                regs.rom_bank = match val & 0x7F {
                    0 => 1,
                    bank => bank as u16,
                };
            }
            0x4000..=0x5FFF => regs.ram_bank = val & 0x0F,
            0x6000..=0x7FFF => match rtc {
                Some(rtc) => rtc.write_latch(val),
                None => log(LogCategory::Stubs, LogLevel::Trace, || {
                    format!("MBC3: latch write 0x{:02X} without RTC", val)
                }),
            },
            _ => {}
        }
    }

    pub fn rom_bank(&self, regs: &BankRegisters) -> usize {
        regs.rom_bank as usize
    }

    pub fn ram_target(&self, regs: &BankRegisters) -> RamTarget {
        if !regs.ram_enable {
            return RamTarget::OpenBus;
        }
        match regs.ram_bank {
            bank @ 0x00..=0x03 => RamTarget::Bank(bank as usize),
            bank if self.has_rtc => match RtcRegister::from_bank(bank) {
                Some(reg) => RamTarget::Rtc(reg),
                None => RamTarget::OpenBus,
            },
            _ => RamTarget::OpenBus,
        }
    }
}
