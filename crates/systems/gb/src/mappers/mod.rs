//! Game Boy Memory Bank Controllers (MBCs)
//!
//! Each controller decodes writes to 0x0000-0x7FFF into [`BankRegisters`]
//! and decides what the switchable windows are connected to. Moving bytes
//! to and from the storage backends is left to the cartridge.

mod mbc0;
mod mbc1;
mod mbc2;
mod mbc3;
mod mbc5;

pub use mbc0::Mbc0;
pub use mbc1::Mbc1;
pub use mbc2::Mbc2;
pub use mbc3::Mbc3;
pub use mbc5::Mbc5;

use crate::header::{CartKind, Controller};
use crate::rtc::{Mbc3Rtc, RtcRegister};
use serde::{Deserialize, Serialize};

/// Bank switching state shared by every controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankRegisters {
    /// Bank mapped at 0x4000-0x7FFF, before reduction modulo the bank count
    pub rom_bank: u16,
    /// RAM bank (or RTC register on MBC3) mapped at 0xA000-0xBFFF
    pub ram_bank: u8,
    pub ram_enable: bool,
    /// MBC1 banking mode (0 = ROM banking, 1 = RAM banking)
    pub mode: u8,
}

impl BankRegisters {
    pub const fn power_on() -> Self {
        Self {
            rom_bank: 1,
            ram_bank: 0,
            ram_enable: false,
            mode: 0,
        }
    }
}

impl Default for BankRegisters {
    fn default() -> Self {
        Self::power_on()
    }
}

/// What the 0xA000-0xBFFF window is connected to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RamTarget {
    /// Nothing: reads return 0xFF, writes are dropped
    OpenBus,
    /// External RAM bank, before reduction modulo the bank count
    Bank(usize),
    /// MBC2 built-in 512 x 4-bit RAM, mirrored across the window
    HalfBytes,
    /// Latched RTC register
    Rtc(RtcRegister),
}

/// Unified mapper enum that dispatches to specific implementations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mapper {
    RomOnly(Mbc0),
    Mbc1(Mbc1),
    Mbc2(Mbc2),
    Mbc3(Mbc3),
    Mbc5(Mbc5),
}

impl Mapper {
    /// Create the mapper for a decoded cartridge type
    pub fn for_kind(kind: &CartKind) -> Self {
        match kind.controller {
            Controller::RomOnly => Mapper::RomOnly(Mbc0),
            Controller::Mbc1 => Mapper::Mbc1(Mbc1),
            Controller::Mbc2 => Mapper::Mbc2(Mbc2),
            Controller::Mbc3 => Mapper::Mbc3(Mbc3::new(kind.rtc)),
            Controller::Mbc5 => Mapper::Mbc5(Mbc5::new(kind.rumble)),
        }
    }

    /// Handle a write to the control region (0x0000-0x7FFF)
    pub fn write_control(
        &self,
        regs: &mut BankRegisters,
        rtc: Option<&mut Mbc3Rtc<'_>>,
        addr: u16,
        val: u8,
    ) {
        match self {
            Mapper::RomOnly(m) => m.write_control(regs, addr, val),
            Mapper::Mbc1(m) => m.write_control(regs, addr, val),
            Mapper::Mbc2(m) => m.write_control(regs, addr, val),
            Mapper::Mbc3(m) => m.write_control(regs, rtc, addr, val),
            Mapper::Mbc5(m) => m.write_control(regs, addr, val),
        }
    }

    /// ROM bank for the switchable window (0x4000-0x7FFF)
    pub fn rom_bank(&self, regs: &BankRegisters) -> usize {
        match self {
            Mapper::RomOnly(m) => m.rom_bank(regs),
            Mapper::Mbc1(m) => m.rom_bank(regs),
            Mapper::Mbc2(m) => m.rom_bank(regs),
            Mapper::Mbc3(m) => m.rom_bank(regs),
            Mapper::Mbc5(m) => m.rom_bank(regs),
        }
    }

    /// Target of the RAM window (0xA000-0xBFFF)
    pub fn ram_target(&self, regs: &BankRegisters) -> RamTarget {
        match self {
            Mapper::RomOnly(m) => m.ram_target(regs),
            Mapper::Mbc1(m) => m.ram_target(regs),
            Mapper::Mbc2(m) => m.ram_target(regs),
            Mapper::Mbc3(m) => m.ram_target(regs),
            Mapper::Mbc5(m) => m.ram_target(regs),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Mapper::RomOnly(_) => "ROM",
            Mapper::Mbc1(_) => "MBC1",
            Mapper::Mbc2(_) => "MBC2",
            Mapper::Mbc3(_) => "MBC3",
            Mapper::Mbc5(_) => "MBC5",
        }
    }
}

/// 0x0000-0x1FFF on MBC1/3/5: low nibble 0xA enables RAM
fn ram_enable_value(val: u8) -> bool {
    (val & 0x0F) == 0x0A
}
