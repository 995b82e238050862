//! No mapper: 32KB of ROM and optionally 8KB of RAM, no banking.
//!
//! Control writes are ignored and RAM has no enable gate.

use super::{BankRegisters, RamTarget};
use emu_core::logging::{log, LogCategory, LogLevel};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mbc0;

impl Mbc0 {
    pub fn write_control(&self, _regs: &mut BankRegisters, addr: u16, val: u8) {
        log(LogCategory::Stubs, LogLevel::Trace, || {
            format!("ROM: ignored write 0x{:02X} to 0x{:04X}", val, addr)
        });
    }

    pub fn rom_bank(&self, _regs: &BankRegisters) -> usize {
        1
    }

    pub fn ram_target(&self, _regs: &BankRegisters) -> RamTarget {
        RamTarget::Bank(0)
    }
}
