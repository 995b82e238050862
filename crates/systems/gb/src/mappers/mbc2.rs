//! MBC2 (Memory Bank Controller 2)
//!
//! Supports up to 256KB ROM and has 512 x 4-bit RAM built in.
//!
//! # Register Map
//!
//! - 0x0000-0x3FFF: Address bit 8 picks the register
//!   - bit 8 clear: RAM Enable (write 0x0A to enable)
//!   - bit 8 set: ROM Bank Number (4 bits, 0 selects 1)
//!
//! # RAM
//!
//! Only the lower 4 bits of each byte exist. The 512 half-bytes are mirrored
//! across 0xA000-0xBFFF and the upper nibble reads back as 1s.

use super::{ram_enable_value, BankRegisters, RamTarget};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mbc2;

impl Mbc2 {
    pub fn write_control(&self, regs: &mut BankRegisters, addr: u16, val: u8) {
        if addr > 0x3FFF {
            return;
        }
        if addr & 0x0100 == 0 {
            regs.ram_enable = ram_enable_value(val);
        } else {
            regs.rom_bank = match val & 0x0F {
                0 => 1,
                bank => bank as u16,
            };
        }
    }

    pub fn rom_bank(&self, regs: &BankRegisters) -> usize {
        regs.rom_bank as usize
    }

    pub fn ram_target(&self, regs: &BankRegisters) -> RamTarget {
        if regs.ram_enable {
            RamTarget::HalfBytes
        } else {
            RamTarget::OpenBus
        }
    }
}
