//! MBC1 (Memory Bank Controller 1)
//!
//! The most common Game Boy mapper. Supports up to 2MB ROM and 32KB RAM.
//!
//! # Banking Modes
//!
//! The 2-bit register at 0x4000-0x5FFF is routed by the banking mode:
//! - Mode 0: ROM banking mode (default), the value becomes ROM bank bits 5-6
//!   and RAM bank 0 is mapped at 0xA000-0xBFFF
//! - Mode 1: RAM banking mode, the value selects RAM bank 0-3
//!
//! ROM bank 0 always stays at 0x0000-0x3FFF.
//!
//! # Register Map
//!
//! - 0x0000-0x1FFF: RAM Enable (write 0x0A to enable, anything else to disable)
//! - 0x2000-0x3FFF: ROM Bank Number (lower 5 bits, 0 selects 1)
//! - 0x4000-0x5FFF: RAM Bank Number / ROM Bank Number (upper 2 bits)
//! - 0x6000-0x7FFF: Banking Mode Select (0 = ROM banking, 1 = RAM banking)

use super::{ram_enable_value, BankRegisters, RamTarget};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mbc1;

impl Mbc1 {
    pub fn write_control(&self, regs: &mut BankRegisters, addr: u16, val: u8) {
        match addr {
            0x0000..=0x1FFF => regs.ram_enable = ram_enable_value(val),
            0x2000..=0x3FFF => {
                let low = match val & 0x1F {
                    0 => 1,
                    bank => bank as u16,
                };
                regs.rom_bank = (regs.rom_bank & !0x1F) | low;
            }
            0x4000..=0x5FFF => {
                let bits = val & 0x03;
                if regs.mode == 0 {
                    regs.rom_bank = (regs.rom_bank & 0x1F) | ((bits as u16) << 5);
                } else {
                    regs.ram_bank = bits;
                }
            }
            0x6000..=0x7FFF => regs.mode = val & 0x01,
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
        match regs.mode {
            0 => RamTarget::Bank(0),
            _ => RamTarget::Bank(regs.ram_bank as usize),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mbc1_rom_bank_low_bits() {
        let mut regs = BankRegisters::power_on();

        Mbc1.write_control(&mut regs, 0x2000, 5);
        assert_eq!(Mbc1.rom_bank(&regs), 5);

        // Only 5 bits are latched
        Mbc1.write_control(&mut regs, 0x3FFF, 0xE3);
        assert_eq!(Mbc1.rom_bank(&regs), 3);
    }

    #[test]
    fn test_mbc1_bank_zero_selects_one() {
        let mut regs = BankRegisters::power_on();
        Mbc1.write_control(&mut regs, 0x2000, 0);
        assert_eq!(Mbc1.rom_bank(&regs), 1);

        // 0x20 has zero low bits as well
        Mbc1.write_control(&mut regs, 0x2000, 0x20);
        assert_eq!(Mbc1.rom_bank(&regs), 1);
    }

    #[test]
    fn test_mbc1_mode0_upper_rom_bits() {
        let mut regs = BankRegisters::power_on();
        Mbc1.write_control(&mut regs, 0x2000, 0x01);
        Mbc1.write_control(&mut regs, 0x4000, 0x02);

        assert_eq!(Mbc1.rom_bank(&regs), 0x41);
        assert_eq!(regs.ram_bank, 0);

        // Low bits keep the upper bits
        Mbc1.write_control(&mut regs, 0x2000, 0x03);
        assert_eq!(Mbc1.rom_bank(&regs), 0x43);
    }

    #[test]
    fn test_mbc1_mode1_ram_banking() {
        let mut regs = BankRegisters::power_on();
        Mbc1.write_control(&mut regs, 0x0000, 0x0A);
        Mbc1.write_control(&mut regs, 0x6000, 0x01);
        Mbc1.write_control(&mut regs, 0x4000, 0x03);

        assert_eq!(regs.mode, 1);
        assert_eq!(Mbc1.ram_target(&regs), RamTarget::Bank(3));
        assert_eq!(Mbc1.rom_bank(&regs), 1);

        // Back in mode 0 the RAM window falls back to bank 0
        Mbc1.write_control(&mut regs, 0x6000, 0x00);
        assert_eq!(Mbc1.ram_target(&regs), RamTarget::Bank(0));
    }

    #[test]
    fn test_mbc1_ram_enable() {
        let mut regs = BankRegisters::power_on();
        assert_eq!(Mbc1.ram_target(&regs), RamTarget::OpenBus);

        Mbc1.write_control(&mut regs, 0x1234, 0x0A);
        assert!(regs.ram_enable);

        Mbc1.write_control(&mut regs, 0x0000, 0x00);
        assert!(!regs.ram_enable);
        assert_eq!(Mbc1.ram_target(&regs), RamTarget::OpenBus);
    }
}
