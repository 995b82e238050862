//! MBC5 (Memory Bank Controller 5)
//!
//! Supports up to 8MB ROM and 128KB RAM. Unlike the earlier controllers,
//! ROM bank 0 can be mapped at 0x4000-0x7FFF.
//!
//! # Register Map
//!
//! - 0x0000-0x1FFF: RAM Enable (write 0x0A to enable)
//! - 0x2000-0x2FFF: ROM Bank Number (lower 8 bits)
//! - 0x3000-0x3FFF: ROM Bank Number (bit 8)
//! - 0x4000-0x5FFF: RAM Bank Number (4 bits)
//!
//! On rumble cartridges bit 3 of the RAM bank register drives the motor.

use super::{ram_enable_value, BankRegisters, RamTarget};
use emu_core::logging::{log, LogCategory, LogLevel};

const RUMBLE_MOTOR: u8 = 0x08;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mbc5 {
    rumble: bool,
}

impl Mbc5 {
    pub fn new(rumble: bool) -> Self {
        Self { rumble }
    }

    pub fn write_control(&self, regs: &mut BankRegisters, addr: u16, val: u8) {
        match addr {
            0x0000..=0x1FFF => regs.ram_enable = ram_enable_value(val),
            0x2000..=0x2FFF => regs.rom_bank = (regs.rom_bank & 0x100) | val as u16,
            0x3000..=0x3FFF => {
                regs.rom_bank = (regs.rom_bank & 0xFF) | (((val & 0x01) as u16) << 8)
            }
            0x4000..=0x5FFF => {
                if self.rumble {
                    log(LogCategory::Cart, LogLevel::Trace, || {
                        format!(
                            "MBC5: rumble motor {}",
                            if val & RUMBLE_MOTOR != 0 { "on" } else { "off" }
                        )
                    });
                    regs.ram_bank = val & 0x07;
                } else {
                    regs.ram_bank = val & 0x0F;
                }
            }
            _ => {}
        }
    }

    pub fn rom_bank(&self, regs: &BankRegisters) -> usize {
        regs.rom_bank as usize
    }

    pub fn ram_target(&self, regs: &BankRegisters) -> RamTarget {
        if regs.ram_enable {
            RamTarget::Bank(regs.ram_bank as usize)
        } else {
            RamTarget::OpenBus
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mbc5_9bit_rom_bank() {
        let mbc = Mbc5::new(false);
        let mut regs = BankRegisters::power_on();

        mbc.write_control(&mut regs, 0x2000, 0x34);
        mbc.write_control(&mut regs, 0x3000, 0x01);
        assert_eq!(mbc.rom_bank(&regs), 0x134);

        // Low byte write keeps bit 8
        mbc.write_control(&mut regs, 0x2FFF, 0x02);
        assert_eq!(mbc.rom_bank(&regs), 0x102);

        mbc.write_control(&mut regs, 0x3FFF, 0xFE);
        assert_eq!(mbc.rom_bank(&regs), 0x02);
    }

    #[test]
    fn test_mbc5_bank_zero_selectable() {
        let mbc = Mbc5::new(false);
        let mut regs = BankRegisters::power_on();
        mbc.write_control(&mut regs, 0x2000, 0x00);
        assert_eq!(mbc.rom_bank(&regs), 0);
    }

    #[test]
    fn test_mbc5_ram_bank() {
        let mbc = Mbc5::new(false);
        let mut regs = BankRegisters::power_on();
        mbc.write_control(&mut regs, 0x0000, 0x0A);
        mbc.write_control(&mut regs, 0x4000, 0xFF);
        assert_eq!(mbc.ram_target(&regs), RamTarget::Bank(0x0F));
    }

    #[test]
    fn test_mbc5_rumble_masks_motor_bit() {
        let mbc = Mbc5::new(true);
        let mut regs = BankRegisters::power_on();
        mbc.write_control(&mut regs, 0x0000, 0x0A);
        mbc.write_control(&mut regs, 0x4000, RUMBLE_MOTOR | 0x02);
        assert_eq!(mbc.ram_target(&regs), RamTarget::Bank(2));
    }
}
