//! Cartridge header (0x0100-0x014F)
//!
//! # Layout
//!
//! - 0x0134-0x0143: Title (upper-case ASCII, NUL padded; 0x0143 doubles as CGB flag)
//! - 0x0143: CGB flag (0x80 = CGB enhanced, 0xC0 = CGB only)
//! - 0x0147: Cartridge type (memory controller and features)
//! - 0x0148: ROM size code (32 KiB << code)
//! - 0x0149: RAM size code
//! - 0x014D: Header checksum over 0x0134-0x014C

use crate::GbError;
use serde::{Deserialize, Serialize};

/// First byte past the header; ROMs shorter than this are rejected
pub const HEADER_END: usize = 0x0150;

const TITLE_START: usize = 0x0134;
const CGB_FLAG: usize = 0x0143;
const CART_TYPE: usize = 0x0147;
const ROM_SIZE: usize = 0x0148;
const RAM_SIZE: usize = 0x0149;
const HEADER_CHECKSUM: usize = 0x014D;

/// Built-in 512 x 4-bit RAM of MBC2
pub const MBC2_RAM_SIZE: usize = 0x200;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartHeader {
    pub title: String,
    pub cgb: bool,
    pub cart_type: u8,
    pub rom_size_code: u8,
    pub ram_size_code: u8,
    pub header_checksum: u8,
    computed_checksum: u8,
}

impl CartHeader {
    /// Parse the header out of the first [`HEADER_END`] bytes of a ROM image
    pub fn parse(rom: &[u8]) -> Result<Self, GbError> {
        if rom.len() < HEADER_END {
            return Err(GbError::RomTooSmall(rom.len()));
        }

        let cgb = matches!(rom[CGB_FLAG], 0x80 | 0xC0);
        // Pre-CGB titles use all 16 bytes
        let title_end = if cgb { CGB_FLAG } else { CGB_FLAG + 1 };
        let title_bytes = &rom[TITLE_START..title_end];
        let title_bytes = match title_bytes.iter().position(|&b| b == 0) {
            Some(nul) => &title_bytes[..nul],
            None => title_bytes,
        };

        let computed_checksum = rom[TITLE_START..HEADER_CHECKSUM]
            .iter()
            .fold(0u8, |acc, &b| acc.wrapping_sub(b).wrapping_sub(1));

        Ok(Self {
            title: String::from_utf8_lossy(title_bytes).trim_end().to_string(),
            cgb,
            cart_type: rom[CART_TYPE],
            rom_size_code: rom[ROM_SIZE],
            ram_size_code: rom[RAM_SIZE],
            header_checksum: rom[HEADER_CHECKSUM],
            computed_checksum,
        })
    }

    pub fn header_checksum_valid(&self) -> bool {
        self.header_checksum == self.computed_checksum
    }

    /// Declared ROM size in bytes, if the code is a known one
    pub fn rom_size(&self) -> Option<usize> {
        match self.rom_size_code {
            code @ 0x00..=0x08 => Some(0x8000 << code),
            _ => None,
        }
    }

    /// RAM size in bytes the cartridge needs a backend for
    pub fn ram_size(&self) -> usize {
        if matches!(self.cart_type, 0x05 | 0x06) {
            return MBC2_RAM_SIZE;
        }
        match self.ram_size_code {
            0x01 => 0x800,   // 2KB
            0x02 => 0x2000,  // 8KB
            0x03 => 0x8000,  // 32KB (4 banks)
            0x04 => 0x20000, // 128KB (16 banks)
            0x05 => 0x10000, // 64KB (8 banks)
            _ => 0,
        }
    }
}

/// Memory controller family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Controller {
    RomOnly,
    Mbc1,
    Mbc2,
    Mbc3,
    Mbc5,
}

/// Controller plus the optional hardware the cartridge type byte declares
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CartKind {
    pub controller: Controller,
    pub ram: bool,
    pub battery: bool,
    pub rtc: bool,
    pub rumble: bool,
}

impl CartKind {
    const fn new(controller: Controller) -> Self {
        Self {
            controller,
            ram: false,
            battery: false,
            rtc: false,
            rumble: false,
        }
    }

    const fn ram(mut self) -> Self {
        self.ram = true;
        self
    }

    const fn battery(mut self) -> Self {
        self.battery = true;
        self
    }

    const fn rtc(mut self) -> Self {
        self.rtc = true;
        self
    }

    const fn rumble(mut self) -> Self {
        self.rumble = true;
        self
    }

    /// Plain 32 KiB mapping with no controller, the usual fallback
    pub const fn rom_only() -> Self {
        Self::new(Controller::RomOnly)
    }

    /// Decode the cartridge type byte at 0x0147
    pub fn from_type(cart_type: u8) -> Result<Self, GbError> {
        use Controller::*;
        let kind = match cart_type {
            0x00 => Self::new(RomOnly),
            0x01 => Self::new(Mbc1),
            0x02 => Self::new(Mbc1).ram(),
            0x03 => Self::new(Mbc1).ram().battery(),
            0x05 => Self::new(Mbc2).ram(),
            0x06 => Self::new(Mbc2).ram().battery(),
            0x08 => Self::new(RomOnly).ram(),
            0x09 => Self::new(RomOnly).ram().battery(),
            0x0F => Self::new(Mbc3).rtc().battery(),
            0x10 => Self::new(Mbc3).rtc().ram().battery(),
            0x11 => Self::new(Mbc3),
            0x12 => Self::new(Mbc3).ram(),
            0x13 => Self::new(Mbc3).ram().battery(),
            0x19 => Self::new(Mbc5),
            0x1A => Self::new(Mbc5).ram(),
            0x1B => Self::new(Mbc5).ram().battery(),
            0x1C => Self::new(Mbc5).rumble(),
            0x1D => Self::new(Mbc5).rumble().ram(),
            0x1E => Self::new(Mbc5).rumble().ram().battery(),
            other => return Err(GbError::UnsupportedCartType(other)),
        };
        Ok(kind)
    }

    /// Name in the style used by cartridge databases, e.g. "MBC3+TIMER+RAM+BATTERY"
    pub fn name(&self) -> String {
        let mut name = match self.controller {
            Controller::RomOnly => "ROM",
            Controller::Mbc1 => "MBC1",
            Controller::Mbc2 => "MBC2",
            Controller::Mbc3 => "MBC3",
            Controller::Mbc5 => "MBC5",
        }
        .to_string();
        if self.rtc {
            name.push_str("+TIMER");
        }
        if self.rumble {
            name.push_str("+RUMBLE");
        }
        // MBC2 RAM is internal to the controller
        if self.ram && self.controller != Controller::Mbc2 {
            name.push_str("+RAM");
        }
        if self.battery {
            name.push_str("+BATTERY");
        }
        name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header_bytes(title: &[u8], cart_type: u8, ram_code: u8) -> Vec<u8> {
        let mut rom = vec![0; HEADER_END];
        rom[TITLE_START..TITLE_START + title.len()].copy_from_slice(title);
        rom[CART_TYPE] = cart_type;
        rom[ROM_SIZE] = 0x02;
        rom[RAM_SIZE] = ram_code;
        rom
    }

    #[test]
    fn test_parse_header() {
        let rom = header_bytes(b"POKEMON GOLD", 0x10, 0x03);
        let header = CartHeader::parse(&rom).unwrap();

        assert_eq!(header.title, "POKEMON GOLD");
        assert!(!header.cgb);
        assert_eq!(header.cart_type, 0x10);
        assert_eq!(header.rom_size(), Some(0x20000));
        assert_eq!(header.ram_size(), 0x8000);
    }

    #[test]
    fn test_cgb_title_excludes_flag() {
        let mut rom = header_bytes(b"ABCDEFGHIJKLMNO", 0x00, 0x00);
        rom[CGB_FLAG] = 0x80;
        let header = CartHeader::parse(&rom).unwrap();

        assert!(header.cgb);
        assert_eq!(header.title, "ABCDEFGHIJKLMNO");
    }

    #[test]
    fn test_header_checksum() {
        let mut rom = header_bytes(b"TETRIS", 0x00, 0x00);
        let checksum = rom[TITLE_START..HEADER_CHECKSUM]
            .iter()
            .fold(0u8, |acc, &b| acc.wrapping_sub(b).wrapping_sub(1));
        rom[HEADER_CHECKSUM] = checksum;
        assert!(CartHeader::parse(&rom).unwrap().header_checksum_valid());

        rom[HEADER_CHECKSUM] = checksum.wrapping_add(1);
        assert!(!CartHeader::parse(&rom).unwrap().header_checksum_valid());
    }

    #[test]
    fn test_rom_too_small() {
        assert!(matches!(
            CartHeader::parse(&[0; 0x100]),
            Err(GbError::RomTooSmall(0x100))
        ));
    }

    #[test]
    fn test_mbc2_ram_size() {
        let rom = header_bytes(b"MBC2", 0x06, 0x00);
        assert_eq!(CartHeader::parse(&rom).unwrap().ram_size(), MBC2_RAM_SIZE);
    }

    #[test]
    fn test_cart_kind_from_type() {
        let kind = CartKind::from_type(0x10).unwrap();
        assert_eq!(kind.controller, Controller::Mbc3);
        assert!(kind.rtc && kind.ram && kind.battery);
        assert_eq!(kind.name(), "MBC3+TIMER+RAM+BATTERY");

        // MBC3+RAM+BATTERY has no timer
        assert!(!CartKind::from_type(0x13).unwrap().rtc);

        let kind = CartKind::from_type(0x1C).unwrap();
        assert_eq!(kind.controller, Controller::Mbc5);
        assert!(kind.rumble);

        assert_eq!(CartKind::from_type(0x00).unwrap(), CartKind::rom_only());
        assert_eq!(CartKind::from_type(0x06).unwrap().name(), "MBC2+BATTERY");
    }

    #[test]
    fn test_unsupported_types_fail_closed() {
        // MMM01, MBC4, MBC6, MBC7, Pocket Camera, TAMA5, HuC3, HuC1
        for cart_type in [0x0B, 0x15, 0x20, 0x22, 0xFC, 0xFD, 0xFE, 0xFF, 0x04] {
            assert!(matches!(
                CartKind::from_type(cart_type),
                Err(GbError::UnsupportedCartType(t)) if t == cart_type
            ));
        }
    }
}
