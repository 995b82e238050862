//! N64 cartridge ROM image
//!
//! # Header
//!
//! - 0x00: PI domain 1 timing word (also the byte-order magic)
//! - 0x04: clock rate override
//! - 0x08: boot address
//! - 0x10, 0x14: header checksums
//! - 0x20..0x34: image name
//! - 0x40..0x1000: IPL3 boot code

use crate::N64Error;
use emu_core::backend::{BackendError, StorageBackend};

/// N64 ROM magic number (big-endian format)
pub const N64_ROM_MAGIC: [u8; 4] = [0x80, 0x37, 0x12, 0x40];

pub const IPL3_START: usize = 0x40;
pub const IPL3_END: usize = 0x1000;

/// N64 ROM byte order formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(clippy::enum_variant_names)]
pub enum ByteOrder {
    /// Big-endian (native N64 format, .z64)
    BigEndian,
    /// Little-endian (byte-swapped, .n64)
    LittleEndian,
    /// Middle-endian (word-swapped, .v64)
    MiddleEndian,
}

/// N64 cartridge
#[derive(Debug, Clone)]
pub struct Cartridge {
    /// ROM data (converted to big-endian)
    rom: Vec<u8>,
    source_order: ByteOrder,
}

impl Cartridge {
    pub fn load(data: &[u8]) -> Result<Self, N64Error> {
        if data.len() < IPL3_END {
            return Err(N64Error::InvalidRom(
                "ROM too small (minimum 4KB)".to_string(),
            ));
        }

        let source_order = Self::detect_byte_order(data)?;

        let rom = match source_order {
            ByteOrder::BigEndian => data.to_vec(),
            ByteOrder::LittleEndian => Self::convert_little_endian(data),
            ByteOrder::MiddleEndian => Self::convert_middle_endian(data),
        };

        Ok(Self { rom, source_order })
    }

    fn detect_byte_order(data: &[u8]) -> Result<ByteOrder, N64Error> {
        match data.get(0..4) {
            Some([0x80, 0x37, 0x12, 0x40]) => Ok(ByteOrder::BigEndian), // .z64
            Some([0x40, 0x12, 0x37, 0x80]) => Ok(ByteOrder::LittleEndian), // .n64
            Some([0x37, 0x80, 0x40, 0x12]) => Ok(ByteOrder::MiddleEndian), // .v64
            _ => Err(N64Error::InvalidRom(
                "Unrecognized N64 ROM format (bad magic)".to_string(),
            )),
        }
    }

    fn convert_little_endian(data: &[u8]) -> Vec<u8> {
        let mut result = data.to_vec();
        for chunk in result.chunks_exact_mut(4) {
            chunk.reverse();
        }
        result
    }

    fn convert_middle_endian(data: &[u8]) -> Vec<u8> {
        let mut result = data.to_vec();
        for chunk in result.chunks_exact_mut(2) {
            chunk.swap(0, 1);
        }
        result
    }

    /// Byte order of the image as it was loaded
    pub fn source_order(&self) -> ByteOrder {
        self.source_order
    }

    pub fn read_u8(&self, offset: u32) -> u8 {
        *self.rom.get(offset as usize).unwrap_or(&0)
    }

    /// Big-endian word; bytes past the end read as 0
    pub fn read_u32(&self, offset: u32) -> u32 {
        let bytes = [
            self.read_u8(offset),
            self.read_u8(offset.wrapping_add(1)),
            self.read_u8(offset.wrapping_add(2)),
            self.read_u8(offset.wrapping_add(3)),
        ];
        u32::from_be_bytes(bytes)
    }

    /// IPL3 boot code, the block the CIC is identified from
    pub fn boot_code(&self) -> &[u8] {
        &self.rom[IPL3_START..IPL3_END]
    }

    pub fn pi_bsd_dom1_config(&self) -> u32 {
        self.read_u32(0x00)
    }

    pub fn entry_point(&self) -> u32 {
        self.read_u32(0x08)
    }

    /// Image name from the header, trailing padding removed
    pub fn title(&self) -> String {
        String::from_utf8_lossy(&self.rom[0x20..0x34])
            .trim_end_matches(['\0', ' '])
            .to_string()
    }

    pub fn data(&self) -> &[u8] {
        &self.rom
    }
}

impl StorageBackend for Cartridge {
    fn size(&self) -> usize {
        self.rom.len()
    }

    fn read(&self, offset: usize, buf: &mut [u8]) -> Result<(), BackendError> {
        let end = offset.checked_add(buf.len()).filter(|&end| end <= self.rom.len());
        match end {
            Some(end) => {
                buf.copy_from_slice(&self.rom[offset..end]);
                Ok(())
            }
            None => Err(BackendError::OutOfBounds {
                offset,
                len: buf.len(),
                size: self.rom.len(),
            }),
        }
    }

    fn write(&mut self, _offset: usize, _data: &[u8]) -> Result<(), BackendError> {
        Err(BackendError::ReadOnly)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(magic: [u8; 4]) -> Vec<u8> {
        let mut data = vec![0; 0x1000];
        data[0..4].copy_from_slice(&magic);
        data
    }

    #[test]
    fn test_load_too_small() {
        let data = vec![0; 1024];
        assert!(Cartridge::load(&data).is_err());
    }

    #[test]
    fn test_bad_magic() {
        let data = image([0x12, 0x34, 0x56, 0x78]);
        assert!(matches!(
            Cartridge::load(&data),
            Err(N64Error::InvalidRom(_))
        ));
    }

    #[test]
    fn test_detect_big_endian() {
        let cart = Cartridge::load(&image(N64_ROM_MAGIC)).unwrap();
        assert_eq!(cart.rom[0..4], N64_ROM_MAGIC);
        assert_eq!(cart.source_order(), ByteOrder::BigEndian);
    }

    #[test]
    fn test_detect_little_endian() {
        let mut data = image([0x40, 0x12, 0x37, 0x80]);
        data[8..12].copy_from_slice(&[0x00, 0x04, 0x00, 0x80]);

        let cart = Cartridge::load(&data).unwrap();
        assert_eq!(cart.rom[0..4], N64_ROM_MAGIC);
        assert_eq!(cart.entry_point(), 0x8000_0400);
        assert_eq!(cart.source_order(), ByteOrder::LittleEndian);
    }

    #[test]
    fn test_detect_middle_endian() {
        let mut data = image([0x37, 0x80, 0x40, 0x12]);
        data[8..12].copy_from_slice(&[0x00, 0x80, 0x00, 0x04]);

        let cart = Cartridge::load(&data).unwrap();
        assert_eq!(cart.rom[0..4], N64_ROM_MAGIC);
        assert_eq!(cart.entry_point(), 0x8000_0400);
        assert_eq!(cart.source_order(), ByteOrder::MiddleEndian);
    }

    #[test]
    fn test_header_fields() {
        let mut data = image(N64_ROM_MAGIC);
        data[0x20..0x29].copy_from_slice(b"TEST CART");
        for byte in &mut data[0x29..0x34] {
            *byte = b' ';
        }
        data[0x40] = 0xAB;
        data[0xFFF] = 0xCD;

        let cart = Cartridge::load(&data).unwrap();
        assert_eq!(cart.pi_bsd_dom1_config(), 0x8037_1240);
        assert_eq!(cart.title(), "TEST CART");
        assert_eq!(cart.boot_code().len(), 0xFC0);
        assert_eq!(cart.boot_code()[0], 0xAB);
        assert_eq!(cart.boot_code()[0xFBF], 0xCD);
    }

    #[test]
    fn test_read_out_of_bounds() {
        let cart = Cartridge::load(&image(N64_ROM_MAGIC)).unwrap();
        assert_eq!(cart.read_u8(0x10000), 0);
        assert_eq!(cart.read_u32(0xFFE), 0);
    }

    #[test]
    fn test_storage_backend_is_read_only() {
        let mut cart = Cartridge::load(&image(N64_ROM_MAGIC)).unwrap();
        let mut buf = [0u8; 4];
        StorageBackend::read(&cart, 0, &mut buf).unwrap();
        assert_eq!(buf, N64_ROM_MAGIC);
        assert!(matches!(
            StorageBackend::read(&cart, 0xFFE, &mut buf),
            Err(BackendError::OutOfBounds { .. })
        ));
        assert!(matches!(
            cart.write(0, &[0]),
            Err(BackendError::ReadOnly)
        ));
    }
}
