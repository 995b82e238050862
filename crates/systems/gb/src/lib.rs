//! Game Boy cartridge emulation
//!
//! A [`GbCart`] owns the ROM and RAM storage backends, decodes CPU accesses
//! through the memory bank controller detected from the header and, on
//! MBC3 timer cartridges, drives an [`Mbc3Rtc`] from a borrowed clock.
//!
//! ```
//! use emu_core::backend::MemoryStorage;
//! use emu_gb::GbCart;
//!
//! let mut rom = vec![0u8; 0x8000];
//! rom[0x4000] = 0x42;
//! let mut cart = GbCart::new(
//!     || Ok(Box::new(MemoryStorage::read_only(rom))),
//!     |header| Ok(Box::new(MemoryStorage::zeroed(header.ram_size()))),
//!     None,
//! )
//! .unwrap();
//!
//! let mut byte = [0u8; 1];
//! cart.read(0x4000, &mut byte).unwrap();
//! assert_eq!(byte[0], 0x42);
//! ```

pub mod cartridge;
pub mod header;
pub mod mappers;
pub mod rtc;

pub use cartridge::{CartSnapshot, GbCart};
pub use header::{CartHeader, CartKind, Controller};
pub use mappers::BankRegisters;
pub use rtc::{Mbc3Rtc, RtcRegister, RtcRegisters};

use emu_core::backend::BackendError;

/// Cartridge initialisation errors
#[derive(thiserror::Error, Debug)]
pub enum GbError {
    #[error("Unsupported cartridge type: 0x{0:02X}")]
    UnsupportedCartType(u8),
    #[error("ROM too small for a cartridge header: {0} bytes")]
    RomTooSmall(usize),
    #[error("Cartridge has a real-time clock but no clock backend was provided")]
    MissingClock,
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),
}

/// Per-access errors; callers usually treat them as open bus or an ignored write
#[derive(thiserror::Error, Debug)]
pub enum AccessError {
    #[error("Zero-length cartridge access")]
    ZeroLength,
    #[error("Unmapped cartridge access of {len} byte(s) at 0x{address:04X}")]
    Unmapped { address: u16, len: usize },
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),
}

#[derive(thiserror::Error, Debug)]
pub enum StateError {
    #[error("Unsupported save state version {found} (expected {expected})")]
    Version { found: u64, expected: u64 },
    #[error("Save state is missing \"{0}\"")]
    Missing(&'static str),
    #[error("Save state RTC does not match the cartridge")]
    RtcMismatch,
    #[error("Invalid save state: {0}")]
    Parse(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            GbError::UnsupportedCartType(0xFC).to_string(),
            "Unsupported cartridge type: 0xFC"
        );
        assert_eq!(
            AccessError::Unmapped {
                address: 0x8000,
                len: 2
            }
            .to_string(),
            "Unmapped cartridge access of 2 byte(s) at 0x8000"
        );
    }

    #[test]
    fn test_backend_error_converts() {
        let err: GbError = BackendError::ReadOnly.into();
        assert!(matches!(err, GbError::Backend(BackendError::ReadOnly)));

        let err: AccessError = BackendError::ReadOnly.into();
        assert!(matches!(err, AccessError::Backend(_)));
    }
}
