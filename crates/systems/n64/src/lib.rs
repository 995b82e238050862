//! N64 peripheral devices
//!
//! - [`Cartridge`]: ROM image normalised to big-endian, served as a read-only
//!   storage backend
//! - [`CicVariant`]: lockout chip identification and seeds
//! - [`pif_boot`]: high-level replacement for the PIF boot ROM, leaving the
//!   machine in the state IPL3 expects
//! - [`TransferPak`]: controller-pak accessory exposing a Game Boy cartridge

pub mod cartridge;
pub mod cic;
pub mod pif_boot;
pub mod transfer_pak;

pub use cartridge::Cartridge;
pub use cic::{CicInfo, CicVariant};
pub use pif_boot::{execute, BootContext, BootSummary, PiDomainConfig, RcpImage, RcpMemory};
pub use transfer_pak::TransferPak;

use emu_core::backend::BackendError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum N64Error {
    #[error("Invalid ROM format: {0}")]
    InvalidRom(String),
    #[error("Unsupported CIC (IPL3 CRC32 0x{crc:08X})")]
    UnsupportedCic { crc: u32 },
    #[error("Unknown CIC model: {0}")]
    UnknownCicModel(u16),
    #[error("RCP memory access of {len} byte(s) at 0x{offset:X} is out of range")]
    MemoryRange { offset: usize, len: usize },
    #[error("Invalid save state: {0}")]
    State(String),
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),
}
