//! CIC (cartridge lockout chip) identification
//!
//! The PIF boot ROM exchanges a seed with the CIC and hands it to the
//! cartridge boot code (IPL3), which refuses to run with the wrong one.
//! The chip is identified from the CRC32 of IPL3 (ROM 0x40-0x0FFF).
//!
//! # Seed word
//!
//! Stored big-endian at PIF RAM 0x24:
//! - bit 18: CIC version flag (set on 6101/7102)
//! - bit 17: reset type (set by the PIF on NMI)
//! - bits 15-8: IPL3 seed
//! - bits 7-0: IPL2 seed

use crate::N64Error;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CicVariant {
    Nus6101,
    Nus6102,
    Nus6103,
    Nus6105,
    Nus6106,
    Nus7102,
    Nus8303,
    Nus5101,
}

/// Per-chip boot constants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CicInfo {
    pub variant: CicVariant,
    /// Model number printed on the chip
    pub model: u16,
    /// CRC32 of the IPL3 the chip pairs with
    pub crc: u32,
    pub seed_word: u32,
}

static CIC_TABLE: [CicInfo; 8] = [
    CicInfo {
        variant: CicVariant::Nus6101,
        model: 6101,
        crc: 0x6170_A4A1,
        seed_word: 0x0004_3F3F,
    },
    CicInfo {
        variant: CicVariant::Nus7102,
        model: 7102,
        crc: 0x009E_9EA3,
        seed_word: 0x0004_3F3F,
    },
    CicInfo {
        variant: CicVariant::Nus6102,
        model: 6102,
        crc: 0x90BB_6CB5,
        seed_word: 0x0000_3F3F,
    },
    CicInfo {
        variant: CicVariant::Nus6103,
        model: 6103,
        crc: 0x0B05_0EE0,
        seed_word: 0x0000_783F,
    },
    CicInfo {
        variant: CicVariant::Nus6105,
        model: 6105,
        crc: 0x98BC_2C86,
        seed_word: 0x0000_913F,
    },
    CicInfo {
        variant: CicVariant::Nus6106,
        model: 6106,
        crc: 0xACC8_580A,
        seed_word: 0x0000_853F,
    },
    CicInfo {
        variant: CicVariant::Nus8303,
        model: 8303,
        crc: 0x0E01_8159,
        seed_word: 0x0000_DD00,
    },
    CicInfo {
        variant: CicVariant::Nus5101,
        model: 5101,
        crc: 0x587B_D543,
        seed_word: 0x0000_AC00,
    },
];

impl CicVariant {
    pub fn table() -> &'static [CicInfo] {
        &CIC_TABLE
    }

    pub fn info(self) -> &'static CicInfo {
        &CIC_TABLE[self.table_index()]
    }

    /// Position of this chip's entry in the seed table
    fn table_index(self) -> usize {
        match self {
            CicVariant::Nus6101 => 0,
            CicVariant::Nus7102 => 1,
            CicVariant::Nus6102 => 2,
            CicVariant::Nus6103 => 3,
            CicVariant::Nus6105 => 4,
            CicVariant::Nus6106 => 5,
            CicVariant::Nus8303 => 6,
            CicVariant::Nus5101 => 7,
        }
    }

    /// Identify the chip from the IPL3 boot code (ROM 0x40-0x0FFF)
    pub fn detect(ipl3: &[u8]) -> Result<Self, N64Error> {
        let crc = crc32fast::hash(ipl3);
        Self::from_crc(crc).ok_or(N64Error::UnsupportedCic { crc })
    }

    pub fn from_crc(crc: u32) -> Option<Self> {
        CIC_TABLE
            .iter()
            .find(|info| info.crc == crc)
            .map(|info| info.variant)
    }

    /// Chip for a model number; PAL 710x chips map to their NTSC 610x twins
    pub fn from_model(model: u16) -> Result<Self, N64Error> {
        let model = match model {
            7101 => 6102,
            7103 => 6103,
            7105 => 6105,
            7106 => 6106,
            other => other,
        };
        CIC_TABLE
            .iter()
            .find(|info| info.model == model)
            .map(|info| info.variant)
            .ok_or(N64Error::UnknownCicModel(model))
    }

    /// Forced model if configured, otherwise detection from IPL3
    pub fn resolve(forced_model: Option<u16>, ipl3: &[u8]) -> Result<Self, N64Error> {
        match forced_model {
            Some(model) => Self::from_model(model),
            None => Self::detect(ipl3),
        }
    }

    pub fn model(self) -> u16 {
        self.info().model
    }

    pub fn seed_word(self) -> u32 {
        self.info().seed_word
    }

    /// Seed the PIF leaves in `s6` for IPL3
    pub fn ipl3_seed(self) -> u8 {
        (self.seed_word() >> 8) as u8
    }

    /// 1 for the 64DD boot chip, 0 for cartridges
    pub fn rom_type(self) -> u64 {
        match self {
            CicVariant::Nus8303 => 1,
            _ => 0,
        }
    }
}
