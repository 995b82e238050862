//! MIPS R4300i architectural register file
//!
//! The N64 boot firmware leaves the VR4300 in a well-defined register state
//! before jumping into the cartridge boot code. This module holds that state
//! so the boot simulation can prime it and a CPU core can pick it up:
//! - 32 general-purpose 64-bit registers (R0 hard-wired to zero)
//! - PC, HI and LO
//! - FPU implementation/revision (FCR0) and control/status (FCR31)
//! - 32 CP0 system-control registers

use serde::{Deserialize, Serialize};

// CP0 register indices
pub const CP0_INDEX: usize = 0;
pub const CP0_RANDOM: usize = 1;
pub const CP0_ENTRYLO0: usize = 2;
pub const CP0_ENTRYLO1: usize = 3;
pub const CP0_CONTEXT: usize = 4;
pub const CP0_PAGEMASK: usize = 5;
pub const CP0_WIRED: usize = 6;
pub const CP0_BADVADDR: usize = 8;
pub const CP0_COUNT: usize = 9;
pub const CP0_ENTRYHI: usize = 10;
pub const CP0_COMPARE: usize = 11;
pub const CP0_STATUS: usize = 12;
pub const CP0_CAUSE: usize = 13;
pub const CP0_EPC: usize = 14;
pub const CP0_PRID: usize = 15;
pub const CP0_CONFIG: usize = 16;
pub const CP0_ERROREPC: usize = 30;

// ABI register names used by the boot code
pub const GPR_T3: usize = 11;
pub const GPR_S3: usize = 19;
pub const GPR_S4: usize = 20;
pub const GPR_S5: usize = 21;
pub const GPR_S6: usize = 22;
pub const GPR_S7: usize = 23;
pub const GPR_SP: usize = 29;
pub const GPR_RA: usize = 31;

/// Reset vector in the PIF boot ROM
pub const RESET_VECTOR: u64 = 0xFFFF_FFFF_BFC0_0000;

/// R4300i register state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct R4300Registers {
    gpr: [u64; 32],

    /// Program counter
    pub pc: u64,

    /// HI register (for multiply/divide results)
    pub hi: u64,

    /// LO register (for multiply/divide results)
    pub lo: u64,

    /// Floating-point implementation/revision register
    pub fcr0: u32,

    /// Floating-point control/status register
    pub fcr31: u32,

    /// CP0 registers (coprocessor 0 - system control)
    pub cp0: [u64; 32],
}

impl Default for R4300Registers {
    fn default() -> Self {
        Self::new()
    }
}

impl R4300Registers {
    /// Register file as it comes out of a hardware reset
    pub fn new() -> Self {
        let mut regs = Self {
            gpr: [0; 32],
            pc: RESET_VECTOR,
            hi: 0,
            lo: 0,
            fcr0: 0,
            fcr31: 0,
            cp0: [0; 32],
        };
        regs.cp0[CP0_PRID] = 0x0B00;
        regs.cp0[CP0_STATUS] = 0x3400_0000;
        regs.cp0[CP0_CONFIG] = 0x7006_E463;
        regs
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Read a general-purpose register; R0 always reads zero
    pub fn gpr(&self, index: usize) -> u64 {
        match index {
            0 => 0,
            _ => self.gpr[index & 0x1F],
        }
    }

    /// Write a general-purpose register; writes to R0 are discarded
    pub fn set_gpr(&mut self, index: usize, value: u64) {
        let index = index & 0x1F;
        if index != 0 {
            self.gpr[index] = value;
        }
    }

    pub fn gprs(&self) -> &[u64; 32] {
        &self.gpr
    }
}

/// Sign-extend a 32-bit value to the 64-bit register width
pub fn sign_extend_32(value: u32) -> u64 {
    value as i32 as i64 as u64
}
