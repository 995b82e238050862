//! PIF boot ROM high-level emulation
//!
//! Instead of running the PIF's boot code, [`execute`] leaves the CPU and RCP
//! in the state that code produces right before it jumps into the
//! cartridge's IPL3, which then runs from SP DMEM.
//!
//! # Register Map
//!
//! State handed to IPL3:
//! - `s3`: ROM type (0 cartridge, 1 64DD)
//! - `s4`: TV type (0 PAL, 1 NTSC, 2 MPAL)
//! - `s5`: reset type (0 cold, 1 NMI)
//! - `s6`: IPL3 seed of the CIC
//! - `s7`: 0
//! - `t3`, `sp`, `ra`: DMEM entry, top of IMEM stack, IPL2 return address
//! - PIF RAM 0x24: CIC seed word

use crate::cartridge::{IPL3_END, IPL3_START};
use crate::cic::CicVariant;
use crate::N64Error;
use emu_core::backend::StorageBackend;
use emu_core::config::{ResetType, TvType};
use emu_core::cpu_mips_r4300i::*;
use emu_core::logging::{log, LogCategory, LogLevel};
use serde::{Deserialize, Serialize};

/// SP DMEM (0x0000-0x0FFF) followed by IMEM (0x1000-0x1FFF)
pub const SP_MEM_SIZE: usize = 0x2000;
pub const SP_IMEM_OFFSET: usize = 0x1000;
pub const PIF_RAM_SIZE: usize = 0x40;
pub const PIF_SEED_OFFSET: usize = 0x24;

/// Reset type flag in the PIF RAM seed word
const SEED_NMI_BIT: u32 = 1 << 17;

/// IPL3 entry in DMEM (KSEG1)
pub const IPL3_ENTRY: u64 = 0xFFFF_FFFF_A400_0040;
const BOOT_SP: u64 = 0xFFFF_FFFF_A400_1FF0;
const BOOT_RA: u64 = 0xFFFF_FFFF_A400_1550;

/// Loop left in IMEM by IPL2; IPL3 for CIC x105 polls it
const IMEM_STUB: [u32; 8] = [
    0x3C0D_BFC0, // lui   t5, 0xBFC0
    0x8DA8_07FC, // lw    t0, 0x07FC(t5)
    0x25AD_07C0, // addiu t5, t5, 0x07C0
    0x3108_0080, // andi  t0, t0, 0x0080
    0x5500_FFFC, // bnezl t0, -4
    0x3C0D_BFC0, // lui   t5, 0xBFC0
    0x8DA8_0024, // lw    t0, 0x0024(t5)
    0x3C0B_B000, // lui   t3, 0xB000
];

/// PI bus timing for cartridge domain 1
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PiDomainConfig {
    pub latency: u8,
    pub pulse_width: u8,
    pub page_size: u8,
    pub release: u8,
}

impl PiDomainConfig {
    /// Decode the timing word stored at ROM offset 0
    pub fn from_bsd_word(word: u32) -> Self {
        Self {
            latency: word as u8,
            pulse_width: (word >> 8) as u8,
            page_size: ((word >> 16) & 0x0F) as u8,
            release: ((word >> 20) & 0x03) as u8,
        }
    }
}

/// RCP state the boot sequence writes
pub trait RcpMemory {
    fn write_sp_mem(&mut self, offset: usize, data: &[u8]) -> Result<(), N64Error>;
    fn read_sp_mem(&self, offset: usize, buf: &mut [u8]) -> Result<(), N64Error>;
    fn write_pif_ram(&mut self, offset: usize, data: &[u8]) -> Result<(), N64Error>;
    fn set_pi_dom1(&mut self, config: PiDomainConfig);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RcpImage {
    sp_mem: Vec<u8>,
    pif_ram: [u8; PIF_RAM_SIZE],
    pi_dom1: PiDomainConfig,
}

impl Default for RcpImage {
    fn default() -> Self {
        Self::new()
    }
}

impl RcpImage {
    pub fn new() -> Self {
        Self {
            sp_mem: vec![0; SP_MEM_SIZE],
            pif_ram: [0; PIF_RAM_SIZE],
            pi_dom1: PiDomainConfig::default(),
        }
    }

    pub fn sp_mem(&self) -> &[u8] {
        &self.sp_mem
    }

    pub fn pif_ram(&self) -> &[u8; PIF_RAM_SIZE] {
        &self.pif_ram
    }

    pub fn pi_dom1(&self) -> PiDomainConfig {
        self.pi_dom1
    }

    /// Big-endian word from SP memory
    pub fn sp_word(&self, offset: usize) -> Option<u32> {
        let bytes = self.sp_mem.get(offset..offset.checked_add(4)?)?;
        Some(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub fn pif_word(&self, offset: usize) -> Option<u32> {
        let bytes = self.pif_ram.get(offset..offset.checked_add(4)?)?;
        Some(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }
}

fn range(offset: usize, len: usize, size: usize) -> Result<std::ops::Range<usize>, N64Error> {
    match offset.checked_add(len) {
        Some(end) if end <= size => Ok(offset..end),
        _ => Err(N64Error::MemoryRange { offset, len }),
    }
}

impl RcpMemory for RcpImage {
    fn write_sp_mem(&mut self, offset: usize, data: &[u8]) -> Result<(), N64Error> {
        let range = range(offset, data.len(), SP_MEM_SIZE)?;
        self.sp_mem[range].copy_from_slice(data);
        Ok(())
    }

    fn read_sp_mem(&self, offset: usize, buf: &mut [u8]) -> Result<(), N64Error> {
        let range = range(offset, buf.len(), SP_MEM_SIZE)?;
        buf.copy_from_slice(&self.sp_mem[range]);
        Ok(())
    }

    fn write_pif_ram(&mut self, offset: usize, data: &[u8]) -> Result<(), N64Error> {
        let range = range(offset, data.len(), PIF_RAM_SIZE)?;
        self.pif_ram[range].copy_from_slice(data);
        Ok(())
    }

    fn set_pi_dom1(&mut self, config: PiDomainConfig) {
        self.pi_dom1 = config;
    }
}

/// Everything the boot sequence reads and writes
pub struct BootContext<'a, M: RcpMemory> {
    pub regs: &'a mut R4300Registers,
    pub memory: &'a mut M,
    pub rom: &'a dyn StorageBackend,
    pub cic: CicVariant,
    pub tv_type: TvType,
    pub reset_type: ResetType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BootSummary {
    pub cic: CicVariant,
    /// Boot address from the ROM header
    pub entry_point: u32,
    pub pc: u64,
}

fn read_rom_word(rom: &dyn StorageBackend, offset: usize) -> Result<u32, N64Error> {
    let mut word = [0u8; 4];
    rom.read(offset, &mut word)?;
    Ok(u32::from_be_bytes(word))
}

/// Run the boot ROM's side effects
pub fn execute<M: RcpMemory>(ctx: BootContext<'_, M>) -> Result<BootSummary, N64Error> {
    let BootContext {
        regs,
        memory,
        rom,
        cic,
        tv_type,
        reset_type,
    } = ctx;

    if rom.size() < IPL3_END {
        return Err(N64Error::InvalidRom(format!(
            "ROM too small for boot code: {} bytes",
            rom.size()
        )));
    }

    let mut ipl3 = vec![0u8; IPL3_END - IPL3_START];
    rom.read(IPL3_START, &mut ipl3)?;
    let bsd_dom1 = read_rom_word(rom, 0x00)?;
    let entry_point = read_rom_word(rom, 0x08)?;

    memory.write_sp_mem(IPL3_START, &ipl3)?;

    let mut seed_word = cic.seed_word();
    if reset_type == ResetType::Nmi {
        seed_word |= SEED_NMI_BIT;
    }
    memory.write_pif_ram(PIF_SEED_OFFSET, &seed_word.to_be_bytes())?;

    regs.reset();
    regs.set_gpr(GPR_S3, cic.rom_type());
    regs.set_gpr(GPR_S4, tv_type.code());
    regs.set_gpr(GPR_S5, reset_type.code());
    regs.set_gpr(GPR_S6, u64::from(cic.ipl3_seed()));
    regs.set_gpr(GPR_S7, 0);

    regs.cp0[CP0_RANDOM] = 0x1F;
    regs.cp0[CP0_STATUS] = 0x3400_0000;
    regs.cp0[CP0_CONFIG] = 0x0006_E463;
    regs.cp0[CP0_PRID] = 0x0B00;
    regs.cp0[CP0_COUNT] = 0x5000;
    regs.cp0[CP0_CAUSE] = 0x5C;
    regs.cp0[CP0_CONTEXT] = 0x007F_FFF0;
    regs.cp0[CP0_EPC] = u64::MAX;
    regs.cp0[CP0_BADVADDR] = u64::MAX;
    regs.cp0[CP0_ERROREPC] = u64::MAX;
    regs.fcr0 = 0x511;
    regs.fcr31 = 0x0100_0800;

    let pi = PiDomainConfig::from_bsd_word(bsd_dom1);
    memory.set_pi_dom1(pi);

    let stub: Vec<u8> = IMEM_STUB.iter().flat_map(|word| word.to_be_bytes()).collect();
    memory.write_sp_mem(SP_IMEM_OFFSET, &stub)?;

    regs.set_gpr(GPR_T3, IPL3_ENTRY);
    regs.set_gpr(GPR_SP, BOOT_SP);
    regs.set_gpr(GPR_RA, BOOT_RA);
    regs.pc = IPL3_ENTRY;

    log(LogCategory::Boot, LogLevel::Debug, || {
        format!(
            "PI dom1: lat={:#04X} pwd={:#04X} pgs={} rls={}",
            pi.latency, pi.pulse_width, pi.page_size, pi.release
        )
    });

    let summary = BootSummary {
        cic,
        entry_point,
        pc: regs.pc,
    };
    log(LogCategory::Boot, LogLevel::Info, || {
        format!(
            "Boot: CIC {} seed {:#04X}, {:?} {:?} reset, entry {:#010X}, pc {:#018X}",
            cic.model(),
            cic.ipl3_seed(),
            tv_type,
            reset_type,
            entry_point,
            summary.pc
        )
    });

    Ok(summary)
}
