//! Game Boy cartridge as seen from the CPU bus
//!
//! # Memory Map
//!
//! - 0x0000-0x3FFF: ROM bank 0 (fixed)
//! - 0x4000-0x7FFF: Switchable ROM bank; writes go to the controller registers
//! - 0xA000-0xBFFF: External RAM, MBC2 half-byte RAM or a latched RTC register
//!
//! Everything else (0x8000-0x9FFF, 0xC000-0xFFFF) belongs to the console.
//!
//! Accesses may span several bytes. They are split at 8KB boundaries and each
//! piece is decoded on its own. Bank numbers are reduced modulo the number of
//! banks the backends actually hold before every access.

use crate::header::{CartHeader, CartKind, HEADER_END, MBC2_RAM_SIZE};
use crate::mappers::{BankRegisters, Mapper, RamTarget};
use crate::rtc::{Mbc3Rtc, RtcSnapshot};
use crate::{AccessError, GbError, StateError};
use emu_core::backend::{BackendError, ClockBackend, StorageBackend};
use emu_core::config::RtcConfig;
use emu_core::logging::{log, LogCategory, LogLevel};
use serde::{Deserialize, Serialize};

pub const ROM_BANK_SIZE: usize = 0x4000;
pub const RAM_BANK_SIZE: usize = 0x2000;

const REGION_SIZE: usize = 0x2000;
const OPEN_BUS: u8 = 0xFF;

/// Version tag of [`GbCart::save_state`] documents
pub const STATE_VERSION: u64 = 1;

/// Decoded 8KB region of the cartridge window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Region {
    RomFixed,
    RomBanked,
    Ram,
    Unmapped,
}

impl Region {
    fn of(addr: usize) -> Self {
        match addr {
            0x0000..=0x3FFF => Region::RomFixed,
            0x4000..=0x7FFF => Region::RomBanked,
            0xA000..=0xBFFF => Region::Ram,
            _ => Region::Unmapped,
        }
    }
}

/// Bank registers and clock state, everything needed to resume a cartridge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartSnapshot {
    pub registers: BankRegisters,
    pub rtc: Option<RtcSnapshot>,
}

pub type BackendResult = Result<Box<dyn StorageBackend>, BackendError>;

/// Game Boy cartridge: controller, ROM and RAM backends and the optional RTC
pub struct GbCart<'c> {
    rom: Box<dyn StorageBackend>,
    ram: Box<dyn StorageBackend>,
    header: CartHeader,
    kind: CartKind,
    mapper: Mapper,
    regs: BankRegisters,
    rtc: Option<Mbc3Rtc<'c>>,
}

impl std::fmt::Debug for GbCart<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GbCart")
            .field("header", &self.header)
            .field("kind", &self.kind)
            .field("mapper", &self.mapper)
            .field("regs", &self.regs)
            .field("rtc", &self.rtc)
            .field("rom_size", &self.rom.size())
            .field("ram_size", &self.ram.size())
            .finish()
    }
}

impl<'c> GbCart<'c> {
    /// Build a cartridge from backend constructors.
    ///
    /// `init_rom` runs first; `init_ram` is handed the parsed header so it can
    /// size the save file. The controller is detected from the header and an
    /// unsupported type is reported rather than mapped as plain ROM; callers
    /// wanting a fallback can use [`GbCart::with_kind`].
    pub fn new<R, A>(
        init_rom: R,
        init_ram: A,
        clock: Option<&'c dyn ClockBackend>,
    ) -> Result<Self, GbError>
    where
        R: FnOnce() -> BackendResult,
        A: FnOnce(&CartHeader) -> BackendResult,
    {
        Self::with_config(init_rom, init_ram, clock, &RtcConfig::default())
    }

    /// Like [`GbCart::new`], honouring the RTC switch of the device configuration.
    ///
    /// With the clock disabled, timer cartridges run as plain MBC3, their RTC
    /// slots read as open bus and no clock backend is needed.
    pub fn with_config<R, A>(
        init_rom: R,
        init_ram: A,
        clock: Option<&'c dyn ClockBackend>,
        config: &RtcConfig,
    ) -> Result<Self, GbError>
    where
        R: FnOnce() -> BackendResult,
        A: FnOnce(&CartHeader) -> BackendResult,
    {
        let rom = init_rom()?;
        let header = read_header(rom.as_ref())?;
        let ram = init_ram(&header)?;
        let mut kind = CartKind::from_type(header.cart_type)?;
        if kind.rtc && !config.enabled {
            log(LogCategory::Rtc, LogLevel::Info, || {
                format!("RTC disabled by configuration for \"{}\"", header.title)
            });
            kind.rtc = false;
        }
        let clock = if config.enabled { clock } else { None };
        Self::assemble(kind, header, rom, ram, clock)
    }

    /// Build a cartridge with an explicit controller, ignoring the header's type byte
    pub fn with_kind(
        kind: CartKind,
        rom: Box<dyn StorageBackend>,
        ram: Box<dyn StorageBackend>,
        clock: Option<&'c dyn ClockBackend>,
    ) -> Result<Self, GbError> {
        let header = read_header(rom.as_ref())?;
        Self::assemble(kind, header, rom, ram, clock)
    }

    fn assemble(
        kind: CartKind,
        header: CartHeader,
        rom: Box<dyn StorageBackend>,
        ram: Box<dyn StorageBackend>,
        clock: Option<&'c dyn ClockBackend>,
    ) -> Result<Self, GbError> {
        let rtc = if kind.rtc {
            Some(Mbc3Rtc::new(clock.ok_or(GbError::MissingClock)?))
        } else {
            None
        };

        if !header.header_checksum_valid() {
            log(LogCategory::Cart, LogLevel::Warn, || {
                format!("Cart: header checksum mismatch for \"{}\"", header.title)
            });
        }
        let declared_ram = header.ram_size();
        if ram.size() != declared_ram {
            log(LogCategory::Cart, LogLevel::Debug, || {
                format!(
                    "Cart: RAM backend is {} bytes, header declares {}",
                    ram.size(),
                    declared_ram
                )
            });
        }

        let cart = Self {
            rom,
            ram,
            header,
            kind,
            mapper: Mapper::for_kind(&kind),
            regs: BankRegisters::power_on(),
            rtc,
        };
        log(LogCategory::Cart, LogLevel::Info, || {
            format!(
                "Cart: \"{}\" {} ({} ROM banks, {} RAM banks)",
                cart.header.title,
                cart.kind.name(),
                cart.rom_bank_count(),
                cart.ram_bank_count()
            )
        });
        Ok(cart)
    }

    /// Reset the bank registers and bring the RTC up to date
    pub fn power_on(&mut self) {
        self.regs = BankRegisters::power_on();
        if let Some(rtc) = self.rtc.as_mut() {
            rtc.power_on();
        }
    }

    pub fn header(&self) -> &CartHeader {
        &self.header
    }

    pub fn kind(&self) -> &CartKind {
        &self.kind
    }

    pub fn mapper(&self) -> &Mapper {
        &self.mapper
    }

    pub fn registers(&self) -> &BankRegisters {
        &self.regs
    }

    pub fn rtc(&self) -> Option<&Mbc3Rtc<'c>> {
        self.rtc.as_ref()
    }

    pub fn ram(&self) -> &dyn StorageBackend {
        self.ram.as_ref()
    }

    /// Mutable RAM backend, e.g. to flush a battery save
    pub fn ram_mut(&mut self) -> &mut dyn StorageBackend {
        self.ram.as_mut()
    }

    pub fn rom(&self) -> &dyn StorageBackend {
        self.rom.as_ref()
    }

    pub fn rom_bank_count(&self) -> usize {
        self.rom.size().div_ceil(ROM_BANK_SIZE).max(1)
    }

    pub fn ram_bank_count(&self) -> usize {
        self.ram.size().div_ceil(RAM_BANK_SIZE)
    }

    /// ROM bank currently visible at 0x4000-0x7FFF
    pub fn effective_rom_bank(&self) -> usize {
        self.mapper.rom_bank(&self.regs) % self.rom_bank_count()
    }

    pub fn into_backends(self) -> (Box<dyn StorageBackend>, Box<dyn StorageBackend>) {
        (self.rom, self.ram)
    }

    /// Read `buf.len()` bytes starting at `addr`
    pub fn read(&mut self, addr: u16, buf: &mut [u8]) -> Result<(), AccessError> {
        if buf.is_empty() {
            return Err(AccessError::ZeroLength);
        }

        let mut mapped = false;
        let mut pos = addr as usize;
        for chunk in split_regions(addr, buf.len()) {
            let out = &mut buf[chunk.start..chunk.end];
            match Region::of(pos) {
                Region::RomFixed => {
                    read_clamped(self.rom.as_ref(), pos, out)?;
                }
                Region::RomBanked => {
                    let offset = self.effective_rom_bank() * ROM_BANK_SIZE + (pos & 0x3FFF);
                    read_clamped(self.rom.as_ref(), offset, out)?;
                }
                Region::Ram => self.read_ram(pos, out)?,
                Region::Unmapped => {
                    out.fill(OPEN_BUS);
                    pos += out.len();
                    continue;
                }
            }
            mapped = true;
            pos += out.len();
        }

        if mapped {
            Ok(())
        } else {
            Err(AccessError::Unmapped {
                address: addr,
                len: buf.len(),
            })
        }
    }

    /// Write `data` starting at `addr`.
    ///
    /// Control registers latch the last byte written to them; RAM stores every byte.
    pub fn write(&mut self, addr: u16, data: &[u8]) -> Result<(), AccessError> {
        if data.is_empty() {
            return Err(AccessError::ZeroLength);
        }

        let mut mapped = false;
        let mut pos = addr as usize;
        for chunk in split_regions(addr, data.len()) {
            let bytes = &data[chunk.start..chunk.end];
            match Region::of(pos) {
                Region::RomFixed | Region::RomBanked => {
                    let last_addr = (pos + bytes.len() - 1) as u16;
                    let val = bytes[bytes.len() - 1];
                    self.mapper
                        .write_control(&mut self.regs, self.rtc.as_mut(), last_addr, val);
                    log(LogCategory::Cart, LogLevel::Trace, || {
                        format!(
                            "{}: 0x{:04X} <- 0x{:02X} => {:?}",
                            self.mapper.name(),
                            last_addr,
                            val,
                            self.regs
                        )
                    });
                }
                Region::Ram => self.write_ram(pos, bytes)?,
                Region::Unmapped => {
                    pos += bytes.len();
                    continue;
                }
            }
            mapped = true;
            pos += bytes.len();
        }

        if mapped {
            Ok(())
        } else {
            Err(AccessError::Unmapped {
                address: addr,
                len: data.len(),
            })
        }
    }

    fn read_ram(&mut self, addr: usize, out: &mut [u8]) -> Result<(), AccessError> {
        match self.mapper.ram_target(&self.regs) {
            RamTarget::OpenBus => out.fill(OPEN_BUS),
            RamTarget::Bank(bank) => match self.ram_offset(bank, addr) {
                Some(offset) => read_clamped(self.ram.as_ref(), offset, out)?,
                None => out.fill(OPEN_BUS),
            },
            RamTarget::HalfBytes => {
                for (i, byte) in out.iter_mut().enumerate() {
                    let offset = (addr + i - 0xA000) % MBC2_RAM_SIZE;
                    let mut cell = [OPEN_BUS];
                    read_clamped(self.ram.as_ref(), offset, &mut cell)?;
                    *byte = cell[0] | 0xF0;
                }
            }
            RamTarget::Rtc(reg) => {
                let value = self
                    .rtc
                    .as_ref()
                    .map_or(OPEN_BUS, |rtc| rtc.read_register(reg));
                out.fill(value);
            }
        }
        Ok(())
    }

    fn write_ram(&mut self, addr: usize, data: &[u8]) -> Result<(), AccessError> {
        match self.mapper.ram_target(&self.regs) {
            RamTarget::OpenBus => {
                log(LogCategory::Stubs, LogLevel::Trace, || {
                    format!("Cart: dropped RAM write at 0x{:04X}", addr)
                });
            }
            RamTarget::Bank(bank) => {
                if let Some(offset) = self.ram_offset(bank, addr) {
                    write_clamped(self.ram.as_mut(), offset, data)?;
                }
            }
            RamTarget::HalfBytes => {
                for (i, &val) in data.iter().enumerate() {
                    let offset = (addr + i - 0xA000) % MBC2_RAM_SIZE;
                    write_clamped(self.ram.as_mut(), offset, &[val & 0x0F])?;
                }
            }
            RamTarget::Rtc(reg) => {
                if let Some(rtc) = self.rtc.as_mut() {
                    rtc.write_register(reg, data[data.len() - 1]);
                }
            }
        }
        Ok(())
    }

    /// Backend offset of `addr` in RAM bank `bank`, None when the cart has no RAM
    fn ram_offset(&self, bank: usize, addr: usize) -> Option<usize> {
        let count = self.ram_bank_count();
        if count == 0 {
            return None;
        }
        Some((bank % count) * RAM_BANK_SIZE + (addr - 0xA000))
    }

    pub fn snapshot(&self) -> CartSnapshot {
        CartSnapshot {
            registers: self.regs,
            rtc: self.rtc.as_ref().map(|rtc| rtc.snapshot()),
        }
    }

    pub fn restore(&mut self, snapshot: &CartSnapshot) -> Result<(), StateError> {
        match (self.rtc.as_mut(), snapshot.rtc.as_ref()) {
            (Some(rtc), Some(saved)) => rtc.restore(saved),
            (None, None) => {}
            _ => return Err(StateError::RtcMismatch),
        }
        self.regs = snapshot.registers;
        Ok(())
    }

    /// JSON save state. Does not include ROM or RAM contents.
    pub fn save_state(&self) -> serde_json::Value {
        serde_json::json!({
            "system": "gb_cart",
            "version": STATE_VERSION,
            "cart": self.snapshot(),
        })
    }

    pub fn load_state(&mut self, v: &serde_json::Value) -> Result<(), StateError> {
        let found = v.get("version").and_then(|v| v.as_u64()).unwrap_or(0);
        if found != STATE_VERSION {
            return Err(StateError::Version {
                found,
                expected: STATE_VERSION,
            });
        }
        let cart = v.get("cart").ok_or(StateError::Missing("cart"))?;
        let snapshot: CartSnapshot = serde_json::from_value(cart.clone())?;
        self.restore(&snapshot)
    }
}

fn read_header(rom: &dyn StorageBackend) -> Result<CartHeader, GbError> {
    if rom.size() < HEADER_END {
        return Err(GbError::RomTooSmall(rom.size()));
    }
    let mut bytes = [0u8; HEADER_END];
    rom.read(0, &mut bytes)?;
    CartHeader::parse(&bytes)
}

/// Split `[addr, addr + len)` into index ranges that never cross an 8KB boundary
fn split_regions(addr: u16, len: usize) -> impl Iterator<Item = std::ops::Range<usize>> {
    let start = addr as usize;
    let mut index = 0;
    std::iter::from_fn(move || {
        if index >= len {
            return None;
        }
        let pos = start + index;
        let room = REGION_SIZE - (pos % REGION_SIZE);
        let end = (index + room).min(len);
        let range = index..end;
        index = end;
        Some(range)
    })
}

/// Read what the backend holds at `offset` and fill the rest with open bus
fn read_clamped(
    backend: &dyn StorageBackend,
    offset: usize,
    out: &mut [u8],
) -> Result<(), BackendError> {
    let available = backend.size().saturating_sub(offset).min(out.len());
    let (present, missing) = out.split_at_mut(available);
    if !present.is_empty() {
        backend.read(offset, present)?;
    }
    missing.fill(OPEN_BUS);
    Ok(())
}

/// Write the part of `data` that fits; the backend is never grown
fn write_clamped(
    backend: &mut dyn StorageBackend,
    offset: usize,
    data: &[u8],
) -> Result<(), BackendError> {
    let available = backend.size().saturating_sub(offset).min(data.len());
    if available > 0 {
        backend.write(offset, &data[..available])?;
    }
    Ok(())
}
