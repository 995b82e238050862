//! Transfer Pak: Game Boy cartridge reader for the controller pak slot
//!
//! # Register Map
//!
//! Pak addresses, accessed in 32-byte blocks:
//! - 0x8000-0x8FFF: enable (write 0x84 enable, 0xFE disable; reads 0x84 when on)
//! - 0xA000-0xAFFF: GB bank window select (0-3)
//! - 0xB000-0xBFFF: access mode / status
//! - 0xC000-0xFFFF: 16KB window into the GB cartridge address space
//!
//! Writes use the last byte of the block as the register value.

use crate::N64Error;
use emu_core::logging::{log, LogCategory, LogLevel};
use emu_gb::GbCart;

pub const BLOCK_SIZE: usize = 32;

const ENABLED: u8 = 0x84;
const DISABLE: u8 = 0xFE;

const ACCESS_NO_CART: u8 = 0x40;
const ACCESS_MODE_0: u8 = 0x80;
const ACCESS_MODE_1: u8 = 0x89;
const ACCESS_MODE_CHANGED: u8 = 0x44;

const STATE_VERSION: u64 = 1;

pub struct TransferPak<'c> {
    enabled: bool,
    bank: u8,
    access_mode: u8,
    access_mode_changed: u8,
    cart: Option<GbCart<'c>>,
}

impl<'c> TransferPak<'c> {
    pub fn new(cart: Option<GbCart<'c>>) -> Self {
        let mut pak = Self {
            enabled: false,
            bank: 0,
            access_mode: ACCESS_NO_CART,
            access_mode_changed: ACCESS_MODE_CHANGED,
            cart,
        };
        pak.power_on();
        pak
    }

    pub fn power_on(&mut self) {
        self.enabled = false;
        self.bank = 0;
        self.access_mode = if self.cart.is_some() {
            ACCESS_MODE_0
        } else {
            ACCESS_NO_CART
        };
        self.access_mode_changed = ACCESS_MODE_CHANGED;
        if let Some(cart) = self.cart.as_mut() {
            cart.power_on();
        }
    }

    /// Insert a cartridge, returning the one it replaces
    pub fn insert(&mut self, mut cart: GbCart<'c>) -> Option<GbCart<'c>> {
        cart.power_on();
        log(LogCategory::Pak, LogLevel::Info, || {
            format!("Transfer Pak: inserted \"{}\"", cart.header().title)
        });
        self.access_mode = ACCESS_MODE_0;
        self.access_mode_changed = ACCESS_MODE_CHANGED;
        self.cart.replace(cart)
    }

    pub fn eject(&mut self) -> Option<GbCart<'c>> {
        let cart = self.cart.take();
        if cart.is_some() {
            log(LogCategory::Pak, LogLevel::Info, || {
                "Transfer Pak: cartridge ejected".to_string()
            });
            self.access_mode = ACCESS_NO_CART;
            self.access_mode_changed = ACCESS_MODE_CHANGED;
        }
        cart
    }

    pub fn cart(&self) -> Option<&GbCart<'c>> {
        self.cart.as_ref()
    }

    pub fn cart_mut(&mut self) -> Option<&mut GbCart<'c>> {
        self.cart.as_mut()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn bank(&self) -> u8 {
        self.bank
    }

    pub fn access_mode(&self) -> u8 {
        self.access_mode
    }

    /// GB address behind a pak address in the cartridge window
    fn gb_address(&self, address: u16) -> u16 {
        address - 0xC000 + u16::from(self.bank & 3) * 0x4000
    }

    pub fn read(&mut self, address: u16, buf: &mut [u8]) {
        match address >> 12 {
            0x8 => buf.fill(if self.enabled { ENABLED } else { 0x00 }),
            0xB => {
                if self.enabled {
                    buf.fill(self.access_mode);
                    if self.access_mode != ACCESS_NO_CART {
                        if let Some(first) = buf.first_mut() {
                            *first |= self.access_mode_changed;
                        }
                    }
                    self.access_mode_changed = 0;
                }
            }
            0xC..=0xF => {
                if self.enabled {
                    let gb_addr = self.gb_address(address);
                    match self.cart.as_mut() {
                        Some(cart) => {
                            if let Err(e) = cart.read(gb_addr, buf) {
                                log(LogCategory::Pak, LogLevel::Warn, || {
                                    format!("Transfer Pak: GB read at 0x{:04X} failed: {}", gb_addr, e)
                                });
                                buf.fill(0xFF);
                            }
                        }
                        None => buf.fill(0xFF),
                    }
                }
            }
            _ => {
                log(LogCategory::Stubs, LogLevel::Debug, || {
                    format!("Transfer Pak: unknown read at 0x{:04X}", address)
                });
            }
        }
    }

    pub fn write(&mut self, address: u16, data: &[u8]) {
        let Some(&value) = data.last() else {
            return;
        };

        match address >> 12 {
            0x8 => match value {
                ENABLED => self.enabled = true,
                DISABLE => self.enabled = false,
                _ => {
                    log(LogCategory::Stubs, LogLevel::Debug, || {
                        format!("Transfer Pak: unknown enable value 0x{:02X}", value)
                    });
                }
            },
            0xA => {
                if self.enabled {
                    self.bank = value;
                    log(LogCategory::Pak, LogLevel::Trace, || {
                        format!("Transfer Pak: bank {}", value & 3)
                    });
                }
            }
            0xB => {
                if self.enabled {
                    self.access_mode = if self.cart.is_none() {
                        ACCESS_NO_CART
                    } else if value & 1 == 0 {
                        ACCESS_MODE_0
                    } else {
                        ACCESS_MODE_1
                    };
                }
            }
            0xC..=0xF => {
                if self.enabled {
                    let gb_addr = self.gb_address(address);
                    if let Some(cart) = self.cart.as_mut() {
                        if let Err(e) = cart.write(gb_addr, data) {
                            log(LogCategory::Pak, LogLevel::Warn, || {
                                format!("Transfer Pak: GB write at 0x{:04X} failed: {}", gb_addr, e)
                            });
                        }
                    }
                }
            }
            _ => {
                log(LogCategory::Stubs, LogLevel::Debug, || {
                    format!(
                        "Transfer Pak: unknown write at 0x{:04X} = 0x{:02X}",
                        address, value
                    )
                });
            }
        }
    }

    pub fn save_state(&self) -> serde_json::Value {
        serde_json::json!({
            "system": "transfer_pak",
            "version": STATE_VERSION,
            "enabled": self.enabled,
            "bank": self.bank,
            "access_mode": self.access_mode,
            "access_mode_changed": self.access_mode_changed,
            "cart": self.cart.as_ref().map(|cart| cart.save_state()),
        })
    }

    pub fn load_state(&mut self, v: &serde_json::Value) -> Result<(), N64Error> {
        let version = v.get("version").and_then(|v| v.as_u64()).unwrap_or(0);
        if version != STATE_VERSION {
            return Err(N64Error::State(format!(
                "unsupported Transfer Pak state version {}",
                version
            )));
        }

        let byte = |key: &str| -> Result<u8, N64Error> {
            v.get(key)
                .and_then(|v| v.as_u64())
                .and_then(|v| u8::try_from(v).ok())
                .ok_or_else(|| N64Error::State(format!("missing \"{}\"", key)))
        };
        let enabled = v
            .get("enabled")
            .and_then(|v| v.as_bool())
            .ok_or_else(|| N64Error::State("missing \"enabled\"".to_string()))?;
        let bank = byte("bank")?;
        let access_mode = byte("access_mode")?;
        let access_mode_changed = byte("access_mode_changed")?;

        match (v.get("cart").filter(|c| !c.is_null()), self.cart.as_mut()) {
            (Some(state), Some(cart)) => cart
                .load_state(state)
                .map_err(|e| N64Error::State(e.to_string()))?,
            (None, None) => {}
            _ => {
                return Err(N64Error::State(
                    "cartridge presence does not match the save state".to_string(),
                ))
            }
        }

        self.enabled = enabled;
        self.bank = bank;
        self.access_mode = access_mode;
        self.access_mode_changed = access_mode_changed;
        Ok(())
    }
}
