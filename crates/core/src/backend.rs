//! Storage and clock backends consumed by the device emulators.
//!
//! Cartridge ROM, battery RAM and the MBC3 real-time clock are all driven
//! through the two traits in this module. The devices never assume a medium:
//! a backend owns its bounds policy and its persistence.
//!
//! Two storage implementations and two clocks are provided for hosts:
//!
//! - [`MemoryStorage`]: plain `Vec<u8>` image, optionally read-only (ROM)
//! - [`FileStorage`]: in-memory image of a save file, persisted on `flush()`
//! - [`SystemClock`]: wall-clock seconds since the Unix epoch
//! - [`ManualClock`]: settable clock for hosts that drive time themselves

use crate::logging::{log, LogCategory, LogLevel};
use std::cell::Cell;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Access of {len} byte(s) at offset 0x{offset:X} exceeds backend size 0x{size:X}")]
    OutOfBounds {
        offset: usize,
        len: usize,
        size: usize,
    },
    #[error("Backend is read-only")]
    ReadOnly,
    #[error("Backend I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Byte-addressable store backing cartridge ROM or RAM
pub trait StorageBackend {
    /// Size of the store in bytes
    fn size(&self) -> usize;

    /// Fill `buf` with the bytes starting at `offset`
    fn read(&self, offset: usize, buf: &mut [u8]) -> Result<(), BackendError>;

    /// Store `data` starting at `offset`
    fn write(&mut self, offset: usize, data: &[u8]) -> Result<(), BackendError>;

    /// Persist pending writes; a no-op for volatile stores
    fn flush(&mut self) -> Result<(), BackendError> {
        Ok(())
    }
}

/// Monotonic time source, in whole seconds
pub trait ClockBackend {
    fn now(&self) -> u64;
}

fn check_range(offset: usize, len: usize, size: usize) -> Result<(), BackendError> {
    match offset.checked_add(len) {
        Some(end) if end <= size => Ok(()),
        _ => Err(BackendError::OutOfBounds { offset, len, size }),
    }
}

/// Vector-backed storage
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    data: Vec<u8>,
    read_only: bool,
}

impl MemoryStorage {
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            data,
            read_only: false,
        }
    }

    /// Storage that rejects writes (cartridge ROM)
    pub fn read_only(data: Vec<u8>) -> Self {
        Self {
            data,
            read_only: true,
        }
    }

    /// Zero-filled storage of `size` bytes
    pub fn zeroed(size: usize) -> Self {
        Self::new(vec![0; size])
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.data
    }
}

impl StorageBackend for MemoryStorage {
    fn size(&self) -> usize {
        self.data.len()
    }

    fn read(&self, offset: usize, buf: &mut [u8]) -> Result<(), BackendError> {
        check_range(offset, buf.len(), self.data.len())?;
        buf.copy_from_slice(&self.data[offset..offset + buf.len()]);
        Ok(())
    }

    fn write(&mut self, offset: usize, data: &[u8]) -> Result<(), BackendError> {
        if self.read_only {
            return Err(BackendError::ReadOnly);
        }
        check_range(offset, data.len(), self.data.len())?;
        self.data[offset..offset + data.len()].copy_from_slice(data);
        Ok(())
    }
}

/// Save-file storage: the file is read once and written back on [`FileStorage::flush`]
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    image: MemoryStorage,
    dirty: bool,
}

impl FileStorage {
    /// Open `path`, creating a zero-filled image of `size` bytes if the file is missing.
    ///
    /// An existing file shorter or longer than `size` is padded or truncated so the
    /// image always matches the size the cartridge header declares.
    pub fn open(path: impl AsRef<Path>, size: usize) -> Result<Self, BackendError> {
        let path = path.as_ref().to_path_buf();
        let mut data = match fs::read(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log(LogCategory::Backend, LogLevel::Info, || {
                    format!("Backend: {} not found, starting blank", path.display())
                });
                Vec::new()
            }
            Err(source) => return Err(BackendError::Io { path, source }),
        };

        if data.len() != size {
            log(LogCategory::Backend, LogLevel::Warn, || {
                format!(
                    "Backend: {} is {} bytes, expected {}; resizing image",
                    path.display(),
                    data.len(),
                    size
                )
            });
            data.resize(size, 0);
        }

        Ok(Self {
            path,
            image: MemoryStorage::new(data),
            dirty: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }
}

impl StorageBackend for FileStorage {
    fn size(&self) -> usize {
        self.image.size()
    }

    fn read(&self, offset: usize, buf: &mut [u8]) -> Result<(), BackendError> {
        self.image.read(offset, buf)
    }

    fn write(&mut self, offset: usize, data: &[u8]) -> Result<(), BackendError> {
        self.image.write(offset, data)?;
        self.dirty = true;
        Ok(())
    }

    /// Write the image back to disk if it changed since the last flush
    fn flush(&mut self) -> Result<(), BackendError> {
        if !self.dirty {
            return Ok(());
        }
        fs::write(&self.path, self.image.data()).map_err(|source| BackendError::Io {
            path: self.path.clone(),
            source,
        })?;
        self.dirty = false;
        log(LogCategory::Backend, LogLevel::Debug, || {
            format!("Backend: flushed {}", self.path.display())
        });
        Ok(())
    }
}

/// Host wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl ClockBackend for SystemClock {
    fn now(&self) -> u64 {
        // A clock set before 1970 reads as the epoch rather than failing the RTC
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }
}

/// Clock advanced explicitly by the host
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<u64>,
}

impl ManualClock {
    pub fn new(start: u64) -> Self {
        Self {
            now: Cell::new(start),
        }
    }

    pub fn set(&self, now: u64) {
        self.now.set(now);
    }

    pub fn advance(&self, seconds: u64) {
        self.now.set(self.now.get().saturating_add(seconds));
    }
}

impl ClockBackend for ManualClock {
    fn now(&self) -> u64 {
        self.now.get()
    }
}
