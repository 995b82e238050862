//! Core primitives shared by the device emulators.
//!
//! - [`backend`]: storage and clock backends consumed by the devices
//! - [`config`]: host-facing JSON configuration
//! - [`cpu_mips_r4300i`]: R4300i register file primed by the boot simulation
//! - [`logging`]: category-filtered, rate-limited logging

pub mod backend;
pub mod config;
pub mod cpu_mips_r4300i;
pub mod logging;

pub use backend::{
    BackendError, ClockBackend, FileStorage, ManualClock, MemoryStorage, StorageBackend,
    SystemClock,
};
pub use config::{DeviceConfig, ResetType, TvType};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backends_as_trait_objects() {
        let mut storage: Box<dyn StorageBackend> = Box::new(MemoryStorage::zeroed(4));
        storage.write(0, &[9]).unwrap();

        let mut buf = [0u8; 1];
        storage.read(0, &mut buf).unwrap();
        assert_eq!(buf[0], 9);

        let clock = ManualClock::new(7);
        let clock_ref: &dyn ClockBackend = &clock;
        assert_eq!(clock_ref.now(), 7);
    }
}
