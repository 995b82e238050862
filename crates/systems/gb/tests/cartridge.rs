use emu_core::backend::{ClockBackend, FileStorage, ManualClock, MemoryStorage};
use emu_core::config::DeviceConfig;
use emu_gb::{AccessError, Controller, GbCart, GbError, RtcRegister};

const BANK: usize = 0x4000;

/// ROM filled so that every byte identifies its bank
fn rom_image(cart_type: u8, banks: usize, ram_code: u8) -> Vec<u8> {
    let mut rom = vec![0; banks * BANK];
    for (bank, chunk) in rom.chunks_mut(BANK).enumerate() {
        chunk.fill(bank as u8);
    }
    rom[0x0134..0x0139].copy_from_slice(b"CLOCK");
    rom[0x0147] = cart_type;
    rom[0x0148] = 0x02;
    rom[0x0149] = ram_code;
    rom
}

fn read(cart: &mut GbCart, addr: u16, len: usize) -> Vec<u8> {
    let mut buf = vec![0; len];
    cart.read(addr, &mut buf).unwrap();
    buf
}

#[test]
fn test_mbc3_rtc_end_to_end() {
    let clock = ManualClock::new(1_700_000_000);
    let rom = rom_image(0x10, 8, 0x03);
    let mut cart = GbCart::new(
        || Ok(Box::new(MemoryStorage::read_only(rom))),
        |header| Ok(Box::new(MemoryStorage::zeroed(header.ram_size()))),
        Some(&clock),
    )
    .unwrap();
    cart.power_on();

    assert_eq!(cart.kind().controller, Controller::Mbc3);
    assert!(cart.rtc().is_some());

    cart.write(0x0000, &[0x0A]).unwrap();
    cart.write(0x2000, &[5]).unwrap();
    assert_eq!(read(&mut cart, 0x4000, 4), vec![5 % 8; 4]);

    // Seconds register set directly, then latched
    cart.write(0x4000, &[0x08]).unwrap();
    cart.write(0xA000, &[30]).unwrap();
    cart.write(0x6000, &[0x00]).unwrap();
    cart.write(0x6000, &[0x01]).unwrap();
    assert_eq!(read(&mut cart, 0xA000, 1), vec![30]);

    // Time moves on but reads stay latched until the next latch
    clock.advance(45);
    assert_eq!(read(&mut cart, 0xA000, 1), vec![30]);

    cart.write(0x6000, &[0x00]).unwrap();
    cart.write(0x6000, &[0x01]).unwrap();
    assert_eq!(read(&mut cart, 0xA000, 1), vec![15]);
    cart.write(0x4000, &[0x09]).unwrap();
    assert_eq!(read(&mut cart, 0xA000, 1), vec![1]);
}

#[test]
fn test_bank_select_pathological_values() {
    let banks = 16;
    let rom = rom_image(0x19, banks, 0x00);
    let mut cart = GbCart::new(
        || Ok(Box::new(MemoryStorage::read_only(rom))),
        |_| Ok(Box::new(MemoryStorage::zeroed(0))),
        None,
    )
    .unwrap();

    for written in [0usize, banks, 2 * banks - 1, 255, 511] {
        cart.write(0x2000, &[written as u8]).unwrap();
        cart.write(0x3000, &[(written >> 8) as u8]).unwrap();
        let expected = (written % banks) as u8;
        assert_eq!(read(&mut cart, 0x4000, 1), vec![expected], "bank {}", written);
        assert!(cart.effective_rom_bank() < banks);
    }
}

#[test]
fn test_rtc_day_carry_through_cart_window() {
    let clock = ManualClock::new(0);
    let rom = rom_image(0x0F, 4, 0x00);
    let mut cart = GbCart::new(
        || Ok(Box::new(MemoryStorage::read_only(rom))),
        |_| Ok(Box::new(MemoryStorage::zeroed(0))),
        Some(&clock),
    )
    .unwrap();
    cart.write(0x0000, &[0x0A]).unwrap();

    // Day 511, 23:59:59
    for (select, value) in [(0x0C, 0x01), (0x0B, 0xFF), (0x0A, 23), (0x09, 59), (0x08, 59)] {
        cart.write(0x4000, &[select]).unwrap();
        cart.write(0xA000, &[value]).unwrap();
    }

    clock.advance(1);
    cart.write(0x6000, &[0x00]).unwrap();
    cart.write(0x6000, &[0x01]).unwrap();

    cart.write(0x4000, &[0x0B]).unwrap();
    assert_eq!(read(&mut cart, 0xA000, 1), vec![0]);
    cart.write(0x4000, &[0x0C]).unwrap();
    assert_eq!(read(&mut cart, 0xA000, 1), vec![0x80]);

    let rtc = cart.rtc().unwrap();
    assert_eq!(rtc.read_register(RtcRegister::DayHigh), 0x80);
    assert_eq!(rtc.last_sync(), clock.now());
}

#[test]
fn test_battery_ram_persists_through_file_backend() {
    let path = std::env::temp_dir().join(format!("emu_gb_cart_{}.sav", std::process::id()));
    let _ = std::fs::remove_file(&path);

    let rom = rom_image(0x03, 4, 0x02);
    let mut cart = GbCart::new(
        || Ok(Box::new(MemoryStorage::read_only(rom.clone()))),
        |header| Ok(Box::new(FileStorage::open(&path, header.ram_size())?)),
        None,
    )
    .unwrap();
    cart.write(0x0000, &[0x0A]).unwrap();
    cart.write(0xA000, b"SAVE").unwrap();
    cart.ram_mut().flush().unwrap();
    drop(cart);

    let mut cart = GbCart::new(
        || Ok(Box::new(MemoryStorage::read_only(rom))),
        |header| Ok(Box::new(FileStorage::open(&path, header.ram_size())?)),
        None,
    )
    .unwrap();
    cart.write(0x0000, &[0x0A]).unwrap();
    assert_eq!(read(&mut cart, 0xA000, 4), b"SAVE".to_vec());

    let _ = std::fs::remove_file(&path);
}

#[test]
fn test_rtc_disabled_by_config_runs_without_clock() {
    let config = DeviceConfig::from_json_str(r#"{ "rtc": { "enabled": false } }"#).unwrap();
    let clock = ManualClock::new(0);

    let rom = rom_image(0x10, 4, 0x03);
    let mut cart = GbCart::with_config(
        || Ok(Box::new(MemoryStorage::read_only(rom.clone()))),
        |header| Ok(Box::new(MemoryStorage::zeroed(header.ram_size()))),
        None,
        &config.rtc,
    )
    .unwrap();
    assert!(cart.rtc().is_none());
    assert!(!cart.kind().rtc);

    cart.write(0x0000, &[0x0A]).unwrap();
    cart.write(0x4000, &[0x08]).unwrap();
    cart.write(0xA000, &[30]).unwrap();
    assert_eq!(read(&mut cart, 0xA000, 1), vec![0xFF]);

    // A clock handed over anyway is ignored
    let cart = GbCart::with_config(
        || Ok(Box::new(MemoryStorage::read_only(rom.clone()))),
        |header| Ok(Box::new(MemoryStorage::zeroed(header.ram_size()))),
        Some(&clock),
        &config.rtc,
    )
    .unwrap();
    assert!(cart.rtc().is_none());

    // Enabled (the default) still requires a clock
    let result = GbCart::new(
        || Ok(Box::new(MemoryStorage::read_only(rom))),
        |header| Ok(Box::new(MemoryStorage::zeroed(header.ram_size()))),
        None,
    );
    assert!(matches!(result, Err(GbError::MissingClock)));
}

#[test]
fn test_unmapped_window_reported() {
    let rom = rom_image(0x00, 2, 0x00);
    let mut cart = GbCart::new(
        || Ok(Box::new(MemoryStorage::read_only(rom))),
        |_| Ok(Box::new(MemoryStorage::zeroed(0))),
        None,
    )
    .unwrap();

    let mut buf = [0u8; 16];
    assert!(matches!(
        cart.read(0xC000, &mut buf),
        Err(AccessError::Unmapped { address: 0xC000, len: 16 })
    ));
    assert!(cart.read(0x7FF8, &mut buf).is_ok());
    assert_eq!(&buf[8..], &[0xFF; 8]);
}

#[test]
fn test_load_state_with_out_of_range_rtc_keeps_running() {
    let clock = ManualClock::new(0);
    let rom = rom_image(0x10, 4, 0x03);
    let mut cart = GbCart::new(
        || Ok(Box::new(MemoryStorage::read_only(rom))),
        |header| Ok(Box::new(MemoryStorage::zeroed(header.ram_size()))),
        Some(&clock),
    )
    .unwrap();

    let mut state = cart.save_state();
    state["cart"]["rtc"]["live"]["seconds"] = 255.into();
    state["cart"]["rtc"]["live"]["minutes"] = 255.into();
    state["cart"]["rtc"]["live"]["hours"] = 255.into();
    cart.load_state(&state).unwrap();

    clock.advance(1);
    cart.write(0x0000, &[0x0A]).unwrap();
    cart.write(0x6000, &[0x00]).unwrap();
    cart.write(0x6000, &[0x01]).unwrap();

    cart.write(0x4000, &[0x08]).unwrap();
    assert_eq!(read(&mut cart, 0xA000, 1), vec![0x00]);
    cart.write(0x4000, &[0x0A]).unwrap();
    assert_eq!(read(&mut cart, 0xA000, 1), vec![0x1F]);
}
