use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use emu_core::backend::{ManualClock, MemoryStorage};
use emu_gb::GbCart;

/// 1MB MBC3+TIMER+RAM+BATTERY image
fn bench_rom() -> Vec<u8> {
    let mut rom = vec![0; 0x100000];
    for (i, byte) in rom.iter_mut().enumerate() {
        *byte = (i >> 14) as u8 ^ i as u8;
    }
    rom[0x0147] = 0x10;
    rom[0x0149] = 0x03;
    rom
}

fn make_cart(clock: &ManualClock) -> GbCart<'_> {
    let rom = bench_rom();
    let mut cart = GbCart::new(
        || Ok(Box::new(MemoryStorage::read_only(rom))),
        |header| Ok(Box::new(MemoryStorage::zeroed(header.ram_size()))),
        Some(clock),
    )
    .unwrap();
    cart.write(0x0000, &[0x0A]).unwrap();
    cart
}

fn bench_byte_reads(c: &mut Criterion) {
    let mut group = c.benchmark_group("gb_cart_read_byte");
    let clock = ManualClock::new(0);
    let mut cart = make_cart(&clock);

    for (name, addr) in [("rom_fixed", 0x0150u16), ("rom_banked", 0x4150), ("ram", 0xA150)] {
        group.bench_function(name, |b| {
            let mut buf = [0u8; 1];
            b.iter(|| {
                cart.read(black_box(addr), &mut buf).unwrap();
                black_box(buf[0]);
            });
        });
    }

    group.finish();
}

fn bench_block_reads(c: &mut Criterion) {
    let mut group = c.benchmark_group("gb_cart_read_block");
    let clock = ManualClock::new(0);
    let mut cart = make_cart(&clock);

    for size in [32usize, 256, 0x4000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            let mut buf = vec![0u8; size];
            b.iter(|| {
                cart.read(black_box(0x4000), &mut buf).unwrap();
                black_box(buf[size - 1]);
            });
        });
    }

    group.finish();
}

fn bench_bank_switching(c: &mut Criterion) {
    let clock = ManualClock::new(0);
    let mut cart = make_cart(&clock);

    c.bench_function("gb_cart_bank_switch_and_read", |b| {
        let mut bank = 0u8;
        let mut buf = [0u8; 1];
        b.iter(|| {
            bank = bank.wrapping_add(1);
            cart.write(0x2000, &[bank]).unwrap();
            cart.read(0x4000, &mut buf).unwrap();
            black_box(buf[0]);
        });
    });
}

fn bench_rtc_latch(c: &mut Criterion) {
    let clock = ManualClock::new(0);
    let mut cart = make_cart(&clock);
    cart.write(0x4000, &[0x08]).unwrap();

    c.bench_function("gb_cart_rtc_latch_and_read", |b| {
        let mut buf = [0u8; 1];
        b.iter(|| {
            clock.advance(1);
            cart.write(0x6000, &[0x00]).unwrap();
            cart.write(0x6000, &[0x01]).unwrap();
            cart.read(0xA000, &mut buf).unwrap();
            black_box(buf[0]);
        });
    });
}

criterion_group!(
    benches,
    bench_byte_reads,
    bench_block_reads,
    bench_bank_switching,
    bench_rtc_latch
);
criterion_main!(benches);
