//! Engine lifecycle: loading, reset, boot ROM handover and snapshots.

mod common;

use common::{build_rom, emulator_with, run_until_pc};
use dmg::cpu::CpuState;
use dmg::snapshot::Snapshot;
use dmg::{Button, Emulator, Error, HeaderError};

#[test]
fn test_post_boot_snapshot() {
    let emu = emulator_with(&[0x18, 0xFE], &[]);
    let snap = emu.snapshot();

    assert_eq!(snap.registers.a, 0x01);
    assert_eq!(snap.registers.f, 0xB0);
    assert_eq!(snap.registers.bc(), 0x0013);
    assert_eq!(snap.registers.de(), 0x00D8);
    assert_eq!(snap.registers.hl(), 0x014D);
    assert_eq!(snap.registers.sp, 0xFFFE);
    assert_eq!(snap.registers.pc, 0x0100);
    assert!(snap.flags.z && snap.flags.h && snap.flags.c && !snap.flags.n);
    assert!(!snap.ime);
    assert_eq!(snap.cpu_state, CpuState::Running);
    assert_eq!(snap.timer.div, 0xAB);
    assert_eq!(snap.timer.tac, 0xF8);
    assert_eq!(snap.interrupt_flags, 0xE1);
    assert_eq!(snap.interrupt_enable, 0x00);
    assert_eq!(snap.cycles, 0);
    assert_eq!(snap.memory.len(), 0x10000);
}

#[test]
fn test_header_errors() {
    let mut emu = Emulator::new();

    assert_eq!(
        emu.load_cartridge(vec![0; 0x40]),
        Err(Error::InvalidRomHeader(HeaderError::TooShort(0x40)))
    );

    let mut rom = build_rom(0x00, 0x00, 0x00, &[], &[]);
    rom[0x14D] = rom[0x14D].wrapping_add(1);
    assert!(matches!(
        emu.load_cartridge(rom),
        Err(Error::InvalidRomHeader(HeaderError::Checksum { .. }))
    ));

    let mut rom = build_rom(0x01, 0x01, 0x00, &[], &[]);
    rom.truncate(0x8000);
    assert!(matches!(
        emu.load_cartridge(rom),
        Err(Error::InvalidRomHeader(HeaderError::RomSizeMismatch { .. }))
    ));

    let rom = build_rom(0x00, 0x00, 0x06, &[], &[]);
    assert_eq!(
        emu.load_cartridge(rom),
        Err(Error::InvalidRomHeader(HeaderError::RamSizeCode(0x06)))
    );

    let rom = build_rom(0x22, 0x00, 0x00, &[], &[]);
    assert_eq!(
        emu.load_cartridge(rom),
        Err(Error::InvalidRomHeader(HeaderError::UnsupportedType(0x22)))
    );

    // Nothing was inserted along the way
    assert!(emu.cartridge_header().is_none());
    assert_eq!(emu.peek(0x0134), 0xFF);
}

#[test]
fn test_header_info() {
    let emu = Emulator::new();
    assert!(emu.cartridge_header().is_none());

    let mut emu = Emulator::new();
    emu.load_cartridge(build_rom(0x13, 0x03, 0x03, &[], &[]))
        .unwrap();
    let header = emu.cartridge_header().unwrap();
    assert_eq!(header.title, "TESTCART");
    assert_eq!(header.cart_type_name(), "MBC3+RAM+BATTERY");
    assert_eq!(header.rom_size_bytes(), Ok(256 * 1024));
    assert_eq!(header.ram_size_bytes(), Ok(32 * 1024));
    assert!(header.has_battery());
}

#[test]
fn test_boot_rom_handover() {
    let mut emu = emulator_with(&[0x18, 0xFE], &[]);

    let mut boot = vec![0u8; 256];
    boot[..4].copy_from_slice(&[0x3E, 0x01, 0xE0, 0x50]); // LD A,1 ; LDH (50),A
    emu.load_boot_rom(&boot).unwrap();

    let snap = emu.snapshot();
    assert_eq!(snap.registers.pc, 0x0000);
    assert_eq!(snap.registers.af(), 0x0000);
    assert_eq!(snap.timer.div, 0x00);
    assert_eq!(emu.peek(0x0000), 0x3E);

    emu.step().unwrap();
    emu.step().unwrap();
    assert_eq!(emu.peek(0x0000), 0x00, "cartridge visible after FF50 write");

    // NOP sled in the cartridge leads to the entry point
    assert!(run_until_pc(&mut emu, 0x0150, 400));

    // Reset maps the boot image again
    emu.reset();
    assert_eq!(emu.peek(0x0000), 0x3E);
}

#[test]
fn test_boot_rom_wrong_size_keeps_state() {
    let mut emu = emulator_with(&[0x18, 0xFE], &[]);
    emu.step().unwrap();
    let before = emu.snapshot();
    assert_eq!(
        emu.load_boot_rom(&[0; 512]),
        Err(Error::InvalidBootRomSize {
            expected: 256,
            actual: 512
        })
    );
    assert_eq!(emu.snapshot(), before);
}

#[test]
fn test_snapshot_round_trip_through_json() {
    let program = [
        0x3E, 0x05, 0xE0, 0x07, // TAC = enabled
        0x21, 0x00, 0xC0, // LD HL,C000
        0x34, // INC (HL)
        0x18, 0xFD, // JR -3
    ];
    let mut emu = emulator_with(&program, &[]);
    emu.run_cycles(10_000).unwrap();

    let snap = emu.snapshot();
    let json = serde_json::to_string(&snap).unwrap();
    let parsed: Snapshot = serde_json::from_str(&json).unwrap();
    let mut restored = Emulator::from_snapshot(&parsed).unwrap();
    assert_eq!(restored.snapshot(), snap);

    // Both copies continue identically
    emu.run_cycles(5_000).unwrap();
    restored.run_cycles(5_000).unwrap();
    assert_eq!(restored.snapshot(), emu.snapshot());
}

#[test]
fn test_snapshot_rejects_tampering() {
    let emu = emulator_with(&[0x18, 0xFE], &[]);
    let mut snap = emu.snapshot();
    snap.registers.pc = 0x1234;
    assert!(matches!(
        Emulator::from_snapshot(&snap),
        Err(Error::InvalidSnapshot(_))
    ));
}

#[test]
fn test_windowed_snapshot() {
    let emu = emulator_with(&[0x18, 0xFE], &[]);
    let snap = emu.snapshot_window(0xFF00, 0x80);
    assert_eq!(snap.memory_start, 0xFF00);
    assert_eq!(snap.memory.len(), 0x80);
    assert_eq!(snap.memory[0x40], 0x91);
    assert_eq!(snap.memory[0x03], 0xFF);
    assert!(Emulator::from_snapshot(&snap).is_ok());
}

#[test]
fn test_memory_window_wraps() {
    let emu = Emulator::new();
    let window = emu.memory_window(0xFFFE, 4);
    assert_eq!(window.len(), 4);
    assert_eq!(window[1], 0x00, "IE");
    assert_eq!(window[2], 0xFF, "no cartridge at 0x0000");
}

#[test]
fn test_run_cycles_meets_budget() {
    let mut emu = emulator_with(&[0x00, 0x18, 0xFD], &[]);
    let ran = emu.run_cycles(1001).unwrap();
    assert!(ran >= 1001);
    assert!(ran < 1001 + 24);
    assert_eq!(emu.ticks(), ran);
}

#[test]
fn test_stop_released_by_button() {
    let program = [
        0x10, 0x00, // STOP
        0x3E, 0x33, 0xEA, 0x00, 0xC0, // (C000) = 33
        0x18, 0xFE,
    ];
    let mut emu = emulator_with(&program, &[]);
    emu.run_cycles(1000).unwrap();
    assert_eq!(emu.cpu_state(), CpuState::Stopped);
    assert_eq!(emu.peek(0xC000), 0x00);

    emu.set_input(Button::Select, true);
    emu.set_input(Button::Select, false);
    emu.run_cycles(100).unwrap();
    assert_eq!(emu.peek(0xC000), 0x33);
}

#[test]
fn test_reset_restores_post_boot() {
    let mut emu = emulator_with(&[0x3E, 0x42, 0xEA, 0x00, 0xC0, 0x18, 0xFE], &[]);
    let initial = emu.snapshot();
    emu.run_cycles(500).unwrap();
    assert_eq!(emu.peek(0xC000), 0x42);

    emu.reset();
    assert_eq!(emu.snapshot(), initial);
}
