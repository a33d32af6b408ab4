//! Hand-assembled programs run through the public engine API.

mod common;

use common::{build_rom, emulator_with, run_until_pc};
use dmg::cpu::CpuState;
use dmg::{Emulator, Error};

#[test]
fn test_timer_interrupt_runs_handler() {
    let program = [
        0x3E, 0x04, 0xE0, 0xFF, // IE = Timer
        0x3E, 0xF0, 0xE0, 0x05, // TIMA = 0xF0
        0x3E, 0x05, 0xE0, 0x07, // TAC = enabled, 16 cycles
        0xAF, 0xE0, 0x0F, // IF = 0
        0xFB, // EI
        0x18, 0xFE, // JR -2
    ];
    let handler: &[u8] = &[0x3E, 0x42, 0xEA, 0x00, 0xC0, 0xD9];
    let mut emu = emulator_with(&program, &[(0x50, handler)]);

    emu.run_cycles(1000).unwrap();
    assert_eq!(emu.peek(0xC000), 0x42);
}

#[test]
fn test_vblank_served_before_timer() {
    let program = [
        0x3E, 0x05, 0xE0, 0xFF, // IE = VBlank | Timer
        0xE0, 0x0F, // IF = VBlank | Timer
        0xFB, // EI
        0x00, // NOP
        0x18, 0xFE, // JR -2
    ];
    // VBlank: (C000) = 1
    let vblank: &[u8] = &[0x3E, 0x01, 0xEA, 0x00, 0xC0, 0xD9];
    // Timer: (C001) = (C000)
    let timer: &[u8] = &[0xFA, 0x00, 0xC0, 0xEA, 0x01, 0xC0, 0xD9];
    let mut emu = emulator_with(&program, &[(0x40, vblank), (0x50, timer)]);

    emu.run_cycles(500).unwrap();
    assert_eq!(emu.peek(0xC000), 0x01);
    assert_eq!(emu.peek(0xC001), 0x01, "Timer handler ran after VBlank");
    assert_eq!(emu.snapshot().interrupt_flags, 0xE0);
}

#[test]
fn test_dispatch_pushes_pc_and_costs_20_cycles() {
    let program = [
        0x3E, 0x04, 0xE0, 0xFF, // IE = Timer
        0xE0, 0x0F, // IF = Timer
        0xFB, // EI
        0x00, // NOP
        0x18, 0xFE, // JR -2
    ];
    let mut emu = emulator_with(&program, &[]);

    // NOP, JP, LD, LDH, LDH, EI
    for _ in 0..6 {
        emu.step().unwrap();
    }
    assert_eq!(emu.cpu_state(), CpuState::Running, "EI is delayed");

    emu.step().unwrap(); // NOP after EI
    assert_eq!(emu.cpu_state(), CpuState::AwaitingInterruptDispatch);

    assert_eq!(emu.step().unwrap(), 20);
    let snap = emu.snapshot();
    assert_eq!(snap.registers.pc, 0x0050);
    assert_eq!(snap.registers.sp, 0xFFFC);
    assert!(!snap.ime);
    assert_eq!(snap.memory[0xFFFD], 0x01);
    assert_eq!(snap.memory[0xFFFC], 0x58);
    assert_eq!(snap.interrupt_flags & 0x04, 0);
}

#[test]
fn test_halt_bug_repeats_next_byte() {
    let program = [
        0x3E, 0x04, 0xE0, 0xFF, // IE = Timer
        0xE0, 0x0F, // IF = Timer
        0xAF, // XOR A
        0x76, // HALT with IME clear and an interrupt pending
        0x3C, // INC A, runs twice
        0xEA, 0x00, 0xC0, // LD (C000),A
        0x18, 0xFE, // JR -2
    ];
    let mut emu = emulator_with(&program, &[]);
    emu.run_cycles(200).unwrap();
    assert_eq!(emu.peek(0xC000), 0x02);
}

#[test]
fn test_halt_wakes_without_ime() {
    let program = [
        0x3E, 0x04, 0xE0, 0xFF, // IE = Timer
        0x3E, 0x05, 0xE0, 0x07, // TAC = enabled, 16 cycles
        0x3E, 0x99, // LD A,0x99
        0x76, // HALT
        0xEA, 0x00, 0xC0, // LD (C000),A
        0x18, 0xFE, // JR -2
    ];
    let mut emu = emulator_with(&program, &[]);

    for _ in 0..8 {
        emu.step().unwrap();
    }
    assert_eq!(emu.cpu_state(), CpuState::Halted);
    assert_eq!(emu.step().unwrap(), 4);

    emu.run_cycles(5000).unwrap();
    assert_eq!(emu.peek(0xC000), 0x99);
    let snap = emu.snapshot();
    assert_eq!(snap.registers.sp, 0xFFFE, "no dispatch without IME");
    assert_ne!(snap.cpu_state, CpuState::Halted);
}

#[test]
fn test_serial_output() {
    let program = [
        0x3E, b'O', 0xE0, 0x01, 0x3E, 0x81, 0xE0, 0x02, // send 'O'
        0x3E, b'K', 0xE0, 0x01, 0x3E, 0x81, 0xE0, 0x02, // send 'K'
        0x18, 0xFE,
    ];
    let mut emu = emulator_with(&program, &[]);
    emu.run_cycles(500).unwrap();
    assert_eq!(emu.serial_output(), b"OK");
    assert_eq!(emu.peek(0xFF0F) & 0x08, 0x08);
}

#[test]
fn test_invalid_opcode_reports_address() {
    let mut emu = emulator_with(&[0x00, 0xDD], &[]);
    let err = loop {
        if let Err(err) = emu.step() {
            break err;
        }
    };
    assert_eq!(
        err,
        Error::InvalidOpcode {
            opcode: 0xDD,
            pc: 0x0151
        }
    );
    assert_eq!(emu.snapshot().registers.pc, 0x0151);
    assert_eq!(emu.step(), Err(err));
}

#[test]
fn test_mbc1_bank_switch_from_code() {
    let program = [
        0x3E, 0x05, 0xEA, 0x00, 0x20, // LD (2000),5
        0xFA, 0x00, 0x60, // LD A,(6000)
        0xEA, 0x00, 0xC0, // LD (C000),A
        0x18, 0xFE,
    ];
    let mut emu = Emulator::new();
    emu.load_cartridge(build_rom(0x01, 0x02, 0x00, &program, &[]))
        .unwrap();
    assert!(run_until_pc(&mut emu, 0x015B, 50));
    assert_eq!(emu.peek(0xC000), 0x05);
}

#[test]
fn test_mbc1_external_ram_from_code() {
    let program = [
        0x3E, 0x0A, 0xEA, 0x00, 0x00, // enable RAM
        0x3E, 0x5A, 0xEA, 0x00, 0xA0, // (A000) = 5A
        0xAF, // XOR A
        0xFA, 0x00, 0xA0, // LD A,(A000)
        0xEA, 0x00, 0xC0, // LD (C000),A
        0x18, 0xFE,
    ];
    let mut emu = Emulator::new();
    emu.load_cartridge(build_rom(0x03, 0x00, 0x02, &program, &[]))
        .unwrap();
    emu.run_cycles(300).unwrap();
    assert_eq!(emu.peek(0xC000), 0x5A);
    assert_eq!(emu.peek(0xA000), 0x5A);
}

#[test]
fn test_div_write_resets() {
    let program = [
        0x3E, 0x12, 0xE0, 0x04, // DIV = anything
        0xF0, 0x04, // LDH A,(04)
        0xEA, 0x00, 0xC0, // LD (C000),A
        0x18, 0xFE,
    ];
    let mut emu = emulator_with(&program, &[]);
    assert_eq!(emu.peek(0xFF04), 0xAB);
    emu.run_cycles(100).unwrap();
    assert_eq!(emu.peek(0xC000), 0x00);
}

#[test]
fn test_call_ret_round_trip() {
    let program = [
        0x31, 0xFE, 0xDF, // LD SP,DFFE
        0xCD, 0x60, 0x01, // CALL 0160
        0xEA, 0x00, 0xC0, // LD (C000),A
        0x18, 0xFE,
    ];
    // 0x0160: LD A,0x77 ; RET
    let sub: &[u8] = &[0x3E, 0x77, 0xC9];
    let mut emu = emulator_with(&program, &[(0x160, sub)]);
    emu.run_cycles(200).unwrap();
    let snap = emu.snapshot();
    assert_eq!(snap.memory[0xC000], 0x77);
    assert_eq!(snap.registers.sp, 0xDFFE);
}
