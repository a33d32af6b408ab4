//! Helpers for building small cartridge images in integration tests.

#![allow(dead_code)]

use dmg::cart::header_checksum;
use dmg::Emulator;

pub const BANK_SIZE: usize = 0x4000;

/// Offset inside every switchable bank that holds the bank number
pub const BANK_MARKER: usize = 0x2000;

/// Build a header-valid image.
///
/// The entry point jumps to 0x0150, where `program` is placed. `handlers`
/// are copied to the given addresses (interrupt vectors, usually).
pub fn build_rom(
    cart_type: u8,
    rom_code: u8,
    ram_code: u8,
    program: &[u8],
    handlers: &[(usize, &[u8])],
) -> Vec<u8> {
    let size = (32 * 1024) << rom_code as usize;
    let mut rom = vec![0u8; size];

    for (bank, chunk) in rom.chunks_mut(BANK_SIZE).enumerate().skip(1) {
        chunk[BANK_MARKER] = bank as u8;
    }

    rom[0x100..0x104].copy_from_slice(&[0x00, 0xC3, 0x50, 0x01]);
    rom[0x134..0x13C].copy_from_slice(b"TESTCART");
    rom[0x147] = cart_type;
    rom[0x148] = rom_code;
    rom[0x149] = ram_code;
    rom[0x14D] = header_checksum(&rom);

    rom[0x150..0x150 + program.len()].copy_from_slice(program);
    for (addr, code) in handlers {
        rom[*addr..*addr + code.len()].copy_from_slice(code);
    }
    rom
}

/// ROM-only cartridge running `program`
pub fn emulator_with(program: &[u8], handlers: &[(usize, &[u8])]) -> Emulator {
    let mut emu = Emulator::new();
    emu.load_cartridge(build_rom(0x00, 0x00, 0x00, program, handlers))
        .expect("test ROM should load");
    emu
}

/// Step until PC equals `pc`, giving up after `limit` steps
pub fn run_until_pc(emu: &mut Emulator, pc: u16, limit: usize) -> bool {
    for _ in 0..limit {
        if emu.snapshot_window(0, 0).registers.pc == pc {
            return true;
        }
        emu.step().expect("step");
    }
    false
}
