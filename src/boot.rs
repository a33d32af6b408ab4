//! Boot / Reset
//!
//! Builds the power-on state. With a boot image the CPU starts from zeroed
//! registers at 0x0000 and the image overlays the cartridge until it writes
//! to 0xFF50. Without one the CPU and I/O registers are set to the values
//! the DMG boot ROM leaves when it jumps to 0x0100.

use crate::bus::Bus;
use crate::common::{Byte, Word};
use crate::cpu::Cpu;
use crate::error::{Error, Result};
use crate::interrupts::{IE_ADDR, IF_ADDR};
use crate::timer::Timer;

/// Boot images are exactly this many bytes
pub const BOOT_ROM_SIZE: usize = 0x100;

/// I/O register contents after the boot ROM, as (address, value)
pub const POST_BOOT_IO: [(Word, Byte); 33] = [
    (0xFF00, 0xCF), // P1
    (0xFF02, 0x7E), // SC
    (0xFF07, 0xF8), // TAC
    (IF_ADDR, 0xE1),
    (0xFF10, 0x80), // NR10
    (0xFF11, 0xBF),
    (0xFF12, 0xF3),
    (0xFF13, 0xFF),
    (0xFF14, 0xBF),
    (0xFF16, 0x3F), // NR21
    (0xFF17, 0x00),
    (0xFF18, 0xFF),
    (0xFF19, 0xBF),
    (0xFF1A, 0x7F), // NR30
    (0xFF1B, 0xFF),
    (0xFF1C, 0x9F),
    (0xFF1D, 0xFF),
    (0xFF1E, 0xBF),
    (0xFF20, 0xFF), // NR41
    (0xFF21, 0x00),
    (0xFF22, 0x00),
    (0xFF23, 0xBF),
    (0xFF24, 0x77), // NR50
    (0xFF25, 0xF3),
    (0xFF26, 0xF1),
    (0xFF40, 0x91), // LCDC
    (0xFF41, 0x85), // STAT
    (0xFF46, 0xFF), // DMA
    (0xFF47, 0xFC), // BGP
    (0xFF48, 0xFF), // OBP0
    (0xFF49, 0xFF), // OBP1
    (0xFF4A, 0x00), // WY
    (IE_ADDR, 0x00),
];

/// Check that a boot image has the right size
pub fn validate_boot_rom(image: &[Byte]) -> Result<()> {
    if image.len() != BOOT_ROM_SIZE {
        return Err(Error::InvalidBootRomSize {
            expected: BOOT_ROM_SIZE,
            actual: image.len(),
        });
    }
    Ok(())
}

/// Put `cpu` and `bus` into their power-on state.
///
/// The cartridge stays inserted. If the bus holds a boot image it is
/// mapped and run from 0x0000; otherwise post-boot values are loaded.
pub fn reset(cpu: &mut Cpu, bus: &mut Bus) {
    bus.power_on();

    if bus.has_boot_rom() {
        log::debug!("reset through boot ROM");
        *cpu = Cpu::new();
        return;
    }

    log::debug!("reset to post-boot state");
    *cpu = Cpu::post_boot();
    bus.timer = Timer::post_boot();
    for &(address, value) in POST_BOOT_IO.iter() {
        bus.set_io_raw(address, value);
    }
}
