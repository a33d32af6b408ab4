//! Emulator Core
//!
//! This module contains the main emulator structure that owns the CPU and
//! the bus and drives them one step at a time. It is the only surface a
//! host needs: load images, step, feed input, read snapshots.

use crate::boot;
use crate::bus::{Bus, MemoryBus};
use crate::cart::{Cartridge, RomHeader};
use crate::common::{Byte, Word};
use crate::cpu::{Cpu, CpuState};
use crate::error::Result;
use crate::gamepad::Button;
use crate::interrupts::InterruptType;
use crate::snapshot::{Snapshot, ADDRESS_SPACE};

/// Emulator context state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmulatorContext {
    /// Total clock cycles executed since reset
    pub ticks: u64,
    /// Steps taken since reset
    pub steps: u64,
}

/// Main Emulator structure
#[derive(Debug, Clone)]
pub struct Emulator {
    ctx: EmulatorContext,
    cpu: Cpu,
    bus: Bus,
}

impl Default for Emulator {
    fn default() -> Self {
        Self::new()
    }
}

impl Emulator {
    /// Create an engine with no cartridge, in post-boot state. The
    /// cartridge area reads 0xFF until `load_cartridge` succeeds.
    pub fn new() -> Self {
        let mut emu = Self {
            ctx: EmulatorContext::default(),
            cpu: Cpu::new(),
            bus: Bus::new(),
        };
        emu.reset();
        emu
    }

    /// Validate and insert a ROM image, then reset.
    ///
    /// On error the current cartridge and state are left as they were.
    pub fn load_cartridge(&mut self, rom: Vec<Byte>) -> Result<()> {
        let cart = Cartridge::from_bytes(rom)?;
        log::info!(
            "loaded {:?}: {} (0x{:02X}){}",
            cart.header.title,
            cart.header.cart_type_name(),
            cart.header.cart_type,
            if cart.header.has_battery() {
                ", battery-backed RAM"
            } else {
                ""
            }
        );
        self.bus.load_cartridge(cart);
        self.reset();
        Ok(())
    }

    /// Install a 256-byte boot image, then reset through it
    pub fn load_boot_rom(&mut self, image: &[Byte]) -> Result<()> {
        boot::validate_boot_rom(image)?;
        self.bus.set_boot_rom(image.to_vec());
        self.reset();
        Ok(())
    }

    /// Return to power-on state. The cartridge and boot image stay loaded.
    pub fn reset(&mut self) {
        boot::reset(&mut self.cpu, &mut self.bus);
        self.ctx = EmulatorContext::default();
    }

    /// Run one CPU step, advance the timer by the cycles it took and
    /// return that count in clock cycles.
    ///
    /// After an invalid opcode every call returns the same error and
    /// changes nothing.
    pub fn step(&mut self) -> Result<u32> {
        let was_stopped = self.cpu.state() == CpuState::Stopped;
        let cycles = self.cpu.step(&mut self.bus)?;

        // The divider is frozen while stopped
        if !was_stopped {
            self.bus.tick(cycles);
            self.cpu.settle_state(&self.bus);
        }

        self.ctx.ticks = self.ctx.ticks.wrapping_add(cycles as u64);
        self.ctx.steps = self.ctx.steps.wrapping_add(1);
        Ok(cycles)
    }

    /// Step until at least `budget` clock cycles have elapsed. Returns the
    /// cycles actually run.
    pub fn run_cycles(&mut self, budget: u64) -> Result<u64> {
        let mut elapsed = 0u64;
        while elapsed < budget {
            elapsed = elapsed.saturating_add(self.step()? as u64);
        }
        Ok(elapsed)
    }

    /// Press or release a button. A press on a selected line requests the
    /// Joypad interrupt; any press leaves STOP.
    pub fn set_input(&mut self, button: Button, pressed: bool) {
        if self.bus.gamepad.is_pressed(button) != pressed {
            log::debug!("{:?} {}", button, if pressed { "pressed" } else { "released" });
        }
        if self.bus.gamepad.set_button(button, pressed) {
            self.bus.interrupts.request(InterruptType::Joypad);
        }
        if pressed {
            self.cpu.release_stop();
        }
        self.cpu.settle_state(&self.bus);
    }

    /// Full snapshot with the whole address space
    pub fn snapshot(&self) -> Snapshot {
        self.snapshot_window(0x0000, ADDRESS_SPACE)
    }

    /// Snapshot with `len` bytes of memory starting at `start`
    pub fn snapshot_window(&self, start: Word, len: usize) -> Snapshot {
        Snapshot::capture(&self.cpu, &self.bus, self.ctx.ticks, start, len)
    }

    /// Rebuild an engine from a snapshot
    pub fn from_snapshot(snapshot: &Snapshot) -> Result<Self> {
        let (cpu, bus) = snapshot.restore()?;
        Ok(Self {
            ctx: EmulatorContext {
                ticks: snapshot.cycles,
                steps: 0,
            },
            cpu,
            bus,
        })
    }

    /// Side-effect-free view of `len` bytes from `start`, wrapping at 0xFFFF
    pub fn memory_window(&self, start: Word, len: usize) -> Vec<Byte> {
        self.bus.memory_window(start, len.min(ADDRESS_SPACE))
    }

    /// Read one byte as the CPU would see it
    pub fn peek(&self, address: Word) -> Byte {
        self.bus.read(address)
    }

    /// Bytes sent over the serial port since reset or the last
    /// `take_serial_output`. The buffer is unbounded and every snapshot
    /// copies it, so long-running hosts should drain it.
    pub fn serial_output(&self) -> &[Byte] {
        self.bus.serial.output()
    }

    /// Drain the serial output buffer
    pub fn take_serial_output(&mut self) -> Vec<Byte> {
        self.bus.serial.take_output()
    }

    pub fn cartridge_header(&self) -> Option<&RomHeader> {
        self.bus.cart.as_ref().map(|cart| &cart.header)
    }

    pub fn cpu_state(&self) -> CpuState {
        self.cpu.state()
    }

    /// Clock cycles since reset
    pub fn ticks(&self) -> u64 {
        self.ctx.ticks
    }

    pub fn steps(&self) -> u64 {
        self.ctx.steps
    }
}
