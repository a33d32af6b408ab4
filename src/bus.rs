//! Memory Bus
//!
//! This module implements the Game Boy memory bus, which routes
//! memory accesses to the appropriate hardware components based on address.

use crate::cart::Cartridge;
use crate::common::{Byte, Word};
use crate::gamepad::{Gamepad, JOYP_ADDR};
use crate::interrupts::{InterruptController, InterruptType, IE_ADDR, IF_ADDR};
use crate::ram::Ram;
use crate::serial::{Serial, SB_ADDR, SC_ADDR};
use crate::timer::{Timer, DIV_ADDR, TAC_ADDR};
use serde::{Deserialize, Serialize};

/// Memory bus trait for reading and writing memory
pub trait MemoryBus {
    /// Read a byte from the given address. Never has side effects.
    fn read(&self, address: Word) -> Byte;

    /// Write a byte to the given address
    fn write(&mut self, address: Word, value: Byte);

    /// Read a 16-bit word from the given address (little-endian)
    fn read16(&self, address: Word) -> Word {
        let lo = self.read(address) as Word;
        let hi = self.read(address.wrapping_add(1)) as Word;
        lo | (hi << 8)
    }

    /// Write a 16-bit word to the given address (little-endian)
    fn write16(&mut self, address: Word, value: Word) {
        self.write(address, (value & 0xFF) as Byte);
        self.write(address.wrapping_add(1), ((value >> 8) & 0xFF) as Byte);
    }

    /// Highest-priority interrupt that is both enabled and requested
    fn pending_interrupt(&self) -> Option<InterruptType> {
        InterruptType::highest(self.read(IE_ADDR) & self.read(IF_ADDR) & 0x1F)
    }

    /// Clear the IF bit of a serviced interrupt
    fn acknowledge_interrupt(&mut self, source: InterruptType) {
        let flags = self.read(IF_ADDR);
        self.write(IF_ADDR, flags & !source.bit());
    }
}

/// OAM DMA source register
pub const DMA_ADDR: Word = 0xFF46;

/// Writing non-zero here unmaps the boot ROM
pub const BOOT_LATCH_ADDR: Word = 0xFF50;

const VRAM_SIZE: usize = 0x2000;
const OAM_SIZE: usize = 0xA0;
const IO_SIZE: usize = 0x80;

/// I/O addresses that exist on the DMG. Everything else in 0xFF00-0xFF7F
/// reads 0xFF and drops writes.
pub fn io_mapped(address: Word) -> bool {
    matches!(
        address,
        0xFF00..=0xFF02
            | 0xFF04..=0xFF07
            | 0xFF0F
            | 0xFF10..=0xFF14
            | 0xFF16..=0xFF1E
            | 0xFF20..=0xFF26
            | 0xFF30..=0xFF3F
            | 0xFF40..=0xFF4B
            | BOOT_LATCH_ADDR
    )
}

/// Game Boy memory bus
///
/// Routes memory accesses to the appropriate hardware components:
/// - 0x0000-0x7FFF: Cartridge ROM (boot ROM over 0x0000-0x00FF while mapped)
/// - 0x8000-0x9FFF: VRAM
/// - 0xA000-0xBFFF: Cartridge RAM
/// - 0xC000-0xDFFF: WRAM
/// - 0xE000-0xFDFF: Echo RAM (mirror of 0xC000-0xDDFF)
/// - 0xFE00-0xFE9F: OAM
/// - 0xFEA0-0xFEFF: Unusable (reads 0xFF)
/// - 0xFF00-0xFF7F: I/O registers
/// - 0xFF80-0xFFFE: HRAM
/// - 0xFFFF: IE register
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bus {
    /// RAM (WRAM + HRAM)
    pub ram: Ram,
    /// IE/IF
    pub interrupts: InterruptController,
    pub timer: Timer,
    pub gamepad: Gamepad,
    pub serial: Serial,
    /// Cartridge (handles MBC)
    pub cart: Option<Cartridge>,
    vram: Vec<Byte>,
    oam: Vec<Byte>,
    /// LCD and sound registers, kept as plain storage
    io_regs: Vec<Byte>,
    /// 256-byte boot image, if one was supplied
    boot_rom: Option<Vec<Byte>>,
    /// Boot image currently overlays 0x0000-0x00FF
    boot_rom_mapped: bool,
}

impl Default for Bus {
    fn default() -> Self {
        Self::new()
    }
}

impl Bus {
    /// Create a new bus with all memory zeroed and nothing inserted
    pub fn new() -> Self {
        Self {
            ram: Ram::new(),
            interrupts: InterruptController::new(),
            timer: Timer::new(),
            gamepad: Gamepad::new(),
            serial: Serial::new(),
            cart: None,
            vram: vec![0; VRAM_SIZE],
            oam: vec![0; OAM_SIZE],
            io_regs: vec![0; IO_SIZE],
            boot_rom: None,
            boot_rom_mapped: false,
        }
    }

    /// Load cartridge into bus
    pub fn load_cartridge(&mut self, cart: Cartridge) {
        self.cart = Some(cart);
    }

    /// Install a boot image. It is mapped on the next power-on.
    pub fn set_boot_rom(&mut self, image: Vec<Byte>) {
        self.boot_rom = Some(image);
    }

    pub fn has_boot_rom(&self) -> bool {
        self.boot_rom.is_some()
    }

    pub fn boot_rom_mapped(&self) -> bool {
        self.boot_rom_mapped
    }

    /// Clear every volatile region and register as at power-on. The
    /// cartridge (with its RAM) and the boot image stay inserted; the
    /// mapper returns to its initial banking.
    pub fn power_on(&mut self) {
        let cart = self.cart.take();
        let boot_rom = self.boot_rom.take();
        *self = Self::new();
        self.cart = cart;
        if let Some(cart) = self.cart.as_mut() {
            cart.reset();
        }
        self.boot_rom_mapped = boot_rom.is_some();
        self.boot_rom = boot_rom;
    }

    /// Advance the clocked peripherals by `cycles` clock cycles
    pub fn tick(&mut self, cycles: u32) {
        self.timer.tick(cycles, &mut self.interrupts);
    }

    /// Set a register to its power-up value without side effects: no DMA
    /// transfer and no boot ROM unmapping.
    pub fn set_io_raw(&mut self, address: Word, value: Byte) {
        match address {
            DMA_ADDR | 0xFF10..=0xFF3F | 0xFF40..=0xFF4B => {
                if io_mapped(address) {
                    self.io_regs[(address - 0xFF00) as usize] = value;
                }
            }
            _ => self.write(address, value),
        }
    }

    /// Byte-for-byte view of the address space, as the CPU would read it
    pub fn memory_window(&self, start: Word, len: usize) -> Vec<Byte> {
        (0..len)
            .map(|offset| self.read(start.wrapping_add(offset as Word)))
            .collect()
    }

    /// All 64KB of the address space
    pub fn dump(&self) -> Vec<Byte> {
        self.memory_window(0x0000, 0x10000)
    }

    /// Check that every buffer has its hardware size. Used when a snapshot
    /// is restored.
    pub fn is_well_formed(&self) -> bool {
        self.ram.is_well_formed()
            && self.timer.is_well_formed()
            && self.vram.len() == VRAM_SIZE
            && self.oam.len() == OAM_SIZE
            && self.io_regs.len() == IO_SIZE
            && self
                .boot_rom
                .as_ref()
                .map_or(true, |image| image.len() == crate::boot::BOOT_ROM_SIZE)
            && self.cart.as_ref().map_or(true, Cartridge::is_well_formed)
    }

    /// Copy 160 bytes from `page << 8` into OAM
    fn oam_dma(&mut self, page: Byte) {
        let source = (page as Word) << 8;
        log::trace!("OAM DMA from {:#06X}", source);
        for offset in 0..OAM_SIZE {
            self.oam[offset] = self.read(source.wrapping_add(offset as Word));
        }
    }

    fn read_io(&self, address: Word) -> Byte {
        if !io_mapped(address) {
            return 0xFF;
        }
        match address {
            JOYP_ADDR => self.gamepad.read(),
            SB_ADDR | SC_ADDR => self.serial.read(address),
            DIV_ADDR..=TAC_ADDR => self.timer.read(address),
            IF_ADDR => self.interrupts.read(address),
            BOOT_LATCH_ADDR => 0xFF,
            _ => self.io_regs[(address - 0xFF00) as usize],
        }
    }

    fn write_io(&mut self, address: Word, value: Byte) {
        if !io_mapped(address) {
            log::trace!("dropped write to unused I/O {:#06X}", address);
            return;
        }
        match address {
            JOYP_ADDR => self.gamepad.write(value),
            SB_ADDR | SC_ADDR => {
                if self.serial.write(address, value) {
                    self.interrupts.request(InterruptType::Serial);
                }
            }
            DIV_ADDR..=TAC_ADDR => self.timer.write(address, value),
            IF_ADDR => self.interrupts.write(address, value),
            BOOT_LATCH_ADDR => {
                if value != 0 && self.boot_rom_mapped {
                    log::debug!("boot ROM unmapped");
                    self.boot_rom_mapped = false;
                }
            }
            DMA_ADDR => {
                self.io_regs[(address - 0xFF00) as usize] = value;
                self.oam_dma(value);
            }
            _ => self.io_regs[(address - 0xFF00) as usize] = value,
        }
    }
}

impl MemoryBus for Bus {
    fn read(&self, address: Word) -> Byte {
        match address {
            // Boot ROM overlay (0x0000-0x00FF)
            0x0000..=0x00FF if self.boot_rom_mapped => match &self.boot_rom {
                Some(image) => image.get(address as usize).copied().unwrap_or(0xFF),
                None => 0xFF,
            },
            // Cartridge ROM (0x0000-0x7FFF) and RAM (0xA000-0xBFFF)
            0x0000..=0x7FFF | 0xA000..=0xBFFF => match &self.cart {
                Some(cart) => cart.read(address),
                None => 0xFF,
            },
            0x8000..=0x9FFF => self.vram[(address - 0x8000) as usize],
            0xC000..=0xDFFF => self.ram.wram_read(address),
            // Echo RAM (0xE000-0xFDFF) - mirror of WRAM
            0xE000..=0xFDFF => self.ram.wram_read(address - 0x2000),
            0xFE00..=0xFE9F => self.oam[(address - 0xFE00) as usize],
            // Unusable (0xFEA0-0xFEFF)
            0xFEA0..=0xFEFF => 0xFF,
            0xFF00..=0xFF7F => self.read_io(address),
            0xFF80..=0xFFFE => self.ram.hram_read(address),
            0xFFFF => self.interrupts.read(address),
        }
    }

    fn write(&mut self, address: Word, value: Byte) {
        match address {
            // Cartridge ROM (0x0000-0x7FFF) - writes go to MBC
            0x0000..=0x7FFF | 0xA000..=0xBFFF => {
                if let Some(cart) = self.cart.as_mut() {
                    cart.write(address, value);
                }
            }
            0x8000..=0x9FFF => self.vram[(address - 0x8000) as usize] = value,
            0xC000..=0xDFFF => self.ram.wram_write(address, value),
            0xE000..=0xFDFF => self.ram.wram_write(address - 0x2000, value),
            0xFE00..=0xFE9F => self.oam[(address - 0xFE00) as usize] = value,
            // Unusable (0xFEA0-0xFEFF) - ignored
            0xFEA0..=0xFEFF => {}
            0xFF00..=0xFF7F => self.write_io(address, value),
            0xFF80..=0xFFFE => self.ram.hram_write(address, value),
            0xFFFF => self.interrupts.write(address, value),
        }
    }

    fn pending_interrupt(&self) -> Option<InterruptType> {
        self.interrupts.pending()
    }

    fn acknowledge_interrupt(&mut self, source: InterruptType) {
        self.interrupts.acknowledge(source);
    }
}
