//! Interrupts
//!
//! This module implements the Game Boy interrupt controller: the IE register
//! (0xFFFF), the IF register (0xFF0F) and fixed-priority source selection.
//! IME is not kept here; it belongs to the CPU.

use crate::common::{Byte, Word};
use serde::{Deserialize, Serialize};

/// Interrupt Enable register address
pub const IE_ADDR: Word = 0xFFFF;

/// Interrupt Flags register address
pub const IF_ADDR: Word = 0xFF0F;

/// Only the low five bits of IE/IF name real sources.
const SOURCE_MASK: Byte = 0x1F;

/// Interrupt types supported by the Game Boy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InterruptType {
    /// VBlank interrupt (highest priority)
    VBlank,
    /// LCD STAT interrupt
    LcdStat,
    /// Timer interrupt
    Timer,
    /// Serial interrupt
    Serial,
    /// Joypad interrupt (lowest priority)
    Joypad,
}

impl InterruptType {
    /// Get the bit for this interrupt in IE/IF registers
    pub fn bit(&self) -> Byte {
        match self {
            InterruptType::VBlank => 0x01,
            InterruptType::LcdStat => 0x02,
            InterruptType::Timer => 0x04,
            InterruptType::Serial => 0x08,
            InterruptType::Joypad => 0x10,
        }
    }

    /// Get the interrupt vector address
    pub fn vector(&self) -> Word {
        match self {
            InterruptType::VBlank => 0x0040,
            InterruptType::LcdStat => 0x0048,
            InterruptType::Timer => 0x0050,
            InterruptType::Serial => 0x0058,
            InterruptType::Joypad => 0x0060,
        }
    }

    /// Get all interrupt types in priority order
    pub fn all() -> &'static [InterruptType] {
        &[
            InterruptType::VBlank,
            InterruptType::LcdStat,
            InterruptType::Timer,
            InterruptType::Serial,
            InterruptType::Joypad,
        ]
    }

    /// Highest-priority source whose bit is set in `mask`.
    pub fn highest(mask: Byte) -> Option<InterruptType> {
        InterruptType::all()
            .iter()
            .copied()
            .find(|source| mask & source.bit() != 0)
    }
}

/// IE/IF pair, bus-visible at 0xFFFF and 0xFF0F.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterruptController {
    /// Interrupt Enable register (0xFFFF). All eight bits are storage.
    pub ie: Byte,
    /// Interrupt Flags register (0xFF0F), low five bits.
    pub flags: Byte,
}

impl InterruptController {
    /// Create a controller with nothing enabled or requested
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the IF bit for `source`
    pub fn request(&mut self, source: InterruptType) {
        self.flags |= source.bit();
    }

    /// Clear the IF bit for `source`
    pub fn acknowledge(&mut self, source: InterruptType) {
        self.flags &= !source.bit();
    }

    /// Highest-priority source that is both requested and enabled
    pub fn pending(&self) -> Option<InterruptType> {
        InterruptType::highest(self.ie & self.flags & SOURCE_MASK)
    }

    /// Vector of the source `pending` would select
    pub fn pending_vector(&self) -> Option<Word> {
        self.pending().map(|source| source.vector())
    }

    /// Read IF or IE. IF's unused upper bits read back as 1.
    pub fn read(&self, address: Word) -> Byte {
        match address {
            IF_ADDR => self.flags | !SOURCE_MASK,
            IE_ADDR => self.ie,
            _ => 0xFF,
        }
    }

    /// Write IF or IE
    pub fn write(&mut self, address: Word, value: Byte) {
        match address {
            IF_ADDR => self.flags = value & SOURCE_MASK,
            IE_ADDR => self.ie = value,
            _ => {}
        }
    }
}
