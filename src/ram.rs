//! RAM
//!
//! Work RAM (WRAM, 0xC000-0xDFFF, also seen through echo RAM) and High RAM
//! (HRAM, 0xFF80-0xFFFE).

use crate::common::{Byte, Word};
use serde::{Deserialize, Serialize};

/// WRAM size: 8KB (0xC000-0xDFFF)
pub const WRAM_SIZE: usize = 0x2000;

/// HRAM size: 127 bytes (0xFF80-0xFFFE)
pub const HRAM_SIZE: usize = 0x7F;

/// RAM structure containing WRAM and HRAM
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ram {
    /// Work RAM (8KB)
    wram: Vec<Byte>,
    /// High RAM (127 bytes)
    hram: Vec<Byte>,
}

impl Default for Ram {
    fn default() -> Self {
        Self::new()
    }
}

impl Ram {
    /// Create a new RAM instance with all memory zeroed
    pub fn new() -> Self {
        Self {
            wram: vec![0; WRAM_SIZE],
            hram: vec![0; HRAM_SIZE],
        }
    }

    /// Check that both regions have their hardware sizes. Used when a
    /// snapshot is restored.
    pub fn is_well_formed(&self) -> bool {
        self.wram.len() == WRAM_SIZE && self.hram.len() == HRAM_SIZE
    }

    /// Read from WRAM (0xC000-0xDFFF)
    pub fn wram_read(&self, address: Word) -> Byte {
        let offset = (address.wrapping_sub(0xC000)) as usize;
        self.wram.get(offset).copied().unwrap_or(0xFF)
    }

    /// Write to WRAM (0xC000-0xDFFF)
    pub fn wram_write(&mut self, address: Word, value: Byte) {
        let offset = (address.wrapping_sub(0xC000)) as usize;
        if let Some(slot) = self.wram.get_mut(offset) {
            *slot = value;
        }
    }

    /// Read from HRAM (0xFF80-0xFFFE)
    pub fn hram_read(&self, address: Word) -> Byte {
        let offset = (address.wrapping_sub(0xFF80)) as usize;
        self.hram.get(offset).copied().unwrap_or(0xFF)
    }

    /// Write to HRAM (0xFF80-0xFFFE)
    pub fn hram_write(&mut self, address: Word, value: Byte) {
        let offset = (address.wrapping_sub(0xFF80)) as usize;
        if let Some(slot) = self.hram.get_mut(offset) {
            *slot = value;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wram_read_write() {
        let mut ram = Ram::new();
        ram.wram_write(0xC000, 0x42);
        ram.wram_write(0xDFFF, 0xAB);
        assert_eq!(ram.wram_read(0xC000), 0x42);
        assert_eq!(ram.wram_read(0xDFFF), 0xAB);
    }

    #[test]
    fn test_hram_read_write() {
        let mut ram = Ram::new();
        ram.hram_write(0xFF80, 0x12);
        ram.hram_write(0xFFFE, 0x34);
        assert_eq!(ram.hram_read(0xFF80), 0x12);
        assert_eq!(ram.hram_read(0xFFFE), 0x34);
    }

    #[test]
    fn test_out_of_range_reads_sentinel() {
        let mut ram = Ram::new();
        assert_eq!(ram.wram_read(0xE000), 0xFF);
        assert_eq!(ram.hram_read(0xFFFF), 0xFF);
        ram.hram_write(0xFFFF, 0x12);
        assert!(ram.is_well_formed());
    }
}
