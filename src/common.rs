//! Common types and utilities for the DMG core
//!
//! Type aliases matching the hardware word sizes, timing constants shared by
//! the CPU and timer, and small bit helpers.

/// 8-bit unsigned integer (Game Boy byte)
pub type Byte = u8;

/// 16-bit unsigned integer (Game Boy word / address)
pub type Word = u16;

/// Nominal DMG master clock in Hz. Hosts pace `step()` against this.
pub const CLOCK_HZ: u32 = 4_194_304;

/// Clock cycles per machine cycle.
pub const T_CYCLES_PER_M_CYCLE: u32 = 4;

/// Check if a specific bit is set in a byte value
#[inline]
pub fn bit(value: Byte, n: u8) -> bool {
    (value & (1 << n)) != 0
}

/// Set or clear a specific bit in a byte value
#[inline]
pub fn bit_set(value: &mut Byte, n: u8, on: bool) {
    if on {
        *value |= 1 << n;
    } else {
        *value &= !(1 << n);
    }
}

/// Build a word from its high and low bytes.
#[inline]
pub fn join(hi: Byte, lo: Byte) -> Word {
    ((hi as Word) << 8) | lo as Word
}

/// Split a word into `(hi, lo)`.
#[inline]
pub fn split(value: Word) -> (Byte, Byte) {
    ((value >> 8) as Byte, value as Byte)
}
