//! Error types
//!
//! Every fault the core can report. Bus accesses, timer ticks and interrupt
//! dispatch are total and never produce one of these.

use crate::common::{Byte, Word};
use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Reasons a cartridge header is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HeaderError {
    #[error("image is {0} bytes, too short to hold a cartridge header")]
    TooShort(usize),
    #[error("header checksum is {found:#04X}, computed {computed:#04X}")]
    Checksum { found: Byte, computed: Byte },
    #[error("unknown ROM size code {0:#04X}")]
    RomSizeCode(Byte),
    #[error("header declares {declared} bytes of ROM but the image is {actual} bytes")]
    RomSizeMismatch { declared: usize, actual: usize },
    #[error("unknown RAM size code {0:#04X}")]
    RamSizeCode(Byte),
    #[error("unsupported cartridge type {0:#04X}")]
    UnsupportedType(Byte),
}

/// Errors surfaced to the host.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Load-time: the cartridge header is inconsistent. The host may retry
    /// with another image.
    #[error("invalid ROM header: {0}")]
    InvalidRomHeader(#[from] HeaderError),

    /// Load-time: boot ROM images are exactly 256 bytes.
    #[error("boot ROM must be {expected} bytes, got {actual}")]
    InvalidBootRomSize { expected: usize, actual: usize },

    /// Run-time: the opcode at `pc` has no table entry. The CPU stays stalled
    /// at that address until reset.
    #[error("invalid opcode {opcode:#04X} at {pc:#06X}")]
    InvalidOpcode { opcode: Byte, pc: Word },

    /// Restore-time: a snapshot region has the wrong size.
    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(String),
}
