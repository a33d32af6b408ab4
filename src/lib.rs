//! DMG Emulation Core
//!
//! A cycle-stepped core for the original Game Boy: the SM83 CPU, the memory
//! bus with cartridge mappers, the timer, interrupts, joypad and serial port.
//! Hosts drive it through [`emu::Emulator`] and read state back through
//! [`snapshot::Snapshot`]. Video and audio are not emulated.

pub mod common;
pub mod emu;
pub mod cpu;
pub mod bus;
pub mod cart;
pub mod timer;
pub mod ram;
pub mod gamepad;
pub mod serial;
pub mod interrupts;
pub mod boot;
pub mod snapshot;
pub mod error;

pub use emu::Emulator;
pub use error::{Error, HeaderError, Result};
pub use gamepad::Button;
pub use snapshot::Snapshot;
