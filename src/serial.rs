//! Serial port
//!
//! SB (0xFF01) and SC (0xFF02) with no cable attached. A transfer started on
//! the internal clock completes at once: the outgoing byte is recorded, SB
//! shifts in 0xFF (line dead), SC bit 7 clears and the caller raises the
//! Serial interrupt. Test ROMs print their results this way.

use crate::common::{Byte, Word};
use serde::{Deserialize, Serialize};

pub const SB_ADDR: Word = 0xFF01;
pub const SC_ADDR: Word = 0xFF02;

const TRANSFER_START: Byte = 0x80;
const INTERNAL_CLOCK: Byte = 0x01;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Serial {
    sb: Byte,
    sc: Byte,
    /// Bytes sent since the last `take_output`. Not bounded here; the host
    /// drains it.
    output: Vec<Byte>,
}

impl Serial {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn read(&self, address: Word) -> Byte {
        match address {
            SB_ADDR => self.sb,
            SC_ADDR => self.sc | 0x7E,
            _ => 0xFF,
        }
    }

    /// Write SB or SC. Returns true when a transfer completed and the
    /// Serial interrupt should be requested.
    pub fn write(&mut self, address: Word, value: Byte) -> bool {
        match address {
            SB_ADDR => {
                self.sb = value;
                false
            }
            SC_ADDR => {
                self.sc = value & (TRANSFER_START | INTERNAL_CLOCK);
                if self.sc == TRANSFER_START | INTERNAL_CLOCK {
                    log::trace!("serial out {:#04X}", self.sb);
                    self.output.push(self.sb);
                    self.sb = 0xFF;
                    self.sc &= !TRANSFER_START;
                    true
                } else {
                    false
                }
            }
            _ => false,
        }
    }

    /// Bytes sent and not yet taken
    pub fn output(&self) -> &[Byte] {
        &self.output
    }

    /// Drain the output buffer
    pub fn take_output(&mut self) -> Vec<Byte> {
        std::mem::take(&mut self.output)
    }
}
