//! CPU Module
//!
//! The Sharp SM83 (LR35902) core. `step` runs exactly one unit of work:
//! an interrupt dispatch, one instruction, or one idle machine cycle while
//! halted or stopped.

pub mod execute;
pub mod fetch;
pub mod instructions;
pub mod registers;

use crate::bus::MemoryBus;
use crate::common::{Byte, Word, T_CYCLES_PER_M_CYCLE};
use crate::error::{Error, Result};
use registers::Registers;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Execution state of the CPU
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CpuState {
    #[default]
    Running,
    /// HALT executed; idle until IE & IF is non-zero
    Halted,
    /// STOP executed; idle until a button press or reset
    Stopped,
    /// IME is set and an enabled interrupt is pending; the next step
    /// dispatches it
    AwaitingInterruptDispatch,
}

/// CPU state for the Sharp LR35902 processor
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cpu {
    /// CPU registers (A, F, B, C, D, E, H, L, SP, PC)
    pub regs: Registers,
    /// Interrupt Master Enable flag
    pub ime: bool,
    /// IME will be enabled after next instruction (for EI instruction)
    pub enabling_ime: bool,
    /// Next opcode fetch does not advance PC
    pub halt_bug: bool,
    pub state: CpuState,
    /// Opcode and address of the invalid instruction the CPU stalled on
    pub fault: Option<(Byte, Word)>,
}

impl Cpu {
    /// CPU at power-on: every register zero, PC at the boot ROM entry
    pub fn new() -> Self {
        Self::default()
    }

    /// CPU as the boot ROM leaves it at 0x0100
    pub fn post_boot() -> Self {
        Self {
            regs: Registers::post_boot(),
            ..Self::default()
        }
    }

    pub fn state(&self) -> CpuState {
        self.state
    }

    /// Leave STOP mode. Called on a button press.
    pub fn release_stop(&mut self) {
        if self.state == CpuState::Stopped {
            log::debug!("leaving STOP at {:#06X}", self.regs.pc);
            self.state = CpuState::Running;
        }
    }

    /// Run one unit of work and return the clock cycles it took.
    ///
    /// Once an invalid opcode is hit every later call returns the same
    /// error and leaves all state untouched.
    pub fn step<B: MemoryBus>(&mut self, bus: &mut B) -> Result<u32> {
        if let Some((opcode, pc)) = self.fault {
            return Err(Error::InvalidOpcode { opcode, pc });
        }

        let m_cycles = match self.state {
            CpuState::Stopped => 1,
            CpuState::Halted if bus.pending_interrupt().is_none() => 1,
            _ => {
                self.state = CpuState::Running;
                self.run_next(bus)?
            }
        };

        self.settle_state(&*bus);
        Ok(m_cycles * T_CYCLES_PER_M_CYCLE)
    }

    /// Dispatch a pending interrupt or execute the next instruction
    fn run_next<B: MemoryBus>(&mut self, bus: &mut B) -> Result<u32> {
        if self.ime {
            if let Some(source) = bus.pending_interrupt() {
                return Ok(self.dispatch_interrupt(bus, source));
            }
        }

        // EI takes effect once the instruction after it starts
        if self.enabling_ime {
            self.ime = true;
            self.enabling_ime = false;
        }

        let pc = self.regs.pc;
        let (opcode, inst) = self.fetch_instruction(&*bus);
        if inst.is_invalid() {
            self.regs.pc = pc;
            self.fault = Some((opcode, pc));
            log::error!("invalid opcode {:#04X} at {:#06X}, CPU stalled", opcode, pc);
            return Err(Error::InvalidOpcode { opcode, pc });
        }

        let fetched = self.fetch_data(&*bus, inst);
        log::trace!(
            "{:04X}: {:02X} ({} bytes) {:?} {:?},{:?} data={:04X} {}",
            pc,
            opcode,
            inst.length(),
            inst.inst_type,
            inst.reg1,
            inst.reg2,
            fetched.data,
            self
        );
        Ok(self.execute(bus, inst, fetched))
    }

    /// Mark the CPU as about to dispatch when IME is set and an enabled
    /// interrupt is pending. Also called after the timer has advanced.
    pub fn settle_state<B: MemoryBus>(&mut self, bus: &B) {
        if matches!(
            self.state,
            CpuState::Running | CpuState::AwaitingInterruptDispatch
        ) {
            self.state = if self.ime && bus.pending_interrupt().is_some() {
                CpuState::AwaitingInterruptDispatch
            } else {
                CpuState::Running
            };
        }
    }
}

impl fmt::Display for Cpu {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PC={:04X} SP={:04X} AF={:04X} BC={:04X} DE={:04X} HL={:04X} IME={} {:?}",
            self.regs.pc,
            self.regs.sp,
            self.regs.af(),
            self.regs.bc(),
            self.regs.de(),
            self.regs.hl(),
            self.ime as u8,
            self.state
        )
    }
}
