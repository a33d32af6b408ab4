//! Snapshot
//!
//! Host-facing view of the machine: registers, flags, timer and interrupt
//! registers, the CPU state and a memory view. It also carries the complete
//! machine state so an engine can be rebuilt from it.

use crate::bus::{Bus, MemoryBus};
use crate::common::{Byte, Word};
use crate::cpu::registers::Registers;
use crate::cpu::{Cpu, CpuState};
use crate::error::{Error, Result};
use crate::interrupts::{IE_ADDR, IF_ADDR};
use crate::timer::TAC_ADDR;
use serde::{Deserialize, Serialize};

/// Size of the full address space view
pub const ADDRESS_SPACE: usize = 0x10000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flags {
    pub z: bool,
    pub n: bool,
    pub h: bool,
    pub c: bool,
}

impl From<&Registers> for Flags {
    fn from(regs: &Registers) -> Self {
        Self {
            z: regs.flag_z(),
            n: regs.flag_n(),
            h: regs.flag_h(),
            c: regs.flag_c(),
        }
    }
}

/// DIV/TIMA/TMA/TAC as the CPU reads them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerRegisters {
    pub div: Byte,
    pub tima: Byte,
    pub tma: Byte,
    pub tac: Byte,
}

impl TimerRegisters {
    fn read(bus: &Bus) -> Self {
        Self {
            div: bus.timer.div(),
            tima: bus.timer.tima(),
            tma: bus.timer.tma(),
            tac: bus.read(TAC_ADDR),
        }
    }
}

/// Everything needed to resume execution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineState {
    pub(crate) cpu: Cpu,
    pub(crate) bus: Bus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub registers: Registers,
    pub flags: Flags,
    pub ime: bool,
    pub cpu_state: CpuState,
    pub timer: TimerRegisters,
    /// IE (0xFFFF)
    pub interrupt_enable: Byte,
    /// IF (0xFF0F) as read, upper bits set
    pub interrupt_flags: Byte,
    /// Clock cycles since the last reset
    pub cycles: u64,
    /// First address of `memory`
    pub memory_start: Word,
    /// Bytes as the CPU would read them, starting at `memory_start`
    pub memory: Vec<Byte>,
    pub(crate) machine: MachineState,
}

impl Snapshot {
    /// Capture `cpu` and `bus` with `len` bytes of memory from `start`
    pub fn capture(cpu: &Cpu, bus: &Bus, cycles: u64, start: Word, len: usize) -> Self {
        let len = len.min(ADDRESS_SPACE);
        Self {
            registers: cpu.regs,
            flags: Flags::from(&cpu.regs),
            ime: cpu.ime,
            cpu_state: cpu.state(),
            timer: TimerRegisters::read(bus),
            interrupt_enable: bus.read(IE_ADDR),
            interrupt_flags: bus.read(IF_ADDR),
            cycles,
            memory_start: start,
            memory: bus.memory_window(start, len),
            machine: MachineState {
                cpu: cpu.clone(),
                bus: bus.clone(),
            },
        }
    }

    /// Check the snapshot and hand back the machine it describes.
    ///
    /// The visible fields must agree with the carried state; a snapshot
    /// edited by hand, or one with resized buffers, is rejected.
    pub fn restore(&self) -> Result<(Cpu, Bus)> {
        let MachineState { cpu, bus } = &self.machine;

        if !bus.is_well_formed() {
            return Err(Error::InvalidSnapshot(
                "machine state is malformed".to_string(),
            ));
        }
        if self.memory.len() > ADDRESS_SPACE {
            return Err(Error::InvalidSnapshot(format!(
                "memory view is {} bytes, larger than the address space",
                self.memory.len()
            )));
        }
        if self.registers != cpu.regs || self.registers.f & 0x0F != 0 {
            return Err(Error::InvalidSnapshot(
                "register view disagrees with CPU state".to_string(),
            ));
        }
        if self.flags != Flags::from(&cpu.regs) {
            return Err(Error::InvalidSnapshot(
                "flag view disagrees with register F".to_string(),
            ));
        }
        if self.ime != cpu.ime || self.cpu_state != cpu.state() {
            return Err(Error::InvalidSnapshot(
                "CPU state view disagrees with CPU state".to_string(),
            ));
        }
        if self.timer != TimerRegisters::read(bus) {
            return Err(Error::InvalidSnapshot(
                "timer view disagrees with timer state".to_string(),
            ));
        }
        let interrupts = (bus.read(IE_ADDR), bus.read(IF_ADDR));
        if (self.interrupt_enable, self.interrupt_flags) != interrupts {
            return Err(Error::InvalidSnapshot(
                "interrupt view disagrees with IE/IF".to_string(),
            ));
        }
        if self.memory != bus.memory_window(self.memory_start, self.memory.len()) {
            return Err(Error::InvalidSnapshot(
                "memory view disagrees with bus contents".to_string(),
            ));
        }

        Ok((cpu.clone(), bus.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boot;

    fn post_boot_machine() -> (Cpu, Bus) {
        let mut cpu = Cpu::new();
        let mut bus = Bus::new();
        boot::reset(&mut cpu, &mut bus);
        (cpu, bus)
    }

    #[test]
    fn test_capture_post_boot() {
        let (cpu, bus) = post_boot_machine();
        let snap = Snapshot::capture(&cpu, &bus, 0, 0x0000, ADDRESS_SPACE);

        assert_eq!(snap.registers.pc, 0x0100);
        assert_eq!(snap.registers.sp, 0xFFFE);
        assert_eq!(
            snap.flags,
            Flags {
                z: true,
                n: false,
                h: true,
                c: true
            }
        );
        assert_eq!(snap.timer.div, 0xAB);
        assert_eq!(snap.timer.tac, 0xF8);
        assert_eq!(snap.interrupt_flags, 0xE1);
        assert_eq!(snap.memory.len(), ADDRESS_SPACE);
        assert_eq!(snap.memory[0xFF40], 0x91);
    }

    #[test]
    fn test_restore_round_trip() {
        let (cpu, mut bus) = post_boot_machine();
        bus.write(0xC123, 0x42);
        let snap = Snapshot::capture(&cpu, &bus, 1234, 0xC000, 0x200);
        let (cpu2, bus2) = snap.restore().unwrap();
        let again = Snapshot::capture(&cpu2, &bus2, 1234, 0xC000, 0x200);
        assert_eq!(snap, again);
    }

    #[test]
    fn test_window_clamped() {
        let (cpu, bus) = post_boot_machine();
        let snap = Snapshot::capture(&cpu, &bus, 0, 0xFFF0, 0x20000);
        assert_eq!(snap.memory.len(), ADDRESS_SPACE);
        // Wraps past 0xFFFF
        assert_eq!(snap.memory[0x10], bus.read(0x0000));
    }

    #[test]
    fn test_restore_rejects_edited_view() {
        let (cpu, bus) = post_boot_machine();
        let mut snap = Snapshot::capture(&cpu, &bus, 0, 0xC000, 16);
        snap.registers.a = 0x99;
        assert!(matches!(snap.restore(), Err(Error::InvalidSnapshot(_))));

        let mut snap = Snapshot::capture(&cpu, &bus, 0, 0xC000, 16);
        snap.memory[0] = 0x77;
        assert!(matches!(snap.restore(), Err(Error::InvalidSnapshot(_))));

        let mut snap = Snapshot::capture(&cpu, &bus, 0, 0xC000, 16);
        snap.flags.z = false;
        assert!(matches!(snap.restore(), Err(Error::InvalidSnapshot(_))));

        let mut snap = Snapshot::capture(&cpu, &bus, 0, 0xC000, 16);
        snap.timer.div = 0;
        assert!(matches!(snap.restore(), Err(Error::InvalidSnapshot(_))));

        let mut snap = Snapshot::capture(&cpu, &bus, 0, 0xC000, 16);
        snap.timer.tac = 0xFD;
        assert!(matches!(snap.restore(), Err(Error::InvalidSnapshot(_))));

        let mut snap = Snapshot::capture(&cpu, &bus, 0, 0xC000, 16);
        snap.interrupt_enable = 0x1F;
        assert!(matches!(snap.restore(), Err(Error::InvalidSnapshot(_))));

        let mut snap = Snapshot::capture(&cpu, &bus, 0, 0xC000, 16);
        snap.interrupt_flags = 0xFF;
        assert!(matches!(snap.restore(), Err(Error::InvalidSnapshot(_))));
    }

    #[test]
    fn test_restore_rejects_resized_memory() {
        let (cpu, bus) = post_boot_machine();
        let snap = Snapshot::capture(&cpu, &bus, 0, 0x0000, 0);
        let mut json = serde_json::to_value(&snap).unwrap();
        json["machine"]["bus"]["vram"] = serde_json::json!([0, 1, 2]);
        let broken: Snapshot = serde_json::from_value(json).unwrap();
        assert!(matches!(broken.restore(), Err(Error::InvalidSnapshot(_))));
    }

    #[test]
    fn test_restore_rejects_partial_timer_cycle() {
        let (cpu, bus) = post_boot_machine();
        let snap = Snapshot::capture(&cpu, &bus, 0, 0x0000, 0);
        let mut json = serde_json::to_value(&snap).unwrap();
        json["machine"]["bus"]["timer"]["leftover"] = serde_json::json!(u32::MAX);
        let broken: Snapshot = serde_json::from_value(json).unwrap();
        assert!(matches!(broken.restore(), Err(Error::InvalidSnapshot(_))));
    }

    #[test]
    fn test_json_round_trip() {
        let (cpu, bus) = post_boot_machine();
        let snap = Snapshot::capture(&cpu, &bus, 99, 0xFF00, 0x80);
        let text = serde_json::to_string(&snap).unwrap();
        let back: Snapshot = serde_json::from_str(&text).unwrap();
        assert_eq!(back, snap);
        assert!(back.restore().is_ok());
    }
}
