//! Instruction Execution
//!
//! Instruction bodies, the ALU, stack helpers and interrupt dispatch.

use super::fetch::Fetched;
use super::instructions::{
    cb_instruction_by_opcode, AddressingMode, ConditionType, Instruction, InstructionType,
    RegisterType,
};
use super::{Cpu, CpuState};
use crate::bus::MemoryBus;
use crate::common::{join, split, Byte, Word};
use crate::interrupts::InterruptType;

/// Machine cycles spent dispatching an interrupt
pub const DISPATCH_M_CYCLES: u32 = 5;

impl Cpu {
    /// Check condition for conditional instructions
    fn check_condition(&self, cond: ConditionType) -> bool {
        match cond {
            ConditionType::None => true,
            ConditionType::Z => self.regs.flag_z(),
            ConditionType::Nz => !self.regs.flag_z(),
            ConditionType::C => self.regs.flag_c(),
            ConditionType::Nc => !self.regs.flag_c(),
        }
    }

    /// Run one decoded instruction. Returns the machine cycles it cost.
    pub fn execute<B: MemoryBus>(&mut self, bus: &mut B, inst: &Instruction, fetched: Fetched) -> u32 {
        let mut taken = false;

        match inst.inst_type {
            // Rejected in `step` before any operand is read
            InstructionType::Invalid => {}
            InstructionType::Nop => {}
            InstructionType::Ld => self.proc_ld(bus, inst, fetched),
            InstructionType::Ldh => self.proc_ldh(bus, inst, fetched),
            InstructionType::Inc => self.proc_inc(bus, inst, fetched),
            InstructionType::Dec => self.proc_dec(bus, inst, fetched),
            InstructionType::Add => self.proc_add(inst, fetched),
            InstructionType::Adc => self.alu_add(fetched.data as Byte, true),
            InstructionType::Sub => self.regs.a = self.alu_sub(fetched.data as Byte, false),
            InstructionType::Sbc => self.regs.a = self.alu_sub(fetched.data as Byte, true),
            InstructionType::And => self.proc_and(fetched.data as Byte),
            InstructionType::Xor => self.proc_xor(fetched.data as Byte),
            InstructionType::Or => self.proc_or(fetched.data as Byte),
            InstructionType::Cp => {
                self.alu_sub(fetched.data as Byte, false);
            }
            InstructionType::Jr => taken = self.proc_jr(inst, fetched),
            InstructionType::Jp => taken = self.proc_jp(inst, fetched),
            InstructionType::Call => taken = self.proc_call(bus, inst, fetched),
            InstructionType::Ret => taken = self.proc_ret(bus, inst),
            InstructionType::Reti => self.proc_reti(bus),
            InstructionType::Rst => self.proc_rst(bus, inst),
            InstructionType::Pop => {
                let value = self.stack_pop16(bus);
                self.write_reg(inst.reg1, value);
            }
            InstructionType::Push => {
                let value = self.read_reg(inst.reg1);
                self.stack_push16(bus, value);
            }
            InstructionType::Rlca => self.proc_rlca(),
            InstructionType::Rrca => self.proc_rrca(),
            InstructionType::Rla => self.proc_rla(),
            InstructionType::Rra => self.proc_rra(),
            InstructionType::Stop => self.proc_stop(),
            InstructionType::Halt => self.proc_halt(&*bus),
            InstructionType::Daa => self.proc_daa(),
            InstructionType::Cpl => self.proc_cpl(),
            InstructionType::Scf => self.proc_scf(),
            InstructionType::Ccf => self.proc_ccf(),
            InstructionType::Di => {
                self.ime = false;
                self.enabling_ime = false;
            }
            InstructionType::Ei => self.enabling_ime = true,
            InstructionType::Cb => return self.proc_cb(bus, fetched.data as Byte),
            // Only reachable through the CB table
            InstructionType::Rlc
            | InstructionType::Rrc
            | InstructionType::Rl
            | InstructionType::Rr
            | InstructionType::Sla
            | InstructionType::Sra
            | InstructionType::Swap
            | InstructionType::Srl
            | InstructionType::Bit
            | InstructionType::Res
            | InstructionType::Set => {}
        }

        if taken {
            inst.cycles_taken as u32
        } else {
            inst.cycles as u32
        }
    }

    // ========== Instruction Processors ==========

    fn proc_ld<B: MemoryBus>(&mut self, bus: &mut B, inst: &Instruction, fetched: Fetched) {
        if let Some(dest) = fetched.mem_dest {
            if inst.reg2.is_16bit() {
                // LD (a16),SP
                bus.write16(dest, fetched.data);
            } else {
                bus.write(dest, fetched.data as Byte);
            }
            return;
        }

        if inst.mode == AddressingMode::HlSpr {
            let value = self.add_sp_offset(fetched.data as Byte);
            self.regs.set_hl(value);
            return;
        }

        self.write_reg(inst.reg1, fetched.data);
    }

    fn proc_ldh<B: MemoryBus>(&mut self, bus: &mut B, inst: &Instruction, fetched: Fetched) {
        match fetched.mem_dest {
            Some(dest) => bus.write(dest, self.regs.a),
            None if inst.reg1 == RegisterType::A => {
                self.regs.a = bus.read(0xFF00 | fetched.data);
            }
            None => {}
        }
    }

    fn proc_inc<B: MemoryBus>(&mut self, bus: &mut B, inst: &Instruction, fetched: Fetched) {
        if let Some(dest) = fetched.mem_dest {
            let value = (fetched.data as Byte).wrapping_add(1);
            bus.write(dest, value);
            self.set_inc_flags(value);
        } else if inst.reg1.is_16bit() {
            // 16-bit INC leaves flags alone
            self.write_reg(inst.reg1, fetched.data.wrapping_add(1));
        } else {
            let value = (fetched.data as Byte).wrapping_add(1);
            self.write_reg(inst.reg1, value as Word);
            self.set_inc_flags(value);
        }
    }

    fn proc_dec<B: MemoryBus>(&mut self, bus: &mut B, inst: &Instruction, fetched: Fetched) {
        if let Some(dest) = fetched.mem_dest {
            let value = (fetched.data as Byte).wrapping_sub(1);
            bus.write(dest, value);
            self.set_dec_flags(value);
        } else if inst.reg1.is_16bit() {
            self.write_reg(inst.reg1, fetched.data.wrapping_sub(1));
        } else {
            let value = (fetched.data as Byte).wrapping_sub(1);
            self.write_reg(inst.reg1, value as Word);
            self.set_dec_flags(value);
        }
    }

    /// INC r / INC (HL): C is kept
    fn set_inc_flags(&mut self, result: Byte) {
        self.regs.set_flag_z(result == 0);
        self.regs.set_flag_n(false);
        self.regs.set_flag_h(result & 0x0F == 0);
    }

    /// DEC r / DEC (HL): C is kept
    fn set_dec_flags(&mut self, result: Byte) {
        self.regs.set_flag_z(result == 0);
        self.regs.set_flag_n(true);
        self.regs.set_flag_h(result & 0x0F == 0x0F);
    }

    fn proc_add(&mut self, inst: &Instruction, fetched: Fetched) {
        match inst.reg1 {
            RegisterType::Sp => {
                self.regs.sp = self.add_sp_offset(fetched.data as Byte);
            }
            RegisterType::Hl => {
                let hl = self.regs.hl();
                let value = fetched.data;
                let h = (hl & 0x0FFF) + (value & 0x0FFF) > 0x0FFF;
                let c = (hl as u32) + (value as u32) > 0xFFFF;
                self.regs.set_hl(hl.wrapping_add(value));
                self.regs.set_flag_n(false);
                self.regs.set_flag_h(h);
                self.regs.set_flag_c(c);
            }
            _ => self.alu_add(fetched.data as Byte, false),
        }
    }

    /// SP plus a signed offset, flags from the unsigned low-byte add.
    /// Shared by ADD SP,e and LD HL,SP+e.
    fn add_sp_offset(&mut self, offset: Byte) -> Word {
        let sp = self.regs.sp;
        let h = (sp & 0x0F) + (offset as Word & 0x0F) > 0x0F;
        let c = (sp & 0xFF) + offset as Word > 0xFF;
        self.regs.set_flags(false, false, h, c);
        sp.wrapping_add(offset as i8 as i16 as Word)
    }

    /// ADD/ADC into A
    pub(crate) fn alu_add(&mut self, value: Byte, with_carry: bool) {
        let a = self.regs.a;
        let carry = (with_carry && self.regs.flag_c()) as Byte;
        let result = a.wrapping_add(value).wrapping_add(carry);
        let h = (a & 0x0F) + (value & 0x0F) + carry > 0x0F;
        let c = (a as u16) + (value as u16) + (carry as u16) > 0xFF;
        self.regs.a = result;
        self.regs.set_flags(result == 0, false, h, c);
    }

    /// SUB/SBC/CP against A. Sets flags and returns the difference without
    /// storing it.
    pub(crate) fn alu_sub(&mut self, value: Byte, with_carry: bool) -> Byte {
        let a = self.regs.a;
        let carry = (with_carry && self.regs.flag_c()) as Byte;
        let result = a.wrapping_sub(value).wrapping_sub(carry);
        let h = (a & 0x0F) < (value & 0x0F) + carry;
        let c = (a as u16) < (value as u16) + (carry as u16);
        self.regs.set_flags(result == 0, true, h, c);
        result
    }

    fn proc_and(&mut self, value: Byte) {
        self.regs.a &= value;
        self.regs.set_flags(self.regs.a == 0, false, true, false);
    }

    fn proc_xor(&mut self, value: Byte) {
        self.regs.a ^= value;
        self.regs.set_flags(self.regs.a == 0, false, false, false);
    }

    fn proc_or(&mut self, value: Byte) {
        self.regs.a |= value;
        self.regs.set_flags(self.regs.a == 0, false, false, false);
    }

    fn proc_jr(&mut self, inst: &Instruction, fetched: Fetched) -> bool {
        let rel = fetched.data as Byte as i8;
        let addr = self.regs.pc.wrapping_add(rel as i16 as Word);
        self.jump_to_if(addr, inst.cond)
    }

    fn proc_jp(&mut self, inst: &Instruction, fetched: Fetched) -> bool {
        self.jump_to_if(fetched.data, inst.cond)
    }

    fn proc_call<B: MemoryBus>(&mut self, bus: &mut B, inst: &Instruction, fetched: Fetched) -> bool {
        if !self.check_condition(inst.cond) {
            return false;
        }
        self.stack_push16(bus, self.regs.pc);
        self.regs.pc = fetched.data;
        true
    }

    fn proc_ret<B: MemoryBus>(&mut self, bus: &mut B, inst: &Instruction) -> bool {
        if !self.check_condition(inst.cond) {
            return false;
        }
        self.regs.pc = self.stack_pop16(bus);
        true
    }

    fn proc_reti<B: MemoryBus>(&mut self, bus: &mut B) {
        self.ime = true;
        self.regs.pc = self.stack_pop16(bus);
    }

    fn proc_rst<B: MemoryBus>(&mut self, bus: &mut B, inst: &Instruction) {
        self.stack_push16(bus, self.regs.pc);
        self.regs.pc = inst.param as Word;
    }

    fn proc_rlca(&mut self) {
        let carry = self.regs.a >> 7;
        self.regs.a = self.regs.a.rotate_left(1);
        self.regs.set_flags(false, false, false, carry != 0);
    }

    fn proc_rrca(&mut self) {
        let carry = self.regs.a & 1;
        self.regs.a = self.regs.a.rotate_right(1);
        self.regs.set_flags(false, false, false, carry != 0);
    }

    fn proc_rla(&mut self) {
        let carry = self.regs.a >> 7;
        self.regs.a = (self.regs.a << 1) | self.regs.flag_c() as Byte;
        self.regs.set_flags(false, false, false, carry != 0);
    }

    fn proc_rra(&mut self) {
        let carry = self.regs.a & 1;
        self.regs.a = (self.regs.a >> 1) | ((self.regs.flag_c() as Byte) << 7);
        self.regs.set_flags(false, false, false, carry != 0);
    }

    fn proc_stop(&mut self) {
        log::debug!("STOP at {:#06X}", self.regs.pc.wrapping_sub(2));
        self.state = CpuState::Stopped;
    }

    fn proc_halt<B: MemoryBus>(&mut self, bus: &B) {
        if !self.ime && bus.pending_interrupt().is_some() {
            // HALT-bug: the CPU keeps running and fails to advance PC once
            self.halt_bug = true;
        } else {
            self.state = CpuState::Halted;
        }
    }

    fn proc_daa(&mut self) {
        let mut adjust: Byte = 0;
        let mut carry = false;

        if self.regs.flag_h() || (!self.regs.flag_n() && (self.regs.a & 0x0F) > 9) {
            adjust = 0x06;
        }

        if self.regs.flag_c() || (!self.regs.flag_n() && self.regs.a > 0x99) {
            adjust |= 0x60;
            carry = true;
        }

        if self.regs.flag_n() {
            self.regs.a = self.regs.a.wrapping_sub(adjust);
        } else {
            self.regs.a = self.regs.a.wrapping_add(adjust);
        }

        self.regs.set_flag_z(self.regs.a == 0);
        self.regs.set_flag_h(false);
        self.regs.set_flag_c(carry);
    }

    fn proc_cpl(&mut self) {
        self.regs.a = !self.regs.a;
        self.regs.set_flag_n(true);
        self.regs.set_flag_h(true);
    }

    fn proc_scf(&mut self) {
        self.regs.set_flag_n(false);
        self.regs.set_flag_h(false);
        self.regs.set_flag_c(true);
    }

    fn proc_ccf(&mut self) {
        self.regs.set_flag_n(false);
        self.regs.set_flag_h(false);
        self.regs.set_flag_c(!self.regs.flag_c());
    }

    /// Execute a CB-prefixed opcode. Returns its full cost, prefix included.
    fn proc_cb<B: MemoryBus>(&mut self, bus: &mut B, opcode: Byte) -> u32 {
        let inst = cb_instruction_by_opcode(opcode);
        let on_hl = inst.mode == AddressingMode::MemoryRegisterOnly;
        let bit = inst.param;

        let value = if on_hl {
            bus.read(self.regs.hl())
        } else {
            self.read_reg(inst.reg1) as Byte
        };

        let carry_in = self.regs.flag_c();
        let (result, carry) = match inst.inst_type {
            InstructionType::Bit => {
                self.regs.set_flag_z(value & (1 << bit) == 0);
                self.regs.set_flag_n(false);
                self.regs.set_flag_h(true);
                return inst.cycles as u32;
            }
            InstructionType::Res => {
                self.write_cb_result(bus, inst.reg1, value & !(1 << bit));
                return inst.cycles as u32;
            }
            InstructionType::Set => {
                self.write_cb_result(bus, inst.reg1, value | (1 << bit));
                return inst.cycles as u32;
            }
            InstructionType::Rlc => (value.rotate_left(1), value >> 7 != 0),
            InstructionType::Rrc => (value.rotate_right(1), value & 1 != 0),
            InstructionType::Rl => ((value << 1) | carry_in as Byte, value >> 7 != 0),
            InstructionType::Rr => ((value >> 1) | ((carry_in as Byte) << 7), value & 1 != 0),
            InstructionType::Sla => (value << 1, value >> 7 != 0),
            // Arithmetic shift keeps the sign bit
            InstructionType::Sra => ((value >> 1) | (value & 0x80), value & 1 != 0),
            InstructionType::Swap => (value.rotate_left(4), false),
            InstructionType::Srl => (value >> 1, value & 1 != 0),
            _ => (value, carry_in),
        };

        self.write_cb_result(bus, inst.reg1, result);
        self.regs.set_flags(result == 0, false, false, carry);
        inst.cycles as u32
    }

    fn write_cb_result<B: MemoryBus>(&mut self, bus: &mut B, reg: RegisterType, value: Byte) {
        if reg == RegisterType::Hl {
            bus.write(self.regs.hl(), value);
        } else {
            self.write_reg(reg, value as Word);
        }
    }

    fn jump_to_if(&mut self, addr: Word, cond: ConditionType) -> bool {
        if !self.check_condition(cond) {
            return false;
        }
        self.regs.pc = addr;
        true
    }

    // ========== Stack Operations ==========

    /// Push an 8-bit value onto the stack
    /// Decrements SP first, then writes the value
    pub fn stack_push8<B: MemoryBus>(&mut self, bus: &mut B, value: Byte) {
        self.regs.sp = self.regs.sp.wrapping_sub(1);
        bus.write(self.regs.sp, value);
    }

    /// Pop an 8-bit value from the stack
    /// Reads the value first, then increments SP
    pub fn stack_pop8<B: MemoryBus>(&mut self, bus: &mut B) -> Byte {
        let value = bus.read(self.regs.sp);
        self.regs.sp = self.regs.sp.wrapping_add(1);
        value
    }

    /// Push a 16-bit value, high byte first
    pub fn stack_push16<B: MemoryBus>(&mut self, bus: &mut B, value: Word) {
        let (hi, lo) = split(value);
        self.stack_push8(bus, hi);
        self.stack_push8(bus, lo);
    }

    /// Pop a 16-bit value, low byte first
    pub fn stack_pop16<B: MemoryBus>(&mut self, bus: &mut B) -> Word {
        let lo = self.stack_pop8(bus);
        let hi = self.stack_pop8(bus);
        join(hi, lo)
    }

    /// Service `source`: clear IME and its IF bit, push PC and jump to the
    /// vector. Returns the machine cycles spent.
    pub fn dispatch_interrupt<B: MemoryBus>(&mut self, bus: &mut B, source: InterruptType) -> u32 {
        log::trace!(
            "dispatch {:?} from {:#06X} to {:#06X}",
            source,
            self.regs.pc,
            source.vector()
        );
        self.ime = false;
        bus.acknowledge_interrupt(source);
        self.stack_push16(bus, self.regs.pc);
        self.regs.pc = source.vector();
        DISPATCH_M_CYCLES
    }
}
