//! Instruction Fetch
//!
//! Opcode fetch and operand decoding. Operands are resolved against the
//! current register file before the instruction body runs.

use super::instructions::{instruction_by_opcode, AddressingMode, Instruction, RegisterType};
use super::Cpu;
use crate::bus::MemoryBus;
use crate::common::{Byte, Word};

/// Operand resolved by `fetch_data`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Fetched {
    /// Source value: register, immediate or memory byte
    pub data: Word,
    /// Target address when the instruction stores to memory
    pub mem_dest: Option<Word>,
}

impl Cpu {
    /// Read a value from a register
    pub fn read_reg(&self, reg: RegisterType) -> Word {
        match reg {
            RegisterType::None => 0,
            RegisterType::A => self.regs.a as Word,
            RegisterType::F => self.regs.f as Word,
            RegisterType::B => self.regs.b as Word,
            RegisterType::C => self.regs.c as Word,
            RegisterType::D => self.regs.d as Word,
            RegisterType::E => self.regs.e as Word,
            RegisterType::H => self.regs.h as Word,
            RegisterType::L => self.regs.l as Word,
            RegisterType::Af => self.regs.af(),
            RegisterType::Bc => self.regs.bc(),
            RegisterType::De => self.regs.de(),
            RegisterType::Hl => self.regs.hl(),
            RegisterType::Sp => self.regs.sp,
            RegisterType::Pc => self.regs.pc,
        }
    }

    /// Write a value to a register. 8-bit registers keep the low byte.
    pub fn write_reg(&mut self, reg: RegisterType, value: Word) {
        match reg {
            RegisterType::None => {}
            RegisterType::A => self.regs.a = value as Byte,
            RegisterType::F => self.regs.f = (value & 0xF0) as Byte,
            RegisterType::B => self.regs.b = value as Byte,
            RegisterType::C => self.regs.c = value as Byte,
            RegisterType::D => self.regs.d = value as Byte,
            RegisterType::E => self.regs.e = value as Byte,
            RegisterType::H => self.regs.h = value as Byte,
            RegisterType::L => self.regs.l = value as Byte,
            RegisterType::Af => self.regs.set_af(value),
            RegisterType::Bc => self.regs.set_bc(value),
            RegisterType::De => self.regs.set_de(value),
            RegisterType::Hl => self.regs.set_hl(value),
            RegisterType::Sp => self.regs.sp = value,
            RegisterType::Pc => self.regs.pc = value,
        }
    }

    /// Read the byte at PC and advance past it
    fn fetch8<B: MemoryBus>(&mut self, bus: &B) -> Byte {
        let value = bus.read(self.regs.pc);
        self.regs.pc = self.regs.pc.wrapping_add(1);
        value
    }

    /// Read a little-endian word at PC and advance past it
    fn fetch16<B: MemoryBus>(&mut self, bus: &B) -> Word {
        let lo = self.fetch8(bus) as Word;
        let hi = self.fetch8(bus) as Word;
        lo | (hi << 8)
    }

    /// Fetch the opcode at PC and look it up.
    ///
    /// After a HALT-bug the opcode is read without advancing PC, so the same
    /// byte is decoded again on the next fetch.
    pub fn fetch_instruction<B: MemoryBus>(&mut self, bus: &B) -> (Byte, &'static Instruction) {
        let opcode = bus.read(self.regs.pc);
        if self.halt_bug {
            self.halt_bug = false;
        } else {
            self.regs.pc = self.regs.pc.wrapping_add(1);
        }
        (opcode, instruction_by_opcode(opcode))
    }

    /// Resolve operands based on addressing mode
    pub fn fetch_data<B: MemoryBus>(&mut self, bus: &B, inst: &Instruction) -> Fetched {
        let mut fetched = Fetched::default();

        match inst.mode {
            AddressingMode::Implied => {}

            AddressingMode::Register => {
                fetched.data = self.read_reg(inst.reg1);
            }

            AddressingMode::RegisterRegister => {
                fetched.data = self.read_reg(inst.reg2);
            }

            AddressingMode::RegisterD8
            | AddressingMode::D8
            | AddressingMode::RegisterA8
            | AddressingMode::HlSpr => {
                fetched.data = self.fetch8(bus) as Word;
            }

            AddressingMode::RegisterD16 | AddressingMode::D16 => {
                fetched.data = self.fetch16(bus);
            }

            AddressingMode::MemoryRegister => {
                fetched.data = self.read_reg(inst.reg2);
                fetched.mem_dest = Some(high_page(inst.reg1, self.read_reg(inst.reg1)));
            }

            AddressingMode::RegisterMemory => {
                let addr = high_page(inst.reg2, self.read_reg(inst.reg2));
                fetched.data = bus.read(addr) as Word;
            }

            AddressingMode::RegisterHli => {
                fetched.data = bus.read(self.regs.hl()) as Word;
                self.regs.set_hl(self.regs.hl().wrapping_add(1));
            }

            AddressingMode::RegisterHld => {
                fetched.data = bus.read(self.regs.hl()) as Word;
                self.regs.set_hl(self.regs.hl().wrapping_sub(1));
            }

            AddressingMode::HliRegister => {
                fetched.data = self.read_reg(inst.reg2);
                fetched.mem_dest = Some(self.regs.hl());
                self.regs.set_hl(self.regs.hl().wrapping_add(1));
            }

            AddressingMode::HldRegister => {
                fetched.data = self.read_reg(inst.reg2);
                fetched.mem_dest = Some(self.regs.hl());
                self.regs.set_hl(self.regs.hl().wrapping_sub(1));
            }

            AddressingMode::A8Register => {
                fetched.mem_dest = Some(0xFF00 | self.fetch8(bus) as Word);
                fetched.data = self.read_reg(inst.reg2);
            }

            AddressingMode::A16Register => {
                fetched.mem_dest = Some(self.fetch16(bus));
                fetched.data = self.read_reg(inst.reg2);
            }

            AddressingMode::MemoryRegisterD8 => {
                fetched.data = self.fetch8(bus) as Word;
                fetched.mem_dest = Some(self.read_reg(inst.reg1));
            }

            AddressingMode::MemoryRegisterOnly => {
                let addr = self.read_reg(inst.reg1);
                fetched.mem_dest = Some(addr);
                fetched.data = bus.read(addr) as Word;
            }

            AddressingMode::RegisterA16 => {
                let addr = self.fetch16(bus);
                fetched.data = bus.read(addr) as Word;
            }
        }

        fetched
    }
}

/// `(C)` operands address the 0xFF00 page
fn high_page(reg: RegisterType, value: Word) -> Word {
    if reg == RegisterType::C {
        0xFF00 | value
    } else {
        value
    }
}
