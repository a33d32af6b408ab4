//! CPU Instructions
//!
//! Instruction descriptors and the two 256-entry decode tables (base and
//! 0xCB-prefixed). Each descriptor fixes the operation, its addressing mode
//! and operands, and its cost in machine cycles.

use crate::common::Byte;

/// CPU instruction types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstructionType {
    /// No table entry: executing it faults the CPU
    Invalid,
    Nop,
    Ld,
    Inc,
    Dec,
    Rlca,
    Add,
    Rrca,
    Stop,
    Rla,
    Jr,
    Rra,
    Daa,
    Cpl,
    Scf,
    Ccf,
    Halt,
    Adc,
    Sub,
    Sbc,
    And,
    Xor,
    Or,
    Cp,
    Pop,
    Jp,
    Push,
    Ret,
    Cb,
    Call,
    Reti,
    Ldh,
    Di,
    Ei,
    Rst,
    // CB-prefixed instructions
    Rlc,
    Rrc,
    Rl,
    Rr,
    Sla,
    Sra,
    Swap,
    Srl,
    Bit,
    Res,
    Set,
}

/// Addressing modes for instructions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressingMode {
    Implied,
    Register,
    RegisterRegister,
    MemoryRegister,
    RegisterMemory,
    RegisterD8,
    RegisterD16,
    RegisterA8,
    RegisterA16,
    A8Register,
    A16Register,
    MemoryRegisterD8,
    HliRegister,
    HldRegister,
    RegisterHli,
    RegisterHld,
    HlSpr,
    D8,
    D16,
    MemoryRegisterOnly,
}

impl AddressingMode {
    /// Number of immediate bytes following the opcode
    pub const fn operand_len(&self) -> u16 {
        match self {
            AddressingMode::D8
            | AddressingMode::RegisterD8
            | AddressingMode::RegisterA8
            | AddressingMode::A8Register
            | AddressingMode::MemoryRegisterD8
            | AddressingMode::HlSpr => 1,
            AddressingMode::D16
            | AddressingMode::RegisterD16
            | AddressingMode::RegisterA16
            | AddressingMode::A16Register => 2,
            _ => 0,
        }
    }
}

/// Register types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterType {
    None,
    A,
    F,
    B,
    C,
    D,
    E,
    H,
    L,
    Af,
    Bc,
    De,
    Hl,
    Sp,
    Pc,
}

impl RegisterType {
    /// Register pairs and SP/PC hold 16 bits
    pub const fn is_16bit(&self) -> bool {
        matches!(
            self,
            RegisterType::Af
                | RegisterType::Bc
                | RegisterType::De
                | RegisterType::Hl
                | RegisterType::Sp
                | RegisterType::Pc
        )
    }
}

/// Condition types for conditional instructions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionType {
    None,
    Nz,
    Z,
    Nc,
    C,
}

/// CPU instruction definition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    pub inst_type: InstructionType,
    pub mode: AddressingMode,
    pub reg1: RegisterType,
    pub reg2: RegisterType,
    pub cond: ConditionType,
    /// RST target or CB bit index
    pub param: Byte,
    /// Machine cycles when no branch is taken
    pub cycles: u8,
    /// Machine cycles when a conditional branch is taken
    pub cycles_taken: u8,
}

impl Instruction {
    /// Total encoded length, opcode included
    pub const fn length(&self) -> u16 {
        1 + self.mode.operand_len()
    }

    pub fn is_invalid(&self) -> bool {
        self.inst_type == InstructionType::Invalid
    }
}

// Helper macro for instruction definition. The leading cycle count (or
// `base / taken` pair) is in machine cycles.
macro_rules! inst {
    (@ $cy:expr, $tk:expr; $t:ident, $m:ident, $r1:ident, $r2:ident, $c:ident, $p:expr) => {
        Instruction {
            inst_type: InstructionType::$t,
            mode: AddressingMode::$m,
            reg1: RegisterType::$r1,
            reg2: RegisterType::$r2,
            cond: ConditionType::$c,
            param: $p,
            cycles: $cy,
            cycles_taken: $tk,
        }
    };
    ($cy:literal; $t:ident) => {
        inst!(@ $cy, $cy; $t, Implied, None, None, None, 0)
    };
    ($cy:literal; $t:ident, $m:ident) => {
        inst!(@ $cy, $cy; $t, $m, None, None, None, 0)
    };
    ($cy:literal; $t:ident, $m:ident, $r1:ident) => {
        inst!(@ $cy, $cy; $t, $m, $r1, None, None, 0)
    };
    ($cy:literal; $t:ident, $m:ident, $r1:ident, $r2:ident) => {
        inst!(@ $cy, $cy; $t, $m, $r1, $r2, None, 0)
    };
    ($cy:literal; $t:ident, $m:ident, $r1:ident, $r2:ident, $c:ident, $p:expr) => {
        inst!(@ $cy, $cy; $t, $m, $r1, $r2, $c, $p)
    };
    ($cy:literal / $tk:literal; $t:ident, $m:ident, $r1:ident, $r2:ident, $c:ident) => {
        inst!(@ $cy, $tk; $t, $m, $r1, $r2, $c, 0)
    };
}

/// Main instruction table (256 entries)
pub static INSTRUCTIONS: [Instruction; 256] = [
    // 0x00 - 0x0F
    inst!(1; Nop),                                       // 0x00
    inst!(3; Ld, RegisterD16, Bc),                       // 0x01
    inst!(2; Ld, MemoryRegister, Bc, A),                 // 0x02
    inst!(2; Inc, Register, Bc),                         // 0x03
    inst!(1; Inc, Register, B),                          // 0x04
    inst!(1; Dec, Register, B),                          // 0x05
    inst!(2; Ld, RegisterD8, B),                         // 0x06
    inst!(1; Rlca),                                      // 0x07
    inst!(5; Ld, A16Register, None, Sp),                 // 0x08
    inst!(2; Add, RegisterRegister, Hl, Bc),             // 0x09
    inst!(2; Ld, RegisterMemory, A, Bc),                 // 0x0A
    inst!(2; Dec, Register, Bc),                         // 0x0B
    inst!(1; Inc, Register, C),                          // 0x0C
    inst!(1; Dec, Register, C),                          // 0x0D
    inst!(2; Ld, RegisterD8, C),                         // 0x0E
    inst!(1; Rrca),                                      // 0x0F
    // 0x10 - 0x1F
    inst!(1; Stop, D8),                                  // 0x10
    inst!(3; Ld, RegisterD16, De),                       // 0x11
    inst!(2; Ld, MemoryRegister, De, A),                 // 0x12
    inst!(2; Inc, Register, De),                         // 0x13
    inst!(1; Inc, Register, D),                          // 0x14
    inst!(1; Dec, Register, D),                          // 0x15
    inst!(2; Ld, RegisterD8, D),                         // 0x16
    inst!(1; Rla),                                       // 0x17
    inst!(3; Jr, D8),                                    // 0x18
    inst!(2; Add, RegisterRegister, Hl, De),             // 0x19
    inst!(2; Ld, RegisterMemory, A, De),                 // 0x1A
    inst!(2; Dec, Register, De),                         // 0x1B
    inst!(1; Inc, Register, E),                          // 0x1C
    inst!(1; Dec, Register, E),                          // 0x1D
    inst!(2; Ld, RegisterD8, E),                         // 0x1E
    inst!(1; Rra),                                       // 0x1F
    // 0x20 - 0x2F
    inst!(2 / 3; Jr, D8, None, None, Nz),                // 0x20
    inst!(3; Ld, RegisterD16, Hl),                       // 0x21
    inst!(2; Ld, HliRegister, Hl, A),                    // 0x22
    inst!(2; Inc, Register, Hl),                         // 0x23
    inst!(1; Inc, Register, H),                          // 0x24
    inst!(1; Dec, Register, H),                          // 0x25
    inst!(2; Ld, RegisterD8, H),                         // 0x26
    inst!(1; Daa),                                       // 0x27
    inst!(2 / 3; Jr, D8, None, None, Z),                 // 0x28
    inst!(2; Add, RegisterRegister, Hl, Hl),             // 0x29
    inst!(2; Ld, RegisterHli, A, Hl),                    // 0x2A
    inst!(2; Dec, Register, Hl),                         // 0x2B
    inst!(1; Inc, Register, L),                          // 0x2C
    inst!(1; Dec, Register, L),                          // 0x2D
    inst!(2; Ld, RegisterD8, L),                         // 0x2E
    inst!(1; Cpl),                                       // 0x2F
    // 0x30 - 0x3F
    inst!(2 / 3; Jr, D8, None, None, Nc),                // 0x30
    inst!(3; Ld, RegisterD16, Sp),                       // 0x31
    inst!(2; Ld, HldRegister, Hl, A),                    // 0x32
    inst!(2; Inc, Register, Sp),                         // 0x33
    inst!(3; Inc, MemoryRegisterOnly, Hl),               // 0x34
    inst!(3; Dec, MemoryRegisterOnly, Hl),               // 0x35
    inst!(3; Ld, MemoryRegisterD8, Hl),                  // 0x36
    inst!(1; Scf),                                       // 0x37
    inst!(2 / 3; Jr, D8, None, None, C),                 // 0x38
    inst!(2; Add, RegisterRegister, Hl, Sp),             // 0x39
    inst!(2; Ld, RegisterHld, A, Hl),                    // 0x3A
    inst!(2; Dec, Register, Sp),                         // 0x3B
    inst!(1; Inc, Register, A),                          // 0x3C
    inst!(1; Dec, Register, A),                          // 0x3D
    inst!(2; Ld, RegisterD8, A),                         // 0x3E
    inst!(1; Ccf),                                       // 0x3F
    // 0x40 - 0x4F (LD B,r and LD C,r)
    inst!(1; Ld, RegisterRegister, B, B),                // 0x40
    inst!(1; Ld, RegisterRegister, B, C),                // 0x41
    inst!(1; Ld, RegisterRegister, B, D),                // 0x42
    inst!(1; Ld, RegisterRegister, B, E),                // 0x43
    inst!(1; Ld, RegisterRegister, B, H),                // 0x44
    inst!(1; Ld, RegisterRegister, B, L),                // 0x45
    inst!(2; Ld, RegisterMemory, B, Hl),                 // 0x46
    inst!(1; Ld, RegisterRegister, B, A),                // 0x47
    inst!(1; Ld, RegisterRegister, C, B),                // 0x48
    inst!(1; Ld, RegisterRegister, C, C),                // 0x49
    inst!(1; Ld, RegisterRegister, C, D),                // 0x4A
    inst!(1; Ld, RegisterRegister, C, E),                // 0x4B
    inst!(1; Ld, RegisterRegister, C, H),                // 0x4C
    inst!(1; Ld, RegisterRegister, C, L),                // 0x4D
    inst!(2; Ld, RegisterMemory, C, Hl),                 // 0x4E
    inst!(1; Ld, RegisterRegister, C, A),                // 0x4F
    // 0x50 - 0x5F (LD D,r and LD E,r)
    inst!(1; Ld, RegisterRegister, D, B),                // 0x50
    inst!(1; Ld, RegisterRegister, D, C),                // 0x51
    inst!(1; Ld, RegisterRegister, D, D),                // 0x52
    inst!(1; Ld, RegisterRegister, D, E),                // 0x53
    inst!(1; Ld, RegisterRegister, D, H),                // 0x54
    inst!(1; Ld, RegisterRegister, D, L),                // 0x55
    inst!(2; Ld, RegisterMemory, D, Hl),                 // 0x56
    inst!(1; Ld, RegisterRegister, D, A),                // 0x57
    inst!(1; Ld, RegisterRegister, E, B),                // 0x58
    inst!(1; Ld, RegisterRegister, E, C),                // 0x59
    inst!(1; Ld, RegisterRegister, E, D),                // 0x5A
    inst!(1; Ld, RegisterRegister, E, E),                // 0x5B
    inst!(1; Ld, RegisterRegister, E, H),                // 0x5C
    inst!(1; Ld, RegisterRegister, E, L),                // 0x5D
    inst!(2; Ld, RegisterMemory, E, Hl),                 // 0x5E
    inst!(1; Ld, RegisterRegister, E, A),                // 0x5F
    // 0x60 - 0x6F (LD H,r and LD L,r)
    inst!(1; Ld, RegisterRegister, H, B),                // 0x60
    inst!(1; Ld, RegisterRegister, H, C),                // 0x61
    inst!(1; Ld, RegisterRegister, H, D),                // 0x62
    inst!(1; Ld, RegisterRegister, H, E),                // 0x63
    inst!(1; Ld, RegisterRegister, H, H),                // 0x64
    inst!(1; Ld, RegisterRegister, H, L),                // 0x65
    inst!(2; Ld, RegisterMemory, H, Hl),                 // 0x66
    inst!(1; Ld, RegisterRegister, H, A),                // 0x67
    inst!(1; Ld, RegisterRegister, L, B),                // 0x68
    inst!(1; Ld, RegisterRegister, L, C),                // 0x69
    inst!(1; Ld, RegisterRegister, L, D),                // 0x6A
    inst!(1; Ld, RegisterRegister, L, E),                // 0x6B
    inst!(1; Ld, RegisterRegister, L, H),                // 0x6C
    inst!(1; Ld, RegisterRegister, L, L),                // 0x6D
    inst!(2; Ld, RegisterMemory, L, Hl),                 // 0x6E
    inst!(1; Ld, RegisterRegister, L, A),                // 0x6F
    // 0x70 - 0x7F (LD (HL),r and LD A,r)
    inst!(2; Ld, MemoryRegister, Hl, B),                 // 0x70
    inst!(2; Ld, MemoryRegister, Hl, C),                 // 0x71
    inst!(2; Ld, MemoryRegister, Hl, D),                 // 0x72
    inst!(2; Ld, MemoryRegister, Hl, E),                 // 0x73
    inst!(2; Ld, MemoryRegister, Hl, H),                 // 0x74
    inst!(2; Ld, MemoryRegister, Hl, L),                 // 0x75
    inst!(1; Halt),                                      // 0x76
    inst!(2; Ld, MemoryRegister, Hl, A),                 // 0x77
    inst!(1; Ld, RegisterRegister, A, B),                // 0x78
    inst!(1; Ld, RegisterRegister, A, C),                // 0x79
    inst!(1; Ld, RegisterRegister, A, D),                // 0x7A
    inst!(1; Ld, RegisterRegister, A, E),                // 0x7B
    inst!(1; Ld, RegisterRegister, A, H),                // 0x7C
    inst!(1; Ld, RegisterRegister, A, L),                // 0x7D
    inst!(2; Ld, RegisterMemory, A, Hl),                 // 0x7E
    inst!(1; Ld, RegisterRegister, A, A),                // 0x7F
    // 0x80 - 0x8F (ADD A,r and ADC A,r)
    inst!(1; Add, RegisterRegister, A, B),               // 0x80
    inst!(1; Add, RegisterRegister, A, C),               // 0x81
    inst!(1; Add, RegisterRegister, A, D),               // 0x82
    inst!(1; Add, RegisterRegister, A, E),               // 0x83
    inst!(1; Add, RegisterRegister, A, H),               // 0x84
    inst!(1; Add, RegisterRegister, A, L),               // 0x85
    inst!(2; Add, RegisterMemory, A, Hl),                // 0x86
    inst!(1; Add, RegisterRegister, A, A),               // 0x87
    inst!(1; Adc, RegisterRegister, A, B),               // 0x88
    inst!(1; Adc, RegisterRegister, A, C),               // 0x89
    inst!(1; Adc, RegisterRegister, A, D),               // 0x8A
    inst!(1; Adc, RegisterRegister, A, E),               // 0x8B
    inst!(1; Adc, RegisterRegister, A, H),               // 0x8C
    inst!(1; Adc, RegisterRegister, A, L),               // 0x8D
    inst!(2; Adc, RegisterMemory, A, Hl),                // 0x8E
    inst!(1; Adc, RegisterRegister, A, A),               // 0x8F
    // 0x90 - 0x9F (SUB A,r and SBC A,r)
    inst!(1; Sub, RegisterRegister, A, B),               // 0x90
    inst!(1; Sub, RegisterRegister, A, C),               // 0x91
    inst!(1; Sub, RegisterRegister, A, D),               // 0x92
    inst!(1; Sub, RegisterRegister, A, E),               // 0x93
    inst!(1; Sub, RegisterRegister, A, H),               // 0x94
    inst!(1; Sub, RegisterRegister, A, L),               // 0x95
    inst!(2; Sub, RegisterMemory, A, Hl),                // 0x96
    inst!(1; Sub, RegisterRegister, A, A),               // 0x97
    inst!(1; Sbc, RegisterRegister, A, B),               // 0x98
    inst!(1; Sbc, RegisterRegister, A, C),               // 0x99
    inst!(1; Sbc, RegisterRegister, A, D),               // 0x9A
    inst!(1; Sbc, RegisterRegister, A, E),               // 0x9B
    inst!(1; Sbc, RegisterRegister, A, H),               // 0x9C
    inst!(1; Sbc, RegisterRegister, A, L),               // 0x9D
    inst!(2; Sbc, RegisterMemory, A, Hl),                // 0x9E
    inst!(1; Sbc, RegisterRegister, A, A),               // 0x9F
    // 0xA0 - 0xAF (AND A,r and XOR A,r)
    inst!(1; And, RegisterRegister, A, B),               // 0xA0
    inst!(1; And, RegisterRegister, A, C),               // 0xA1
    inst!(1; And, RegisterRegister, A, D),               // 0xA2
    inst!(1; And, RegisterRegister, A, E),               // 0xA3
    inst!(1; And, RegisterRegister, A, H),               // 0xA4
    inst!(1; And, RegisterRegister, A, L),               // 0xA5
    inst!(2; And, RegisterMemory, A, Hl),                // 0xA6
    inst!(1; And, RegisterRegister, A, A),               // 0xA7
    inst!(1; Xor, RegisterRegister, A, B),               // 0xA8
    inst!(1; Xor, RegisterRegister, A, C),               // 0xA9
    inst!(1; Xor, RegisterRegister, A, D),               // 0xAA
    inst!(1; Xor, RegisterRegister, A, E),               // 0xAB
    inst!(1; Xor, RegisterRegister, A, H),               // 0xAC
    inst!(1; Xor, RegisterRegister, A, L),               // 0xAD
    inst!(2; Xor, RegisterMemory, A, Hl),                // 0xAE
    inst!(1; Xor, RegisterRegister, A, A),               // 0xAF
    // 0xB0 - 0xBF (OR A,r and CP A,r)
    inst!(1; Or, RegisterRegister, A, B),                // 0xB0
    inst!(1; Or, RegisterRegister, A, C),                // 0xB1
    inst!(1; Or, RegisterRegister, A, D),                // 0xB2
    inst!(1; Or, RegisterRegister, A, E),                // 0xB3
    inst!(1; Or, RegisterRegister, A, H),                // 0xB4
    inst!(1; Or, RegisterRegister, A, L),                // 0xB5
    inst!(2; Or, RegisterMemory, A, Hl),                 // 0xB6
    inst!(1; Or, RegisterRegister, A, A),                // 0xB7
    inst!(1; Cp, RegisterRegister, A, B),                // 0xB8
    inst!(1; Cp, RegisterRegister, A, C),                // 0xB9
    inst!(1; Cp, RegisterRegister, A, D),                // 0xBA
    inst!(1; Cp, RegisterRegister, A, E),                // 0xBB
    inst!(1; Cp, RegisterRegister, A, H),                // 0xBC
    inst!(1; Cp, RegisterRegister, A, L),                // 0xBD
    inst!(2; Cp, RegisterMemory, A, Hl),                 // 0xBE
    inst!(1; Cp, RegisterRegister, A, A),                // 0xBF
    // 0xC0 - 0xCF
    inst!(2 / 5; Ret, Implied, None, None, Nz),          // 0xC0
    inst!(3; Pop, Register, Bc),                         // 0xC1
    inst!(3 / 4; Jp, D16, None, None, Nz),               // 0xC2
    inst!(4; Jp, D16),                                   // 0xC3
    inst!(3 / 6; Call, D16, None, None, Nz),             // 0xC4
    inst!(4; Push, Register, Bc),                        // 0xC5
    inst!(2; Add, RegisterD8, A),                        // 0xC6
    inst!(4; Rst, Implied, None, None, None, 0x00),      // 0xC7
    inst!(2 / 5; Ret, Implied, None, None, Z),           // 0xC8
    inst!(4; Ret),                                       // 0xC9
    inst!(3 / 4; Jp, D16, None, None, Z),                // 0xCA
    inst!(1; Cb, D8),                                    // 0xCB
    inst!(3 / 6; Call, D16, None, None, Z),              // 0xCC
    inst!(6; Call, D16),                                 // 0xCD
    inst!(2; Adc, RegisterD8, A),                        // 0xCE
    inst!(4; Rst, Implied, None, None, None, 0x08),      // 0xCF
    // 0xD0 - 0xDF
    inst!(2 / 5; Ret, Implied, None, None, Nc),          // 0xD0
    inst!(3; Pop, Register, De),                         // 0xD1
    inst!(3 / 4; Jp, D16, None, None, Nc),               // 0xD2
    inst!(0; Invalid),                                   // 0xD3
    inst!(3 / 6; Call, D16, None, None, Nc),             // 0xD4
    inst!(4; Push, Register, De),                        // 0xD5
    inst!(2; Sub, RegisterD8, A),                        // 0xD6
    inst!(4; Rst, Implied, None, None, None, 0x10),      // 0xD7
    inst!(2 / 5; Ret, Implied, None, None, C),           // 0xD8
    inst!(4; Reti),                                      // 0xD9
    inst!(3 / 4; Jp, D16, None, None, C),                // 0xDA
    inst!(0; Invalid),                                   // 0xDB
    inst!(3 / 6; Call, D16, None, None, C),              // 0xDC
    inst!(0; Invalid),                                   // 0xDD
    inst!(2; Sbc, RegisterD8, A),                        // 0xDE
    inst!(4; Rst, Implied, None, None, None, 0x18),      // 0xDF
    // 0xE0 - 0xEF
    inst!(3; Ldh, A8Register, None, A),                  // 0xE0
    inst!(3; Pop, Register, Hl),                         // 0xE1
    inst!(2; Ld, MemoryRegister, C, A),                  // 0xE2
    inst!(0; Invalid),                                   // 0xE3
    inst!(0; Invalid),                                   // 0xE4
    inst!(4; Push, Register, Hl),                        // 0xE5
    inst!(2; And, RegisterD8, A),                        // 0xE6
    inst!(4; Rst, Implied, None, None, None, 0x20),      // 0xE7
    inst!(4; Add, RegisterD8, Sp),                       // 0xE8
    inst!(1; Jp, Register, Hl),                          // 0xE9
    inst!(4; Ld, A16Register, None, A),                  // 0xEA
    inst!(0; Invalid),                                   // 0xEB
    inst!(0; Invalid),                                   // 0xEC
    inst!(0; Invalid),                                   // 0xED
    inst!(2; Xor, RegisterD8, A),                        // 0xEE
    inst!(4; Rst, Implied, None, None, None, 0x28),      // 0xEF
    // 0xF0 - 0xFF
    inst!(3; Ldh, RegisterA8, A),                        // 0xF0
    inst!(3; Pop, Register, Af),                         // 0xF1
    inst!(2; Ld, RegisterMemory, A, C),                  // 0xF2
    inst!(1; Di),                                        // 0xF3
    inst!(0; Invalid),                                   // 0xF4
    inst!(4; Push, Register, Af),                        // 0xF5
    inst!(2; Or, RegisterD8, A),                         // 0xF6
    inst!(4; Rst, Implied, None, None, None, 0x30),      // 0xF7
    inst!(3; Ld, HlSpr, Hl, Sp),                         // 0xF8
    inst!(2; Ld, RegisterRegister, Sp, Hl),              // 0xF9
    inst!(4; Ld, RegisterA16, A),                        // 0xFA
    inst!(1; Ei),                                        // 0xFB
    inst!(0; Invalid),                                   // 0xFC
    inst!(0; Invalid),                                   // 0xFD
    inst!(2; Cp, RegisterD8, A),                         // 0xFE
    inst!(4; Rst, Implied, None, None, None, 0x38),      // 0xFF
];

/// Get instruction by opcode
pub fn instruction_by_opcode(opcode: Byte) -> &'static Instruction {
    &INSTRUCTIONS[opcode as usize]
}

/// Operation of a CB opcode, from bits 7..3
const fn cb_type(opcode: u8) -> InstructionType {
    match opcode >> 3 {
        0 => InstructionType::Rlc,
        1 => InstructionType::Rrc,
        2 => InstructionType::Rl,
        3 => InstructionType::Rr,
        4 => InstructionType::Sla,
        5 => InstructionType::Sra,
        6 => InstructionType::Swap,
        7 => InstructionType::Srl,
        8..=15 => InstructionType::Bit,
        16..=23 => InstructionType::Res,
        _ => InstructionType::Set,
    }
}

/// Operand register of a CB opcode, from bits 2..0
const fn cb_register(opcode: u8) -> RegisterType {
    match opcode & 0x07 {
        0 => RegisterType::B,
        1 => RegisterType::C,
        2 => RegisterType::D,
        3 => RegisterType::E,
        4 => RegisterType::H,
        5 => RegisterType::L,
        6 => RegisterType::Hl,
        _ => RegisterType::A,
    }
}

/// Decode one CB opcode. Cycle counts include the prefix byte.
const fn cb_inst(opcode: u8) -> Instruction {
    let inst_type = cb_type(opcode);
    let reg1 = cb_register(opcode);
    let on_hl = opcode & 0x07 == 6;
    let cycles = match (on_hl, inst_type) {
        (false, _) => 2,
        (true, InstructionType::Bit) => 3,
        (true, _) => 4,
    };
    Instruction {
        inst_type,
        mode: if on_hl {
            AddressingMode::MemoryRegisterOnly
        } else {
            AddressingMode::Register
        },
        reg1,
        reg2: RegisterType::None,
        cond: ConditionType::None,
        param: (opcode >> 3) & 0x07,
        cycles,
        cycles_taken: cycles,
    }
}

const fn build_cb_table() -> [Instruction; 256] {
    let mut table = [cb_inst(0); 256];
    let mut opcode = 0;
    while opcode < 256 {
        table[opcode] = cb_inst(opcode as u8);
        opcode += 1;
    }
    table
}

/// CB-prefixed instruction table (256 entries)
pub static CB_INSTRUCTIONS: [Instruction; 256] = build_cb_table();

/// Get CB-prefixed instruction by opcode
pub fn cb_instruction_by_opcode(opcode: Byte) -> &'static Instruction {
    &CB_INSTRUCTIONS[opcode as usize]
}
