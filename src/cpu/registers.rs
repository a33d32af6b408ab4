//! CPU Registers
//!
//! Register file of the SM83 core: eight 8-bit registers, paired as
//! AF/BC/DE/HL for 16-bit access, plus SP and PC.

use crate::common::{bit, bit_set, join, split, Byte, Word};
use serde::{Deserialize, Serialize};

/// Flag bit positions in F
const FLAG_Z: u8 = 7;
const FLAG_N: u8 = 6;
const FLAG_H: u8 = 5;
const FLAG_C: u8 = 4;

/// CPU Registers
///
/// F keeps flags in bits 7..4 (Z, N, H, C). Its low nibble is always zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registers {
    pub a: Byte,
    pub f: Byte,
    pub b: Byte,
    pub c: Byte,
    pub d: Byte,
    pub e: Byte,
    pub h: Byte,
    pub l: Byte,
    /// Program Counter
    pub pc: Word,
    /// Stack Pointer
    pub sp: Word,
}

impl Registers {
    /// All registers zero, as at power-on with a boot ROM mapped
    pub fn new() -> Self {
        Self::default()
    }

    /// Values the DMG boot ROM leaves when it jumps to 0x0100
    pub fn post_boot() -> Self {
        Self {
            a: 0x01,
            f: 0xB0,
            b: 0x00,
            c: 0x13,
            d: 0x00,
            e: 0xD8,
            h: 0x01,
            l: 0x4D,
            pc: 0x0100,
            sp: 0xFFFE,
        }
    }

    #[inline]
    pub fn af(&self) -> Word {
        join(self.a, self.f)
    }

    /// Low nibble of F is discarded
    #[inline]
    pub fn set_af(&mut self, value: Word) {
        let (a, f) = split(value);
        self.a = a;
        self.f = f & 0xF0;
    }

    #[inline]
    pub fn bc(&self) -> Word {
        join(self.b, self.c)
    }

    #[inline]
    pub fn set_bc(&mut self, value: Word) {
        (self.b, self.c) = split(value);
    }

    #[inline]
    pub fn de(&self) -> Word {
        join(self.d, self.e)
    }

    #[inline]
    pub fn set_de(&mut self, value: Word) {
        (self.d, self.e) = split(value);
    }

    #[inline]
    pub fn hl(&self) -> Word {
        join(self.h, self.l)
    }

    #[inline]
    pub fn set_hl(&mut self, value: Word) {
        (self.h, self.l) = split(value);
    }

    #[inline]
    pub fn flag_z(&self) -> bool {
        bit(self.f, FLAG_Z)
    }

    #[inline]
    pub fn set_flag_z(&mut self, value: bool) {
        bit_set(&mut self.f, FLAG_Z, value);
    }

    #[inline]
    pub fn flag_n(&self) -> bool {
        bit(self.f, FLAG_N)
    }

    #[inline]
    pub fn set_flag_n(&mut self, value: bool) {
        bit_set(&mut self.f, FLAG_N, value);
    }

    #[inline]
    pub fn flag_h(&self) -> bool {
        bit(self.f, FLAG_H)
    }

    #[inline]
    pub fn set_flag_h(&mut self, value: bool) {
        bit_set(&mut self.f, FLAG_H, value);
    }

    #[inline]
    pub fn flag_c(&self) -> bool {
        bit(self.f, FLAG_C)
    }

    #[inline]
    pub fn set_flag_c(&mut self, value: bool) {
        bit_set(&mut self.f, FLAG_C, value);
    }

    /// Set all four flags at once
    #[inline]
    pub fn set_flags(&mut self, z: bool, n: bool, h: bool, c: bool) {
        self.set_flag_z(z);
        self.set_flag_n(n);
        self.set_flag_h(h);
        self.set_flag_c(c);
    }
}
