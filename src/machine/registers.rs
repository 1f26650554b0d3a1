//! LEAP16 register file.
//!
//! Sixteen 16-bit registers, r0 through rF:
//! - r0: zero by software convention only (the hardware never enforces it)
//! - rE: stack pointer, used by LL and RL
//! - rF: instruction pointer

use serde::{Serialize, Deserialize};

/// Number of registers in the file.
pub const REGISTER_COUNT: usize = 0x10;

/// The LEAP16 register file.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registers {
    values: [u16; REGISTER_COUNT],
}

impl Registers {
    /// Stack pointer index.
    pub const SP: u8 = 0xE;
    /// Instruction pointer index.
    pub const IP: u8 = 0xF;

    /// Create a new register file with all values zeroed.
    pub fn new() -> Self {
        Self { values: [0; REGISTER_COUNT] }
    }

    /// Reset all registers to zero.
    pub fn reset(&mut self) {
        self.values = [0; REGISTER_COUNT];
    }

    /// Read a register. Only the low 4 bits of `index` select the register.
    #[inline]
    pub fn get(&self, index: u8) -> u16 {
        self.values[(index & 0xF) as usize]
    }

    /// Write a register. Only the low 4 bits of `index` select the register.
    #[inline]
    pub fn set(&mut self, index: u8, value: u16) {
        self.values[(index & 0xF) as usize] = value;
    }

    /// All sixteen registers in index order.
    pub fn as_array(&self) -> &[u16; REGISTER_COUNT] {
        &self.values
    }

    #[inline]
    pub fn ip(&self) -> u16 {
        self.get(Self::IP)
    }

    #[inline]
    pub fn sp(&self) -> u16 {
        self.get(Self::SP)
    }

    /// Increment the instruction pointer by 1 with wraparound.
    /// Returns the old value.
    pub fn advance_ip(&mut self) -> u16 {
        let old = self.ip();
        self.set(Self::IP, old.wrapping_add(1));
        old
    }

    /// Set the instruction pointer to an absolute address.
    pub fn jump(&mut self, addr: u16) {
        self.set(Self::IP, addr);
    }

    /// Move the instruction pointer by a signed displacement, wrapping.
    pub fn leap_relative(&mut self, displacement: u16) {
        let ip = self.ip();
        self.set(Self::IP, ip.wrapping_add(displacement));
    }

    /// Compute `r[base] + offset` modulo 2^16.
    pub fn effective_address(&self, base: u8, offset: u16) -> u16 {
        self.get(base).wrapping_add(offset)
    }
}

impl From<[u16; REGISTER_COUNT]> for Registers {
    fn from(values: [u16; REGISTER_COUNT]) -> Self {
        Self { values }
    }
}
