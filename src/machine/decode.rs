//! Instruction decoder for LEAP16.
//!
//! Every instruction is one 16-bit word. The opcode sits in bits 15-12 and
//! the remaining twelve bits are split per instruction form:
//!
//! ```text
//!  15   12 11    8 7     4 3     0
//! +-------+-------+-------+-------+
//! |  op   |   a   |   b   |   c   |   three 4-bit fields
//! +-------+-------+-------+-------+
//! |  op   |   a   |     imm8      |   LEAP / LL
//! +-------+-------+---------------+
//! ```
//!
//! LEQ and LLT use the three-field form with `c` read as a signed 4-bit
//! immediate. The field helpers below are pure functions of the word.

use serde::{Serialize, Deserialize};

/// Opcode values (bits 15-12 of the instruction word).
#[derive(Debug, Clone, Copy)]
pub struct Opcode;

impl Opcode {
    pub const LOAD: u8 = 0x0;
    pub const ADD: u8 = 0x2;
    pub const SUB: u8 = 0x3;
    pub const AND: u8 = 0x4;
    pub const OR: u8 = 0x5;
    pub const SL: u8 = 0x6;
    pub const SR: u8 = 0x7;
    pub const LEAP: u8 = 0x8;
    pub const LL: u8 = 0xA;
    pub const RL: u8 = 0xB;
    pub const LEQ: u8 = 0xC;
    pub const LLT: u8 = 0xD;
    pub const STOR: u8 = 0xE;
    pub const HALT: u8 = 0xF;
}

/// Bits 15-12.
#[inline]
pub const fn opcode(word: u16) -> u8 {
    ((word >> 12) & 0xF) as u8
}

/// Bits 11-8.
#[inline]
pub const fn field_a(word: u16) -> u8 {
    ((word >> 8) & 0xF) as u8
}

/// Bits 7-4.
#[inline]
pub const fn field_b(word: u16) -> u8 {
    ((word >> 4) & 0xF) as u8
}

/// Bits 3-0.
#[inline]
pub const fn field_c(word: u16) -> u8 {
    (word & 0xF) as u8
}

/// Bits 7-0.
#[inline]
pub const fn field_imm8(word: u16) -> u8 {
    (word & 0xFF) as u8
}

/// Widen a two's-complement 8-bit field to 16 bits.
#[inline]
pub const fn sign_extend_8(field: u8) -> u16 {
    field as i8 as i16 as u16
}

/// Widen a two's-complement 4-bit field (sign at bit 3) to 16 bits.
#[inline]
pub const fn sign_extend_4(field: u8) -> u16 {
    (((field << 4) as i8) >> 4) as i16 as u16
}

/// Decoded LEAP16 instruction.
///
/// Register operands are 4-bit indices. Signed offsets are stored already
/// interpreted as two's complement; `offset` on LEQ/LLT is in -8..=7.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Instruction {
    // ==================== Memory ====================

    /// `r[dest] := m[r[base] + offset]`
    Load { base: u8, offset: u8, dest: u8 },

    /// `m[r[base] + offset] := r[src]`
    Store { base: u8, offset: u8, src: u8 },

    // ==================== Arithmetic / Logic ====================

    Add { x: u8, y: u8, dest: u8 },
    Sub { x: u8, y: u8, dest: u8 },
    And { x: u8, y: u8, dest: u8 },
    Or { x: u8, y: u8, dest: u8 },

    /// `r[dest] := r[src] << amount`
    ShiftLeft { src: u8, amount: u8, dest: u8 },

    /// `r[dest] := r[src] >> amount` (logical)
    ShiftRight { src: u8, amount: u8, dest: u8 },

    // ==================== Control Flow ====================

    /// `rF := r[base] + offset`
    Leap { base: u8, offset: i8 },

    /// Push rF, then `rF := r[base] + offset`
    LeapLink { base: u8, offset: i8 },

    /// Pop rF
    ReturnLink,

    /// `if r[x] == r[y] { rF += offset }`
    LeapEqual { x: u8, y: u8, offset: i8 },

    /// `if r[x] < r[y] { rF += offset }` (unsigned)
    LeapLess { x: u8, y: u8, offset: i8 },

    Halt,

    /// Opcodes 0x1 and 0x9. Executes as a no-op.
    Unassigned(u8),
}

/// Decode a 16-bit instruction word. Every word decodes.
pub fn decode(word: u16) -> Instruction {
    let (a, b, c) = (field_a(word), field_b(word), field_c(word));
    let imm8 = field_imm8(word) as i8;
    let imm4 = sign_extend_4(c) as i16 as i8;

    match opcode(word) {
        Opcode::LOAD => Instruction::Load { base: a, offset: b, dest: c },
        Opcode::ADD => Instruction::Add { x: a, y: b, dest: c },
        Opcode::SUB => Instruction::Sub { x: a, y: b, dest: c },
        Opcode::AND => Instruction::And { x: a, y: b, dest: c },
        Opcode::OR => Instruction::Or { x: a, y: b, dest: c },
        Opcode::SL => Instruction::ShiftLeft { src: a, amount: b, dest: c },
        Opcode::SR => Instruction::ShiftRight { src: a, amount: b, dest: c },
        Opcode::LEAP => Instruction::Leap { base: a, offset: imm8 },
        Opcode::LL => Instruction::LeapLink { base: a, offset: imm8 },
        Opcode::RL => Instruction::ReturnLink,
        Opcode::LEQ => Instruction::LeapEqual { x: a, y: b, offset: imm4 },
        Opcode::LLT => Instruction::LeapLess { x: a, y: b, offset: imm4 },
        Opcode::STOR => Instruction::Store { base: a, offset: b, src: c },
        Opcode::HALT => Instruction::Halt,
        op => Instruction::Unassigned(op),
    }
}

fn pack(op: u8, a: u8, b: u8, c: u8) -> u16 {
    ((op as u16 & 0xF) << 12) | ((a as u16 & 0xF) << 8) | ((b as u16 & 0xF) << 4) | (c as u16 & 0xF)
}

fn pack_imm8(op: u8, a: u8, imm: i8) -> u16 {
    ((op as u16 & 0xF) << 12) | ((a as u16 & 0xF) << 8) | (imm as u8 as u16)
}

/// Encode an instruction back to a 16-bit word.
///
/// Fields wider than their slot are truncated to the slot width, so a
/// LEQ/LLT offset outside -8..=7 keeps only its low four bits.
pub fn encode(instr: &Instruction) -> u16 {
    match *instr {
        Instruction::Load { base, offset, dest } => pack(Opcode::LOAD, base, offset, dest),
        Instruction::Store { base, offset, src } => pack(Opcode::STOR, base, offset, src),
        Instruction::Add { x, y, dest } => pack(Opcode::ADD, x, y, dest),
        Instruction::Sub { x, y, dest } => pack(Opcode::SUB, x, y, dest),
        Instruction::And { x, y, dest } => pack(Opcode::AND, x, y, dest),
        Instruction::Or { x, y, dest } => pack(Opcode::OR, x, y, dest),
        Instruction::ShiftLeft { src, amount, dest } => pack(Opcode::SL, src, amount, dest),
        Instruction::ShiftRight { src, amount, dest } => pack(Opcode::SR, src, amount, dest),
        Instruction::Leap { base, offset } => pack_imm8(Opcode::LEAP, base, offset),
        Instruction::LeapLink { base, offset } => pack_imm8(Opcode::LL, base, offset),
        Instruction::ReturnLink => pack(Opcode::RL, 0, 0, 0),
        Instruction::LeapEqual { x, y, offset } => pack(Opcode::LEQ, x, y, offset as u8),
        Instruction::LeapLess { x, y, offset } => pack(Opcode::LLT, x, y, offset as u8),
        Instruction::Halt => pack(Opcode::HALT, 0, 0, 0),
        Instruction::Unassigned(op) => pack(op, 0, 0, 0),
    }
}
