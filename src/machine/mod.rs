//! Machine emulation for LEAP16.
//!
//! This module implements the complete LEAP16 architecture:
//! - 65536 sixteen-bit memory words
//! - 16 sixteen-bit registers (rE stack pointer, rF instruction pointer)
//! - 14-instruction set with a 4-bit opcode

pub mod memory;
pub mod registers;
pub mod decode;
pub mod execute;

pub use memory::{Memory, LoadError, MEMORY_SIZE};
pub use registers::Registers;
pub use decode::{Instruction, Opcode, decode, encode};
pub use execute::{Machine, MachineConfig, CounterWidth};
