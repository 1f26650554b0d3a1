//! Text dumps of machine state.
//!
//! Everything here is read-only formatting of state the machine already
//! computed; nothing feeds back into execution.

use crate::machine::{Machine, MEMORY_SIZE};
use std::fmt::Write;

/// One line per register: `rX:     XXXX`.
pub fn registers(machine: &Machine) -> String {
    let mut out = String::new();
    for (i, value) in machine.regs.as_array().iter().enumerate() {
        let _ = writeln!(out, "r{:01X}:     {:04X}", i, value);
    }
    out
}

/// One line per word, `ioXXXX:  XXXX`, in `start..start + count`, clamped to the address space.
pub fn memory(machine: &Machine, start: u16, count: usize) -> String {
    let mut out = String::new();
    for (addr, value) in machine.mem.dump(start, count) {
        let _ = writeln!(out, "io{:04X}:  {:04X}", addr, value);
    }
    out
}

/// Stack words from rE up to the top of memory.
pub fn stack(machine: &Machine) -> String {
    if !machine.stack_in_use() {
        return "stack empty\n".to_string();
    }

    let mut out = String::new();
    let sp = machine.regs.sp() as usize;
    for (i, value) in machine.stack().iter().enumerate() {
        let _ = writeln!(out, "s{:04X}:  {:04X}", sp + i, value);
    }
    out
}

/// Cycle count in hex, at least eight digits.
pub fn cycles(machine: &Machine) -> String {
    format!("c:      {:08X}\n", machine.cycles)
}

/// Registers, the first `io_words` memory words, the stack and the cycle
/// count.
pub fn full(machine: &Machine, io_words: usize) -> String {
    let mut out = registers(machine);
    out.push_str(&memory(machine, 0, io_words.min(MEMORY_SIZE)));
    out.push_str(&stack(machine));
    out.push_str(&cycles(machine));
    out
}
