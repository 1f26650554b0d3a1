//! WebAssembly bindings for the LEAP16 emulator.
//!
//! This module provides JavaScript-friendly wrappers around the core emulator.

use wasm_bindgen::prelude::*;
use crate::machine::{CounterWidth, Machine, MachineConfig, MEMORY_SIZE};

/// Initialize panic hook for better error messages in console.
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// WebAssembly-friendly machine wrapper.
#[wasm_bindgen]
pub struct WasmMachine {
    machine: Machine,
    program: Vec<u16>,
    halted: bool,
}

#[wasm_bindgen]
impl WasmMachine {
    /// Create a new machine. `narrow_counter` selects the 16-bit cycle counter.
    #[wasm_bindgen(constructor)]
    pub fn new(narrow_counter: bool) -> Self {
        let counter = if narrow_counter { CounterWidth::Narrow } else { CounterWidth::Wide };
        Self {
            machine: Machine::with_config(MachineConfig { counter }),
            program: Vec::new(),
            halted: false,
        }
    }

    /// Load a program image at address 0. A rejected image leaves the
    /// machine reset with no program.
    #[wasm_bindgen]
    pub fn load_words(&mut self, words: &[u16]) -> Result<usize, JsError> {
        self.program = words.to_vec();
        if let Err(e) = self.reset() {
            self.program.clear();
            return Err(e);
        }
        Ok(words.len())
    }

    /// Execute one instruction. Returns true if it was HALT.
    #[wasm_bindgen]
    pub fn step(&mut self) -> bool {
        self.halted = self.machine.cycle();
        self.halted
    }

    /// Run until HALT or `max_cycles` instructions, whichever comes first.
    /// Returns the number of instructions executed.
    #[wasm_bindgen]
    pub fn run(&mut self, max_cycles: u32) -> u32 {
        let mut executed = 0;
        while executed < max_cycles {
            executed += 1;
            if self.step() {
                break;
            }
        }
        executed
    }

    /// Reset to the initial state with the loaded program.
    #[wasm_bindgen]
    pub fn reset(&mut self) -> Result<(), JsError> {
        self.machine.reset();
        self.halted = false;
        self.machine
            .load_program(&self.program)
            .map_err(|e| JsError::new(&e.to_string()))
    }

    /// Whether the last executed instruction was HALT.
    #[wasm_bindgen]
    pub fn is_halted(&self) -> bool {
        self.halted
    }

    #[wasm_bindgen]
    pub fn cycles(&self) -> u64 {
        self.machine.cycles
    }

    /// Get instruction pointer (rF).
    #[wasm_bindgen]
    pub fn ip(&self) -> u16 {
        self.machine.regs.ip()
    }

    #[wasm_bindgen]
    pub fn register(&self, index: u8) -> u16 {
        self.machine.regs.get(index)
    }

    /// All sixteen registers.
    #[wasm_bindgen]
    pub fn registers(&self) -> Vec<u16> {
        self.machine.regs.as_array().to_vec()
    }

    #[wasm_bindgen]
    pub fn memory_at(&self, addr: u16) -> u16 {
        self.machine.mem.read(addr)
    }

    /// Copy of `len` words starting at `start`, clamped to the address space.
    #[wasm_bindgen]
    pub fn memory_range(&self, start: u16, len: usize) -> js_sys::Uint16Array {
        let end = (start as usize + len).min(MEMORY_SIZE);
        js_sys::Uint16Array::from(&self.machine.mem.as_slice()[start as usize..end])
    }

    /// Registers, stack pointer and cycle count as a JSON string.
    #[wasm_bindgen]
    pub fn state_json(&self) -> Result<String, JsError> {
        let state = serde_json::json!({
            "registers": self.machine.regs.as_array(),
            "cycles": self.machine.cycles,
            "stack": self.machine.stack().iter().take(64).collect::<Vec<_>>(),
            "halted": self.halted,
        });
        serde_json::to_string(&state).map_err(|e| JsError::new(&e.to_string()))
    }
}

impl Default for WasmMachine {
    fn default() -> Self {
        Self::new(false)
    }
}
