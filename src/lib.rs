//! # LEAP16 Emulator
//!
//! A functional emulator of the LEAP16 computer architecture: 16-bit
//! instructions, sixteen 16-bit registers, 64Ki words of memory and a
//! cycle counter.
//!
//! ```
//! use leap16::{Machine, Instruction, encode};
//!
//! let mut machine = Machine::new();
//! machine.load_program(&[encode(&Instruction::Halt)]).unwrap();
//! machine.run();
//! assert_eq!(machine.cycles, 1);
//! ```

pub mod machine;
pub mod image;
pub mod dump;

#[cfg(feature = "tui")]
pub mod tui;

#[cfg(feature = "wasm")]
pub mod wasm;

// Re-export commonly used types
pub use machine::{Machine, MachineConfig, CounterWidth, Memory, Registers, Instruction, LoadError};
pub use machine::{decode, encode};
pub use image::{ImageFormat, ByteOrder, ImageError, load_image, save_image};

#[cfg(feature = "tui")]
pub use tui::run_debugger;
