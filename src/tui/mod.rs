//! TUI debugger for the LEAP16 emulator.
//!
//! Provides an interactive terminal-based debugger with:
//! - Live register, stack and cycle counter view
//! - Memory view
//! - Step/run/breakpoint controls
//! - Code view of raw words and their decoded form

mod app;
mod ui;

pub use app::{DebuggerApp, run_debugger};
