//! TUI debugger.
//!
//! Provides an interactive terminal-based debugger with:
//! - Disassembly view centered on the program counter
//! - Register, flag, and stack state
//! - Byte memory view
//! - Step/run/breakpoint controls

mod app;
mod ui;

pub use app::{run_debugger, DebuggerApp};
