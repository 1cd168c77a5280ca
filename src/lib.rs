//! # micro32
//!
//! A small 32-bit register-machine simulator: a line assembler that
//! turns one mnemonic per line into a fixed-width instruction record,
//! and a virtual machine that executes those records against a
//! resizable register file, a byte-addressable memory, and a call
//! stack.
//!
//! Execution is deliberately permissive: out-of-range operands make an
//! instruction an observable no-op rather than an error, and only the
//! stack faults stop a program early.

pub mod asm;
pub mod shell;
pub mod translate;
pub mod vm;

#[cfg(feature = "tui")]
pub mod tui;

// Re-export commonly used types
pub use asm::{assemble, assemble_line, disassemble, AssemblerError, Assembly, RegisterSyntax};
pub use vm::{
    Instruction, Machine, MachineFault, MachineState, Opcode, Program, RawInstruction, Skip,
    StepOutcome,
};

#[cfg(feature = "tui")]
pub use tui::run_debugger;
