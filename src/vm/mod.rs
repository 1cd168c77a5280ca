//! The virtual machine.
//!
//! This module implements the complete machine:
//! - a fixed-width instruction set and its binary record encoding
//! - a resizable file of 32-bit registers (default 256, ceiling 65536)
//! - 2024 bytes of byte-addressable memory
//! - a 1024-slot call stack
//! - the fetch-decode-execute engine with a permissive-execution
//!   contract (out-of-range operands are typed no-ops)

pub mod execute;
pub mod isa;
pub mod memory;
pub mod program;
pub mod registers;
pub mod stack;
pub mod tdraw;

pub use execute::{fmt_memory, fmt_register, Machine, MachineFault, MachineState, Skip, StepOutcome};
pub use isa::{decode, encode, DecodeError, Instruction, Opcode, PrintTarget, RawInstruction};
pub use memory::{Memory, MEMORY_SIZE};
pub use program::{Program, ProgramError, PROGRAM_CAPACITY};
pub use registers::{CmpOrder, Flags, RegisterFile, DEFAULT_REGISTERS, MAX_REGISTERS};
pub use stack::{CallStack, STACK_CAPACITY};
