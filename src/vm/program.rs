//! The program buffer.
//!
//! An ordered sequence of instructions with a fixed capacity equal to
//! the memory size: program and data share an address-space size but
//! live in separate buffers. Addresses between the loaded count and the
//! capacity read as zeroed records, i.e. NOP; addresses at or past the
//! capacity are the end of the road for the program counter.

use crate::vm::isa::Instruction;
use crate::vm::memory::MEMORY_SIZE;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximum number of instructions a program can hold.
pub const PROGRAM_CAPACITY: usize = MEMORY_SIZE;

/// An assembled program.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Program {
    instructions: Vec<Instruction>,
}

impl Program {
    /// Create an empty program.
    pub fn new() -> Self {
        Self {
            instructions: Vec::new(),
        }
    }

    /// Build a program from a list of instructions.
    pub fn from_instructions(instructions: Vec<Instruction>) -> Result<Self, ProgramError> {
        if instructions.len() > PROGRAM_CAPACITY {
            return Err(ProgramError::TooLarge {
                size: instructions.len(),
            });
        }
        Ok(Self { instructions })
    }

    /// Append one instruction.
    pub fn push(&mut self, instr: Instruction) -> Result<(), ProgramError> {
        if self.instructions.len() >= PROGRAM_CAPACITY {
            return Err(ProgramError::TooLarge {
                size: self.instructions.len() + 1,
            });
        }
        self.instructions.push(instr);
        Ok(())
    }

    /// Number of loaded instructions.
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// The instruction at `addr`, if one was loaded there.
    pub fn get(&self, addr: u32) -> Option<Instruction> {
        self.instructions.get(addr as usize).copied()
    }

    /// Fetch for execution: loaded instruction, NOP in the zeroed tail,
    /// `None` at or past the capacity.
    pub fn fetch(&self, addr: u32) -> Option<Instruction> {
        if addr as usize >= PROGRAM_CAPACITY {
            return None;
        }
        Some(self.get(addr).unwrap_or(Instruction::Nop))
    }

    /// Iterate over the loaded instructions.
    pub fn iter(&self) -> impl Iterator<Item = &Instruction> {
        self.instructions.iter()
    }
}

/// Errors that can occur while building a program.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProgramError {
    #[error("program size {size} exceeds capacity {PROGRAM_CAPACITY}")]
    TooLarge { size: usize },
}
