//! Assembler and disassembler.
//!
//! This module provides:
//! - A line assembler (text → instructions), with the historical
//!   register-parsing quirk available behind a compatibility switch
//! - A disassembler (instructions → text)
//! - A text image format for assembled programs

pub mod assembler;
pub mod disasm;
pub mod image;

pub use assembler::{assemble, assemble_line, Assembly, AssemblerError, RegisterSyntax, RejectedLine};
pub use disasm::{disassemble, format_instruction};
pub use image::{format_image, load_image, parse_image, save_image, ImageError};
