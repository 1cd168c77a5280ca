//! Image file format for assembled programs.
//!
//! A simple text format, one fixed-size record per line as four hex
//! fields (opcode, op1, op2, imm):
//!
//! ```text
//! # micro32 image
//! 01 0003 0000 0000002A   # 0000  MOV R3 42
//! 09 0000 0000 00000000   # 0001  HALT
//! ```
//!
//! `#` begins a comment, blank lines are ignored.

use crate::asm::disasm::format_instruction;
use crate::vm::isa::{decode, encode, RawInstruction};
use crate::vm::program::Program;
use std::io::Write;
use std::path::Path;
use thiserror::Error;

/// Parse image text into a program.
pub fn parse_image(text: &str) -> Result<Program, ImageError> {
    let mut program = Program::new();

    for (idx, line) in text.lines().enumerate() {
        let line_num = idx + 1;
        let code = match line.find('#') {
            Some(pos) => &line[..pos],
            None => line,
        };

        let fields: Vec<&str> = code.split_whitespace().collect();
        if fields.is_empty() {
            continue;
        }
        if fields.len() != 4 {
            return Err(ImageError::Parse {
                line: line_num,
                message: format!("expected 4 fields, found {}", fields.len()),
            });
        }

        let opcode = parse_hex(fields[0], line_num)?;
        let op1 = parse_hex(fields[1], line_num)?;
        let op2 = parse_hex(fields[2], line_num)?;
        let imm = parse_hex(fields[3], line_num)?;
        if opcode > u8::MAX as u32 || op1 > u16::MAX as u32 || op2 > u16::MAX as u32 {
            return Err(ImageError::Parse {
                line: line_num,
                message: "field value out of range".to_string(),
            });
        }
        let raw = RawInstruction {
            opcode: opcode as u8,
            op1: op1 as u16,
            op2: op2 as u16,
            imm,
        };

        let instr = decode(raw).map_err(|e| ImageError::Parse {
            line: line_num,
            message: e.to_string(),
        })?;

        program.push(instr).map_err(|e| ImageError::Parse {
            line: line_num,
            message: e.to_string(),
        })?;
    }

    Ok(program)
}

/// Render a program as image text.
pub fn format_image(program: &Program) -> String {
    let mut output = String::new();
    output.push_str("# micro32 image\n");
    output.push_str(&format!("# {} instructions\n\n", program.len()));

    for (addr, instr) in program.iter().enumerate() {
        let raw = encode(instr);
        output.push_str(&format!(
            "{:02X} {:04X} {:04X} {:08X}   # {:04}  {}\n",
            raw.opcode,
            raw.op1,
            raw.op2,
            raw.imm,
            addr,
            format_instruction(instr)
        ));
    }

    output
}

/// Load an image file from disk.
pub fn load_image<P: AsRef<Path>>(path: P) -> Result<Program, ImageError> {
    let text =
        std::fs::read_to_string(path.as_ref()).map_err(|e| ImageError::Io(e.to_string()))?;
    parse_image(&text)
}

/// Save a program as an image file.
pub fn save_image<P: AsRef<Path>>(path: P, program: &Program) -> Result<(), ImageError> {
    let mut file = std::fs::File::create(path.as_ref()).map_err(|e| ImageError::Io(e.to_string()))?;
    file.write_all(format_image(program).as_bytes())
        .map_err(|e| ImageError::Io(e.to_string()))
}

fn parse_hex(field: &str, line: usize) -> Result<u32, ImageError> {
    u32::from_str_radix(field, 16).map_err(|_| ImageError::Parse {
        line,
        message: format!("invalid hex field: {}", field),
    })
}

/// Errors that can occur loading or saving an image.
#[derive(Debug, Clone, Error)]
pub enum ImageError {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("parse error on line {line}: {message}")]
    Parse { line: usize, message: String },
}
