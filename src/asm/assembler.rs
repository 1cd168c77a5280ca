//! Line assembler.
//!
//! Syntax:
//! ```text
//! # Comment (whole-line or trailing)
//! MOV R1 10       # register := immediate
//! ADD R1 R2       # first operand is destination and first source
//! CMP R1 R2
//! JL 7            # targets are literal instruction indices
//! PRINT REG 1
//! HALT
//! ```
//!
//! One instruction per line, mnemonics case-insensitive, no labels.
//! A line either assembles to exactly one instruction, legitimately
//! encodes nothing (blank or comment-only), or is rejected whole;
//! a rejection never produces a partial instruction.

use crate::vm::isa::{Instruction, PrintTarget};
use crate::vm::program::Program;
use thiserror::Error;

/// How register operands are parsed.
///
/// The historical tool parsed registers two different ways depending on
/// opcode vintage. The default here is one strict parser for every
/// opcode; the quirk is preserved behind [`RegisterSyntax::Legacy`] for
/// byte-for-byte behavior parity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RegisterSyntax {
    /// One strict parser for all opcodes: `R`/`r` prefix, all-digit
    /// decimal index 0..=65535. Anything else rejects the line.
    #[default]
    Unified,
    /// Parity mode. Arithmetic-vintage opcodes read the single byte
    /// after the prefix minus ASCII '0' (only single-digit register
    /// names parse meaningfully); the stack and byte-memory opcodes
    /// use the strict parser and encode the sentinel index 65535 on
    /// failure instead of rejecting.
    Legacy,
}

/// Assemble one source line.
///
/// `Ok(None)` means the line legitimately encodes nothing (blank or
/// comment-only). `Err` means the line was rejected; rejections are
/// local and never abort whole-program assembly.
pub fn assemble_line(
    line: &str,
    syntax: RegisterSyntax,
) -> Result<Option<Instruction>, AssemblerError> {
    // Everything from the first '#' onward is comment.
    let code = match line.find('#') {
        Some(idx) => &line[..idx],
        None => line,
    };

    let mut tokens = code.split_whitespace();
    let mnemonic = match tokens.next() {
        Some(token) => token.to_uppercase(),
        None => return Ok(None),
    };
    // Only the first three arguments participate; later tokens are
    // invisible to the arity check.
    let args: Vec<&str> = tokens.take(3).collect();

    let reg = |token: &str| match syntax {
        RegisterSyntax::Unified => strict_register(token)
            .ok_or_else(|| AssemblerError::InvalidRegister(token.to_string())),
        RegisterSyntax::Legacy => Ok(legacy_register(token)),
    };
    // PUSH/POP/IN/OUT/MOVB/STRB always parse strictly; only the
    // failure behavior differs between the two modes.
    let strict_reg = |token: &str| match (syntax, strict_register(token)) {
        (_, Some(index)) => Ok(index),
        (RegisterSyntax::Unified, None) => {
            Err(AssemblerError::InvalidRegister(token.to_string()))
        }
        (RegisterSyntax::Legacy, None) => Ok(u16::MAX),
    };
    let pixel_reg = |token: &str| match syntax {
        RegisterSyntax::Unified => match strict_register(token) {
            Some(index) if index <= u8::MAX as u16 => Ok(index as u8),
            Some(index) => Err(AssemblerError::PixelRegisterRange(index)),
            None => Err(AssemblerError::InvalidRegister(token.to_string())),
        },
        RegisterSyntax::Legacy => Ok(legacy_register(token) as u8),
    };

    let instr = match (mnemonic.as_str(), args.len()) {
        ("NOP", _) => Instruction::Nop,
        ("HALT", _) => Instruction::Halt,
        ("TDRAW_CLEAR", _) => Instruction::TdrawClear,
        ("RET", 0) => Instruction::Ret,

        ("MOV", 2) => Instruction::Mov { dst: reg(args[0])?, imm: parse_immediate(args[1]) },
        ("MOVZ", 2) => Instruction::Movz { dst: reg(args[0])?, imm: parse_immediate(args[1]) },
        ("MOVN", 2) => Instruction::Movn { dst: reg(args[0])?, imm: parse_immediate(args[1]) },

        ("ADD", 2) => Instruction::Add { dst: reg(args[0])?, src: reg(args[1])? },
        ("SUB", 2) => Instruction::Sub { dst: reg(args[0])?, src: reg(args[1])? },
        ("MUL", 2) => Instruction::Mul { dst: reg(args[0])?, src: reg(args[1])? },
        ("UDIV", 2) => Instruction::Udiv { dst: reg(args[0])?, src: reg(args[1])? },
        ("AND", 2) => Instruction::And { dst: reg(args[0])?, src: reg(args[1])? },
        ("ORR", 2) => Instruction::Orr { dst: reg(args[0])?, src: reg(args[1])? },
        ("EOR", 2) => Instruction::Eor { dst: reg(args[0])?, src: reg(args[1])? },
        ("CMP", 2) => Instruction::Cmp { a: reg(args[0])?, b: reg(args[1])? },

        ("LSL", 2) => Instruction::Lsl { dst: reg(args[0])?, shift: parse_immediate(args[1]) },
        ("LSR", 2) => Instruction::Lsr { dst: reg(args[0])?, shift: parse_immediate(args[1]) },
        ("NEG", 1) => Instruction::Neg { dst: reg(args[0])? },

        ("LOAD", 2) => Instruction::Load { dst: reg(args[0])?, addr: parse_immediate(args[1]) },
        ("STORE", 2) => Instruction::Store { src: reg(args[0])?, addr: parse_immediate(args[1]) },
        ("MOVB", 2) => {
            Instruction::Movb { dst: strict_reg(args[0])?, addr: parse_immediate(args[1]) }
        }
        ("STRB", 2) => {
            Instruction::Strb { src: strict_reg(args[0])?, addr: parse_immediate(args[1]) }
        }
        ("MEMCPY", 3) => Instruction::Memcpy {
            dst: parse_immediate(args[0]) as u16,
            src: parse_immediate(args[1]) as u16,
            len: parse_immediate(args[2]),
        },

        ("JMP", 1) => Instruction::Jmp { target: parse_immediate(args[0]) },
        ("JE", 1) => Instruction::Je { target: parse_immediate(args[0]) },
        ("JNE", 1) => Instruction::Jne { target: parse_immediate(args[0]) },
        ("JG", 1) => Instruction::Jg { target: parse_immediate(args[0]) },
        ("JL", 1) => Instruction::Jl { target: parse_immediate(args[0]) },
        ("CALL", 1) => Instruction::Call { target: parse_immediate(args[0]) },

        ("PUSH", 1) => Instruction::Push { src: strict_reg(args[0])? },
        ("POP", 1) => Instruction::Pop { dst: strict_reg(args[0])? },
        ("IN", 1) => Instruction::In { dst: strict_reg(args[0])? },
        ("OUT", 1) => Instruction::Out { src: strict_reg(args[0])? },

        ("PRINT", 2) => {
            let target = match args[0].to_uppercase().as_str() {
                "REG" => PrintTarget::Reg,
                "MEM" => PrintTarget::Mem,
                other => return Err(AssemblerError::InvalidPrintTarget(other.to_string())),
            };
            Instruction::Print { target, index: parse_immediate(args[1]) }
        }

        ("TDRAW_PIXEL", 3) => Instruction::TdrawPixel {
            x: pixel_reg(args[0])?,
            y: pixel_reg(args[1])?,
            ch: args[2].as_bytes()[0],
        },

        (_, operands) => {
            return Err(AssemblerError::UnrecognizedForm { mnemonic: mnemonic.clone(), operands })
        }
    };

    Ok(Some(instr))
}

/// Result of whole-program assembly.
#[derive(Debug, Clone, Default)]
pub struct Assembly {
    /// The assembled program.
    pub program: Program,
    /// Lines that contributed nothing, with the reason.
    pub rejected: Vec<RejectedLine>,
}

/// A rejected source line.
#[derive(Debug, Clone)]
pub struct RejectedLine {
    /// 1-based line number.
    pub line: usize,
    /// The offending source text.
    pub text: String,
    pub error: AssemblerError,
}

/// Assemble a whole source text.
///
/// Rejections are purely local: the offending line contributes nothing
/// and assembly continues. Lines that would overflow the program
/// capacity are rejected with [`AssemblerError::ProgramFull`].
pub fn assemble(source: &str, syntax: RegisterSyntax) -> Assembly {
    let mut assembly = Assembly::default();

    for (idx, line) in source.lines().enumerate() {
        let reject = |error| RejectedLine {
            line: idx + 1,
            text: line.trim().to_string(),
            error,
        };

        match assemble_line(line, syntax) {
            Ok(None) => {}
            Ok(Some(instr)) => {
                if assembly.program.push(instr).is_err() {
                    assembly.rejected.push(reject(AssemblerError::ProgramFull));
                }
            }
            Err(error) => assembly.rejected.push(reject(error)),
        }
    }

    assembly
}

/// Strict register parse: `R`/`r` prefix, all-digit decimal 0..=65535.
fn strict_register(token: &str) -> Option<u16> {
    let digits = token.strip_prefix(['R', 'r'])?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse::<u32>().ok().filter(|&n| n <= u16::MAX as u32).map(|n| n as u16)
}

/// Historical register parse: the byte after the prefix, minus ASCII
/// '0', truncated to 16 bits. Only single-digit names are meaningful;
/// anything else yields an index from raw byte arithmetic.
fn legacy_register(token: &str) -> u16 {
    let byte = token.as_bytes().get(1).copied().unwrap_or(0);
    (byte as i32).wrapping_sub(b'0' as i32) as u16
}

/// Tolerant decimal parse: optional sign, leading digits, everything
/// else reads as zero; wraps into u32.
fn parse_immediate(token: &str) -> u32 {
    let bytes = token.as_bytes();
    let mut i = 0;
    let negative = match bytes.first() {
        Some(b'-') => {
            i = 1;
            true
        }
        Some(b'+') => {
            i = 1;
            false
        }
        _ => false,
    };

    let mut value: u32 = 0;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        value = value.wrapping_mul(10).wrapping_add((bytes[i] - b'0') as u32);
        i += 1;
    }

    if negative {
        value.wrapping_neg()
    } else {
        value
    }
}

/// Errors that can reject a source line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssemblerError {
    #[error("unrecognized form: {mnemonic} with {operands} operand(s)")]
    UnrecognizedForm { mnemonic: String, operands: usize },

    #[error("malformed register operand: {0}")]
    InvalidRegister(String),

    #[error("PRINT target must be REG or MEM, got {0}")]
    InvalidPrintTarget(String),

    #[error("register R{0} does not fit in a pixel operand")]
    PixelRegisterRange(u16),

    #[error("program buffer is full")]
    ProgramFull,
}
