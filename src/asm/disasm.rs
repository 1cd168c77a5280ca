//! Disassembler.
//!
//! Converts instructions back to the assembler's text form. The output
//! re-assembles to the same program.

use crate::vm::isa::{Instruction, PrintTarget};
use crate::vm::program::Program;

/// Format one instruction as assembly text.
pub fn format_instruction(instr: &Instruction) -> String {
    match *instr {
        Instruction::Nop => "NOP".to_string(),
        Instruction::Halt => "HALT".to_string(),
        Instruction::Ret => "RET".to_string(),
        Instruction::TdrawClear => "TDRAW_CLEAR".to_string(),

        Instruction::Mov { dst, imm } => format!("MOV R{} {}", dst, imm),
        Instruction::Movz { dst, imm } => format!("MOVZ R{} {}", dst, imm),
        Instruction::Movn { dst, imm } => format!("MOVN R{} {}", dst, imm),

        Instruction::Add { dst, src } => format!("ADD R{} R{}", dst, src),
        Instruction::Sub { dst, src } => format!("SUB R{} R{}", dst, src),
        Instruction::Mul { dst, src } => format!("MUL R{} R{}", dst, src),
        Instruction::Udiv { dst, src } => format!("UDIV R{} R{}", dst, src),
        Instruction::And { dst, src } => format!("AND R{} R{}", dst, src),
        Instruction::Orr { dst, src } => format!("ORR R{} R{}", dst, src),
        Instruction::Eor { dst, src } => format!("EOR R{} R{}", dst, src),
        Instruction::Cmp { a, b } => format!("CMP R{} R{}", a, b),

        Instruction::Lsl { dst, shift } => format!("LSL R{} {}", dst, shift),
        Instruction::Lsr { dst, shift } => format!("LSR R{} {}", dst, shift),
        Instruction::Neg { dst } => format!("NEG R{}", dst),

        Instruction::Load { dst, addr } => format!("LOAD R{} {}", dst, addr),
        Instruction::Store { src, addr } => format!("STORE R{} {}", src, addr),
        Instruction::Movb { dst, addr } => format!("MOVB R{} {}", dst, addr),
        Instruction::Strb { src, addr } => format!("STRB R{} {}", src, addr),
        Instruction::Memcpy { dst, src, len } => format!("MEMCPY {} {} {}", dst, src, len),

        Instruction::Jmp { target } => format!("JMP {}", target),
        Instruction::Je { target } => format!("JE {}", target),
        Instruction::Jne { target } => format!("JNE {}", target),
        Instruction::Jg { target } => format!("JG {}", target),
        Instruction::Jl { target } => format!("JL {}", target),
        Instruction::Call { target } => format!("CALL {}", target),

        Instruction::Push { src } => format!("PUSH R{}", src),
        Instruction::Pop { dst } => format!("POP R{}", dst),
        Instruction::In { dst } => format!("IN R{}", dst),
        Instruction::Out { src } => format!("OUT R{}", src),

        Instruction::Print { target: PrintTarget::Reg, index } => format!("PRINT REG {}", index),
        Instruction::Print { target: PrintTarget::Mem, index } => format!("PRINT MEM {}", index),

        Instruction::TdrawPixel { x, y, ch } => {
            format!("TDRAW_PIXEL R{} R{} {}", x, y, ch as char)
        }
    }
}

/// Disassemble a whole program as an addressed listing.
pub fn disassemble(program: &Program) -> String {
    let mut output = String::new();
    output.push_str("# disassembly\n");

    for (addr, instr) in program.iter().enumerate() {
        output.push_str(&format!("{:04}: {}\n", addr, format_instruction(instr)));
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asm::assembler::{assemble_line, RegisterSyntax};

    #[test]
    fn test_format_basic_forms() {
        assert_eq!(format_instruction(&Instruction::Halt), "HALT");
        assert_eq!(
            format_instruction(&Instruction::Mov { dst: 3, imm: 42 }),
            "MOV R3 42"
        );
        assert_eq!(
            format_instruction(&Instruction::Print { target: PrintTarget::Mem, index: 7 }),
            "PRINT MEM 7"
        );
    }

    #[test]
    fn test_output_reassembles() {
        let cases = [
            Instruction::Nop,
            Instruction::Mov { dst: 12, imm: 42 },
            Instruction::Add { dst: 1, src: 2 },
            Instruction::Cmp { a: 1, b: 2 },
            Instruction::Jl { target: 10 },
            Instruction::Push { src: 300 },
            Instruction::Memcpy { dst: 100, src: 200, len: 10 },
            Instruction::TdrawPixel { x: 1, y: 2, ch: b'*' },
            Instruction::Print { target: PrintTarget::Reg, index: 4 },
            Instruction::Halt,
        ];

        for instr in cases {
            let text = format_instruction(&instr);
            let back = assemble_line(&text, RegisterSyntax::Unified).unwrap().unwrap();
            assert_eq!(back, instr, "through {:?}", text);
        }
    }

    #[test]
    fn test_listing_has_addresses() {
        let program = crate::vm::program::Program::from_instructions(vec![
            Instruction::Nop,
            Instruction::Halt,
        ])
        .unwrap();

        let listing = disassemble(&program);
        assert!(listing.contains("0000: NOP"));
        assert!(listing.contains("0001: HALT"));
    }
}
