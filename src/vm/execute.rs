//! The execution engine.
//!
//! [`Machine`] aggregates the whole mutable machine state (registers,
//! memory, call stack, condition flags, program counter) so multiple
//! independent machines can coexist and tests stay isolated. The
//! executor is permissive by contract: an out-of-range operand makes
//! the instruction an observable no-op, reported as a typed
//! [`StepOutcome::Skipped`] rather than an error. The only conditions
//! that stop a program early are the stack faults on PUSH/POP/CALL/RET.

use crate::vm::isa::{Instruction, PrintTarget};
use crate::vm::memory::{Memory, MEMORY_SIZE};
use crate::vm::program::Program;
use crate::vm::registers::{CmpOrder, Flags, RegisterFile};
use crate::vm::stack::CallStack;
use crate::vm::tdraw;
use serde::{Deserialize, Serialize};
use std::io::{self, BufRead, Write};
use thiserror::Error;

/// Machine execution state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MachineState {
    /// Fetching and executing instructions.
    Running,
    /// Stopped: HALT, a machine fault, or the counter ran off the
    /// program buffer.
    Halted,
}

/// What one step did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// The instruction applied its full effect.
    Executed,
    /// The instruction was a defined no-op; state is unchanged.
    Skipped(Skip),
    /// The machine halted on this step.
    Halted,
}

/// Why an instruction was skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Skip {
    /// A register index outside the current register file.
    RegisterOutOfRange(u16),
    /// A memory or program address outside its buffer.
    AddressOutOfRange(u32),
    /// UDIV with a zero divisor.
    DivisionByZero,
}

/// Fatal conditions. A fault halts the running program; it never
/// terminates the hosting process.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MachineFault {
    #[error("stack overflow in {0}")]
    StackOverflow(&'static str),

    #[error("stack underflow in {0}")]
    StackUnderflow(&'static str),

    #[error("invalid register R{index} in {op}")]
    InvalidRegister { op: &'static str, index: u16 },

    #[error("call target {0} out of range")]
    CallOutOfRange(u32),

    #[error("machine is not running")]
    NotRunning,
}

/// The virtual machine.
#[derive(Clone, Serialize, Deserialize)]
pub struct Machine {
    /// Register file.
    pub regs: RegisterFile,
    /// Data memory.
    pub mem: Memory,
    /// Call/value stack.
    pub stack: CallStack,
    /// Condition flags, written only by CMP.
    pub flags: Flags,
    /// Index of the next instruction to fetch.
    pub pc: u32,
    /// Current execution state.
    pub state: MachineState,
    /// Instructions executed so far.
    pub cycles: u64,
}

impl Machine {
    /// Create a machine with the default register count.
    pub fn new() -> Self {
        Self::with_registers(crate::vm::registers::DEFAULT_REGISTERS)
    }

    /// Create a machine with `count` registers (clamped to the ceiling).
    pub fn with_registers(count: u32) -> Self {
        Self {
            regs: RegisterFile::with_count(count),
            mem: Memory::new(),
            stack: CallStack::new(),
            flags: Flags::new(),
            pc: 0,
            state: MachineState::Running,
            cycles: 0,
        }
    }

    /// Zero all state, keeping the register count.
    pub fn reset(&mut self) {
        self.regs.clear();
        self.mem.clear();
        self.stack.clear();
        self.flags = Flags::new();
        self.pc = 0;
        self.state = MachineState::Running;
        self.cycles = 0;
    }

    /// Rewind the counter and resume running, keeping registers,
    /// memory, and stack contents.
    pub fn restart(&mut self) {
        self.pc = 0;
        self.state = MachineState::Running;
    }

    pub fn is_running(&self) -> bool {
        self.state == MachineState::Running
    }

    pub fn is_halted(&self) -> bool {
        self.state == MachineState::Halted
    }

    /// Fetch and execute one instruction.
    ///
    /// The counter advances by exactly one afterwards; control-transfer
    /// instructions store `target - 1` so the shared increment lands on
    /// the target.
    pub fn step(&mut self, program: &Program) -> Result<StepOutcome, MachineFault> {
        if self.state != MachineState::Running {
            return Err(MachineFault::NotRunning);
        }

        let instr = match program.fetch(self.pc) {
            Some(instr) => instr,
            None => {
                self.state = MachineState::Halted;
                return Ok(StepOutcome::Halted);
            }
        };

        let outcome = match self.execute(instr) {
            Ok(outcome) => outcome,
            Err(fault) => {
                self.state = MachineState::Halted;
                return Err(fault);
            }
        };

        self.cycles += 1;
        self.pc = self.pc.wrapping_add(1);
        Ok(outcome)
    }

    /// Run until the machine halts. Returns the number of instructions
    /// executed, or the fault that stopped the program.
    pub fn run(&mut self, program: &Program) -> Result<u64, MachineFault> {
        let start = self.cycles;
        while self.state == MachineState::Running {
            self.step(program)?;
        }
        Ok(self.cycles - start)
    }

    /// Run for at most `max_cycles` instructions.
    pub fn run_limited(&mut self, program: &Program, max_cycles: u64) -> Result<u64, MachineFault> {
        let start = self.cycles;
        let limit = self.cycles.saturating_add(max_cycles);
        while self.state == MachineState::Running && self.cycles < limit {
            self.step(program)?;
        }
        Ok(self.cycles - start)
    }

    /// Apply one instruction's effect.
    fn execute(&mut self, instr: Instruction) -> Result<StepOutcome, MachineFault> {
        use StepOutcome::{Executed, Skipped};

        let outcome = match instr {
            Instruction::Nop => Executed,

            Instruction::Halt => {
                self.state = MachineState::Halted;
                StepOutcome::Halted
            }

            // ==================== Moves ====================

            Instruction::Mov { dst, imm } => self.write_reg(dst, |_| imm),
            Instruction::Movz { dst, imm } => self.write_reg(dst, |_| imm as u16 as u32),
            Instruction::Movn { dst, imm } => self.write_reg(dst, |_| !imm),

            // ==================== Arithmetic ====================

            Instruction::Add { dst, src } => self.binary_op(dst, src, u32::wrapping_add),
            Instruction::Sub { dst, src } => self.binary_op(dst, src, u32::wrapping_sub),
            Instruction::Mul { dst, src } => self.binary_op(dst, src, u32::wrapping_mul),
            Instruction::Neg { dst } => self.write_reg(dst, u32::wrapping_neg),

            Instruction::Udiv { dst, src } => {
                match (self.regs.get(dst), self.regs.get(src)) {
                    (Some(_), Some(0)) => Skipped(Skip::DivisionByZero),
                    (Some(a), Some(b)) => {
                        self.regs.set(dst, a / b);
                        Executed
                    }
                    _ => Skipped(Skip::RegisterOutOfRange(self.first_bad_reg(dst, src))),
                }
            }

            // ==================== Bitwise / shift ====================

            Instruction::And { dst, src } => self.binary_op(dst, src, |a, b| a & b),
            Instruction::Orr { dst, src } => self.binary_op(dst, src, |a, b| a | b),
            Instruction::Eor { dst, src } => self.binary_op(dst, src, |a, b| a ^ b),

            Instruction::Lsl { dst, shift } => {
                self.write_reg(dst, |v| v.checked_shl(shift).unwrap_or(0))
            }
            Instruction::Lsr { dst, shift } => {
                self.write_reg(dst, |v| v.checked_shr(shift).unwrap_or(0))
            }

            // ==================== Memory ====================

            Instruction::Load { dst, addr } | Instruction::Movb { dst, addr } => {
                match (self.regs.get(dst), self.mem.read(addr)) {
                    (Some(_), Some(byte)) => {
                        self.regs.set(dst, byte as u32);
                        Executed
                    }
                    (None, _) => Skipped(Skip::RegisterOutOfRange(dst)),
                    _ => Skipped(Skip::AddressOutOfRange(addr)),
                }
            }

            Instruction::Store { src, addr } | Instruction::Strb { src, addr } => {
                match self.regs.get(src) {
                    Some(value) if (addr as usize) < MEMORY_SIZE => {
                        self.mem.write(addr, value as u8);
                        Executed
                    }
                    Some(_) => Skipped(Skip::AddressOutOfRange(addr)),
                    None => Skipped(Skip::RegisterOutOfRange(src)),
                }
            }

            Instruction::Memcpy { dst, src, len } => {
                if self.mem.copy_within(dst, src, len) {
                    Executed
                } else {
                    let bad = if dst as usize + len as usize > MEMORY_SIZE {
                        dst
                    } else {
                        src
                    };
                    Skipped(Skip::AddressOutOfRange(bad as u32))
                }
            }

            // ==================== Compare & branch ====================

            Instruction::Cmp { a, b } => match (self.regs.get(a), self.regs.get(b)) {
                (Some(va), Some(vb)) => {
                    self.flags.compare(va, vb);
                    Executed
                }
                _ => Skipped(Skip::RegisterOutOfRange(self.first_bad_reg(a, b))),
            },

            Instruction::Jmp { target } => self.branch(true, target),
            Instruction::Je { target } => self.branch(self.flags.equal, target),
            Instruction::Jne { target } => self.branch(!self.flags.equal, target),
            Instruction::Jg { target } => self.branch(self.flags.order == CmpOrder::Greater, target),
            Instruction::Jl { target } => self.branch(self.flags.order == CmpOrder::Less, target),

            // ==================== Stack & calls ====================

            Instruction::Push { src } => {
                let value = self
                    .regs
                    .get(src)
                    .ok_or(MachineFault::InvalidRegister { op: "PUSH", index: src })?;
                if !self.stack.push(value) {
                    return Err(MachineFault::StackOverflow("PUSH"));
                }
                Executed
            }

            Instruction::Pop { dst } => {
                if self.regs.get(dst).is_none() {
                    return Err(MachineFault::InvalidRegister { op: "POP", index: dst });
                }
                let value = self
                    .stack
                    .pop()
                    .ok_or(MachineFault::StackUnderflow("POP"))?;
                self.regs.set(dst, value);
                Executed
            }

            Instruction::Call { target } => {
                if target as usize >= MEMORY_SIZE {
                    return Err(MachineFault::CallOutOfRange(target));
                }
                if !self.stack.push(self.pc) {
                    return Err(MachineFault::StackOverflow("CALL"));
                }
                self.pc = target.wrapping_sub(1);
                Executed
            }

            Instruction::Ret => {
                let addr = self
                    .stack
                    .pop()
                    .ok_or(MachineFault::StackUnderflow("RET"))?;
                self.pc = addr;
                Executed
            }

            // ==================== I/O ====================

            Instruction::In { dst } => {
                if self.regs.get(dst).is_none() {
                    Skipped(Skip::RegisterOutOfRange(dst))
                } else {
                    print!("Input for R{}: ", dst);
                    let _ = io::stdout().flush();
                    let mut line = String::new();
                    let value = match io::stdin().lock().read_line(&mut line) {
                        Ok(_) => line.trim().parse::<u32>().unwrap_or(0),
                        Err(_) => 0,
                    };
                    self.regs.set(dst, value);
                    Executed
                }
            }

            Instruction::Out { src } => match self.regs.get(src) {
                Some(value) => {
                    println!("{}", value);
                    Executed
                }
                None => Skipped(Skip::RegisterOutOfRange(src)),
            },

            Instruction::Print { target: PrintTarget::Reg, index } => {
                if index < self.regs.count() {
                    let value = self.regs.get(index as u16).unwrap_or(0);
                    println!("{}", fmt_register(index, value));
                    Executed
                } else {
                    Skipped(Skip::RegisterOutOfRange(index.min(u16::MAX as u32) as u16))
                }
            }

            Instruction::Print { target: PrintTarget::Mem, index } => {
                match self.mem.read(index) {
                    Some(value) => {
                        println!("{}", fmt_memory(index, value));
                        Executed
                    }
                    None => Skipped(Skip::AddressOutOfRange(index)),
                }
            }

            // ==================== Display ====================

            Instruction::TdrawClear => {
                let _ = tdraw::clear();
                Executed
            }

            Instruction::TdrawPixel { x, y, ch } => {
                match (self.regs.get(x as u16), self.regs.get(y as u16)) {
                    (Some(vx), Some(vy)) => {
                        let _ = tdraw::pixel(vx, vy, ch as char);
                        Executed
                    }
                    _ => Skipped(Skip::RegisterOutOfRange(
                        self.first_bad_reg(x as u16, y as u16),
                    )),
                }
            }
        };

        Ok(outcome)
    }

    /// Rewrite `dst` through `f`; skip if it is out of range.
    fn write_reg(&mut self, dst: u16, f: impl FnOnce(u32) -> u32) -> StepOutcome {
        match self.regs.get(dst) {
            Some(value) => {
                self.regs.set(dst, f(value));
                StepOutcome::Executed
            }
            None => StepOutcome::Skipped(Skip::RegisterOutOfRange(dst)),
        }
    }

    /// dst := f(dst, src); skip if either register is out of range.
    fn binary_op(&mut self, dst: u16, src: u16, f: impl FnOnce(u32, u32) -> u32) -> StepOutcome {
        match (self.regs.get(dst), self.regs.get(src)) {
            (Some(a), Some(b)) => {
                self.regs.set(dst, f(a, b));
                StepOutcome::Executed
            }
            _ => StepOutcome::Skipped(Skip::RegisterOutOfRange(self.first_bad_reg(dst, src))),
        }
    }

    /// Redirect the counter when `taken`, bounds-checking the target.
    fn branch(&mut self, taken: bool, target: u32) -> StepOutcome {
        if !taken {
            return StepOutcome::Executed;
        }
        if target as usize >= MEMORY_SIZE {
            return StepOutcome::Skipped(Skip::AddressOutOfRange(target));
        }
        self.pc = target.wrapping_sub(1);
        StepOutcome::Executed
    }

    /// Whichever of the two indices is actually out of range.
    fn first_bad_reg(&self, a: u16, b: u16) -> u16 {
        if self.regs.get(a).is_none() {
            a
        } else {
            b
        }
    }
}

impl Default for Machine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Machine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Machine")
            .field("state", &self.state)
            .field("pc", &self.pc)
            .field("cycles", &self.cycles)
            .field("regs", &self.regs)
            .field("stack_depth", &self.stack.depth())
            .finish()
    }
}

/// Register dump line, unsigned decimal.
pub fn fmt_register(index: u32, value: u32) -> String {
    format!("R{} = {}", index, value)
}

/// Memory dump line, unsigned decimal.
pub fn fmt_memory(addr: u32, value: u8) -> String {
    format!("MEM[{}] = {}", addr, value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vm::program::PROGRAM_CAPACITY;
    use crate::vm::stack::STACK_CAPACITY;

    fn program(instrs: &[Instruction]) -> Program {
        Program::from_instructions(instrs.to_vec()).unwrap()
    }

    #[test]
    fn test_halt_only() {
        let mut machine = Machine::new();
        let prog = program(&[Instruction::Halt]);

        let executed = machine.run(&prog).unwrap();

        assert_eq!(executed, 1);
        assert!(machine.is_halted());
        assert!(machine.regs.iter().all(|(_, v)| v == 0));
        assert!(machine.stack.is_empty());
    }

    #[test]
    fn test_mov_sets_one_register() {
        let mut machine = Machine::new();
        let prog = program(&[Instruction::Mov { dst: 3, imm: 42 }, Instruction::Halt]);

        machine.run(&prog).unwrap();

        assert_eq!(machine.regs.get(3), Some(42));
        assert!(machine.regs.iter().filter(|&(i, _)| i != 3).all(|(_, v)| v == 0));
    }

    #[test]
    fn test_add_and_wraparound() {
        let mut machine = Machine::new();
        machine.regs.set(1, 5);
        machine.regs.set(2, 7);
        let prog = program(&[Instruction::Add { dst: 1, src: 2 }, Instruction::Halt]);

        machine.run(&prog).unwrap();
        assert_eq!(machine.regs.get(1), Some(12));
        assert_eq!(machine.regs.get(2), Some(7));

        let mut machine = Machine::new();
        machine.regs.set(1, u32::MAX);
        machine.regs.set(2, 1);
        let prog = program(&[Instruction::Add { dst: 1, src: 2 }, Instruction::Halt]);

        machine.run(&prog).unwrap();
        assert_eq!(machine.regs.get(1), Some(0));
    }

    #[test]
    fn test_sub_wraps_below_zero() {
        let mut machine = Machine::new();
        machine.regs.set(2, 1);
        let prog = program(&[Instruction::Sub { dst: 1, src: 2 }, Instruction::Halt]);

        machine.run(&prog).unwrap();
        assert_eq!(machine.regs.get(1), Some(u32::MAX));
    }

    #[test]
    fn test_cmp_then_conditional_jumps() {
        let mut machine = Machine::new();
        machine.regs.set(1, 3);
        machine.regs.set(2, 5);
        let prog = program(&[
            Instruction::Cmp { a: 1, b: 2 },
            Instruction::Jl { target: 10 },
        ]);

        machine.step(&prog).unwrap();
        assert!(!machine.flags.equal);
        assert_eq!(machine.flags.order, CmpOrder::Less);

        machine.step(&prog).unwrap();
        // The next fetch happens at the branch target.
        assert_eq!(machine.pc, 10);
    }

    #[test]
    fn test_je_not_taken_when_unequal() {
        let mut machine = Machine::new();
        machine.regs.set(1, 3);
        machine.regs.set(2, 5);
        let prog = program(&[
            Instruction::Cmp { a: 1, b: 2 },
            Instruction::Je { target: 10 },
        ]);

        machine.step(&prog).unwrap();
        let outcome = machine.step(&prog).unwrap();

        assert_eq!(outcome, StepOutcome::Executed);
        assert_eq!(machine.pc, 2);
    }

    #[test]
    fn test_signed_comparison() {
        let mut machine = Machine::new();
        // -1 vs 1: signed order is Less even though unsigned it is Greater.
        machine.regs.set(1, u32::MAX);
        machine.regs.set(2, 1);
        let prog = program(&[
            Instruction::Cmp { a: 1, b: 2 },
            Instruction::Jg { target: 10 },
            Instruction::Halt,
        ]);

        machine.run(&prog).unwrap();
        // JG not taken: halted at the fall-through HALT.
        assert_eq!(machine.cycles, 3);
    }

    #[test]
    fn test_udiv_by_zero_is_skipped() {
        let mut machine = Machine::new();
        machine.regs.set(1, 10);
        let prog = program(&[Instruction::Udiv { dst: 1, src: 2 }]);

        let outcome = machine.step(&prog).unwrap();

        assert_eq!(outcome, StepOutcome::Skipped(Skip::DivisionByZero));
        assert_eq!(machine.regs.get(1), Some(10));
        assert!(machine.is_running());
    }

    #[test]
    fn test_udiv() {
        let mut machine = Machine::new();
        machine.regs.set(1, 10);
        machine.regs.set(2, 3);
        let prog = program(&[Instruction::Udiv { dst: 1, src: 2 }, Instruction::Halt]);

        machine.run(&prog).unwrap();
        assert_eq!(machine.regs.get(1), Some(3));
    }

    #[test]
    fn test_push_overflow_is_fatal() {
        let mut machine = Machine::new();
        for i in 0..STACK_CAPACITY {
            assert!(machine.stack.push(i as u32));
        }
        let prog = program(&[Instruction::Push { src: 0 }]);

        let fault = machine.step(&prog).unwrap_err();

        assert_eq!(fault, MachineFault::StackOverflow("PUSH"));
        assert!(machine.is_halted());
        assert_eq!(machine.stack.depth(), STACK_CAPACITY);
    }

    #[test]
    fn test_push_invalid_register_is_fatal() {
        let mut machine = Machine::new(); // 256 registers
        let prog = program(&[Instruction::Push { src: 300 }]);

        let fault = machine.step(&prog).unwrap_err();

        assert_eq!(fault, MachineFault::InvalidRegister { op: "PUSH", index: 300 });
        assert!(machine.is_halted());
    }

    #[test]
    fn test_pop_underflow_is_fatal() {
        let mut machine = Machine::new();
        let prog = program(&[Instruction::Pop { dst: 0 }]);

        let fault = machine.step(&prog).unwrap_err();

        assert_eq!(fault, MachineFault::StackUnderflow("POP"));
        assert!(machine.is_halted());
    }

    #[test]
    fn test_push_pop_roundtrip() {
        let mut machine = Machine::new();
        machine.regs.set(1, 77);
        let prog = program(&[
            Instruction::Push { src: 1 },
            Instruction::Pop { dst: 2 },
            Instruction::Halt,
        ]);

        machine.run(&prog).unwrap();

        assert_eq!(machine.regs.get(2), Some(77));
        assert!(machine.stack.is_empty());
    }

    #[test]
    fn test_store_out_of_range_is_noop() {
        let mut machine = Machine::new();
        machine.regs.set(0, 0xFF);
        let prog = program(&[Instruction::Store { src: 0, addr: 9999 }]);

        let outcome = machine.step(&prog).unwrap();

        assert_eq!(outcome, StepOutcome::Skipped(Skip::AddressOutOfRange(9999)));
        assert!(machine.is_running());
    }

    #[test]
    fn test_store_writes_low_byte_only() {
        let mut machine = Machine::new();
        machine.regs.set(1, 0x1FF);
        let prog = program(&[
            Instruction::Store { src: 1, addr: 10 },
            Instruction::Load { dst: 2, addr: 10 },
            Instruction::Halt,
        ]);

        machine.run(&prog).unwrap();

        assert_eq!(machine.mem.read(10), Some(0xFF));
        assert_eq!(machine.regs.get(2), Some(0xFF));
    }

    #[test]
    fn test_byte_moves_match_load_store() {
        let mut machine = Machine::new();
        machine.regs.set(1, 0xAB);
        let prog = program(&[
            Instruction::Strb { src: 1, addr: 5 },
            Instruction::Movb { dst: 2, addr: 5 },
            Instruction::Halt,
        ]);

        machine.run(&prog).unwrap();
        assert_eq!(machine.regs.get(2), Some(0xAB));
    }

    #[test]
    fn test_memcpy_bounds() {
        let mut machine = Machine::new();
        for i in 0..4 {
            machine.mem.write(100 + i, (i + 1) as u8);
        }
        let prog = program(&[
            Instruction::Memcpy { dst: 200, src: 100, len: 4 },
            Instruction::Memcpy { dst: 2020, src: 0, len: 100 },
            Instruction::Halt,
        ]);

        let first = machine.step(&prog).unwrap();
        let second = machine.step(&prog).unwrap();

        assert_eq!(first, StepOutcome::Executed);
        assert_eq!(machine.mem.read(203), Some(4));
        assert_eq!(second, StepOutcome::Skipped(Skip::AddressOutOfRange(2020)));
    }

    #[test]
    fn test_call_and_ret() {
        let mut machine = Machine::new();
        let prog = program(&[
            Instruction::Call { target: 2 },
            Instruction::Halt,
            Instruction::Mov { dst: 0, imm: 7 },
            Instruction::Ret,
        ]);

        let executed = machine.run(&prog).unwrap();

        assert_eq!(machine.regs.get(0), Some(7));
        assert_eq!(executed, 4);
        assert!(machine.stack.is_empty());
        assert!(machine.is_halted());
    }

    #[test]
    fn test_ret_underflow_is_fatal() {
        let mut machine = Machine::new();
        let prog = program(&[Instruction::Ret]);

        let fault = machine.step(&prog).unwrap_err();
        assert_eq!(fault, MachineFault::StackUnderflow("RET"));
        assert!(machine.is_halted());
    }

    #[test]
    fn test_call_target_out_of_range_is_fatal() {
        let mut machine = Machine::new();
        let prog = program(&[Instruction::Call { target: 5000 }]);

        let fault = machine.step(&prog).unwrap_err();
        assert_eq!(fault, MachineFault::CallOutOfRange(5000));
        assert!(machine.is_halted());
    }

    #[test]
    fn test_jmp_skips_over_code() {
        let mut machine = Machine::new();
        let prog = program(&[
            Instruction::Jmp { target: 2 },
            Instruction::Mov { dst: 0, imm: 1 },
            Instruction::Halt,
        ]);

        machine.run(&prog).unwrap();
        assert_eq!(machine.regs.get(0), Some(0));
    }

    #[test]
    fn test_jmp_target_out_of_range_is_noop() {
        let mut machine = Machine::new();
        let prog = program(&[Instruction::Jmp { target: 5000 }, Instruction::Halt]);

        let outcome = machine.step(&prog).unwrap();

        assert_eq!(outcome, StepOutcome::Skipped(Skip::AddressOutOfRange(5000)));
        assert_eq!(machine.pc, 1);
    }

    #[test]
    fn test_movz_movn_neg() {
        let mut machine = Machine::new();
        let prog = program(&[
            Instruction::Movz { dst: 1, imm: 0x12345 },
            Instruction::Movn { dst: 2, imm: 0 },
            Instruction::Mov { dst: 3, imm: 5 },
            Instruction::Neg { dst: 3 },
            Instruction::Halt,
        ]);

        machine.run(&prog).unwrap();

        assert_eq!(machine.regs.get(1), Some(0x2345));
        assert_eq!(machine.regs.get(2), Some(u32::MAX));
        assert_eq!(machine.regs.get(3), Some(5u32.wrapping_neg()));
    }

    #[test]
    fn test_shifts() {
        let mut machine = Machine::new();
        machine.regs.set(1, 1);
        machine.regs.set(2, 0x8000_0000);
        machine.regs.set(3, 1);
        let prog = program(&[
            Instruction::Lsl { dst: 1, shift: 4 },
            Instruction::Lsr { dst: 2, shift: 31 },
            Instruction::Lsl { dst: 3, shift: 32 },
            Instruction::Halt,
        ]);

        machine.run(&prog).unwrap();

        assert_eq!(machine.regs.get(1), Some(16));
        assert_eq!(machine.regs.get(2), Some(1));
        assert_eq!(machine.regs.get(3), Some(0));
    }

    #[test]
    fn test_bitwise_ops() {
        let mut machine = Machine::new();
        machine.regs.set(1, 0b1100);
        machine.regs.set(2, 0b1010);
        machine.regs.set(3, 0b1100);
        machine.regs.set(4, 0b1100);
        let prog = program(&[
            Instruction::And { dst: 1, src: 2 },
            Instruction::Orr { dst: 3, src: 2 },
            Instruction::Eor { dst: 4, src: 2 },
            Instruction::Halt,
        ]);

        machine.run(&prog).unwrap();

        assert_eq!(machine.regs.get(1), Some(0b1000));
        assert_eq!(machine.regs.get(3), Some(0b1110));
        assert_eq!(machine.regs.get(4), Some(0b0110));
    }

    #[test]
    fn test_register_out_of_range_is_noop() {
        let mut machine = Machine::new(); // 256 registers
        machine.regs.set(1, 9);
        let prog = program(&[Instruction::Add { dst: 1, src: 300 }]);

        let outcome = machine.step(&prog).unwrap();

        assert_eq!(outcome, StepOutcome::Skipped(Skip::RegisterOutOfRange(300)));
        assert_eq!(machine.regs.get(1), Some(9));
        assert!(machine.is_running());
    }

    #[test]
    fn test_flags_untouched_by_other_instructions() {
        let mut machine = Machine::new();
        machine.regs.set(1, 2);
        machine.regs.set(2, 2);
        let prog = program(&[
            Instruction::Cmp { a: 1, b: 2 },
            Instruction::Add { dst: 1, src: 2 },
            Instruction::Store { src: 1, addr: 0 },
            Instruction::Halt,
        ]);

        machine.run(&prog).unwrap();

        assert!(machine.flags.equal);
        assert_eq!(machine.flags.order, CmpOrder::Equal);
    }

    #[test]
    fn test_runs_off_the_end_through_zeroed_tail() {
        let mut machine = Machine::new();
        let prog = program(&[Instruction::Mov { dst: 0, imm: 1 }]);

        let executed = machine.run(&prog).unwrap();

        // Every zeroed slot up to the capacity executes as NOP.
        assert_eq!(executed, PROGRAM_CAPACITY as u64);
        assert!(machine.is_halted());
        assert_eq!(machine.regs.get(0), Some(1));
    }

    #[test]
    fn test_step_after_halt_is_an_error() {
        let mut machine = Machine::new();
        let prog = program(&[Instruction::Halt]);

        machine.run(&prog).unwrap();
        assert_eq!(machine.step(&prog), Err(MachineFault::NotRunning));
    }

    #[test]
    fn test_print_register_out_of_range_is_noop() {
        let mut machine = Machine::new();
        let prog = program(&[Instruction::Print { target: PrintTarget::Reg, index: 9999 }]);

        let outcome = machine.step(&prog).unwrap();
        assert!(matches!(outcome, StepOutcome::Skipped(Skip::RegisterOutOfRange(_))));
    }

    #[test]
    fn test_dump_formats() {
        assert_eq!(fmt_register(4, 5), "R4 = 5");
        assert_eq!(fmt_memory(10, 255), "MEM[10] = 255");
    }

    #[test]
    fn test_assembled_source_roundtrip() {
        use crate::asm::{assemble, RegisterSyntax};

        let assembly = assemble("MOVZ R4 5\nPRINT REG 4\nHALT\n", RegisterSyntax::Unified);
        assert!(assembly.rejected.is_empty());

        let mut machine = Machine::new();
        let executed = machine.run(&assembly.program).unwrap();

        // PRINT REG 4 writes "R4 = 5" on stdout.
        assert_eq!(executed, 3);
        assert_eq!(machine.regs.get(4), Some(5));
        assert_eq!(fmt_register(4, machine.regs.get(4).unwrap()), "R4 = 5");
    }
}
