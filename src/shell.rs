//! Interactive shell.
//!
//! A line-command front end over the assembler and the machine:
//! load a program, run it, and inspect registers and memory between
//! runs. Machine state persists across `run` invocations; `resize`
//! reallocates the register file (destructively) between runs.

use crate::asm::{assemble, RegisterSyntax};
use crate::vm::{fmt_memory, fmt_register, Machine, Program, MAX_REGISTERS, MEMORY_SIZE};
use std::io::{self, BufRead, Write};

/// How many registers the `regs` command lists before truncating.
const REGS_SHOWN: u32 = 32;

/// A parsed shell command.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Help,
    Exit,
    Load(String),
    Run,
    Regs,
    Reg(u32),
    RegCount,
    Resize(u32),
    Mem(u32),
    Unknown(String),
}

/// Parse one input line. `None` for a blank line.
fn parse_command(line: &str) -> Option<Command> {
    let mut tokens = line.split_whitespace();
    let head = tokens.next()?;
    let arg = tokens.next();

    let number = |arg: Option<&str>| arg.and_then(|a| a.parse::<u32>().ok());

    let command = match head {
        "help" => Command::Help,
        "exit" | "quit" => Command::Exit,
        "run" => Command::Run,
        "regs" => Command::Regs,
        "regcount" => Command::RegCount,
        "load" => match arg {
            Some(path) => Command::Load(path.to_string()),
            None => Command::Unknown("load needs a file path".to_string()),
        },
        "reg" => match number(arg) {
            Some(n) => Command::Reg(n),
            None => Command::Unknown("reg needs a register number".to_string()),
        },
        "resize" => match number(arg) {
            Some(n) => Command::Resize(n),
            None => Command::Unknown("resize needs a register count".to_string()),
        },
        "mem" => match number(arg) {
            Some(n) => Command::Mem(n),
            None => Command::Unknown("mem needs an address".to_string()),
        },
        other => Command::Unknown(format!("unknown command: {}", other)),
    };

    Some(command)
}

/// The shell state: one machine, one loaded program.
pub struct Shell {
    machine: Machine,
    program: Program,
    syntax: RegisterSyntax,
}

impl Shell {
    pub fn new(registers: u32, syntax: RegisterSyntax) -> Self {
        Self {
            machine: Machine::with_registers(registers),
            program: Program::new(),
            syntax,
        }
    }

    fn banner(&self) {
        println!("micro32 shell");
        println!("OS: {}", std::env::consts::OS);
        println!("Architecture: {}", std::env::consts::ARCH);
        match std::thread::available_parallelism() {
            Ok(n) => println!("Processors: {}", n),
            Err(_) => println!("Processors: unknown"),
        }
        println!("Memory: {} bytes", MEMORY_SIZE);
        println!(
            "Registers: {} available (R0-R{}), max possible: {}",
            self.machine.regs.count(),
            self.machine.regs.count() - 1,
            MAX_REGISTERS
        );
        println!("Type 'help' for commands.");
    }

    /// Execute one command. Returns false when the shell should exit.
    fn dispatch(&mut self, command: Command) -> bool {
        match command {
            Command::Exit => return false,

            Command::Help => {
                println!("Commands:");
                println!("  load <file>       - Assemble a program from a source file");
                println!("  run               - Run the loaded program");
                println!("  regs              - Show the first {} registers", REGS_SHOWN);
                println!("  reg <n>           - Show one register");
                println!("  regcount          - Show the register count");
                println!("  resize <n>        - Reallocate the register file (1-{})", MAX_REGISTERS);
                println!("  mem <addr>        - Show one memory byte");
                println!("  exit              - Leave the shell");
            }

            Command::Load(path) => match std::fs::read_to_string(&path) {
                Ok(source) => {
                    let assembly = assemble(&source, self.syntax);
                    for rejected in &assembly.rejected {
                        eprintln!("line {}: {} ({})", rejected.line, rejected.error, rejected.text);
                    }
                    println!("Loaded {} instructions", assembly.program.len());
                    self.program = assembly.program;
                }
                Err(e) => println!("Cannot open {}: {}", path, e),
            },

            Command::Run => {
                self.machine.restart();
                match self.machine.run(&self.program) {
                    Ok(_) => {}
                    Err(fault) => eprintln!("machine fault: {}", fault),
                }
                println!("Program finished.");
            }

            Command::Regs => {
                let count = self.machine.regs.count();
                let shown = count.min(REGS_SHOWN);
                println!("Showing first {} registers (total available: {}):", shown, count);
                for index in 0..shown {
                    let value = self.machine.regs.get(index as u16).unwrap_or(0);
                    println!("{}", fmt_register(index, value));
                }
                if count > REGS_SHOWN {
                    println!("... and {} more (use 'reg <n>' to view one)", count - REGS_SHOWN);
                }
            }

            Command::Reg(index) => {
                let count = self.machine.regs.count();
                if index < count {
                    let value = self.machine.regs.get(index as u16).unwrap_or(0);
                    println!("{}", fmt_register(index, value));
                } else {
                    println!("Register R{} not available (max: R{})", index, count - 1);
                }
            }

            Command::RegCount => {
                println!(
                    "Current register count: {} (max: {})",
                    self.machine.regs.count(),
                    MAX_REGISTERS
                );
            }

            Command::Resize(count) => {
                if (1..=MAX_REGISTERS).contains(&count) {
                    self.machine.regs.resize(count);
                    println!("Resized to {} registers", self.machine.regs.count());
                } else {
                    println!("Invalid count. Must be 1-{}", MAX_REGISTERS);
                }
            }

            Command::Mem(addr) => match self.machine.mem.read(addr) {
                Some(value) => println!("{}", fmt_memory(addr, value)),
                None => println!("Invalid address"),
            },

            Command::Unknown(message) => {
                println!("{}. Type 'help'.", message);
            }
        }

        true
    }
}

/// Run the shell over stdin until `exit` or end of input.
pub fn run_shell(registers: u32, syntax: RegisterSyntax) {
    let mut shell = Shell::new(registers, syntax);
    shell.banner();

    let stdin = io::stdin();
    loop {
        print!("micro32> ");
        let _ = io::stdout().flush();

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }

        match parse_command(line.trim()) {
            Some(command) => {
                if !shell.dispatch(command) {
                    break;
                }
            }
            None => continue,
        }
    }
}
