//! micro32 - CLI Entry Point
//!
//! Commands:
//! - `micro32-emu` - Interactive shell
//! - `micro32-emu run <program>` - Assemble (or load an image) and run
//! - `micro32-emu asm <source>` - Assemble to an image file
//! - `micro32-emu disasm <image>` - Print an image as assembly
//! - `micro32-emu translate <file>` - C-subset to assembly
//! - `micro32-emu debug <program>` - Interactive debugger

use clap::{Parser, Subcommand};
use micro32::asm::{assemble, disassemble, format_instruction, load_image, save_image};
use micro32::vm::{Machine, Program, DEFAULT_REGISTERS};
use micro32::{RegisterSyntax, StepOutcome};
use std::path::Path;

#[derive(Parser)]
#[command(name = "micro32-emu")]
#[command(version = "0.1.0")]
#[command(about = "A 32-bit register-machine simulator")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Initial register count
    #[arg(long, global = true, default_value_t = DEFAULT_REGISTERS)]
    registers: u32,

    /// Parse register operands the way the historical tool did
    #[arg(long, global = true)]
    legacy_registers: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Assemble a program (or load a .img image) and run it
    Run {
        /// Path to the source or image file
        program: String,
        /// Maximum instructions to execute (0 = no limit)
        #[arg(short, long, default_value = "0")]
        max_cycles: u64,
        /// Print each instruction as it executes
        #[arg(short, long)]
        trace: bool,
        /// Write the final machine state as JSON
        #[arg(long)]
        dump_state: Option<String>,
    },
    /// Assemble source to an image file
    Asm {
        /// Path to the source file
        source: String,
        /// Output image file
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Print an image file as assembly text
    Disasm {
        /// Path to the image file
        image: String,
    },
    /// Translate a C-subset file to assembly text
    Translate {
        /// Path to the C-subset file
        source: String,
        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Interactive debugger
    #[cfg(feature = "tui")]
    Debug {
        /// Path to the source or image file
        program: String,
    },
    /// Interactive shell (the default when no command is given)
    Shell,
}

fn main() {
    let cli = Cli::parse();
    let syntax = if cli.legacy_registers {
        RegisterSyntax::Legacy
    } else {
        RegisterSyntax::Unified
    };

    match cli.command {
        Some(Commands::Run { program, max_cycles, trace, dump_state }) => {
            run_program(&program, syntax, cli.registers, max_cycles, trace, dump_state.as_deref());
        }
        Some(Commands::Asm { source, output }) => {
            assemble_file(&source, syntax, output);
        }
        Some(Commands::Disasm { image }) => {
            disassemble_file(&image);
        }
        Some(Commands::Translate { source, output }) => {
            translate_file(&source, output.as_deref());
        }
        #[cfg(feature = "tui")]
        Some(Commands::Debug { program }) => {
            let program = load_program(&program, syntax);
            if let Err(e) = micro32::run_debugger(program, cli.registers) {
                eprintln!("debugger error: {}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Shell) | None => {
            micro32::shell::run_shell(cli.registers, syntax);
        }
    }
}

/// Load a program from either assembly source or a .img image file.
fn load_program(path: &str, syntax: RegisterSyntax) -> Program {
    if path.ends_with(".img") {
        match load_image(path) {
            Ok(program) => {
                println!("Loaded {} instructions from {}", program.len(), path);
                program
            }
            Err(e) => {
                eprintln!("failed to load image: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        let source = match std::fs::read_to_string(path) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("failed to read {}: {}", path, e);
                std::process::exit(1);
            }
        };

        let assembly = assemble(&source, syntax);
        for rejected in &assembly.rejected {
            eprintln!("line {}: {} ({})", rejected.line, rejected.error, rejected.text);
        }
        println!("Loaded {} instructions from {}", assembly.program.len(), path);
        assembly.program
    }
}

fn run_program(
    path: &str,
    syntax: RegisterSyntax,
    registers: u32,
    max_cycles: u64,
    trace: bool,
    dump_state: Option<&str>,
) {
    let program = load_program(path, syntax);
    let mut machine = Machine::with_registers(registers);

    let mut executed = 0u64;
    while machine.is_running() && (max_cycles == 0 || executed < max_cycles) {
        let pc = machine.pc;
        let instr = program.fetch(pc);

        match machine.step(&program) {
            Ok(outcome) => {
                executed += 1;
                if trace {
                    if let Some(instr) = instr {
                        let note = match outcome {
                            StepOutcome::Skipped(reason) => format!("  (skipped: {:?})", reason),
                            _ => String::new(),
                        };
                        println!("{:04}: {}{}", pc, format_instruction(&instr), note);
                    }
                }
            }
            Err(fault) => {
                eprintln!("machine fault at PC={}: {}", pc, fault);
                break;
            }
        }
    }

    println!("Program finished.");
    println!("Cycles: {}", machine.cycles);
    println!("State: {:?}", machine.state);

    if machine.is_running() && max_cycles != 0 && executed >= max_cycles {
        println!("Reached max cycles limit ({}). Use --max-cycles to raise it.", max_cycles);
    }

    if let Some(out) = dump_state {
        match serde_json::to_string_pretty(&machine) {
            Ok(json) => {
                if let Err(e) = std::fs::write(out, json) {
                    eprintln!("failed to write {}: {}", out, e);
                    std::process::exit(1);
                }
                println!("State written to {}", out);
            }
            Err(e) => {
                eprintln!("failed to serialize state: {}", e);
                std::process::exit(1);
            }
        }
    }
}

fn assemble_file(source_path: &str, syntax: RegisterSyntax, output: Option<String>) {
    let out_path = output
        .unwrap_or_else(|| Path::new(source_path).with_extension("img").display().to_string());

    let source = match std::fs::read_to_string(source_path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("failed to read {}: {}", source_path, e);
            std::process::exit(1);
        }
    };

    let assembly = assemble(&source, syntax);
    for rejected in &assembly.rejected {
        eprintln!("line {}: {} ({})", rejected.line, rejected.error, rejected.text);
    }
    println!("Assembled {} instructions", assembly.program.len());

    if let Err(e) = save_image(&out_path, &assembly.program) {
        eprintln!("failed to save image: {}", e);
        std::process::exit(1);
    }

    println!("Saved to {}", out_path);
}

fn disassemble_file(image_path: &str) {
    let program = match load_image(image_path) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("failed to load image: {}", e);
            std::process::exit(1);
        }
    };

    print!("{}", disassemble(&program));
}

fn translate_file(source_path: &str, output: Option<&str>) {
    let lines = match micro32::translate::translate_file(Path::new(source_path)) {
        Ok(lines) => lines,
        Err(e) => {
            eprintln!("failed to read {}: {}", source_path, e);
            std::process::exit(1);
        }
    };

    let text = lines.join("\n") + "\n";
    match output {
        Some(path) => {
            if let Err(e) = std::fs::write(path, text) {
                eprintln!("failed to write {}: {}", path, e);
                std::process::exit(1);
            }
            println!("Wrote {} lines to {}", lines.len(), path);
        }
        None => print!("{}", text),
    }
}
