//! Debugger application state and logic.

use crate::asm::disasm::format_instruction;
use crate::vm::{Machine, Program, StepOutcome};
use std::collections::HashSet;

/// Debugger application state.
pub struct DebuggerApp {
    /// The machine being debugged.
    pub machine: Machine,
    /// The loaded program.
    pub program: Program,
    /// Breakpoints (by program address).
    pub breakpoints: HashSet<u32>,
    /// Is the debugger running continuously?
    pub running: bool,
    /// Should we quit?
    pub should_quit: bool,
    /// Status message to display.
    pub status: String,
    /// Memory view scroll offset.
    pub mem_scroll: usize,
}

impl DebuggerApp {
    /// Create a debugger with a loaded program.
    pub fn new(program: Program, registers: u32) -> Self {
        Self {
            machine: Machine::with_registers(registers),
            program,
            breakpoints: HashSet::new(),
            running: false,
            should_quit: false,
            status: "Ready. Press 's' to step, 'r' to run, 'q' to quit.".into(),
            mem_scroll: 0,
        }
    }

    /// Step one instruction.
    pub fn step(&mut self) {
        if !self.machine.is_running() {
            self.status = format!("Machine halted: {:?}", self.machine.state);
            self.running = false;
            return;
        }

        let pc = self.machine.pc;
        let text = self
            .program
            .fetch(pc)
            .map(|i| format_instruction(&i))
            .unwrap_or_default();

        match self.machine.step(&self.program) {
            Ok(StepOutcome::Executed) => {
                self.status = format!("PC={:04}: {}", pc, text);
            }
            Ok(StepOutcome::Skipped(reason)) => {
                self.status = format!("PC={:04}: {} (skipped: {:?})", pc, text, reason);
            }
            Ok(StepOutcome::Halted) => {
                self.status = format!("Halted after {} cycles", self.machine.cycles);
                self.running = false;
            }
            Err(fault) => {
                self.status = format!("Fault: {}", fault);
                self.running = false;
            }
        }
    }

    /// Run until halt, breakpoint, or fault.
    pub fn run(&mut self) {
        self.running = true;
        self.status = "Running...".into();
    }

    /// One iteration of continuous execution.
    pub fn tick(&mut self) {
        if !self.running {
            return;
        }

        if !self.machine.is_running() {
            self.running = false;
            self.status = format!("Halted after {} cycles", self.machine.cycles);
            return;
        }

        if self.breakpoints.contains(&self.machine.pc) {
            self.running = false;
            self.status = format!("Breakpoint at PC={}", self.machine.pc);
            return;
        }

        self.step();
    }

    /// Toggle a breakpoint at the current counter.
    pub fn toggle_breakpoint(&mut self) {
        let pc = self.machine.pc;
        if self.breakpoints.remove(&pc) {
            self.status = format!("Removed breakpoint at PC={}", pc);
        } else {
            self.breakpoints.insert(pc);
            self.status = format!("Set breakpoint at PC={}", pc);
        }
    }

    /// Reset the machine, keeping the register count.
    pub fn reset(&mut self) {
        self.machine = Machine::with_registers(self.machine.regs.count());
        self.running = false;
        self.status = "Reset. Ready.".into();
    }

    /// Disassembly window around the current counter.
    pub fn get_disassembly(&self, lines: usize) -> Vec<(u32, String, bool)> {
        let pc = self.machine.pc;
        let start = pc.saturating_sub(lines as u32 / 2);

        (0..lines as u32)
            .filter_map(|i| {
                let addr = start + i;
                let instr = self.program.get(addr)?;
                Some((addr, format_instruction(&instr), addr == pc))
            })
            .collect()
    }
}

/// Run the debugger with a program.
pub fn run_debugger(program: Program, registers: u32) -> std::io::Result<()> {
    use crossterm::{
        event::{self, Event, KeyCode, KeyEventKind},
        terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
        ExecutableCommand,
    };
    use ratatui::prelude::*;
    use std::io::stdout;
    use std::time::Duration;

    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let mut app = DebuggerApp::new(program, registers);

    loop {
        terminal.draw(|frame| {
            super::ui::draw(frame, &app);
        })?;

        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match key.code {
                        KeyCode::Char('q') => app.should_quit = true,
                        KeyCode::Char('s') => {
                            app.running = false;
                            app.step();
                        }
                        KeyCode::Char('r') => app.run(),
                        KeyCode::Char('p') => {
                            app.running = false;
                            app.status = "Paused.".into();
                        }
                        KeyCode::Char('b') => app.toggle_breakpoint(),
                        KeyCode::Char('x') => app.reset(),
                        KeyCode::Up => {
                            app.mem_scroll = app.mem_scroll.saturating_sub(1);
                        }
                        KeyCode::Down => {
                            if app.mem_scroll + 1 < crate::vm::MEMORY_SIZE {
                                app.mem_scroll += 1;
                            }
                        }
                        _ => {}
                    }
                }
            }
        }

        if app.running {
            app.tick();
        }

        if app.should_quit {
            break;
        }
    }

    // Restore terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    Ok(())
}
