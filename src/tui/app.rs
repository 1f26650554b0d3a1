//! Debugger application state and logic.

use crate::machine::{decode, LoadError, Machine, MachineConfig, MEMORY_SIZE};
use std::collections::HashSet;
use tracing::debug;

/// Cycles executed per UI tick while running continuously.
const CYCLES_PER_TICK: usize = 256;

/// Debugger application state.
pub struct DebuggerApp {
    /// The machine being debugged.
    pub machine: Machine,
    /// Original program, reloaded on reset.
    pub program: Vec<u16>,
    /// Breakpoints (by address).
    pub breakpoints: HashSet<u16>,
    /// Is the debugger running continuously?
    pub running: bool,
    /// Set once HALT has executed; cleared by reset.
    pub halted: bool,
    /// Why the program could not be placed in memory. Execution is refused
    /// while this is set.
    pub load_error: Option<LoadError>,
    /// Should we quit?
    pub should_quit: bool,
    /// Status message to display.
    pub status: String,
    /// Memory view scroll offset.
    pub mem_scroll: usize,
}

impl DebuggerApp {
    /// Create a new debugger with a loaded program.
    pub fn new(program: Vec<u16>, config: MachineConfig) -> Self {
        let mut app = Self {
            machine: Machine::with_config(config),
            program,
            breakpoints: HashSet::new(),
            running: false,
            halted: false,
            load_error: None,
            should_quit: false,
            status: String::new(),
            mem_scroll: 0,
        };
        if app.load() {
            app.status = "Ready. Press 's' to step, 'r' to run, 'q' to quit.".into();
        }
        app
    }

    /// Place the program in memory, recording any failure in `load_error`
    /// and the status line.
    fn load(&mut self) -> bool {
        match self.machine.load_program(&self.program) {
            Ok(()) => {
                self.load_error = None;
                true
            }
            Err(e) => {
                self.status = format!("Load failed: {}", e);
                self.load_error = Some(e);
                false
            }
        }
    }

    /// Step one instruction.
    pub fn step(&mut self) {
        if let Some(e) = &self.load_error {
            self.status = format!("Load failed: {}", e);
            self.running = false;
            return;
        }

        if self.halted {
            self.status = format!("Halted after {} cycles. Press 'x' to reset.", self.machine.cycles);
            self.running = false;
            return;
        }

        let ip = self.machine.regs.ip();
        let word = self.machine.mem.read(ip);
        if self.machine.cycle() {
            self.halted = true;
            self.running = false;
            self.status = format!("Halted at {:04X} after {} cycles", ip, self.machine.cycles);
        } else {
            self.status = format!("{:04X}: {:04X}  {:?}", ip, word, decode(word));
        }
    }

    /// Start continuous execution.
    pub fn run(&mut self) {
        if self.halted || self.load_error.is_some() {
            self.step();
            return;
        }
        self.running = true;
        self.status = "Running...".into();
    }

    /// Run one batch of continuous execution, stopping at HALT or a
    /// breakpoint.
    pub fn tick(&mut self) {
        for _ in 0..CYCLES_PER_TICK {
            if !self.running {
                return;
            }

            self.step();

            let ip = self.machine.regs.ip();
            if self.running && self.breakpoints.contains(&ip) {
                self.running = false;
                self.status = format!("Breakpoint at {:04X}", ip);
                debug!(ip, "breakpoint hit");
            }
        }
    }

    /// Toggle breakpoint at the current instruction pointer.
    pub fn toggle_breakpoint(&mut self) {
        let ip = self.machine.regs.ip();
        if self.breakpoints.remove(&ip) {
            self.status = format!("Removed breakpoint at {:04X}", ip);
        } else {
            self.breakpoints.insert(ip);
            self.status = format!("Set breakpoint at {:04X}", ip);
        }
    }

    /// Reset the machine and reload the program.
    pub fn reset(&mut self) {
        self.machine.reset();
        self.running = false;
        self.halted = false;
        if self.load() {
            self.status = "Reset. Ready.".into();
        }
    }

    pub fn scroll_up(&mut self) {
        self.mem_scroll = self.mem_scroll.saturating_sub(1);
    }

    pub fn scroll_down(&mut self) {
        if self.mem_scroll + 1 < MEMORY_SIZE {
            self.mem_scroll += 1;
        }
    }

    /// Code window around the instruction pointer: (address, word, decoded,
    /// is_current).
    pub fn code_window(&self, lines: usize) -> Vec<(u16, u16, String, bool)> {
        let ip = self.machine.regs.ip();
        let start = ip.wrapping_sub((lines / 2) as u16);

        (0..lines)
            .map(|i| {
                let addr = start.wrapping_add(i as u16);
                let word = self.machine.mem.read(addr);
                (addr, word, format!("{:?}", decode(word)), addr == ip)
            })
            .collect()
    }
}

/// Run the debugger with a program.
pub fn run_debugger(program: Vec<u16>, config: MachineConfig) -> std::io::Result<()> {
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

    let mut app = DebuggerApp::new(program, config);

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
                        KeyCode::Up => app.scroll_up(),
                        KeyCode::Down => app.scroll_down(),
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
