//! Terminal mode setup and idempotent restore

use crossterm::event::{
    DisableBracketedPaste, DisableMouseCapture, EnableBracketedPaste, EnableMouseCapture,
};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};

/// Modes in the order they are entered; restore walks them backwards
#[derive(Debug, Clone, Copy)]
enum Mode {
    Raw,
    AltScreen,
    BracketedPaste,
    MouseCapture,
}

const MODES: [Mode; 4] = [
    Mode::Raw,
    Mode::AltScreen,
    Mode::BracketedPaste,
    Mode::MouseCapture,
];

/// Set once a mode is active, so the exit path and the panic hook restore it only once
static ACTIVE: [AtomicBool; 4] = [const { AtomicBool::new(false) }; 4];

impl Mode {
    fn flag(self) -> &'static AtomicBool {
        &ACTIVE[self as usize]
    }

    fn enable<W: Write>(self, out: &mut W) -> io::Result<()> {
        match self {
            Mode::Raw => enable_raw_mode()?,
            Mode::AltScreen => execute!(out, EnterAlternateScreen)?,
            Mode::BracketedPaste => execute!(out, EnableBracketedPaste)?,
            Mode::MouseCapture => execute!(out, EnableMouseCapture)?,
        }
        self.flag().store(true, Ordering::SeqCst);
        Ok(())
    }

    fn disable<W: Write>(self, out: &mut W) -> io::Result<()> {
        if !self.flag().swap(false, Ordering::SeqCst) {
            return Ok(());
        }
        match self {
            Mode::Raw => disable_raw_mode(),
            Mode::AltScreen => execute!(out, LeaveAlternateScreen),
            Mode::BracketedPaste => execute!(out, DisableBracketedPaste),
            Mode::MouseCapture => execute!(out, DisableMouseCapture),
        }
    }
}

pub fn setup<W: Write>(out: &mut W) -> io::Result<()> {
    for mode in MODES {
        mode.enable(out)?;
    }
    Ok(())
}

/// Undo whatever [`setup`] managed to enable. Errors are ignored; this also runs while panicking.
pub fn cleanup() {
    let mut out = io::stdout();
    for mode in MODES.iter().rev() {
        let _ = mode.disable(&mut out);
    }
    let _ = out.flush();
}

/// Restore the terminal before the default hook prints the panic
pub fn setup_panic_hook() {
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        cleanup();
        previous(info);
    }));
}

/// Calls [`cleanup`] when dropped, unless disarmed after a normal exit
#[derive(Debug)]
pub struct SetupGuard {
    armed: bool,
}

impl Default for SetupGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl SetupGuard {
    pub fn new() -> Self {
        Self { armed: true }
    }

    pub fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for SetupGuard {
    fn drop(&mut self) {
        if self.armed {
            cleanup();
        }
    }
}
