// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Terminal display driver.
//!
//! `TerminalDisplay` owns the raw-mode terminal and redraws a live region
//! from full frames, diffing per line against the previously drawn frame.
//! The cursor parks at the end of the last frame line so the frame can use
//! the whole height without scrolling. `DumbDisplay` degrades everything
//! to append-only output.

use std::io::{self, IsTerminal, Stdout, Write};

use crossterm::cursor::{MoveToColumn, MoveUp};
use crossterm::terminal::{self, Clear, ClearType};
use crossterm::{queue, style::Print};

/// A live display: accepts a full frame each update; diffing against the
/// previous frame is the driver's concern.
pub trait LiveDisplay: Send {
    /// Current `(rows, cols)`.
    fn size(&self) -> (u16, u16);

    /// Replace the live region with `frame`.
    fn update(&mut self, frame: &[String]) -> io::Result<()>;

    /// Erase the live region.
    fn clear(&mut self) -> io::Result<()>;

    /// Clear the region, then write one scrolling line to stdout.
    fn print_line(&mut self, line: &str) -> io::Result<()>;

    /// Clear the region, then write one scrolling line to stderr.
    fn print_err(&mut self, line: &str) -> io::Result<()>;
}

/// Whether the terminal cannot do cursor addressing (`TERM` type prefix
/// `dumb`, or stdout is not a tty).
pub fn is_dumb_terminal() -> bool {
    if std::env::var("TERM").is_ok_and(|t| t.starts_with("dumb")) {
        return true;
    }
    !std::io::stdout().is_terminal()
}

/// Raw-mode driver over crossterm. Raw mode is entered once at
/// construction and restored on drop, on every exit path.
pub struct TerminalDisplay {
    out: Stdout,
    drawn: Vec<String>,
}

impl TerminalDisplay {
    pub fn new() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        Ok(Self {
            out: io::stdout(),
            drawn: Vec::new(),
        })
    }

    /// Move the cursor from its park position (end of the last drawn line)
    /// to column 0 of the region's first line.
    fn rewind(&mut self) -> io::Result<()> {
        queue!(self.out, MoveToColumn(0))?;
        if self.drawn.len() > 1 {
            queue!(self.out, MoveUp(self.drawn.len() as u16 - 1))?;
        }
        Ok(())
    }
}

impl Drop for TerminalDisplay {
    fn drop(&mut self) {
        let _ = self.clear();
        let _ = terminal::disable_raw_mode();
    }
}

impl LiveDisplay for TerminalDisplay {
    fn size(&self) -> (u16, u16) {
        match terminal::size() {
            Ok((cols, rows)) => (rows, cols),
            Err(_) => (24, 80),
        }
    }

    fn update(&mut self, frame: &[String]) -> io::Result<()> {
        if frame.is_empty() {
            return self.clear();
        }
        self.rewind()?;
        for (i, line) in frame.iter().enumerate() {
            if i > 0 {
                queue!(self.out, Print("\r\n"))?;
            }
            if self.drawn.get(i) == Some(line) {
                // unchanged: leave the row as drawn
                continue;
            }
            queue!(self.out, Clear(ClearType::CurrentLine), Print(line))?;
        }
        // Erase rows left over from a taller previous frame, then park at
        // the last line of the new frame.
        let extra = self.drawn.len().saturating_sub(frame.len());
        for _ in 0..extra {
            queue!(self.out, Print("\r\n"), Clear(ClearType::CurrentLine))?;
        }
        if extra > 0 {
            queue!(self.out, MoveUp(extra as u16))?;
        }
        self.out.flush()?;
        self.drawn = frame.to_vec();
        Ok(())
    }

    fn clear(&mut self) -> io::Result<()> {
        if self.drawn.is_empty() {
            return Ok(());
        }
        self.rewind()?;
        queue!(self.out, Clear(ClearType::FromCursorDown))?;
        self.out.flush()?;
        self.drawn.clear();
        Ok(())
    }

    fn print_line(&mut self, line: &str) -> io::Result<()> {
        self.clear()?;
        queue!(self.out, Print(line), Print("\r\n"))?;
        self.out.flush()
    }

    fn print_err(&mut self, line: &str) -> io::Result<()> {
        self.clear()?;
        let mut err = io::stderr();
        err.write_all(line.as_bytes())?;
        err.write_all(b"\r\n")?;
        err.flush()
    }
}

/// Append-only degradation for terminals without cursor addressing.
/// Frames are never drawn; the render loop does not run the layout in
/// dumb mode.
pub struct DumbDisplay {
    out: Stdout,
}

impl DumbDisplay {
    pub fn new() -> Self {
        Self { out: io::stdout() }
    }
}

impl Default for DumbDisplay {
    fn default() -> Self {
        Self::new()
    }
}

impl LiveDisplay for DumbDisplay {
    fn size(&self) -> (u16, u16) {
        (24, 80)
    }

    fn update(&mut self, _frame: &[String]) -> io::Result<()> {
        Ok(())
    }

    fn clear(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn print_line(&mut self, line: &str) -> io::Result<()> {
        self.out.write_all(line.as_bytes())?;
        self.out.write_all(b"\n")?;
        self.out.flush()
    }

    fn print_err(&mut self, line: &str) -> io::Result<()> {
        let mut err = io::stderr();
        err.write_all(line.as_bytes())?;
        err.write_all(b"\n")?;
        err.flush()
    }
}
