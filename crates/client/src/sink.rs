// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Log sinks: where finished build output lands.
//!
//! `FileLog` streams to disk and fails fast. `MessageCollector` defers in
//! memory and prints on flush — the render loop clears the live display
//! before calling `flush`/`close`, so deferred lines never interleave with
//! a frame.

use std::fs::File;
use std::io::{self, BufWriter, Stdout, Write};
use std::path::{Path, PathBuf};

/// A consumer of finished log lines.
pub trait LogSink: Send {
    fn accept(&mut self, line: &str) -> io::Result<()>;

    /// Make pending lines durable/visible.
    fn flush(&mut self) -> io::Result<()>;

    fn close(&mut self) -> io::Result<()> {
        self.flush()
    }

    /// File-backed sinks take `PrintOut`/`PrintErr` lines too; the live
    /// terminal handles them otherwise.
    fn is_file_backed(&self) -> bool {
        false
    }
}

/// Buffered UTF-8 log file. Any I/O error propagates immediately.
pub struct FileLog {
    writer: BufWriter<File>,
    path: PathBuf,
}

impl FileLog {
    pub fn create(path: &Path) -> io::Result<Self> {
        let file = File::create(path)?;
        Ok(Self {
            writer: BufWriter::new(file),
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LogSink for FileLog {
    fn accept(&mut self, line: &str) -> io::Result<()> {
        self.writer.write_all(line.as_bytes())?;
        self.writer.write_all(b"\n")
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }

    fn is_file_backed(&self) -> bool {
        true
    }
}

/// Collects lines in memory and prints them on flush. Lines end with
/// `\r\n` so output stays aligned while the terminal is in raw mode.
pub struct MessageCollector<W: Write + Send = Stdout> {
    pending: Vec<String>,
    target: W,
}

impl MessageCollector<Stdout> {
    pub fn new() -> Self {
        Self::to_writer(io::stdout())
    }
}

impl Default for MessageCollector<Stdout> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Write + Send> MessageCollector<W> {
    pub fn to_writer(target: W) -> Self {
        Self {
            pending: Vec::new(),
            target,
        }
    }

    pub fn pending(&self) -> &[String] {
        &self.pending
    }

    pub fn into_writer(self) -> W {
        self.target
    }
}

impl<W: Write + Send> LogSink for MessageCollector<W> {
    fn accept(&mut self, line: &str) -> io::Result<()> {
        self.pending.push(line.to_string());
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        for line in self.pending.drain(..) {
            self.target.write_all(line.as_bytes())?;
            self.target.write_all(b"\r\n")?;
        }
        self.target.flush()
    }
}

#[cfg(test)]
#[path = "sink_tests.rs"]
mod tests;
