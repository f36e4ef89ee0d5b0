// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The render loop: a single consumer of the inbound message stream that
//! owns all display state.
//!
//! Messages are handled strictly in receive order. After each message the
//! layout runs and the display is updated — unless the session is in
//! no-buffering mode, on a dumb terminal, or parked behind a modal
//! prompt. A failed frame is skipped, never fatal; sink failures are.

mod coords;
pub mod layout;
pub mod model;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use kiln_wire::Message;
use tokio::sync::mpsc;

use crate::display::LiveDisplay;
use crate::error::ClientError;
use crate::input::ModalRequest;
use crate::sink::LogSink;
use model::RenderState;

pub use coords::maven_coords;

const UNRECOGNIZED_OPTION: &str = "org.apache.commons.cli.UnrecognizedOptionException";

const CTRL_B: char = '\u{2}';
const CTRL_L: char = '\u{c}';
const CTRL_M: char = '\u{d}';

pub struct RenderLoop<D: LiveDisplay> {
    inbound: mpsc::Receiver<Message>,
    dispatch: mpsc::Sender<Message>,
    modal: Option<std::sync::mpsc::Sender<ModalRequest>>,
    input_active: Arc<AtomicBool>,
    display: D,
    sink: Box<dyn LogSink>,
    state: RenderState,
    dumb: bool,
    started: Instant,
}

impl<D: LiveDisplay> RenderLoop<D> {
    pub fn new(
        inbound: mpsc::Receiver<Message>,
        dispatch: mpsc::Sender<Message>,
        display: D,
        sink: Box<dyn LogSink>,
        daemon_id: String,
        dumb: bool,
    ) -> Self {
        let state = RenderState {
            daemon_id,
            ..RenderState::default()
        };
        Self {
            inbound,
            dispatch,
            modal: None,
            input_active: Arc::new(AtomicBool::new(false)),
            display,
            sink,
            state,
            dumb,
            started: Instant::now(),
        }
    }

    /// Attach the input handler's modal channel and activity flag.
    pub fn with_input(
        mut self,
        modal: std::sync::mpsc::Sender<ModalRequest>,
        input_active: Arc<AtomicBool>,
    ) -> Self {
        self.modal = Some(modal);
        self.input_active = input_active;
        self
    }

    /// Consume messages until a terminator arrives; returns the exit code.
    pub async fn run(mut self) -> Result<i32, ClientError> {
        loop {
            let Some(message) = self.inbound.recv().await else {
                // Transport gone without a terminator
                self.finish()?;
                return Ok(1);
            };
            if let Some(code) = self.handle(message).await? {
                return Ok(code);
            }
            if !self.state.no_buffering
                && !self.dumb
                && !self.input_active.load(Ordering::Relaxed)
            {
                self.redraw();
            }
        }
    }

    /// React to one message; `Some(code)` ends the loop.
    async fn handle(&mut self, message: Message) -> Result<Option<i32>, ClientError> {
        match message {
            Message::BuildStarted {
                project_id,
                project_count,
                max_threads,
                artifact_id_display_length,
            } => {
                self.state.name = Some(project_id);
                self.state.total_projects = project_count;
                self.state.max_threads = max_threads;
                self.state.artifact_id_width = artifact_id_display_length.max(0) as usize;
                if max_threads <= 1 || project_count <= 1 {
                    self.state.no_buffering = true;
                    self.display.clear()?;
                }
            }
            Message::ProjectStarted { project_id } => {
                self.state.project_mut(&project_id);
            }
            Message::MojoStarted(mojo) => {
                let project = self.state.project_mut(&mojo.artifact_id);
                project.running_execution = Some(mojo);
            }
            Message::ProjectStopped { project_id } => {
                match self.state.projects.shift_remove(&project_id) {
                    Some(mut project) => {
                        let lines: Vec<String> = project.drain_log().collect();
                        for line in lines {
                            let line = sink_line(self.state.max_threads, &project_id, &line);
                            self.sink.accept(&line)?;
                        }
                    }
                    None => tracing::debug!(%project_id, "stop for unknown project"),
                }
                self.state.done_projects += 1;
                if self.state.display_done {
                    self.flush_sink()?;
                }
            }
            Message::ProjectLogMessage { project_id, message } => {
                let buffered = self.state.projects.contains_key(&project_id)
                    && !self.state.no_buffering
                    && !self.dumb;
                if buffered {
                    self.state.project_mut(&project_id).push_log(message);
                } else {
                    let line = sink_line(self.state.max_threads, &project_id, &message);
                    self.sink.accept(&line)?;
                }
            }
            Message::BuildLogMessage { message } => {
                self.sink.accept(&message)?;
            }
            Message::PrintOut { message } => {
                if self.sink.is_file_backed() {
                    self.sink.accept(&message)?;
                } else {
                    self.display.print_line(&message)?;
                }
            }
            Message::PrintErr { message } => {
                if self.sink.is_file_backed() {
                    self.sink.accept(&message)?;
                } else {
                    self.display.print_err(&message)?;
                }
            }
            Message::Display { project_id, message } => {
                self.display.print_line(&format!("[{project_id}] {message}"))?;
            }
            Message::Prompt(prompt) => {
                if self.dumb {
                    self.display.print_line("")?;
                } else {
                    self.display.clear()?;
                    if let Some(modal) = &self.modal {
                        self.input_active.store(true, Ordering::Relaxed);
                        let _ = modal.send(ModalRequest::Prompt(prompt));
                    }
                }
            }
            Message::RequestInput { project_id, bytes_to_read } => match &self.modal {
                Some(modal) => {
                    self.input_active.store(true, Ordering::Relaxed);
                    let _ = modal.send(ModalRequest::ReadInput { project_id, bytes_to_read });
                }
                None => {
                    // No interactive input side: answer EOF right away
                    let _ = self.dispatch.send(Message::InputData { data: None }).await;
                }
            },
            Message::InputData { .. } => {
                let _ = self.dispatch.send(message).await;
            }
            Message::KeyboardInput { key } => self.handle_key(key)?,
            Message::BuildStatus { message } => {
                self.state.build_status = Some(message);
            }
            Message::BuildFinished { exit_code } => {
                self.finish()?;
                return Ok(Some(exit_code));
            }
            Message::BuildException { message, class_name, .. } => {
                self.finish()?;
                let text = if class_name == UNRECOGNIZED_OPTION {
                    format!("Unable to parse command line options: {message}")
                } else {
                    message
                };
                self.display.print_line(&crate::color::bold_red(&text))?;
                return Ok(Some(1));
            }
            Message::CancelBuild => {
                self.finish()?;
                self.display
                    .print_line(&crate::color::bold_red("The build was canceled"))?;
                return Ok(Some(1));
            }
            Message::TransferInitiated(_)
            | Message::TransferStarted(_)
            | Message::TransferProgressed(_)
            | Message::TransferCorrupted(_)
            | Message::TransferSucceeded(_)
            | Message::TransferFailed(_) => {
                self.state.apply_transfer(&message);
            }
            Message::ExecutionFailure(failure) => {
                self.state.failures.push(failure);
            }
            Message::KeepAlive => {}
            other => {
                tracing::debug!(tag = other.tag(), "unexpected message on the client");
            }
        }
        Ok(None)
    }

    fn handle_key(&mut self, key: char) -> Result<(), ClientError> {
        match key {
            '+' => {
                self.state.lines_per_project = (self.state.lines_per_project + 1).min(10);
            }
            '-' => {
                self.state.lines_per_project = self.state.lines_per_project.saturating_sub(1);
            }
            CTRL_B => {
                self.state.no_buffering = !self.state.no_buffering;
                if self.state.no_buffering {
                    self.flush_projects()?;
                    self.state.projects.clear();
                    self.display.clear()?;
                }
            }
            CTRL_L => {
                self.display.clear()?;
            }
            CTRL_M => {
                self.state.display_done = !self.state.display_done;
                if self.state.display_done {
                    self.flush_sink()?;
                }
            }
            other => tracing::debug!(?other, "ignored keystroke"),
        }
        Ok(())
    }

    fn redraw(&mut self) {
        let (rows, cols) = self.display.size();
        let frame = layout::build_frame(&self.state, rows, cols, self.started.elapsed());
        if let Err(e) = self.display.update(&frame) {
            tracing::debug!("frame skipped: {e}");
        }
    }

    /// Clear the live region, then flush the sink (deferred lines print
    /// into the cleared space).
    fn flush_sink(&mut self) -> Result<(), ClientError> {
        self.display.clear()?;
        self.sink.flush()?;
        Ok(())
    }

    /// Move every buffered project line to the sink, in project start
    /// order.
    fn flush_projects(&mut self) -> Result<(), ClientError> {
        let max_threads = self.state.max_threads;
        let mut lines = Vec::new();
        for (id, project) in self.state.projects.iter_mut() {
            for line in project.drain_log() {
                lines.push(sink_line(max_threads, id, &line));
            }
        }
        for line in lines {
            self.sink.accept(&line)?;
        }
        Ok(())
    }

    /// Common termination: drain buffers, clear the display, close the
    /// sink.
    fn finish(&mut self) -> Result<(), ClientError> {
        self.flush_projects()?;
        self.state.projects.clear();
        self.display.clear()?;
        self.sink.close()?;
        Ok(())
    }
}

/// A log line as it lands in the sink: project-prefixed when builds run in
/// parallel.
fn sink_line(max_threads: i32, project_id: &str, message: &str) -> String {
    if max_threads > 1 {
        format!("[{project_id}] {message}")
    } else {
        message.to_string()
    }
}

#[cfg(test)]
#[path = "render_tests.rs"]
mod tests;
