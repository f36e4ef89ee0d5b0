// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Keyboard input handler.
//!
//! Runs on its own OS thread and owns the terminal's read side. Display
//! keystrokes become internal `KeyboardInput` messages on the render
//! loop's inbound queue; Ctrl-C becomes `CancelBuild` on both queues. A
//! `Prompt`/`RequestInput` handed over by the render loop switches the
//! thread into a modal read that answers the daemon directly.
//!
//! In dumb mode the handler is never spawned.

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use kiln_wire::{Message, Prompt};
use tokio::sync::mpsc;
use tracing::debug;

/// A modal read handed over by the render loop.
pub enum ModalRequest {
    Prompt(Prompt),
    ReadInput {
        project_id: String,
        bytes_to_read: i32,
    },
}

pub struct InputHandler {
    modal_tx: std::sync::mpsc::Sender<ModalRequest>,
    input_active: Arc<AtomicBool>,
    closing: Arc<AtomicBool>,
}

impl InputHandler {
    /// Spawn the input thread. `events` feeds the render loop's inbound
    /// queue; `dispatch` feeds the daemon's outbound queue.
    pub fn spawn(events: mpsc::Sender<Message>, dispatch: mpsc::Sender<Message>) -> Self {
        let (modal_tx, modal_rx) = std::sync::mpsc::channel();
        let input_active = Arc::new(AtomicBool::new(false));
        let closing = Arc::new(AtomicBool::new(false));
        {
            let input_active = Arc::clone(&input_active);
            let closing = Arc::clone(&closing);
            std::thread::spawn(move || {
                run_loop(&modal_rx, &events, &dispatch, &input_active, &closing);
            });
        }
        Self {
            modal_tx,
            input_active,
            closing,
        }
    }

    pub fn modal_sender(&self) -> std::sync::mpsc::Sender<ModalRequest> {
        self.modal_tx.clone()
    }

    pub fn input_active(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.input_active)
    }

    /// Ask the thread to wind down. It exits at its next poll tick; a
    /// modal read in flight ends with the process.
    pub fn shutdown(&self) {
        self.closing.store(true, Ordering::Relaxed);
    }
}

fn run_loop(
    modal_rx: &std::sync::mpsc::Receiver<ModalRequest>,
    events: &mpsc::Sender<Message>,
    dispatch: &mpsc::Sender<Message>,
    input_active: &AtomicBool,
    closing: &AtomicBool,
) {
    while !closing.load(Ordering::Relaxed) {
        if let Ok(request) = modal_rx.try_recv() {
            handle_modal(request, events, dispatch);
            input_active.store(false, Ordering::Relaxed);
            continue;
        }
        match event::poll(Duration::from_millis(50)) {
            Ok(true) => match event::read() {
                Ok(Event::Key(key)) => handle_key(key, events, dispatch),
                Ok(Event::Resize(_, _)) => {
                    // Force a clear/redraw at the new size
                    let _ = events.blocking_send(Message::KeyboardInput { key: '\u{c}' });
                }
                Ok(_) => {}
                Err(e) => {
                    debug!("input read failed: {e}");
                    return;
                }
            },
            Ok(false) => {}
            Err(e) => {
                debug!("input poll failed: {e}");
                return;
            }
        }
    }
}

fn handle_key(key: KeyEvent, events: &mpsc::Sender<Message>, dispatch: &mpsc::Sender<Message>) {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    let stroke = match key.code {
        KeyCode::Char('c') if ctrl => {
            let _ = dispatch.blocking_send(Message::CancelBuild);
            let _ = events.blocking_send(Message::CancelBuild);
            return;
        }
        KeyCode::Char('b') if ctrl => Some('\u{2}'),
        KeyCode::Char('l') if ctrl => Some('\u{c}'),
        KeyCode::Char('m') if ctrl => Some('\u{d}'),
        KeyCode::Enter => Some('\u{d}'),
        KeyCode::Char(c @ ('+' | '-')) => Some(c),
        _ => None,
    };
    if let Some(key) = stroke {
        let _ = events.blocking_send(Message::KeyboardInput { key });
    }
}

fn handle_modal(
    request: ModalRequest,
    events: &mpsc::Sender<Message>,
    dispatch: &mpsc::Sender<Message>,
) {
    match request {
        ModalRequest::Prompt(prompt) => match read_prompt(&prompt) {
            Some(message) => {
                let _ = dispatch.blocking_send(Message::PromptResponse {
                    project_id: prompt.project_id,
                    uid: prompt.uid,
                    message,
                });
            }
            None => {
                let _ = dispatch.blocking_send(Message::CancelBuild);
                let _ = events.blocking_send(Message::CancelBuild);
            }
        },
        ModalRequest::ReadInput { project_id: _, bytes_to_read } => {
            read_input_data(bytes_to_read, events, dispatch);
        }
    }
}

/// Read a full line, echoing (masked when `password`). `None` = canceled.
fn read_prompt(prompt: &Prompt) -> Option<String> {
    let mut out = std::io::stdout();
    let label = if prompt.project_id.is_empty() {
        format!("{} ", prompt.message)
    } else {
        format!("[{}] {} ", prompt.project_id, prompt.message)
    };
    let _ = out.write_all(label.as_bytes());
    let _ = out.flush();

    let mut entered = String::new();
    loop {
        let key = match event::read() {
            Ok(Event::Key(key)) => key,
            Ok(_) => continue,
            // Terminal gone: submit what was typed so the build can go on
            Err(_) => return Some(entered),
        };
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Char('c') if ctrl => {
                let _ = out.write_all(b"\r\n");
                let _ = out.flush();
                return None;
            }
            KeyCode::Enter => {
                let _ = out.write_all(b"\r\n");
                let _ = out.flush();
                return Some(entered);
            }
            KeyCode::Backspace => {
                if entered.pop().is_some() {
                    let _ = out.write_all(b"\x08 \x08");
                    let _ = out.flush();
                }
            }
            KeyCode::Char(c) => {
                entered.push(c);
                let echo = if prompt.password { '*' } else { c };
                let mut buf = [0u8; 4];
                let _ = out.write_all(echo.encode_utf8(&mut buf).as_bytes());
                let _ = out.flush();
            }
            _ => {}
        }
    }
}

/// Read up to `bytes_to_read` bytes of keyboard input and answer with one
/// data chunk plus the EOF marker.
fn read_input_data(
    bytes_to_read: i32,
    events: &mpsc::Sender<Message>,
    dispatch: &mpsc::Sender<Message>,
) {
    let limit = bytes_to_read.max(0) as usize;
    let mut out = std::io::stdout();
    let mut data = String::new();
    while data.len() < limit {
        let key = match event::read() {
            Ok(Event::Key(key)) => key,
            Ok(_) => continue,
            Err(_) => break,
        };
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Char('d') if ctrl => break,
            KeyCode::Char('c') if ctrl => {
                let _ = dispatch.blocking_send(Message::CancelBuild);
                let _ = events.blocking_send(Message::CancelBuild);
                return;
            }
            KeyCode::Enter => {
                data.push('\n');
                let _ = out.write_all(b"\r\n");
                let _ = out.flush();
            }
            KeyCode::Char(c) => {
                data.push(c);
                let mut buf = [0u8; 4];
                let _ = out.write_all(c.encode_utf8(&mut buf).as_bytes());
                let _ = out.flush();
            }
            _ => {}
        }
    }
    if !data.is_empty() {
        let _ = dispatch.blocking_send(Message::InputData { data: Some(data) });
    }
    let _ = dispatch.blocking_send(Message::InputData { data: None });
}
