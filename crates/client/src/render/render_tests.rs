// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Render-loop state machine tests with a recording display and sink.

use std::io;
use std::sync::{Arc, Mutex};

use kiln_wire::Prompt;
use tokio::sync::mpsc;

use super::*;
use crate::display::LiveDisplay;
use crate::sink::LogSink;

#[derive(Clone, Default)]
struct Recording {
    frames: Arc<Mutex<Vec<Vec<String>>>>,
    printed: Arc<Mutex<Vec<String>>>,
    clears: Arc<Mutex<usize>>,
}

struct RecordingDisplay {
    recording: Recording,
    rows: u16,
    cols: u16,
}

impl RecordingDisplay {
    fn new(recording: Recording) -> Self {
        Self {
            recording,
            rows: 30,
            cols: 120,
        }
    }
}

impl LiveDisplay for RecordingDisplay {
    fn size(&self) -> (u16, u16) {
        (self.rows, self.cols)
    }

    fn update(&mut self, frame: &[String]) -> io::Result<()> {
        self.recording.frames.lock().unwrap().push(frame.to_vec());
        Ok(())
    }

    fn clear(&mut self) -> io::Result<()> {
        *self.recording.clears.lock().unwrap() += 1;
        Ok(())
    }

    fn print_line(&mut self, line: &str) -> io::Result<()> {
        self.recording.printed.lock().unwrap().push(line.to_string());
        Ok(())
    }

    fn print_err(&mut self, line: &str) -> io::Result<()> {
        self.recording.printed.lock().unwrap().push(line.to_string());
        Ok(())
    }
}

#[derive(Clone, Default)]
struct Captured {
    lines: Arc<Mutex<Vec<String>>>,
    flushes: Arc<Mutex<usize>>,
}

struct CapturingSink {
    captured: Captured,
    file_backed: bool,
}

impl LogSink for CapturingSink {
    fn accept(&mut self, line: &str) -> io::Result<()> {
        self.captured.lines.lock().unwrap().push(line.to_string());
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        *self.captured.flushes.lock().unwrap() += 1;
        Ok(())
    }

    fn is_file_backed(&self) -> bool {
        self.file_backed
    }
}

struct Driven {
    code: i32,
    sink: Vec<String>,
    flushes: usize,
    printed: Vec<String>,
    frames: Vec<Vec<String>>,
    dispatched: Vec<Message>,
}

async fn drive(messages: Vec<Message>) -> Driven {
    drive_with(messages, false, false).await
}

async fn drive_with(messages: Vec<Message>, dumb: bool, file_backed: bool) -> Driven {
    let recording = Recording::default();
    let captured = Captured::default();

    let (inbound_tx, inbound_rx) = mpsc::channel(256);
    let (dispatch_tx, mut dispatch_rx) = mpsc::channel(256);
    for message in messages {
        inbound_tx.send(message).await.unwrap();
    }
    drop(inbound_tx);

    let render = RenderLoop::new(
        inbound_rx,
        dispatch_tx,
        RecordingDisplay::new(recording.clone()),
        Box::new(CapturingSink { captured: captured.clone(), file_backed }),
        "d1".into(),
        dumb,
    );
    let code = render.run().await.unwrap();

    let mut dispatched = Vec::new();
    while let Ok(message) = dispatch_rx.try_recv() {
        dispatched.push(message);
    }
    let sink = captured.lines.lock().unwrap().clone();
    let flushes = *captured.flushes.lock().unwrap();
    let printed = recording.printed.lock().unwrap().clone();
    let frames = recording.frames.lock().unwrap().clone();
    Driven {
        code,
        sink,
        flushes,
        printed,
        frames,
        dispatched,
    }
}

fn build_started(project_count: i32, max_threads: i32) -> Message {
    Message::BuildStarted {
        project_id: "app".into(),
        project_count,
        max_threads,
        artifact_id_display_length: 10,
    }
}

fn log(project_id: &str, message: &str) -> Message {
    Message::ProjectLogMessage {
        project_id: project_id.into(),
        message: message.into(),
    }
}

#[tokio::test]
async fn single_threaded_build_streams_the_log_once() {
    let driven = drive(vec![
        build_started(1, 1),
        Message::ProjectStarted { project_id: "a".into() },
        log("a", "L1"),
        Message::ProjectStopped { project_id: "a".into() },
        Message::BuildFinished { exit_code: 0 },
    ])
    .await;

    assert_eq!(driven.code, 0);
    assert_eq!(driven.sink, ["L1"]);
}

#[tokio::test]
async fn parallel_build_buffers_until_project_stop() {
    let driven = drive(vec![
        build_started(3, 2),
        Message::ProjectStarted { project_id: "a".into() },
        log("a", "L1"),
        log("a", "L2"),
        Message::BuildLogMessage { message: "M1".into() },
        Message::ProjectStopped { project_id: "a".into() },
        Message::BuildFinished { exit_code: 0 },
    ])
    .await;

    // M1 went straight through while L1/L2 sat in the project buffer;
    // the buffer drained in FIFO order on ProjectStopped
    assert_eq!(driven.sink, ["M1", "[a] L1", "[a] L2"]);
}

#[tokio::test]
async fn unknown_project_log_is_written_immediately() {
    let driven = drive(vec![
        build_started(3, 2),
        log("ghost", "L1"),
        Message::BuildFinished { exit_code: 0 },
    ])
    .await;
    assert_eq!(driven.sink, ["[ghost] L1"]);
}

#[tokio::test]
async fn cancel_prints_exactly_one_red_line_and_exits() {
    let driven = drive(vec![build_started(3, 2), Message::CancelBuild]).await;

    assert_eq!(driven.code, 1);
    let canceled: Vec<&String> = driven
        .printed
        .iter()
        .filter(|line| line.contains("The build was canceled"))
        .collect();
    assert_eq!(canceled.len(), 1);
    assert!(canceled[0].starts_with(crate::color::BOLD_RED));
}

#[tokio::test]
async fn unrecognized_option_exception_gets_a_hint_prefix() {
    let driven = drive(vec![Message::BuildException {
        message: "--frobnicate".into(),
        class_name: "org.apache.commons.cli.UnrecognizedOptionException".into(),
        stack_trace: String::new(),
    }])
    .await;

    assert_eq!(driven.code, 1);
    assert!(driven.printed[0].contains("Unable to parse command line options: --frobnicate"));
}

#[tokio::test]
async fn other_exceptions_print_their_message() {
    let driven = drive(vec![Message::BuildException {
        message: "out of heap".into(),
        class_name: "java.lang.OutOfMemoryError".into(),
        stack_trace: "...".into(),
    }])
    .await;

    assert!(driven.printed[0].contains("out of heap"));
    assert!(!driven.printed[0].contains("Unable to parse"));
}

#[tokio::test]
async fn build_exit_code_is_returned() {
    let driven = drive(vec![Message::BuildFinished { exit_code: 7 }]).await;
    assert_eq!(driven.code, 7);
}

#[tokio::test]
async fn lost_transport_finishes_with_failure() {
    // Inbound closes with no terminator at all
    let driven = drive(vec![build_started(3, 2)]).await;
    assert_eq!(driven.code, 1);
}

#[tokio::test]
async fn print_out_goes_to_the_terminal_without_a_file_log() {
    let driven = drive(vec![
        Message::PrintOut { message: "to stdout".into() },
        Message::BuildFinished { exit_code: 0 },
    ])
    .await;
    assert_eq!(driven.printed, ["to stdout"]);
    assert!(driven.sink.is_empty());
}

#[tokio::test]
async fn print_out_goes_to_a_file_log() {
    let driven = drive_with(
        vec![
            Message::PrintOut { message: "to the file".into() },
            Message::BuildFinished { exit_code: 0 },
        ],
        false,
        true,
    )
    .await;
    assert_eq!(driven.sink, ["to the file"]);
    assert!(driven.printed.is_empty());
}

#[tokio::test]
async fn display_message_is_prefixed_and_immediate() {
    let driven = drive(vec![
        Message::Display { project_id: "a".into(), message: "hello".into() },
        Message::BuildFinished { exit_code: 0 },
    ])
    .await;
    assert_eq!(driven.printed, ["[a] hello"]);
}

#[tokio::test]
async fn toggling_no_buffering_flushes_project_buffers() {
    let driven = drive(vec![
        build_started(3, 2),
        Message::ProjectStarted { project_id: "a".into() },
        log("a", "L1"),
        Message::KeyboardInput { key: '\u{2}' },
        Message::BuildLogMessage { message: "M1".into() },
        Message::BuildFinished { exit_code: 0 },
    ])
    .await;

    // The Ctrl-B flush put L1 in the sink before M1 arrived
    assert_eq!(driven.sink, ["[a] L1", "M1"]);
}

#[tokio::test]
async fn display_done_flushes_on_each_completion() {
    let driven = drive(vec![
        build_started(3, 2),
        Message::KeyboardInput { key: '\u{d}' },
        Message::ProjectStarted { project_id: "a".into() },
        Message::ProjectStopped { project_id: "a".into() },
        Message::BuildFinished { exit_code: 0 },
    ])
    .await;

    // toggle-on flush + completion flush + close
    assert_eq!(driven.flushes, 3);
}

#[tokio::test]
async fn window_size_keys_clamp_between_zero_and_ten() {
    let mut messages = vec![
        build_started(3, 2),
        Message::ProjectStarted { project_id: "a".into() },
    ];
    for i in 0..12 {
        messages.push(log("a", &format!("line {i}")));
    }
    for _ in 0..12 {
        messages.push(Message::KeyboardInput { key: '+' });
    }
    messages.push(Message::BuildFinished { exit_code: 0 });
    let driven = drive(messages).await;

    // project line + clamped 10-line window + status
    let frame = driven.frames.last().unwrap();
    assert_eq!(frame.len(), 12);
}

#[tokio::test]
async fn request_input_without_an_input_thread_answers_eof() {
    let driven = drive(vec![
        Message::RequestInput { project_id: "a".into(), bytes_to_read: 16 },
        Message::BuildFinished { exit_code: 0 },
    ])
    .await;
    assert_eq!(driven.dispatched, [Message::InputData { data: None }]);
}

#[tokio::test]
async fn input_data_is_forwarded_to_the_daemon() {
    let driven = drive(vec![
        Message::InputData { data: Some("typed".into()) },
        Message::BuildFinished { exit_code: 0 },
    ])
    .await;
    assert_eq!(driven.dispatched, [Message::InputData { data: Some("typed".into()) }]);
}

#[tokio::test]
async fn dumb_terminal_answers_prompts_with_a_blank_line() {
    let driven = drive_with(
        vec![
            Message::Prompt(Prompt {
                project_id: "a".into(),
                uid: "u1".into(),
                message: "Continue?".into(),
                password: false,
            }),
            Message::BuildFinished { exit_code: 0 },
        ],
        true,
        false,
    )
    .await;
    assert_eq!(driven.printed, [""]);
    // nothing was dispatched back; the prompt is ignored on dumb terminals
    assert!(driven.dispatched.is_empty());
}

#[tokio::test]
async fn no_frames_are_drawn_in_no_buffering_mode() {
    let driven = drive(vec![
        build_started(1, 1),
        Message::ProjectStarted { project_id: "a".into() },
        log("a", "L1"),
        Message::BuildFinished { exit_code: 0 },
    ])
    .await;
    assert!(driven.frames.is_empty());
}

#[tokio::test]
async fn frames_are_drawn_while_buffering() {
    let driven = drive(vec![
        build_started(3, 2),
        Message::ProjectStarted { project_id: "a".into() },
        Message::BuildFinished { exit_code: 0 },
    ])
    .await;
    // at least one frame before the terminator cleared the display
    assert!(!driven.frames.is_empty());
}
