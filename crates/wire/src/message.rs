// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Message model for the build session protocol.
//!
//! One closed sum type covers every frame that crosses the wire. Control
//! messages (`KeepAlive`, `Stop`, `CancelBuild`) carry no payload and
//! compare by tag alone.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use indexmap::IndexMap;

/// Transfer request type: artifact download.
pub const REQUEST_GET: u8 = 0;
/// Transfer request type: artifact upload.
pub const REQUEST_PUT: u8 = 1;

/// A client's build invocation: argv, directories, and environment.
///
/// `env` iterates in insertion order on both ends of the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildRequest {
    pub args: Vec<String>,
    pub working_dir: String,
    pub project_dir: String,
    pub env: IndexMap<String, String>,
}

/// A plugin goal starting against a project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MojoStarted {
    pub artifact_id: String,
    pub plugin_group_id: String,
    pub plugin_artifact_id: String,
    pub plugin_goal_prefix: String,
    pub plugin_version: String,
    pub mojo: String,
    pub execution_id: String,
}

/// An interactive prompt from the build, answered by the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub project_id: String,
    pub uid: String,
    pub message: String,
    pub password: bool,
}

/// Repository transfer progress, shared by all six transfer variants.
///
/// `content_length` and `transferred_bytes` may be -1 for "unknown"; when
/// both are known, `transferred_bytes <= content_length` holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferEvent {
    pub project_id: String,
    pub request_type: u8,
    pub repository_id: String,
    pub repository_url: String,
    pub resource_name: String,
    pub content_length: i64,
    pub transferred_bytes: i64,
    pub exception: Option<String>,
}

/// One project failing during the build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionFailure {
    pub project_id: String,
    pub halted: bool,
    pub exception: Option<String>,
}

/// Every frame the protocol can carry. Tags are fixed by the wire format;
/// see [`Message::tag`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    BuildRequest(BuildRequest),
    BuildStarted {
        project_id: String,
        project_count: i32,
        max_threads: i32,
        artifact_id_display_length: i32,
    },
    BuildFinished {
        exit_code: i32,
    },
    ProjectStarted {
        project_id: String,
    },
    ProjectStopped {
        project_id: String,
    },
    MojoStarted(MojoStarted),
    ProjectLogMessage {
        project_id: String,
        message: String,
    },
    BuildLogMessage {
        message: String,
    },
    BuildException {
        message: String,
        class_name: String,
        stack_trace: String,
    },
    KeepAlive,
    Stop,
    Display {
        project_id: String,
        message: String,
    },
    Prompt(Prompt),
    PromptResponse {
        project_id: String,
        uid: String,
        message: String,
    },
    BuildStatus {
        message: String,
    },
    /// Single keystroke routed from the input thread to the render loop.
    /// Never sent between peers.
    KeyboardInput {
        key: char,
    },
    CancelBuild,
    TransferInitiated(TransferEvent),
    TransferStarted(TransferEvent),
    TransferProgressed(TransferEvent),
    TransferCorrupted(TransferEvent),
    TransferSucceeded(TransferEvent),
    TransferFailed(TransferEvent),
    ExecutionFailure(ExecutionFailure),
    PrintOut {
        message: String,
    },
    PrintErr {
        message: String,
    },
    RequestInput {
        project_id: String,
        bytes_to_read: i32,
    },
    /// Keyboard bytes for a project's stdin. `None` means end of input.
    InputData {
        data: Option<String>,
    },
}

impl Message {
    /// The 1-byte wire tag for this variant.
    pub fn tag(&self) -> u8 {
        match self {
            Message::BuildRequest(_) => 1,
            Message::BuildStarted { .. } => 2,
            Message::BuildFinished { .. } => 3,
            Message::ProjectStarted { .. } => 4,
            Message::ProjectStopped { .. } => 5,
            Message::MojoStarted(_) => 6,
            Message::ProjectLogMessage { .. } => 7,
            Message::BuildLogMessage { .. } => 8,
            Message::BuildException { .. } => 9,
            Message::KeepAlive => 10,
            Message::Stop => 11,
            Message::Display { .. } => 12,
            Message::Prompt(_) => 13,
            Message::PromptResponse { .. } => 14,
            Message::BuildStatus { .. } => 15,
            Message::KeyboardInput { .. } => 16,
            Message::CancelBuild => 17,
            Message::TransferInitiated(_) => 18,
            Message::TransferStarted(_) => 19,
            Message::TransferProgressed(_) => 20,
            Message::TransferCorrupted(_) => 21,
            Message::TransferSucceeded(_) => 22,
            Message::TransferFailed(_) => 23,
            Message::ExecutionFailure(_) => 24,
            Message::PrintOut { .. } => 25,
            Message::PrintErr { .. } => 26,
            Message::RequestInput { .. } => 27,
            Message::InputData { .. } => 28,
        }
    }

    /// The transfer payload, for the six transfer variants.
    pub fn transfer(&self) -> Option<&TransferEvent> {
        match self {
            Message::TransferInitiated(t)
            | Message::TransferStarted(t)
            | Message::TransferProgressed(t)
            | Message::TransferCorrupted(t)
            | Message::TransferSucceeded(t)
            | Message::TransferFailed(t) => Some(t),
            _ => None,
        }
    }
}

static NEXT_SEQUENCE: AtomicU64 = AtomicU64::new(1);

/// A message with its in-process construction order and creation time.
///
/// The sequence number and timestamp never cross the wire; they exist so a
/// buffered batch can be replayed in a canonical order (see
/// [`crate::compare`]).
#[derive(Debug, Clone)]
pub struct Sequenced {
    seq: u64,
    created_at: Instant,
    pub message: Message,
}

impl Sequenced {
    pub fn new(message: Message) -> Self {
        Self {
            seq: NEXT_SEQUENCE.fetch_add(1, Ordering::Relaxed),
            created_at: Instant::now(),
            message,
        }
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    pub fn into_message(self) -> Message {
        self.message
    }
}

impl From<Message> for Sequenced {
    fn from(message: Message) -> Self {
        Self::new(message)
    }
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
