// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Canonical ordering for batched message replay.
//!
//! The daemon buffers messages while a consumer is busy and replays the
//! batch sorted by class, then by construction sequence. This never
//! reorders frames on the wire — only a buffer of already-received
//! messages.

use std::cmp::Ordering;

use crate::message::{Message, Sequenced};

/// The dispatch class of a message. Lower classes replay first.
///
/// `BuildStatus`, `KeyboardInput`, and `CancelBuild` never enter the batch
/// queue; routing one here is a programming error.
pub fn dispatch_class(message: &Message) -> u8 {
    match message {
        Message::KeepAlive | Message::BuildRequest(_) => 0,
        Message::BuildStarted { .. } => 1,
        Message::Prompt(_)
        | Message::PromptResponse { .. }
        | Message::Display { .. }
        | Message::PrintOut { .. }
        | Message::PrintErr { .. }
        | Message::RequestInput { .. }
        | Message::InputData { .. } => 2,
        Message::ProjectStarted { .. } => 3,
        Message::MojoStarted(_) => 4,
        Message::ExecutionFailure(_) => 10,
        Message::TransferInitiated(_) | Message::TransferStarted(_) => 40,
        Message::TransferProgressed(_) => 41,
        Message::TransferCorrupted(_)
        | Message::TransferSucceeded(_)
        | Message::TransferFailed(_) => 42,
        Message::ProjectLogMessage { .. } => 50,
        Message::BuildLogMessage { .. } => 51,
        Message::ProjectStopped { .. } => 95,
        Message::BuildFinished { .. } => 96,
        Message::BuildException { .. } => 97,
        Message::Stop => 99,
        Message::BuildStatus { .. }
        | Message::KeyboardInput { .. }
        | Message::CancelBuild => {
            unreachable!("message type is never batch-dispatched")
        }
    }
}

/// Compare two buffered messages: class first, then construction order.
pub fn compare(a: &Sequenced, b: &Sequenced) -> Ordering {
    dispatch_class(&a.message)
        .cmp(&dispatch_class(&b.message))
        .then(a.seq().cmp(&b.seq()))
}

#[cfg(test)]
#[path = "order_tests.rs"]
mod tests;
