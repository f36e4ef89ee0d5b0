// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Batched replay queue for engine events.
//!
//! Events buffered while the session writer is busy are replayed in the
//! canonical class order. This reorders only a buffer of already-received
//! messages — frames already on the wire are never reordered.

use kiln_wire::{compare, Message, Sequenced};
use parking_lot::Mutex;

/// Accumulates messages and drains them sorted by dispatch class, ties in
/// construction order.
#[derive(Default)]
pub struct DispatchQueue {
    buffer: Mutex<Vec<Sequenced>>,
}

impl DispatchQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&self, message: Message) {
        self.buffer.lock().push(Sequenced::new(message));
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.lock().is_empty()
    }

    /// Take the current batch in canonical replay order.
    pub fn drain(&self) -> Vec<Message> {
        let mut batch = std::mem::take(&mut *self.buffer.lock());
        batch.sort_by(compare);
        batch.into_iter().map(Sequenced::into_message).collect()
    }
}

#[cfg(test)]
#[path = "dispatch_tests.rs"]
mod tests;
