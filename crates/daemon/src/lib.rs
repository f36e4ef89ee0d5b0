// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Build daemon library.
//!
//! Hosts a resident build engine behind a Unix socket and serves one build
//! session per client connection using the `kiln-wire` protocol.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod connection;
mod dispatch;
mod engine;
pub mod env;
mod lifecycle;
pub mod resume;

pub use connection::{serve, BuildGate, ConnectionError, SessionConfig};
pub use dispatch::DispatchQueue;
pub use engine::{BuildEngine, EngineError, EngineOutcome, FakeBuildEngine, ProcessEngine};
pub use lifecycle::{shutdown_cleanup, startup, Config, LifecycleError, StartupResult};
