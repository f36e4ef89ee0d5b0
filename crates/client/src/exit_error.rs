// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Custom error type that carries a process exit code.
//!
//! `run()` returns `ExitError` instead of calling `std::process::exit()`
//! directly, allowing `main()` to handle process termination. Transport,
//! terminal, and filesystem failures all convert into the generic failure
//! code 1; a finished build maps its own exit code in `run()`.

use std::fmt;

use crate::error::ClientError;

#[derive(Debug)]
pub struct ExitError {
    pub code: i32,
    pub message: String,
}

impl ExitError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl From<ClientError> for ExitError {
    fn from(e: ClientError) -> Self {
        Self::new(1, e.to_string())
    }
}

impl From<kiln_daemon::LifecycleError> for ExitError {
    fn from(e: kiln_daemon::LifecycleError) -> Self {
        Self::new(1, e.to_string())
    }
}

impl From<std::io::Error> for ExitError {
    fn from(e: std::io::Error) -> Self {
        Self::new(1, e.to_string())
    }
}

impl fmt::Display for ExitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ExitError {}
