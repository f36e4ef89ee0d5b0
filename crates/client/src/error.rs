// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;

use kiln_wire::WireError;
use thiserror::Error;

/// Errors from the client's transport and render loop.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("cannot connect to daemon at {path}: {source}")]
    Connect {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Wire(#[from] WireError),

    #[error("terminal unavailable: {0}")]
    TerminalUnavailable(std::io::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
