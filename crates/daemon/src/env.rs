// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon crate.

use std::path::PathBuf;
use std::time::Duration;

use crate::lifecycle::LifecycleError;

/// Daemon version (from Cargo.toml)
pub const DAEMON_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Resolve state directory: KILN_STATE_DIR > XDG_STATE_HOME/kiln > ~/.local/state/kiln
pub fn state_dir() -> Result<PathBuf, LifecycleError> {
    if let Ok(dir) = std::env::var("KILN_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("kiln"));
    }
    let home = std::env::var("HOME").map_err(|_| LifecycleError::NoStateDir)?;
    Ok(PathBuf::from(home).join(".local/state/kiln"))
}

/// Socket path override; defaults to `daemon.sock` under the state dir.
pub fn socket_path() -> Result<PathBuf, LifecycleError> {
    if let Ok(path) = std::env::var("KILN_SOCKET") {
        return Ok(PathBuf::from(path));
    }
    Ok(state_dir()?.join("daemon.sock"))
}

/// Writer keep-alive period: an idle writer enqueues a KeepAlive this often.
pub fn keep_alive() -> Duration {
    std::env::var("KILN_KEEPALIVE_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_secs(1))
}

/// Dead-peer timeout: a reader silent for this long abandons the session.
/// Defaults to ten keep-alive periods.
pub fn idle_timeout() -> Duration {
    std::env::var("KILN_IDLE_TIMEOUT_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or_else(|| keep_alive() * 10)
}

/// The build tool executable the process engine runs. Defaults to `mvn`.
pub fn build_tool() -> String {
    std::env::var("KILN_BUILD_TOOL").unwrap_or_else(|_| "mvn".to_string())
}
