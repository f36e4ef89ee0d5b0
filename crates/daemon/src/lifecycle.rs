// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon startup and shutdown.
//!
//! Startup order matters: the exclusive lock is taken before anything else
//! so a second daemon never clobbers the files of a running one.

use std::io::Write;
use std::path::PathBuf;

use fs2::FileExt;
use thiserror::Error;
use tokio::net::UnixListener;
use tracing::info;

/// Filesystem layout for one daemon instance.
#[derive(Debug, Clone)]
pub struct Config {
    pub state_dir: PathBuf,
    pub socket_path: PathBuf,
    pub lock_path: PathBuf,
    pub logs_dir: PathBuf,
}

impl Config {
    /// Derive the standard layout under a state directory.
    pub fn under(state_dir: PathBuf, socket_path: PathBuf) -> Self {
        Self {
            lock_path: state_dir.join("daemon.lock"),
            logs_dir: state_dir.join("logs"),
            state_dir,
            socket_path,
        }
    }
}

/// Errors from daemon lifecycle management.
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("no state directory: HOME is not set")]
    NoStateDir,

    #[error("another daemon holds the lock: {0}")]
    LockFailed(std::io::Error),

    #[error("failed to bind {0}: {1}")]
    BindFailed(PathBuf, std::io::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// A started daemon: the bound listener plus the held lock.
pub struct StartupResult {
    pub listener: UnixListener,
    /// Held for the daemon's lifetime; dropping it releases the lock.
    pub lock_file: std::fs::File,
}

/// Acquire the lock, clean stale state, and bind the socket.
pub fn startup(config: &Config) -> Result<StartupResult, LifecycleError> {
    match startup_inner(config) {
        Ok(result) => Ok(result),
        Err(e) => {
            // Don't clean up if we failed to acquire the lock —
            // those files belong to the already-running daemon.
            if !matches!(e, LifecycleError::LockFailed(_)) {
                shutdown_cleanup(config);
            }
            Err(e)
        }
    }
}

fn startup_inner(config: &Config) -> Result<StartupResult, LifecycleError> {
    std::fs::create_dir_all(&config.state_dir)?;
    std::fs::create_dir_all(&config.logs_dir)?;
    if let Some(parent) = config.socket_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Acquire the lock before touching anything else. Open without
    // truncating so a losing contender cannot wipe the winner's PID.
    let lock_file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(&config.lock_path)?;
    lock_file.try_lock_exclusive().map_err(LifecycleError::LockFailed)?;

    let mut lock_file = lock_file;
    lock_file.set_len(0)?;
    writeln!(lock_file, "{}", std::process::id())?;
    let lock_file = lock_file;

    // Remove a stale socket left by a crashed daemon, then bind.
    if config.socket_path.exists() {
        std::fs::remove_file(&config.socket_path)?;
    }
    let listener = UnixListener::bind(&config.socket_path)
        .map_err(|e| LifecycleError::BindFailed(config.socket_path.clone(), e))?;

    info!(socket = %config.socket_path.display(), "daemon listening");
    Ok(StartupResult { listener, lock_file })
}

/// Remove the files a daemon leaves behind. Safe to call on a partial
/// startup; missing files are ignored.
pub fn shutdown_cleanup(config: &Config) {
    if config.socket_path.exists() {
        let _ = std::fs::remove_file(&config.socket_path);
    }
    if config.lock_path.exists() {
        let _ = std::fs::remove_file(&config.lock_path);
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
