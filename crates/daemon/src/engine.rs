// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The build-engine seam.
//!
//! The daemon embeds an unmodified upstream build tool behind the
//! [`BuildEngine`] trait: it emits daemon-to-client messages on an event
//! channel and consumes the client commands a running build can accept
//! (`PromptResponse`, `InputData`; cancellation arrives via the token).

use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use kiln_wire::{BuildRequest, Message};
use parking_lot::Mutex;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Errors from engine execution.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to launch {tool}: {source}")]
    Launch {
        tool: String,
        source: std::io::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// What a finished build leaves behind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOutcome {
    pub exit_code: i32,
    /// Projects left unbuilt, in build order. Non-empty only on failure.
    pub remaining_projects: Vec<String>,
}

/// A resident build engine serving one build at a time.
#[async_trait]
pub trait BuildEngine: Send + Sync {
    /// Run one build to completion. The engine owns the event stream from
    /// `BuildStarted` through `BuildFinished`/`BuildException` and must
    /// stop promptly when `cancel` fires (still emitting the termination
    /// sequence).
    async fn run(
        &self,
        request: BuildRequest,
        events: mpsc::Sender<Message>,
        commands: mpsc::Receiver<Message>,
        cancel: CancellationToken,
    ) -> Result<EngineOutcome, EngineError>;
}

/// Runs the configured build tool as a child process and bridges its
/// standard streams onto the wire. The warm-engine embedding is the
/// upstream build tool's concern; this adapter is the thin default so a
/// bare daemon is still usable end to end.
pub struct ProcessEngine {
    tool: String,
}

impl ProcessEngine {
    pub fn new(tool: String) -> Self {
        Self { tool }
    }

    pub fn from_env() -> Self {
        Self::new(crate::env::build_tool())
    }
}

#[async_trait]
impl BuildEngine for ProcessEngine {
    async fn run(
        &self,
        request: BuildRequest,
        events: mpsc::Sender<Message>,
        mut commands: mpsc::Receiver<Message>,
        cancel: CancellationToken,
    ) -> Result<EngineOutcome, EngineError> {
        let project_id = project_name(&request.project_dir);
        let _ = events
            .send(Message::BuildStarted {
                project_id: project_id.clone(),
                project_count: 1,
                max_threads: 1,
                artifact_id_display_length: project_id.len() as i32,
            })
            .await;

        let mut child = tokio::process::Command::new(&self.tool)
            .args(&request.args)
            .current_dir(&request.working_dir)
            .envs(request.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| EngineError::Launch { tool: self.tool.clone(), source })?;

        let mut stdin = child.stdin.take();
        if let Some(stdout) = child.stdout.take() {
            spawn_line_pump(stdout, events.clone(), |line| Message::PrintOut { message: line });
        }
        if let Some(stderr) = child.stderr.take() {
            spawn_line_pump(stderr, events.clone(), |line| Message::PrintErr { message: line });
        }

        let mut commands_open = true;
        let exit_code = loop {
            tokio::select! {
                status = child.wait() => {
                    break status?.code().unwrap_or(1);
                }
                _ = cancel.cancelled() => {
                    debug!("build canceled, killing child");
                    let _ = child.kill().await;
                    break 130;
                }
                command = commands.recv(), if commands_open => {
                    match command {
                        Some(Message::InputData { data: Some(data) }) => {
                            if let Some(stdin) = stdin.as_mut() {
                                let _ = stdin.write_all(data.as_bytes()).await;
                                let _ = stdin.flush().await;
                            }
                        }
                        Some(Message::InputData { data: None }) => {
                            // EOF: close the child's stdin
                            stdin = None;
                        }
                        Some(other) => {
                            warn!(tag = other.tag(), "command not supported by process engine");
                        }
                        None => commands_open = false,
                    }
                }
            }
        };

        let _ = events.send(Message::BuildFinished { exit_code }).await;
        Ok(EngineOutcome { exit_code, remaining_projects: Vec::new() })
    }
}

fn project_name(project_dir: &str) -> String {
    Path::new(project_dir)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| project_dir.to_string())
}

fn spawn_line_pump<R>(
    stream: R,
    events: mpsc::Sender<Message>,
    wrap: impl Fn(String) -> Message + Send + 'static,
) where
    R: tokio::io::AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(stream).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if events.send(wrap(line)).await.is_err() {
                break;
            }
        }
    });
}

/// Scripted engine for tests: plays back a fixed event sequence and
/// records every command it receives.
pub struct FakeBuildEngine {
    script: Vec<Message>,
    exit_code: i32,
    remaining_projects: Vec<String>,
    seen_commands: Arc<Mutex<Vec<Message>>>,
}

impl FakeBuildEngine {
    pub fn new(script: Vec<Message>) -> Self {
        Self {
            script,
            exit_code: 0,
            remaining_projects: Vec::new(),
            seen_commands: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_outcome(mut self, exit_code: i32, remaining_projects: Vec<String>) -> Self {
        self.exit_code = exit_code;
        self.remaining_projects = remaining_projects;
        self
    }

    /// Commands received so far, in arrival order.
    pub fn seen_commands(&self) -> Vec<Message> {
        self.seen_commands.lock().clone()
    }

    pub fn command_log(&self) -> Arc<Mutex<Vec<Message>>> {
        Arc::clone(&self.seen_commands)
    }
}

#[async_trait]
impl BuildEngine for FakeBuildEngine {
    async fn run(
        &self,
        _request: BuildRequest,
        events: mpsc::Sender<Message>,
        mut commands: mpsc::Receiver<Message>,
        cancel: CancellationToken,
    ) -> Result<EngineOutcome, EngineError> {
        for message in self.script.clone() {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    let _ = events.send(Message::BuildFinished { exit_code: 130 }).await;
                    return Ok(EngineOutcome { exit_code: 130, remaining_projects: Vec::new() });
                }
                result = events.send(message) => {
                    if result.is_err() {
                        break;
                    }
                }
            }
            while let Ok(command) = commands.try_recv() {
                self.seen_commands.lock().push(command);
            }
        }
        Ok(EngineOutcome {
            exit_code: self.exit_code,
            remaining_projects: self.remaining_projects.clone(),
        })
    }
}
