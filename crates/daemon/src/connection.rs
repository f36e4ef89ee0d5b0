// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! One client connection, one build session.
//!
//! The session runs two I/O tasks over the shared stream: a reader
//! delivering decoded frames to the session loop, and a writer draining an
//! outbound queue. A writer idle for the keep-alive period sends
//! `KeepAlive`; a reader silent past the dead-peer timeout abandons the
//! session. Per-message writes are atomic — frames are encoded whole and
//! written with one `write_all`.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use kiln_wire::{read_message, write_message, BuildRequest, Message, WireError};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite, BufReader, BufWriter};
use tokio::sync::{mpsc, OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::dispatch::DispatchQueue;
use crate::engine::BuildEngine;
use crate::resume;

/// Timing knobs for one session.
#[derive(Debug, Clone, Copy)]
pub struct SessionConfig {
    /// Idle writer fills silence with `KeepAlive` this often.
    pub keep_alive: Duration,
    /// Reader silence past this abandons the session.
    pub idle_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            keep_alive: Duration::from_secs(1),
            idle_timeout: Duration::from_secs(10),
        }
    }
}

impl SessionConfig {
    pub fn from_env() -> Self {
        Self {
            keep_alive: crate::env::keep_alive(),
            idle_timeout: crate::env::idle_timeout(),
        }
    }
}

/// Errors from serving one connection.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error(transparent)]
    Wire(#[from] WireError),
}

/// Admits one live build at a time across every client session. The
/// engine is resident and single-build; a request arriving while another
/// build runs queues behind it instead of running concurrently.
#[derive(Clone)]
pub struct BuildGate {
    permits: Arc<Semaphore>,
}

impl BuildGate {
    pub fn new() -> Self {
        Self {
            permits: Arc::new(Semaphore::new(1)),
        }
    }

    async fn admit(&self) -> Option<OwnedSemaphorePermit> {
        Arc::clone(&self.permits).acquire_owned().await.ok()
    }
}

impl Default for BuildGate {
    fn default() -> Self {
        Self::new()
    }
}

/// Serve one client until the channel closes or the peer goes silent.
/// `gate` is shared by every session of one daemon so builds serialize.
pub async fn serve<R, W>(
    reader: R,
    writer: W,
    engine: Arc<dyn BuildEngine>,
    gate: BuildGate,
    config: SessionConfig,
) -> Result<(), ConnectionError>
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (outbound_tx, outbound_rx) = mpsc::channel::<Message>(256);
    let writer_task = tokio::spawn(write_loop(BufWriter::new(writer), outbound_rx, config.keep_alive));

    let cancel = CancellationToken::new();
    let (commands_tx, commands_rx) = mpsc::channel::<Message>(16);
    let mut commands_rx = Some(commands_rx);
    let mut build_task = None;

    let mut reader = BufReader::new(reader);
    let result = loop {
        let frame = tokio::select! {
            frame = read_message(&mut reader) => frame,
            _ = tokio::time::sleep(config.idle_timeout) => {
                warn!("peer silent past the dead-peer timeout, abandoning session");
                break Ok(());
            }
        };
        let message = match frame {
            Ok(Some(message)) => message,
            Ok(None) => {
                debug!("peer closed the channel");
                break Ok(());
            }
            Err(e) => break Err(ConnectionError::Wire(e)),
        };
        match message {
            Message::BuildRequest(request) => {
                let Some(commands) = commands_rx.take() else {
                    warn!("second build request on one session, ignoring");
                    continue;
                };
                info!(args = ?request.args, "build requested");
                build_task = Some(spawn_build(
                    Arc::clone(&engine),
                    request,
                    outbound_tx.clone(),
                    commands,
                    cancel.clone(),
                    gate.clone(),
                ));
            }
            Message::CancelBuild => {
                info!("build canceled by client");
                cancel.cancel();
            }
            Message::PromptResponse { .. } | Message::InputData { .. } => {
                let _ = commands_tx.send(message).await;
            }
            Message::Stop => {
                // The peer keeps draining until we close; finish the build
                // forwarder, then drop our sender so the writer can end.
                debug!("stop requested");
                break Ok(());
            }
            Message::KeepAlive => {}
            other => {
                warn!(tag = other.tag(), "unexpected frame from client");
            }
        }
    };

    // Interrupt any build still running, then let the writer drain.
    cancel.cancel();
    if let Some(task) = build_task {
        let _ = task.await;
    }
    drop(outbound_tx);
    match writer_task.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => debug!("writer ended: {e}"),
        Err(e) => debug!("writer task aborted: {e}"),
    }
    result
}

/// Drain the outbound queue; fill idle gaps with `KeepAlive`.
async fn write_loop<W: AsyncWrite + Unpin>(
    mut writer: BufWriter<W>,
    mut outbound: mpsc::Receiver<Message>,
    keep_alive: Duration,
) -> Result<(), WireError> {
    use tokio::io::AsyncWriteExt;
    loop {
        tokio::select! {
            message = outbound.recv() => {
                let Some(message) = message else {
                    writer.flush().await?;
                    return Ok(());
                };
                write_message(&mut writer, &message).await?;
                while let Ok(more) = outbound.try_recv() {
                    write_message(&mut writer, &more).await?;
                }
                writer.flush().await?;
            }
            _ = tokio::time::sleep(keep_alive) => {
                write_message(&mut writer, &Message::KeepAlive).await?;
                writer.flush().await?;
            }
        }
    }
}

fn spawn_build(
    engine: Arc<dyn BuildEngine>,
    mut request: BuildRequest,
    outbound: mpsc::Sender<Message>,
    commands: mpsc::Receiver<Message>,
    cancel: CancellationToken,
    gate: BuildGate,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        // Queue here while another session's build runs; the permit is
        // held until this task ends. A session canceled while queued
        // gives up its place instead of waiting out the running build.
        let permit = tokio::select! {
            permit = gate.admit() => permit,
            _ = cancel.cancelled() => None,
        };
        let Some(_permit) = permit else {
            return;
        };

        let root = output_root(&request);
        resume::apply(&mut request, &root);

        let (events_tx, events_rx) = mpsc::channel::<Message>(256);
        let forwarder = tokio::spawn(forward_events(events_rx, outbound.clone()));

        match engine.run(request, events_tx, commands, cancel).await {
            Ok(outcome) => {
                if outcome.exit_code == 0 {
                    resume::remove(&root);
                } else {
                    resume::persist(&root, &outcome.remaining_projects);
                }
            }
            Err(e) => {
                warn!("engine failed: {e}");
                let _ = outbound
                    .send(Message::BuildException {
                        message: e.to_string(),
                        class_name: String::new(),
                        stack_trace: String::new(),
                    })
                    .await;
            }
        }
        let _ = forwarder.await;
    })
}

/// Forward engine events to the writer, replaying each buffered batch in
/// canonical order. Status updates bypass the batch queue — they replace
/// each other and are never part of the ordered replay.
async fn forward_events(mut events: mpsc::Receiver<Message>, outbound: mpsc::Sender<Message>) {
    let queue = DispatchQueue::new();
    while let Some(first) = events.recv().await {
        enqueue_or_send(&queue, first, &outbound).await;
        while let Ok(more) = events.try_recv() {
            enqueue_or_send(&queue, more, &outbound).await;
        }
        for message in queue.drain() {
            if outbound.send(message).await.is_err() {
                return;
            }
        }
    }
}

async fn enqueue_or_send(queue: &DispatchQueue, message: Message, outbound: &mpsc::Sender<Message>) {
    if matches!(message, Message::BuildStatus { .. }) {
        let _ = outbound.send(message).await;
    } else {
        queue.enqueue(message);
    }
}

fn output_root(request: &BuildRequest) -> PathBuf {
    Path::new(&request.project_dir).join("target")
}

#[cfg(test)]
#[path = "connection_tests.rs"]
mod tests;
