// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Client side of the session transport.
//!
//! Mirrors the daemon's connection handling: a reader task decodes frames
//! into the inbound queue the render loop consumes, and a writer task
//! drains the dispatch queue, filling idle gaps with `KeepAlive`. A dead
//! or broken connection is delivered to the render loop as a
//! `BuildException` so the normal termination path reports it.

use std::path::Path;
use std::time::Duration;

use kiln_wire::{read_message, write_message, Message, WireError};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, BufWriter};
use tokio::net::UnixStream;
use tokio::sync::mpsc;
use tracing::debug;

use crate::error::ClientError;

/// Timing knobs for the client transport.
#[derive(Debug, Clone, Copy)]
pub struct TransportConfig {
    pub keep_alive: Duration,
    pub idle_timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            keep_alive: Duration::from_secs(1),
            idle_timeout: Duration::from_secs(10),
        }
    }
}

impl TransportConfig {
    pub fn from_env() -> Self {
        Self {
            keep_alive: kiln_daemon::env::keep_alive(),
            idle_timeout: kiln_daemon::env::idle_timeout(),
        }
    }
}

/// A connected daemon session.
pub struct DaemonClient {
    /// Outbound queue toward the daemon.
    pub dispatch: mpsc::Sender<Message>,
    /// Injects messages into the render loop's inbound queue (used by the
    /// input thread and signal handlers).
    pub events: mpsc::Sender<Message>,
    /// Identity shown in the status line.
    pub daemon_id: String,
    writer: tokio::task::JoinHandle<()>,
}

impl DaemonClient {
    /// Send `Stop`, then give the writer a bounded moment to drain it.
    /// The writer flushes after every message, so the wait is usually
    /// instant; the timeout covers an input thread still holding its
    /// sender clone in a modal read.
    pub async fn shutdown(self) {
        let _ = self.dispatch.send(Message::Stop).await;
        drop(self.dispatch);
        let _ = tokio::time::timeout(Duration::from_secs(1), self.writer).await;
    }
}

/// Connect to the daemon socket and spawn the transport tasks. Returns
/// the client handle and the inbound queue for the render loop.
pub async fn connect(
    socket: &Path,
    config: TransportConfig,
) -> Result<(DaemonClient, mpsc::Receiver<Message>), ClientError> {
    let stream = UnixStream::connect(socket).await.map_err(|source| ClientError::Connect {
        path: socket.to_path_buf(),
        source,
    })?;
    let (read_half, write_half) = stream.into_split();

    let (inbound_tx, inbound_rx) = mpsc::channel::<Message>(256);
    let (outbound_tx, outbound_rx) = mpsc::channel::<Message>(256);

    tokio::spawn(read_loop(
        BufReader::new(read_half),
        inbound_tx.clone(),
        config.idle_timeout,
    ));
    let writer = tokio::spawn(write_loop(
        BufWriter::new(write_half),
        outbound_rx,
        config.keep_alive,
    ));

    let client = DaemonClient {
        dispatch: outbound_tx,
        events: inbound_tx,
        daemon_id: daemon_id_for(socket),
        writer,
    };
    Ok((client, inbound_rx))
}

/// The daemon's PID from the lock file next to the socket, or the socket
/// file stem when unavailable.
fn daemon_id_for(socket: &Path) -> String {
    let lock = socket.with_file_name("daemon.lock");
    if let Ok(pid) = std::fs::read_to_string(lock) {
        let pid = pid.trim();
        if !pid.is_empty() {
            return pid.to_string();
        }
    }
    socket
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "daemon".to_string())
}

async fn read_loop<R: AsyncRead + Unpin>(
    mut reader: R,
    inbound: mpsc::Sender<Message>,
    idle_timeout: Duration,
) {
    loop {
        let frame = tokio::select! {
            frame = read_message(&mut reader) => frame,
            _ = tokio::time::sleep(idle_timeout) => {
                deliver_failure(&inbound, "the daemon became unresponsive".to_string()).await;
                return;
            }
        };
        match frame {
            Ok(Some(message)) => {
                if inbound.send(message).await.is_err() {
                    return;
                }
            }
            Ok(None) => {
                // Normal after we sent Stop; fatal mid-build. The render
                // loop is gone in the former case, so the send is a no-op.
                deliver_failure(&inbound, "the daemon closed the connection".to_string()).await;
                return;
            }
            Err(e) => {
                deliver_failure(&inbound, e.to_string()).await;
                return;
            }
        }
    }
}

async fn deliver_failure(inbound: &mpsc::Sender<Message>, message: String) {
    let _ = inbound
        .send(Message::BuildException {
            message,
            class_name: String::new(),
            stack_trace: String::new(),
        })
        .await;
}

async fn write_loop<W: AsyncWrite + Unpin>(
    mut writer: BufWriter<W>,
    mut outbound: mpsc::Receiver<Message>,
    keep_alive: Duration,
) {
    if let Err(e) = write_all(&mut writer, &mut outbound, keep_alive).await {
        debug!("writer ended: {e}");
    }
}

async fn write_all<W: AsyncWrite + Unpin>(
    writer: &mut BufWriter<W>,
    outbound: &mut mpsc::Receiver<Message>,
    keep_alive: Duration,
) -> Result<(), WireError> {
    loop {
        tokio::select! {
            message = outbound.recv() => {
                let Some(message) = message else {
                    writer.flush().await?;
                    return Ok(());
                };
                write_message(writer, &message).await?;
                while let Ok(more) = outbound.try_recv() {
                    write_message(writer, &more).await?;
                }
                writer.flush().await?;
            }
            _ = tokio::time::sleep(keep_alive) => {
                write_message(writer, &Message::KeepAlive).await?;
                writer.flush().await?;
            }
        }
    }
}
