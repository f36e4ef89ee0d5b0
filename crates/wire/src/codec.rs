// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Frame encoding and decoding.
//!
//! `encode` renders a whole frame into an owned buffer so the transport can
//! keep per-message writes atomic with a single `write_all`. Decoding reads
//! field-by-field from an async stream; wrap the raw stream in a
//! `BufReader` — string decoding consumes the stream one code unit at a
//! time.

use indexmap::IndexMap;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::message::{
    BuildRequest, ExecutionFailure, Message, MojoStarted, Prompt, TransferEvent,
};
use crate::mutf8;

/// Errors from frame decoding and transport I/O.
#[derive(Debug, Error)]
pub enum WireError {
    #[error("unknown message tag {0}")]
    UnknownTag(u8),

    #[error("malformed frame: {0}")]
    Malformed(&'static str),

    #[error("unexpected end of stream")]
    UnexpectedEof,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Encode a full frame: tag byte plus payload.
pub fn encode(message: &Message) -> Vec<u8> {
    let mut buf = Vec::with_capacity(64);
    buf.push(message.tag());
    match message {
        Message::BuildRequest(r) => {
            put_str_list(&mut buf, &r.args);
            put_str(&mut buf, &r.working_dir);
            put_str(&mut buf, &r.project_dir);
            put_str_map(&mut buf, &r.env);
        }
        Message::BuildStarted {
            project_id,
            project_count,
            max_threads,
            artifact_id_display_length,
        } => {
            put_str(&mut buf, project_id);
            put_i32(&mut buf, *project_count);
            put_i32(&mut buf, *max_threads);
            put_i32(&mut buf, *artifact_id_display_length);
        }
        Message::BuildFinished { exit_code } => put_i32(&mut buf, *exit_code),
        Message::ProjectStarted { project_id } | Message::ProjectStopped { project_id } => {
            put_str(&mut buf, project_id);
        }
        Message::MojoStarted(m) => {
            put_str(&mut buf, &m.artifact_id);
            put_str(&mut buf, &m.plugin_group_id);
            put_str(&mut buf, &m.plugin_artifact_id);
            put_str(&mut buf, &m.plugin_goal_prefix);
            put_str(&mut buf, &m.plugin_version);
            put_str(&mut buf, &m.mojo);
            put_str(&mut buf, &m.execution_id);
        }
        Message::ProjectLogMessage { project_id, message }
        | Message::Display { project_id, message } => {
            put_str(&mut buf, project_id);
            put_str(&mut buf, message);
        }
        Message::BuildLogMessage { message }
        | Message::BuildStatus { message }
        | Message::PrintOut { message }
        | Message::PrintErr { message } => put_str(&mut buf, message),
        Message::BuildException { message, class_name, stack_trace } => {
            put_str(&mut buf, message);
            put_str(&mut buf, class_name);
            put_str(&mut buf, stack_trace);
        }
        Message::KeepAlive | Message::Stop | Message::CancelBuild => {}
        Message::Prompt(p) => {
            put_str(&mut buf, &p.project_id);
            put_str(&mut buf, &p.uid);
            put_str(&mut buf, &p.message);
            put_bool(&mut buf, p.password);
        }
        Message::PromptResponse { project_id, uid, message } => {
            put_str(&mut buf, project_id);
            put_str(&mut buf, uid);
            put_str(&mut buf, message);
        }
        Message::KeyboardInput { key } => {
            let mut s = String::new();
            s.push(*key);
            put_str(&mut buf, &s);
        }
        Message::TransferInitiated(t)
        | Message::TransferStarted(t)
        | Message::TransferProgressed(t)
        | Message::TransferCorrupted(t)
        | Message::TransferSucceeded(t)
        | Message::TransferFailed(t) => {
            put_str(&mut buf, &t.project_id);
            buf.push(t.request_type);
            put_str(&mut buf, &t.repository_id);
            put_str(&mut buf, &t.repository_url);
            put_str(&mut buf, &t.resource_name);
            put_i64(&mut buf, t.content_length);
            put_i64(&mut buf, t.transferred_bytes);
            put_opt_str(&mut buf, t.exception.as_deref());
        }
        Message::ExecutionFailure(f) => {
            put_str(&mut buf, &f.project_id);
            put_bool(&mut buf, f.halted);
            put_opt_str(&mut buf, f.exception.as_deref());
        }
        Message::RequestInput { project_id, bytes_to_read } => {
            put_str(&mut buf, project_id);
            put_i32(&mut buf, *bytes_to_read);
        }
        Message::InputData { data } => put_opt_str(&mut buf, data.as_deref()),
    }
    buf
}

/// Write one frame. The encoded frame goes out in a single `write_all`; the
/// caller flushes after draining its queue.
pub async fn write_message<W: AsyncWrite + Unpin>(
    writer: &mut W,
    message: &Message,
) -> Result<(), WireError> {
    writer.write_all(&encode(message)).await?;
    Ok(())
}

/// Read one frame. `Ok(None)` means the peer closed the stream at a frame
/// boundary; EOF anywhere inside a frame is [`WireError::UnexpectedEof`].
pub async fn read_message<R: AsyncRead + Unpin>(
    reader: &mut R,
) -> Result<Option<Message>, WireError> {
    let mut tag = [0u8; 1];
    if reader.read(&mut tag).await? == 0 {
        return Ok(None);
    }
    read_payload(reader, tag[0]).await.map(Some)
}

async fn read_payload<R: AsyncRead + Unpin>(
    reader: &mut R,
    tag: u8,
) -> Result<Message, WireError> {
    let message = match tag {
        1 => Message::BuildRequest(BuildRequest {
            args: read_str_list(reader).await?,
            working_dir: read_str(reader).await?,
            project_dir: read_str(reader).await?,
            env: read_str_map(reader).await?,
        }),
        2 => Message::BuildStarted {
            project_id: read_str(reader).await?,
            project_count: read_i32(reader).await?,
            max_threads: read_i32(reader).await?,
            artifact_id_display_length: read_i32(reader).await?,
        },
        3 => Message::BuildFinished { exit_code: read_i32(reader).await? },
        4 => Message::ProjectStarted { project_id: read_str(reader).await? },
        5 => Message::ProjectStopped { project_id: read_str(reader).await? },
        6 => Message::MojoStarted(MojoStarted {
            artifact_id: read_str(reader).await?,
            plugin_group_id: read_str(reader).await?,
            plugin_artifact_id: read_str(reader).await?,
            plugin_goal_prefix: read_str(reader).await?,
            plugin_version: read_str(reader).await?,
            mojo: read_str(reader).await?,
            execution_id: read_str(reader).await?,
        }),
        7 => Message::ProjectLogMessage {
            project_id: read_str(reader).await?,
            message: read_str(reader).await?,
        },
        8 => Message::BuildLogMessage { message: read_str(reader).await? },
        9 => Message::BuildException {
            message: read_str(reader).await?,
            class_name: read_str(reader).await?,
            stack_trace: read_str(reader).await?,
        },
        10 => Message::KeepAlive,
        11 => Message::Stop,
        12 => Message::Display {
            project_id: read_str(reader).await?,
            message: read_str(reader).await?,
        },
        13 => Message::Prompt(Prompt {
            project_id: read_str(reader).await?,
            uid: read_str(reader).await?,
            message: read_str(reader).await?,
            password: read_bool(reader).await?,
        }),
        14 => Message::PromptResponse {
            project_id: read_str(reader).await?,
            uid: read_str(reader).await?,
            message: read_str(reader).await?,
        },
        15 => Message::BuildStatus { message: read_str(reader).await? },
        16 => {
            let s = read_str(reader).await?;
            let mut chars = s.chars();
            match (chars.next(), chars.next()) {
                (Some(key), None) => Message::KeyboardInput { key },
                _ => return Err(WireError::Malformed("keystroke must be one character")),
            }
        }
        17 => Message::CancelBuild,
        18..=23 => {
            let transfer = TransferEvent {
                project_id: read_str(reader).await?,
                request_type: read_u8(reader).await?,
                repository_id: read_str(reader).await?,
                repository_url: read_str(reader).await?,
                resource_name: read_str(reader).await?,
                content_length: read_i64(reader).await?,
                transferred_bytes: read_i64(reader).await?,
                exception: read_opt_str(reader).await?,
            };
            match tag {
                18 => Message::TransferInitiated(transfer),
                19 => Message::TransferStarted(transfer),
                20 => Message::TransferProgressed(transfer),
                21 => Message::TransferCorrupted(transfer),
                22 => Message::TransferSucceeded(transfer),
                _ => Message::TransferFailed(transfer),
            }
        }
        24 => Message::ExecutionFailure(ExecutionFailure {
            project_id: read_str(reader).await?,
            halted: read_bool(reader).await?,
            exception: read_opt_str(reader).await?,
        }),
        25 => Message::PrintOut { message: read_str(reader).await? },
        26 => Message::PrintErr { message: read_str(reader).await? },
        27 => Message::RequestInput {
            project_id: read_str(reader).await?,
            bytes_to_read: read_i32(reader).await?,
        },
        28 => Message::InputData { data: read_opt_str(reader).await? },
        other => return Err(WireError::UnknownTag(other)),
    };
    Ok(message)
}

// --- encode helpers ---

fn put_i32(buf: &mut Vec<u8>, v: i32) {
    buf.extend_from_slice(&v.to_be_bytes());
}

fn put_i64(buf: &mut Vec<u8>, v: i64) {
    buf.extend_from_slice(&v.to_be_bytes());
}

fn put_bool(buf: &mut Vec<u8>, v: bool) {
    buf.push(v as u8);
}

fn put_str(buf: &mut Vec<u8>, s: &str) {
    put_i32(buf, mutf8::unit_count(s) as i32);
    for unit in s.encode_utf16() {
        mutf8::push_unit(buf, unit);
    }
}

fn put_opt_str(buf: &mut Vec<u8>, s: Option<&str>) {
    match s {
        Some(s) => put_str(buf, s),
        None => put_i32(buf, -1),
    }
}

fn put_str_list(buf: &mut Vec<u8>, items: &[String]) {
    put_i32(buf, items.len() as i32);
    for item in items {
        put_str(buf, item);
    }
}

fn put_str_map(buf: &mut Vec<u8>, map: &IndexMap<String, String>) {
    put_i32(buf, map.len() as i32);
    for (key, value) in map {
        put_str(buf, key);
        put_str(buf, value);
    }
}

// --- decode helpers ---

fn eof(e: std::io::Error) -> WireError {
    if e.kind() == std::io::ErrorKind::UnexpectedEof {
        WireError::UnexpectedEof
    } else {
        WireError::Io(e)
    }
}

async fn read_u8<R: AsyncRead + Unpin>(reader: &mut R) -> Result<u8, WireError> {
    reader.read_u8().await.map_err(eof)
}

async fn read_i32<R: AsyncRead + Unpin>(reader: &mut R) -> Result<i32, WireError> {
    reader.read_i32().await.map_err(eof)
}

async fn read_i64<R: AsyncRead + Unpin>(reader: &mut R) -> Result<i64, WireError> {
    reader.read_i64().await.map_err(eof)
}

async fn read_bool<R: AsyncRead + Unpin>(reader: &mut R) -> Result<bool, WireError> {
    match read_u8(reader).await? {
        0 => Ok(false),
        1 => Ok(true),
        _ => Err(WireError::Malformed("boolean byte out of range")),
    }
}

async fn read_str<R: AsyncRead + Unpin>(reader: &mut R) -> Result<String, WireError> {
    read_opt_str(reader)
        .await?
        .ok_or(WireError::Malformed("null string in non-null field"))
}

async fn read_opt_str<R: AsyncRead + Unpin>(
    reader: &mut R,
) -> Result<Option<String>, WireError> {
    let units = read_i32(reader).await?;
    if units < 0 {
        return Ok(None);
    }
    let mut decoded = Vec::with_capacity(units.min(4096) as usize);
    let mut continuation = [0u8; 2];
    for _ in 0..units {
        let leading = read_u8(reader).await?;
        let count = mutf8::continuation_count(leading)
            .ok_or(WireError::Malformed("bad leading byte"))?;
        reader.read_exact(&mut continuation[..count]).await.map_err(eof)?;
        let unit = mutf8::assemble(leading, &continuation[..count])
            .ok_or(WireError::Malformed("bad continuation byte"))?;
        decoded.push(unit);
    }
    String::from_utf16(&decoded)
        .map(Some)
        .map_err(|_| WireError::Malformed("unpaired surrogate"))
}

async fn read_str_list<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Vec<String>, WireError> {
    let count = read_i32(reader).await?;
    if count < 0 {
        return Err(WireError::Malformed("negative list length"));
    }
    let mut items = Vec::with_capacity(count.min(1024) as usize);
    for _ in 0..count {
        items.push(read_str(reader).await?);
    }
    Ok(items)
}

async fn read_str_map<R: AsyncRead + Unpin>(
    reader: &mut R,
) -> Result<IndexMap<String, String>, WireError> {
    let count = read_i32(reader).await?;
    if count < 0 {
        return Err(WireError::Malformed("negative map length"));
    }
    let mut map = IndexMap::with_capacity(count.min(1024) as usize);
    for _ in 0..count {
        let key = read_str(reader).await?;
        let value = read_str(reader).await?;
        map.insert(key, value);
    }
    Ok(map)
}

#[cfg(test)]
#[path = "codec_tests.rs"]
mod tests;
