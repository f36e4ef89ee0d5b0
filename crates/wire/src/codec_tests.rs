// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Codec tests: framing, round-trips, and decode failure modes.

use indexmap::IndexMap;
use proptest::prelude::*;

use super::*;
use crate::message::{BuildRequest, ExecutionFailure, MojoStarted, Prompt, TransferEvent};
use crate::REQUEST_PUT;

async fn round_trip(message: Message) -> Message {
    let mut cursor = std::io::Cursor::new(encode(&message));
    read_message(&mut cursor)
        .await
        .expect("decode failed")
        .expect("unexpected end of stream")
}

fn all_messages() -> Vec<Message> {
    let transfer = TransferEvent {
        project_id: "core".into(),
        request_type: REQUEST_PUT,
        repository_id: "central".into(),
        repository_url: "https://repo.example.org/releases".into(),
        resource_name: "org/foo/bar/1.0/bar-1.0.jar".into(),
        content_length: 4096,
        transferred_bytes: 1024,
        exception: Some("checksum mismatch".into()),
    };
    let mut env = IndexMap::new();
    env.insert("PATH".to_string(), "/usr/bin".to_string());
    env.insert("LANG".to_string(), "en_US.UTF-8".to_string());
    env.insert("HOME".to_string(), "/home/u".to_string());
    vec![
        Message::BuildRequest(BuildRequest {
            args: vec!["clean".into(), "install".into(), "-DskipTests".into()],
            working_dir: "/work/app".into(),
            project_dir: "/work/app".into(),
            env,
        }),
        Message::BuildStarted {
            project_id: "app".into(),
            project_count: 12,
            max_threads: 4,
            artifact_id_display_length: 20,
        },
        Message::BuildFinished { exit_code: 1 },
        Message::ProjectStarted { project_id: "app-core".into() },
        Message::ProjectStopped { project_id: "app-core".into() },
        Message::MojoStarted(MojoStarted {
            artifact_id: "app-core".into(),
            plugin_group_id: "org.apache.maven.plugins".into(),
            plugin_artifact_id: "maven-compiler-plugin".into(),
            plugin_goal_prefix: "compiler".into(),
            plugin_version: "3.11.0".into(),
            mojo: "compile".into(),
            execution_id: "default-compile".into(),
        }),
        Message::ProjectLogMessage { project_id: "app-core".into(), message: "compiling".into() },
        Message::BuildLogMessage { message: "scanning for projects".into() },
        Message::BuildException {
            message: "boom".into(),
            class_name: "org.apache.maven.InternalErrorException".into(),
            stack_trace: "at org.apache.maven...".into(),
        },
        Message::KeepAlive,
        Message::Stop,
        Message::Display { project_id: "app-core".into(), message: "hello".into() },
        Message::Prompt(Prompt {
            project_id: "app-core".into(),
            uid: "p1".into(),
            message: "Password:".into(),
            password: true,
        }),
        Message::PromptResponse {
            project_id: "app-core".into(),
            uid: "p1".into(),
            message: "secret".into(),
        },
        Message::BuildStatus { message: "Sorting projects".into() },
        Message::KeyboardInput { key: '\u{2}' },
        Message::CancelBuild,
        Message::TransferInitiated(transfer.clone()),
        Message::TransferStarted(transfer.clone()),
        Message::TransferProgressed(TransferEvent { exception: None, ..transfer.clone() }),
        Message::TransferCorrupted(transfer.clone()),
        Message::TransferSucceeded(transfer.clone()),
        Message::TransferFailed(transfer),
        Message::ExecutionFailure(ExecutionFailure {
            project_id: "app-core".into(),
            halted: true,
            exception: Some("LifecycleExecutionException".into()),
        }),
        Message::PrintOut { message: "out".into() },
        Message::PrintErr { message: "err".into() },
        Message::RequestInput { project_id: "app-core".into(), bytes_to_read: 512 },
        Message::InputData { data: Some("typed".into()) },
        Message::InputData { data: None },
    ]
}

#[tokio::test]
async fn every_variant_round_trips() {
    for message in all_messages() {
        assert_eq!(round_trip(message.clone()).await, message);
    }
}

#[tokio::test]
async fn frames_concatenate_without_separators() {
    let messages = all_messages();
    let mut stream = Vec::new();
    for message in &messages {
        stream.extend_from_slice(&encode(message));
    }
    let mut cursor = std::io::Cursor::new(stream);
    for expected in &messages {
        let decoded = read_message(&mut cursor).await.unwrap().unwrap();
        assert_eq!(&decoded, expected);
    }
    assert!(read_message(&mut cursor).await.unwrap().is_none());
}

#[test]
fn null_string_is_minus_one_with_no_body() {
    let bytes = encode(&Message::InputData { data: None });
    assert_eq!(bytes, [28, 0xFF, 0xFF, 0xFF, 0xFF]);
}

#[test]
fn control_messages_are_bare_tags() {
    assert_eq!(encode(&Message::KeepAlive), [10]);
    assert_eq!(encode(&Message::Stop), [11]);
    assert_eq!(encode(&Message::CancelBuild), [17]);
}

#[test]
fn string_length_field_counts_utf16_units() {
    // "a NUL beta CJK" has 4 units but an 8-byte body
    let message = Message::BuildLogMessage { message: "a\u{0}\u{3B2}\u{4E2D}".into() };
    let bytes = encode(&message);
    assert_eq!(bytes[0], message.tag());
    assert_eq!(&bytes[1..5], &[0, 0, 0, 4]);
    assert_eq!(&bytes[5..], &[0x61, 0xC0, 0x80, 0xCE, 0xB2, 0xE4, 0xB8, 0xAD]);
}

#[tokio::test]
async fn env_map_preserves_insertion_order() {
    let mut env = IndexMap::new();
    for key in ["ZULU", "ALPHA", "MIKE"] {
        env.insert(key.to_string(), "1".to_string());
    }
    let decoded = round_trip(Message::BuildRequest(BuildRequest {
        args: vec![],
        working_dir: String::new(),
        project_dir: String::new(),
        env,
    }))
    .await;
    let Message::BuildRequest(request) = decoded else {
        panic!("wrong variant");
    };
    let keys: Vec<&str> = request.env.keys().map(String::as_str).collect();
    assert_eq!(keys, ["ZULU", "ALPHA", "MIKE"]);
}

#[tokio::test]
async fn clean_eof_yields_none() {
    let mut cursor = std::io::Cursor::new(Vec::<u8>::new());
    assert!(read_message(&mut cursor).await.unwrap().is_none());
}

#[tokio::test]
async fn unknown_tag_fails() {
    let mut cursor = std::io::Cursor::new(vec![29u8]);
    match read_message(&mut cursor).await {
        Err(WireError::UnknownTag(29)) => {}
        other => panic!("expected UnknownTag, got {:?}", other),
    }
}

#[tokio::test]
async fn truncated_frame_is_unexpected_eof() {
    let mut bytes = encode(&Message::BuildLogMessage { message: "hello".into() });
    bytes.truncate(bytes.len() - 2);
    let mut cursor = std::io::Cursor::new(bytes);
    match read_message(&mut cursor).await {
        Err(WireError::UnexpectedEof) => {}
        other => panic!("expected UnexpectedEof, got {:?}", other),
    }
}

#[tokio::test]
async fn bad_leading_byte_is_malformed() {
    // length 1, then a lone continuation byte
    let mut cursor = std::io::Cursor::new(vec![8u8, 0, 0, 0, 1, 0x80]);
    match read_message(&mut cursor).await {
        Err(WireError::Malformed(_)) => {}
        other => panic!("expected Malformed, got {:?}", other),
    }
}

#[tokio::test]
async fn bad_continuation_byte_is_malformed() {
    // 2-byte form whose continuation lacks the 10xxxxxx prefix
    let mut cursor = std::io::Cursor::new(vec![8u8, 0, 0, 0, 1, 0xC3, 0x41]);
    match read_message(&mut cursor).await {
        Err(WireError::Malformed(_)) => {}
        other => panic!("expected Malformed, got {:?}", other),
    }
}

#[tokio::test]
async fn bad_boolean_byte_is_malformed() {
    // Prompt with password byte out of range
    let mut bytes = encode(&Message::Prompt(Prompt {
        project_id: "p".into(),
        uid: "u".into(),
        message: "m".into(),
        password: false,
    }));
    let last = bytes.len() - 1;
    bytes[last] = 2;
    let mut cursor = std::io::Cursor::new(bytes);
    match read_message(&mut cursor).await {
        Err(WireError::Malformed(_)) => {}
        other => panic!("expected Malformed, got {:?}", other),
    }
}

#[tokio::test]
async fn multi_character_keystroke_is_malformed() {
    let mut bytes = vec![16u8, 0, 0, 0, 2];
    bytes.extend_from_slice(b"ab");
    let mut cursor = std::io::Cursor::new(bytes);
    match read_message(&mut cursor).await {
        Err(WireError::Malformed(_)) => {}
        other => panic!("expected Malformed, got {:?}", other),
    }
}

proptest! {
    #[test]
    fn arbitrary_strings_round_trip(message in "\\PC*") {
        let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let decoded = rt.block_on(round_trip(Message::BuildLogMessage { message: message.clone() }));
        prop_assert_eq!(decoded, Message::BuildLogMessage { message });
    }

    #[test]
    fn arbitrary_transfer_counters_round_trip(
        content_length in -1i64..=i64::MAX,
        transferred in -1i64..=i64::MAX,
    ) {
        let transferred_bytes = if content_length >= 0 && transferred >= 0 {
            transferred.min(content_length)
        } else {
            transferred
        };
        let event = TransferEvent {
            project_id: String::new(),
            request_type: 0,
            repository_id: String::new(),
            repository_url: String::new(),
            resource_name: String::new(),
            content_length,
            transferred_bytes,
            exception: None,
        };
        let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let decoded = rt.block_on(round_trip(Message::TransferProgressed(event.clone())));
        prop_assert_eq!(decoded, Message::TransferProgressed(event));
    }
}
