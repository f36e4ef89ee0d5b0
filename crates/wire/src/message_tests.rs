// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn transfer() -> TransferEvent {
    TransferEvent {
        project_id: "core".into(),
        request_type: REQUEST_GET,
        repository_id: "central".into(),
        repository_url: "https://repo.example.org".into(),
        resource_name: "org/foo/bar/1.0/bar-1.0.jar".into(),
        content_length: 100,
        transferred_bytes: 42,
        exception: None,
    }
}

#[yare::parameterized(
    build_request = { Message::BuildRequest(BuildRequest {
        args: vec![], working_dir: String::new(), project_dir: String::new(),
        env: indexmap::IndexMap::new(),
    }), 1 },
    build_started = { Message::BuildStarted {
        project_id: String::new(), project_count: 0, max_threads: 0,
        artifact_id_display_length: 0,
    }, 2 },
    build_finished = { Message::BuildFinished { exit_code: 0 }, 3 },
    project_started = { Message::ProjectStarted { project_id: String::new() }, 4 },
    project_stopped = { Message::ProjectStopped { project_id: String::new() }, 5 },
    mojo_started = { Message::MojoStarted(MojoStarted {
        artifact_id: String::new(), plugin_group_id: String::new(),
        plugin_artifact_id: String::new(), plugin_goal_prefix: String::new(),
        plugin_version: String::new(), mojo: String::new(), execution_id: String::new(),
    }), 6 },
    project_log = { Message::ProjectLogMessage { project_id: String::new(), message: String::new() }, 7 },
    build_log = { Message::BuildLogMessage { message: String::new() }, 8 },
    build_exception = { Message::BuildException {
        message: String::new(), class_name: String::new(), stack_trace: String::new(),
    }, 9 },
    keep_alive = { Message::KeepAlive, 10 },
    stop = { Message::Stop, 11 },
    display = { Message::Display { project_id: String::new(), message: String::new() }, 12 },
    prompt = { Message::Prompt(Prompt {
        project_id: String::new(), uid: String::new(), message: String::new(), password: false,
    }), 13 },
    prompt_response = { Message::PromptResponse {
        project_id: String::new(), uid: String::new(), message: String::new(),
    }, 14 },
    build_status = { Message::BuildStatus { message: String::new() }, 15 },
    keyboard_input = { Message::KeyboardInput { key: '+' }, 16 },
    cancel_build = { Message::CancelBuild, 17 },
    transfer_initiated = { Message::TransferInitiated(transfer()), 18 },
    transfer_started = { Message::TransferStarted(transfer()), 19 },
    transfer_progressed = { Message::TransferProgressed(transfer()), 20 },
    transfer_corrupted = { Message::TransferCorrupted(transfer()), 21 },
    transfer_succeeded = { Message::TransferSucceeded(transfer()), 22 },
    transfer_failed = { Message::TransferFailed(transfer()), 23 },
    execution_failure = { Message::ExecutionFailure(ExecutionFailure {
        project_id: String::new(), halted: false, exception: None,
    }), 24 },
    print_out = { Message::PrintOut { message: String::new() }, 25 },
    print_err = { Message::PrintErr { message: String::new() }, 26 },
    request_input = { Message::RequestInput { project_id: String::new(), bytes_to_read: 0 }, 27 },
    input_data = { Message::InputData { data: None }, 28 },
)]
fn tags_match_the_wire_format(message: Message, tag: u8) {
    assert_eq!(message.tag(), tag);
}

#[test]
fn control_messages_are_structurally_equal() {
    assert_eq!(Message::KeepAlive, Message::KeepAlive.clone());
    assert_eq!(Message::Stop, Message::Stop.clone());
    assert_eq!(Message::CancelBuild, Message::CancelBuild.clone());
    assert_ne!(Message::Stop, Message::CancelBuild);
}

#[test]
fn transfer_accessor_covers_all_six_variants() {
    let t = transfer();
    for message in [
        Message::TransferInitiated(t.clone()),
        Message::TransferStarted(t.clone()),
        Message::TransferProgressed(t.clone()),
        Message::TransferCorrupted(t.clone()),
        Message::TransferSucceeded(t.clone()),
        Message::TransferFailed(t.clone()),
    ] {
        assert_eq!(message.transfer(), Some(&t));
    }
    assert_eq!(Message::KeepAlive.transfer(), None);
}

#[test]
fn sequence_numbers_increase_in_construction_order() {
    let a = Sequenced::new(Message::KeepAlive);
    let b = Sequenced::new(Message::KeepAlive);
    let c = Sequenced::new(Message::Stop);
    assert!(a.seq() < b.seq());
    assert!(b.seq() < c.seq());
}

#[test]
fn into_message_returns_the_payload() {
    let wrapped = Sequenced::new(Message::BuildFinished { exit_code: 7 });
    assert_eq!(wrapped.into_message(), Message::BuildFinished { exit_code: 7 });
}
