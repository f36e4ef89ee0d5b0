// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use kiln_wire::REQUEST_GET;

fn transfer(project_id: &str, resource: &str, transferred: i64) -> TransferEvent {
    TransferEvent {
        project_id: project_id.to_string(),
        request_type: REQUEST_GET,
        repository_id: "central".into(),
        repository_url: "https://repo.example.org".into(),
        resource_name: resource.to_string(),
        content_length: 1000,
        transferred_bytes: transferred,
        exception: None,
    }
}

#[test]
fn project_mut_finds_or_creates() {
    let mut state = RenderState::default();
    state.project_mut("a").running_execution = None;
    assert_eq!(state.projects.len(), 1);
    state.project_mut("a");
    assert_eq!(state.projects.len(), 1);
    state.project_mut("b");
    assert_eq!(state.projects.len(), 2);
}

#[test]
fn project_log_keeps_only_the_tail() {
    let mut project = Project::new("a".into());
    for i in 0..150 {
        project.push_log(format!("line {i}"));
    }
    let lines: Vec<&str> = project.log_lines().collect();
    assert_eq!(lines.len(), 100);
    assert_eq!(lines[0], "line 50");
    assert_eq!(lines[99], "line 149");
}

#[test]
fn progress_replaces_rather_than_appends() {
    let mut state = RenderState::default();
    state.apply_transfer(&Message::TransferStarted(transfer("", "org/foo/a.jar", 0)));
    state.apply_transfer(&Message::TransferProgressed(transfer("", "org/foo/a.jar", 100)));
    state.apply_transfer(&Message::TransferProgressed(transfer("", "org/foo/a.jar", 500)));

    let global = state.transfers.get("").unwrap();
    assert_eq!(global.len(), 1);
    assert_eq!(global.get("org/foo/a.jar").unwrap().transferred_bytes, 500);
}

#[test]
fn terminal_transfer_events_remove_the_entry() {
    let mut state = RenderState::default();
    state.apply_transfer(&Message::TransferStarted(transfer("core", "org/foo/a.jar", 0)));
    state.apply_transfer(&Message::TransferSucceeded(transfer("core", "org/foo/a.jar", 1000)));
    assert!(state.transfers.is_empty());

    state.apply_transfer(&Message::TransferInitiated(transfer("core", "org/foo/b.jar", 0)));
    state.apply_transfer(&Message::TransferFailed(transfer("core", "org/foo/b.jar", -1)));
    assert!(state.transfers.is_empty());

    state.apply_transfer(&Message::TransferStarted(transfer("core", "org/foo/c.jar", 0)));
    state.apply_transfer(&Message::TransferCorrupted(transfer("core", "org/foo/c.jar", -1)));
    assert!(state.transfers.is_empty());
}

#[test]
fn empty_project_id_is_the_global_sentinel() {
    let mut state = RenderState::default();
    state.apply_transfer(&Message::TransferStarted(transfer("", "org/foo/a.jar", 0)));
    assert!(state.transfers.contains_key(""));
    assert!(state.project_transfer("").is_some());
    assert!(state.project_transfer("core").is_none());
}

#[test]
fn distinct_resources_accumulate() {
    let mut state = RenderState::default();
    state.apply_transfer(&Message::TransferStarted(transfer("", "org/foo/a.jar", 0)));
    state.apply_transfer(&Message::TransferStarted(transfer("", "org/foo/b.jar", 0)));
    assert_eq!(state.transfers.get("").unwrap().len(), 2);
}
