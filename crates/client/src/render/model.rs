// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory state the render loop owns: projects, transfers, failures.
//!
//! Every field here is touched only by the render task.

use std::collections::VecDeque;

use indexmap::IndexMap;
use kiln_wire::{ExecutionFailure, Message, MojoStarted, TransferEvent};

/// Pending display lines kept per active project. The window only ever
/// shows the tail, so a chatty plugin cannot grow memory unboundedly.
const PROJECT_LOG_CAP: usize = 100;

/// One active project: identity, the running plugin goal, and its pending
/// log tail.
#[derive(Debug)]
pub struct Project {
    pub id: String,
    pub running_execution: Option<MojoStarted>,
    log: VecDeque<String>,
}

impl Project {
    pub fn new(id: String) -> Self {
        Self {
            id,
            running_execution: None,
            log: VecDeque::new(),
        }
    }

    pub fn push_log(&mut self, line: String) {
        if self.log.len() == PROJECT_LOG_CAP {
            self.log.pop_front();
        }
        self.log.push_back(line);
    }

    pub fn log_lines(&self) -> impl Iterator<Item = &str> {
        self.log.iter().map(String::as_str)
    }

    pub fn drain_log(&mut self) -> impl Iterator<Item = String> + '_ {
        self.log.drain(..)
    }
}

/// Everything the layout needs to compose a frame.
#[derive(Default)]
pub struct RenderState {
    /// Top-level project id from `BuildStarted`; `Some` while a build is
    /// active.
    pub name: Option<String>,
    pub daemon_id: String,
    pub total_projects: i32,
    pub max_threads: i32,
    pub artifact_id_width: usize,
    pub done_projects: usize,
    pub lines_per_project: usize,
    pub display_done: bool,
    pub no_buffering: bool,
    pub build_status: Option<String>,
    /// Active projects in start order; overflow omits the earliest.
    pub projects: IndexMap<String, Project>,
    /// `project id → resource name → latest transfer event`. The empty
    /// project id is the "no project" sentinel.
    pub transfers: IndexMap<String, IndexMap<String, TransferEvent>>,
    /// Arrival-ordered; never pruned during a build.
    pub failures: Vec<ExecutionFailure>,
}

impl RenderState {
    pub fn build_active(&self) -> bool {
        self.name.is_some()
    }

    pub fn project_mut(&mut self, id: &str) -> &mut Project {
        self.projects
            .entry(id.to_string())
            .or_insert_with(|| Project::new(id.to_string()))
    }

    /// Apply one of the six transfer variants to the transfer table.
    pub fn apply_transfer(&mut self, message: &Message) {
        let Some(event) = message.transfer() else {
            return;
        };
        match message {
            Message::TransferInitiated(_)
            | Message::TransferStarted(_)
            | Message::TransferProgressed(_) => {
                self.transfers
                    .entry(event.project_id.clone())
                    .or_default()
                    .insert(event.resource_name.clone(), event.clone());
            }
            _ => {
                if let Some(per_project) = self.transfers.get_mut(&event.project_id) {
                    per_project.shift_remove(&event.resource_name);
                    if per_project.is_empty() {
                        self.transfers.shift_remove(&event.project_id);
                    }
                }
            }
        }
    }

    /// The transfer shown beside a project line, if any.
    pub fn project_transfer(&self, project_id: &str) -> Option<&TransferEvent> {
        self.transfers
            .get(project_id)
            .and_then(|per_project| per_project.values().next())
    }
}

#[cfg(test)]
#[path = "model_tests.rs"]
mod tests;
