// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Frame composition.
//!
//! Stateless with respect to the previous frame: given the render state
//! and the terminal size, produce the full list of lines for the display
//! driver. The status line takes the last row; failure summary and global
//! transfer lines come first; active projects fill the middle with their
//! rolling log windows, omitting the earliest-started projects when space
//! runs out (surfaced as `hidden` in the status line).

use std::time::Duration;

use kiln_wire::{MojoStarted, TransferEvent, REQUEST_PUT};

use super::coords::maven_coords;
use super::model::RenderState;
use crate::color;

const LIFECYCLE_PREFIX: &str = "org.apache.maven.lifecycle.LifecycleExecutionException: ";

/// Compose a full frame of at most `rows` lines, each clipped to `cols`.
pub fn build_frame(state: &RenderState, rows: u16, cols: u16, elapsed: Duration) -> Vec<String> {
    let rows = rows as usize;
    let cols = cols as usize;
    let mut frame = Vec::new();
    let mut budget = rows.saturating_sub(1);

    if let Some(line) = failure_line(state, cols) {
        if budget > 0 {
            frame.push(line);
            budget -= 1;
        }
    }
    if let Some(line) = global_transfer_line(state) {
        if budget > 0 {
            frame.push(line);
            budget -= 1;
        }
    }

    let available = budget;
    let hidden = hidden_projects(state, available);
    for (_, project) in state.projects.iter().skip(hidden) {
        if budget == 0 {
            break;
        }
        frame.push(project_line(state, project));
        budget -= 1;

        let window = state.lines_per_project.min(budget);
        if window > 0 {
            let mut split = Vec::new();
            for line in project.log_lines() {
                split.extend(wrap(line, cols.saturating_sub(3)));
            }
            let take = window.min(split.len());
            for piece in &split[split.len() - take..] {
                frame.push(format!("   {piece}"));
                budget -= 1;
            }
        }
    }

    frame.push(status_line(state, hidden, elapsed));
    frame.iter().map(|line| clip(line, cols)).collect()
}

/// Projects that do not fit the available lines; the earliest-started are
/// the ones omitted.
fn hidden_projects(state: &RenderState, available: usize) -> usize {
    state.projects.len().saturating_sub(available)
}

fn status_line(state: &RenderState, hidden: usize, elapsed: Duration) -> String {
    if !state.build_active() {
        return color::bold(state.build_status.as_deref().unwrap_or(""));
    }

    // The latest BuildStatus replaces the name while one is set
    let name = state
        .build_status
        .as_deref()
        .or(state.name.as_deref())
        .unwrap_or_default();

    let total = state.total_projects.max(0) as usize;
    let digits = total.to_string().len();
    let done = format!("{:>digits$}", state.done_projects);
    let pct = if total > 0 { state.done_projects * 100 / total } else { 0 };

    let max_threads = state.max_threads.max(0);
    let thread_digits = max_threads.to_string().len();
    let triple = format!("{}/{}/{}", state.projects.len(), hidden, max_threads);
    let triple = format!("{:<width$}", triple, width = 3 * thread_digits + 2);

    let secs = elapsed.as_secs();
    format!(
        "Building {}  daemon: {}  threads used/hidden/max: {}  progress: {}/{} {}%  time: {:02}:{:02}",
        color::bold(name),
        state.daemon_id,
        triple,
        done,
        total,
        pct,
        secs / 60,
        secs % 60,
    )
}

fn failure_line(state: &RenderState, cols: usize) -> Option<String> {
    if state.failures.is_empty() {
        return None;
    }
    let prefix = if state.failures.iter().any(|f| f.halted) {
        "ABORTING FAILURE:"
    } else {
        "FAILURE:"
    };
    let mut text = if state.failures.len() == 1 {
        let failure = &state.failures[0];
        match failure.exception.as_deref() {
            Some(exception) => {
                let exception = exception.strip_prefix(LIFECYCLE_PREFIX).unwrap_or(exception);
                format!("{prefix} {} {}", failure.project_id, exception)
            }
            None => format!("{prefix} {}", failure.project_id),
        }
    } else {
        let ids: Vec<&str> = state.failures.iter().map(|f| f.project_id.as_str()).collect();
        format!("{prefix} {} projects failed: {}", state.failures.len(), ids.join(", "))
    };
    if text.chars().count() > cols.saturating_sub(1) {
        text = text.chars().take(cols.saturating_sub(2)).collect();
        text.push('…');
    }
    Some(color::bold_red(&text))
}

fn global_transfer_line(state: &RenderState) -> Option<String> {
    let global = state.transfers.get("")?;
    if global.len() == 1 {
        global.values().next().map(transfer_description)
    } else {
        Some(format!("Downloading {} files...", global.len()))
    }
}

/// `Uploading|Downloading <coords> to|from <repo> [<cur>/<max>]`.
pub(crate) fn transfer_description(event: &TransferEvent) -> String {
    let (verb, preposition) = if event.request_type == REQUEST_PUT {
        ("Uploading", "to")
    } else {
        ("Downloading", "from")
    };
    let mut line = format!(
        "{verb} {} {preposition} {}",
        maven_coords(&event.resource_name),
        event.repository_id
    );
    if event.transferred_bytes >= 0 {
        if event.content_length >= 0 {
            line.push_str(&format!(" [{}/{}]", event.transferred_bytes, event.content_length));
        } else {
            line.push_str(&format!(" [{}]", event.transferred_bytes));
        }
    }
    line
}

fn project_line(state: &RenderState, project: &super::model::Project) -> String {
    let id = format!("{:<width$}", project.id, width = state.artifact_id_width);
    let activity = if let Some(transfer) = state.project_transfer(&project.id) {
        transfer_description(transfer)
    } else if let Some(mojo) = &project.running_execution {
        mojo_display(mojo)
    } else {
        String::new()
    };
    format!("{} {}", color::cyan(&id), color::green(&activity))
}

fn mojo_display(mojo: &MojoStarted) -> String {
    let prefix = if mojo.plugin_goal_prefix.is_empty() {
        &mojo.plugin_artifact_id
    } else {
        &mojo.plugin_goal_prefix
    };
    format!("{prefix}:{}:{} ({})", mojo.plugin_version, mojo.mojo, mojo.execution_id)
}

// --- ANSI-aware line arithmetic ---

/// Count displayed columns, skipping CSI escape sequences.
pub(crate) fn visible_width(line: &str) -> usize {
    let mut width = 0;
    let mut chars = line.chars();
    while let Some(c) = chars.next() {
        if c == '\x1b' {
            skip_csi(&mut chars);
            continue;
        }
        width += 1;
    }
    width
}

/// Truncate to `max` displayed columns, keeping escape sequences intact
/// and resetting any open style at the cut.
pub(crate) fn clip(line: &str, max: usize) -> String {
    if visible_width(line) <= max {
        return line.to_string();
    }
    let mut out = String::new();
    let mut width = 0;
    let mut styled = false;
    let mut chars = line.chars();
    while let Some(c) = chars.next() {
        if c == '\x1b' {
            out.push(c);
            for c in chars.by_ref() {
                out.push(c);
                if c != '[' && ('\u{40}'..='\u{7e}').contains(&c) {
                    break;
                }
            }
            styled = true;
            continue;
        }
        if width == max {
            break;
        }
        out.push(c);
        width += 1;
    }
    if styled {
        out.push_str(color::RESET);
    }
    out
}

/// Split into rows of at most `width` displayed columns.
pub(crate) fn wrap(line: &str, width: usize) -> Vec<String> {
    if width == 0 || visible_width(line) <= width {
        return vec![line.to_string()];
    }
    let mut rows = Vec::new();
    let mut current = String::new();
    let mut columns = 0;
    let mut chars = line.chars();
    while let Some(c) = chars.next() {
        if c == '\x1b' {
            current.push(c);
            for c in chars.by_ref() {
                current.push(c);
                if c != '[' && ('\u{40}'..='\u{7e}').contains(&c) {
                    break;
                }
            }
            continue;
        }
        if columns == width {
            rows.push(std::mem::take(&mut current));
            columns = 0;
        }
        current.push(c);
        columns += 1;
    }
    rows.push(current);
    rows
}

fn skip_csi(chars: &mut std::str::Chars<'_>) {
    for c in chars.by_ref() {
        if c != '[' && ('\u{40}'..='\u{7e}').contains(&c) {
            break;
        }
    }
}

#[cfg(test)]
#[path = "layout_tests.rs"]
mod tests;
