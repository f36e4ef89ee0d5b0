// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Resumption store: which projects remain after a failed build.
//!
//! A `resume.properties` file in the build-output root with the single key
//! `remainingProjects`. Losing this file costs a convenience, not a build,
//! so every failure here degrades to a warning.

use std::io::Write;
use std::path::Path;

use kiln_wire::BuildRequest;
use tracing::warn;

const RESUME_FILE: &str = "resume.properties";
const REMAINING_KEY: &str = "remainingProjects";

/// Record the projects left unbuilt under `root`.
pub fn persist(root: &Path, remaining: &[String]) {
    if remaining.is_empty() {
        return;
    }
    let path = root.join(RESUME_FILE);
    let write = || -> std::io::Result<()> {
        std::fs::create_dir_all(root)?;
        let mut file = std::fs::File::create(&path)?;
        writeln!(file, "{} = {}", REMAINING_KEY, remaining.join(", "))?;
        Ok(())
    };
    if let Err(e) = write() {
        warn!(path = %path.display(), "failed to persist resumption state: {e}");
    }
}

/// Inject a resume-from argument when the request carries none and a
/// previous failed build left resumption state under `root`.
pub fn apply(request: &mut BuildRequest, root: &Path) {
    if has_resume_arg(&request.args) {
        return;
    }
    let Some(remaining) = load(root) else {
        return;
    };
    if let Some(first) = remaining.first() {
        request.args.push("--resume-from".to_string());
        request.args.push(first.clone());
    }
}

/// Drop the resumption state after a successful build.
pub fn remove(root: &Path) {
    let path = root.join(RESUME_FILE);
    if path.exists() {
        if let Err(e) = std::fs::remove_file(&path) {
            warn!(path = %path.display(), "failed to remove resumption state: {e}");
        }
    }
}

fn has_resume_arg(args: &[String]) -> bool {
    args.iter().any(|a| {
        a == "-rf" || a == "--resume-from" || a.starts_with("-rf=") || a.starts_with("--resume-from=")
    })
}

/// Parse the remaining-project list, or `None` when the file is missing or
/// unreadable (corrupt state is a warning, never an error).
fn load(root: &Path) -> Option<Vec<String>> {
    let path = root.join(RESUME_FILE);
    let content = match std::fs::read_to_string(&path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
        Err(e) => {
            warn!(path = %path.display(), "failed to read resumption state: {e}");
            return None;
        }
    };
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some((key, value)) = line.split_once('=') {
            if key.trim() == REMAINING_KEY {
                let ids: Vec<String> = value
                    .split(',')
                    .map(|id| id.trim().to_string())
                    .filter(|id| !id.is_empty())
                    .collect();
                if ids.is_empty() {
                    return None;
                }
                return Some(ids);
            }
        }
    }
    warn!(path = %path.display(), "resumption state has no {REMAINING_KEY} entry");
    None
}

#[cfg(test)]
#[path = "resume_tests.rs"]
mod tests;
