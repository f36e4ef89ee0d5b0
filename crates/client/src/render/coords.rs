// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Best-effort rendering of repository paths as artifact coordinates.
//!
//! `org/apache/maven/maven-core/3.9.0/maven-core-3.9.0.jar` reads better
//! as `org.apache.maven:maven-core:3.9.0`. This is cosmetic only: any
//! shape the transform does not recognize returns the path unchanged.

/// Convert a repository-relative path to `groupId:artifactId:version`
/// coordinates, with `:type` and `:classifier` suffixes when they deviate
/// from the plain-jar default.
pub fn maven_coords(path: &str) -> String {
    coords(path).unwrap_or_else(|| path.to_string())
}

fn coords(path: &str) -> Option<String> {
    let segments: Vec<&str> = path.split('/').collect();
    if segments.len() < 4 {
        return None;
    }
    let file_name = segments[segments.len() - 1];
    let version = segments[segments.len() - 2];
    let artifact_id = segments[segments.len() - 3];
    let group_id = segments[..segments.len() - 3].join(".");

    let av_len = artifact_id.len() + 1 + version.len();
    if file_name.len() <= av_len {
        return None;
    }
    let dot = file_name.rfind('.')?;

    let classifier = if file_name.as_bytes().get(av_len) == Some(&b'-') {
        Some(file_name.get(av_len + 1..dot)?)
    } else {
        None
    };
    let kind = file_name.get(dot + 1..)?;

    let mut out = format!("{group_id}:{artifact_id}:{version}");
    if kind != "jar" || classifier.is_some() {
        out.push(':');
        if kind != "jar" {
            out.push_str(kind);
        }
        if let Some(classifier) = classifier {
            out.push(':');
            out.push_str(classifier);
        }
    }
    Some(out)
}

#[cfg(test)]
#[path = "coords_tests.rs"]
mod tests;
