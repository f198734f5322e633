// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Walkers for the nested session layouts the editors produce.
//!
//! VS Code and Cursor write dated session directories (`YYYYMMDDTHHMMSS`)
//! containing `.log` files at the root and under `window*/exthost/<ext>`;
//! the Claude CLI caches MCP logs per project under `mcp-logs-<server>`.

use std::path::{Path, PathBuf};

/// Extension-host directory names that carry MCP-relevant logs.
const EXTHOST_MARKERS: [&str; 4] = ["mcp", "retrieval", "memento", "review-gate"];

/// Whether a directory name is a dated session (`\d{8}T\d{6}`).
pub fn is_session_dir_name(name: &str) -> bool {
    let bytes = name.as_bytes();
    bytes.len() == 15
        && bytes[..8].iter().all(u8::is_ascii_digit)
        && bytes[8] == b'T'
        && bytes[9..].iter().all(u8::is_ascii_digit)
}

/// Dated session directories under an editor log root, newest first,
/// capped at `limit`.
pub fn editor_session_dirs(log_root: &Path, limit: usize) -> Vec<PathBuf> {
    let Ok(dents) = std::fs::read_dir(log_root) else {
        return Vec::new();
    };
    let mut sessions: Vec<(String, PathBuf)> = dents
        .flatten()
        .filter(|d| d.path().is_dir())
        .filter_map(|d| {
            let name = d.file_name().to_string_lossy().into_owned();
            is_session_dir_name(&name).then(|| (name, d.path()))
        })
        .collect();
    // Session names sort chronologically; newest first.
    sessions.sort_by(|a, b| b.0.cmp(&a.0));
    sessions.into_iter().take(limit).map(|(_, p)| p).collect()
}

/// Whether an extension-host entry is worth watching.
fn is_interesting_extension(name: &str) -> bool {
    let lower = name.to_lowercase();
    name.starts_with("anysphere.") || EXTHOST_MARKERS.iter().any(|m| lower.contains(m))
}

/// `.log` files inside one session directory: session root first, then
/// `window*/exthost/<interesting extension>` and the general `exthost`
/// directory.
pub fn session_log_files(session_dir: &Path) -> Vec<PathBuf> {
    let mut files = files_with_extension(session_dir, "log");

    let Ok(dents) = std::fs::read_dir(session_dir) else {
        return files;
    };
    for dent in dents.flatten() {
        let name = dent.file_name().to_string_lossy().into_owned();
        if !name.starts_with("window") || !dent.path().is_dir() {
            continue;
        }
        let exthost = dent.path().join("exthost");
        if !exthost.is_dir() {
            continue;
        }
        files.extend(files_with_extension(&exthost, "log"));
        let Ok(ext_dents) = std::fs::read_dir(&exthost) else {
            continue;
        };
        for ext in ext_dents.flatten() {
            let ext_name = ext.file_name().to_string_lossy().into_owned();
            if ext.path().is_dir() && is_interesting_extension(&ext_name) {
                files.extend(files_with_extension(&ext.path(), "log"));
            }
        }
    }
    files
}

/// `mcp-logs-*` directories under a Claude CLI cache root, one level of
/// project directories deep. Newest first, capped at `limit`.
pub fn claude_mcp_log_dirs(cache_root: &Path, limit: usize) -> Vec<PathBuf> {
    let Ok(projects) = std::fs::read_dir(cache_root) else {
        return Vec::new();
    };
    let mut dirs: Vec<PathBuf> = Vec::new();
    for project in projects.flatten() {
        if !project.path().is_dir() {
            continue;
        }
        let Ok(subdirs) = std::fs::read_dir(project.path()) else {
            continue;
        };
        for sub in subdirs.flatten() {
            let name = sub.file_name().to_string_lossy().into_owned();
            if name.starts_with("mcp-logs-") && sub.path().is_dir() {
                dirs.push(sub.path());
            }
        }
    }
    dirs.sort_by_key(|p| {
        std::cmp::Reverse(
            p.metadata()
                .and_then(|m| m.modified())
                .unwrap_or(std::time::SystemTime::UNIX_EPOCH),
        )
    });
    dirs.truncate(limit);
    dirs
}

/// `.txt` log files inside one `mcp-logs-*` directory.
pub fn claude_mcp_log_files(log_dir: &Path) -> Vec<PathBuf> {
    files_with_extension(log_dir, "txt")
}

fn files_with_extension(dir: &Path, ext: &str) -> Vec<PathBuf> {
    let Ok(dents) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut files: Vec<PathBuf> = dents
        .flatten()
        .map(|d| d.path())
        .filter(|p| p.is_file() && p.extension().is_some_and(|x| x == ext))
        .collect();
    files.sort();
    files
}

#[cfg(test)]
#[path = "sessions_tests.rs"]
mod tests;
