// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Candidate log-path computation per OS, including remote-volume
//! (another OS's filesystem mounted at fixed points) expansion.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Per-OS base paths for one agent class, each relative to the user's
/// home (linux/macos) or profile directory (windows).
#[derive(Debug, Clone, Default)]
pub struct AgentPathTable {
    pub linux: Vec<&'static str>,
    pub macos: Vec<&'static str>,
    pub windows: Vec<&'static str>,
}

/// Mounted foreign-OS volumes detected on this host.
#[derive(Debug, Clone)]
pub struct RemoteVolumes {
    /// Mount roots, e.g. `/mnt/c`, `/mnt/d`.
    pub mounts: Vec<PathBuf>,
    /// User profile names found under `<mount>/Users`.
    pub users: Vec<String>,
}

/// Windows system profiles that are never real users.
const EXCLUDED_USERS: [&str; 3] = ["Public", "Default", "All Users"];

/// Users probed even when the users directory cannot be read.
fn fallback_users() -> Vec<String> {
    let mut users = Vec::new();
    if let Ok(user) = std::env::var("USER") {
        if !user.is_empty() {
            users.push(user);
        }
    }
    users.push("Administrator".to_string());
    users.push("user".to_string());
    users
}

/// Computes deduplicated, ordered candidate log locations for an agent
/// class: native paths first (linux, macos, windows), then remote-volume
/// expansions. Performs no I/O beyond existence probes.
#[derive(Debug, Clone)]
pub struct PathResolver {
    home: PathBuf,
    remote: Option<RemoteVolumes>,
}

impl PathResolver {
    /// Probe the environment: home directory plus remote-volume detection.
    pub fn detect() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("/"));
        let remote = detect_remote_volumes(Path::new("/mnt"), Path::new("/proc/version"));
        Self { home, remote }
    }

    /// Construct with explicit roots (tests and non-standard layouts).
    pub fn with_roots(home: PathBuf, remote: Option<RemoteVolumes>) -> Self {
        Self { home, remote }
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    /// Whether a remote volume was detected on this host.
    pub fn is_remote_host(&self) -> bool {
        self.remote.is_some()
    }

    /// Whether `path` lives on a detected remote volume. Such paths get
    /// unconditional polling because mount notifications are unreliable.
    pub fn is_remote_path(&self, path: &Path) -> bool {
        self.remote
            .as_ref()
            .is_some_and(|r| r.mounts.iter().any(|m| path.starts_with(m)))
    }

    /// Resolve the candidate paths for one agent class.
    pub fn resolve(&self, table: &AgentPathTable) -> Vec<PathBuf> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        let mut push = |path: PathBuf| {
            if seen.insert(path.clone()) {
                out.push(path);
            }
        };

        for rel in table.linux.iter().chain(&table.macos).chain(&table.windows) {
            push(self.home.join(rel));
        }

        if let Some(remote) = &self.remote {
            for mount in &remote.mounts {
                for user in &remote.users {
                    for rel in &table.windows {
                        push(mount.join("Users").join(user).join(rel));
                    }
                }
            }
        }

        out
    }
}

/// Probe for a Windows filesystem exposed under `mnt_root` (WSL-style).
///
/// Requires both the marker directory `<root>/c/Windows/System32` and a
/// kernel version string mentioning `microsoft`.
pub(crate) fn detect_remote_volumes(
    mnt_root: &Path,
    version_path: &Path,
) -> Option<RemoteVolumes> {
    let marker = mnt_root.join("c").join("Windows").join("System32");
    if !marker.is_dir() {
        return None;
    }
    let version = std::fs::read_to_string(version_path).unwrap_or_default();
    if !version.to_lowercase().contains("microsoft") {
        return None;
    }

    let mounts: Vec<PathBuf> = ["c", "d", "e", "f"]
        .iter()
        .map(|d| mnt_root.join(d))
        .filter(|m| m.is_dir())
        .collect();

    let mut users = Vec::new();
    let mut seen = HashSet::new();
    for mount in &mounts {
        let users_dir = mount.join("Users");
        let Ok(dents) = std::fs::read_dir(&users_dir) else {
            continue;
        };
        for dent in dents.flatten() {
            let name = dent.file_name().to_string_lossy().into_owned();
            if EXCLUDED_USERS.contains(&name.as_str()) {
                continue;
            }
            if dent.path().is_dir() && seen.insert(name.clone()) {
                users.push(name);
            }
        }
    }
    for fallback in fallback_users() {
        if seen.insert(fallback.clone()) {
            users.push(fallback);
        }
    }

    Some(RemoteVolumes { mounts, users })
}

/// Base-path table for each supported agent class.
pub mod tables {
    use super::AgentPathTable;

    pub fn claude_desktop() -> AgentPathTable {
        AgentPathTable {
            linux: vec![".config/Claude/logs"],
            macos: vec!["Library/Logs/Claude"],
            windows: vec!["AppData/Roaming/Claude/logs"],
        }
    }

    /// VS Code log root; the Claude Code extension logs under dated
    /// session directories inside it.
    pub fn vscode() -> AgentPathTable {
        AgentPathTable {
            linux: vec![".config/Code/logs"],
            macos: vec!["Library/Application Support/Code/logs"],
            windows: vec!["AppData/Roaming/Code/logs"],
        }
    }

    pub fn cursor() -> AgentPathTable {
        AgentPathTable {
            linux: vec![".config/Cursor/logs"],
            macos: vec!["Library/Application Support/Cursor/logs"],
            windows: vec!["AppData/Roaming/Cursor/logs"],
        }
    }

    /// Claude CLI MCP log cache (project dirs containing `mcp-logs-*`).
    pub fn claude_mcp_cache() -> AgentPathTable {
        AgentPathTable {
            linux: vec![".cache/claude-cli-nodejs"],
            macos: vec!["Library/Caches/claude-cli-nodejs"],
            windows: vec!["AppData/Local/claude-cli-nodejs"],
        }
    }

    pub fn gemini_cli() -> AgentPathTable {
        AgentPathTable {
            linux: vec![".gemini/tmp"],
            macos: vec![".gemini/tmp"],
            windows: vec![".gemini/tmp"],
        }
    }
}

#[cfg(test)]
#[path = "paths_tests.rs"]
mod tests;
