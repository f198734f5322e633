// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Directory/tree watcher: discovers new log files inside agent log
//! directories and attaches tailers for them.

use crate::file_event::FileEventSource;
use crate::registry::WatcherRegistry;
use mcplog_core::{AgentConfig, AgentKind};
use mcplog_discovery::sessions;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::debug;

/// Newest-session cap when walking editor layouts.
const MAX_SESSIONS: usize = 10;

/// Watches one directory log path for an agent.
pub struct TreeWatcher {
    registry: WatcherRegistry,
    agent: AgentConfig,
    root: PathBuf,
    poll_interval: Duration,
    force_poll: bool,
}

impl TreeWatcher {
    pub fn new(
        registry: WatcherRegistry,
        agent: AgentConfig,
        root: PathBuf,
        poll_interval: Duration,
        force_poll: bool,
    ) -> Self {
        Self {
            registry,
            agent,
            root,
            poll_interval,
            force_poll,
        }
    }

    /// Spawn the watch task; returns its shutdown sender.
    pub fn spawn(self) -> oneshot::Sender<()> {
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        tokio::spawn(self.run(shutdown_rx));
        shutdown_tx
    }

    async fn run(self, mut shutdown_rx: oneshot::Receiver<()>) {
        let mut source = FileEventSource::subscribe_tree(
            &self.root,
            self.poll_interval,
            self.force_poll,
        );

        self.scan();

        loop {
            tokio::select! {
                event = source.next() => {
                    if event.is_none() {
                        break;
                    }
                    self.scan();
                }
                _ = &mut shutdown_rx => {
                    debug!(root = %self.root.display(), "tree watcher shutdown requested");
                    break;
                }
            }
        }
    }

    /// Enumerate log files under the root and attach any new ones.
    fn scan(&self) {
        for file in discover_log_files(&self.agent.kind, &self.root) {
            if self.registry.attach(&self.agent, &file, self.force_poll) {
                debug!(
                    agent_id = %self.agent.id,
                    path = %file.display(),
                    "tree watcher found new log file"
                );
            }
        }
    }
}

/// Log files for one agent directory, following the known layouts.
pub(crate) fn discover_log_files(kind: &AgentKind, root: &Path) -> Vec<PathBuf> {
    let name = root
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    match kind {
        AgentKind::ClaudeMcp => {
            if name.starts_with("mcp-logs-") {
                sessions::claude_mcp_log_files(root)
            } else {
                sessions::claude_mcp_log_dirs(root, MAX_SESSIONS)
                    .iter()
                    .flat_map(|dir| sessions::claude_mcp_log_files(dir))
                    .collect()
            }
        }
        AgentKind::Cursor | AgentKind::VsCode | AgentKind::ClaudeCode => {
            if sessions::is_session_dir_name(&name) {
                sessions::session_log_files(root)
            } else {
                sessions::editor_session_dirs(root, MAX_SESSIONS)
                    .iter()
                    .flat_map(|dir| sessions::session_log_files(dir))
                    .collect()
            }
        }
        _ => flat_log_files(root),
    }
}

/// Flat enumeration: `.log` and `.txt` files directly under the root.
fn flat_log_files(root: &Path) -> Vec<PathBuf> {
    let Ok(dents) = std::fs::read_dir(root) else {
        return Vec::new();
    };
    let mut files: Vec<PathBuf> = dents
        .flatten()
        .map(|d| d.path())
        .filter(|p| {
            p.is_file()
                && p.extension()
                    .is_some_and(|ext| ext == "log" || ext == "txt")
        })
        .collect();
    files.sort();
    files
}

#[cfg(test)]
#[path = "tree_tests.rs"]
mod tests;
