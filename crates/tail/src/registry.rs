// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Strongly-typed watcher registry keyed by canonicalized absolute path.
//!
//! Single writer / many readers; at most one tailer task per path. The
//! registry owns each task's shutdown sender; tasks remove themselves
//! when they terminate on their own (dead path).

use crate::parsers::ParserRegistry;
use crate::publish::EntryPublisher;
use crate::tailer::{self, TailerOptions};
use chrono::{DateTime, Utc};
use mcplog_core::{AgentConfig, AgentId, ControlEvent};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

/// Runtime state of one tailed file, readable while the tailer runs.
#[derive(Debug, Clone)]
pub struct WatchStatus {
    pub agent_id: AgentId,
    pub path: PathBuf,
    pub offset: u64,
    pub error_count: u32,
    pub healthy: bool,
    pub last_activity: Option<DateTime<Utc>>,
    pub polling_fallback_active: bool,
}

impl WatchStatus {
    pub(crate) fn new(agent_id: AgentId, path: PathBuf) -> Self {
        Self {
            agent_id,
            path,
            offset: 0,
            error_count: 0,
            healthy: true,
            last_activity: None,
            polling_fallback_active: false,
        }
    }
}

struct WatchHandle {
    status: Arc<Mutex<WatchStatus>>,
    shutdown: oneshot::Sender<()>,
}

/// Shared map of active tailers.
#[derive(Clone)]
pub struct WatcherRegistry {
    inner: Arc<RwLock<HashMap<PathBuf, WatchHandle>>>,
    publisher: EntryPublisher,
    control_tx: mpsc::Sender<ControlEvent>,
    parsers: ParserRegistry,
    options: TailerOptions,
}

impl WatcherRegistry {
    pub fn new(
        publisher: EntryPublisher,
        control_tx: mpsc::Sender<ControlEvent>,
        options: TailerOptions,
    ) -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
            publisher,
            control_tx,
            parsers: ParserRegistry::new(),
            options,
        }
    }

    /// Start tailing `path` for `agent`. Returns false when the path is
    /// already watched.
    pub fn attach(&self, agent: &AgentConfig, path: &Path, force_poll: bool) -> bool {
        let canonical = canonicalize(path);
        let status = Arc::new(Mutex::new(WatchStatus::new(
            agent.id.clone(),
            canonical.clone(),
        )));
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        // Reserve the slot before spawning so a concurrent attach cannot
        // start a second tailer for the same path.
        {
            let mut map = self.inner.write();
            if map.contains_key(&canonical) {
                return false;
            }
            map.insert(
                canonical.clone(),
                WatchHandle {
                    status: Arc::clone(&status),
                    shutdown: shutdown_tx,
                },
            );
        }

        let task = tailer::Tailer::new(
            agent,
            canonical.clone(),
            self.parsers.for_agent(&agent.kind, agent.log_format),
            status,
            self.publisher.clone(),
            self.control_tx.clone(),
            TailerOptions {
                force_poll,
                ..self.options.clone()
            },
            self.clone(),
        );
        tokio::spawn(task.run(shutdown_rx));
        debug!(agent_id = %agent.id, path = %canonical.display(), "watch attached");
        true
    }

    /// Stop tailing `path`. Returns false when it was not watched.
    pub fn detach(&self, path: &Path) -> bool {
        let canonical = canonicalize(path);
        let handle = self.inner.write().remove(&canonical);
        match handle {
            Some(handle) => {
                let _ = handle.shutdown.send(());
                info!(path = %canonical.display(), "watch detached");
                true
            }
            None => false,
        }
    }

    /// Called by a tailer that terminated on its own.
    pub(crate) fn finish(&self, path: &Path) {
        self.inner.write().remove(path);
    }

    pub fn watched_paths(&self) -> Vec<PathBuf> {
        self.inner.read().keys().cloned().collect()
    }

    pub fn status(&self, path: &Path) -> Option<WatchStatus> {
        let canonical = canonicalize(path);
        self.inner.read().get(&canonical).map(|h| h.status.lock().clone())
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    /// Entries dropped on the bounded publish queue.
    pub fn dropped_entries(&self) -> u64 {
        self.publisher.dropped()
    }

    /// Stop every tailer. Part of ordered shutdown.
    pub fn shutdown_all(&self) {
        let handles: Vec<WatchHandle> = {
            let mut map = self.inner.write();
            map.drain().map(|(_, h)| h).collect()
        };
        for handle in handles {
            let _ = handle.shutdown.send(());
        }
    }
}

/// Canonicalize where possible; unresolvable paths keep their given form
/// so dead-path bookkeeping still works.
pub(crate) fn canonicalize(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
