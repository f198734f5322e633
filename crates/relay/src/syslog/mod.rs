// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Syslog forwarder set: filtered re-emission of log entries to external
//! collectors, with persistent configuration.

mod config;
mod format;
mod transport;

pub use config::{
    ForwarderConfig, ForwarderFilters, ForwarderMeta, Protocol, Severity, SyslogFormat,
};
pub use format::{octet_frame, priority, render, severity_for, FrameIdentity};
pub use transport::test_connection;

use config::CompiledFilters;
use indexmap::IndexMap;
use mcplog_core::{ForwarderId, LogEntry};
use mcplog_storage::{PersistError, PersistenceAdapter};
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Per-forwarder outbound queue depth.
const SENDER_QUEUE_DEPTH: usize = 256;

/// Errors from the relay layer.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Persistence error: {0}")]
    Persist(#[from] PersistError),

    #[error("invalid forwarder config: {0}")]
    InvalidConfig(String),

    #[error("forwarder not found: {0}")]
    NotFound(ForwarderId),

    #[error("connection timed out")]
    Timeout,

    #[error("not connected")]
    NotConnected,
}

struct ForwarderEntry {
    config: ForwarderConfig,
    filters: CompiledFilters,
    /// Sending half of the sender task; `None` while disabled.
    sender: Option<mpsc::Sender<String>>,
}

struct ForwardersInner {
    entries: RwLock<IndexMap<ForwarderId, ForwarderEntry>>,
    persist: Box<dyn PersistenceAdapter>,
}

/// The forwarder set. Clones share state.
#[derive(Clone)]
pub struct SyslogForwarders {
    inner: Arc<ForwardersInner>,
}

impl SyslogForwarders {
    /// Load persisted forwarders and open connections for enabled ones.
    /// A missing state file is not an error; a corrupt one is moved aside
    /// and the set starts empty.
    pub fn load(persist: Box<dyn PersistenceAdapter>) -> Result<Self, RelayError> {
        let configs: Vec<(ForwarderId, ForwarderConfig)> = match persist.load()? {
            Some(contents) => match serde_json::from_str(&contents) {
                Ok(configs) => configs,
                Err(e) => {
                    warn!(error = %e, "corrupt forwarder state, quarantining and starting fresh");
                    persist.quarantine()?;
                    Vec::new()
                }
            },
            None => Vec::new(),
        };

        let mut entries = IndexMap::new();
        for (id, config) in configs {
            let filters = CompiledFilters::compile(&config.filters)?;
            let sender = config.enabled.then(|| spawn_sender(&config));
            entries.insert(
                id,
                ForwarderEntry {
                    config,
                    filters,
                    sender,
                },
            );
        }
        info!(count = entries.len(), "loaded syslog forwarders");

        Ok(Self {
            inner: Arc::new(ForwardersInner {
                entries: RwLock::new(entries),
                persist,
            }),
        })
    }

    pub fn list(&self) -> Vec<ForwarderConfig> {
        self.inner
            .entries
            .read()
            .values()
            .map(|e| e.config.clone())
            .collect()
    }

    pub fn get(&self, id: &ForwarderId) -> Option<ForwarderConfig> {
        self.inner.entries.read().get(id).map(|e| e.config.clone())
    }

    /// Add a forwarder. The config is persisted verbatim, so re-adding an
    /// identical config writes identical bytes.
    pub fn add(&self, config: ForwarderConfig) -> Result<(), RelayError> {
        config.validate()?;
        let filters = CompiledFilters::compile(&config.filters)?;
        {
            let mut entries = self.inner.entries.write();
            if entries.contains_key(&config.id) {
                return Err(RelayError::InvalidConfig(format!(
                    "forwarder {} already exists",
                    config.id
                )));
            }
            let sender = config.enabled.then(|| spawn_sender(&config));
            entries.insert(
                config.id.clone(),
                ForwarderEntry {
                    config,
                    filters,
                    sender,
                },
            );
        }
        self.save()
    }

    /// Replace an existing forwarder's config; its connection is restarted.
    pub fn update(&self, config: ForwarderConfig) -> Result<(), RelayError> {
        config.validate()?;
        let filters = CompiledFilters::compile(&config.filters)?;
        {
            let mut entries = self.inner.entries.write();
            let Some(entry) = entries.get_mut(&config.id) else {
                return Err(RelayError::NotFound(config.id));
            };
            // Dropping the old sender closes its connection.
            entry.sender = config.enabled.then(|| spawn_sender(&config));
            entry.filters = filters;
            entry.config = config;
        }
        self.save()
    }

    /// Remove a forwarder; returns false when the id is unknown.
    pub fn remove(&self, id: &ForwarderId) -> Result<bool, RelayError> {
        let removed = self.inner.entries.write().shift_remove(id).is_some();
        if removed {
            self.save()?;
        }
        Ok(removed)
    }

    /// Reachability probe with per-protocol timeouts.
    pub async fn test_connection(
        &self,
        host: &str,
        port: u16,
        protocol: Protocol,
    ) -> Result<Duration, RelayError> {
        transport::test_connection(host, port, protocol).await
    }

    /// Evaluate filters and enqueue matching frames. Never blocks.
    pub fn forward(&self, entry: &LogEntry) {
        let entries = self.inner.entries.read();
        for fwd in entries.values() {
            if !fwd.config.enabled {
                continue;
            }
            let Some(sender) = &fwd.sender else { continue };
            if !fwd.filters.matches(entry) {
                continue;
            }
            let identity = FrameIdentity::resolve(&fwd.config);
            let frame = format::render(&fwd.config, &identity, entry);
            if sender.try_send(frame).is_err() {
                debug!(forwarder = %fwd.config.id, "forwarder queue full, dropping frame");
            }
        }
    }

    /// Close all sockets and forget all forwarders (in memory only).
    pub fn shutdown(&self) {
        let mut entries = self.inner.entries.write();
        for entry in entries.values_mut() {
            entry.sender = None;
        }
        entries.clear();
        info!("syslog forwarders shut down");
    }

    fn save(&self) -> Result<(), RelayError> {
        let serialized = {
            let entries = self.inner.entries.read();
            let pairs: Vec<(&ForwarderId, &ForwarderConfig)> =
                entries.iter().map(|(id, e)| (id, &e.config)).collect();
            serde_json::to_string_pretty(&pairs)?
        };
        self.inner.persist.save_atomic(&serialized)?;
        Ok(())
    }
}

/// One sender task per forwarder; owns the transport state.
fn spawn_sender(config: &ForwarderConfig) -> mpsc::Sender<String> {
    let (tx, mut rx) = mpsc::channel::<String>(SENDER_QUEUE_DEPTH);
    let mut transport =
        transport::Transport::new(config.host.clone(), config.port, config.protocol);
    let id = config.id.clone();
    tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if let Err(e) = transport.send(&frame).await {
                warn!(forwarder = %id, error = %e, "syslog send failed");
            }
        }
        debug!(forwarder = %id, "sender task stopped");
    });
    tx
}

#[cfg(test)]
#[path = "forwarders_tests.rs"]
mod tests;
