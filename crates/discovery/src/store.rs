// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Custom agent store adapter.
//!
//! The external config DB stores one row per source with a unique
//! `(user_id, name)` pair, a JSON config column, non-empty `log_paths`
//! and a constrained `format_type`. The file-backed adapter enforces the
//! same contract; the daemon only ever speaks to the trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
#[cfg(any(test, feature = "test-support"))]
use mcplog_core::AgentId;
use mcplog_core::{AgentConfig, AgentKind, LogFormat};
use mcplog_storage::{FilePersistence, PersistError, PersistenceAdapter};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;

/// Errors from the store adapter.
#[derive(Debug, Error)]
pub enum StoreAdapterError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Persistence error: {0}")]
    Persist(#[from] PersistError),

    #[error("agent '{name}' has no log paths")]
    EmptyLogPaths { name: String },

    #[error("format '{format}' not allowed for custom agents")]
    DisallowedFormat { format: String },

    #[error("agent named '{name}' already exists for this user")]
    DuplicateName { name: String },
}

/// The `CustomAgent` CRUD interface consumed from the config DB.
#[async_trait]
pub trait CustomAgentStore: Send + Sync + 'static {
    /// User-defined agent configurations, in creation order.
    async fn list_custom_agents(&self) -> Result<Vec<AgentConfig>, StoreAdapterError>;

    /// Record an auto-discovered agent so the admin surface can see it.
    async fn upsert_discovered(&self, config: &AgentConfig) -> Result<(), StoreAdapterError>;
}

/// One persisted row, mirroring the external `log_sources` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct AgentRow {
    id: String,
    #[serde(default)]
    user_id: Option<String>,
    name: String,
    #[serde(rename = "type")]
    kind: AgentKind,
    config: RowConfig,
    is_active: bool,
    auto_discovery: bool,
    log_paths: Vec<PathBuf>,
    format_type: LogFormat,
    #[serde(default)]
    filters: serde_json::Value,
    #[serde(default)]
    metadata: serde_json::Map<String, serde_json::Value>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct RowConfig {
    #[serde(rename = "logPaths", default)]
    log_paths: Vec<PathBuf>,
    #[serde(default)]
    metadata: serde_json::Map<String, serde_json::Value>,
    #[serde(rename = "isCustom", default)]
    is_custom: bool,
}

impl AgentRow {
    fn validate(&self) -> Result<(), StoreAdapterError> {
        if self.log_paths.is_empty() {
            return Err(StoreAdapterError::EmptyLogPaths {
                name: self.name.clone(),
            });
        }
        if !LogFormat::CUSTOM_ALLOWED.contains(&self.format_type) {
            return Err(StoreAdapterError::DisallowedFormat {
                format: self.format_type.to_string(),
            });
        }
        Ok(())
    }

    fn to_config(&self) -> AgentConfig {
        let mut config = AgentConfig::new(self.id.clone(), self.name.clone(), self.kind.clone());
        config.enabled = self.is_active;
        config.log_paths = self.log_paths.clone();
        config.log_format = self.format_type;
        config.metadata = self.metadata.clone();
        config.set_meta("isCustom", serde_json::json!(self.config.is_custom));
        config.auto_discovery = self.auto_discovery;
        config
    }

    fn from_config(config: &AgentConfig, user_id: Option<String>) -> Self {
        let is_custom = !config.auto_discovery;
        let now = Utc::now();
        Self {
            id: config.id.to_string(),
            user_id,
            name: config.name.clone(),
            kind: config.kind.clone(),
            config: RowConfig {
                log_paths: config.log_paths.clone(),
                metadata: config.metadata.clone(),
                is_custom,
            },
            is_active: config.enabled,
            auto_discovery: config.auto_discovery,
            log_paths: config.log_paths.clone(),
            format_type: config.log_format,
            filters: serde_json::Value::Null,
            metadata: config.metadata.clone(),
            created_at: now,
            updated_at: now,
        }
    }

    fn user_key(&self) -> (String, String) {
        (
            self.user_id.clone().unwrap_or_default(),
            self.name.clone(),
        )
    }
}

/// JSON-file-backed adapter under the daemon state directory.
#[derive(Clone)]
pub struct FileCustomAgentStore {
    persist: Arc<FilePersistence>,
    rows: Arc<Mutex<Vec<AgentRow>>>,
}

impl FileCustomAgentStore {
    /// Open the store, loading existing rows. A missing file is empty;
    /// a corrupt one is moved aside and the store starts empty.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreAdapterError> {
        let persist = FilePersistence::new(path);
        let rows = match persist.load()? {
            Some(contents) => match serde_json::from_str(&contents) {
                Ok(rows) => rows,
                Err(e) => {
                    warn!(path = %persist.path().display(), error = %e, "corrupt agent store, quarantining and starting fresh");
                    persist.quarantine()?;
                    Vec::new()
                }
            },
            None => Vec::new(),
        };
        Ok(Self {
            persist: Arc::new(persist),
            rows: Arc::new(Mutex::new(rows)),
        })
    }

    /// Insert a user-defined agent, enforcing the table constraints.
    pub fn add_custom(
        &self,
        config: &AgentConfig,
        user_id: Option<String>,
    ) -> Result<(), StoreAdapterError> {
        let row = AgentRow::from_config(config, user_id);
        row.validate()?;
        let mut rows = self.rows.lock();
        if rows.iter().any(|r| r.user_key() == row.user_key()) {
            return Err(StoreAdapterError::DuplicateName {
                name: row.name.clone(),
            });
        }
        rows.push(row);
        self.flush(&rows)
    }

    fn flush(&self, rows: &[AgentRow]) -> Result<(), StoreAdapterError> {
        let json = serde_json::to_string_pretty(rows)?;
        self.persist.save_atomic(&json)?;
        Ok(())
    }
}

#[async_trait]
impl CustomAgentStore for FileCustomAgentStore {
    async fn list_custom_agents(&self) -> Result<Vec<AgentConfig>, StoreAdapterError> {
        let rows = self.rows.lock();
        Ok(rows
            .iter()
            .filter(|r| !r.auto_discovery)
            .map(AgentRow::to_config)
            .collect())
    }

    async fn upsert_discovered(&self, config: &AgentConfig) -> Result<(), StoreAdapterError> {
        let row = AgentRow::from_config(config, None);
        row.validate()?;
        let mut rows = self.rows.lock();
        match rows.iter().position(|r| r.user_key() == row.user_key()) {
            Some(i) => {
                let created_at = rows[i].created_at;
                rows[i] = row;
                rows[i].created_at = created_at;
            }
            None => rows.push(row),
        }
        self.flush(&rows)
    }
}

/// Adapter used when no config DB is wired up.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpCustomAgentStore;

#[async_trait]
impl CustomAgentStore for NoOpCustomAgentStore {
    async fn list_custom_agents(&self) -> Result<Vec<AgentConfig>, StoreAdapterError> {
        Ok(Vec::new())
    }

    async fn upsert_discovered(&self, _config: &AgentConfig) -> Result<(), StoreAdapterError> {
        Ok(())
    }
}

/// In-memory adapter with call recording for tests.
#[cfg(any(test, feature = "test-support"))]
#[derive(Clone, Default)]
pub struct FakeCustomAgentStore {
    agents: Arc<Mutex<Vec<AgentConfig>>>,
    upserts: Arc<Mutex<Vec<AgentId>>>,
}

#[cfg(any(test, feature = "test-support"))]
impl FakeCustomAgentStore {
    pub fn new(agents: Vec<AgentConfig>) -> Self {
        Self {
            agents: Arc::new(Mutex::new(agents)),
            upserts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn upserted_ids(&self) -> Vec<AgentId> {
        self.upserts.lock().clone()
    }
}

#[cfg(any(test, feature = "test-support"))]
#[async_trait]
impl CustomAgentStore for FakeCustomAgentStore {
    async fn list_custom_agents(&self) -> Result<Vec<AgentConfig>, StoreAdapterError> {
        Ok(self.agents.lock().clone())
    }

    async fn upsert_discovered(&self, config: &AgentConfig) -> Result<(), StoreAdapterError> {
        self.upserts.lock().push(config.id.clone());
        Ok(())
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
