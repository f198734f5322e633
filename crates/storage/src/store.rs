// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The time-series store contract consumed by the storage sink.

use crate::row::LogEntryRow;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mcplog_core::LogLevel;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use thiserror::Error;

/// Errors from store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("internal error: {0}")]
    Internal(String),
}

/// Row predicate for `query`/`count`. Empty lists match everything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogFilter {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub levels: Vec<LogLevel>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub agent_types: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub source_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub since: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub until: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_contains: Option<String>,
}

impl LogFilter {
    pub fn matches(&self, row: &LogEntryRow) -> bool {
        if !self.levels.is_empty() && !self.levels.contains(&row.level) {
            return false;
        }
        if !self.agent_types.is_empty() && !self.agent_types.contains(&row.agent_type) {
            return false;
        }
        if !self.source_ids.is_empty() && !self.source_ids.contains(&row.source_id) {
            return false;
        }
        if let Some(session) = &self.session_id {
            if &row.session_id != session {
                return false;
            }
        }
        if let Some(since) = self.since {
            if row.timestamp < since {
                return false;
            }
        }
        if let Some(until) = self.until {
            if row.timestamp > until {
                return false;
            }
        }
        if let Some(needle) = &self.message_contains {
            if !row.message.contains(needle.as_str()) {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

/// Pagination and ordering for `query`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryOptions {
    pub limit: usize,
    pub offset: usize,
    pub sort_order: SortOrder,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            limit: 100,
            offset: 0,
            sort_order: SortOrder::Desc,
        }
    }
}

/// The insert/query interface of the external time-series engine.
///
/// The daemon only ever talks to this trait; the bundled [`crate::SpoolStore`]
/// implements it for stand-alone operation.
#[async_trait]
pub trait LogStore: Send + Sync + 'static {
    /// Bulk-insert a batch of rows.
    async fn insert(&self, batch: Vec<LogEntryRow>) -> Result<(), StoreError>;

    /// Return matching rows, ordered by timestamp, paginated.
    async fn query(
        &self,
        filter: &LogFilter,
        options: &QueryOptions,
    ) -> Result<Vec<LogEntryRow>, StoreError>;

    /// Count matching rows.
    async fn count(&self, filter: &LogFilter) -> Result<u64, StoreError>;
}

/// In-memory store used by tests and the sink's backoff specs.
#[derive(Clone, Default)]
pub struct MemoryStore {
    rows: Arc<Mutex<Vec<LogEntryRow>>>,
    fail_times: Arc<AtomicU32>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `n` inserts fail with `Unavailable`.
    pub fn fail_next_inserts(&self, n: u32) {
        self.fail_times.store(n, Ordering::SeqCst);
    }

    pub fn rows(&self) -> Vec<LogEntryRow> {
        self.rows.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.rows.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.lock().is_empty()
    }
}

#[async_trait]
impl LogStore for MemoryStore {
    async fn insert(&self, batch: Vec<LogEntryRow>) -> Result<(), StoreError> {
        let remaining = self.fail_times.load(Ordering::SeqCst);
        if remaining > 0 {
            self.fail_times.store(remaining - 1, Ordering::SeqCst);
            return Err(StoreError::Unavailable("injected failure".to_string()));
        }
        self.rows.lock().extend(batch);
        Ok(())
    }

    async fn query(
        &self,
        filter: &LogFilter,
        options: &QueryOptions,
    ) -> Result<Vec<LogEntryRow>, StoreError> {
        let rows = self.rows.lock();
        Ok(apply_query(rows.iter().cloned(), filter, options))
    }

    async fn count(&self, filter: &LogFilter) -> Result<u64, StoreError> {
        let rows = self.rows.lock();
        Ok(rows.iter().filter(|r| filter.matches(r)).count() as u64)
    }
}

/// Shared filter/sort/paginate pipeline for in-process stores.
pub(crate) fn apply_query(
    rows: impl Iterator<Item = LogEntryRow>,
    filter: &LogFilter,
    options: &QueryOptions,
) -> Vec<LogEntryRow> {
    let mut matched: Vec<LogEntryRow> = rows.filter(|r| filter.matches(r)).collect();
    matched.sort_by_key(|r| r.timestamp);
    if options.sort_order == SortOrder::Desc {
        matched.reverse();
    }
    matched
        .into_iter()
        .skip(options.offset)
        .take(options.limit)
        .collect()
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
