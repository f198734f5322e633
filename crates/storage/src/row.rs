// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Row shape consumed by the time-series engine.

use chrono::{DateTime, Utc};
use mcplog_core::{LogEntry, LogLevel};
use serde::{Deserialize, Serialize};

/// Column-explicit mirror of [`LogEntry`].
///
/// Matches the engine's table: `timestamp DateTime64(3)`, `log_id String`,
/// `source_id String`, `level LowCardinality`, `message String`,
/// `agent_type LowCardinality`, `session_id String`, `metadata String`,
/// `raw_log String`. Metadata is pre-serialized to a JSON string column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntryRow {
    pub timestamp: DateTime<Utc>,
    pub log_id: String,
    pub source_id: String,
    pub level: LogLevel,
    pub message: String,
    pub agent_type: String,
    pub session_id: String,
    pub metadata: String,
    pub raw_log: String,
}

impl From<&LogEntry> for LogEntryRow {
    fn from(entry: &LogEntry) -> Self {
        let metadata = if entry.metadata.is_empty() {
            "{}".to_string()
        } else {
            serde_json::Value::Object(entry.metadata.clone()).to_string()
        };
        Self {
            timestamp: entry.timestamp,
            log_id: entry.id.clone(),
            source_id: entry.source.clone(),
            level: entry.level,
            message: entry.message.clone(),
            agent_type: entry.agent_type.to_string(),
            session_id: entry.session_id.clone(),
            metadata,
            raw_log: entry.raw.clone(),
        }
    }
}

impl From<LogEntry> for LogEntryRow {
    fn from(entry: LogEntry) -> Self {
        Self::from(&entry)
    }
}

#[cfg(test)]
#[path = "row_tests.rs"]
mod tests;
