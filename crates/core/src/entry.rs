// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The canonical log record produced by the parser registry.

use crate::agent::AgentKind;
use crate::level::LogLevel;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A normalized log record.
///
/// Every entry that reaches the ingestion bus has `id`, `timestamp`,
/// `level`, `message`, `source` and `agent_type` set; the constructor
/// enforces this by taking all of them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Unique per process: `<agent_id>-<monotonic counter>`.
    pub id: String,
    /// UTC instant, millisecond precision.
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    /// Message text, trimmed of trailing newline.
    pub message: String,
    /// Typically `<agent_id>-<file-basename>` or `claude-mcp-<server>`.
    pub source: String,
    pub agent_type: AgentKind,
    /// Derived by the parser or synthesized as `session-<agent_id>`.
    pub session_id: String,
    /// Parser-specific keys (`mcpServer`, `clientId`, `isVSCodeExtension`, ...).
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub metadata: serde_json::Map<String, serde_json::Value>,
    /// Original line or JSON blob, kept for auditability.
    pub raw: String,
}

impl LogEntry {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: String,
        timestamp: DateTime<Utc>,
        level: LogLevel,
        message: impl Into<String>,
        source: impl Into<String>,
        agent_type: AgentKind,
        session_id: impl Into<String>,
        raw: impl Into<String>,
    ) -> Self {
        let message = message.into();
        let message = message.trim_end_matches(['\n', '\r']).to_string();
        Self {
            id,
            timestamp,
            level,
            message,
            source: source.into(),
            agent_type,
            session_id: session_id.into(),
            metadata: serde_json::Map::new(),
            raw: raw.into(),
        }
    }

    /// Attach a metadata key, returning self for chaining at build sites.
    pub fn with_meta(mut self, key: &str, value: serde_json::Value) -> Self {
        self.metadata.insert(key.to_string(), value);
        self
    }

    /// Default session id for agents whose logs carry none.
    pub fn default_session(agent_id: &crate::AgentId) -> String {
        format!("session-{agent_id}")
    }
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}] {}: {}",
            self.timestamp.format("%Y-%m-%dT%H:%M:%S%.3fZ"),
            self.level,
            self.source,
            self.message
        )
    }
}

#[cfg(test)]
#[path = "entry_tests.rs"]
mod tests;
