// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Forwarder configuration and filter evaluation.

use super::RelayError;
use chrono::{DateTime, Utc};
use mcplog_core::{ForwarderId, LogEntry, LogLevel};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Transport protocol for a syslog destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Protocol {
    #[serde(rename = "udp")]
    Udp,
    #[serde(rename = "tcp")]
    Tcp,
    #[serde(rename = "tcp-tls")]
    TcpTls,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Udp => f.write_str("udp"),
            Protocol::Tcp => f.write_str("tcp"),
            Protocol::TcpTls => f.write_str("tcp-tls"),
        }
    }
}

/// Syslog severity (RFC 5424 numerical order).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Emergency,
    Alert,
    Critical,
    Error,
    Warning,
    Notice,
    #[serde(rename = "info")]
    Informational,
    Debug,
}

impl Severity {
    pub fn as_u8(&self) -> u8 {
        match self {
            Severity::Emergency => 0,
            Severity::Alert => 1,
            Severity::Critical => 2,
            Severity::Error => 3,
            Severity::Warning => 4,
            Severity::Notice => 5,
            Severity::Informational => 6,
            Severity::Debug => 7,
        }
    }
}

/// Wire framing format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyslogFormat {
    #[serde(rename = "rfc3164")]
    Rfc3164,
    #[serde(rename = "rfc5424")]
    Rfc5424,
}

/// Optional allow-lists; all configured groups must pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ForwarderFilters {
    /// Agent ids; empty allows all.
    #[serde(default)]
    pub agents: Vec<String>,
    /// Levels; empty allows all.
    #[serde(default)]
    pub levels: Vec<LogLevel>,
    /// Message regexes, OR-combined.
    #[serde(default)]
    pub message_patterns: Vec<String>,
}

/// Free-form identity fields used when rendering frames.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ForwarderMeta {
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub hostname: Option<String>,
    #[serde(default)]
    pub app_name: Option<String>,
}

/// One syslog destination.
///
/// Serialized field order is the struct order; reloading the persisted
/// file and re-serializing is byte-identical.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForwarderConfig {
    pub id: ForwarderId,
    pub name: String,
    pub host: String,
    pub port: u16,
    pub protocol: Protocol,
    /// Syslog facility, 0..=23.
    pub facility: u8,
    pub default_severity: Severity,
    pub format: SyslogFormat,
    pub enabled: bool,
    #[serde(default)]
    pub filters: ForwarderFilters,
    #[serde(default)]
    pub metadata: ForwarderMeta,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ForwarderConfig {
    pub fn new(name: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        let now = Utc::now();
        Self {
            id: ForwarderId::generate(),
            name: name.into(),
            host: host.into(),
            port,
            protocol: Protocol::Udp,
            facility: 16,
            default_severity: Severity::Informational,
            format: SyslogFormat::Rfc5424,
            enabled: true,
            filters: ForwarderFilters::default(),
            metadata: ForwarderMeta::default(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Surface configuration errors synchronously, before any socket work.
    pub fn validate(&self) -> Result<(), RelayError> {
        if self.host.is_empty() {
            return Err(RelayError::InvalidConfig("host must not be empty".into()));
        }
        if self.port == 0 {
            return Err(RelayError::InvalidConfig("port must be non-zero".into()));
        }
        if self.facility > 23 {
            return Err(RelayError::InvalidConfig(format!(
                "facility {} out of range 0..=23",
                self.facility
            )));
        }
        for pattern in &self.filters.message_patterns {
            Regex::new(pattern).map_err(|e| {
                RelayError::InvalidConfig(format!("bad message pattern '{pattern}': {e}"))
            })?;
        }
        Ok(())
    }
}

/// Filters with pre-compiled regexes, evaluated before formatting.
pub(crate) struct CompiledFilters {
    agents: Vec<String>,
    levels: Vec<LogLevel>,
    patterns: Vec<Regex>,
}

impl CompiledFilters {
    pub(crate) fn compile(filters: &ForwarderFilters) -> Result<Self, RelayError> {
        let patterns = filters
            .message_patterns
            .iter()
            .map(|p| {
                Regex::new(p).map_err(|e| {
                    RelayError::InvalidConfig(format!("bad message pattern '{p}': {e}"))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            agents: filters.agents.clone(),
            levels: filters.levels.clone(),
            patterns,
        })
    }

    /// All configured groups must pass; patterns are OR-combined.
    pub(crate) fn matches(&self, entry: &LogEntry) -> bool {
        if !self.agents.is_empty() {
            let agent = agent_of(entry);
            if !self.agents.iter().any(|a| a == agent) {
                return false;
            }
        }
        if !self.levels.is_empty() && !self.levels.contains(&entry.level) {
            return false;
        }
        if !self.patterns.is_empty() && !self.patterns.iter().any(|p| p.is_match(&entry.message)) {
            return false;
        }
        true
    }
}

/// Recover the agent id from an entry id (`<agent_id>-<counter>`).
pub(crate) fn agent_of(entry: &LogEntry) -> &str {
    entry
        .id
        .rsplit_once('-')
        .map(|(agent, _)| agent)
        .unwrap_or(entry.id.as_str())
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
