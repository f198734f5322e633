// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent source configuration: kind, log format, and discovered config.

use crate::id::AgentId;
use crate::level::LogLevel;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// The class of a log-producing agent.
///
/// Serializes as the wire strings `claude-desktop`, `claude-code`,
/// `claude-mcp`, `cursor`, `vscode`, `gemini-cli`, `custom-<name>`,
/// `mock-<name>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AgentKind {
    ClaudeDesktop,
    ClaudeCode,
    ClaudeMcp,
    Cursor,
    VsCode,
    GeminiCli,
    Custom(String),
    Mock(String),
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgentKind::ClaudeDesktop => f.write_str("claude-desktop"),
            AgentKind::ClaudeCode => f.write_str("claude-code"),
            AgentKind::ClaudeMcp => f.write_str("claude-mcp"),
            AgentKind::Cursor => f.write_str("cursor"),
            AgentKind::VsCode => f.write_str("vscode"),
            AgentKind::GeminiCli => f.write_str("gemini-cli"),
            AgentKind::Custom(name) => write!(f, "custom-{name}"),
            AgentKind::Mock(name) => write!(f, "mock-{name}"),
        }
    }
}

impl AgentKind {
    /// Parse a kind name. Never fails: unknown names become `Custom`.
    pub fn parse(s: &str) -> Self {
        match s {
            "claude-desktop" => AgentKind::ClaudeDesktop,
            "claude-code" => AgentKind::ClaudeCode,
            "claude-mcp" => AgentKind::ClaudeMcp,
            "cursor" => AgentKind::Cursor,
            "vscode" => AgentKind::VsCode,
            "gemini-cli" => AgentKind::GeminiCli,
            other => {
                if let Some(name) = other.strip_prefix("mock-") {
                    AgentKind::Mock(name.to_string())
                } else if let Some(name) = other.strip_prefix("custom-") {
                    AgentKind::Custom(name.to_string())
                } else {
                    AgentKind::Custom(other.to_string())
                }
            }
        }
    }
}

impl FromStr for AgentKind {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl Serialize for AgentKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for AgentKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(AgentKind::parse(&s))
    }
}

/// On-disk format of an agent's log files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LogFormat {
    #[serde(rename = "text")]
    Text,
    #[serde(rename = "structured")]
    Structured,
    #[serde(rename = "json")]
    Json,
    #[serde(rename = "vscode-extension")]
    VsCodeExtension,
    #[serde(rename = "claude-mcp-json")]
    ClaudeMcpJson,
    #[serde(rename = "mixed")]
    Mixed,
}

impl LogFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogFormat::Text => "text",
            LogFormat::Structured => "structured",
            LogFormat::Json => "json",
            LogFormat::VsCodeExtension => "vscode-extension",
            LogFormat::ClaudeMcpJson => "claude-mcp-json",
            LogFormat::Mixed => "mixed",
        }
    }

    /// Formats accepted for user-defined agents (the config-store contract).
    pub const CUSTOM_ALLOWED: [LogFormat; 5] = [
        LogFormat::Text,
        LogFormat::Json,
        LogFormat::Structured,
        LogFormat::VsCodeExtension,
        LogFormat::ClaudeMcpJson,
    ];
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(LogFormat::Text),
            "structured" => Ok(LogFormat::Structured),
            "json" => Ok(LogFormat::Json),
            "vscode-extension" => Ok(LogFormat::VsCodeExtension),
            "claude-mcp-json" => Ok(LogFormat::ClaudeMcpJson),
            "mixed" => Ok(LogFormat::Mixed),
            other => Err(format!("unknown log format: {other}")),
        }
    }
}

/// A discovered or user-defined log source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    pub id: AgentId,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: AgentKind,
    pub enabled: bool,
    /// Absolute paths, each a file or directory. Non-empty when enabled.
    pub log_paths: Vec<PathBuf>,
    pub log_format: LogFormat,
    /// Levels to retain; empty retains all.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub level_filters: Vec<LogLevel>,
    /// `isWSL`, `confidence`, `lastDiscovered`, `isMock`, `isCustom`, ...
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub metadata: serde_json::Map<String, serde_json::Value>,
    /// True when produced by auto-discovery, false when user-defined.
    pub auto_discovery: bool,
}

impl AgentConfig {
    pub fn new(id: impl Into<AgentId>, name: impl Into<String>, kind: AgentKind) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            enabled: true,
            log_paths: Vec::new(),
            log_format: LogFormat::Text,
            level_filters: Vec::new(),
            metadata: serde_json::Map::new(),
            auto_discovery: true,
        }
    }

    /// Whether an entry at `level` passes this agent's level filters.
    pub fn retains_level(&self, level: LogLevel) -> bool {
        self.level_filters.is_empty() || self.level_filters.contains(&level)
    }

    pub fn set_meta(&mut self, key: &str, value: serde_json::Value) {
        self.metadata.insert(key.to_string(), value);
    }
}

#[cfg(test)]
#[path = "agent_tests.rs"]
mod tests;
