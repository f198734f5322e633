// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Parser for VS Code extension-host log lines:
//! `2025-01-01 12:00:00.123 [info] message`.

use super::basic::BasicLineParser;
use super::{LineParser, ParseContext};
use chrono::{DateTime, NaiveDateTime, Utc};
use mcplog_core::{LogEntry, LogLevel};
use regex::Regex;
use std::sync::OnceLock;

#[allow(clippy::unwrap_used)] // pattern is a compile-time constant
fn line_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2}\.\d{3}) \[(\w+)\] (.+)$").unwrap()
    })
}

/// Parse the editor timestamp format as UTC.
pub(crate) fn parse_editor_timestamp(s: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.3f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Map the editor's level names onto the canonical set.
pub(crate) fn map_editor_level(name: &str) -> LogLevel {
    match name.to_ascii_lowercase().as_str() {
        "trace" | "debug" => LogLevel::Debug,
        "warning" => LogLevel::Warn,
        "critical" => LogLevel::Fatal,
        other => other.parse().unwrap_or(LogLevel::Info),
    }
}

/// Pulls MCP-related facts out of extension log messages.
///
/// Kept separate from the line parser so metadata rules are unit-testable
/// without any file I/O.
pub(crate) struct McpMetadataExtractor {
    port_re: Regex,
    client_re: Regex,
}

impl McpMetadataExtractor {
    #[allow(clippy::unwrap_used)] // patterns are compile-time constants
    pub(crate) fn new() -> Self {
        Self {
            port_re: Regex::new(r"MCP Server running on port (\d+)").unwrap(),
            client_re: Regex::new(r"client_(\d+)").unwrap(),
        }
    }

    pub(crate) fn extract(&self, message: &str) -> serde_json::Map<String, serde_json::Value> {
        let mut meta = serde_json::Map::new();

        if let Some(caps) = self.port_re.captures(message) {
            if let Ok(port) = caps[1].parse::<u16>() {
                meta.insert("mcpServerPort".to_string(), serde_json::json!(port));
            }
        }
        if message.contains("New WS connection") {
            meta.insert("wsEvent".to_string(), serde_json::json!("connected"));
        } else if message.contains("WS client disconnected") {
            meta.insert("wsEvent".to_string(), serde_json::json!("disconnected"));
        }
        if message.contains("MCP server connected to transport") {
            meta.insert("transportConnected".to_string(), serde_json::json!(true));
        }
        if message.contains("diagnostic stream") {
            meta.insert("diagnosticStream".to_string(), serde_json::json!(true));
        }
        if let Some(caps) = self.client_re.captures(message) {
            meta.insert("clientId".to_string(), serde_json::json!(caps[1].to_string()));
        }
        if message.contains("run_claude_command") {
            meta.insert("claudeCommand".to_string(), serde_json::json!(true));
        }
        meta
    }
}

pub struct VsCodeParser {
    extractor: McpMetadataExtractor,
    fallback: BasicLineParser,
}

impl Default for VsCodeParser {
    fn default() -> Self {
        Self::new()
    }
}

impl VsCodeParser {
    pub fn new() -> Self {
        Self {
            extractor: McpMetadataExtractor::new(),
            fallback: BasicLineParser,
        }
    }
}

impl LineParser for VsCodeParser {
    fn parse(&self, line: &str, ctx: &ParseContext) -> Option<LogEntry> {
        let trimmed = line.trim();
        let Some(caps) = line_re().captures(trimmed) else {
            return self.fallback.parse(line, ctx);
        };
        let Some(timestamp) = parse_editor_timestamp(&caps[1]) else {
            return self.fallback.parse(line, ctx);
        };
        let level = map_editor_level(&caps[2]);
        let message = caps[3].to_string();

        let mut entry = LogEntry::new(
            ctx.next_id(),
            timestamp,
            level,
            message.as_str(),
            ctx.source(),
            ctx.agent_kind.clone(),
            ctx.default_session(),
            line,
        )
        .with_meta("isVSCodeExtension", serde_json::json!(true));
        for (key, value) in self.extractor.extract(&message) {
            entry.metadata.insert(key, value);
        }
        Some(entry)
    }
}

#[cfg(test)]
#[path = "vscode_tests.rs"]
mod tests;
