// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Parser for Cursor's extension-host MCP service logs.
//!
//! Primary form: `2025-01-01 12:00:00.123 [info] ServiceTag: message`.
//! Secondary form: `ServiceTag: message`, accepted only for tags that
//! plausibly belong to MCP tooling (`user-*`, `*mcp*`, `review-gate*`).

use super::basic::detect_level;
use super::vscode::{map_editor_level, parse_editor_timestamp, VsCodeParser};
use super::{LineParser, ParseContext};
use mcplog_core::{LogEntry, LogLevel};
use regex::Regex;
use std::sync::OnceLock;

#[allow(clippy::unwrap_used)] // pattern is a compile-time constant
fn primary_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2}\.\d{3}) \[(\w+)\] ([^:]+): (.+)$")
            .unwrap()
    })
}

#[allow(clippy::unwrap_used)] // pattern is a compile-time constant
fn secondary_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^([^:]+): (.+)$").unwrap())
}

#[allow(clippy::unwrap_used)] // pattern is a compile-time constant
fn heartbeat_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"heartbeat #(\d+)").unwrap())
}

/// Whether a bare `tag: message` line is worth attributing to MCP tooling.
// TODO: the `*mcp*` substring rule can match unrelated services; narrow to
// an allow-list once product confirms the tag set.
fn is_mcp_tag(tag: &str) -> bool {
    let lower = tag.to_lowercase();
    tag.starts_with("user-") || lower.contains("mcp") || lower.starts_with("review-gate")
}

/// Service classification from the tag.
fn mcp_service(tag: &str) -> Option<&'static str> {
    let lower = tag.to_lowercase();
    if lower.contains("memory") {
        Some("memory")
    } else if lower.contains("review") {
        Some("review")
    } else if lower.contains("retrieval") {
        Some("retrieval")
    } else {
        None
    }
}

/// Level from `[ERROR]`-style bracket tags embedded in the message.
fn bracket_level(message: &str) -> Option<LogLevel> {
    for (needle, level) in [
        ("[ERROR]", LogLevel::Error),
        ("[WARN]", LogLevel::Warn),
        ("[DEBUG]", LogLevel::Debug),
        ("[INFO]", LogLevel::Info),
    ] {
        if message.contains(needle) {
            return Some(level);
        }
    }
    None
}

/// Try to pull an embedded JSON array (`[{...}]`) out of the message.
fn embedded_json(message: &str) -> Option<serde_json::Value> {
    let start = message.find("[{")?;
    let end = message.rfind("}]")?;
    if end < start {
        return None;
    }
    serde_json::from_str(&message[start..=end + 1]).ok()
}

pub struct CursorMcpParser {
    fallback: VsCodeParser,
}

impl Default for CursorMcpParser {
    fn default() -> Self {
        Self::new()
    }
}

impl CursorMcpParser {
    pub fn new() -> Self {
        Self {
            fallback: VsCodeParser::new(),
        }
    }

    fn build_entry(
        &self,
        ctx: &ParseContext,
        line: &str,
        timestamp: chrono::DateTime<chrono::Utc>,
        level: LogLevel,
        tag: &str,
        message: &str,
    ) -> LogEntry {
        let mut entry = LogEntry::new(
            ctx.next_id(),
            timestamp,
            level,
            message,
            ctx.source(),
            ctx.agent_kind.clone(),
            ctx.default_session(),
            line,
        )
        .with_meta("mcpServer", serde_json::json!(tag.trim()));

        if let Some(service) = mcp_service(tag) {
            entry
                .metadata
                .insert("mcpService".to_string(), serde_json::json!(service));
        }
        if let Some(caps) = heartbeat_re().captures(message) {
            if let Ok(count) = caps[1].parse::<u64>() {
                entry
                    .metadata
                    .insert("heartbeatCount".to_string(), serde_json::json!(count));
            }
        }
        let lower = message.to_lowercase();
        if lower.contains("processing job") {
            entry
                .metadata
                .insert("jobProcessing".to_string(), serde_json::json!(true));
        }
        if lower.contains("queue status") {
            entry
                .metadata
                .insert("queueStatus".to_string(), serde_json::json!(true));
        }
        if let Some(embedded) = embedded_json(message) {
            entry.metadata.insert("embedded".to_string(), embedded);
        }
        entry
    }
}

impl LineParser for CursorMcpParser {
    fn parse(&self, line: &str, ctx: &ParseContext) -> Option<LogEntry> {
        let trimmed = line.trim();

        if let Some(caps) = primary_re().captures(trimmed) {
            if let Some(timestamp) = parse_editor_timestamp(&caps[1]) {
                let tag = caps[3].to_string();
                let message = caps[4].to_string();
                let level = bracket_level(&message).unwrap_or_else(|| map_editor_level(&caps[2]));
                return Some(self.build_entry(ctx, line, timestamp, level, &tag, &message));
            }
        }

        if let Some(caps) = secondary_re().captures(trimmed) {
            let tag = caps[1].to_string();
            if is_mcp_tag(&tag) {
                let message = caps[2].to_string();
                let level = bracket_level(&message).unwrap_or_else(|| detect_level(&message));
                return Some(self.build_entry(
                    ctx,
                    line,
                    chrono::Utc::now(),
                    level,
                    &tag,
                    &message,
                ));
            }
        }

        self.fallback.parse(line, ctx)
    }
}

#[cfg(test)]
#[path = "cursor_tests.rs"]
mod tests;
