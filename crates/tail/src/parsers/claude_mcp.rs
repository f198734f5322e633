// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Whole-document parser for Claude CLI MCP cache files.
//!
//! These files hold a single JSON document, usually an array of event
//! objects, rewritten in place by the CLI. One entry is emitted per array
//! element; a bare object yields one entry.

use super::ParseContext;
use chrono::{DateTime, Utc};
use mcplog_core::{LogEntry, LogLevel};
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;
use tracing::warn;

#[allow(clippy::unwrap_used)] // pattern is a compile-time constant
fn server_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"mcp-logs-([^/]+)").unwrap())
}

/// Extract the MCP server name from a cache path
/// (`.../mcp-logs-<server>/file.txt`).
pub fn server_from_path(path: &Path) -> Option<String> {
    let text = path.to_string_lossy();
    server_re().captures(&text).map(|caps| caps[1].to_string())
}

/// Parse a whole document, emitting entries for elements at index
/// `skip` and beyond. Returns the entries and the total element count
/// (1 for a bare object).
pub fn parse_document(doc: &str, ctx: &ParseContext, skip: usize) -> (Vec<LogEntry>, usize) {
    let value: serde_json::Value = match serde_json::from_str(doc.trim()) {
        Ok(v) => v,
        Err(e) => {
            warn!(path = %ctx.path.display(), error = %e, "unparseable MCP log document, dropping");
            return (Vec::new(), skip);
        }
    };

    let server = server_from_path(&ctx.path);
    match value {
        serde_json::Value::Array(elements) => {
            let total = elements.len();
            let entries = elements
                .into_iter()
                .skip(skip)
                .map(|element| entry_from_value(element, ctx, server.as_deref()))
                .collect();
            (entries, total)
        }
        other => {
            if skip >= 1 {
                return (Vec::new(), 1);
            }
            (vec![entry_from_value(other, ctx, server.as_deref())], 1)
        }
    }
}

fn entry_from_value(
    value: serde_json::Value,
    ctx: &ParseContext,
    server: Option<&str>,
) -> LogEntry {
    let get_str = |key: &str| value.get(key).and_then(|v| v.as_str());

    let level = if value.get("error").is_some() {
        LogLevel::Error
    } else {
        LogLevel::Info
    };
    let message = get_str("error")
        .or_else(|| get_str("message"))
        .or_else(|| get_str("event"))
        .map(String::from)
        .unwrap_or_else(|| value.to_string());
    let timestamp = get_str("timestamp")
        .and_then(parse_timestamp)
        .unwrap_or_else(Utc::now);
    let session_id = get_str("sessionId")
        .map(String::from)
        .unwrap_or_else(|| ctx.default_session());
    let source = match server {
        Some(server) => format!("claude-mcp-{server}"),
        None => ctx.source(),
    };
    let raw = value.to_string();

    let mut entry = LogEntry::new(
        ctx.next_id(),
        timestamp,
        level,
        message,
        source,
        ctx.agent_kind.clone(),
        session_id,
        raw,
    );
    if let Some(server) = server {
        entry
            .metadata
            .insert("mcpServer".to_string(), serde_json::json!(server));
    }
    entry
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
#[path = "claude_mcp_tests.rs"]
mod tests;
