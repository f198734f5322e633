// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Parser for JSON-per-line and structured logs.

use super::basic::BasicLineParser;
use super::{LineParser, ParseContext};
use chrono::{DateTime, Utc};
use mcplog_core::{LogEntry, LogLevel};

/// Fields consumed into first-class columns; everything else lands in
/// metadata.
const WELL_KNOWN: [&str; 6] = ["timestamp", "level", "msg", "message", "source", "sessionId"];

pub struct JsonParser;

impl LineParser for JsonParser {
    fn parse(&self, line: &str, ctx: &ParseContext) -> Option<LogEntry> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return None;
        }
        let Ok(serde_json::Value::Object(obj)) =
            serde_json::from_str::<serde_json::Value>(trimmed)
        else {
            // Not a JSON object; treat as plain text.
            return BasicLineParser.parse(line, ctx);
        };

        let get_str = |key: &str| obj.get(key).and_then(|v| v.as_str());

        let timestamp = get_str("timestamp")
            .and_then(parse_timestamp)
            .unwrap_or_else(Utc::now);
        let level = get_str("level")
            .and_then(|name| name.parse::<LogLevel>().ok())
            .unwrap_or(LogLevel::Info);
        let message = get_str("msg")
            .or_else(|| get_str("message"))
            .map(String::from)
            .unwrap_or_else(|| serde_json::Value::Object(obj.clone()).to_string());
        let source = get_str("source")
            .map(String::from)
            .unwrap_or_else(|| ctx.source());
        let session_id = get_str("sessionId")
            .map(String::from)
            .unwrap_or_else(|| ctx.default_session());

        let mut entry = LogEntry::new(
            ctx.next_id(),
            timestamp,
            level,
            message,
            source,
            ctx.agent_kind.clone(),
            session_id,
            line,
        );
        for (key, value) in &obj {
            if !WELL_KNOWN.contains(&key.as_str()) {
                entry.metadata.insert(key.clone(), value.clone());
            }
        }
        Some(entry)
    }
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
#[path = "json_tests.rs"]
mod tests;
