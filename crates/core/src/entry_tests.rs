// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::{AgentId, AgentKind, LogLevel};
use chrono::TimeZone;

fn entry(message: &str) -> LogEntry {
    LogEntry::new(
        "cursor-0".to_string(),
        chrono::Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
        LogLevel::Info,
        message,
        "cursor-main.log",
        AgentKind::Cursor,
        "session-cursor",
        message,
    )
}

#[test]
fn constructor_trims_trailing_newline() {
    assert_eq!(entry("hello\n").message, "hello");
    assert_eq!(entry("hello\r\n").message, "hello");
    assert_eq!(entry("hello").message, "hello");
}

#[test]
fn constructor_preserves_raw() {
    assert_eq!(entry("hello\n").raw, "hello\n");
}

#[test]
fn with_meta_accumulates() {
    let e = entry("x")
        .with_meta("mcpServer", serde_json::json!("memory"))
        .with_meta("clientId", serde_json::json!(7));
    assert_eq!(e.metadata.len(), 2);
    assert_eq!(e.metadata["mcpServer"], "memory");
}

#[test]
fn default_session_includes_agent_id() {
    assert_eq!(
        LogEntry::default_session(&AgentId::new("gemini-cli")),
        "session-gemini-cli"
    );
}

#[test]
fn serde_round_trip() {
    let e = entry("payload").with_meta("isVSCodeExtension", serde_json::json!(true));
    let json = serde_json::to_string(&e).unwrap();
    let back: LogEntry = serde_json::from_str(&json).unwrap();
    assert_eq!(back, e);
}

#[test]
fn empty_metadata_is_not_serialized() {
    let json = serde_json::to_string(&entry("x")).unwrap();
    assert!(!json.contains("metadata"));
}
