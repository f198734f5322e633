// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use chrono::TimeZone;
use mcplog_core::AgentKind;

fn sample_entry() -> LogEntry {
    LogEntry::new(
        "cursor-3".to_string(),
        Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap(),
        LogLevel::Warn,
        "slow response",
        "cursor-window1.log",
        AgentKind::Cursor,
        "session-cursor",
        "[WARN] slow response",
    )
}

#[test]
fn row_mirrors_entry_columns() {
    let row = LogEntryRow::from(sample_entry());
    assert_eq!(row.log_id, "cursor-3");
    assert_eq!(row.source_id, "cursor-window1.log");
    assert_eq!(row.level, LogLevel::Warn);
    assert_eq!(row.agent_type, "cursor");
    assert_eq!(row.raw_log, "[WARN] slow response");
}

#[test]
fn empty_metadata_becomes_empty_json_object() {
    let row = LogEntryRow::from(sample_entry());
    assert_eq!(row.metadata, "{}");
}

#[test]
fn metadata_serializes_to_json_string_column() {
    let entry = sample_entry().with_meta("mcpServer", serde_json::json!("memory"));
    let row = LogEntryRow::from(entry);
    let parsed: serde_json::Value = serde_json::from_str(&row.metadata).unwrap();
    assert_eq!(parsed["mcpServer"], "memory");
}

#[test]
fn custom_agent_type_keeps_prefix() {
    let mut entry = sample_entry();
    entry.agent_type = AgentKind::Custom("mytool".to_string());
    assert_eq!(LogEntryRow::from(entry).agent_type, "custom-mytool");
}
