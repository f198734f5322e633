// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::parsers::test_support::ctx;
use chrono::TimeZone;
use mcplog_core::AgentKind;

fn vscode_ctx() -> ParseContext {
    ctx("vscode", AgentKind::VsCode, "/logs/20250101T090000/exthost.log")
}

#[test]
fn parses_timestamp_level_and_message() {
    let entry = VsCodeParser::new()
        .parse(
            "2025-01-01 12:30:45.123 [info] Extension activated",
            &vscode_ctx(),
        )
        .unwrap();

    assert_eq!(
        entry.timestamp,
        chrono::Utc
            .with_ymd_and_hms(2025, 1, 1, 12, 30, 45)
            .unwrap()
            + chrono::Duration::milliseconds(123)
    );
    assert_eq!(entry.level, LogLevel::Info);
    assert_eq!(entry.message, "Extension activated");
    assert_eq!(entry.metadata["isVSCodeExtension"], serde_json::json!(true));
}

#[yare::parameterized(
    trace    = { "trace", LogLevel::Debug },
    debug    = { "debug", LogLevel::Debug },
    warning  = { "warning", LogLevel::Warn },
    critical = { "critical", LogLevel::Fatal },
    error    = { "error", LogLevel::Error },
    info     = { "info", LogLevel::Info },
    unknown  = { "verbose", LogLevel::Info },
)]
fn editor_level_mapping(name: &str, expected: LogLevel) {
    assert_eq!(map_editor_level(name), expected);
}

#[test]
fn extracts_mcp_server_port() {
    let entry = VsCodeParser::new()
        .parse(
            "2025-01-01 12:00:00.000 [info] MCP Server running on port 8123",
            &vscode_ctx(),
        )
        .unwrap();
    assert_eq!(entry.metadata["mcpServerPort"], serde_json::json!(8123));
}

#[test]
fn extracts_websocket_events() {
    let parser = VsCodeParser::new();
    let connect = parser
        .parse(
            "2025-01-01 12:00:00.000 [info] New WS connection from 127.0.0.1",
            &vscode_ctx(),
        )
        .unwrap();
    assert_eq!(connect.metadata["wsEvent"], serde_json::json!("connected"));

    let disconnect = parser
        .parse(
            "2025-01-01 12:00:01.000 [info] WS client disconnected",
            &vscode_ctx(),
        )
        .unwrap();
    assert_eq!(
        disconnect.metadata["wsEvent"],
        serde_json::json!("disconnected")
    );
}

#[test]
fn extracts_transport_client_and_claude_command() {
    let parser = VsCodeParser::new();
    let entry = parser
        .parse(
            "2025-01-01 12:00:00.000 [debug] MCP server connected to transport, diagnostic stream for client_42 run_claude_command",
            &vscode_ctx(),
        )
        .unwrap();
    assert_eq!(entry.metadata["transportConnected"], serde_json::json!(true));
    assert_eq!(entry.metadata["diagnosticStream"], serde_json::json!(true));
    assert_eq!(entry.metadata["clientId"], serde_json::json!("42"));
    assert_eq!(entry.metadata["claudeCommand"], serde_json::json!(true));
}

#[test]
fn falls_back_to_basic_line_on_no_match() {
    let entry = VsCodeParser::new()
        .parse("plain text error line", &vscode_ctx())
        .unwrap();
    assert_eq!(entry.level, LogLevel::Error);
    assert_eq!(entry.message, "plain text error line");
    assert!(entry.metadata.get("isVSCodeExtension").is_none());
}

#[test]
fn round_trip_preserves_parsed_timestamp() {
    let entry = VsCodeParser::new()
        .parse("2025-06-15 08:00:00.500 [warning] slow frame", &vscode_ctx())
        .unwrap();
    let json = serde_json::to_string(&entry).unwrap();
    let back: LogEntry = serde_json::from_str(&json).unwrap();
    assert_eq!(back.timestamp, entry.timestamp);
    assert_eq!(back.level, LogLevel::Warn);
}
