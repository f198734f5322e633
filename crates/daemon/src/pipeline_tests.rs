// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use mcplog_tail::parsers::{LineParser, ParseContext, VsCodeParser};
use mcplog_tail::{EntryPublisher, TailerOptions};

fn registry() -> (WatcherRegistry, tokio::sync::mpsc::Receiver<LogEntry>) {
    let (publisher, entry_rx) = EntryPublisher::new(256);
    let (control_tx, _control_rx) = mpsc::channel(16);
    (
        WatcherRegistry::new(
            publisher,
            control_tx,
            TailerOptions {
                poll_interval: Duration::from_millis(30),
                force_poll: false,
                max_errors: 5,
            },
        ),
        entry_rx,
    )
}

#[tokio::test]
async fn attach_agents_handles_files_and_directories() {
    let dir = tempfile::tempdir().unwrap();
    let file_path = dir.path().join("direct.log");
    std::fs::write(&file_path, "one\n").unwrap();
    let tree_root = dir.path().join("logs");
    std::fs::create_dir_all(&tree_root).unwrap();
    std::fs::write(tree_root.join("nested.log"), "two\n").unwrap();

    let mut file_agent = AgentConfig::new(
        "direct",
        "Direct",
        AgentKind::Custom("direct".to_string()),
    );
    file_agent.log_paths = vec![file_path];
    let mut dir_agent = AgentConfig::new(
        "nested",
        "Nested",
        AgentKind::Custom("nested".to_string()),
    );
    dir_agent.log_paths = vec![tree_root];

    let (registry, mut entries) = registry();
    let resolver = PathResolver::with_roots(dir.path().to_path_buf(), None);
    let shutdowns = attach_agents(
        &registry,
        &resolver,
        &[file_agent, dir_agent],
        Duration::from_millis(30),
    );
    assert_eq!(shutdowns.len(), 1, "one tree watcher for the directory");

    let mut messages = Vec::new();
    for _ in 0..2 {
        let entry = tokio::time::timeout(Duration::from_secs(3), entries.recv())
            .await
            .expect("entry within deadline")
            .unwrap();
        messages.push(entry.message);
    }
    messages.sort();
    assert_eq!(messages, vec!["one", "two"]);
}

#[tokio::test]
async fn disabled_agents_are_not_attached() {
    let dir = tempfile::tempdir().unwrap();
    let file_path = dir.path().join("direct.log");
    std::fs::write(&file_path, "one\n").unwrap();

    let mut agent = AgentConfig::new("off", "Off", AgentKind::Custom("off".to_string()));
    agent.log_paths = vec![file_path];
    agent.enabled = false;

    let (registry, _entries) = registry();
    let resolver = PathResolver::with_roots(dir.path().to_path_buf(), None);
    attach_agents(&registry, &resolver, &[agent], Duration::from_millis(30));
    assert!(registry.is_empty());
}

#[test]
fn seed_mock_logs_creates_both_fixtures() {
    let dir = tempfile::tempdir().unwrap();
    let mock_dir = dir.path().join("mock");
    seed_mock_logs(&mock_dir).unwrap();

    assert!(mock_dir.join("claude.log").is_file());
    assert_eq!(
        std::fs::read_to_string(mock_dir.join("mcp-logs-mock/server.txt")).unwrap(),
        "[]"
    );

    // Idempotent: existing content is preserved.
    std::fs::write(mock_dir.join("claude.log"), "kept\n").unwrap();
    seed_mock_logs(&mock_dir).unwrap();
    assert_eq!(
        std::fs::read_to_string(mock_dir.join("claude.log")).unwrap(),
        "kept\n"
    );
}

/// Parsing an editor line and re-emitting it as RFC5424 preserves the
/// parsed timestamp, the mapped severity, and the message.
#[test]
fn vscode_entry_round_trips_through_rfc5424() {
    let ctx = ParseContext::new(
        mcplog_core::AgentId::new("vscode"),
        AgentKind::VsCode,
        "/logs/exthost.log".into(),
    );
    let entry = VsCodeParser::new()
        .parse("2025-03-04 10:20:30.400 [warning] renderer stalled", &ctx)
        .unwrap();

    let mut forwarder = mcplog_relay::ForwarderConfig::new("f", "collector", 514);
    forwarder.facility = 16;
    forwarder.metadata.hostname = Some("host".to_string());
    forwarder.metadata.app_name = Some("app".to_string());

    let identity = mcplog_relay::syslog::FrameIdentity::resolve(&forwarder);
    let frame = mcplog_relay::syslog::render(&forwarder, &identity, &entry);
    assert_eq!(
        frame,
        format!(
            "<132>1 2025-03-04T10:20:30.400Z host app {} - - renderer stalled",
            std::process::id()
        )
    );
}
