// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::publish::EntryPublisher;
use crate::registry::WatcherRegistry;
use crate::tailer::TailerOptions;
use mcplog_core::{AgentConfig, LogFormat};
use std::time::Duration;
use tokio::sync::mpsc;

fn registry() -> (WatcherRegistry, mpsc::Receiver<mcplog_core::LogEntry>) {
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

fn editor_agent() -> AgentConfig {
    let mut config = AgentConfig::new("cursor", "Cursor", AgentKind::Cursor);
    config.log_format = LogFormat::VsCodeExtension;
    config
}

fn mcp_agent() -> AgentConfig {
    let mut config = AgentConfig::new("claude-mcp", "Claude MCP", AgentKind::ClaudeMcp);
    config.log_format = LogFormat::ClaudeMcpJson;
    config
}

#[test]
fn discovers_editor_session_layout() {
    let dir = tempfile::tempdir().unwrap();
    let session = dir.path().join("20250101T090000");
    let exthost = session.join("window1/exthost/anysphere.cursor-retrieval");
    std::fs::create_dir_all(&exthost).unwrap();
    std::fs::write(session.join("main.log"), "x").unwrap();
    std::fs::write(exthost.join("Cursor MCP.log"), "x").unwrap();

    let files = discover_log_files(&AgentKind::Cursor, dir.path());
    assert!(files.contains(&session.join("main.log")));
    assert!(files.contains(&exthost.join("Cursor MCP.log")));
}

#[test]
fn discovers_session_dir_given_directly() {
    let dir = tempfile::tempdir().unwrap();
    let session = dir.path().join("20250101T090000");
    std::fs::create_dir_all(&session).unwrap();
    std::fs::write(session.join("renderer.log"), "x").unwrap();

    let files = discover_log_files(&AgentKind::VsCode, &session);
    assert_eq!(files, vec![session.join("renderer.log")]);
}

#[test]
fn discovers_claude_mcp_layout() {
    let dir = tempfile::tempdir().unwrap();
    let logs = dir.path().join("project/mcp-logs-memory");
    std::fs::create_dir_all(&logs).unwrap();
    std::fs::write(logs.join("2025.txt"), "[]").unwrap();

    // From the cache root.
    let from_root = discover_log_files(&AgentKind::ClaudeMcp, dir.path());
    assert_eq!(from_root, vec![logs.join("2025.txt")]);

    // From the mcp-logs dir itself.
    let from_dir = discover_log_files(&AgentKind::ClaudeMcp, &logs);
    assert_eq!(from_dir, vec![logs.join("2025.txt")]);
}

#[test]
fn flat_layout_for_plain_agents() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("main.log"), "x").unwrap();
    std::fs::write(dir.path().join("old.txt"), "x").unwrap();
    std::fs::write(dir.path().join("skip.json"), "x").unwrap();

    let files = discover_log_files(&AgentKind::ClaudeDesktop, dir.path());
    assert_eq!(
        files,
        vec![dir.path().join("main.log"), dir.path().join("old.txt")]
    );
}

#[tokio::test]
async fn tree_watcher_attaches_new_files() {
    let dir = tempfile::tempdir().unwrap();
    let session = dir.path().join("20250101T090000");
    std::fs::create_dir_all(&session).unwrap();
    std::fs::write(session.join("first.log"), "hello\n").unwrap();

    let (registry, mut entries) = registry();
    let watcher = TreeWatcher::new(
        registry.clone(),
        editor_agent(),
        dir.path().to_path_buf(),
        Duration::from_millis(30),
        true,
    );
    let _shutdown = watcher.spawn();

    // Initial scan picks up the existing file.
    let first = tokio::time::timeout(Duration::from_secs(3), entries.recv())
        .await
        .expect("entry within deadline")
        .unwrap();
    assert_eq!(first.message, "hello");
    assert_eq!(registry.len(), 1);

    // A new session log appears later.
    std::fs::write(session.join("second.log"), "world\n").unwrap();
    let second = tokio::time::timeout(Duration::from_secs(3), entries.recv())
        .await
        .expect("entry within deadline")
        .unwrap();
    assert_eq!(second.message, "world");
    assert_eq!(registry.len(), 2);
}

#[tokio::test]
async fn tree_watcher_attaches_mcp_files() {
    let dir = tempfile::tempdir().unwrap();
    let logs = dir.path().join("project/mcp-logs-github");
    std::fs::create_dir_all(&logs).unwrap();
    std::fs::write(logs.join("log.txt"), r#"[{"message":"hi"}]"#).unwrap();

    let (registry, mut entries) = registry();
    let watcher = TreeWatcher::new(
        registry.clone(),
        mcp_agent(),
        dir.path().to_path_buf(),
        Duration::from_millis(30),
        true,
    );
    let _shutdown = watcher.spawn();

    let entry = tokio::time::timeout(Duration::from_secs(3), entries.recv())
        .await
        .expect("entry within deadline")
        .unwrap();
    assert_eq!(entry.message, "hi");
    assert_eq!(entry.source, "claude-mcp-github");
}
