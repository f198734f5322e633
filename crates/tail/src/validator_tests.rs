// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::publish::EntryPublisher;
use crate::registry::WatcherRegistry;
use crate::tailer::TailerOptions;
use mcplog_core::{AgentConfig, AgentKind, LogFormat};
use tokio::sync::mpsc;

fn setup() -> (
    WatcherRegistry,
    mpsc::Sender<ControlEvent>,
    mpsc::Receiver<ControlEvent>,
) {
    let (publisher, _entry_rx) = EntryPublisher::new(64);
    let (control_tx, control_rx) = mpsc::channel(16);
    let registry = WatcherRegistry::new(
        publisher,
        control_tx.clone(),
        TailerOptions {
            poll_interval: Duration::from_secs(60),
            force_poll: false,
            max_errors: 5,
        },
    );
    (registry, control_tx, control_rx)
}

fn agent() -> AgentConfig {
    let mut config = AgentConfig::new("a", "A", AgentKind::ClaudeDesktop);
    config.log_format = LogFormat::Text;
    config
}

#[tokio::test]
async fn sweep_reports_and_evicts_dead_paths() {
    let dir = tempfile::tempdir().unwrap();
    let (registry, control_tx, mut control_rx) = setup();

    let mut paths = Vec::new();
    for name in ["a.log", "b.log", "c.log"] {
        let path = dir.path().join(name);
        std::fs::write(&path, "x\n").unwrap();
        registry.attach(&agent(), &path, false);
        paths.push(path);
    }

    std::fs::remove_file(&paths[1]).unwrap();

    let validator = PathValidator::new(registry.clone(), control_tx, DEFAULT_INTERVAL);
    let report = validator.run_once().await;

    assert_eq!(report.valid_count, 2);
    assert_eq!(report.invalid_count, 1);
    assert_eq!(registry.len(), 2);
    assert!(registry.status(&paths[1]).is_none());

    let event = control_rx.recv().await.unwrap();
    match event {
        ControlEvent::PathRemoved { reason, .. } => assert_eq!(reason, "path-invalid"),
        other => panic!("unexpected control event: {other:?}"),
    }
}

#[tokio::test]
async fn sweep_with_all_paths_valid_is_quiet() {
    let dir = tempfile::tempdir().unwrap();
    let (registry, control_tx, mut control_rx) = setup();

    let path = dir.path().join("a.log");
    std::fs::write(&path, "x\n").unwrap();
    registry.attach(&agent(), &path, false);

    let validator = PathValidator::new(registry.clone(), control_tx, DEFAULT_INTERVAL);
    let report = validator.run_once().await;

    assert_eq!(report.valid_count, 1);
    assert_eq!(report.invalid_count, 0);
    assert_eq!(registry.len(), 1);
    assert!(control_rx.try_recv().is_err());
}
