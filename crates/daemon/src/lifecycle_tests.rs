// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn layout_is_rooted_at_the_state_dir() {
    let config = Config::under(PathBuf::from("/var/state/mcplog"));
    assert_eq!(config.lock_path, PathBuf::from("/var/state/mcplog/daemon.pid"));
    assert_eq!(
        config.forwarders_path,
        PathBuf::from("/var/state/mcplog/syslog-forwarders.json")
    );
    assert_eq!(config.spool_dir, PathBuf::from("/var/state/mcplog/spool"));
    assert_eq!(config.hub_addr_path, PathBuf::from("/var/state/mcplog/hub.addr"));
}

#[test]
fn lock_is_exclusive() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::under(dir.path().to_path_buf());
    std::fs::create_dir_all(&config.state_dir).unwrap();

    let first = acquire_lock(&config).unwrap();
    let second = acquire_lock(&config);
    assert!(matches!(second, Err(LifecycleError::LockFailed(_))));

    drop(first);
    acquire_lock(&config).unwrap();
}

#[test]
fn lock_file_records_the_pid() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::under(dir.path().to_path_buf());
    std::fs::create_dir_all(&config.state_dir).unwrap();

    let _lock = acquire_lock(&config).unwrap();
    let recorded = std::fs::read_to_string(&config.lock_path).unwrap();
    assert_eq!(recorded, std::process::id().to_string());
}

#[tokio::test]
async fn startup_and_shutdown_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::under(dir.path().to_path_buf());

    let daemon = startup(config.clone()).await.unwrap();
    assert!(config.version_path.exists());
    assert!(config.hub_addr_path.exists());

    // The hub address file matches the bound listener.
    let advertised = std::fs::read_to_string(&config.hub_addr_path).unwrap();
    assert_eq!(advertised, daemon.hub_addr.to_string());

    // A second instance cannot start while the first holds the lock.
    match startup(config.clone()).await {
        Err(LifecycleError::LockFailed(_)) => {}
        other => panic!("expected lock failure, got {:?}", other.map(|_| ())),
    }

    shutdown(daemon).await;
}

#[tokio::test]
async fn entries_flow_to_spool_and_subscribers() {
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

    let dir = tempfile::tempdir().unwrap();
    let config = Config::under(dir.path().to_path_buf());

    // A custom agent watching a local file, registered before startup.
    let log_path = dir.path().join("app.log");
    std::fs::write(&log_path, "").unwrap();
    let store = mcplog_discovery::FileCustomAgentStore::open(&config.custom_agents_path).unwrap();
    let mut agent = mcplog_core::AgentConfig::new(
        "custom-app",
        "App Under Test",
        mcplog_core::AgentKind::Custom("app".to_string()),
    );
    agent.log_paths = vec![log_path.clone()];
    agent.log_format = mcplog_core::LogFormat::Text;
    agent.auto_discovery = false;
    store.add_custom(&agent, None).unwrap();
    drop(store);

    let daemon = startup(config.clone()).await.unwrap();

    // Subscribe to the logs channel.
    let stream = tokio::net::TcpStream::connect(daemon.hub_addr).await.unwrap();
    let (read, mut write) = stream.into_split();
    write
        .write_all(b"{\"type\":\"subscribe\",\"channels\":[\"logs\"]}\n")
        .await
        .unwrap();
    let mut lines = BufReader::new(read).lines();

    // Wait for the subscription to register, then produce a log line.
    for _ in 0..100 {
        if daemon.hub.client_count() == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    use std::io::Write as _;
    let mut file = std::fs::OpenOptions::new().append(true).open(&log_path).unwrap();
    writeln!(file, "ERROR something broke").unwrap();

    // Hosts running the test may have real agents discovered too; wait
    // for our specific entry.
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    let frame = loop {
        let line = tokio::time::timeout_at(deadline, lines.next_line())
            .await
            .expect("frame within deadline")
            .unwrap()
            .expect("connection open");
        let frame: serde_json::Value = serde_json::from_str(&line).unwrap();
        if frame["type"] == "log-entry" && frame["data"]["message"] == "ERROR something broke" {
            break frame;
        }
    };
    assert_eq!(frame["data"]["level"], "error");
    assert!(frame["data"]["source"]
        .as_str()
        .unwrap()
        .ends_with("app.log"));

    shutdown(daemon).await;

    // The entry reached the spool as well.
    use mcplog_storage::LogStore;
    let spool = SpoolStore::open(&config.spool_dir).unwrap();
    let filter = mcplog_storage::LogFilter {
        source_ids: vec!["custom-app-app.log".to_string()],
        ..mcplog_storage::LogFilter::default()
    };
    let count = spool.count(&filter).await.unwrap();
    assert_eq!(count, 1);
}
