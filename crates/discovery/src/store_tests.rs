// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn custom_config(name: &str, path: &std::path::Path) -> AgentConfig {
    let mut config = AgentConfig::new(
        uuid::Uuid::new_v4().to_string(),
        name,
        AgentKind::Custom("mine".to_string()),
    );
    config.log_paths = vec![path.to_path_buf()];
    config.log_format = LogFormat::Text;
    config.auto_discovery = false;
    config
}

#[tokio::test]
async fn add_then_list_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileCustomAgentStore::open(dir.path().join("agents.json")).unwrap();

    let config = custom_config("my-agent", &dir.path().join("my.log"));
    store.add_custom(&config, Some("u1".to_string())).unwrap();

    let listed = store.list_custom_agents().await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, config.id);
    assert_eq!(listed[0].name, "my-agent");
    assert_eq!(listed[0].metadata["isCustom"], serde_json::json!(true));
}

#[tokio::test]
async fn corrupt_store_file_is_quarantined_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("agents.json");
    std::fs::write(&path, "not json {{{").unwrap();

    let store = FileCustomAgentStore::open(&path).unwrap();
    assert!(store.list_custom_agents().await.unwrap().is_empty());
    assert_eq!(
        std::fs::read_to_string(dir.path().join("agents.bak")).unwrap(),
        "not json {{{"
    );

    // The store is usable after starting fresh.
    let config = custom_config("recovered", &dir.path().join("r.log"));
    store.add_custom(&config, None).unwrap();
    assert_eq!(store.list_custom_agents().await.unwrap().len(), 1);
}

#[tokio::test]
async fn rows_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("agents.json");
    {
        let store = FileCustomAgentStore::open(&path).unwrap();
        let config = custom_config("persisted", &dir.path().join("a.log"));
        store.add_custom(&config, None).unwrap();
    }
    let store = FileCustomAgentStore::open(&path).unwrap();
    assert_eq!(store.list_custom_agents().await.unwrap().len(), 1);
}

#[test]
fn empty_log_paths_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileCustomAgentStore::open(dir.path().join("agents.json")).unwrap();

    let mut config = custom_config("empty", &dir.path().join("a.log"));
    config.log_paths.clear();
    let err = store.add_custom(&config, None).unwrap_err();
    assert!(matches!(err, StoreAdapterError::EmptyLogPaths { .. }));
}

#[test]
fn mixed_format_rejected_for_custom_agents() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileCustomAgentStore::open(dir.path().join("agents.json")).unwrap();

    let mut config = custom_config("mixed", &dir.path().join("a.log"));
    config.log_format = LogFormat::Mixed;
    let err = store.add_custom(&config, None).unwrap_err();
    assert!(matches!(err, StoreAdapterError::DisallowedFormat { .. }));
}

#[test]
fn duplicate_name_per_user_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileCustomAgentStore::open(dir.path().join("agents.json")).unwrap();

    let first = custom_config("dup", &dir.path().join("a.log"));
    let second = custom_config("dup", &dir.path().join("b.log"));
    store.add_custom(&first, Some("u1".to_string())).unwrap();

    let err = store.add_custom(&second, Some("u1".to_string())).unwrap_err();
    assert!(matches!(err, StoreAdapterError::DuplicateName { .. }));

    // Same name under a different user is fine.
    store.add_custom(&second, Some("u2".to_string())).unwrap();
}

#[tokio::test]
async fn upsert_discovered_is_not_listed_as_custom() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileCustomAgentStore::open(dir.path().join("agents.json")).unwrap();

    let mut discovered = custom_config("cursor", &dir.path().join("c.log"));
    discovered.auto_discovery = true;
    store.upsert_discovered(&discovered).await.unwrap();

    assert!(store.list_custom_agents().await.unwrap().is_empty());
}

#[tokio::test]
async fn upsert_discovered_replaces_existing_row() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileCustomAgentStore::open(dir.path().join("agents.json")).unwrap();

    let mut discovered = custom_config("cursor", &dir.path().join("c.log"));
    discovered.auto_discovery = true;
    store.upsert_discovered(&discovered).await.unwrap();

    let mut updated = discovered.clone();
    updated.log_paths = vec![dir.path().join("d.log")];
    store.upsert_discovered(&updated).await.unwrap();

    // Only one row persisted.
    let contents = std::fs::read_to_string(dir.path().join("agents.json")).unwrap();
    let rows: serde_json::Value = serde_json::from_str(&contents).unwrap();
    assert_eq!(rows.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn noop_store_is_empty_and_accepts_upserts() {
    let store = NoOpCustomAgentStore;
    assert!(store.list_custom_agents().await.unwrap().is_empty());
    let config = custom_config("x", std::path::Path::new("/tmp/x.log"));
    store.upsert_discovered(&config).await.unwrap();
}
