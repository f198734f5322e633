// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn load_missing_file_is_none() {
    let dir = tempfile::tempdir().unwrap();
    let persist = FilePersistence::new(dir.path().join("forwarders.json"));
    assert!(persist.load().unwrap().is_none());
}

#[test]
fn save_then_load_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let persist = FilePersistence::new(dir.path().join("forwarders.json"));
    persist.save_atomic("[\"a\",\"b\"]").unwrap();
    assert_eq!(persist.load().unwrap().as_deref(), Some("[\"a\",\"b\"]"));
}

#[test]
fn save_creates_parent_directories() {
    let dir = tempfile::tempdir().unwrap();
    let persist = FilePersistence::new(dir.path().join("nested/deep/state.json"));
    persist.save_atomic("{}").unwrap();
    assert_eq!(persist.load().unwrap().as_deref(), Some("{}"));
}

#[test]
fn save_leaves_no_temp_files() {
    let dir = tempfile::tempdir().unwrap();
    let persist = FilePersistence::new(dir.path().join("state.json"));
    persist.save_atomic("one").unwrap();
    persist.save_atomic("two").unwrap();

    let leftovers: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter(|n| n.contains(".tmp"))
        .collect();
    assert!(leftovers.is_empty(), "temp litter: {leftovers:?}");
    assert_eq!(persist.load().unwrap().as_deref(), Some("two"));
}

#[test]
fn overwrite_is_atomic_content_swap() {
    let dir = tempfile::tempdir().unwrap();
    let persist = FilePersistence::new(dir.path().join("state.json"));
    persist.save_atomic("first").unwrap();
    persist.save_atomic("second").unwrap();
    assert_eq!(persist.load().unwrap().as_deref(), Some("second"));
}

#[test]
fn quarantine_moves_contents_to_bak() {
    let dir = tempfile::tempdir().unwrap();
    let persist = FilePersistence::new(dir.path().join("state.json"));
    persist.save_atomic("not json {{{").unwrap();

    persist.quarantine().unwrap();

    assert!(persist.load().unwrap().is_none(), "state starts fresh");
    assert_eq!(
        std::fs::read_to_string(dir.path().join("state.bak")).unwrap(),
        "not json {{{"
    );
}

#[test]
fn quarantine_without_a_file_is_a_noop() {
    let dir = tempfile::tempdir().unwrap();
    let persist = FilePersistence::new(dir.path().join("state.json"));
    persist.quarantine().unwrap();
}

#[test]
fn repeated_quarantines_rotate_and_cap_backups() {
    let dir = tempfile::tempdir().unwrap();
    let persist = FilePersistence::new(dir.path().join("state.json"));

    for n in 0..5 {
        persist.save_atomic(&format!("bad {n}")).unwrap();
        persist.quarantine().unwrap();
    }

    // Newest first: .bak, .bak.2, .bak.3; older backups rotated out.
    assert_eq!(
        std::fs::read_to_string(dir.path().join("state.bak")).unwrap(),
        "bad 4"
    );
    assert_eq!(
        std::fs::read_to_string(dir.path().join("state.bak.2")).unwrap(),
        "bad 3"
    );
    assert_eq!(
        std::fs::read_to_string(dir.path().join("state.bak.3")).unwrap(),
        "bad 2"
    );
    assert!(!dir.path().join("state.bak.4").exists());
}

#[test]
fn memory_adapter_round_trips() {
    let persist = MemoryPersistence::new();
    assert!(persist.load().unwrap().is_none());
    persist.save_atomic("hello").unwrap();
    assert_eq!(persist.load().unwrap().as_deref(), Some("hello"));
    assert_eq!(persist.contents().as_deref(), Some("hello"));

    persist.quarantine().unwrap();
    assert!(persist.load().unwrap().is_none());
}
