// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn counter_of(id: &str) -> u64 {
    id.rsplit_once('-').unwrap().1.parse().unwrap()
}

#[test]
fn entry_ids_are_monotonic_and_prefixed() {
    let gen = EntryIdGen::new(AgentId::new("cursor"));
    let first = gen.next();
    let second = gen.next();
    assert!(first.starts_with("cursor-"));
    assert!(second.starts_with("cursor-"));
    assert!(counter_of(&second) > counter_of(&first));
}

#[test]
fn entry_ids_are_unique_across_generators() {
    // Two generators for the same agent (a tailer and a tree watcher)
    // must never collide.
    let a = EntryIdGen::new(AgentId::new("vscode"));
    let b = EntryIdGen::new(AgentId::new("vscode"));
    let mut seen = std::collections::HashSet::new();
    for _ in 0..100 {
        assert!(seen.insert(a.next()));
        assert!(seen.insert(b.next()));
    }
}

#[test]
fn agent_id_compares_with_str() {
    let id = AgentId::new("claude-desktop");
    assert_eq!(id, "claude-desktop");
    assert_eq!(id.as_str(), "claude-desktop");
    assert_eq!(id.to_string(), "claude-desktop");
}

#[test]
fn forwarder_ids_are_unique() {
    assert_ne!(ForwarderId::generate(), ForwarderId::generate());
}
