// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn table() -> AgentPathTable {
    AgentPathTable {
        linux: vec![".config/Claude/logs"],
        macos: vec!["Library/Logs/Claude"],
        windows: vec!["AppData/Roaming/Claude/logs"],
    }
}

#[test]
fn native_paths_come_first_in_os_order() {
    let resolver = PathResolver::with_roots(PathBuf::from("/home/dev"), None);
    let paths = resolver.resolve(&table());
    assert_eq!(
        paths,
        vec![
            PathBuf::from("/home/dev/.config/Claude/logs"),
            PathBuf::from("/home/dev/Library/Logs/Claude"),
            PathBuf::from("/home/dev/AppData/Roaming/Claude/logs"),
        ]
    );
}

#[test]
fn remote_volume_expands_per_mount_and_user() {
    let remote = RemoteVolumes {
        mounts: vec![PathBuf::from("/mnt/c"), PathBuf::from("/mnt/d")],
        users: vec!["alice".to_string(), "bob".to_string()],
    };
    let resolver = PathResolver::with_roots(PathBuf::from("/home/dev"), Some(remote));
    let paths = resolver.resolve(&table());

    // 3 natives + 2 mounts * 2 users * 1 windows path
    assert_eq!(paths.len(), 7);
    assert_eq!(
        paths[3],
        PathBuf::from("/mnt/c/Users/alice/AppData/Roaming/Claude/logs")
    );
    assert_eq!(
        paths[6],
        PathBuf::from("/mnt/d/Users/bob/AppData/Roaming/Claude/logs")
    );
}

#[test]
fn resolve_deduplicates_preserving_order() {
    let dup_table = AgentPathTable {
        linux: vec![".gemini/tmp"],
        macos: vec![".gemini/tmp"],
        windows: vec![".gemini/tmp"],
    };
    let resolver = PathResolver::with_roots(PathBuf::from("/home/dev"), None);
    assert_eq!(
        resolver.resolve(&dup_table),
        vec![PathBuf::from("/home/dev/.gemini/tmp")]
    );
}

#[test]
fn remote_path_detection() {
    let remote = RemoteVolumes {
        mounts: vec![PathBuf::from("/mnt/c")],
        users: vec!["alice".to_string()],
    };
    let resolver = PathResolver::with_roots(PathBuf::from("/home/dev"), Some(remote));
    assert!(resolver.is_remote_path(Path::new("/mnt/c/Users/alice/AppData/x.log")));
    assert!(!resolver.is_remote_path(Path::new("/home/dev/.config/x.log")));
}

#[test]
fn no_remote_volumes_without_marker() {
    let dir = tempfile::tempdir().unwrap();
    let version = dir.path().join("version");
    std::fs::write(&version, "Linux version 6.1 (microsoft WSL2)").unwrap();
    // No <mnt>/c/Windows/System32 marker
    assert!(detect_remote_volumes(dir.path(), &version).is_none());
}

#[test]
fn no_remote_volumes_without_microsoft_kernel() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("c/Windows/System32")).unwrap();
    let version = dir.path().join("version");
    std::fs::write(&version, "Linux version 6.1 generic").unwrap();
    assert!(detect_remote_volumes(dir.path(), &version).is_none());
}

#[test]
fn remote_volume_users_exclude_system_profiles() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("c/Windows/System32")).unwrap();
    for user in ["alice", "Public", "Default", "All Users"] {
        std::fs::create_dir_all(dir.path().join("c/Users").join(user)).unwrap();
    }
    let version = dir.path().join("version");
    std::fs::write(&version, "Linux version 6.1-microsoft-standard").unwrap();

    let remote = detect_remote_volumes(dir.path(), &version).unwrap();
    assert_eq!(remote.mounts, vec![dir.path().join("c")]);
    assert!(remote.users.contains(&"alice".to_string()));
    for excluded in ["Public", "Default", "All Users"] {
        assert!(!remote.users.contains(&excluded.to_string()), "{excluded}");
    }
    // Fallback users are always probed.
    assert!(remote.users.contains(&"Administrator".to_string()));
    assert!(remote.users.contains(&"user".to_string()));
}
