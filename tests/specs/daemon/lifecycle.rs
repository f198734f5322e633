//! Daemon startup artifacts and single-instance behavior.

use crate::prelude::*;

#[test]
fn startup_writes_state_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let daemon = DaemonUnderTest::spawn(dir.path());

    assert!(dir.path().join("daemon.pid").exists());
    assert!(dir.path().join("daemon.version").exists());
    assert!(dir.path().join("hub.addr").exists());
    assert!(daemon.hub_addr().contains(':'));
}

#[test]
fn second_instance_refuses_to_start() {
    let dir = tempfile::tempdir().unwrap();
    let _daemon = DaemonUnderTest::spawn(dir.path());

    let output = mcplogd_cmd()
        .env("MCPLOG_STATE_DIR", dir.path())
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("already running"), "{stderr}");
}

#[test]
fn lock_is_released_after_kill() {
    let dir = tempfile::tempdir().unwrap();
    {
        let _daemon = DaemonUnderTest::spawn(dir.path());
        // Dropped here: killed and reaped.
    }
    // The OS drops the advisory lock with the process; a fresh daemon
    // starts cleanly in the same state dir.
    let _daemon = DaemonUnderTest::spawn(dir.path());
}
