//! Test helpers for behavioral specifications.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, dead_code)]

use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

pub const READY_TIMEOUT: Duration = Duration::from_secs(30);
pub const FRAME_TIMEOUT: Duration = Duration::from_secs(10);

/// Returns the path to the mcplogd binary.
///
/// Resolves relative to the test binary itself (target/debug/deps/...),
/// falling back to CARGO_MANIFEST_DIR for standard layouts.
pub fn mcplogd_binary() -> PathBuf {
    if let Ok(exe) = std::env::current_exe() {
        if let Some(debug_dir) = exe.parent().and_then(|d| d.parent()) {
            let candidate = debug_dir.join("mcplogd");
            if candidate.exists() {
                return candidate;
            }
        }
    }
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("target/debug")
        .join("mcplogd")
}

pub fn mcplogd_cmd() -> Command {
    Command::new(mcplogd_binary())
}

/// A daemon process bound to a temporary state directory.
pub struct DaemonUnderTest {
    pub child: Child,
    pub state_dir: PathBuf,
}

impl DaemonUnderTest {
    /// Spawn mcplogd with `MCPLOG_STATE_DIR` pointing at `state_dir` and
    /// wait for the READY marker.
    pub fn spawn(state_dir: &Path) -> Self {
        let mut child = mcplogd_cmd()
            .env("MCPLOG_STATE_DIR", state_dir)
            .env("MCPLOG_POLL_MS", "100")
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .expect("spawn mcplogd");

        let stdout = child.stdout.take().expect("stdout piped");
        let mut reader = BufReader::new(stdout);
        let started = Instant::now();
        let mut line = String::new();
        loop {
            line.clear();
            let n = reader.read_line(&mut line).expect("read mcplogd stdout");
            if n == 0 || started.elapsed() > READY_TIMEOUT {
                let _ = child.kill();
                panic!("mcplogd did not become ready");
            }
            if line.trim() == "READY" {
                break;
            }
        }

        Self {
            child,
            state_dir: state_dir.to_path_buf(),
        }
    }

    /// The hub address advertised in `<state>/hub.addr`.
    pub fn hub_addr(&self) -> String {
        std::fs::read_to_string(self.state_dir.join("hub.addr"))
            .expect("hub.addr written")
            .trim()
            .to_string()
    }
}

impl Drop for DaemonUnderTest {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// Write a custom-agent store file watching `log_path` so the daemon
/// tails it without any real agents installed.
pub fn write_custom_agent(state_dir: &Path, log_path: &Path) {
    let row = serde_json::json!([{
        "id": "00000000-0000-0000-0000-000000000001",
        "user_id": null,
        "name": "spec-agent",
        "type": "custom-spec",
        "config": {
            "logPaths": [log_path],
            "metadata": {},
            "isCustom": true
        },
        "is_active": true,
        "auto_discovery": false,
        "log_paths": [log_path],
        "format_type": "text",
        "filters": null,
        "metadata": {},
        "created_at": "2025-01-01T00:00:00Z",
        "updated_at": "2025-01-01T00:00:00Z"
    }]);
    std::fs::create_dir_all(state_dir).unwrap();
    std::fs::write(
        state_dir.join("custom-agents.json"),
        serde_json::to_string_pretty(&row).unwrap(),
    )
    .unwrap();
}

/// Wait until `predicate` holds or the timeout expires.
pub fn wait_until(timeout: Duration, mut predicate: impl FnMut() -> bool) -> bool {
    let started = Instant::now();
    while started.elapsed() < timeout {
        if predicate() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(25));
    }
    false
}
