// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon.

use std::path::PathBuf;
use std::time::Duration;

fn parse_duration_ms(var: &str) -> Option<Duration> {
    std::env::var(var)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
}

/// State directory override (`MCPLOG_STATE_DIR`).
pub fn state_dir_override() -> Option<PathBuf> {
    std::env::var("MCPLOG_STATE_DIR").ok().map(PathBuf::from)
}

/// Tailer poll interval (default: 2000ms).
pub fn poll_interval() -> Duration {
    parse_duration_ms("MCPLOG_POLL_MS").unwrap_or(Duration::from_secs(2))
}

/// Path validator sweep interval (default: 5 minutes).
pub fn validator_interval() -> Duration {
    parse_duration_ms("MCPLOG_VALIDATOR_MS").unwrap_or(Duration::from_secs(300))
}

/// Dev mode: verbose logging and the mock entry generator
/// (`MCPLOG_DEV=1`).
pub fn dev_mode() -> bool {
    std::env::var("MCPLOG_DEV").map(|v| v == "1").unwrap_or(false)
}

/// Log filter: `LOG_LEVEL`, falling back to dev/prod defaults.
pub fn log_level() -> String {
    std::env::var("LOG_LEVEL").unwrap_or_else(|_| {
        if dev_mode() {
            "debug".to_string()
        } else {
            "info".to_string()
        }
    })
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
