// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Registration-time path validation.
//!
//! The periodic watcher sweep lives in the tail crate; this module is the
//! synchronous pre-filter applied when agents are registered.

use mcplog_core::AgentConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Aggregate result of one validation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub valid_count: usize,
    pub invalid_count: usize,
}

/// Whether a path currently stats as a file or directory.
pub fn path_is_valid(path: &Path) -> bool {
    path.metadata()
        .map(|m| m.is_file() || m.is_dir())
        .unwrap_or(false)
}

/// Split paths into (valid, invalid).
pub fn validate_paths(paths: &[PathBuf]) -> (Vec<PathBuf>, Vec<PathBuf>) {
    let mut valid = Vec::new();
    let mut invalid = Vec::new();
    for path in paths {
        if path_is_valid(path) {
            valid.push(path.clone());
        } else {
            invalid.push(path.clone());
        }
    }
    (valid, invalid)
}

/// Retain only valid paths in a config; `None` if nothing remains.
pub fn prefilter_config(mut config: AgentConfig) -> Option<AgentConfig> {
    let (valid, invalid) = validate_paths(&config.log_paths);
    for path in &invalid {
        debug!(agent_id = %config.id, path = %path.display(), "dropping invalid log path");
    }
    if valid.is_empty() {
        return None;
    }
    config.log_paths = valid;
    Some(config)
}

#[cfg(test)]
#[path = "validate_tests.rs"]
mod tests;
