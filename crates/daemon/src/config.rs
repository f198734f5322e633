// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon configuration file (`<state>/config.toml`).
//!
//! Every field has a default; a missing file yields a fully default
//! config. Service definitions for the supervisor live here too.

use crate::supervisor::ServiceConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoverySection {
    pub enable_mock: bool,
    pub enable_real: bool,
    pub mixed_mode: bool,
    pub force_real: bool,
}

impl Default for DiscoverySection {
    fn default() -> Self {
        Self {
            enable_mock: false,
            enable_real: true,
            mixed_mode: false,
            force_real: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HubSection {
    /// TCP listen address for subscribers. Port 0 picks an ephemeral
    /// port, written to `<state>/hub.addr`.
    pub listen: String,
}

impl Default for HubSection {
    fn default() -> Self {
        Self {
            listen: "127.0.0.1:0".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    pub discovery: DiscoverySection,
    pub hub: HubSection,
    #[serde(rename = "service")]
    pub services: Vec<ServiceConfig>,
}

impl DaemonConfig {
    /// Load from a TOML file; a missing file is all defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(contents) => Ok(toml::from_str(&contents)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
