// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-class agent detectors and the discovery sweep.

use crate::paths::{tables, PathResolver};
use crate::sessions;
use crate::store::CustomAgentStore;
use crate::validate::prefilter_config;
use mcplog_core::{AgentConfig, AgentKind, LogFormat};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Newest-session cap for nested layouts.
const MAX_SESSIONS: usize = 10;

/// A Claude MCP cache with at least this many log directories wins over
/// the desktop app as the Claude source.
const MCP_PREFERENCE_THRESHOLD: usize = 5;

/// What the sweep is allowed to produce.
#[derive(Debug, Clone, Copy)]
pub struct DiscoveryOptions {
    pub enable_mock: bool,
    pub enable_real: bool,
    pub mixed_mode: bool,
    pub force_real: bool,
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        Self {
            enable_mock: false,
            enable_real: true,
            mixed_mode: false,
            force_real: false,
        }
    }
}

impl DiscoveryOptions {
    fn mock_enabled(&self) -> bool {
        (self.enable_mock || self.mixed_mode) && !self.force_real
    }

    fn real_enabled(&self) -> bool {
        self.enable_real || self.mixed_mode || self.force_real
    }
}

/// Runs the per-class detectors and merges in user-defined agents.
pub struct Discoverer<S> {
    resolver: PathResolver,
    store: S,
    options: DiscoveryOptions,
    /// State directory; mock agents log under `<state>/mock/`.
    state_dir: PathBuf,
}

impl<S: CustomAgentStore> Discoverer<S> {
    pub fn new(
        resolver: PathResolver,
        store: S,
        options: DiscoveryOptions,
        state_dir: PathBuf,
    ) -> Self {
        Self {
            resolver,
            store,
            options,
            state_dir,
        }
    }

    pub fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    /// Run a full discovery sweep.
    ///
    /// Detector failures are logged per class and never abort the sweep.
    /// Agents with zero valid paths are dropped.
    pub async fn discover(&self) -> Vec<AgentConfig> {
        let mut configs = Vec::new();

        if self.options.real_enabled() {
            if let Some(claude) = self.detect_claude() {
                configs.push(claude);
            }
            for detector in [detect_cursor, detect_vscode, detect_gemini_cli] {
                if let Some(config) = detector(&self.resolver) {
                    configs.push(config);
                }
            }
        }

        if self.options.mock_enabled() {
            configs.extend(self.mock_agents());
        }

        // User-defined agents keep their ids and override same-named
        // discovered entries.
        match self.store.list_custom_agents().await {
            Ok(custom) => {
                for config in custom {
                    configs.retain(|c| c.name != config.name);
                    configs.push(config);
                }
            }
            Err(e) => {
                warn!(error = %e, "custom agent store unavailable, skipping");
            }
        }

        let mut valid = Vec::new();
        for config in configs {
            let id = config.id.clone();
            match prefilter_config(config) {
                Some(config) => valid.push(config),
                None => {
                    info!(agent_id = %id, "dropping agent with no valid log paths");
                }
            }
        }

        for config in &valid {
            debug!(
                agent_id = %config.id,
                kind = %config.kind,
                paths = config.log_paths.len(),
                "discovered agent"
            );
            // Record auto-discovered agents so the admin surface sees them.
            if config.auto_discovery {
                if let Err(e) = self.store.upsert_discovered(config).await {
                    warn!(agent_id = %config.id, error = %e, "failed to record discovered agent");
                }
            }
        }
        valid
    }

    /// Resolve the single Claude source per the priority rule: an MCP
    /// cache with >= 5 log directories wins; otherwise desktop, then MCP,
    /// then the Code extension.
    fn detect_claude(&self) -> Option<AgentConfig> {
        let mcp = detect_claude_mcp(&self.resolver);
        if let Some((config, dir_count)) = &mcp {
            if *dir_count >= MCP_PREFERENCE_THRESHOLD {
                return Some(config.clone());
            }
        }
        detect_claude_desktop(&self.resolver)
            .or(mcp.map(|(config, _)| config))
            .or_else(|| detect_claude_code(&self.resolver))
    }

    /// Synthetic agents pointing at the state-dir mock logs.
    fn mock_agents(&self) -> Vec<AgentConfig> {
        let mock_dir = self.state_dir.join("mock");
        let mut text = AgentConfig::new(
            "mock-claude",
            "Mock Claude",
            AgentKind::Mock("claude".to_string()),
        );
        text.log_paths = vec![mock_dir.join("claude.log")];
        text.log_format = LogFormat::Text;
        text.set_meta("isMock", serde_json::json!(true));

        let mut mcp = AgentConfig::new(
            "mock-mcp",
            "Mock MCP",
            AgentKind::Mock("mcp".to_string()),
        );
        mcp.log_paths = vec![mock_dir.join("mcp-logs-mock").join("server.txt")];
        mcp.log_format = LogFormat::ClaudeMcpJson;
        mcp.set_meta("isMock", serde_json::json!(true));

        vec![text, mcp]
    }
}

fn base_config(
    id: &str,
    name: &str,
    kind: AgentKind,
    format: LogFormat,
    resolver: &PathResolver,
    confidence: f64,
) -> AgentConfig {
    let mut config = AgentConfig::new(id, name, kind);
    config.log_format = format;
    config.set_meta("confidence", serde_json::json!(confidence));
    config.set_meta("isWSL", serde_json::json!(resolver.is_remote_host()));
    config.set_meta(
        "lastDiscovered",
        serde_json::json!(chrono::Utc::now().to_rfc3339()),
    );
    config
}

/// Claude Desktop: flat log directories.
fn detect_claude_desktop(resolver: &PathResolver) -> Option<AgentConfig> {
    let dirs: Vec<PathBuf> = resolver
        .resolve(&tables::claude_desktop())
        .into_iter()
        .filter(|p| p.is_dir())
        .collect();
    if dirs.is_empty() {
        return None;
    }
    let mut config = base_config(
        "claude-desktop",
        "Claude Desktop",
        AgentKind::ClaudeDesktop,
        LogFormat::Text,
        resolver,
        0.9,
    );
    config.log_paths = dirs;
    Some(config)
}

/// Claude CLI MCP cache. Returns the config and how many `mcp-logs-*`
/// directories were found (the priority-rule signal).
fn detect_claude_mcp(resolver: &PathResolver) -> Option<(AgentConfig, usize)> {
    let mut log_dirs = Vec::new();
    for cache_root in resolver.resolve(&tables::claude_mcp_cache()) {
        if cache_root.is_dir() {
            log_dirs.extend(sessions::claude_mcp_log_dirs(&cache_root, MAX_SESSIONS));
        }
    }
    if log_dirs.is_empty() {
        return None;
    }
    let dir_count = log_dirs.len();
    let confidence = 0.5 + (dir_count as f64 * 0.05).min(0.45);
    let mut config = base_config(
        "claude-mcp",
        "Claude MCP",
        AgentKind::ClaudeMcp,
        LogFormat::ClaudeMcpJson,
        resolver,
        confidence,
    );
    config.log_paths = log_dirs;
    Some((config, dir_count))
}

/// Claude Code extension inside VS Code session logs.
fn detect_claude_code(resolver: &PathResolver) -> Option<AgentConfig> {
    let sessions = newest_editor_sessions(resolver, &tables::vscode());
    if sessions.is_empty() {
        return None;
    }
    let mut config = base_config(
        "claude-code",
        "Claude Code",
        AgentKind::ClaudeCode,
        LogFormat::VsCodeExtension,
        resolver,
        0.6,
    );
    config.log_paths = sessions;
    Some(config)
}

fn detect_cursor(resolver: &PathResolver) -> Option<AgentConfig> {
    let sessions = newest_editor_sessions(resolver, &tables::cursor());
    if sessions.is_empty() {
        return None;
    }
    let mut config = base_config(
        "cursor",
        "Cursor",
        AgentKind::Cursor,
        LogFormat::VsCodeExtension,
        resolver,
        session_confidence(sessions.len()),
    );
    config.log_paths = sessions;
    Some(config)
}

fn detect_vscode(resolver: &PathResolver) -> Option<AgentConfig> {
    let sessions = newest_editor_sessions(resolver, &tables::vscode());
    if sessions.is_empty() {
        return None;
    }
    let mut config = base_config(
        "vscode",
        "VS Code",
        AgentKind::VsCode,
        LogFormat::VsCodeExtension,
        resolver,
        session_confidence(sessions.len()),
    );
    config.log_paths = sessions;
    Some(config)
}

fn detect_gemini_cli(resolver: &PathResolver) -> Option<AgentConfig> {
    let dirs: Vec<PathBuf> = resolver
        .resolve(&tables::gemini_cli())
        .into_iter()
        .filter(|p| p.is_dir())
        .collect();
    if dirs.is_empty() {
        return None;
    }
    let mut config = base_config(
        "gemini-cli",
        "Gemini CLI",
        AgentKind::GeminiCli,
        LogFormat::Json,
        resolver,
        0.7,
    );
    config.log_paths = dirs;
    Some(config)
}

/// Newest dated session directories across all resolved roots.
fn newest_editor_sessions(resolver: &PathResolver, table: &crate::paths::AgentPathTable) -> Vec<PathBuf> {
    let mut out = Vec::new();
    for root in resolver.resolve(table) {
        if root.is_dir() {
            out.extend(sessions::editor_session_dirs(&root, MAX_SESSIONS));
        }
    }
    out.truncate(MAX_SESSIONS);
    out
}

fn session_confidence(count: usize) -> f64 {
    0.5 + (count as f64 * 0.05).min(0.45)
}

#[cfg(test)]
#[path = "detect_tests.rs"]
mod tests;
