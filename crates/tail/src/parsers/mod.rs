// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Format-aware parsers turning raw lines into [`LogEntry`]s.
//!
//! Parsers never fail outward: unparseable input falls back to the
//! basic-line parser or is dropped with a warning counter.

mod basic;
mod claude_mcp;
mod cursor;
mod json;
mod vscode;

pub use basic::BasicLineParser;
pub use claude_mcp::{parse_document, server_from_path};
pub use cursor::CursorMcpParser;
pub use json::JsonParser;
pub use vscode::VsCodeParser;

use mcplog_core::{AgentId, AgentKind, EntryIdGen, LogEntry, LogFormat};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Everything a parser needs besides the line itself.
pub struct ParseContext {
    pub agent_id: AgentId,
    pub agent_kind: AgentKind,
    pub path: PathBuf,
    pub id_gen: EntryIdGen,
}

impl ParseContext {
    pub fn new(agent_id: AgentId, agent_kind: AgentKind, path: PathBuf) -> Self {
        let id_gen = EntryIdGen::new(agent_id.clone());
        Self {
            agent_id,
            agent_kind,
            path,
            id_gen,
        }
    }

    /// `<agent_id>-<file-basename>`.
    pub fn source(&self) -> String {
        format!("{}-{}", self.agent_id, file_basename(&self.path))
    }

    pub fn next_id(&self) -> String {
        self.id_gen.next()
    }

    pub fn default_session(&self) -> String {
        LogEntry::default_session(&self.agent_id)
    }
}

pub(crate) fn file_basename(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "unknown".to_string())
}

/// A line-oriented log parser. `None` drops the line.
pub trait LineParser: Send + Sync {
    fn parse(&self, line: &str, ctx: &ParseContext) -> Option<LogEntry>;
}

/// Dispatches to the parser for an agent's kind and format.
#[derive(Clone)]
pub struct ParserRegistry {
    basic: Arc<BasicLineParser>,
    vscode: Arc<VsCodeParser>,
    cursor: Arc<CursorMcpParser>,
    json: Arc<JsonParser>,
}

impl Default for ParserRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ParserRegistry {
    pub fn new() -> Self {
        Self {
            basic: Arc::new(BasicLineParser),
            vscode: Arc::new(VsCodeParser::new()),
            cursor: Arc::new(CursorMcpParser::new()),
            json: Arc::new(JsonParser),
        }
    }

    /// Select the line parser for one watched file.
    ///
    /// Cursor's extension-host logs use the editor timestamp format but
    /// carry MCP service tags, so the cursor parser takes precedence over
    /// the plain vscode one for that agent.
    pub fn for_agent(&self, kind: &AgentKind, format: LogFormat) -> Arc<dyn LineParser> {
        if *kind == AgentKind::Cursor {
            return self.cursor.clone();
        }
        match format {
            LogFormat::Text => self.basic.clone(),
            LogFormat::VsCodeExtension => self.vscode.clone(),
            LogFormat::Json | LogFormat::Structured | LogFormat::Mixed => self.json.clone(),
            // Whole-document parsing is handled by the tailer; stray
            // line-mode dispatch degrades to JSON-per-line.
            LogFormat::ClaudeMcpJson => self.json.clone(),
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    pub fn ctx(agent_id: &str, kind: AgentKind, path: &str) -> ParseContext {
        ParseContext::new(AgentId::new(agent_id), kind, PathBuf::from(path))
    }
}
