// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fallback parser for plain text lines.

use super::{LineParser, ParseContext};
use mcplog_core::{LogEntry, LogLevel};

/// Severity keywords in priority order; first match wins.
const LEVEL_KEYWORDS: [(&[&str], LogLevel); 4] = [
    (&["fatal", "critical"], LogLevel::Fatal),
    (&["error", "err"], LogLevel::Error),
    (&["warn", "warning"], LogLevel::Warn),
    (&["debug", "trace"], LogLevel::Debug),
];

/// Case-insensitive substring scan; defaults to `info`.
pub(crate) fn detect_level(line: &str) -> LogLevel {
    let lower = line.to_lowercase();
    for (keywords, level) in LEVEL_KEYWORDS {
        if keywords.iter().any(|k| lower.contains(k)) {
            return level;
        }
    }
    LogLevel::Info
}

pub struct BasicLineParser;

impl LineParser for BasicLineParser {
    fn parse(&self, line: &str, ctx: &ParseContext) -> Option<LogEntry> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(LogEntry::new(
            ctx.next_id(),
            chrono::Utc::now(),
            detect_level(trimmed),
            trimmed,
            ctx.source(),
            ctx.agent_kind.clone(),
            ctx.default_session(),
            line,
        ))
    }
}

#[cfg(test)]
#[path = "basic_tests.rs"]
mod tests;
