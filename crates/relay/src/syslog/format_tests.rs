// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::syslog::config::{ForwarderConfig, Severity, SyslogFormat};
use chrono::TimeZone;
use mcplog_core::{AgentKind, LogEntry};

fn entry_at(level: LogLevel, message: &str) -> LogEntry {
    LogEntry::new(
        "claude-desktop-0".to_string(),
        chrono::Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
        level,
        message,
        "claude-desktop-main.log",
        AgentKind::ClaudeDesktop,
        "session-claude-desktop",
        message,
    )
}

fn config(format: SyslogFormat) -> ForwarderConfig {
    let mut config = ForwarderConfig::new("f", "collector.example", 514);
    config.facility = 16;
    config.default_severity = Severity::Informational;
    config.format = format;
    config.metadata.hostname = Some("host".to_string());
    config.metadata.app_name = Some("app".to_string());
    config.metadata.tag = Some("tag".to_string());
    config
}

#[yare::parameterized(
    fatal = { LogLevel::Fatal, 0 },
    error = { LogLevel::Error, 3 },
    warn  = { LogLevel::Warn, 4 },
    info  = { LogLevel::Info, 6 },
    debug = { LogLevel::Debug, 7 },
)]
fn severity_map(level: LogLevel, expected: u8) {
    assert_eq!(severity_for(level), expected);
}

proptest::proptest! {
    #[test]
    fn priority_identity(facility in 0u8..=23, severity in 0u8..=7) {
        proptest::prop_assert_eq!(priority(facility, severity), facility * 8 + severity);
    }
}

#[test]
fn rfc5424_frame_layout() {
    let config = config(SyslogFormat::Rfc5424);
    let identity = FrameIdentity::resolve(&config);
    let frame = render(&config, &identity, &entry_at(LogLevel::Error, "down"));
    assert_eq!(
        frame,
        format!(
            "<131>1 2025-01-01T00:00:00.000Z host app {} - - down",
            std::process::id()
        )
    );
}

#[test]
fn rfc3164_frame_layout() {
    let config = config(SyslogFormat::Rfc3164);
    let identity = FrameIdentity::resolve(&config);
    let frame = render(&config, &identity, &entry_at(LogLevel::Warn, "slow"));
    // <PRI>Mmm dd HH:MM:SS HOSTNAME TAG: MESSAGE, day space-padded.
    assert_eq!(frame, "<132>Jan  1 00:00:00 host tag: slow");
}

#[test]
fn identity_defaults() {
    let mut config = config(SyslogFormat::Rfc5424);
    config.metadata = Default::default();
    let identity = FrameIdentity::resolve(&config);
    assert_eq!(identity.app_name, "mcplog");
    assert_eq!(identity.tag, "mcplog");
    assert!(!identity.hostname.is_empty());
}

#[test]
fn octet_frame_prefixes_length() {
    assert_eq!(octet_frame("hello"), "5 hello");
    let frame = octet_frame("<131>1 x");
    assert_eq!(frame, "8 <131>1 x");
}

#[test]
fn millisecond_precision_is_preserved() {
    let config = config(SyslogFormat::Rfc5424);
    let identity = FrameIdentity::resolve(&config);
    let mut entry = entry_at(LogLevel::Info, "tick");
    entry.timestamp += chrono::Duration::milliseconds(250);
    let frame = render(&config, &identity, &entry);
    assert!(frame.contains("2025-01-01T00:00:00.250Z"), "{frame}");
}
