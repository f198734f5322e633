// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Syslog frame rendering: PRI computation, RFC5424 and RFC3164 layouts,
//! RFC6587 octet-counting framing for stream transports.

use super::config::{ForwarderConfig, SyslogFormat};
use mcplog_core::{LogEntry, LogLevel};

/// `PRI = facility * 8 + severity`.
pub fn priority(facility: u8, severity: u8) -> u8 {
    facility * 8 + severity
}

/// Map a canonical level onto a syslog severity.
pub fn severity_for(level: LogLevel) -> u8 {
    match level {
        LogLevel::Fatal => 0,
        LogLevel::Error => 3,
        LogLevel::Warn => 4,
        LogLevel::Info => 6,
        LogLevel::Debug => 7,
    }
}

/// Identity fields resolved once per forwarder.
pub struct FrameIdentity {
    pub hostname: String,
    pub app_name: String,
    pub tag: String,
    pub pid: u32,
}

impl FrameIdentity {
    pub fn resolve(config: &ForwarderConfig) -> Self {
        let hostname = config
            .metadata
            .hostname
            .clone()
            .or_else(|| std::env::var("HOSTNAME").ok())
            .filter(|h| !h.is_empty())
            .unwrap_or_else(|| "localhost".to_string());
        let app_name = config
            .metadata
            .app_name
            .clone()
            .unwrap_or_else(|| "mcplog".to_string());
        let tag = config.metadata.tag.clone().unwrap_or_else(|| app_name.clone());
        Self {
            hostname,
            app_name,
            tag,
            pid: std::process::id(),
        }
    }
}

/// Render one entry as a syslog message (unframed).
pub fn render(config: &ForwarderConfig, identity: &FrameIdentity, entry: &LogEntry) -> String {
    let pri = priority(config.facility, severity_for(entry.level));
    match config.format {
        SyslogFormat::Rfc5424 => {
            // <PRI>1 TIMESTAMP HOSTNAME APP-NAME PROCID MSGID SD MESSAGE
            format!(
                "<{pri}>1 {} {} {} {} - - {}",
                entry.timestamp.format("%Y-%m-%dT%H:%M:%S%.3fZ"),
                identity.hostname,
                identity.app_name,
                identity.pid,
                entry.message
            )
        }
        SyslogFormat::Rfc3164 => {
            // <PRI>Mmm dd HH:MM:SS HOSTNAME TAG: MESSAGE
            format!(
                "<{pri}>{} {} {}: {}",
                entry.timestamp.format("%b %e %H:%M:%S"),
                identity.hostname,
                identity.tag,
                entry.message
            )
        }
    }
}

/// RFC6587 octet-counting framing: `"<len> <msg>"`.
pub fn octet_frame(message: &str) -> String {
    format!("{} {}", message.len(), message)
}

#[cfg(test)]
#[path = "format_tests.rs"]
mod tests;
