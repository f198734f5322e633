// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Subscriber wire protocol: newline-delimited JSON text frames over TCP.

use mcplog_core::LogEntry;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Subscription channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Channel {
    Logs,
    Analytics,
    Health,
    AgentStatus,
    Patterns,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Logs => "logs",
            Channel::Analytics => "analytics",
            Channel::Health => "health",
            Channel::AgentStatus => "agent-status",
            Channel::Patterns => "patterns",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown channel: {0}")]
pub struct ParseChannelError(pub String);

impl FromStr for Channel {
    type Err = ParseChannelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "logs" => Ok(Channel::Logs),
            "analytics" => Ok(Channel::Analytics),
            "health" => Ok(Channel::Health),
            "agent-status" => Ok(Channel::AgentStatus),
            "patterns" => Ok(Channel::Patterns),
            other => Err(ParseChannelError(other.to_string())),
        }
    }
}

/// Server → client frames: `{type, timestamp, data}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerFrame {
    LogEntry {
        timestamp: i64,
        data: Box<LogEntry>,
    },
    AnalyticsUpdate {
        timestamp: i64,
        data: serde_json::Value,
    },
    AgentStatus {
        timestamp: i64,
        data: serde_json::Value,
    },
    PatternAlert {
        timestamp: i64,
        data: serde_json::Value,
    },
    HealthUpdate {
        timestamp: i64,
        data: serde_json::Value,
    },
    Ping {
        timestamp: i64,
    },
    Pong {
        timestamp: i64,
    },
    /// Connection close notice; `code` follows the WebSocket status
    /// registry (1001 = going away).
    Close {
        code: u16,
    },
}

impl ServerFrame {
    /// Wrap a broadcast payload in the frame type for its channel.
    ///
    /// The logs channel carries typed entries (see
    /// [`ServerFrame::LogEntry`]); generic payloads have no frame there.
    pub fn for_channel(channel: Channel, timestamp: i64, data: serde_json::Value) -> Option<Self> {
        match channel {
            Channel::Logs => None,
            Channel::Analytics => Some(ServerFrame::AnalyticsUpdate { timestamp, data }),
            Channel::Health => Some(ServerFrame::HealthUpdate { timestamp, data }),
            Channel::AgentStatus => Some(ServerFrame::AgentStatus { timestamp, data }),
            Channel::Patterns => Some(ServerFrame::PatternAlert { timestamp, data }),
        }
    }

    /// The channel a frame is delivered on, if any.
    pub fn channel(&self) -> Option<Channel> {
        match self {
            ServerFrame::LogEntry { .. } => Some(Channel::Logs),
            ServerFrame::AnalyticsUpdate { .. } => Some(Channel::Analytics),
            ServerFrame::AgentStatus { .. } => Some(Channel::AgentStatus),
            ServerFrame::PatternAlert { .. } => Some(Channel::Patterns),
            ServerFrame::HealthUpdate { .. } => Some(Channel::Health),
            ServerFrame::Ping { .. } | ServerFrame::Pong { .. } | ServerFrame::Close { .. } => {
                None
            }
        }
    }
}

/// Client → server frames.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientFrame {
    Subscribe {
        channels: Vec<Channel>,
    },
    Unsubscribe {
        channels: Vec<Channel>,
    },
    Pong {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<i64>,
    },
    RequestAnalytics,
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
