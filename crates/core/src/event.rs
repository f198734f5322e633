// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Control events published alongside log entries on the ingestion bus.

use crate::id::{AgentId, ForwarderId, ServiceId};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Observability events emitted by the watcher, validator, supervisor and
/// storage layers.
///
/// Serializes with `{"type": "scope:name", ...fields}` format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ControlEvent {
    // -- agents --
    #[serde(rename = "agent:discovered")]
    AgentDiscovered { agent_id: AgentId, kind: String },

    #[serde(rename = "agent:disabled")]
    AgentDisabled { agent_id: AgentId, reason: String },

    // -- paths --
    /// A watched path failed repeated stats and its watcher terminated.
    #[serde(rename = "path:invalid")]
    PathInvalid {
        agent_id: AgentId,
        path: PathBuf,
        error_count: u32,
    },

    /// The path validator evicted a dead watch.
    #[serde(rename = "path:removed")]
    PathRemoved { path: PathBuf, reason: String },

    // -- storage --
    /// A batch exhausted its retries and was dropped.
    #[serde(rename = "storage:dropped")]
    StorageDropped { batch_size: usize },

    // -- services --
    #[serde(rename = "service:healthy")]
    ServiceHealthy { service: ServiceId },

    #[serde(rename = "service:unhealthy")]
    ServiceUnhealthy { service: ServiceId, reason: String },

    #[serde(rename = "service:restarting")]
    ServiceRestarting {
        service: ServiceId,
        restart_count: u32,
    },

    // -- forwarders --
    #[serde(rename = "forwarder:down")]
    ForwarderDown {
        forwarder_id: ForwarderId,
        reason: String,
    },
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
