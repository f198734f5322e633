// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! ID newtypes and log-entry id generation

use std::sync::atomic::{AtomicU64, Ordering};

/// Define a newtype ID wrapper around `String`.
///
/// Generates `new()`, `as_str()`, `Display`, `From<String>`, `From<&str>`,
/// `PartialEq<str>`, `PartialEq<&str>`, and `Borrow<str>` implementations.
#[macro_export]
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        pub struct $name:ident;
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl PartialEq<str> for $name {
            fn eq(&self, other: &str) -> bool {
                self.0 == other
            }
        }

        impl PartialEq<&str> for $name {
            fn eq(&self, other: &&str) -> bool {
                self.0 == *other
            }
        }

        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }
    };
}

define_id! {
    /// Identifier for a log-producing agent (discovered or user-defined).
    ///
    /// Stable for the lifetime of the process; custom agents keep the id
    /// assigned by the config store.
    pub struct AgentId;
}

define_id! {
    /// Identifier for a subscriber connection, `<channel>_<millis>_<rand6>`.
    pub struct ClientId;
}

define_id! {
    /// Identifier for a syslog forwarder.
    pub struct ForwarderId;
}

define_id! {
    /// Identifier for a supervised service.
    pub struct ServiceId;
}

impl ForwarderId {
    /// Generate a fresh random forwarder id.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

/// Process-wide counter backing entry ids. One counter for all agents
/// keeps ids unique even when several tailers emit for the same agent.
static ENTRY_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Generator for log entry ids: `<agent_id>-<monotonic counter>`.
#[derive(Clone)]
pub struct EntryIdGen {
    agent_id: AgentId,
}

impl EntryIdGen {
    pub fn new(agent_id: AgentId) -> Self {
        Self { agent_id }
    }

    pub fn agent_id(&self) -> &AgentId {
        &self.agent_id
    }

    /// Produce the next entry id.
    pub fn next(&self) -> String {
        let n = ENTRY_COUNTER.fetch_add(1, Ordering::Relaxed);
        format!("{}-{}", self.agent_id, n)
    }
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
