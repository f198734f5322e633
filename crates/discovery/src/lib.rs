// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Agent discovery: path resolution, per-class detectors, the custom-agent
//! store adapter, and registration-time path validation.

pub mod detect;
pub mod paths;
pub mod sessions;
pub mod store;
pub mod validate;

pub use detect::{Discoverer, DiscoveryOptions};
pub use paths::{AgentPathTable, PathResolver, RemoteVolumes};
pub use sessions::{claude_mcp_log_dirs, editor_session_dirs, session_log_files};
pub use store::{
    CustomAgentStore, FileCustomAgentStore, NoOpCustomAgentStore, StoreAdapterError,
};
pub use validate::{prefilter_config, validate_paths, ValidationReport};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub use store::FakeCustomAgentStore;
