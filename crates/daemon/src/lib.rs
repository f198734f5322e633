// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! mcplog daemon library: ingestion bus, storage sink, service
//! supervisor, configuration and lifecycle.

pub mod bus;
pub mod config;
pub mod env;
pub mod lifecycle;
pub mod pipeline;
pub mod sink;
pub mod supervisor;

pub use bus::{BusMessage, BusReceiver, IngestBus, OverflowPolicy};
pub use config::DaemonConfig;
pub use lifecycle::{Config, LifecycleError};
pub use sink::{SinkOptions, StorageSink};
pub use supervisor::{
    ProbeError, Prober, RestartAction, ServiceCheck, ServiceConfig, ServiceState, ServiceStatus,
    Supervisor,
};
