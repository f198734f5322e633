// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Outbound delivery for mcplog: the live subscriber hub and the syslog
//! forwarder set.

pub mod hub;
pub mod protocol;
pub mod syslog;

pub use hub::{HubOptions, SubscriberHub};
pub use protocol::{Channel, ClientFrame, ServerFrame};
pub use syslog::{
    ForwarderConfig, ForwarderFilters, ForwarderMeta, Protocol, RelayError, Severity,
    SyslogFormat, SyslogForwarders,
};
