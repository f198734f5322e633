// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Periodic re-validation of watched paths.
//!
//! Every interval (default 5 minutes) each watched path is stat'd; dead
//! paths have their watchers closed and a `path:removed` control event
//! emitted.

use crate::registry::WatcherRegistry;
use mcplog_core::ControlEvent;
use mcplog_discovery::validate::path_is_valid;
use mcplog_discovery::ValidationReport;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::info;

/// Default sweep interval.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(300);

pub struct PathValidator {
    registry: WatcherRegistry,
    control_tx: mpsc::Sender<ControlEvent>,
    interval: Duration,
}

impl PathValidator {
    pub fn new(
        registry: WatcherRegistry,
        control_tx: mpsc::Sender<ControlEvent>,
        interval: Duration,
    ) -> Self {
        Self {
            registry,
            control_tx,
            interval,
        }
    }

    /// Spawn the periodic sweep; returns its shutdown sender.
    pub fn spawn(self) -> oneshot::Sender<()> {
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = tokio::time::sleep(self.interval) => {
                        let report = self.run_once().await;
                        if report.invalid_count > 0 {
                            info!(
                                valid = report.valid_count,
                                invalid = report.invalid_count,
                                "path validation sweep evicted dead watches"
                            );
                        }
                    }
                    _ = &mut shutdown_rx => break,
                }
            }
        });
        shutdown_tx
    }

    /// Validate every watched path once.
    pub async fn run_once(&self) -> ValidationReport {
        let mut report = ValidationReport::default();
        for path in self.registry.watched_paths() {
            if path_is_valid(&path) {
                report.valid_count += 1;
                continue;
            }
            report.invalid_count += 1;
            self.registry.detach(&path);
            let _ = self
                .control_tx
                .send(ControlEvent::PathRemoved {
                    path,
                    reason: "path-invalid".to_string(),
                })
                .await;
        }
        report
    }
}

#[cfg(test)]
#[path = "validator_tests.rs"]
mod tests;
