// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded, non-blocking entry publishing from tailer tasks.
//!
//! A tailer must never block on a slow consumer; when its channel is full
//! the newest entries are dropped and counted.

use mcplog_core::LogEntry;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::warn;

/// Sending half handed to every tailer task.
#[derive(Clone)]
pub struct EntryPublisher {
    tx: mpsc::Sender<LogEntry>,
    dropped: Arc<AtomicU64>,
}

impl EntryPublisher {
    /// Create a publisher with a bounded queue of `capacity` entries.
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<LogEntry>) {
        let (tx, rx) = mpsc::channel(capacity);
        (
            Self {
                tx,
                dropped: Arc::new(AtomicU64::new(0)),
            },
            rx,
        )
    }

    /// Publish without blocking; drops the entry when the queue is full.
    pub fn publish(&self, entry: LogEntry) {
        if let Err(mpsc::error::TrySendError::Full(entry)) = self.tx.try_send(entry) {
            let total = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
            if total.is_power_of_two() {
                warn!(source = %entry.source, total_dropped = total, "ingest queue full, dropping entry");
            }
        }
    }

    /// Total entries dropped due to backpressure.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
#[path = "publish_tests.rs"]
mod tests;
