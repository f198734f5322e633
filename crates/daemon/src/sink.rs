// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Storage sink: batched writes from the bus to the log store.
//!
//! Buffers up to 512 entries or 250 ms, whichever comes first. Failed
//! inserts retry under exponential backoff (200 ms, factor 2, 30 s cap,
//! 8 attempts); an exhausted batch is dropped and announced with a
//! `storage:dropped` control event.

use crate::bus::{BusMessage, BusReceiver, IngestBus};
use mcplog_core::ControlEvent;
use mcplog_storage::{LogEntryRow, LogStore};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct SinkOptions {
    pub batch_size: usize,
    pub flush_interval: Duration,
    pub backoff_base: Duration,
    pub backoff_cap: Duration,
    pub max_attempts: u32,
}

impl Default for SinkOptions {
    fn default() -> Self {
        Self {
            batch_size: 512,
            flush_interval: Duration::from_millis(250),
            backoff_base: Duration::from_millis(200),
            backoff_cap: Duration::from_secs(30),
            max_attempts: 8,
        }
    }
}

pub struct StorageSink<S> {
    store: Arc<S>,
    rx: BusReceiver,
    bus: IngestBus,
    options: SinkOptions,
    buffer: Vec<LogEntryRow>,
}

impl<S: LogStore> StorageSink<S> {
    pub fn new(store: Arc<S>, rx: BusReceiver, bus: IngestBus, options: SinkOptions) -> Self {
        let buffer = Vec::with_capacity(options.batch_size);
        Self {
            store,
            rx,
            bus,
            options,
            buffer,
        }
    }

    /// Run until shutdown; drains the queue and flushes once on the way
    /// out.
    pub async fn run(mut self, mut shutdown_rx: oneshot::Receiver<()>) {
        let mut ticker = tokio::time::interval(self.options.flush_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                message = self.rx.recv() => {
                    match message {
                        Some(message) => {
                            self.buffer_message(message);
                            if self.buffer.len() >= self.options.batch_size {
                                self.flush().await;
                            }
                        }
                        None => break,
                    }
                }
                _ = ticker.tick() => {
                    if !self.buffer.is_empty() {
                        self.flush().await;
                    }
                }
                _ = &mut shutdown_rx => break,
            }
        }

        // Final flush: drain whatever is still queued, then write once.
        while let Some(message) = self.rx.try_recv() {
            self.buffer_message(message);
        }
        if !self.buffer.is_empty() {
            self.flush().await;
        }
        debug!("storage sink stopped");
    }

    fn buffer_message(&mut self, message: BusMessage) {
        // Control events are observability traffic, not rows.
        if let BusMessage::Entry(entry) = message {
            self.buffer.push(LogEntryRow::from(entry.as_ref()));
        }
    }

    async fn flush(&mut self) {
        let batch = std::mem::take(&mut self.buffer);
        let size = batch.len();
        let mut backoff = self.options.backoff_base;

        for attempt in 1..=self.options.max_attempts {
            match self.store.insert(batch.clone()).await {
                Ok(()) => {
                    debug!(rows = size, attempt, "batch stored");
                    return;
                }
                Err(e) if attempt == self.options.max_attempts => {
                    warn!(rows = size, attempts = attempt, error = %e, "dropping batch after retries");
                }
                Err(e) => {
                    debug!(attempt, backoff_ms = backoff.as_millis() as u64, error = %e, "insert failed, backing off");
                    tokio::time::sleep(backoff).await;
                    backoff = (backoff * 2).min(self.options.backoff_cap);
                }
            }
        }

        self.bus
            .publish_control(ControlEvent::StorageDropped { batch_size: size })
            .await;
    }
}

#[cfg(test)]
#[path = "sink_tests.rs"]
mod tests;
