// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Ingestion bus: single-publisher fan-out of log entries and control
//! events to the storage sink, subscriber hub and syslog forwarders.
//!
//! The subscriber list is append-only under a lock; publishing traverses
//! an immutable snapshot, so subscribing never stalls the hot path.
//! Each subscriber has a bounded queue with its own overflow policy and
//! observes its own FIFO-ordered view.

use mcplog_core::{ControlEvent, LogEntry};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tracing::debug;

/// What to do when a subscriber queue is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverflowPolicy {
    /// Evict the oldest queued message and count the drop.
    DropOldest,
    /// Give the consumer a short grace window to make space, then evict
    /// the oldest (storage sink: up to 50 ms).
    BlockBriefly(Duration),
}

/// A message fanned out to every subscriber.
#[derive(Debug, Clone)]
pub enum BusMessage {
    Entry(Arc<LogEntry>),
    Control(Arc<ControlEvent>),
}

struct Subscriber {
    name: &'static str,
    queue: Mutex<VecDeque<BusMessage>>,
    depth: usize,
    policy: OverflowPolicy,
    data_ready: Notify,
    space_ready: Notify,
    drops: AtomicU64,
    closed: AtomicBool,
}

impl Subscriber {
    fn push(&self, message: BusMessage) {
        let mut queue = self.queue.lock();
        if queue.len() >= self.depth {
            queue.pop_front();
            self.drops.fetch_add(1, Ordering::Relaxed);
        }
        queue.push_back(message);
        drop(queue);
        self.data_ready.notify_one();
    }

    fn is_full(&self) -> bool {
        self.queue.lock().len() >= self.depth
    }
}

/// Receiving half handed to each sink task.
pub struct BusReceiver {
    sub: Arc<Subscriber>,
}

impl BusReceiver {
    /// Next message; `None` after the bus closes and the queue drains.
    pub async fn recv(&mut self) -> Option<BusMessage> {
        loop {
            {
                let mut queue = self.sub.queue.lock();
                if let Some(message) = queue.pop_front() {
                    drop(queue);
                    self.sub.space_ready.notify_one();
                    return Some(message);
                }
            }
            if self.sub.closed.load(Ordering::Acquire) {
                return None;
            }
            self.sub.data_ready.notified().await;
        }
    }

    /// Non-blocking variant for drain loops.
    pub fn try_recv(&mut self) -> Option<BusMessage> {
        let message = self.sub.queue.lock().pop_front();
        if message.is_some() {
            self.sub.space_ready.notify_one();
        }
        message
    }
}

struct BusInner {
    subscribers: Mutex<Arc<Vec<Arc<Subscriber>>>>,
    published: AtomicU64,
    closed: AtomicBool,
}

/// The process-wide broadcast primitive.
#[derive(Clone)]
pub struct IngestBus {
    inner: Arc<BusInner>,
}

impl Default for IngestBus {
    fn default() -> Self {
        Self::new()
    }
}

impl IngestBus {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(BusInner {
                subscribers: Mutex::new(Arc::new(Vec::new())),
                published: AtomicU64::new(0),
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// Register a subscriber with a bounded queue.
    pub fn subscribe(
        &self,
        name: &'static str,
        depth: usize,
        policy: OverflowPolicy,
    ) -> BusReceiver {
        let sub = Arc::new(Subscriber {
            name,
            queue: Mutex::new(VecDeque::new()),
            depth,
            policy,
            data_ready: Notify::new(),
            space_ready: Notify::new(),
            drops: AtomicU64::new(0),
            closed: AtomicBool::new(false),
        });
        {
            let mut subscribers = self.inner.subscribers.lock();
            let mut next = Vec::with_capacity(subscribers.len() + 1);
            next.extend(subscribers.iter().cloned());
            next.push(Arc::clone(&sub));
            *subscribers = Arc::new(next);
        }
        debug!(subscriber = name, depth, "bus subscriber registered");
        BusReceiver { sub }
    }

    fn snapshot(&self) -> Arc<Vec<Arc<Subscriber>>> {
        Arc::clone(&self.inner.subscribers.lock())
    }

    /// Deliver a message to every subscriber, honoring each overflow
    /// policy.
    pub async fn publish(&self, message: BusMessage) {
        self.inner.published.fetch_add(1, Ordering::Relaxed);
        let subscribers = self.snapshot();
        for sub in subscribers.iter() {
            if sub.closed.load(Ordering::Acquire) {
                continue;
            }
            if let OverflowPolicy::BlockBriefly(grace) = sub.policy {
                if sub.is_full() {
                    let _ = tokio::time::timeout(grace, sub.space_ready.notified()).await;
                }
            }
            sub.push(message.clone());
        }
    }

    pub async fn publish_entry(&self, entry: LogEntry) {
        self.publish(BusMessage::Entry(Arc::new(entry))).await;
    }

    pub async fn publish_control(&self, event: ControlEvent) {
        self.publish(BusMessage::Control(Arc::new(event))).await;
    }

    /// Total messages published.
    pub fn published(&self) -> u64 {
        self.inner.published.load(Ordering::Relaxed)
    }

    /// Drops for one subscriber, by name.
    pub fn drops_for(&self, name: &str) -> Option<u64> {
        self.snapshot()
            .iter()
            .find(|s| s.name == name)
            .map(|s| s.drops.load(Ordering::Relaxed))
    }

    /// Whether any subscriber still has queued messages.
    pub fn has_pending(&self) -> bool {
        self.snapshot()
            .iter()
            .any(|s| !s.queue.lock().is_empty())
    }

    /// Close the bus: receivers drain what is queued, then see `None`.
    pub fn close(&self) {
        self.inner.closed.store(true, Ordering::Release);
        for sub in self.snapshot().iter() {
            sub.closed.store(true, Ordering::Release);
            sub.data_ready.notify_one();
        }
    }
}

#[cfg(test)]
#[path = "bus_tests.rs"]
mod tests;
