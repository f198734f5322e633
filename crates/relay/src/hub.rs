// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Subscriber hub: fan-out of live frames to connected clients.
//!
//! One accept loop, one send task per connection. Each client has a
//! bounded frame queue (drop-oldest with a per-client counter), a
//! subscription set, and a heartbeat deadline: the server pings every
//! 30 s and closes connections whose last pong is 60 s old.

use crate::protocol::{Channel, ClientFrame, ServerFrame};
use chrono::{DateTime, Utc};
use mcplog_core::{Clock, ClientId, LogEntry, SystemClock};
use parking_lot::{Mutex, RwLock};
use rand::distr::Alphanumeric;
use rand::Rng;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{oneshot, Notify};
use tracing::{debug, info, warn};

/// Close code sent on server shutdown and idle drops (going away).
pub const CLOSE_GOING_AWAY: u16 = 1001;
/// Close code for protocol errors.
pub const CLOSE_PROTOCOL_ERROR: u16 = 1002;

#[derive(Debug, Clone)]
pub struct HubOptions {
    pub heartbeat_interval: std::time::Duration,
    pub idle_timeout: chrono::Duration,
    pub queue_depth: usize,
}

impl Default for HubOptions {
    fn default() -> Self {
        Self {
            heartbeat_interval: std::time::Duration::from_secs(30),
            idle_timeout: chrono::Duration::seconds(60),
            queue_depth: 1024,
        }
    }
}

/// Bounded per-connection frame queue with drop-oldest overflow.
struct SendQueue {
    frames: Mutex<VecDeque<ServerFrame>>,
    notify: Notify,
    depth: usize,
    drops: AtomicU64,
    closed: AtomicBool,
}

impl SendQueue {
    fn new(depth: usize) -> Self {
        Self {
            frames: Mutex::new(VecDeque::new()),
            notify: Notify::new(),
            depth,
            drops: AtomicU64::new(0),
            closed: AtomicBool::new(false),
        }
    }

    fn push(&self, frame: ServerFrame) {
        if self.closed.load(Ordering::Acquire) {
            return;
        }
        {
            let mut frames = self.frames.lock();
            if frames.len() >= self.depth {
                frames.pop_front();
                self.drops.fetch_add(1, Ordering::Relaxed);
            }
            frames.push_back(frame);
        }
        self.notify.notify_one();
    }

    async fn pop(&self) -> Option<ServerFrame> {
        loop {
            if let Some(frame) = self.frames.lock().pop_front() {
                return Some(frame);
            }
            if self.closed.load(Ordering::Acquire) {
                return None;
            }
            self.notify.notified().await;
        }
    }

    /// Stop accepting frames; the send task drains what is queued.
    fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.notify.notify_one();
    }
}

struct ClientHandle {
    queue: SendQueue,
    channels: Mutex<HashSet<Channel>>,
    last_pong: Mutex<DateTime<Utc>>,
}

impl ClientHandle {
    fn new(now: DateTime<Utc>, depth: usize) -> Self {
        Self {
            queue: SendQueue::new(depth),
            channels: Mutex::new(HashSet::new()),
            last_pong: Mutex::new(now),
        }
    }

    fn subscribed_to(&self, channel: Channel) -> bool {
        self.channels.lock().contains(&channel)
    }
}

struct HubInner<C> {
    clients: RwLock<HashMap<ClientId, Arc<ClientHandle>>>,
    options: HubOptions,
    clock: C,
    /// Last analytics payload, replayed on `request-analytics`.
    analytics_cache: Mutex<Option<serde_json::Value>>,
}

/// Fan-out hub for live subscribers.
#[derive(Clone)]
pub struct SubscriberHub<C: Clock = SystemClock> {
    inner: Arc<HubInner<C>>,
}

impl SubscriberHub<SystemClock> {
    pub fn new(options: HubOptions) -> Self {
        Self::with_clock(options, SystemClock)
    }
}

impl<C: Clock> SubscriberHub<C> {
    pub fn with_clock(options: HubOptions, clock: C) -> Self {
        Self {
            inner: Arc::new(HubInner {
                clients: RwLock::new(HashMap::new()),
                options,
                clock,
                analytics_cache: Mutex::new(None),
            }),
        }
    }

    /// Accept connections until shutdown, then close every client with
    /// code 1001.
    pub async fn run(&self, listener: TcpListener, mut shutdown_rx: oneshot::Receiver<()>) {
        let heartbeat = self.clone();
        let heartbeat_task = tokio::spawn(async move {
            loop {
                tokio::time::sleep(heartbeat.inner.options.heartbeat_interval).await;
                heartbeat.sweep_idle();
            }
        });

        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    match accepted {
                        Ok((stream, addr)) => {
                            debug!(%addr, "subscriber connected");
                            let hub = self.clone();
                            tokio::spawn(async move { hub.handle_connection(stream).await });
                        }
                        Err(e) => warn!(error = %e, "accept error"),
                    }
                }
                _ = &mut shutdown_rx => break,
            }
        }

        heartbeat_task.abort();
        self.close_all(CLOSE_GOING_AWAY);
        info!("subscriber hub stopped");
    }

    /// Deliver a log entry to every client subscribed to `logs`.
    pub fn broadcast_entry(&self, entry: &LogEntry) {
        let frame = ServerFrame::LogEntry {
            timestamp: self.now_millis(),
            data: Box::new(entry.clone()),
        };
        self.broadcast_frame(Channel::Logs, frame);
    }

    /// Deliver a payload to every client subscribed to `channel`.
    pub fn broadcast(&self, channel: Channel, data: serde_json::Value) {
        if channel == Channel::Analytics {
            *self.inner.analytics_cache.lock() = Some(data.clone());
        }
        if let Some(frame) = ServerFrame::for_channel(channel, self.now_millis(), data) {
            self.broadcast_frame(channel, frame);
        }
    }

    pub fn client_count(&self) -> usize {
        self.inner.clients.read().len()
    }

    pub fn client_ids(&self) -> Vec<ClientId> {
        self.inner.clients.read().keys().cloned().collect()
    }

    /// Frames dropped for one client due to a full queue.
    pub fn dropped_frames(&self, client: &ClientId) -> Option<u64> {
        self.inner
            .clients
            .read()
            .get(client)
            .map(|h| h.queue.drops.load(Ordering::Relaxed))
    }

    /// Close every connection with the given code.
    pub fn close_all(&self, code: u16) {
        let handles: Vec<Arc<ClientHandle>> = {
            let mut clients = self.inner.clients.write();
            clients.drain().map(|(_, h)| h).collect()
        };
        for handle in handles {
            handle.queue.push(ServerFrame::Close { code });
            handle.queue.close();
        }
    }

    fn now_millis(&self) -> i64 {
        self.inner.clock.now().timestamp_millis()
    }

    fn broadcast_frame(&self, channel: Channel, frame: ServerFrame) {
        let clients = self.inner.clients.read();
        for handle in clients.values() {
            if handle.subscribed_to(channel) {
                handle.queue.push(frame.clone());
            }
        }
    }

    /// One heartbeat pass: ping live clients, drop those whose pong is
    /// older than the idle timeout.
    fn sweep_idle(&self) {
        let now = self.inner.clock.now();
        let mut idle = Vec::new();
        {
            let clients = self.inner.clients.read();
            for (id, handle) in clients.iter() {
                let age = now - *handle.last_pong.lock();
                if age >= self.inner.options.idle_timeout {
                    idle.push(id.clone());
                } else {
                    handle.queue.push(ServerFrame::Ping {
                        timestamp: now.timestamp_millis(),
                    });
                }
            }
        }
        for id in idle {
            info!(client = %id, "dropping idle subscriber");
            if let Some(handle) = self.inner.clients.write().remove(&id) {
                handle.queue.push(ServerFrame::Close {
                    code: CLOSE_GOING_AWAY,
                });
                handle.queue.close();
            }
        }
    }

    async fn handle_connection(&self, stream: TcpStream) {
        let (read_half, mut write_half) = stream.into_split();
        let handle = Arc::new(ClientHandle::new(
            self.inner.clock.now(),
            self.inner.options.queue_depth,
        ));

        // Send task: drain the queue onto the socket as JSON lines.
        let send_handle = Arc::clone(&handle);
        let writer = tokio::spawn(async move {
            while let Some(frame) = send_handle.queue.pop().await {
                let Ok(mut line) = serde_json::to_string(&frame) else {
                    continue;
                };
                line.push('\n');
                if write_half.write_all(line.as_bytes()).await.is_err() {
                    break;
                }
            }
            let _ = write_half.shutdown().await;
        });

        let client_id = self.read_loop(read_half, &handle).await;

        // Closing drains and discards; nothing is re-routed.
        if let Some(id) = &client_id {
            self.inner.clients.write().remove(id);
            debug!(client = %id, "subscriber disconnected");
        }
        handle.queue.close();
        let _ = writer.await;
    }

    /// Process client frames until disconnect or protocol error.
    /// Returns the client id once assigned.
    async fn read_loop(
        &self,
        read_half: tokio::net::tcp::OwnedReadHalf,
        handle: &Arc<ClientHandle>,
    ) -> Option<ClientId> {
        let mut lines = BufReader::new(read_half).lines();
        let mut client_id: Option<ClientId> = None;

        loop {
            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(e) => {
                    debug!(error = %e, "subscriber read error");
                    break;
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            let frame: ClientFrame = match serde_json::from_str(&line) {
                Ok(frame) => frame,
                Err(e) => {
                    warn!(error = %e, "bad client frame, closing");
                    handle.queue.push(ServerFrame::Close {
                        code: CLOSE_PROTOCOL_ERROR,
                    });
                    break;
                }
            };

            match frame {
                ClientFrame::Subscribe { channels } => {
                    if client_id.is_none() {
                        let id = self.register(handle, channels.first().copied());
                        client_id = Some(id);
                    }
                    handle.channels.lock().extend(channels);
                }
                ClientFrame::Unsubscribe { channels } => {
                    let mut subscribed = handle.channels.lock();
                    for channel in channels {
                        subscribed.remove(&channel);
                    }
                }
                ClientFrame::Pong { .. } => {
                    *handle.last_pong.lock() = self.inner.clock.now();
                }
                ClientFrame::RequestAnalytics => {
                    let cached = self.inner.analytics_cache.lock().clone();
                    if let Some(data) = cached {
                        handle.queue.push(ServerFrame::AnalyticsUpdate {
                            timestamp: self.now_millis(),
                            data,
                        });
                    }
                }
            }
        }
        client_id
    }

    /// Assign `<channel>_<millis>_<rand6>` and register the client.
    fn register(&self, handle: &Arc<ClientHandle>, channel: Option<Channel>) -> ClientId {
        let channel = channel.map(|c| c.as_str()).unwrap_or("client");
        let suffix: String = rand::rng()
            .sample_iter(Alphanumeric)
            .take(6)
            .map(|b| (b as char).to_ascii_lowercase())
            .collect();
        let id = ClientId::new(format!(
            "{channel}_{}_{suffix}",
            self.inner.clock.now().timestamp_millis()
        ));
        self.inner
            .clients
            .write()
            .insert(id.clone(), Arc::clone(handle));
        info!(client = %id, "subscriber registered");
        id
    }
}

#[cfg(test)]
#[path = "hub_tests.rs"]
mod tests;
