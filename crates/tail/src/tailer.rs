// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-file incremental tailer.
//!
//! Reacts to OS change notifications and poll ticks. Reads only appended
//! bytes, keeps a trailing partial line unconsumed, resets on truncation,
//! and demotes itself after repeated stat failures.

use crate::file_event::FileEventSource;
use crate::parsers::{self, LineParser, ParseContext};
use crate::publish::EntryPublisher;
use crate::registry::{WatchStatus, WatcherRegistry};
use mcplog_core::{AgentConfig, ControlEvent, LogFormat, LogLevel};
use parking_lot::Mutex;
use std::io::{Read, Seek, SeekFrom};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

/// Tuning knobs shared by all tailers of a registry.
#[derive(Debug, Clone)]
pub struct TailerOptions {
    /// Poll driver interval (default 2s).
    pub poll_interval: Duration,
    /// Unconditional polling (remote-volume paths).
    pub force_poll: bool,
    /// Consecutive stat failures before the watcher demotes itself.
    pub max_errors: u32,
}

impl Default for TailerOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(2),
            force_poll: false,
            max_errors: 5,
        }
    }
}

enum Step {
    Continue,
    Terminated,
}

pub(crate) struct Tailer {
    path: PathBuf,
    format: LogFormat,
    level_filters: Vec<LogLevel>,
    parser: Arc<dyn LineParser>,
    ctx: ParseContext,
    status: Arc<Mutex<WatchStatus>>,
    publisher: EntryPublisher,
    control_tx: mpsc::Sender<ControlEvent>,
    options: TailerOptions,
    registry: WatcherRegistry,
    /// Byte offset already consumed (complete lines only).
    offset: u64,
    error_count: u32,
    /// For whole-document mode: array elements already emitted.
    seen_elements: usize,
}

impl Tailer {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        agent: &AgentConfig,
        path: PathBuf,
        parser: Arc<dyn LineParser>,
        status: Arc<Mutex<WatchStatus>>,
        publisher: EntryPublisher,
        control_tx: mpsc::Sender<ControlEvent>,
        options: TailerOptions,
        registry: WatcherRegistry,
    ) -> Self {
        let ctx = ParseContext::new(agent.id.clone(), agent.kind.clone(), path.clone());
        Self {
            path,
            format: agent.log_format,
            level_filters: agent.level_filters.clone(),
            parser,
            ctx,
            status,
            publisher,
            control_tx,
            options,
            registry,
            offset: 0,
            error_count: 0,
            seen_elements: 0,
        }
    }

    pub(crate) async fn run(mut self, mut shutdown_rx: oneshot::Receiver<()>) {
        let mut source = FileEventSource::subscribe(
            &self.path,
            self.options.poll_interval,
            self.options.force_poll,
        );
        self.status.lock().polling_fallback_active = source.polling();

        // Initial activation picks up content present at attach time.
        if let Step::Terminated = self.activate().await {
            return;
        }

        loop {
            tokio::select! {
                event = source.next() => {
                    if event.is_none() {
                        debug!(path = %self.path.display(), "all file-event drivers stopped");
                        break;
                    }
                    if let Step::Terminated = self.activate().await {
                        return;
                    }
                }
                _ = &mut shutdown_rx => {
                    debug!(path = %self.path.display(), "tailer shutdown requested");
                    break;
                }
            }
        }
    }

    async fn activate(&mut self) -> Step {
        let size = match std::fs::metadata(&self.path) {
            Ok(meta) if meta.is_file() => meta.len(),
            _ => return self.record_error().await,
        };

        let result = if self.format == LogFormat::ClaudeMcpJson {
            self.read_document(size)
        } else {
            self.read_appended(size)
        };

        match result {
            Ok(()) => {
                self.error_count = 0;
                let mut status = self.status.lock();
                status.offset = self.offset;
                status.error_count = 0;
                status.healthy = true;
                status.last_activity = Some(chrono::Utc::now());
                Step::Continue
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "read failed");
                self.record_error().await
            }
        }
    }

    /// Count a transient failure; demote the watcher once the strike
    /// limit is reached.
    async fn record_error(&mut self) -> Step {
        self.error_count += 1;
        {
            let mut status = self.status.lock();
            status.error_count = self.error_count;
        }
        if self.error_count < self.options.max_errors {
            return Step::Continue;
        }

        info!(
            path = %self.path.display(),
            errors = self.error_count,
            "path invalid, terminating watcher"
        );
        {
            let mut status = self.status.lock();
            status.healthy = false;
        }
        let _ = self
            .control_tx
            .send(ControlEvent::PathInvalid {
                agent_id: self.ctx.agent_id.clone(),
                path: self.path.clone(),
                error_count: self.error_count,
            })
            .await;
        self.registry.finish(&self.path);
        Step::Terminated
    }

    /// Incremental line mode: read `[offset, size)`, emit complete lines,
    /// keep a trailing partial line for the next activation.
    fn read_appended(&mut self, size: u64) -> std::io::Result<()> {
        if size < self.offset {
            debug!(path = %self.path.display(), size, offset = self.offset, "file truncated, resetting offset");
            self.offset = 0;
        }
        if size == self.offset {
            return Ok(());
        }

        let mut file = std::fs::File::open(&self.path)?;
        file.seek(SeekFrom::Start(self.offset))?;
        let mut buf = Vec::with_capacity((size - self.offset) as usize);
        file.take(size - self.offset).read_to_end(&mut buf)?;

        // Only complete lines are consumed; the partial tail stays on disk
        // until its newline arrives.
        let Some(last_newline) = buf.iter().rposition(|&b| b == b'\n') else {
            return Ok(());
        };
        for line in buf[..last_newline].split(|&b| b == b'\n') {
            if line.is_empty() {
                continue;
            }
            let text = String::from_utf8_lossy(line);
            self.emit(&text);
        }
        self.offset += last_newline as u64 + 1;
        Ok(())
    }

    /// Whole-document mode for `claude-mcp-json` files: the CLI rewrites
    /// the file in place, so re-read it fully and emit only elements past
    /// the last-seen count.
    fn read_document(&mut self, size: u64) -> std::io::Result<()> {
        if size < self.offset {
            self.seen_elements = 0;
        }
        if size == self.offset {
            return Ok(());
        }

        let doc = std::fs::read_to_string(&self.path)?;
        let (entries, total) = parsers::parse_document(&doc, &self.ctx, self.seen_elements);
        self.seen_elements = total;
        self.offset = size;
        for entry in entries {
            self.publish(entry);
        }
        Ok(())
    }

    fn emit(&self, line: &str) {
        if let Some(entry) = self.parser.parse(line, &self.ctx) {
            self.publish(entry);
        }
    }

    fn publish(&self, entry: mcplog_core::LogEntry) {
        if !self.level_filters.is_empty() && !self.level_filters.contains(&entry.level) {
            return;
        }
        self.publisher.publish(entry);
    }
}

#[cfg(test)]
#[path = "tailer_tests.rs"]
mod tests;
