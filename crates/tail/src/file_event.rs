// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Unified file-activation events with two drivers.
//!
//! Watched paths get an OS-notify driver where the platform supports it
//! and a periodic poll driver as fallback. Remote-volume paths always
//! poll because mount notifications are unreliable there. Both drivers
//! feed the same [`FileEvent`] stream, so the tailer does not care which
//! one woke it.

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use std::path::Path;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::warn;

/// Why a watched path was activated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileEvent {
    /// OS change notification.
    Changed,
    /// Periodic poll tick.
    PollTick,
}

/// Merged event stream for one watched path.
pub struct FileEventSource {
    rx: mpsc::Receiver<FileEvent>,
    /// Whether the poll driver is running (remote path or notify failure).
    polling: bool,
    // NOTE(lifetime): dropping the watcher stops OS notifications
    _watcher: Option<RecommendedWatcher>,
}

impl FileEventSource {
    /// Subscribe to activations for `path`.
    ///
    /// `force_poll` enables the poll driver unconditionally (remote
    /// volumes); otherwise polling starts only when the notify driver
    /// cannot be installed.
    pub fn subscribe(path: &Path, poll_interval: Duration, force_poll: bool) -> Self {
        Self::subscribe_mode(path, poll_interval, force_poll, RecursiveMode::NonRecursive)
    }

    /// Subscribe to a directory subtree (session layouts nest log files
    /// several levels deep).
    pub fn subscribe_tree(path: &Path, poll_interval: Duration, force_poll: bool) -> Self {
        Self::subscribe_mode(path, poll_interval, force_poll, RecursiveMode::Recursive)
    }

    fn subscribe_mode(
        path: &Path,
        poll_interval: Duration,
        force_poll: bool,
        mode: RecursiveMode,
    ) -> Self {
        let (tx, rx) = mpsc::channel(32);

        let watcher = match create_watcher(path, mode, tx.clone()) {
            Ok(w) => Some(w),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "file watcher failed, using fallback polling");
                None
            }
        };

        let polling = force_poll || watcher.is_none();
        if polling {
            let tx = tx.clone();
            tokio::spawn(async move {
                loop {
                    tokio::time::sleep(poll_interval).await;
                    if tx.send(FileEvent::PollTick).await.is_err() {
                        break;
                    }
                }
            });
        }

        Self {
            rx,
            polling,
            _watcher: watcher,
        }
    }

    /// Whether the poll driver is active for this path.
    pub fn polling(&self) -> bool {
        self.polling
    }

    /// Next activation; `None` once all drivers have stopped.
    pub async fn next(&mut self) -> Option<FileEvent> {
        self.rx.recv().await
    }
}

fn create_watcher(
    path: &Path,
    mode: RecursiveMode,
    tx: mpsc::Sender<FileEvent>,
) -> Result<RecommendedWatcher, notify::Error> {
    let mut watcher = notify::recommended_watcher(move |res: Result<notify::Event, _>| {
        if res.is_ok() {
            // Full channel means an activation is already pending.
            let _ = tx.try_send(FileEvent::Changed);
        }
    })?;

    watcher.watch(path, mode)?;
    Ok(watcher)
}

#[cfg(test)]
#[path = "file_event_tests.rs"]
mod tests;
