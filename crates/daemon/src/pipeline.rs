// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pipeline wiring: discovery output into watchers, watcher output onto
//! the bus, bus output into the hub and the syslog forwarders.

use crate::bus::{BusMessage, BusReceiver, IngestBus};
use mcplog_core::{AgentConfig, AgentKind, ControlEvent, LogEntry};
use mcplog_discovery::PathResolver;
use mcplog_relay::{Channel, SubscriberHub, SyslogForwarders};
use mcplog_tail::{TreeWatcher, WatcherRegistry};
use std::path::Path;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

/// How often counter snapshots go out on the health channel.
const HEALTH_TICK: Duration = Duration::from_secs(30);

/// Handles for the background tasks the pipeline spawns.
pub struct PipelineTasks {
    tree_shutdowns: Vec<oneshot::Sender<()>>,
    mock_shutdown: Option<oneshot::Sender<()>>,
    health_shutdown: oneshot::Sender<()>,
}

impl PipelineTasks {
    /// Stop tree watchers, the health ticker and the mock generator.
    pub fn stop_watchers(self) {
        for tx in self.tree_shutdowns {
            let _ = tx.send(());
        }
        let _ = self.health_shutdown.send(());
        if let Some(tx) = self.mock_shutdown {
            let _ = tx.send(());
        }
    }
}

/// Wire everything together and spawn the pump tasks.
#[allow(clippy::too_many_arguments)]
pub fn start(
    bus: &IngestBus,
    mut entry_rx: mpsc::Receiver<LogEntry>,
    mut control_rx: mpsc::Receiver<ControlEvent>,
    hub_rx: BusReceiver,
    syslog_rx: BusReceiver,
    registry: &WatcherRegistry,
    hub: &SubscriberHub,
    forwarders: &SyslogForwarders,
    resolver: &PathResolver,
    agents: &[AgentConfig],
    poll_interval: Duration,
) -> PipelineTasks {
    // Publisher pump: tailer output onto the bus, FIFO per source.
    {
        let bus = bus.clone();
        tokio::spawn(async move {
            while let Some(entry) = entry_rx.recv().await {
                bus.publish_entry(entry).await;
            }
            debug!("entry pump stopped");
        });
    }
    {
        let bus = bus.clone();
        tokio::spawn(async move {
            while let Some(event) = control_rx.recv().await {
                bus.publish_control(event).await;
            }
            debug!("control pump stopped");
        });
    }

    // Hub pump: entries to the logs channel, control events to health.
    {
        let hub = hub.clone();
        let mut rx = hub_rx;
        tokio::spawn(async move {
            while let Some(message) = rx.recv().await {
                match message {
                    BusMessage::Entry(entry) => hub.broadcast_entry(&entry),
                    BusMessage::Control(event) => {
                        if let Ok(payload) = serde_json::to_value(event.as_ref()) {
                            hub.broadcast(Channel::Health, payload);
                        }
                    }
                }
            }
            debug!("hub pump stopped");
        });
    }

    // Syslog pump: entries only.
    {
        let forwarders = forwarders.clone();
        let mut rx = syslog_rx;
        tokio::spawn(async move {
            while let Some(message) = rx.recv().await {
                if let BusMessage::Entry(entry) = message {
                    forwarders.forward(&entry);
                }
            }
            debug!("syslog pump stopped");
        });
    }

    let tree_shutdowns = attach_agents(registry, resolver, agents, poll_interval);
    let health_shutdown = spawn_health_ticker(bus.clone(), registry.clone(), hub.clone());
    let mock_shutdown = agents
        .iter()
        .any(|a| matches!(a.kind, AgentKind::Mock(_)))
        .then(|| spawn_mock_generator(agents));

    PipelineTasks {
        tree_shutdowns,
        mock_shutdown,
        health_shutdown,
    }
}

/// Periodic pipeline counter snapshot on the health channel.
fn spawn_health_ticker(
    bus: IngestBus,
    registry: WatcherRegistry,
    hub: SubscriberHub,
) -> oneshot::Sender<()> {
    let (shutdown_tx, mut shutdown_rx) = oneshot::channel();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = tokio::time::sleep(HEALTH_TICK) => {
                    let snapshot = serde_json::json!({
                        "watchedFiles": registry.len(),
                        "published": bus.published(),
                        "ingestDropped": registry.dropped_entries(),
                        "subscribers": hub.client_count(),
                    });
                    hub.broadcast(Channel::Health, snapshot);
                }
                _ = &mut shutdown_rx => break,
            }
        }
    });
    shutdown_tx
}

/// Attach a tailer or tree watcher for every agent log path.
pub fn attach_agents(
    registry: &WatcherRegistry,
    resolver: &PathResolver,
    agents: &[AgentConfig],
    poll_interval: Duration,
) -> Vec<oneshot::Sender<()>> {
    let mut shutdowns = Vec::new();
    for agent in agents {
        if !agent.enabled {
            continue;
        }
        for path in &agent.log_paths {
            let force_poll = resolver.is_remote_path(path);
            if path.is_dir() {
                let watcher = TreeWatcher::new(
                    registry.clone(),
                    agent.clone(),
                    path.clone(),
                    poll_interval,
                    force_poll,
                );
                shutdowns.push(watcher.spawn());
            } else {
                registry.attach(agent, path, force_poll);
            }
        }
        info!(agent_id = %agent.id, paths = agent.log_paths.len(), "agent attached");
    }
    shutdowns
}

/// Ensure the mock log files exist before discovery probes them.
pub fn seed_mock_logs(mock_dir: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(mock_dir.join("mcp-logs-mock"))?;
    let text = mock_dir.join("claude.log");
    if !text.exists() {
        std::fs::write(&text, "")?;
    }
    let doc = mock_dir.join("mcp-logs-mock/server.txt");
    if !doc.exists() {
        std::fs::write(&doc, "[]")?;
    }
    Ok(())
}

/// Append synthetic entries to the mock logs so subscribers see traffic
/// in dev mode.
fn spawn_mock_generator(agents: &[AgentConfig]) -> oneshot::Sender<()> {
    let paths: Vec<std::path::PathBuf> = agents
        .iter()
        .filter(|a| matches!(a.kind, AgentKind::Mock(_)))
        .flat_map(|a| a.log_paths.clone())
        .filter(|p| p.extension().is_some_and(|e| e == "log"))
        .collect();

    let (shutdown_tx, mut shutdown_rx) = oneshot::channel();
    tokio::spawn(async move {
        let mut counter: u64 = 0;
        loop {
            tokio::select! {
                _ = tokio::time::sleep(Duration::from_secs(2)) => {
                    counter += 1;
                    let level = match counter % 10 {
                        0 => "ERROR",
                        n if n % 3 == 0 => "WARN",
                        _ => "INFO",
                    };
                    for path in &paths {
                        let line = format!("[mock] {level} synthetic entry #{counter}\n");
                        let _ = std::fs::OpenOptions::new()
                            .append(true)
                            .open(path)
                            .and_then(|mut f| std::io::Write::write_all(&mut f, line.as_bytes()));
                    }
                }
                _ = &mut shutdown_rx => break,
            }
        }
    });
    shutdown_tx
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
