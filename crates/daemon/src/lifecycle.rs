// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle: paths, single-instance lock, startup wiring, and
//! ordered shutdown.

use crate::bus::{IngestBus, OverflowPolicy};
use crate::config::{ConfigError, DaemonConfig};
use crate::pipeline::{self, PipelineTasks};
use crate::sink::{SinkOptions, StorageSink};
use crate::supervisor::{Supervisor, SystemProber};
use crate::env;
use fs2::FileExt;
use mcplog_discovery::store::StoreAdapterError;
use mcplog_discovery::{Discoverer, DiscoveryOptions, FileCustomAgentStore, PathResolver};
use mcplog_relay::hub::CLOSE_GOING_AWAY;
use mcplog_relay::{HubOptions, RelayError, SubscriberHub, SyslogForwarders};
use mcplog_storage::{FilePersistence, SpoolStore, StoreError};
use mcplog_tail::{EntryPublisher, PathValidator, TailerOptions, WatcherRegistry};
use std::fs::File;
use std::io::Write;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tracing::{info, warn};

/// Queue depth for each bus subscriber.
const SUBSCRIBER_QUEUE_DEPTH: usize = 1024;
/// Grace the publisher gives the storage sink before dropping.
const STORAGE_GRACE: Duration = Duration::from_millis(50);
/// Bus drain window during shutdown.
const DRAIN_WINDOW: Duration = Duration::from_secs(2);

/// Filesystem layout of the daemon state directory.
#[derive(Debug, Clone)]
pub struct Config {
    pub state_dir: PathBuf,
    pub lock_path: PathBuf,
    pub version_path: PathBuf,
    pub log_path: PathBuf,
    pub config_path: PathBuf,
    pub spool_dir: PathBuf,
    pub forwarders_path: PathBuf,
    pub custom_agents_path: PathBuf,
    pub hub_addr_path: PathBuf,
    pub mock_dir: PathBuf,
}

impl Config {
    /// Resolve paths under `$MCPLOG_STATE_DIR`, `$XDG_STATE_HOME/mcplog`,
    /// or `~/.local/state/mcplog`.
    pub fn load() -> Result<Self, LifecycleError> {
        let state_dir = match env::state_dir_override() {
            Some(dir) => dir,
            None => match std::env::var("XDG_STATE_HOME") {
                Ok(xdg) if !xdg.is_empty() => PathBuf::from(xdg).join("mcplog"),
                _ => dirs::home_dir()
                    .ok_or(LifecycleError::NoHomeDir)?
                    .join(".local/state/mcplog"),
            },
        };
        Ok(Self::under(state_dir))
    }

    /// Layout rooted at an explicit state directory.
    pub fn under(state_dir: PathBuf) -> Self {
        Self {
            lock_path: state_dir.join("daemon.pid"),
            version_path: state_dir.join("daemon.version"),
            log_path: state_dir.join("daemon.log"),
            config_path: state_dir.join("config.toml"),
            spool_dir: state_dir.join("spool"),
            forwarders_path: state_dir.join("syslog-forwarders.json"),
            custom_agents_path: state_dir.join("custom-agents.json"),
            hub_addr_path: state_dir.join("hub.addr"),
            mock_dir: state_dir.join("mock"),
            state_dir,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error("could not determine home directory")]
    NoHomeDir,

    #[error("another daemon holds the lock: {0}")]
    LockFailed(std::io::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Relay(#[from] RelayError),

    #[error(transparent)]
    Agents(#[from] StoreAdapterError),
}

/// A running daemon.
pub struct Daemon {
    pub config: Config,
    // NOTE(lifetime): held to maintain the exclusive lock; released on drop
    #[allow(dead_code)]
    lock_file: File,
    pub bus: IngestBus,
    pub registry: WatcherRegistry,
    pub hub: SubscriberHub,
    pub forwarders: SyslogForwarders,
    pub store: Arc<SpoolStore>,
    pub supervisor: Supervisor<SystemProber>,
    pub hub_addr: SocketAddr,
    tasks: PipelineTasks,
    validator_shutdown: oneshot::Sender<()>,
    hub_shutdown: oneshot::Sender<()>,
    sink_shutdown: oneshot::Sender<()>,
    sink_handle: tokio::task::JoinHandle<()>,
}

/// Acquire the lock, wire the pipeline, start every task.
pub async fn startup(config: Config) -> Result<Daemon, LifecycleError> {
    std::fs::create_dir_all(&config.state_dir)?;
    let lock_file = acquire_lock(&config)?;
    std::fs::write(&config.version_path, env!("CARGO_PKG_VERSION"))?;

    let daemon_config = DaemonConfig::load(&config.config_path)?;

    // Shared plumbing.
    let (publisher, entry_rx) = EntryPublisher::new(SUBSCRIBER_QUEUE_DEPTH);
    let (control_tx, control_rx) = tokio::sync::mpsc::channel(256);
    let registry = WatcherRegistry::new(
        publisher,
        control_tx.clone(),
        TailerOptions {
            poll_interval: env::poll_interval(),
            force_poll: false,
            max_errors: 5,
        },
    );

    // Discovery.
    let resolver = PathResolver::detect();
    let custom_store = FileCustomAgentStore::open(&config.custom_agents_path)?;
    let options = DiscoveryOptions {
        enable_mock: daemon_config.discovery.enable_mock,
        enable_real: daemon_config.discovery.enable_real,
        mixed_mode: daemon_config.discovery.mixed_mode,
        force_real: daemon_config.discovery.force_real,
    };
    if options.enable_mock || daemon_config.discovery.mixed_mode {
        pipeline::seed_mock_logs(&config.mock_dir)?;
    }
    let discoverer = Discoverer::new(
        resolver.clone(),
        custom_store,
        options,
        config.state_dir.clone(),
    );
    let agents = discoverer.discover().await;
    info!(agents = agents.len(), "discovery complete");

    // Fan-out.
    let bus = IngestBus::new();
    let storage_rx = bus.subscribe(
        "storage",
        SUBSCRIBER_QUEUE_DEPTH,
        OverflowPolicy::BlockBriefly(STORAGE_GRACE),
    );
    let hub_rx = bus.subscribe("hub", SUBSCRIBER_QUEUE_DEPTH, OverflowPolicy::DropOldest);
    let syslog_rx = bus.subscribe("syslog", SUBSCRIBER_QUEUE_DEPTH, OverflowPolicy::DropOldest);

    // Storage sink.
    let store = Arc::new(SpoolStore::open(&config.spool_dir)?);
    let (sink_shutdown, sink_shutdown_rx) = oneshot::channel();
    let sink = StorageSink::new(
        Arc::clone(&store),
        storage_rx,
        bus.clone(),
        SinkOptions::default(),
    );
    let sink_handle = tokio::spawn(sink.run(sink_shutdown_rx));

    // Subscriber hub.
    let hub = SubscriberHub::new(HubOptions::default());
    let listener = TcpListener::bind(&daemon_config.hub.listen).await?;
    let hub_addr = listener.local_addr()?;
    std::fs::write(&config.hub_addr_path, hub_addr.to_string())?;
    let (hub_shutdown, hub_shutdown_rx) = oneshot::channel();
    {
        let hub = hub.clone();
        tokio::spawn(async move { hub.run(listener, hub_shutdown_rx).await });
    }

    // Syslog forwarders.
    let forwarders =
        SyslogForwarders::load(Box::new(FilePersistence::new(&config.forwarders_path)))?;

    // Pumps, watchers, mock generator.
    let tasks = pipeline::start(
        &bus,
        entry_rx,
        control_rx,
        hub_rx,
        syslog_rx,
        &registry,
        &hub,
        &forwarders,
        &resolver,
        &agents,
        env::poll_interval(),
    );

    // Path validator.
    let validator = PathValidator::new(registry.clone(), control_tx, env::validator_interval());
    let validator_shutdown = validator.spawn();

    // Supervisor.
    let supervisor = Supervisor::new(SystemProber::default(), bus.clone());
    for service in &daemon_config.services {
        supervisor.supervise(service.clone());
    }

    info!(hub = %hub_addr, "daemon started");
    Ok(Daemon {
        config,
        lock_file,
        bus,
        registry,
        hub,
        forwarders,
        store,
        supervisor,
        hub_addr,
        tasks,
        validator_shutdown,
        hub_shutdown,
        sink_shutdown,
        sink_handle,
    })
}

/// Ordered shutdown: watchers, bus drain, sink flush, subscriber close,
/// forwarder close.
pub async fn shutdown(daemon: Daemon) {
    let Daemon {
        registry,
        bus,
        hub,
        forwarders,
        supervisor,
        tasks,
        validator_shutdown,
        hub_shutdown,
        sink_shutdown,
        sink_handle,
        ..
    } = daemon;

    // 1. Discovery and watcher tasks.
    let _ = validator_shutdown.send(());
    supervisor.shutdown();
    tasks.stop_watchers();
    registry.shutdown_all();

    // 2. Drain the bus for up to the window.
    let drained = tokio::time::timeout(DRAIN_WINDOW, async {
        while bus.has_pending() {
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
    })
    .await
    .is_ok();
    if !drained {
        warn!("bus not drained within window, abandoning pending messages");
    }
    bus.close();

    // 3. Flush the storage sink once.
    let _ = sink_shutdown.send(());
    if let Err(e) = sink_handle.await {
        warn!(error = %e, "sink task join failed");
    }

    // 4. Close subscriber connections.
    let _ = hub_shutdown.send(());
    hub.close_all(CLOSE_GOING_AWAY);

    // 5. Close forwarder sockets.
    forwarders.shutdown();

    info!("daemon stopped");
}

fn acquire_lock(config: &Config) -> Result<File, LifecycleError> {
    let file = std::fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(false)
        .open(&config.lock_path)?;
    file.try_lock_exclusive()
        .map_err(LifecycleError::LockFailed)?;
    let mut file = file;
    file.set_len(0)?;
    write!(file, "{}", std::process::id())?;
    Ok(file)
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
