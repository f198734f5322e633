// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Service supervisor: periodic health checks of managed dependencies
//! with automatic restart after repeated failure.
//!
//! State machine per service:
//! `unknown → starting → healthy ⇄ unhealthy → stopped`, with
//! `unhealthy → starting` on the restart path.

use crate::bus::IngestBus;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mcplog_core::{ControlEvent, ServiceId};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::ExitStatus;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;
use tokio::sync::oneshot;
use tracing::{info, warn};

const HTTP_CHECK_TIMEOUT: Duration = Duration::from_secs(5);
const HTTP_SERVICE_TIMEOUT: Duration = Duration::from_secs(10);
const PORT_CHECK_TIMEOUT: Duration = Duration::from_secs(5);
const DOCKER_TIMEOUT: Duration = Duration::from_secs(30);
const PGREP_TIMEOUT: Duration = Duration::from_secs(5);
const RESTART_TIMEOUT: Duration = Duration::from_secs(60);

/// Why a health probe or restart action failed.
///
/// Rendered into `ServiceStatus.last_error` and the `service:unhealthy`
/// event reason.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("{command} failed to run: {source}")]
    Io {
        command: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("{command} timed out after {timeout_secs}s")]
    Timeout {
        command: &'static str,
        timeout_secs: u64,
    },

    #[error("{command} exited with {status}: {stderr}")]
    CommandFailed {
        command: &'static str,
        status: ExitStatus,
        stderr: String,
    },

    #[error("GET {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("GET {url} returned {status} (expected {expected})")]
    HttpStatus {
        url: String,
        status: u16,
        expected: u16,
    },

    /// The probed resource exists but is not in a healthy state.
    #[error("{0}")]
    Unhealthy(String),
}

/// Run a CLI probe, requiring exit status 0; returns trimmed stdout.
///
/// The child process is killed automatically when the timeout elapses
/// (via the tokio `Child` drop implementation).
async fn run_probe(
    mut cmd: Command,
    timeout: Duration,
    command: &'static str,
) -> Result<String, ProbeError> {
    let output = match tokio::time::timeout(timeout, cmd.output()).await {
        Ok(Ok(output)) => output,
        Ok(Err(source)) => return Err(ProbeError::Io { command, source }),
        Err(_elapsed) => {
            return Err(ProbeError::Timeout {
                command,
                timeout_secs: timeout.as_secs(),
            })
        }
    };
    if !output.status.success() {
        return Err(ProbeError::CommandFailed {
            command,
            status: output.status,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// How a service's health is probed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServiceCheck {
    /// Container must be running; optional HTTP probe on top.
    Docker {
        container: String,
        #[serde(default)]
        http_url: Option<String>,
        #[serde(default = "default_status")]
        expected_status: u16,
    },
    /// Named process (or pid file) must exist and not be a zombie.
    Process {
        name: String,
        #[serde(default)]
        pid_file: Option<PathBuf>,
        #[serde(default)]
        http_url: Option<String>,
        #[serde(default)]
        port: Option<u16>,
    },
    Http {
        url: String,
        #[serde(default = "default_status")]
        expected_status: u16,
    },
    Port { host: String, port: u16 },
}

fn default_status() -> u16 {
    200
}

/// How a failed service is restarted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum RestartAction {
    DockerRestart { container: String },
    DockerComposeRestart { service: String },
    /// `pkill` the old process, then spawn the command line.
    ProcessRestart { kill_name: String, spawn: Vec<String> },
    None,
}

// Scalar fields precede the check/restart tables so the TOML form
// serializes cleanly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub id: ServiceId,
    pub name: String,
    #[serde(default = "default_interval", with = "duration_secs")]
    pub health_interval: Duration,
    #[serde(default = "default_max_failures")]
    pub max_failures: u32,
    #[serde(default = "default_restart_delay", with = "duration_secs")]
    pub restart_delay: Duration,
    #[serde(default)]
    pub tags: Vec<String>,
    pub check: ServiceCheck,
    #[serde(default = "default_restart")]
    pub restart: RestartAction,
}

fn default_interval() -> Duration {
    Duration::from_secs(30)
}
fn default_max_failures() -> u32 {
    3
}
fn default_restart_delay() -> Duration {
    Duration::from_secs(5)
}
fn default_restart() -> RestartAction {
    RestartAction::None
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(d)?))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceState {
    Healthy,
    Unhealthy,
    Stopped,
    Starting,
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceStatus {
    pub state: ServiceState,
    pub failure_count: u32,
    pub restart_count: u32,
    pub last_check: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    /// Probe round-trip of the last successful check, in milliseconds.
    pub response_time_ms: Option<u64>,
}

impl Default for ServiceStatus {
    fn default() -> Self {
        Self {
            state: ServiceState::Unknown,
            failure_count: 0,
            restart_count: 0,
            last_check: None,
            last_error: None,
            response_time_ms: None,
        }
    }
}

/// Health probe seam so the state machine is testable without docker.
#[async_trait]
pub trait Prober: Send + Sync + 'static {
    /// `Ok(round_trip)` when healthy.
    async fn check(&self, check: &ServiceCheck) -> Result<Duration, ProbeError>;

    /// Execute a restart action.
    async fn restart(&self, action: &RestartAction) -> Result<(), ProbeError>;
}

/// Production prober: docker CLI, /proc, reqwest, TCP connects.
pub struct SystemProber {
    http: reqwest::Client,
}

impl Default for SystemProber {
    fn default() -> Self {
        Self {
            http: reqwest::Client::new(),
        }
    }
}

impl SystemProber {
    async fn http_probe(
        &self,
        url: &str,
        expected_status: u16,
        timeout: Duration,
    ) -> Result<(), ProbeError> {
        let response = self
            .http
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|source| ProbeError::Http {
                url: url.to_string(),
                source,
            })?;
        if response.status().as_u16() != expected_status {
            return Err(ProbeError::HttpStatus {
                url: url.to_string(),
                status: response.status().as_u16(),
                expected: expected_status,
            });
        }
        Ok(())
    }

    async fn docker_state(&self, container: &str) -> Result<String, ProbeError> {
        let mut cmd = Command::new("docker");
        cmd.args(["inspect", "-f", "{{.State.Status}}", container]);
        run_probe(cmd, DOCKER_TIMEOUT, "docker inspect").await
    }

    async fn process_alive(
        &self,
        name: &str,
        pid_file: Option<&PathBuf>,
    ) -> Result<(), ProbeError> {
        let pid = match pid_file {
            Some(path) => std::fs::read_to_string(path)
                .map_err(|e| ProbeError::Unhealthy(format!("pid file unreadable: {e}")))?
                .trim()
                .parse::<u32>()
                .map_err(|e| ProbeError::Unhealthy(format!("pid file not a pid: {e}")))?,
            None => {
                let mut cmd = Command::new("pgrep");
                cmd.args(["-x", name]);
                let stdout = match run_probe(cmd, PGREP_TIMEOUT, "pgrep").await {
                    Ok(stdout) => stdout,
                    // pgrep exits 1 when nothing matched.
                    Err(ProbeError::CommandFailed { .. }) => {
                        return Err(ProbeError::Unhealthy(format!(
                            "process '{name}' not found"
                        )))
                    }
                    Err(e) => return Err(e),
                };
                stdout
                    .lines()
                    .next()
                    .and_then(|l| l.trim().parse::<u32>().ok())
                    .ok_or_else(|| {
                        ProbeError::Unhealthy(format!("process '{name}' not found"))
                    })?
            }
        };

        // A zombie is not alive.
        let stat = std::fs::read_to_string(format!("/proc/{pid}/stat"))
            .map_err(|_| ProbeError::Unhealthy(format!("pid {pid} is gone")))?;
        let state = stat
            .rsplit(')')
            .next()
            .and_then(|rest| rest.split_whitespace().next())
            .unwrap_or("?");
        if state == "Z" {
            return Err(ProbeError::Unhealthy(format!("pid {pid} is a zombie")));
        }
        Ok(())
    }

    async fn port_open(&self, host: &str, port: u16) -> Result<(), ProbeError> {
        tokio::time::timeout(
            PORT_CHECK_TIMEOUT,
            tokio::net::TcpStream::connect((host, port)),
        )
        .await
        .map_err(|_| ProbeError::Unhealthy(format!("connect {host}:{port} timed out")))?
        .map_err(|e| ProbeError::Unhealthy(format!("connect {host}:{port} failed: {e}")))?;
        Ok(())
    }
}

#[async_trait]
impl Prober for SystemProber {
    async fn check(&self, check: &ServiceCheck) -> Result<Duration, ProbeError> {
        let started = std::time::Instant::now();
        match check {
            ServiceCheck::Docker {
                container,
                http_url,
                expected_status,
            } => {
                let state = self.docker_state(container).await?;
                if state != "running" {
                    return Err(ProbeError::Unhealthy(format!(
                        "container '{container}' is {state}"
                    )));
                }
                if let Some(url) = http_url {
                    self.http_probe(url, *expected_status, HTTP_CHECK_TIMEOUT)
                        .await?;
                }
            }
            ServiceCheck::Process {
                name,
                pid_file,
                http_url,
                port,
            } => {
                self.process_alive(name, pid_file.as_ref()).await?;
                if let Some(url) = http_url {
                    self.http_probe(url, 200, HTTP_CHECK_TIMEOUT).await?;
                }
                if let Some(port) = port {
                    self.port_open("127.0.0.1", *port).await?;
                }
            }
            ServiceCheck::Http {
                url,
                expected_status,
            } => {
                self.http_probe(url, *expected_status, HTTP_SERVICE_TIMEOUT)
                    .await?;
            }
            ServiceCheck::Port { host, port } => {
                self.port_open(host, *port).await?;
            }
        }
        Ok(started.elapsed())
    }

    async fn restart(&self, action: &RestartAction) -> Result<(), ProbeError> {
        match action {
            RestartAction::DockerRestart { container } => {
                let mut cmd = Command::new("docker");
                cmd.args(["restart", container]);
                run_probe(cmd, RESTART_TIMEOUT, "docker restart").await?;
            }
            RestartAction::DockerComposeRestart { service } => {
                let mut cmd = Command::new("docker");
                cmd.args(["compose", "restart", service]);
                run_probe(cmd, RESTART_TIMEOUT, "docker compose restart").await?;
            }
            RestartAction::ProcessRestart { kill_name, spawn } => {
                let mut kill = Command::new("pkill");
                kill.args(["-x", kill_name]);
                match run_probe(kill, RESTART_TIMEOUT, "pkill").await {
                    // pkill exits 1 when nothing matched; that is fine here.
                    Ok(_) | Err(ProbeError::CommandFailed { .. }) => {}
                    Err(e) => return Err(e),
                }
                if let Some((program, args)) = spawn.split_first() {
                    let mut cmd = Command::new(program);
                    cmd.args(args);
                    cmd.spawn().map_err(|source| ProbeError::Io {
                        command: "spawn",
                        source,
                    })?;
                }
            }
            RestartAction::None => {}
        }
        Ok(())
    }
}

struct Supervised {
    config: ServiceConfig,
    status: Mutex<ServiceStatus>,
}

/// Supervises a set of services, one check task per service.
pub struct Supervisor<P> {
    services: Arc<RwLock<HashMap<ServiceId, Arc<Supervised>>>>,
    prober: Arc<P>,
    bus: IngestBus,
    shutdowns: Mutex<Vec<oneshot::Sender<()>>>,
}

impl<P: Prober> Supervisor<P> {
    pub fn new(prober: P, bus: IngestBus) -> Self {
        Self {
            services: Arc::new(RwLock::new(HashMap::new())),
            prober: Arc::new(prober),
            bus,
            shutdowns: Mutex::new(Vec::new()),
        }
    }

    /// Register a service and start its check loop.
    pub fn supervise(&self, config: ServiceConfig) {
        let service = Arc::new(Supervised {
            config: config.clone(),
            status: Mutex::new(ServiceStatus::default()),
        });
        self.services
            .write()
            .insert(config.id.clone(), Arc::clone(&service));

        let prober = Arc::clone(&self.prober);
        let bus = self.bus.clone();
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();
        self.shutdowns.lock().push(shutdown_tx);

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = tokio::time::sleep(service.config.health_interval) => {
                        check_service(&service, prober.as_ref(), &bus).await;
                    }
                    _ = &mut shutdown_rx => break,
                }
            }
        });
        info!(service = %config.id, "service supervised");
    }

    pub fn status(&self, id: &ServiceId) -> Option<ServiceStatus> {
        self.services.read().get(id).map(|s| s.status.lock().clone())
    }

    pub fn statuses(&self) -> Vec<(ServiceId, ServiceStatus)> {
        self.services
            .read()
            .iter()
            .map(|(id, s)| (id.clone(), s.status.lock().clone()))
            .collect()
    }

    /// Run one check for a service immediately (tests and admin probes).
    pub async fn check_now(&self, id: &ServiceId) -> Option<ServiceStatus> {
        let service = self.services.read().get(id).cloned()?;
        check_service(&service, self.prober.as_ref(), &self.bus).await;
        let status = service.status.lock().clone();
        Some(status)
    }

    /// Stop all check loops.
    pub fn shutdown(&self) {
        for tx in self.shutdowns.lock().drain(..) {
            let _ = tx.send(());
        }
        for service in self.services.read().values() {
            let mut status = service.status.lock();
            if status.state != ServiceState::Unknown {
                status.state = ServiceState::Stopped;
            }
        }
    }
}

/// One health check plus the resulting state transition.
async fn check_service<P: Prober>(service: &Supervised, prober: &P, bus: &IngestBus) {
    let result = prober.check(&service.config.check).await;
    let now = Utc::now();

    match result {
        Ok(round_trip) => {
            let became_healthy = {
                let mut status = service.status.lock();
                let was = status.state;
                status.state = ServiceState::Healthy;
                status.failure_count = 0;
                status.last_check = Some(now);
                status.last_error = None;
                status.response_time_ms = Some(round_trip.as_millis() as u64);
                was != ServiceState::Healthy
            };
            if became_healthy {
                info!(service = %service.config.id, "service healthy");
                bus.publish_control(ControlEvent::ServiceHealthy {
                    service: service.config.id.clone(),
                })
                .await;
            }
        }
        Err(error) => {
            let reason = error.to_string();
            let (became_unhealthy, should_restart) = {
                let mut status = service.status.lock();
                if status.state == ServiceState::Starting {
                    // Failures during startup are expected; don't count them.
                    status.last_check = Some(now);
                    return;
                }
                let was = status.state;
                status.failure_count += 1;
                status.state = ServiceState::Unhealthy;
                status.last_check = Some(now);
                status.last_error = Some(reason.clone());
                (
                    was == ServiceState::Healthy || was == ServiceState::Unknown,
                    status.failure_count >= service.config.max_failures,
                )
            };

            if became_unhealthy {
                warn!(service = %service.config.id, %reason, "service unhealthy");
                bus.publish_control(ControlEvent::ServiceUnhealthy {
                    service: service.config.id.clone(),
                    reason: reason.clone(),
                })
                .await;
            }

            if should_restart {
                restart_service(service, prober, bus).await;
            }
        }
    }
}

async fn restart_service<P: Prober>(service: &Supervised, prober: &P, bus: &IngestBus) {
    let restart_count = {
        let mut status = service.status.lock();
        status.state = ServiceState::Starting;
        status.restart_count += 1;
        status.restart_count
    };
    info!(service = %service.config.id, restart_count, "restarting service");
    bus.publish_control(ControlEvent::ServiceRestarting {
        service: service.config.id.clone(),
        restart_count,
    })
    .await;

    match prober.restart(&service.config.restart).await {
        Ok(()) => {
            tokio::time::sleep(service.config.restart_delay).await;
            let mut status = service.status.lock();
            status.failure_count = 0;
            // The service has not proven itself yet; leave `starting` only
            // until the next check, which either promotes to healthy or
            // begins a fresh failure count.
            if status.state == ServiceState::Starting {
                status.state = ServiceState::Unhealthy;
            }
        }
        Err(error) => {
            warn!(service = %service.config.id, error = %error, "restart failed");
            let mut status = service.status.lock();
            status.state = ServiceState::Unhealthy;
            status.last_error = Some(error.to_string());
            status.failure_count = 0;
        }
    }
}

#[cfg(test)]
#[path = "supervisor_tests.rs"]
mod tests;
