// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! mcplog daemon (mcplogd)
//!
//! Background process that discovers AI-assistant log sources, tails
//! them, and fans entries out to storage, live subscribers and syslog
//! collectors.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

use mcplog_daemon::lifecycle::{self, Config, LifecycleError};
use mcplog_daemon::env;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Rotate the previous log aside once it exceeds this size.
const MAX_LOG_BYTES: u64 = 32 * 1024 * 1024;

#[tokio::main]
async fn main() {
    std::process::exit(run().await);
}

async fn run() -> i32 {
    if let Some(arg) = std::env::args().nth(1) {
        match arg.as_str() {
            "--version" | "-V" | "-v" => {
                println!("mcplogd {}", env!("CARGO_PKG_VERSION"));
                return 0;
            }
            "--help" | "-h" | "help" => {
                print_help();
                return 0;
            }
            _ => {
                eprintln!("error: unexpected argument '{arg}'");
                eprintln!("Usage: mcplogd [--help | --version]");
                return 1;
            }
        }
    }

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("mcplogd: {e}");
            return 1;
        }
    };

    if let Err(e) = std::fs::create_dir_all(&config.state_dir) {
        eprintln!("mcplogd: cannot create state dir: {e}");
        return 1;
    }
    rotate_log_if_needed(&config.log_path);

    let _log_guard = match setup_logging(&config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("mcplogd: cannot open log file: {e}");
            return 1;
        }
    };

    info!(version = env!("CARGO_PKG_VERSION"), "starting mcplogd");

    let daemon = match lifecycle::startup(config).await {
        Ok(daemon) => daemon,
        Err(LifecycleError::LockFailed(_)) => {
            eprintln!("mcplogd is already running");
            return 1;
        }
        Err(e) => {
            error!(error = %e, "startup failed");
            eprintln!("mcplogd: startup failed: {e}");
            return 1;
        }
    };

    // Signal readiness to wrappers (tests, service managers).
    println!("READY");

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(e) => {
            error!(error = %e, "cannot install SIGTERM handler");
            return 2;
        }
    };
    let mut sigint = match signal(SignalKind::interrupt()) {
        Ok(s) => s,
        Err(e) => {
            error!(error = %e, "cannot install SIGINT handler");
            return 2;
        }
    };

    tokio::select! {
        _ = sigterm.recv() => info!("SIGTERM received"),
        _ = sigint.recv() => info!("SIGINT received"),
    }

    lifecycle::shutdown(daemon).await;
    0
}

fn print_help() {
    println!("mcplogd {}", env!("CARGO_PKG_VERSION"));
    println!("Multi-source log aggregation daemon for AI coding assistants");
    println!();
    println!("USAGE:");
    println!("    mcplogd");
    println!();
    println!("Discovers log-producing agents, tails their log files, stores");
    println!("normalized entries, streams them to TCP subscribers, and");
    println!("forwards them to syslog collectors.");
    println!();
    println!("OPTIONS:");
    println!("    -h, --help       Print help information");
    println!("    -v, --version    Print version information");
}

/// Move an oversized previous log aside so each run starts lean.
fn rotate_log_if_needed(log_path: &std::path::Path) {
    let Ok(meta) = std::fs::metadata(log_path) else {
        return;
    };
    if meta.len() > MAX_LOG_BYTES {
        let rotated = log_path.with_extension("log.1");
        let _ = std::fs::rename(log_path, rotated);
    }
}

fn setup_logging(
    config: &Config,
) -> std::io::Result<tracing_appender::non_blocking::WorkerGuard> {
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.log_path)?;
    let (writer, guard) = tracing_appender::non_blocking(file);
    let filter = EnvFilter::try_new(env::log_level())
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .init();
    Ok(guard)
}
