// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Triage Daemon (`triaged`)
//!
//! Background process that owns the error-remediation pipeline: the log
//! watcher ticks on `scan_interval_ms`, feeding classified events through
//! grouping, statistics, and (where admissible) the repair engine; the
//! agent coordinator separately polls its message bus on
//! `polling_interval_ms`. The daemon is typically started by the `triage`
//! CLI and serves its `start`/`stop`/`status` commands over a Unix socket.

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod env;
mod lifecycle;
mod listener;
mod logging;
mod pipeline;

use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::net::UnixListener;
use tokio::sync::Notify;
use tokio::time::{interval, Duration};
use tracing::{error, info, warn};
use triage_core::{Clock, SystemClock};
use triage_wire::{AgentStatusEntry, StatusSummary};

use crate::lifecycle::{DaemonError, Engines, ProcessLock};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("triaged: {e}");
        std::process::exit(exit_code_for(&e));
    }
}

fn exit_code_for(e: &DaemonError) -> i32 {
    match e {
        DaemonError::Config(_) => 2,
        _ => 1,
    }
}

async fn run() -> Result<(), DaemonError> {
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let state_dir = env::state_dir();
    let config = lifecycle::load_config(&state_dir, config_path.as_deref())?;

    let _log_guard = logging::init(&env::log_path(&config.state_dir))?;
    info!("starting triaged");

    let clock = SystemClock;
    let _lock = ProcessLock::acquire(&config.state_dir, clock.epoch_ms())?;

    let mut engines = Engines::open(&config, clock)?;

    let socket_path = env::socket_path(&config.state_dir);
    let _ = std::fs::remove_file(&socket_path);
    let unix_listener = UnixListener::bind(&socket_path)?;

    let status = Arc::new(Mutex::new(StatusSummary::default()));
    let shutdown = Arc::new(Notify::new());
    let reload = Arc::new(Notify::new());
    let ctx = Arc::new(listener::ListenerCtx {
        status: Arc::clone(&status),
        shutdown: Arc::clone(&shutdown),
        reload: Arc::clone(&reload),
    });
    tokio::spawn(listener::run(unix_listener, ctx));

    let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;
    let mut sigint = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt())?;

    let mut scan_tick = interval(Duration::from_millis(config.watcher.scan_interval_ms));
    let mut poll_tick = interval(Duration::from_millis(config.coordinator.polling_interval_ms));

    info!(socket = %socket_path.display(), "daemon ready");
    println!("READY");

    loop {
        tokio::select! {
            _ = scan_tick.tick() => {
                match engines.run_ingest_cycle().await {
                    Ok(n) if n > 0 => info!(entries = n, "ingest cycle processed entries"),
                    Ok(_) => {}
                    Err(e) => error!(error = %e, "ingest cycle failed"),
                }
                refresh_status(&engines, &status);
            }
            _ = poll_tick.tick() => {
                if let Err(e) = engines.coordinator.poll_once() {
                    error!(error = %e, "coordinator poll failed");
                }
                if let Err(e) = engines.coordinator.reap_and_respawn() {
                    error!(error = %e, "coordinator reap failed");
                }
                refresh_status(&engines, &status);
            }
            _ = reload.notified() => {
                info!("reloading configuration");
                match lifecycle::load_config(&config.state_dir, None) {
                    Ok(_) => info!("configuration reloaded"),
                    Err(e) => warn!(error = %e, "failed to reload configuration, keeping the previous one"),
                }
            }
            _ = shutdown.notified() => {
                info!("shutdown requested over the wire protocol");
                break;
            }
            _ = sigterm.recv() => {
                info!("received SIGTERM, shutting down");
                break;
            }
            _ = sigint.recv() => {
                info!("received SIGINT, shutting down");
                break;
            }
        }
    }

    engines.coordinator.shutdown().await;
    let _ = std::fs::remove_file(&socket_path);
    info!("daemon stopped");
    Ok(())
}

fn refresh_status(engines: &Engines<SystemClock>, status: &Arc<Mutex<StatusSummary>>) {
    let agents: Vec<AgentStatusEntry> = engines
        .coordinator
        .agents()
        .map(|a| AgentStatusEntry {
            name: a.name.to_string(),
            status: format!("{:?}", a.status).to_lowercase(),
            active_tasks: a.active_tasks,
            max_concurrent: a.max_concurrent,
        })
        .collect();

    let summary = StatusSummary {
        groups_open: engines.grouping.open_groups().len(),
        pending_repairs: engines.coordinator.pending_of_type(triage_core::TaskType::Repair),
        agents,
        queue_depth: engines.coordinator.pending_count(),
    };
    *status.lock() = summary;
}
