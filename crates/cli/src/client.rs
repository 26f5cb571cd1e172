// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire-protocol client: connects to `triaged`'s Unix socket and speaks
//! the request/response protocol of §6.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use tokio::net::UnixStream;
use tokio::time::timeout;
use triage_daemon::env;
use triage_wire::{read_response, write_request, Request, Response};

use crate::exit_error::ExitError;

pub struct Client {
    stream: UnixStream,
}

impl Client {
    /// Connect to the daemon socket under `state_dir`. Fails with an
    /// operational error if no daemon is listening there.
    pub async fn connect(state_dir: &Path) -> Result<Self> {
        let socket_path = env::socket_path(state_dir);
        let stream = UnixStream::connect(&socket_path)
            .await
            .map_err(|_| ExitError::operational("daemon not running"))?;
        Ok(Self { stream })
    }

    pub async fn send(&mut self, request: Request) -> Result<Response> {
        write_request(&mut self.stream, &request).await?;
        let response = timeout(env::ipc_timeout(), read_response(&mut self.stream))
            .await
            .map_err(|_| ExitError::operational("daemon did not respond in time"))??;
        Ok(response)
    }
}

/// Locate the `triaged` binary: prefer one next to the running `triage`
/// executable, otherwise rely on `PATH`.
pub fn find_triaged_binary() -> PathBuf {
    if let Ok(exe) = std::env::current_exe() {
        if let Some(dir) = exe.parent() {
            let sibling = dir.join("triaged");
            if sibling.exists() {
                return sibling;
            }
        }
    }
    PathBuf::from("triaged")
}

/// Spawn `triaged` detached in the background, pointed at `state_dir`, and
/// wait until its socket accepts connections (or the IPC timeout elapses).
pub async fn spawn_and_wait_ready(state_dir: &Path) -> Result<()> {
    let binary = find_triaged_binary();
    std::process::Command::new(&binary)
        .arg(state_dir)
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .spawn()
        .map_err(|e| ExitError::operational(format!("failed to start daemon: {e}")))?;

    let deadline = env::ipc_timeout();
    let step = Duration::from_millis(100);
    let attempts = (deadline.as_millis() / step.as_millis()).max(1) as u32;
    for _ in 0..attempts {
        if Client::connect(state_dir).await.is_ok() {
            return Ok(());
        }
        tokio::time::sleep(step).await;
    }
    Err(ExitError::operational("daemon did not become ready in time").into())
}
