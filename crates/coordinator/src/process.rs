// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Child-process handle for one worker agent. Spawning follows the same
//! `tokio::process::Command` idiom as `triage_shell::run_with_timeout`;
//! this module additionally tracks exit time for the respawn cool-off.

use std::collections::BTreeSet;
use std::io;
use std::time::Duration;

use triage_core::{AgentName, TaskType};

/// Static configuration for one supervised worker, provided at startup —
/// the coordinator does not discover workers dynamically.
#[derive(Debug, Clone)]
pub struct WorkerSpec {
    pub name: AgentName,
    pub command: String,
    pub args: Vec<String>,
    pub capabilities: BTreeSet<TaskType>,
    pub max_concurrent: u32,
    pub auto_restart: bool,
}

pub struct WorkerProcess {
    spec: WorkerSpec,
    child: tokio::process::Child,
    exited_at: Option<u64>,
}

impl WorkerProcess {
    /// Spawn `spec.command` with `spec.name` exposed via `AGENT_NAME` in the
    /// child's environment (§4.J step 1).
    pub fn spawn(spec: WorkerSpec) -> io::Result<Self> {
        let mut cmd = tokio::process::Command::new(&spec.command);
        cmd.args(&spec.args);
        cmd.env("AGENT_NAME", spec.name.as_str());
        cmd.kill_on_drop(true);
        let child = cmd.spawn()?;
        Ok(Self { spec, child, exited_at: None })
    }

    pub fn spec(&self) -> &WorkerSpec {
        &self.spec
    }

    /// Non-blocking exit check. `now` is recorded as the exit time the first
    /// time this observes the child has exited.
    pub fn has_exited(&mut self, now: u64) -> bool {
        if self.exited_at.is_some() {
            return true;
        }
        match self.child.try_wait() {
            Ok(Some(_status)) => {
                self.exited_at = Some(now);
                true
            }
            _ => false,
        }
    }

    pub fn since_exit_ms(&self, now: u64) -> u64 {
        self.exited_at.map(|t| now.saturating_sub(t)).unwrap_or(0)
    }

    /// Kill the child immediately, used by the health check on an
    /// unresponsive agent.
    pub fn kill(&mut self) {
        let _ = self.child.start_kill();
    }

    /// Best-effort graceful shutdown: kill the child and wait up to `grace`
    /// for it to be reaped.
    pub async fn terminate(&mut self, grace: Duration) {
        let _ = self.child.start_kill();
        let _ = tokio::time::timeout(grace, self.child.wait()).await;
    }
}
