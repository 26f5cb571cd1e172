// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon crate.

use std::path::{Path, PathBuf};
use std::time::Duration;

/// Resolve state directory: `TRIAGE_STATE_DIR` > `XDG_STATE_HOME/triage` >
/// `~/.local/state/triage`.
pub fn state_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("TRIAGE_STATE_DIR") {
        return PathBuf::from(dir);
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return PathBuf::from(xdg).join("triage");
    }
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(".local/state/triage")
}

/// Path to the daemon's Unix domain socket, under the state directory.
pub fn socket_path(state_dir: &Path) -> PathBuf {
    state_dir.join("triage.sock")
}

/// Path to the process singleton lock file (§4.M).
pub fn lock_path(state_dir: &Path) -> PathBuf {
    state_dir.join("triage.lock")
}

/// Path to the daemon's log file.
pub fn log_path(state_dir: &Path) -> PathBuf {
    state_dir.join("triaged.log")
}

/// IPC round-trip timeout used by the CLI client.
pub fn ipc_timeout() -> Duration {
    std::env::var("TRIAGE_IPC_TIMEOUT_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_secs(5))
}
