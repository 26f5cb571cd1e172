// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A command sent from `triage` (the CLI) to `triaged` (the daemon) over
/// the wire protocol (§6).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Request {
    /// Start the daemon, optionally loading `config.toml` from a
    /// non-default path. Sent by the CLI only when it spawned the daemon
    /// itself and is waiting for its ready signal; a running daemon never
    /// receives this.
    Start {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        config_path: Option<PathBuf>,
    },
    /// Ask the daemon to shut down gracefully.
    Stop,
    /// Ask for a pipeline status summary.
    Status,
    /// Re-read `config.toml` without restarting the process.
    Reload,
}
