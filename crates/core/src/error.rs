// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared error taxonomy (§7). Each crate that owns one of these kinds
//! defines its own `thiserror` enum; the two kinds with no single owning
//! component — transient I/O and configuration failure — live here so
//! every crate can depend on a common vocabulary instead of boxing
//! `anyhow::Error` at a public boundary.

use std::path::PathBuf;
use thiserror::Error;

/// A filesystem or subprocess failure the caller may choose to retry.
///
/// Never surfaced as a hard error on its own; components wrap it into
/// their own error enum (see `triage-locks::LockError`,
/// `triage-repair::RepairError`, etc.) so the retry decision stays local
/// to the caller, per §7's propagation policy.
#[derive(Debug, Error)]
#[error("transient I/O error: {source}")]
pub struct TransientIo {
    #[source]
    pub source: std::io::Error,
}

impl From<std::io::Error> for TransientIo {
    fn from(source: std::io::Error) -> Self {
        Self { source }
    }
}

/// Malformed or missing required configuration. Fatal at daemon startup;
/// the binary exits 2 (§6's CLI exit-code contract).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file {path} not found, using built-in defaults")]
    NotFound { path: PathBuf },

    #[error("config file {path} could not be read: {source}")]
    Read { path: PathBuf, #[source] source: std::io::Error },

    #[error("config file {path} is not valid TOML: {source}")]
    Parse { path: PathBuf, #[source] source: toml::de::Error },

    #[error("config value out of range: {field} = {value} ({reason})")]
    OutOfRange { field: &'static str, value: String, reason: &'static str },
}
