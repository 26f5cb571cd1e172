// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tracing setup: a rotating-by-restart file appender plus `RUST_LOG`
//! env-filter, matching the teacher daemon's logging initialization.

use std::path::Path;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install the global subscriber, returning the worker guard that must be
/// held for the process lifetime to keep the non-blocking writer flushing.
pub fn init(log_path: &Path) -> std::io::Result<tracing_appender::non_blocking::WorkerGuard> {
    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let dir = log_path.parent().unwrap_or_else(|| Path::new("."));
    let file_name = log_path.file_name().unwrap_or_else(|| std::ffi::OsStr::new("triaged.log"));
    let file_appender = tracing_appender::rolling::never(dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry().with(filter).with(fmt::layer().with_writer(non_blocking)).init();

    Ok(guard)
}
