// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! triage-watcher: the periodic log scanner (Component H, §4.H). Enumerates
//! files matching a configured glob, assembles header/continuation-line
//! entries, and drops fingerprints already seen via a persisted dedup set.

mod dedup;
mod parser;

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{instrument, warn};
use triage_core::{Clock, Config, RawLogEntry, StoreError};

pub use dedup::ProcessedErrorsStore;
pub use parser::{extract_timestamp, parse_log};

#[derive(Debug, Error)]
pub enum WatcherError {
    #[error("invalid glob pattern {pattern}: {source}")]
    Pattern { pattern: String, #[source] source: glob::PatternError },
    #[error("dedup store error: {0}")]
    Store(#[from] StoreError),
}

/// Periodic glob-driven log scanner. Owned by the daemon and polled at
/// `config.watcher.scan_interval_ms`.
pub struct LogWatcher<C: Clock> {
    log_dir: PathBuf,
    glob: String,
    markers: Vec<String>,
    continuation_indent: usize,
    vendored_marker: String,
    processed: ProcessedErrorsStore,
    clock: C,
}

impl<C: Clock> LogWatcher<C> {
    pub fn open(log_dir: impl Into<PathBuf>, state_dir: &Path, config: &Config, clock: C) -> Result<Self, WatcherError> {
        let processed = ProcessedErrorsStore::open(
            state_dir.join("processed-errors.json"),
            config.watcher.processed_errors_cap,
        )?;
        Ok(Self {
            log_dir: log_dir.into(),
            glob: config.watcher.log_glob.clone(),
            markers: config.watcher.error_markers.clone(),
            continuation_indent: config.watcher.continuation_indent,
            vendored_marker: config.watcher.vendored_marker.clone(),
            processed,
            clock,
        })
    }

    /// One scan pass: enumerate matching files, parse each, and return the
    /// subset of entries whose fingerprint has not been seen before. Files
    /// under a path component equal to `vendored_marker` are skipped.
    #[instrument(skip(self), fields(log_dir = %self.log_dir.display()))]
    pub fn scan(&mut self) -> Result<Vec<RawLogEntry>, WatcherError> {
        let pattern = self.log_dir.join(&self.glob);
        let pattern = pattern.to_string_lossy().into_owned();
        let paths = glob::glob(&pattern).map_err(|source| WatcherError::Pattern { pattern: pattern.clone(), source })?;

        let mut fresh = Vec::new();
        for entry in paths {
            let path = match entry {
                Ok(path) => path,
                Err(e) => {
                    warn!(error = %e, "failed to read directory entry during log scan");
                    continue;
                }
            };
            if path.components().any(|c| c.as_os_str() == self.vendored_marker.as_str()) {
                continue;
            }
            let text = match fs::read_to_string(&path) {
                Ok(text) => text,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "failed to read log file");
                    continue;
                }
            };
            let ingest_time = self.clock.epoch_ms();
            let entries = parse_log(&text, &self.markers, self.continuation_indent, ingest_time);
            for entry in entries {
                let hash = triage_pipeline::text::fingerprint(&entry.level.to_string(), &entry.message, &entry.stack_lines);
                if !self.processed.check_and_insert(&hash)? {
                    fresh.push(entry);
                }
            }
        }
        Ok(fresh)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use triage_core::SystemClock;

    fn config() -> Config {
        Config::default()
    }

    #[test]
    fn scan_emits_new_entries_and_skips_repeats_on_next_scan() {
        let log_dir = tempfile::tempdir().unwrap();
        let state_dir = tempfile::tempdir().unwrap();
        fs::write(log_dir.path().join("app.log"), "[ERROR] boom\n    at foo (a.js:1:1)\n").unwrap();

        let mut watcher = LogWatcher::open(log_dir.path(), state_dir.path(), &config(), SystemClock).unwrap();
        let first = watcher.scan().unwrap();
        assert_eq!(first.len(), 1);

        let second = watcher.scan().unwrap();
        assert!(second.is_empty(), "duplicate entry should be suppressed on the second scan");
    }

    #[test]
    fn vendored_paths_are_skipped() {
        let log_dir = tempfile::tempdir().unwrap();
        let state_dir = tempfile::tempdir().unwrap();
        let vendor_dir = log_dir.path().join("node_modules");
        fs::create_dir_all(&vendor_dir).unwrap();
        fs::write(vendor_dir.join("dep.log"), "[ERROR] vendored boom\n").unwrap();

        let mut cfg = config();
        cfg.watcher.log_glob = "**/*.log".to_string();
        let mut watcher = LogWatcher::open(log_dir.path(), state_dir.path(), &cfg, SystemClock).unwrap();
        let entries = watcher.scan().unwrap();
        assert!(entries.is_empty());
    }

    #[test]
    fn non_matching_files_are_ignored() {
        let log_dir = tempfile::tempdir().unwrap();
        let state_dir = tempfile::tempdir().unwrap();
        fs::write(log_dir.path().join("notes.txt"), "[ERROR] should not be scanned\n").unwrap();

        let mut watcher = LogWatcher::open(log_dir.path(), state_dir.path(), &config(), SystemClock).unwrap();
        assert!(watcher.scan().unwrap().is_empty());
    }
}
