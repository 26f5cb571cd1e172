// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon startup and shutdown: the process singleton lock (§4.M),
//! directory scaffolding, and the set of long-lived engines the pipeline
//! loop drives.

use std::fs::File;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use fs2::FileExt;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;
use triage_backup::BackupStore;
use triage_bus::MessageBus;
use triage_core::{Clock, Config, ConfigError, SystemClock};
use triage_locks::{LockManager, UnixProcessChecker};
use triage_pipeline::{Classifier, GroupingEngine, LearnerError, PatternLearner, StatisticsEngine};
use triage_repair::{RepairEngine, RepairHistoryStore};
use triage_watcher::LogWatcher;

use crate::env;

#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("another daemon instance already holds {path}: {source}")]
    LockHeld { path: PathBuf, #[source] source: std::io::Error },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("store error: {0}")]
    Store(#[from] triage_core::StoreError),
    #[error("coordinator error: {0}")]
    Coordinator(#[from] triage_coordinator::CoordinatorError),
    #[error("learner error: {0}")]
    Learner(#[from] LearnerError),
    #[error("watcher error: {0}")]
    Watcher(#[from] triage_watcher::WatcherError),
}

/// `<state>/triage.lock` contents (§4.M), written once the exclusive lock
/// is held.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LockRecord {
    pid: u32,
    start_time: u64,
    hostname: String,
}

fn hostname() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "unknown".to_string())
}

/// Holds the exclusive advisory lock on `<state>/triage.lock` for the
/// process lifetime; the lock is released on drop.
pub struct ProcessLock {
    file: File,
    path: PathBuf,
}

impl ProcessLock {
    /// Acquire the singleton lock, failing with [`DaemonError::LockHeld`] if
    /// another instance already holds it (`triaged start` against the same
    /// state directory exits 1).
    pub fn acquire(state_dir: &Path, now: u64) -> Result<Self, DaemonError> {
        std::fs::create_dir_all(state_dir)?;
        let path = env::lock_path(state_dir);

        let file = std::fs::OpenOptions::new().write(true).create(true).truncate(false).open(&path)?;
        file.try_lock_exclusive().map_err(|source| DaemonError::LockHeld { path: path.clone(), source })?;

        let mut file = file;
        file.set_len(0)?;
        let record = LockRecord { pid: std::process::id(), start_time: now, hostname: hostname() };
        writeln!(file, "{}", serde_json::to_string(&record).unwrap_or_default())?;

        Ok(Self { file, path })
    }
}

impl Drop for ProcessLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
        let _ = std::fs::remove_file(&self.path);
    }
}

/// The fixed set of long-lived engines the pipeline loop (Components
/// H→C→D→E→F→G) and the coordinator (Component J) drive, wired together
/// from one loaded [`Config`].
pub struct Engines<C: Clock> {
    pub watcher: LogWatcher<C>,
    pub classifier: Classifier,
    pub grouping: GroupingEngine<triage_core::UuidIdGen>,
    pub statistics: StatisticsEngine<C>,
    pub repair: RepairEngine<C, UnixProcessChecker>,
    pub coordinator: triage_coordinator::Coordinator<C>,
}

impl Engines<SystemClock> {
    pub fn open(config: &Config, clock: SystemClock) -> Result<Self, DaemonError> {
        std::fs::create_dir_all(&config.state_dir)?;
        std::fs::create_dir_all(&config.log_dir)?;
        std::fs::create_dir_all(&config.backup_dir)?;
        std::fs::create_dir_all(&config.repair_history_dir)?;
        std::fs::create_dir_all(&config.message_bus_dir)?;

        let watcher = LogWatcher::open(&config.log_dir, &config.state_dir, config, clock.clone())?;
        let classifier = Classifier::builtin(config.watcher.vendored_marker.clone());
        let grouping = GroupingEngine::open(config.state_dir.join("groups.json"), config.grouping.clone(), triage_core::UuidIdGen)?;
        let statistics = StatisticsEngine::open(config.state_dir.join("statistics.json"), config.statistics.clone(), clock.clone())?;
        let learner = PatternLearner::open(config.state_dir.join("learner.json"), config.learner.clone(), clock.clone())?;
        let backups = BackupStore::new(&config.backup_dir, config.backup.clone(), clock.clone());
        let locks = LockManager::new(clock.clone(), UnixProcessChecker);
        let history = RepairHistoryStore::open(&config.repair_history_dir)?;
        let repair = RepairEngine::new(backups, locks, learner, history, config.repair.clone(), clock.clone());
        let coordinator = triage_coordinator::Coordinator::new(&config.message_bus_dir, config.coordinator.clone(), clock);

        info!(state_dir = %config.state_dir.display(), "engines initialized");
        Ok(Self { watcher, classifier, grouping, statistics, repair, coordinator })
    }
}

/// Resolve the effective config: explicit path argument wins, else the
/// default `<state>/config.toml`, falling back to built-in defaults when
/// absent (a malformed file is still a fatal [`ConfigError`]).
pub fn load_config(state_dir: &Path, explicit_path: Option<&Path>) -> Result<Config, ConfigError> {
    let dir = explicit_path.unwrap_or(state_dir);
    Config::load(dir)
}
