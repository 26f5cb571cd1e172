// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon-wide configuration (§9's "Configuration" note).
//!
//! One [`Config`] is loaded once at startup from `<state>/config.toml`
//! over documented defaults, and reloaded in place on `triage reload`
//! (§6's `Request::Reload`). Every tunable
//! named anywhere in the specification has a field and a default here so
//! no component reaches for a bare literal.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Grouping engine (Component D) tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupingConfig {
    /// Minimum weighted similarity for an event to join an existing group.
    pub similarity_threshold: f64,
    pub category_weight: f64,
    pub message_weight: f64,
    pub stack_weight: f64,
    /// Substring marking a vendored/third-party stack frame, skipped the
    /// same way the classifier skips it (§4.D step 1's "non-vendored
    /// frames").
    pub vendored_marker: String,
}

impl Default for GroupingConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.8,
            category_weight: 0.3,
            message_weight: 0.4,
            stack_weight: 0.3,
            vendored_marker: "node_modules".to_string(),
        }
    }
}

/// Lock manager (Component B) tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LockConfig {
    pub default_ttl_ms: u64,
    pub deadlock_detection_period_ms: u64,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self { default_ttl_ms: 30_000, deadlock_detection_period_ms: 30_000 }
    }
}

/// Statistics & trend (Component E) tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatisticsConfig {
    pub day_bucket_retention_days: u32,
    pub events_per_day_bucket_cap: usize,
    pub trend_window_days: u32,
    pub trend_smoothing_window: usize,
    pub trend_rate_threshold: f64,
}

impl Default for StatisticsConfig {
    fn default() -> Self {
        Self {
            day_bucket_retention_days: 30,
            events_per_day_bucket_cap: 100,
            trend_window_days: 7,
            trend_smoothing_window: 3,
            trend_rate_threshold: 0.15,
        }
    }
}

/// Pattern learner (Component F) tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LearnerConfig {
    pub min_attempts_before_disable: u32,
    pub disable_success_rate_below: f64,
    pub learned_pattern_success_delta: f64,
    pub learned_pattern_failure_delta: f64,
    pub learned_pattern_deactivate_below: f64,
    pub suggest_window_days: u32,
    pub suggest_min_occurrences: usize,
}

impl Default for LearnerConfig {
    fn default() -> Self {
        Self {
            min_attempts_before_disable: 5,
            disable_success_rate_below: 0.3,
            learned_pattern_success_delta: 0.1,
            learned_pattern_failure_delta: -0.05,
            learned_pattern_deactivate_below: 0.3,
            suggest_window_days: 7,
            suggest_min_occurrences: 3,
        }
    }
}

/// Repair engine (Component G) tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepairConfig {
    pub lock_acquire_timeout_ms: u64,
    pub test_command_timeout_ms: u64,
    pub admission_min_attempts: u32,
    pub admission_success_rate_floor: f64,
    pub auto_pr_enabled: bool,
}

impl Default for RepairConfig {
    fn default() -> Self {
        Self {
            lock_acquire_timeout_ms: 30_000,
            test_command_timeout_ms: 120_000,
            admission_min_attempts: 10,
            admission_success_rate_floor: 0.3,
            auto_pr_enabled: false,
        }
    }
}

/// Backup store (Component A) tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackupConfig {
    pub retention_days: u32,
    pub max_backups: usize,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self { retention_days: 30, max_backups: 500 }
    }
}

/// Log watcher (Component H) tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatcherConfig {
    pub scan_interval_ms: u64,
    pub log_glob: String,
    pub error_markers: Vec<String>,
    pub continuation_indent: usize,
    pub vendored_marker: String,
    pub processed_errors_cap: usize,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            scan_interval_ms: 300_000,
            log_glob: "*.log".to_string(),
            error_markers: vec!["[ERROR]".to_string(), "[FATAL]".to_string()],
            continuation_indent: 4,
            vendored_marker: "node_modules".to_string(),
            processed_errors_cap: 50_000,
        }
    }
}

/// Agent coordinator (Component J) tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    pub polling_interval_ms: u64,
    pub heartbeat_timeout_ms: u64,
    pub restart_cooloff_ms: u64,
    pub max_error_retries: u32,
    pub task_deadline_ms: u64,
    pub shutdown_grace_ms: u64,
    pub auto_restart: bool,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            polling_interval_ms: 3_000,
            heartbeat_timeout_ms: 60_000,
            restart_cooloff_ms: 5_000,
            max_error_retries: 3,
            task_deadline_ms: 3_600_000,
            shutdown_grace_ms: 10_000,
            auto_restart: true,
        }
    }
}

/// External-assistant adapter (§4.K) tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantConfig {
    pub response_timeout_ms: u64,
    pub agent_name: String,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self { response_timeout_ms: 600_000, agent_name: "assistant".to_string() }
    }
}

/// Top-level configuration, deserialized from `<state>/config.toml`.
///
/// Every field has a default, so a missing file (or an absent section
/// within a present file, thanks to `#[serde(default)]`) is never a hard
/// error — only a malformed file is (`ConfigError::Parse`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub state_dir: PathBuf,
    pub backup_dir: PathBuf,
    pub repair_history_dir: PathBuf,
    pub message_bus_dir: PathBuf,
    pub log_dir: PathBuf,
    pub grouping: GroupingConfig,
    pub locks: LockConfig,
    pub statistics: StatisticsConfig,
    pub learner: LearnerConfig,
    pub repair: RepairConfig,
    pub backup: BackupConfig,
    pub watcher: WatcherConfig,
    pub coordinator: CoordinatorConfig,
    pub assistant: AssistantConfig,
}

impl Default for Config {
    fn default() -> Self {
        let state_dir = PathBuf::from("./.triage");
        Self {
            backup_dir: state_dir.join("backups"),
            repair_history_dir: state_dir.join("repair-history"),
            message_bus_dir: state_dir.join("messages"),
            log_dir: state_dir.join("logs"),
            state_dir,
            grouping: GroupingConfig::default(),
            locks: LockConfig::default(),
            statistics: StatisticsConfig::default(),
            learner: LearnerConfig::default(),
            repair: RepairConfig::default(),
            backup: BackupConfig::default(),
            watcher: WatcherConfig::default(),
            coordinator: CoordinatorConfig::default(),
            assistant: AssistantConfig::default(),
        }
    }
}

impl Config {
    /// Load `<dir>/config.toml`, falling back to built-in defaults when the
    /// file is absent. A present-but-malformed file is a fatal
    /// [`ConfigError::Parse`] — the daemon exits 2 rather than guess.
    pub fn load(dir: &Path) -> Result<Self, ConfigError> {
        let path = dir.join("config.toml");
        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(source) if source.kind() == std::io::ErrorKind::NotFound => {
                let mut cfg = Self::default();
                cfg.state_dir = dir.to_path_buf();
                cfg.rebase_dirs();
                return Ok(cfg);
            }
            Err(source) => return Err(ConfigError::Read { path, source }),
        };
        let mut cfg: Config =
            toml::from_str(&text).map_err(|source| ConfigError::Parse { path, source })?;
        if cfg.state_dir == PathBuf::from("./.triage") {
            cfg.state_dir = dir.to_path_buf();
        }
        cfg.rebase_dirs();
        Ok(cfg)
    }

    /// Re-derive the directory fields that default to a subpath of
    /// `state_dir`, when a caller only overrode `state_dir`.
    fn rebase_dirs(&mut self) {
        let default_state = PathBuf::from("./.triage");
        if self.backup_dir == default_state.join("backups") {
            self.backup_dir = self.state_dir.join("backups");
        }
        if self.repair_history_dir == default_state.join("repair-history") {
            self.repair_history_dir = self.state_dir.join("repair-history");
        }
        if self.message_bus_dir == default_state.join("messages") {
            self.message_bus_dir = self.state_dir.join("messages");
        }
        if self.log_dir == default_state.join("logs") {
            self.log_dir = self.state_dir.join("logs");
        }
    }

    pub fn deadlock_detection_period(&self) -> Duration {
        Duration::from_millis(self.locks.deadlock_detection_period_ms)
    }

    pub fn watcher_scan_interval(&self) -> Duration {
        Duration::from_millis(self.watcher.scan_interval_ms)
    }

    pub fn coordinator_poll_interval(&self) -> Duration {
        Duration::from_millis(self.coordinator.polling_interval_ms)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
