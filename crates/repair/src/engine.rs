// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Repair orchestration (Component G, §4.G): admission, locking, backup,
//! execute, validate, commit/rollback — the `attemptRepair` state machine.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use tracing::{info, warn};
use triage_backup::BackupStore;
use triage_core::{
    Clock, ErrorEvent, GroupId, LockPriority, RepairBackupRef, RepairChange, RepairConfig,
    RepairId, RepairOutcome, RepairResult, Severity,
};
use triage_locks::{AcquireOpts, LockManager, ProcessChecker};
use triage_pipeline::PatternLearner;

use crate::error::RepairError;
use crate::history::RepairHistoryStore;
use crate::strategy::{builtin_strategies, minimal_validate, RepairStrategy};

/// Per-attempt knobs (§4.G steps 3 and 6).
#[derive(Debug, Clone, Default)]
pub struct RepairOptions {
    pub dry_run: bool,
    pub skip_test: bool,
    /// The project's test command, if one was discoverable (§6); absent
    /// falls through to the minimal syntactic/JSON validator.
    pub test_command: Option<(String, Vec<String>)>,
    pub pid: u32,
}

fn lock_priority(severity: Severity) -> LockPriority {
    match severity {
        Severity::Critical | Severity::High => LockPriority::High,
        Severity::Medium => LockPriority::Normal,
        Severity::Low => LockPriority::Low,
    }
}

/// Orchestrates one repair attempt end to end, owning the strategy
/// registry and the handles to backup/locks/learner/history it coordinates
/// (§4.G).
pub struct RepairEngine<C: Clock, P: ProcessChecker> {
    strategies: HashMap<&'static str, Box<dyn RepairStrategy>>,
    backups: BackupStore<C>,
    locks: LockManager<C, P>,
    learner: PatternLearner<C>,
    history: RepairHistoryStore,
    config: RepairConfig,
    clock: C,
}

impl<C: Clock, P: ProcessChecker> RepairEngine<C, P> {
    pub fn new(
        backups: BackupStore<C>,
        locks: LockManager<C, P>,
        learner: PatternLearner<C>,
        history: RepairHistoryStore,
        config: RepairConfig,
        clock: C,
    ) -> Self {
        let strategies = builtin_strategies().into_iter().map(|s| (s.pattern_id(), s)).collect();
        Self { strategies, backups, locks, learner, history, config, clock }
    }

    /// `attemptRepair(event, opts) -> outcome` (§4.G).
    pub async fn attempt_repair(
        &self,
        event: &ErrorEvent,
        group_id: &GroupId,
        opts: RepairOptions,
    ) -> Result<RepairResult, RepairError> {
        let started_at = self.clock.epoch_ms();
        let pattern_id = event.classification.pattern_id.as_str();

        // Step 1: admission.
        if !event.classification.matched {
            return Err(RepairError::NotRepairable { reason: "classification is unmatched".to_string() });
        }
        let Some(strategy) = self.strategies.get(pattern_id) else {
            return Err(RepairError::NotRepairable { reason: format!("no strategy registered for {pattern_id}") });
        };
        if self.learner.is_disabled(pattern_id) {
            return Err(RepairError::NotRepairable { reason: format!("pattern {pattern_id} is disabled") });
        }
        if let Some(stats) = self.learner.get(pattern_id) {
            if stats.attempts > self.config.admission_min_attempts && stats.success_rate() < self.config.admission_success_rate_floor {
                return Err(RepairError::NotRepairable {
                    reason: format!("pattern {pattern_id} success rate {:.2} is below the admission floor", stats.success_rate()),
                });
            }
        }
        if !strategy.can_repair(event) {
            return Err(RepairError::NotRepairable { reason: format!("strategy for {pattern_id} declined this event") });
        }

        // Step 2: lock the per-source-file key.
        let lock_key = event
            .source_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| format!("group:{group_id}"));
        let priority = lock_priority(event.classification.severity);
        let lock_opts = AcquireOpts::new(priority, opts.pid, self.config.lock_acquire_timeout_ms);
        let timeout = Duration::from_millis(self.config.lock_acquire_timeout_ms);
        let guard = self.locks.acquire(lock_key.clone(), lock_opts, timeout).await?;

        let repair_id = RepairId::new();

        // Step 3: dry-run gate.
        if opts.dry_run {
            drop(guard);
            let finished_at = self.clock.epoch_ms();
            let result = RepairResult {
                repair_id,
                group_id: group_id.clone(),
                pattern_id: pattern_id.to_string(),
                outcome: RepairOutcome::Committed,
                backups: vec![],
                created_files: vec![],
                changes: vec![RepairChange { path: lock_key, description: "dry run, no side effects".to_string() }],
                rejection_reason: None,
                started_at,
                finished_at,
            };
            info!(repair_id = %result.repair_id, pattern_id, "dry run repair attempt");
            return Ok(result);
        }

        // Step 4: plan every file the strategy will touch and back up each
        // one that already exists — this must finish before step 5's
        // `repair` makes a single write, or the backup would snapshot
        // already-modified content.
        let plan = match strategy.files_to_touch(event) {
            Ok(plan) => plan,
            Err(e) => {
                drop(guard);
                let result = self.finish_failed(event, repair_id, group_id, pattern_id, started_at, vec![], vec![], &e)?;
                return Ok(result);
            }
        };

        let mut backups = Vec::new();
        let mut created_files = Vec::new();
        for touched in &plan {
            if touched.existed {
                match self.backups.create_backup(&touched.path) {
                    Ok(reference) => backups.push(RepairBackupRef { path: touched.path.clone(), backup_id: reference.backup_id }),
                    Err(e) => {
                        let pairs: Vec<_> = backups.iter().map(|b: &RepairBackupRef| (b.backup_id, b.path.clone())).collect();
                        self.backups.rollback(&pairs, &created_files);
                        drop(guard);
                        let reason = format!("backup failed for {}: {e}", touched.path.display());
                        let result = self.finish_failed(event, repair_id, group_id, pattern_id, started_at, backups, created_files, &reason)?;
                        return Ok(result);
                    }
                }
            } else {
                created_files.push(touched.path.clone());
            }
        }

        // Step 5: execute. Every file it can touch is already backed up or
        // tracked as to-be-created, so any failure here is safe to roll
        // back in full.
        let outcome = match strategy.repair(event) {
            Ok(outcome) => outcome,
            Err(strategy_error) => {
                self.backups.rollback(&backups.iter().map(|b| (b.backup_id, b.path.clone())).collect::<Vec<_>>(), &created_files);
                drop(guard);
                let result = self.finish_failed(event, repair_id, group_id, pattern_id, started_at, backups, created_files, &strategy_error)?;
                return Ok(result);
            }
        };

        let changes: Vec<RepairChange> = vec![RepairChange { path: lock_key.clone(), description: outcome.description.clone() }];

        // Step 6: validate.
        if let Err(validation_error) = strategy.validate(&outcome) {
            self.backups.rollback(&backups.iter().map(|b| (b.backup_id, b.path.clone())).collect::<Vec<_>>(), &created_files);
            drop(guard);
            let result = self.finish_failed(event, repair_id, group_id, pattern_id, started_at, backups, created_files, &validation_error)?;
            return Ok(result);
        }

        if strategy.test_required() && !opts.skip_test {
            let test_ok = self.run_validation(&outcome.touched[0], &opts).await;
            if let Err(test_error) = test_ok {
                self.backups.rollback(&backups.iter().map(|b| (b.backup_id, b.path.clone())).collect::<Vec<_>>(), &created_files);
                drop(guard);
                let result = self.finish_failed(event, repair_id, group_id, pattern_id, started_at, backups, created_files, &test_error)?;
                return Ok(result);
            }
        }

        // Step 7: commit.
        drop(guard);
        self.learner.record_result(pattern_id, true, self.clock.epoch_ms().saturating_sub(started_at), event)?;
        let finished_at = self.clock.epoch_ms();
        let result = RepairResult {
            repair_id,
            group_id: group_id.clone(),
            pattern_id: pattern_id.to_string(),
            outcome: RepairOutcome::Committed,
            backups,
            created_files,
            changes,
            rejection_reason: None,
            started_at,
            finished_at,
        };
        self.history.append(result.clone())?;
        info!(repair_id = %result.repair_id, pattern_id, duration_ms = result.duration_ms(), "repair committed");
        Ok(result)
    }

    async fn run_validation(&self, path: &std::path::Path, opts: &RepairOptions) -> Result<(), String> {
        match &opts.test_command {
            Some((command, args)) => {
                let cwd = path.parent().unwrap_or_else(|| std::path::Path::new("."));
                let timeout = Duration::from_millis(self.config.test_command_timeout_ms);
                let outcome = triage_shell::run_with_timeout(command, args, cwd, timeout).await.map_err(|e| e.to_string())?;
                if outcome.succeeded() {
                    Ok(())
                } else {
                    Err(format!("test command exited {}: {}", outcome.exit_code, outcome.stderr))
                }
            }
            None => minimal_validate(path),
        }
    }

    fn finish_failed(
        &self,
        event: &ErrorEvent,
        repair_id: RepairId,
        group_id: &GroupId,
        pattern_id: &str,
        started_at: u64,
        backups: Vec<RepairBackupRef>,
        created_files: Vec<PathBuf>,
        reason: &str,
    ) -> Result<RepairResult, RepairError> {
        let finished_at = self.clock.epoch_ms();
        self.learner.record_result(pattern_id, false, finished_at.saturating_sub(started_at), event)?;
        let result = RepairResult {
            repair_id,
            group_id: group_id.clone(),
            pattern_id: pattern_id.to_string(),
            outcome: RepairOutcome::RolledBack,
            backups,
            created_files,
            changes: vec![],
            rejection_reason: Some(reason.to_string()),
            started_at,
            finished_at,
        };
        self.history.append(result.clone())?;
        warn!(repair_id = %result.repair_id, pattern_id, reason, "repair rolled back");
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use triage_backup::BackupStore;
    use triage_core::test_support::{classification, error_event_with_classification};
    use triage_core::{BackupConfig, FakeClock, GroupId, LearnerConfig};
    use triage_locks::{LockManager, UnixProcessChecker};
    use triage_pipeline::PatternLearner;

    fn engine(dir: &std::path::Path, clock: FakeClock) -> RepairEngine<FakeClock, UnixProcessChecker> {
        let backups = BackupStore::new(dir.join("backups"), BackupConfig::default(), clock.clone());
        let locks = LockManager::new(clock.clone(), UnixProcessChecker);
        let learner = PatternLearner::open(dir.join("learning.json"), LearnerConfig::default(), clock.clone()).unwrap();
        let history = RepairHistoryStore::open(dir.join("history")).unwrap();
        RepairEngine::new(backups, locks, learner, history, RepairConfig::default(), clock)
    }

    fn event_for(pattern_id: &str, severity: Severity, path: PathBuf, line: Option<u32>) -> ErrorEvent {
        let mut event = error_event_with_classification("h", 1, "boom", classification(pattern_id, severity));
        event.source_file = Some(path);
        event.source_line = line;
        event
    }

    #[tokio::test]
    async fn missing_file_repair_commits() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine(dir.path(), FakeClock::new());
        let target = dir.path().join("config.json");
        let event = event_for("EP004", Severity::Medium, target.clone(), None);
        let result = engine.attempt_repair(&event, &GroupId::new(), RepairOptions { pid: 1, ..Default::default() }).await.unwrap();
        assert_eq!(result.outcome, RepairOutcome::Committed);
        assert!(target.exists());
    }

    #[tokio::test]
    async fn admission_rejects_unmatched_classification() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine(dir.path(), FakeClock::new());
        let mut event = event_for("EP004", Severity::Medium, dir.path().join("x.json"), None);
        event.classification.matched = false;
        let err = engine.attempt_repair(&event, &GroupId::new(), RepairOptions { pid: 1, ..Default::default() }).await.unwrap_err();
        assert!(matches!(err, RepairError::NotRepairable { .. }));
    }

    #[tokio::test]
    async fn admission_rejects_when_no_strategy_registered() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine(dir.path(), FakeClock::new());
        let event = event_for("EP099", Severity::Medium, dir.path().join("x.json"), None);
        let err = engine.attempt_repair(&event, &GroupId::new(), RepairOptions { pid: 1, ..Default::default() }).await.unwrap_err();
        assert!(matches!(err, RepairError::NotRepairable { .. }));
    }

    #[tokio::test]
    async fn strategy_failure_rolls_back_with_no_backups() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine(dir.path(), FakeClock::new());
        let target = dir.path().join("already-there.json");
        std::fs::write(&target, "{}").unwrap();
        let event = event_for("EP004", Severity::Medium, target, None);
        let result = engine.attempt_repair(&event, &GroupId::new(), RepairOptions { pid: 1, ..Default::default() }).await.unwrap();
        assert_eq!(result.outcome, RepairOutcome::RolledBack);
        assert!(result.backups.is_empty());
    }

    #[tokio::test]
    async fn dry_run_makes_no_side_effects() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine(dir.path(), FakeClock::new());
        let target = dir.path().join("config.json");
        let event = event_for("EP004", Severity::Medium, target.clone(), None);
        let result = engine
            .attempt_repair(&event, &GroupId::new(), RepairOptions { pid: 1, dry_run: true, ..Default::default() })
            .await
            .unwrap();
        assert_eq!(result.outcome, RepairOutcome::Committed);
        assert!(!target.exists());
    }

    #[tokio::test]
    async fn null_guard_repair_commits_on_a_js_file() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine(dir.path(), FakeClock::new());
        let target = dir.path().join("a.js");
        std::fs::write(&target, "function f() {\n  return foo.bar;\n}\n").unwrap();
        let event = event_for("EP001", Severity::High, target.clone(), Some(2));
        let result = engine.attempt_repair(&event, &GroupId::new(), RepairOptions { pid: 1, ..Default::default() }).await.unwrap();
        assert_eq!(result.outcome, RepairOutcome::Committed);
        assert!(!result.backups.is_empty());
        let contents = std::fs::read_to_string(&target).unwrap();
        assert!(contents.contains("if (foo === undefined || foo === null)"));
    }

    #[tokio::test]
    async fn validation_failure_restores_the_file_byte_identical_to_pre_attempt() {
        // Source already has an unbalanced brace, so the guard-inserted
        // version fails `validate` too and the engine must roll back. If
        // the backup were taken after `repair` ran (the bug this guards
        // against), the restore would write back the post-repair bytes and
        // this would still see the guard line after rollback.
        let dir = tempfile::tempdir().unwrap();
        let engine = engine(dir.path(), FakeClock::new());
        let target = dir.path().join("a.js");
        let original = "function f() {\n  return foo.bar;\n";
        std::fs::write(&target, original).unwrap();
        let event = event_for("EP001", Severity::High, target.clone(), Some(2));
        let result = engine.attempt_repair(&event, &GroupId::new(), RepairOptions { pid: 1, ..Default::default() }).await.unwrap();
        assert_eq!(result.outcome, RepairOutcome::RolledBack);
        let contents = std::fs::read_to_string(&target).unwrap();
        assert_eq!(contents, original);
    }
}
