// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Repair attempts and their committed history (Component G).

use serde::{Deserialize, Serialize};

use crate::model::ids::{BackupId, GroupId, RepairId};

/// A single file mutation applied by a repair strategy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepairChange {
    pub path: String,
    pub description: String,
}

/// One file's backup, taken before a strategy touches it. A multi-file
/// repair accumulates one of these per file; rollback walks them in
/// reverse order (§4.G "restores files in the reverse order they were
/// backed up to keep atomicity under multi-file repairs").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepairBackupRef {
    pub path: std::path::PathBuf,
    pub backup_id: BackupId,
}

/// Terminal outcome of an `attemptRepair` state machine run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepairOutcome {
    Committed,
    RolledBack,
    Rejected,
}

/// The result of a single repair attempt, win or lose.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepairResult {
    pub repair_id: RepairId,
    pub group_id: GroupId,
    pub pattern_id: String,
    pub outcome: RepairOutcome,
    pub backups: Vec<RepairBackupRef>,
    pub created_files: Vec<std::path::PathBuf>,
    pub changes: Vec<RepairChange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    pub started_at: u64,
    pub finished_at: u64,
}

impl RepairResult {
    pub fn duration_ms(&self) -> u64 {
        self.finished_at.saturating_sub(self.started_at)
    }

    pub fn succeeded(&self) -> bool {
        matches!(self.outcome, RepairOutcome::Committed)
    }
}

/// A committed-history entry, appended once per finished attempt and never
/// mutated afterward — the durable record behind `repairHistory`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepairHistoryEntry {
    pub result: RepairResult,
    pub attempt_number: u32,
}

#[cfg(test)]
#[path = "repair_tests.rs"]
mod tests;
