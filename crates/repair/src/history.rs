// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Repair history persistence (§6: `<repair-history>/<repairId>.json`
//! detail file plus `<repair-history>/index.json` summary index).

use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use triage_core::store::save_atomic;
use triage_core::{AtomicJsonStore, RepairHistoryEntry, RepairResult, StoreError};

/// Owns the history directory: one detail file per attempt, plus a single
/// append-only index used by the daemon's status summary.
pub struct RepairHistoryStore {
    dir: PathBuf,
    index: Mutex<AtomicJsonStore<Vec<RepairHistoryEntry>>>,
}

impl RepairHistoryStore {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        let index = AtomicJsonStore::open(dir.join("index.json"))?;
        Ok(Self { dir, index: Mutex::new(index) })
    }

    /// Append one finished attempt: write its detail file, then append the
    /// same entry to the index (§9's append-only `RepairHistoryEntry`).
    pub fn append(&self, result: RepairResult) -> Result<RepairHistoryEntry, StoreError> {
        let mut index = self.index.lock();
        let attempt_number = index.get().len() as u32 + 1;
        let entry = RepairHistoryEntry { result, attempt_number };
        save_atomic(&self.dir.join(format!("{}.json", entry.result.repair_id)), &entry)?;
        index.update(|entries| entries.push(entry.clone()))?;
        Ok(entry)
    }

    pub fn entries(&self) -> Vec<RepairHistoryEntry> {
        self.index.lock().get().clone()
    }

    /// Attempts recorded for `pattern_id`, most recent last.
    pub fn for_pattern(&self, pattern_id: &str) -> Vec<RepairHistoryEntry> {
        self.entries().into_iter().filter(|e| e.result.pattern_id == pattern_id).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use triage_core::{GroupId, RepairId, RepairOutcome};

    fn result(pattern_id: &str, outcome: RepairOutcome) -> RepairResult {
        RepairResult {
            repair_id: RepairId::new(),
            group_id: GroupId::new(),
            pattern_id: pattern_id.to_string(),
            outcome,
            backups: vec![],
            created_files: vec![],
            changes: vec![],
            rejection_reason: None,
            started_at: 0,
            finished_at: 10,
        }
    }

    #[test]
    fn append_writes_a_detail_file_and_grows_the_index() {
        let dir = tempfile::tempdir().unwrap();
        let store = RepairHistoryStore::open(dir.path()).unwrap();
        let entry = store.append(result("EP001", RepairOutcome::Committed)).unwrap();
        assert_eq!(entry.attempt_number, 1);
        assert!(dir.path().join(format!("{}.json", entry.result.repair_id)).exists());
        assert_eq!(store.entries().len(), 1);
    }

    #[test]
    fn for_pattern_filters_by_pattern_id() {
        let dir = tempfile::tempdir().unwrap();
        let store = RepairHistoryStore::open(dir.path()).unwrap();
        store.append(result("EP001", RepairOutcome::Committed)).unwrap();
        store.append(result("EP004", RepairOutcome::RolledBack)).unwrap();
        assert_eq!(store.for_pattern("EP001").len(), 1);
    }
}
