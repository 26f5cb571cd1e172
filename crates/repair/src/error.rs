// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;
use triage_backup::BackupError;
use triage_core::StoreError;
use triage_locks::LockError;

/// Failure modes surfaced by [`crate::RepairEngine::attempt_repair`] (§7).
#[derive(Debug, Error)]
pub enum RepairError {
    /// Admission-time rejection (§4.G step 1): unmatched classification, no
    /// registered strategy, a learner-disabled pattern, or a chronically
    /// failing pattern past the admission floor.
    #[error("not repairable: {reason}")]
    NotRepairable { reason: String },

    /// Lock acquisition timed out (§4.G step 2); no attempt is recorded.
    #[error("busy: {0}")]
    Busy(#[from] LockError),

    /// The strategy's own `validate`, or the test-command/minimal-validator
    /// fallback, reported failure; the attempt was rolled back.
    #[error("validation failed: {0}")]
    ValidationFailure(String),

    #[error("backup store error: {0}")]
    Backup(#[from] BackupError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}
