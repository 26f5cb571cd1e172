// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

/// Failure modes surfaced by [`crate::LockManager`] (§7).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LockError {
    /// The caller's deadline elapsed before the key became available.
    #[error("timed out waiting for lock {key:?} after {waited_ms}ms")]
    AcquireTimeout { key: String, waited_ms: u64 },

    /// The deadlock detector aborted this waiter to break a wait cycle.
    #[error("aborted to break a deadlock cycle on lock {key:?}")]
    DeadlockAbort { key: String },

    /// The manager is shutting down; pending waiters are cancelled.
    #[error("lock manager shut down while waiting for {key:?}")]
    ManagerShutdown { key: String },
}
