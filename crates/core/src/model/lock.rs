// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lock holders and waiter priorities (Component B). The waiter queue itself
//! lives in `triage-locks`; this module holds only the data the queue is
//! built from.

use serde::{Deserialize, Serialize};

use crate::model::ids::TaskId;

/// Priority band a waiter is enqueued under. Ordered `Urgent > High >
/// Normal > Low` — derive order follows declaration order, so keep `Urgent`
/// first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockPriority {
    Urgent,
    High,
    Normal,
    Low,
}

/// The record stored for whoever currently holds a lock key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockHolder {
    pub pid: u32,
    pub task_id: Option<TaskId>,
    pub acquired_at: u64,
    pub ttl_ms: u64,
}

impl LockHolder {
    pub fn new(pid: u32, task_id: Option<TaskId>, acquired_at: u64, ttl_ms: u64) -> Self {
        Self { pid, task_id, acquired_at, ttl_ms }
    }

    pub fn expires_at(&self) -> u64 {
        self.acquired_at.saturating_add(self.ttl_ms)
    }

    pub fn is_stale(&self, now: u64) -> bool {
        now >= self.expires_at()
    }
}

/// Public view of a lock key's state, returned from status queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockInfo {
    pub key: String,
    pub holder: Option<LockHolder>,
    pub waiters: u32,
}

#[cfg(test)]
#[path = "lock_tests.rs"]
mod tests;
