// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use tokio::sync::oneshot;
use triage_core::{LockPriority, TaskId};

use crate::error::LockError;

/// A queued request for a lock key that is currently held (§3 `WaiterTicket`).
///
/// The manager resolves `resolver` exactly once: `Ok(())` when granted,
/// `Err(LockError::AcquireTimeout | DeadlockAbort | ManagerShutdown)`
/// otherwise. Ordered by priority (urgent first), then by `enqueued_at`
/// within a priority band (§8 invariants 5 and 6).
pub struct WaiterTicket {
    pub priority: LockPriority,
    pub enqueued_at: u64,
    pub task_id: Option<TaskId>,
    pub pid: u32,
    pub ttl_ms: u64,
    pub resolver: oneshot::Sender<Result<(), LockError>>,
}

impl WaiterTicket {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        priority: LockPriority,
        enqueued_at: u64,
        task_id: Option<TaskId>,
        pid: u32,
        ttl_ms: u64,
        resolver: oneshot::Sender<Result<(), LockError>>,
    ) -> Self {
        Self { priority, enqueued_at, task_id, pid, ttl_ms, resolver }
    }

    /// Graph node identity used by deadlock detection: the task id when
    /// known, else a PID-derived synthetic id.
    pub fn node_id(&self) -> String {
        match &self.task_id {
            Some(id) => format!("task:{id}"),
            None => format!("pid:{}", self.pid),
        }
    }
}

/// Sort key for the waiter queue: lower is granted first. `LockPriority`'s
/// derived `Ord` already ranks `Urgent < High < Normal < Low`, so pairing it
/// with `enqueued_at` gives strict priority, FIFO within a priority.
pub fn sort_key(ticket: &WaiterTicket) -> (LockPriority, u64) {
    (ticket.priority, ticket.enqueued_at)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sort_key_orders_urgent_before_low() {
        let (tx1, _rx1) = oneshot::channel();
        let (tx2, _rx2) = oneshot::channel();
        let urgent = WaiterTicket::new(LockPriority::Urgent, 100, None, 1, 1000, tx1);
        let low = WaiterTicket::new(LockPriority::Low, 1, None, 2, 1000, tx2);
        assert!(sort_key(&urgent) < sort_key(&low));
    }

    #[test]
    fn sort_key_orders_by_enqueue_time_within_priority() {
        let (tx1, _rx1) = oneshot::channel();
        let (tx2, _rx2) = oneshot::channel();
        let earlier = WaiterTicket::new(LockPriority::Normal, 10, None, 1, 1000, tx1);
        let later = WaiterTicket::new(LockPriority::Normal, 20, None, 2, 1000, tx2);
        assert!(sort_key(&earlier) < sort_key(&later));
    }
}
