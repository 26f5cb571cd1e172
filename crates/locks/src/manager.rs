// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The lock table itself: one [`KeyState`] per contended key, guarded by a
//! single mutex. Granting and releasing are synchronous and fast; only the
//! waiting side (`acquire` blocking on a free key) suspends.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::{debug, warn};
use triage_core::{Clock, LockHolder, LockInfo, LockPriority, TaskId};

use crate::deadlock::detect_cycle;
use crate::error::LockError;
use crate::process::ProcessChecker;
use crate::waiter::{sort_key, WaiterTicket};

/// Per-call acquisition parameters (§3 `Lock`, minus the key itself).
#[derive(Debug, Clone)]
pub struct AcquireOpts {
    pub priority: LockPriority,
    pub pid: u32,
    pub task_id: Option<TaskId>,
    pub ttl_ms: u64,
}

impl AcquireOpts {
    pub fn new(priority: LockPriority, pid: u32, ttl_ms: u64) -> Self {
        Self { priority, pid, task_id: None, ttl_ms }
    }

    pub fn with_task(mut self, task_id: TaskId) -> Self {
        self.task_id = Some(task_id);
        self
    }
}

#[derive(Default)]
struct KeyState {
    holder: Option<LockHolder>,
    waiters: Vec<WaiterTicket>,
}

impl KeyState {
    fn node_id(&self) -> Option<String> {
        self.holder.as_ref().map(|h| match &h.task_id {
            Some(id) => format!("task:{id}"),
            None => format!("pid:{}", h.pid),
        })
    }
}

struct Inner<C: Clock, P: ProcessChecker> {
    clock: C,
    process_checker: P,
    keys: Mutex<HashMap<String, KeyState>>,
}

/// Keyed exclusive lock table with TTL, priority waiter queues, stale-holder
/// eviction, and cycle-based deadlock abort (Component B).
///
/// Cheap to clone: internal state is `Arc`-shared, matching the pattern
/// every long-lived component in this workspace follows so a handle can be
/// passed into a spawned task without lifetime gymnastics.
pub struct LockManager<C: Clock, P: ProcessChecker> {
    inner: Arc<Inner<C, P>>,
}

impl<C: Clock, P: ProcessChecker> Clone for LockManager<C, P> {
    fn clone(&self) -> Self {
        Self { inner: self.inner.clone() }
    }
}

/// An acquired lock. Releasing is automatic on drop, matching §4.G's
/// "the lock is always released on every exit path" invariant — callers
/// can't forget to release by simply keeping the guard in scope.
pub struct LockGuard<C: Clock, P: ProcessChecker> {
    manager: LockManager<C, P>,
    key: String,
    released: bool,
}

impl<C: Clock, P: ProcessChecker> LockGuard<C, P> {
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Release explicitly (e.g. to observe who got granted next in a test).
    pub fn release(mut self) {
        self.manager.release(&self.key);
        self.released = true;
    }
}

impl<C: Clock, P: ProcessChecker> Drop for LockGuard<C, P> {
    fn drop(&mut self) {
        if !self.released {
            self.manager.release(&self.key);
        }
    }
}

impl<C: Clock, P: ProcessChecker> LockManager<C, P> {
    pub fn new(clock: C, process_checker: P) -> Self {
        Self { inner: Arc::new(Inner { clock, process_checker, keys: Mutex::new(HashMap::new()) }) }
    }

    /// Acquire `key`, blocking (as an async wait) up to `timeout` if held.
    /// Resolves `Ok` immediately on a free or stale-held key.
    pub async fn acquire(
        &self,
        key: impl Into<String>,
        opts: AcquireOpts,
        timeout: Duration,
    ) -> Result<LockGuard<C, P>, LockError> {
        let key = key.into();
        let rx = {
            let mut keys = self.inner.keys.lock();
            match self.try_grant_locked(&mut keys, &key, &opts) {
                Granted::Now => return Ok(self.guard(key)),
                Granted::Queued(rx) => rx,
            }
        };

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(Ok(()))) => Ok(self.guard(key)),
            Ok(Ok(Err(e))) => Err(e),
            Ok(Err(_)) => Err(LockError::ManagerShutdown { key }),
            Err(_) => {
                self.cancel_waiter(&key, opts.pid, &opts.task_id);
                let waited_ms = timeout.as_millis() as u64;
                Err(LockError::AcquireTimeout { key, waited_ms })
            }
        }
    }

    /// Non-blocking variant: grants immediately on a free/stale key, else
    /// fails without enqueueing a waiter.
    pub fn try_acquire(
        &self,
        key: impl Into<String>,
        opts: AcquireOpts,
    ) -> Result<LockGuard<C, P>, LockError> {
        let key = key.into();
        let mut keys = self.inner.keys.lock();
        let state = keys.entry(key.clone()).or_default();
        if self.can_grant(state) {
            state.holder = Some(self.holder_from(&opts));
            drop(keys);
            return Ok(self.guard(key));
        }
        Err(LockError::AcquireTimeout { key, waited_ms: 0 })
    }

    /// Release `key`, granting the next queued waiter if any. No-op
    /// (returns `false`) if the key isn't held — §8 invariant 4.
    pub fn release(&self, key: &str) -> bool {
        let mut keys = self.inner.keys.lock();
        let Some(state) = keys.get_mut(key) else { return false };
        if state.holder.is_none() {
            return false;
        }
        state.waiters.sort_by_key(sort_key);
        if state.waiters.is_empty() {
            keys.remove(key);
            return true;
        }
        let next = state.waiters.remove(0);
        let holder = LockHolder::new(next.pid, next.task_id.clone(), self.inner.clock.epoch_ms(), next.ttl_ms);
        state.holder = Some(holder);
        let _ = next.resolver.send(Ok(()));
        true
    }

    /// Snapshot the current state of `key` for observability.
    pub fn status(&self, key: &str) -> LockInfo {
        let keys = self.inner.keys.lock();
        match keys.get(key) {
            Some(state) => LockInfo {
                key: key.to_string(),
                holder: state.holder.clone(),
                waiters: state.waiters.len() as u32,
            },
            None => LockInfo { key: key.to_string(), holder: None, waiters: 0 },
        }
    }

    /// Build the waiter-dependency graph across every key and abort the
    /// lowest-priority waiter in the first cycle found (§4.B, §8 invariant
    /// 8). Returns the aborted waiter's key and node id, if any.
    pub fn detect_and_break_deadlock(&self) -> Option<(String, String)> {
        let mut keys = self.inner.keys.lock();
        let mut edges = Vec::new();
        for (_key, state) in keys.iter() {
            let Some(holder_node) = state.node_id() else { continue };
            for waiter in &state.waiters {
                edges.push((waiter.node_id(), holder_node.clone()));
            }
        }
        let cycle = detect_cycle(&edges)?;
        let cycle_nodes: std::collections::HashSet<&str> = cycle.iter().map(|s| s.as_str()).collect();

        // Among waiters whose node participates in the cycle, abort the one
        // with the lowest priority (ties broken by latest enqueue time).
        let mut victim: Option<(String, usize, LockPriority, u64)> = None;
        for (key, state) in keys.iter() {
            for (idx, waiter) in state.waiters.iter().enumerate() {
                if !cycle_nodes.contains(waiter.node_id().as_str()) {
                    continue;
                }
                let candidate = (key.clone(), idx, waiter.priority, waiter.enqueued_at);
                let worse = match &victim {
                    None => true,
                    Some((_, _, p, t)) => (candidate.2, std::cmp::Reverse(candidate.3)) > (*p, std::cmp::Reverse(*t)),
                };
                if worse {
                    victim = Some(candidate);
                }
            }
        }

        let (key, idx, _, _) = victim?;
        let state = keys.get_mut(&key)?;
        let waiter = state.waiters.remove(idx);
        let node_id = waiter.node_id();
        warn!(lock_key = %key, node = %node_id, "deadlock detected, aborting waiter");
        let _ = waiter.resolver.send(Err(LockError::DeadlockAbort { key: key.clone() }));
        Some((key, node_id))
    }

    fn guard(&self, key: String) -> LockGuard<C, P> {
        LockGuard { manager: self.clone(), key, released: false }
    }

    fn holder_from(&self, opts: &AcquireOpts) -> LockHolder {
        LockHolder::new(opts.pid, opts.task_id.clone(), self.inner.clock.epoch_ms(), opts.ttl_ms)
    }

    /// True if `state` has no holder, or its holder is stale (expired TTL or
    /// dead PID) per §4.B.
    fn can_grant(&self, state: &KeyState) -> bool {
        match &state.holder {
            None => true,
            Some(holder) => {
                let now = self.inner.clock.epoch_ms();
                holder.is_stale(now) || !self.inner.process_checker.is_alive(holder.pid)
            }
        }
    }

    fn try_grant_locked(
        &self,
        keys: &mut HashMap<String, KeyState>,
        key: &str,
        opts: &AcquireOpts,
    ) -> Granted {
        let state = keys.entry(key.to_string()).or_default();
        if self.can_grant(state) {
            state.holder = Some(self.holder_from(opts));
            return Granted::Now;
        }
        let (tx, rx) = oneshot::channel();
        let ticket = WaiterTicket::new(
            opts.priority,
            self.inner.clock.epoch_ms(),
            opts.task_id.clone(),
            opts.pid,
            opts.ttl_ms,
            tx,
        );
        state.waiters.push(ticket);
        state.waiters.sort_by_key(sort_key);
        debug!(lock_key = %key, waiters = state.waiters.len(), "enqueued lock waiter");
        Granted::Queued(rx)
    }

    fn cancel_waiter(&self, key: &str, pid: u32, task_id: &Option<TaskId>) {
        let mut keys = self.inner.keys.lock();
        if let Some(state) = keys.get_mut(key) {
            state.waiters.retain(|w| !(w.pid == pid && &w.task_id == task_id));
        }
    }
}

enum Granted {
    Now,
    Queued(oneshot::Receiver<Result<(), LockError>>),
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;
