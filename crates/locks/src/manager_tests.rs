// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::collections::HashSet;
use std::sync::Mutex as StdMutex;
use std::time::Duration;

use triage_core::{FakeClock, LockPriority};

use super::*;

#[derive(Clone, Default)]
struct FakeProcessChecker {
    dead: std::sync::Arc<StdMutex<HashSet<u32>>>,
}

impl FakeProcessChecker {
    fn kill(&self, pid: u32) {
        self.dead.lock().unwrap().insert(pid);
    }
}

impl ProcessChecker for FakeProcessChecker {
    fn is_alive(&self, pid: u32) -> bool {
        !self.dead.lock().unwrap().contains(&pid)
    }
}

fn manager() -> LockManager<FakeClock, FakeProcessChecker> {
    LockManager::new(FakeClock::new(), FakeProcessChecker::default())
}

#[tokio::test]
async fn second_caller_blocks_until_release() {
    let mgr = manager();
    let guard = mgr.acquire("k", AcquireOpts::new(LockPriority::Normal, 1, 30_000), Duration::from_millis(500)).await.unwrap();

    let mgr2 = mgr.clone();
    let waiter = tokio::spawn(async move {
        mgr2.acquire("k", AcquireOpts::new(LockPriority::Normal, 2, 30_000), Duration::from_secs(5)).await
    });

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!waiter.is_finished());

    guard.release();
    let result = waiter.await.unwrap();
    assert!(result.is_ok());
}

#[tokio::test]
async fn release_of_unheld_key_is_noop() {
    let mgr = manager();
    assert!(!mgr.release("never-held"));
}

#[tokio::test]
async fn fifo_within_equal_priority() {
    let mgr = manager();
    let guard = mgr.acquire("k", AcquireOpts::new(LockPriority::Normal, 1, 30_000), Duration::from_millis(500)).await.unwrap();

    let order = std::sync::Arc::new(StdMutex::new(Vec::new()));
    let mut handles = Vec::new();
    for pid in [2u32, 3, 4] {
        let mgr2 = mgr.clone();
        let order2 = order.clone();
        handles.push(tokio::spawn(async move {
            let g = mgr2.acquire("k", AcquireOpts::new(LockPriority::Normal, pid, 30_000), Duration::from_secs(5)).await.unwrap();
            order2.lock().unwrap().push(pid);
            g.release();
        }));
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    guard.release();
    for h in handles {
        h.await.unwrap();
    }
    assert_eq!(*order.lock().unwrap(), vec![2, 3, 4]);
}

#[tokio::test]
async fn higher_priority_waiter_jumps_the_queue() {
    let mgr = manager();
    let guard = mgr.acquire("k", AcquireOpts::new(LockPriority::Normal, 1, 30_000), Duration::from_millis(500)).await.unwrap();

    let order = std::sync::Arc::new(StdMutex::new(Vec::new()));

    let mgr_low = mgr.clone();
    let order_low = order.clone();
    let low = tokio::spawn(async move {
        let g = mgr_low.acquire("k", AcquireOpts::new(LockPriority::Low, 2, 30_000), Duration::from_secs(5)).await.unwrap();
        order_low.lock().unwrap().push("low");
        g.release();
    });
    tokio::time::sleep(Duration::from_millis(10)).await;

    let mgr_urgent = mgr.clone();
    let order_urgent = order.clone();
    let urgent = tokio::spawn(async move {
        let g = mgr_urgent.acquire("k", AcquireOpts::new(LockPriority::Urgent, 3, 30_000), Duration::from_secs(5)).await.unwrap();
        order_urgent.lock().unwrap().push("urgent");
        g.release();
    });
    tokio::time::sleep(Duration::from_millis(10)).await;

    guard.release();
    low.await.unwrap();
    urgent.await.unwrap();
    assert_eq!(*order.lock().unwrap(), vec!["urgent", "low"]);
}

#[tokio::test]
async fn acquire_times_out_when_never_released() {
    let mgr = manager();
    let _guard = mgr.acquire("k", AcquireOpts::new(LockPriority::Normal, 1, 30_000), Duration::from_millis(500)).await.unwrap();

    let err = mgr.acquire("k", AcquireOpts::new(LockPriority::Normal, 2, 30_000), Duration::from_millis(30)).await.unwrap_err();
    assert!(matches!(err, LockError::AcquireTimeout { .. }));
}

#[tokio::test]
async fn stale_holder_with_expired_ttl_is_evicted() {
    let clock = FakeClock::new();
    let mgr = LockManager::new(clock.clone(), FakeProcessChecker::default());
    let _first = mgr.acquire("k", AcquireOpts::new(LockPriority::Normal, 1, 10), Duration::from_millis(500)).await.unwrap();

    clock.advance(Duration::from_millis(50));

    // The caller never released, but the TTL has elapsed: the second
    // acquire must succeed without waiting (§8 invariant 7).
    let second = mgr.acquire("k", AcquireOpts::new(LockPriority::Normal, 2, 10_000), Duration::from_millis(50)).await;
    assert!(second.is_ok());
}

#[tokio::test]
async fn stale_holder_with_dead_pid_is_evicted() {
    let checker = FakeProcessChecker::default();
    let mgr = LockManager::new(FakeClock::new(), checker.clone());
    let first = mgr.acquire("k", AcquireOpts::new(LockPriority::Normal, 99999, 30_000), Duration::from_millis(500)).await.unwrap();
    std::mem::forget(first); // simulate a crash: never released

    checker.kill(99999);
    let second = mgr.try_acquire("k", AcquireOpts::new(LockPriority::Normal, 2, 30_000));
    assert!(second.is_ok());
}

#[tokio::test]
async fn try_acquire_fails_without_waiting_when_held_and_live() {
    let mgr = manager();
    let _guard = mgr.acquire("k", AcquireOpts::new(LockPriority::Normal, 1, 30_000), Duration::from_millis(500)).await.unwrap();
    let err = mgr.try_acquire("k", AcquireOpts::new(LockPriority::Normal, 2, 30_000)).unwrap_err();
    assert!(matches!(err, LockError::AcquireTimeout { waited_ms: 0, .. }));
}

#[tokio::test]
async fn deadlock_cycle_aborts_lower_priority_waiter() {
    let mgr = manager();
    let pa = triage_core::TaskId::from_string("tsk-pa000000000000000000");
    let pb = triage_core::TaskId::from_string("tsk-pb000000000000000000");

    // Pa holds K1, Pb holds K2.
    let g_k1 = mgr.acquire("K1", AcquireOpts::new(LockPriority::Normal, 10, 30_000).with_task(pa.clone()), Duration::from_millis(500)).await.unwrap();
    let g_k2 = mgr.acquire("K2", AcquireOpts::new(LockPriority::Normal, 20, 30_000).with_task(pb.clone()), Duration::from_millis(500)).await.unwrap();

    // Pa waits on K2 (normal), Pb waits on K1 (low) -> cycle.
    let mgr_a = mgr.clone();
    let pa2 = pa.clone();
    let wait_a = tokio::spawn(async move {
        mgr_a.acquire("K2", AcquireOpts::new(LockPriority::Normal, 10, 30_000).with_task(pa2), Duration::from_secs(5)).await
    });
    tokio::time::sleep(Duration::from_millis(5)).await;

    let mgr_b = mgr.clone();
    let pb2 = pb.clone();
    let wait_b = tokio::spawn(async move {
        mgr_b.acquire("K1", AcquireOpts::new(LockPriority::Low, 20, 30_000).with_task(pb2), Duration::from_secs(5)).await
    });
    tokio::time::sleep(Duration::from_millis(5)).await;

    let aborted = mgr.detect_and_break_deadlock();
    assert!(aborted.is_some());

    let b_result = wait_b.await.unwrap();
    assert!(matches!(b_result, Err(LockError::DeadlockAbort { .. })));

    g_k2.release();
    let a_result = wait_a.await.unwrap();
    assert!(a_result.is_ok());

    g_k1.release();
}

#[tokio::test]
async fn no_cycle_means_no_abort() {
    let mgr = manager();
    let _g = mgr.acquire("k", AcquireOpts::new(LockPriority::Normal, 1, 30_000), Duration::from_millis(500)).await.unwrap();
    assert!(mgr.detect_and_break_deadlock().is_none());
}

#[test]
fn status_reports_no_holder_for_unknown_key() {
    let mgr = manager();
    let status = mgr.status("nope");
    assert!(status.holder.is_none());
    assert_eq!(status.waiters, 0);
}
