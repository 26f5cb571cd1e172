// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn priority_ordering_is_urgent_first() {
    assert!(LockPriority::Urgent < LockPriority::High);
    assert!(LockPriority::High < LockPriority::Normal);
    assert!(LockPriority::Normal < LockPriority::Low);
}

#[test]
fn holder_is_stale_once_ttl_elapses() {
    let holder = LockHolder::new(1234, None, 1000, 500);
    assert!(!holder.is_stale(1499));
    assert!(holder.is_stale(1500));
    assert!(holder.is_stale(2000));
}

#[test]
fn expires_at_saturates_on_overflow() {
    let holder = LockHolder::new(1, None, u64::MAX - 10, 100);
    assert_eq!(holder.expires_at(), u64::MAX);
}

#[test]
fn lock_info_serializes_round_trip() {
    let info = LockInfo {
        key: "src/a.js".to_string(),
        holder: Some(LockHolder::new(99, Some(TaskId::new()), 10, 20)),
        waiters: 3,
    };
    let json = serde_json::to_string(&info).unwrap();
    let back: LockInfo = serde_json::from_str(&json).unwrap();
    assert_eq!(info, back);
}
