// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn record() -> AgentRecord {
    let mut caps = BTreeSet::new();
    caps.insert(TaskType::Repair);
    AgentRecord::new(AgentName::new("worker-1"), caps, 2, 1000)
}

#[test]
fn new_record_starts_initializing_with_zero_active_tasks() {
    let r = record();
    assert_eq!(r.status, AgentRecordStatus::Initializing);
    assert_eq!(r.active_tasks, 0);
    assert_eq!(r.last_heartbeat, 1000);
}

#[test]
fn has_capacity_respects_max_concurrent() {
    let mut r = record();
    assert!(r.has_capacity());
    r.active_tasks = 2;
    assert!(!r.has_capacity());
}

#[test]
fn can_handle_checks_capability_set() {
    let r = record();
    assert!(r.can_handle(TaskType::Repair));
    assert!(!r.can_handle(TaskType::Backup));
}

#[test]
fn unresponsive_once_heartbeat_gap_meets_timeout() {
    let r = record();
    assert!(!r.is_unresponsive(1999, 1000));
    assert!(r.is_unresponsive(2000, 1000));
}

#[test]
fn serializes_round_trip() {
    let r = record();
    let json = serde_json::to_string(&r).unwrap();
    let back: AgentRecord = serde_json::from_str(&json).unwrap();
    assert_eq!(r, back);
}
