// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;

fn task() -> Task {
    Task::new(TaskId::new(), TaskType::Repair, json!({}), json!({"groupId": "grp-1"}), 1000)
}

#[test]
fn new_task_is_pending_and_unassigned() {
    let t = task();
    assert_eq!(t.status, TaskStatus::Pending);
    assert!(t.assigned_to.is_none());
    assert_eq!(t.retries, 0);
}

#[test]
fn assign_sets_assignee_without_changing_status() {
    let mut t = task();
    t.assign(AgentName::new("worker-1"));
    assert_eq!(t.status, TaskStatus::Pending);
    assert_eq!(t.assigned_to.as_ref().map(|a| a.as_str()), Some("worker-1"));
}

#[test]
fn accept_assigns_and_starts() {
    let mut t = task();
    t.accept(AgentName::new("worker-1"), 1100);
    assert_eq!(t.status, TaskStatus::Accepted);
    assert_eq!(t.assigned_to.as_ref().map(|a| a.as_str()), Some("worker-1"));
    assert_eq!(t.started_at, Some(1100));
}

#[test]
fn complete_records_result_and_timestamp() {
    let mut t = task();
    t.complete(json!({"ok": true}), 1200);
    assert_eq!(t.status, TaskStatus::Completed);
    assert_eq!(t.completed_at, Some(1200));
    assert!(t.result.is_some());
}

#[test]
fn fail_records_error_and_timestamp() {
    let mut t = task();
    t.fail("boom", 1300);
    assert_eq!(t.status, TaskStatus::Error);
    assert_eq!(t.error.as_deref(), Some("boom"));
}

#[test]
fn retry_resets_assignment_and_bumps_count() {
    let mut t = task();
    t.accept(AgentName::new("worker-1"), 1100);
    t.fail("boom", 1300);
    t.retry();
    assert_eq!(t.status, TaskStatus::Pending);
    assert!(t.assigned_to.is_none());
    assert!(t.started_at.is_none());
    assert!(t.completed_at.is_none());
    assert_eq!(t.retries, 1);
}

#[test]
fn status_serializes_kebab_case() {
    assert_eq!(serde_json::to_string(&TaskStatus::InProgress).unwrap(), "\"in-progress\"");
}

#[test]
fn serializes_round_trip() {
    let t = task();
    let json = serde_json::to_string(&t).unwrap();
    let back: Task = serde_json::from_str(&json).unwrap();
    assert_eq!(t, back);
}
