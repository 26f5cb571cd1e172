// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::model::error_event::Classification;
use crate::model::log_entry::LogLevel;

fn event(hash: &str, ts: u64) -> ErrorEvent {
    ErrorEvent {
        hash: hash.to_string(),
        timestamp: ts,
        level: LogLevel::Error,
        message: "boom".to_string(),
        stack_lines: vec![],
        source_file: None,
        source_line: None,
        classification: Classification::unknown(),
    }
}

#[test]
fn new_group_has_one_member_and_occurrences_one() {
    let g = ErrorGroup::new(GroupId::new(), event("h1", 100));
    assert_eq!(g.occurrences, 1);
    assert_eq!(g.members.len(), 1);
    assert_eq!(g.state, GroupState::Open);
}

#[test]
fn append_increments_occurrences_and_extends_window() {
    let mut g = ErrorGroup::new(GroupId::new(), event("h1", 100));
    g.append(&event("h2", 200), 0.9);
    assert_eq!(g.occurrences, 2);
    assert_eq!(g.last_seen, 200);
    assert_eq!(g.first_seen, 100);
}

#[test]
fn append_same_hash_twice_is_idempotent() {
    let mut g = ErrorGroup::new(GroupId::new(), event("h1", 100));
    g.append(&event("h2", 200), 0.9);
    g.append(&event("h2", 200), 0.9);
    assert_eq!(g.occurrences, 2, "second append of the same hash must not grow membership");
}

#[test]
fn contains_hash_reflects_membership() {
    let g = ErrorGroup::new(GroupId::new(), event("h1", 100));
    assert!(g.contains_hash("h1"));
    assert!(!g.contains_hash("h2"));
}

#[test]
fn close_transitions_state_and_records_issue_ref() {
    let mut g = ErrorGroup::new(GroupId::new(), event("h1", 100));
    g.close(Some("ISSUE-42".to_string()));
    assert_eq!(g.state, GroupState::Closed);
    assert_eq!(g.external_issue_ref.as_deref(), Some("ISSUE-42"));
}
