// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error groups — the clustering unit produced by the grouping engine
//! (Component D).

use serde::{Deserialize, Serialize};

use crate::model::error_event::ErrorEvent;
use crate::model::ids::GroupId;

/// A group's lifecycle. Only ever moves forward: `Open -> Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupState {
    Open,
    Closed,
}

/// A single event's membership record within a group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupMember {
    pub hash: String,
    pub timestamp: u64,
    pub similarity: f64,
}

/// A cluster of events judged similar enough to be treated as one
/// operational issue.
///
/// Invariant: `occurrences == members.len()`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorGroup {
    pub group_id: GroupId,
    pub representative: ErrorEvent,
    pub members: Vec<GroupMember>,
    pub first_seen: u64,
    pub last_seen: u64,
    pub occurrences: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_issue_ref: Option<String>,
    pub state: GroupState,
}

impl ErrorGroup {
    /// Start a new group with `event` as its sole member and representative.
    pub fn new(group_id: GroupId, event: ErrorEvent) -> Self {
        let now = event.timestamp;
        let member = GroupMember { hash: event.hash.clone(), timestamp: now, similarity: 1.0 };
        Self {
            group_id,
            representative: event,
            members: vec![member],
            first_seen: now,
            last_seen: now,
            occurrences: 1,
            external_issue_ref: None,
            state: GroupState::Open,
        }
    }

    /// Append `event` as a new member at the given similarity. Idempotent:
    /// re-appending an already-present hash is a no-op, per the
    /// `group(event); group(event)` idempotence law.
    pub fn append(&mut self, event: &ErrorEvent, similarity: f64) {
        if self.members.iter().any(|m| m.hash == event.hash) {
            return;
        }
        self.members.push(GroupMember { hash: event.hash.clone(), timestamp: event.timestamp, similarity });
        self.occurrences = self.members.len() as u64;
        self.last_seen = self.last_seen.max(event.timestamp);
        self.first_seen = self.first_seen.min(event.timestamp);
    }

    pub fn contains_hash(&self, hash: &str) -> bool {
        self.members.iter().any(|m| m.hash == hash)
    }

    pub fn close(&mut self, external_issue_ref: Option<String>) {
        self.state = GroupState::Closed;
        if external_issue_ref.is_some() {
            self.external_issue_ref = external_issue_ref;
        }
    }
}

#[cfg(test)]
#[path = "group_tests.rs"]
mod tests;
