// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Units of work dispatched from the coordinator to a capability-matching
//! worker (Component J).

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::agent::TaskType;
use crate::model::ids::{AgentName, TaskId};

/// A task's lifecycle. Forward-only except for `error`, which a retry can
/// move back to `pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    Pending,
    Accepted,
    InProgress,
    Completed,
    Error,
}

/// One unit of dispatchable work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub task_id: TaskId,
    #[serde(rename = "type")]
    pub task_type: TaskType,
    pub context: Value,
    pub payload: Value,
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<AgentName>,
    pub created_at: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<u64>,
    pub retries: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Task {
    pub fn new(task_id: TaskId, task_type: TaskType, context: Value, payload: Value, created_at: u64) -> Self {
        Self {
            task_id,
            task_type,
            context,
            payload,
            status: TaskStatus::Pending,
            assigned_to: None,
            created_at,
            started_at: None,
            completed_at: None,
            retries: 0,
            result: None,
            error: None,
        }
    }

    /// Record a dispatch decision without waiting for the agent's
    /// `TASK_ACCEPTED` acknowledgement; status stays `pending` until then.
    pub fn assign(&mut self, agent: AgentName) {
        self.assigned_to = Some(agent);
    }

    pub fn accept(&mut self, agent: AgentName, now: u64) {
        self.status = TaskStatus::Accepted;
        self.assigned_to = Some(agent);
        self.started_at = Some(now);
    }

    pub fn complete(&mut self, result: Value, now: u64) {
        self.status = TaskStatus::Completed;
        self.result = Some(result);
        self.completed_at = Some(now);
    }

    pub fn fail(&mut self, error: impl Into<String>, now: u64) {
        self.status = TaskStatus::Error;
        self.error = Some(error.into());
        self.completed_at = Some(now);
    }

    /// Reset a failed task back to `pending` for redispatch, bumping `retries`.
    pub fn retry(&mut self) {
        self.status = TaskStatus::Pending;
        self.assigned_to = None;
        self.started_at = None;
        self.completed_at = None;
        self.retries += 1;
    }
}

#[cfg(test)]
#[path = "task_tests.rs"]
mod tests;
