// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker agent bookkeeping (Component J).

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::model::ids::AgentName;

/// The capability a task requires and a worker advertises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    Analysis,
    Repair,
    Validation,
    Backup,
}

/// An agent's observed lifecycle state, driven by heartbeats and the
/// coordinator's health check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentRecordStatus {
    Initializing,
    Running,
    Unresponsive,
    Stopped,
}

/// The coordinator's view of one worker agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentRecord {
    pub name: AgentName,
    pub capabilities: BTreeSet<TaskType>,
    pub max_concurrent: u32,
    pub status: AgentRecordStatus,
    pub last_heartbeat: u64,
    pub active_tasks: u32,
    pub metrics: serde_json::Value,
}

impl AgentRecord {
    pub fn new(name: AgentName, capabilities: BTreeSet<TaskType>, max_concurrent: u32, now: u64) -> Self {
        Self {
            name,
            capabilities,
            max_concurrent,
            status: AgentRecordStatus::Initializing,
            last_heartbeat: now,
            active_tasks: 0,
            metrics: serde_json::json!({}),
        }
    }

    pub fn has_capacity(&self) -> bool {
        self.active_tasks < self.max_concurrent
    }

    pub fn can_handle(&self, task_type: TaskType) -> bool {
        self.capabilities.contains(&task_type)
    }

    /// Whether the agent has missed its heartbeat window as of `now`.
    pub fn is_unresponsive(&self, now: u64, heartbeat_timeout_ms: u64) -> bool {
        now.saturating_sub(self.last_heartbeat) >= heartbeat_timeout_ms
    }
}

#[cfg(test)]
#[path = "agent_tests.rs"]
mod tests;
