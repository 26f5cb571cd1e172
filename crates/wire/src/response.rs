// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use serde::{Deserialize, Serialize};

/// The daemon's reply to a [`crate::Request`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum Response {
    Ok,
    Error { message: String },
    Status(StatusSummary),
}

/// One worker agent's status line in a [`Response::Status`] reply.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentStatusEntry {
    pub name: String,
    pub status: String,
    pub active_tasks: u32,
    pub max_concurrent: u32,
}

/// Pipeline-wide summary for the CLI's `status` command (§6).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusSummary {
    pub groups_open: usize,
    pub pending_repairs: usize,
    pub agents: Vec<AgentStatusEntry>,
    pub queue_depth: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ok_serializes_to_the_tagged_result_shape() {
        let json = serde_json::to_string(&Response::Ok).unwrap();
        assert_eq!(json, r#"{"result":"ok"}"#);
    }

    #[test]
    fn error_round_trips_with_its_message() {
        let response = Response::Error { message: "daemon not running".to_string() };
        let json = serde_json::to_string(&response).unwrap();
        let back: Response = serde_json::from_str(&json).unwrap();
        assert_eq!(back, response);
    }

    #[test]
    fn status_round_trips_with_nested_agent_entries() {
        let response = Response::Status(StatusSummary {
            groups_open: 3,
            pending_repairs: 1,
            agents: vec![AgentStatusEntry { name: "worker-1".into(), status: "running".into(), active_tasks: 1, max_concurrent: 2 }],
            queue_depth: 5,
        });
        let json = serde_json::to_string(&response).unwrap();
        let back: Response = serde_json::from_str(&json).unwrap();
        assert_eq!(back, response);
    }
}
