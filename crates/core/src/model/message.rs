// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bus messages (Component I). One `Message` is persisted as one file named
//! `<ts>_<id>_<type>.json` in the recipient's inbox or outbox directory.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::ids::MessageId;

/// The wire-level message kind. `#[serde(rename_all = "SCREAMING_SNAKE_CASE")]`
/// matches the payload's `type` field exactly as written to disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageType {
    TaskAssignment,
    TaskAccepted,
    ProgressUpdate,
    TaskCompleted,
    ErrorNotification,
    Heartbeat,
    /// External-assistant request/response pair (§4.K), carried over the
    /// same inbox/outbox primitive as the coordinator's task traffic.
    AssistantRequest,
    AssistantResponse,
}

impl MessageType {
    /// Filesystem-safe tag used in the `<ts>_<id>_<type>.json` filename.
    pub fn file_tag(&self) -> &'static str {
        match self {
            MessageType::TaskAssignment => "TASK_ASSIGNMENT",
            MessageType::TaskAccepted => "TASK_ACCEPTED",
            MessageType::ProgressUpdate => "PROGRESS_UPDATE",
            MessageType::TaskCompleted => "TASK_COMPLETED",
            MessageType::ErrorNotification => "ERROR_NOTIFICATION",
            MessageType::Heartbeat => "HEARTBEAT",
            MessageType::AssistantRequest => "ASSISTANT_REQUEST",
            MessageType::AssistantResponse => "ASSISTANT_RESPONSE",
        }
    }
}

/// A single bus message. Delivery is at-least-once; the recipient is
/// responsible for idempotence keyed on `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    #[serde(rename = "type")]
    pub message_type: MessageType,
    pub from: String,
    pub to: String,
    pub timestamp: u64,
    pub payload: Value,
}

impl Message {
    pub fn new(id: MessageId, message_type: MessageType, from: impl Into<String>, to: impl Into<String>, timestamp: u64, payload: Value) -> Self {
        Self { id, message_type, from: from.into(), to: to.into(), timestamp, payload }
    }

    /// The filename this message is persisted under: `<ts>_<id>_<type>.json`.
    pub fn file_name(&self) -> String {
        format!("{}_{}_{}.json", self.timestamp, self.id, self.message_type.file_tag())
    }
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
