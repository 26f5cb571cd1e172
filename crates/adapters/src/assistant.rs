// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! External source-code-assistant interface (§4.K): an injectable
//! request/response queue whose internals are out of scope, only its
//! contract — submit a request, poll for a matching response, extract a
//! structured [`Analysis`] from the free-text result.

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use triage_bus::MessageBus;
use triage_core::{LockPriority, Message, MessageType, RequestId, Severity};

use crate::error::AdapterError;

/// A request enqueued to the assistant (spec.md §6: `{requestId, fromAgent,
/// type, prompt, context{workingDirectory, timeout, priority}, timestamp}`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantRequest {
    pub request_id: RequestId,
    pub from_agent: String,
    #[serde(rename = "type")]
    pub request_type: String,
    pub prompt: String,
    pub working_directory: PathBuf,
    pub timeout_ms: u64,
    pub priority: LockPriority,
    pub timestamp: u64,
}

/// The assistant's reply (spec.md §6: `{requestId, success, result?,
/// error?}`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantResponse {
    pub request_id: RequestId,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A structured reading of an [`AssistantResponse`]'s free-text `result`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    pub category: String,
    pub severity: Severity,
    pub suggested_action: String,
    /// `1.0` for a clean fenced-JSON extraction, lower for a lenient
    /// section-line extraction, lowest for the timeout fallback.
    pub confidence: f64,
}

impl Analysis {
    fn fallback() -> Self {
        Self { category: "Unknown".to_string(), severity: Severity::Low, suggested_action: String::new(), confidence: 0.1 }
    }
}

#[async_trait]
pub trait AssistantClient: Send + Sync {
    async fn submit(&self, request: AssistantRequest) -> Result<RequestId, AdapterError>;
    async fn poll_response(&self, id: RequestId) -> Result<Option<AssistantResponse>, AdapterError>;
}

/// Production adapter: requests go to the `assistant` agent's inbox over
/// the same file-queue primitive as the coordinator's task traffic
/// (Component I); responses are polled from its outbox. A response whose
/// `requestId` doesn't match the one being polled for is stashed in memory
/// rather than dropped, so a later poll for it still finds it ("non-matching
/// responses are requeued", §6).
pub struct QueueAssistantClient {
    bus: MessageBus,
    agent_name: String,
    stash: Mutex<HashMap<RequestId, AssistantResponse>>,
}

impl QueueAssistantClient {
    pub fn new(bus_root: impl Into<PathBuf>, agent_name: impl Into<String>) -> Self {
        Self { bus: MessageBus::new(bus_root), agent_name: agent_name.into(), stash: Mutex::new(HashMap::new()) }
    }
}

#[async_trait]
impl AssistantClient for QueueAssistantClient {
    async fn submit(&self, request: AssistantRequest) -> Result<RequestId, AdapterError> {
        let id = request.request_id.clone();
        let payload = serde_json::to_value(&request)?;
        let msg = Message::new(triage_bus::new_message_id(), MessageType::AssistantRequest, request.from_agent.clone(), self.agent_name.clone(), request.timestamp, payload);
        self.bus.send(&msg)?;
        Ok(id)
    }

    async fn poll_response(&self, id: RequestId) -> Result<Option<AssistantResponse>, AdapterError> {
        if let Some(response) = self.stash.lock().remove(&id) {
            return Ok(Some(response));
        }

        let messages = self.bus.poll_outbox(&self.agent_name)?;
        let mut found = None;
        let mut stash = self.stash.lock();
        for msg in messages {
            let response: AssistantResponse = serde_json::from_value(msg.payload)?;
            if response.request_id == id {
                found = Some(response);
            } else {
                stash.insert(response.request_id.clone(), response);
            }
        }
        Ok(found)
    }
}

/// In-memory double for repair-engine and coordinator tests: returns a
/// canned response for every submitted request immediately.
#[cfg(any(test, feature = "test-support"))]
pub struct FakeAssistantClient {
    responses: Mutex<HashMap<RequestId, AssistantResponse>>,
}

#[cfg(any(test, feature = "test-support"))]
impl FakeAssistantClient {
    pub fn new() -> Self {
        Self { responses: Mutex::new(HashMap::new()) }
    }

    /// Queue the response that will be returned for `id` the first time
    /// it's polled.
    pub fn queue_response(&self, response: AssistantResponse) {
        self.responses.lock().insert(response.request_id.clone(), response);
    }
}

#[cfg(any(test, feature = "test-support"))]
impl Default for FakeAssistantClient {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(any(test, feature = "test-support"))]
#[async_trait]
impl AssistantClient for FakeAssistantClient {
    async fn submit(&self, request: AssistantRequest) -> Result<RequestId, AdapterError> {
        Ok(request.request_id)
    }

    async fn poll_response(&self, id: RequestId) -> Result<Option<AssistantResponse>, AdapterError> {
        Ok(self.responses.lock().remove(&id))
    }
}

/// Extract a structured [`Analysis`] from a response (§4.K): try a fenced
/// \`\`\`json block first, then a lenient `Key: value` line scan, then the
/// deterministic fallback.
pub fn extract_analysis(response: &AssistantResponse) -> Analysis {
    let Some(text) = response.result.as_deref() else {
        return Analysis::fallback();
    };

    if let Some(analysis) = extract_fenced_json(text) {
        return analysis;
    }
    extract_lenient_sections(text)
}

fn extract_fenced_json(text: &str) -> Option<Analysis> {
    let start = text.find("```json")? + "```json".len();
    let end = text[start..].find("```")? + start;
    let block = text[start..end].trim();
    serde_json::from_str(block).ok()
}

fn extract_lenient_sections(text: &str) -> Analysis {
    let mut category = None;
    let mut severity = None;
    let mut suggested_action = None;

    for line in text.lines() {
        let line = line.trim();
        if let Some(value) = strip_label(line, "Category:") {
            category = Some(value.to_string());
        } else if let Some(value) = strip_label(line, "Severity:") {
            severity = parse_severity(value);
        } else if let Some(value) = strip_label(line, "Suggested Action:") {
            suggested_action = Some(value.to_string());
        }
    }

    match (category, severity, suggested_action) {
        (Some(category), Some(severity), suggested_action) => Analysis {
            category,
            severity,
            suggested_action: suggested_action.unwrap_or_default(),
            confidence: 0.5,
        },
        _ => Analysis::fallback(),
    }
}

fn strip_label<'a>(line: &'a str, label: &str) -> Option<&'a str> {
    line.strip_prefix(label).map(str::trim)
}

fn parse_severity(value: &str) -> Option<Severity> {
    match value.to_ascii_lowercase().as_str() {
        "low" => Some(Severity::Low),
        "medium" => Some(Severity::Medium),
        "high" => Some(Severity::High),
        "critical" => Some(Severity::Critical),
        _ => None,
    }
}
