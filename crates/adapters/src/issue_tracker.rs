// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Issue-tracker client (§4.L): interface only, no bundled REST
//! implementation per the Non-goals list. The repair engine's commit step
//! calls through this trait when auto-issue/auto-PR filing is enabled; its
//! absence is not an error.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::AdapterError;

/// A reference to a filed issue or pull request, as returned by a tracker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssueRef {
    pub id: String,
    pub url: String,
}

/// One repair's worth of context to file as an issue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueDraft {
    pub title: String,
    pub body: String,
    pub labels: Vec<String>,
}

#[async_trait]
pub trait IssueTracker: Send + Sync {
    async fn create_issue(&self, draft: IssueDraft) -> Result<IssueRef, AdapterError>;
}

/// No-op tracker used when no tracker is configured (the default).
pub struct NullIssueTracker;

#[async_trait]
impl IssueTracker for NullIssueTracker {
    async fn create_issue(&self, _draft: IssueDraft) -> Result<IssueRef, AdapterError> {
        Ok(IssueRef { id: String::new(), url: String::new() })
    }
}

#[cfg(any(test, feature = "test-support"))]
pub struct FakeIssueTracker {
    filed: parking_lot::Mutex<Vec<IssueDraft>>,
}

#[cfg(any(test, feature = "test-support"))]
impl FakeIssueTracker {
    pub fn new() -> Self {
        Self { filed: parking_lot::Mutex::new(Vec::new()) }
    }

    pub fn filed(&self) -> Vec<IssueDraft> {
        self.filed.lock().clone()
    }
}

#[cfg(any(test, feature = "test-support"))]
impl Default for FakeIssueTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(any(test, feature = "test-support"))]
#[async_trait]
impl IssueTracker for FakeIssueTracker {
    async fn create_issue(&self, draft: IssueDraft) -> Result<IssueRef, AdapterError> {
        let id = format!("fake-{}", self.filed.lock().len() + 1);
        self.filed.lock().push(draft);
        Ok(IssueRef { id: id.clone(), url: format!("fake://issues/{id}") })
    }
}
