// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed identifiers for the remediation pipeline's entities.

use std::fmt;

crate::define_id! {
    /// Identifies an [`ErrorGroup`](crate::model::ErrorGroup).
    pub struct GroupId("grp-");
}

crate::define_id! {
    /// Identifies a single repair attempt / [`RepairHistoryEntry`](crate::model::RepairHistoryEntry).
    pub struct RepairId("rep-");
}

crate::define_id! {
    /// Identifies a [`Task`](crate::model::Task) dispatched to a worker.
    pub struct TaskId("tsk-");
}

crate::define_id! {
    /// Identifies a [`BackupMeta`](crate::model::BackupMeta) snapshot.
    pub struct BackupId("bak-");
}

crate::define_id! {
    /// Identifies a [`Message`](crate::model::Message) on the bus.
    pub struct MessageId("msg-");
}

crate::define_id! {
    /// Identifies an outstanding request to the external assistant service.
    pub struct RequestId("req-");
}

/// The configured name of a worker agent (e.g. `"repair-worker-1"`).
///
/// Unlike the other IDs in this module, agent names are operator-assigned
/// configuration, not randomly generated, so this is a thin `String`
/// newtype rather than a [`crate::define_id!`] type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct AgentName(pub String);

impl AgentName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AgentName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for AgentName {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for AgentName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl std::borrow::Borrow<str> for AgentName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
#[path = "ids_tests.rs"]
mod tests;
