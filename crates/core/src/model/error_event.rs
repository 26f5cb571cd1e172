// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Classified error events — the unit of work handed from the classifier
//! (Component C) downstream to grouping, statistics, the learner, and repair.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::model::log_entry::LogLevel;

/// The built-in pattern registry's identifier, or the synthetic `EP000`
/// assigned to unmatched events.
///
/// A thin `String` newtype (not [`crate::define_id!`]): pattern IDs are
/// configuration-defined, not randomly generated, and need to compare
/// equal to literals like `"EP001"` throughout the pipeline and tests.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PatternId(pub String);

impl PatternId {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The synthetic pattern assigned when nothing in the registry matches.
    pub fn unknown() -> Self {
        Self("EP000".to_string())
    }
}

impl std::fmt::Display for PatternId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for PatternId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::borrow::Borrow<str> for PatternId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// The nature of the defect a pattern describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Bug,
    Defect,
    SpecIssue,
}

/// Operational severity, used to prioritize lock acquisition (§4.G) and
/// weight trend/statistics reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

/// The result of matching a [`RawLogEntry`](crate::model::RawLogEntry)
/// against the pattern registry (Component C).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub pattern_id: PatternId,
    pub category: String,
    pub kind: ErrorKind,
    pub severity: Severity,
    pub suggested_action: String,
    pub matched: bool,
}

impl Classification {
    /// The synthetic classification assigned when no registry pattern matches.
    pub fn unknown() -> Self {
        Self {
            pattern_id: PatternId::unknown(),
            category: "Unknown".to_string(),
            kind: ErrorKind::Bug,
            severity: Severity::Medium,
            suggested_action: "Manual investigation required".to_string(),
            matched: false,
        }
    }
}

/// A single classified occurrence, deduplicated by `hash`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEvent {
    /// Short fingerprint of `(level, normalized message, first 3 stack lines)`.
    pub hash: String,
    pub timestamp: u64,
    pub level: LogLevel,
    pub message: String,
    pub stack_lines: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_file: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_line: Option<u32>,
    pub classification: Classification,
}

#[cfg(test)]
#[path = "error_event_tests.rs"]
mod tests;
