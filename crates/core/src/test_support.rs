// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for use across crates.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

use crate::model::{
    Classification, ErrorEvent, ErrorKind, LogLevel, PatternId, RawLogEntry, Severity,
};

/// Proptest strategies for the algorithmic invariants in spec §8: grouping
/// similarity bounds, lock priority ordering, trend classification.
pub mod strategies {
    use crate::model::{LockPriority, LogLevel, Severity};
    use proptest::prelude::*;

    pub fn arb_log_level() -> impl Strategy<Value = LogLevel> {
        prop_oneof![Just(LogLevel::Error), Just(LogLevel::Fatal), Just(LogLevel::Warn)]
    }

    pub fn arb_severity() -> impl Strategy<Value = Severity> {
        prop_oneof![
            Just(Severity::Low),
            Just(Severity::Medium),
            Just(Severity::High),
            Just(Severity::Critical),
        ]
    }

    pub fn arb_lock_priority() -> impl Strategy<Value = LockPriority> {
        prop_oneof![
            Just(LockPriority::Urgent),
            Just(LockPriority::High),
            Just(LockPriority::Normal),
            Just(LockPriority::Low),
        ]
    }

    /// A similarity score in `[0.0, 1.0]`, the domain every weighted
    /// similarity component in the grouping engine must stay within.
    pub fn arb_similarity() -> impl Strategy<Value = f64> {
        0.0f64..=1.0
    }
}

pub fn raw_log_entry(timestamp: u64, message: &str) -> RawLogEntry {
    RawLogEntry::new(timestamp, LogLevel::Error, message)
}

pub fn raw_log_entry_with_stack(timestamp: u64, message: &str, stack: &[&str]) -> RawLogEntry {
    raw_log_entry(timestamp, message).with_stack(stack.iter().map(|s| s.to_string()).collect())
}

pub fn classification(pattern_id: &str, severity: Severity) -> Classification {
    Classification {
        pattern_id: PatternId::new(pattern_id),
        category: "Test Category".to_string(),
        kind: ErrorKind::Bug,
        severity,
        suggested_action: "Investigate".to_string(),
        matched: true,
    }
}

pub fn error_event(hash: &str, timestamp: u64, message: &str) -> ErrorEvent {
    ErrorEvent {
        hash: hash.to_string(),
        timestamp,
        level: LogLevel::Error,
        message: message.to_string(),
        stack_lines: Vec::new(),
        source_file: None,
        source_line: None,
        classification: classification("EP000", Severity::Medium),
    }
}

pub fn error_event_with_classification(
    hash: &str,
    timestamp: u64,
    message: &str,
    classification: Classification,
) -> ErrorEvent {
    ErrorEvent { classification, ..error_event(hash, timestamp, message) }
}
