// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Raw log entries as produced by the log watcher, before classification.

use serde::{Deserialize, Serialize};

/// Severity level recognized in the log header line.
///
/// Unknown levels are ignored by the watcher rather than represented here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Error,
    Fatal,
    Warn,
}

impl LogLevel {
    /// Parse a level from the bracketed tag in a log header line (e.g. `[ERROR]`).
    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "ERROR" => Some(Self::Error),
            "FATAL" => Some(Self::Fatal),
            "WARN" => Some(Self::Warn),
            _ => None,
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Error => "ERROR",
            Self::Fatal => "FATAL",
            Self::Warn => "WARN",
        })
    }
}

/// A single logical log entry: a header line plus any indented continuation
/// (stack trace) lines, as assembled by the watcher (Component H).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawLogEntry {
    /// Epoch milliseconds parsed from the header's `[YYYY-MM-DD HH:MM:SS]`
    /// tag, or the ingest time if the header carried none.
    pub timestamp: u64,
    pub level: LogLevel,
    pub message: String,
    pub stack_lines: Vec<String>,
}

impl RawLogEntry {
    pub fn new(timestamp: u64, level: LogLevel, message: impl Into<String>) -> Self {
        Self { timestamp, level, message: message.into(), stack_lines: Vec::new() }
    }

    pub fn with_stack(mut self, stack_lines: Vec<String>) -> Self {
        self.stack_lines = stack_lines;
        self
    }
}

#[cfg(test)]
#[path = "log_entry_tests.rs"]
mod tests;
