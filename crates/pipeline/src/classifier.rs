// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error classifier (Component C, §4.C): normalizes a raw log entry,
//! fingerprints it, and matches it against the built-in pattern registry.
//! Stateless and pure — the registry is a configured immutable table, and
//! two calls with the same input always produce the same output (§8
//! invariant 1).

use std::path::PathBuf;

use triage_core::{Classification, ErrorEvent, ErrorKind, PatternId, RawLogEntry, Severity};

use crate::text::fingerprint;

/// One entry in the built-in pattern registry.
pub struct Pattern {
    pub id: &'static str,
    pub category: &'static str,
    pub kind: ErrorKind,
    pub severity: Severity,
    pub suggested_action: &'static str,
    matches: fn(&str) -> bool,
}

impl Pattern {
    fn classify(&self) -> Classification {
        Classification {
            pattern_id: PatternId::new(self.id),
            category: self.category.to_string(),
            kind: self.kind,
            severity: self.severity,
            suggested_action: self.suggested_action.to_string(),
            matched: true,
        }
    }
}

/// The ten built-in patterns (§3). Matchers run against the lower-cased raw
/// message and are kept mutually exclusive by being specific (e.g. EP010's
/// JSON check excludes EP003's generic syntax-error check) rather than by
/// relying on registration order to arbitrate overlaps.
pub fn builtin_registry() -> Vec<Pattern> {
    vec![
        Pattern {
            id: "EP001",
            category: "Null Property Access",
            kind: ErrorKind::Bug,
            severity: Severity::High,
            suggested_action: "Add a null/optional check before the property access",
            matches: |m| {
                m.contains("cannot read propert") || m.contains("of undefined") || m.contains("of null")
            },
        },
        Pattern {
            id: "EP002",
            category: "Undefined Reference",
            kind: ErrorKind::Bug,
            severity: Severity::High,
            suggested_action: "Define the missing identifier or guard its usage",
            matches: |m| m.contains("is not defined") || m.contains("referenceerror"),
        },
        Pattern {
            id: "EP003",
            category: "Syntax Error",
            kind: ErrorKind::Bug,
            severity: Severity::Medium,
            suggested_action: "Review the reported line for a syntax mistake",
            matches: |m| m.contains("syntaxerror") && !m.contains("json"),
        },
        Pattern {
            id: "EP004",
            category: "Missing File",
            kind: ErrorKind::Defect,
            severity: Severity::Medium,
            suggested_action: "Create the expected file from a whitelisted default",
            matches: |m| {
                m.contains("no such file") || m.contains("enoent") || m.contains("cannot find module") || m.contains("file not found")
            },
        },
        Pattern {
            id: "EP005",
            category: "API Rate Limit",
            kind: ErrorKind::SpecIssue,
            severity: Severity::Medium,
            suggested_action: "Back off and retry with exponential delay",
            matches: |m| m.contains("rate limit") || m.contains("too many requests") || m.contains(" 429"),
        },
        Pattern {
            id: "EP006",
            category: "Timeout",
            kind: ErrorKind::Defect,
            severity: Severity::Medium,
            suggested_action: "Increase the timeout or investigate the slow dependency",
            matches: |m| m.contains("timeout") || m.contains("timed out") || m.contains("etimedout"),
        },
        Pattern {
            id: "EP007",
            category: "Spec Conflict",
            kind: ErrorKind::SpecIssue,
            severity: Severity::Low,
            suggested_action: "Reconcile the conflicting requirement with stakeholders",
            matches: |m| m.contains("spec conflict") || m.contains("specification mismatch") || m.contains("conflicting requirement"),
        },
        Pattern {
            id: "EP008",
            category: "Out Of Memory",
            kind: ErrorKind::Defect,
            severity: Severity::Critical,
            suggested_action: "Profile memory usage and raise the heap limit or fix the leak",
            matches: |m| m.contains("out of memory") || m.contains("heap out of memory") || m.contains("enomem") || m.contains(" oom"),
        },
        Pattern {
            id: "EP009",
            category: "Permission Denied",
            kind: ErrorKind::Defect,
            severity: Severity::High,
            suggested_action: "Grant the required filesystem or API permission",
            matches: |m| m.contains("permission denied") || m.contains("eacces") || m.contains("access denied"),
        },
        Pattern {
            id: "EP010",
            category: "Parse Error",
            kind: ErrorKind::Bug,
            severity: Severity::Medium,
            suggested_action: "Progressively repair the malformed JSON",
            matches: |m| m.contains("json") && (m.contains("parse") || m.contains("unexpected token") || m.contains("syntaxerror")),
        },
    ]
}

/// Stateless normalize-fingerprint-match pipeline (Component C).
pub struct Classifier {
    registry: Vec<Pattern>,
    /// Substring recognized as marking a vendored/third-party stack frame
    /// (the built-in log format uses `node_modules`); such frames are
    /// skipped when extracting `source_file`/`source_line`.
    vendored_marker: String,
}

impl Classifier {
    pub fn new(registry: Vec<Pattern>, vendored_marker: impl Into<String>) -> Self {
        Self { registry, vendored_marker: vendored_marker.into() }
    }

    pub fn builtin(vendored_marker: impl Into<String>) -> Self {
        Self::new(builtin_registry(), vendored_marker)
    }

    /// Classify one raw entry into an [`ErrorEvent`] (§4.C).
    pub fn classify(&self, raw: &RawLogEntry) -> ErrorEvent {
        let hash = fingerprint(&raw.level.to_string(), &raw.message, &raw.stack_lines);
        let (source_file, source_line) = self.extract_source(&raw.stack_lines);
        let lowered = raw.message.to_lowercase();
        let classification = self
            .registry
            .iter()
            .find(|p| (p.matches)(&lowered))
            .map(|p| p.classify())
            .unwrap_or_else(Classification::unknown);

        ErrorEvent {
            hash,
            timestamp: raw.timestamp,
            level: raw.level,
            message: raw.message.clone(),
            stack_lines: raw.stack_lines.clone(),
            source_file,
            source_line,
            classification,
        }
    }

    fn extract_source(&self, stack_lines: &[String]) -> (Option<PathBuf>, Option<u32>) {
        for line in stack_lines {
            if line.contains(&self.vendored_marker) {
                continue;
            }
            if let Some((file, line_no)) = parse_stack_frame(line) {
                return (Some(PathBuf::from(file)), Some(line_no));
            }
        }
        (None, None)
    }
}

/// Convenience entry point using the built-in registry with the default
/// vendored marker (`node_modules`).
pub fn classify(raw: &RawLogEntry) -> ErrorEvent {
    Classifier::builtin("node_modules").classify(raw)
}

/// Parse a `file:line:col`-shaped suffix out of a stack frame, whether it's
/// wrapped in parens (`at fn (/a/b.js:10:20)`) or bare (`at /a/b.js:10:20`).
fn parse_stack_frame(line: &str) -> Option<(String, u32)> {
    let candidate = match (line.rfind('('), line.rfind(')')) {
        (Some(open), Some(close)) if open < close => &line[open + 1..close],
        _ => line.trim().trim_start_matches("at ").trim(),
    };
    let mut parts: Vec<&str> = candidate.rsplitn(3, ':').collect();
    if parts.len() < 2 {
        return None;
    }
    parts.reverse();
    let file = parts[0];
    let line_no: u32 = parts.get(1)?.parse().ok()?;
    if file.is_empty() {
        return None;
    }
    Some((file.to_string(), line_no))
}
