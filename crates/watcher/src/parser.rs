// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Log-text parsing rules (§4.H): a line containing one of the configured
//! markers (`[ERROR]`/`[FATAL]` by default) opens an entry; a line starting
//! with at least `continuation_indent` spaces continues it; any other line
//! closes it.

use triage_core::{LogLevel, RawLogEntry};

fn is_header(line: &str, markers: &[String]) -> bool {
    markers.iter().any(|m| line.contains(m.as_str()))
}

fn is_continuation(line: &str, indent: usize) -> bool {
    let leading = line.chars().take_while(|c| *c == ' ').count();
    leading >= indent && !line.trim().is_empty()
}

fn level_for(line: &str, markers: &[String]) -> LogLevel {
    if markers.iter().any(|m| m.contains("FATAL")) && line.contains("[FATAL]") {
        LogLevel::Fatal
    } else {
        LogLevel::Error
    }
}

/// A bracketed `[YYYY-MM-DD HH:MM:SS]` timestamp, converted to epoch-ms, if
/// present on the header line (§6). Absent or unparsable falls back to the
/// caller's ingest-time substitute.
pub fn extract_timestamp(line: &str) -> Option<u64> {
    let open = line.find('[')?;
    let close = line[open..].find(']')? + open;
    let candidate = &line[open + 1..close];
    let naive = chrono::NaiveDateTime::parse_from_str(candidate, "%Y-%m-%d %H:%M:%S").ok()?;
    Some(naive.and_utc().timestamp_millis().max(0) as u64)
}

/// Split `text` into closed [`RawLogEntry`] records per the header/
/// continuation rule, substituting `ingest_time_ms` for any header without
/// a parseable timestamp.
pub fn parse_log(text: &str, markers: &[String], continuation_indent: usize, ingest_time_ms: u64) -> Vec<RawLogEntry> {
    let mut entries = Vec::new();
    let mut current: Option<RawLogEntry> = None;

    for line in text.lines() {
        if is_header(line, markers) {
            if let Some(entry) = current.take() {
                entries.push(entry);
            }
            let timestamp = extract_timestamp(line).unwrap_or(ingest_time_ms);
            current = Some(RawLogEntry::new(timestamp, level_for(line, markers), line.trim().to_string()));
        } else if is_continuation(line, continuation_indent) {
            if let Some(entry) = current.as_mut() {
                entry.stack_lines.push(line.trim().to_string());
            }
        } else if let Some(entry) = current.take() {
            entries.push(entry);
        }
    }
    if let Some(entry) = current.take() {
        entries.push(entry);
    }
    entries
}

#[cfg(test)]
mod tests {
    use super::*;

    fn markers() -> Vec<String> {
        vec!["[ERROR]".to_string(), "[FATAL]".to_string()]
    }

    #[test]
    fn header_with_continuation_lines_closes_on_blank_line() {
        let text = "[2026-01-01 00:00:00] [ERROR] boom\n    at foo (a.js:1:1)\n    at bar (b.js:2:2)\n\nnot an error\n";
        let entries = parse_log(text, &markers(), 4, 0);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].stack_lines.len(), 2);
    }

    #[test]
    fn new_header_closes_the_previous_entry() {
        let text = "[ERROR] first\n[ERROR] second\n";
        let entries = parse_log(text, &markers(), 4, 0);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].message, "[ERROR] first");
    }

    #[test]
    fn missing_timestamp_falls_back_to_ingest_time() {
        let text = "[ERROR] no timestamp here\n";
        let entries = parse_log(text, &markers(), 4, 42);
        assert_eq!(entries[0].timestamp, 42);
    }

    #[test]
    fn parseable_timestamp_is_used() {
        let line = "[2026-01-01 00:00:00] [ERROR] boom";
        assert!(extract_timestamp(line).is_some());
    }

    #[test]
    fn fatal_marker_sets_fatal_level() {
        let text = "[FATAL] everything is on fire\n";
        let entries = parse_log(text, &markers(), 4, 0);
        assert_eq!(entries[0].level, LogLevel::Fatal);
    }

    #[test]
    fn non_continuation_indent_is_not_appended() {
        let text = "[ERROR] boom\n  too short\n";
        let entries = parse_log(text, &markers(), 4, 0);
        assert_eq!(entries.len(), 1);
        assert!(entries[0].stack_lines.is_empty());
    }
}
