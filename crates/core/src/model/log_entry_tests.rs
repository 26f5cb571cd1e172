// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn parses_known_levels() {
    assert_eq!(LogLevel::parse("ERROR"), Some(LogLevel::Error));
    assert_eq!(LogLevel::parse("FATAL"), Some(LogLevel::Fatal));
    assert_eq!(LogLevel::parse("WARN"), Some(LogLevel::Warn));
}

#[test]
fn rejects_unknown_levels() {
    assert_eq!(LogLevel::parse("INFO"), None);
    assert_eq!(LogLevel::parse("DEBUG"), None);
    assert_eq!(LogLevel::parse(""), None);
}

#[test]
fn display_roundtrips_through_parse() {
    for level in [LogLevel::Error, LogLevel::Fatal, LogLevel::Warn] {
        assert_eq!(LogLevel::parse(&level.to_string()), Some(level));
    }
}

#[test]
fn builder_accumulates_stack_lines() {
    let entry = RawLogEntry::new(1000, LogLevel::Error, "boom")
        .with_stack(vec!["at foo".to_string(), "at bar".to_string()]);
    assert_eq!(entry.stack_lines.len(), 2);
    assert_eq!(entry.message, "boom");
}

#[test]
fn serializes_round_trip() {
    let entry = RawLogEntry::new(42, LogLevel::Fatal, "m").with_stack(vec!["a".into()]);
    let json = serde_json::to_string(&entry).unwrap();
    let back: RawLogEntry = serde_json::from_str(&json).unwrap();
    assert_eq!(entry, back);
}
