// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn pattern_id_compares_equal_to_str() {
    let id = PatternId::new("EP001");
    assert_eq!(id, PatternId::from("EP001"));
    assert_eq!(id.as_str(), "EP001");
}

#[test]
fn unknown_pattern_is_ep000() {
    assert_eq!(PatternId::unknown().as_str(), "EP000");
}

#[test]
fn unknown_classification_is_unmatched_medium_bug() {
    let c = Classification::unknown();
    assert!(!c.matched);
    assert_eq!(c.severity, Severity::Medium);
    assert_eq!(c.kind, ErrorKind::Bug);
    assert_eq!(c.pattern_id, PatternId::unknown());
}

#[test]
fn severity_ordering_is_low_to_critical() {
    assert!(Severity::Low < Severity::Medium);
    assert!(Severity::Medium < Severity::High);
    assert!(Severity::High < Severity::Critical);
}

#[test]
fn error_event_serializes_round_trip() {
    let event = ErrorEvent {
        hash: "abcd1234".to_string(),
        timestamp: 1000,
        level: LogLevel::Error,
        message: "boom".to_string(),
        stack_lines: vec!["at foo".to_string()],
        source_file: Some(PathBuf::from("/tmp/a.js")),
        source_line: Some(10),
        classification: Classification::unknown(),
    };
    let json = serde_json::to_string(&event).unwrap();
    let back: ErrorEvent = serde_json::from_str(&json).unwrap();
    assert_eq!(event, back);
}
