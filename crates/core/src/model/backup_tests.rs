// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn meta() -> BackupMeta {
    BackupMeta::new(BackupId::new(), PathBuf::from("/tmp/a.js"), 1000, 42, "deadbeef".to_string())
}

#[test]
fn verify_matches_case_insensitively() {
    let m = meta();
    assert!(m.verify("DEADBEEF"));
    assert!(m.verify("deadbeef"));
}

#[test]
fn verify_rejects_mismatch() {
    let m = meta();
    assert!(!m.verify("cafebabe"));
}

#[test]
fn serializes_round_trip() {
    let m = meta();
    let json = serde_json::to_string(&m).unwrap();
    let back: BackupMeta = serde_json::from_str(&json).unwrap();
    assert_eq!(m, back);
}
