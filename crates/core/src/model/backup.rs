// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Backup/rollback snapshots (Component A). A `BackupMeta` is the sidecar
//! written next to each content blob under `<backup>/<backupId>.meta.json`;
//! the blob itself is opaque bytes this crate never touches.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::model::ids::BackupId;

/// Metadata sealed alongside a backup's content blob. Immutable after
/// creation: a `BackupMeta` is never mutated once `createBackup` returns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupMeta {
    pub backup_id: BackupId,
    pub original_path: PathBuf,
    pub timestamp: u64,
    pub byte_len: u64,
    /// Lowercase hex-encoded SHA-256 of the blob.
    pub checksum: String,
}

impl BackupMeta {
    pub fn new(backup_id: BackupId, original_path: PathBuf, timestamp: u64, byte_len: u64, checksum: String) -> Self {
        Self { backup_id, original_path, timestamp, byte_len, checksum }
    }

    /// Whether `checksum` matches a freshly computed hash of the blob.
    pub fn verify(&self, actual_checksum: &str) -> bool {
        self.checksum.eq_ignore_ascii_case(actual_checksum)
    }
}

#[cfg(test)]
#[path = "backup_tests.rs"]
mod tests;
