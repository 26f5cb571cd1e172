// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackupError {
    #[error("io error at {path}: {source}")]
    Io { path: PathBuf, #[source] source: std::io::Error },

    #[error("backup {id} failed post-write verification: checksum mismatch")]
    IntegrityError { id: String },

    #[error("backup {id} is corrupt: checksum does not match sidecar")]
    CorruptBackup { id: String },

    #[error("backup {id} not found")]
    NotFound { id: String },
}
