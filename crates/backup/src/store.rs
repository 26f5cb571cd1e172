// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::fs;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::{info, warn};
use triage_core::{BackupConfig, BackupId, BackupMeta, Clock};

use crate::error::BackupError;

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// A handle to one completed snapshot, enough to restore or roll it back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupRef {
    pub backup_id: BackupId,
    pub original_path: PathBuf,
}

/// Outcome of a best-effort, multi-file [`BackupStore::rollback`] (§4.A).
#[derive(Debug, Default)]
pub struct RollbackReport {
    pub restored: Vec<PathBuf>,
    pub restore_failures: Vec<(PathBuf, String)>,
    pub deleted_created: Vec<PathBuf>,
    pub delete_failures: Vec<(PathBuf, String)>,
}

impl RollbackReport {
    pub fn all_ok(&self) -> bool {
        self.restore_failures.is_empty() && self.delete_failures.is_empty()
    }
}

/// Content-addressed backup store: one `<id>.backup` blob plus one
/// `<id>.meta.json` sidecar per snapshot, under `dir` (Component A).
pub struct BackupStore<C: Clock> {
    dir: PathBuf,
    config: BackupConfig,
    clock: C,
}

impl<C: Clock> BackupStore<C> {
    pub fn new(dir: impl Into<PathBuf>, config: BackupConfig, clock: C) -> Self {
        Self { dir: dir.into(), config, clock }
    }

    fn blob_path(&self, id: &BackupId) -> PathBuf {
        self.dir.join(format!("{id}.backup"))
    }

    fn meta_path(&self, id: &BackupId) -> PathBuf {
        self.dir.join(format!("{id}.meta.json"))
    }

    /// Snapshot `path`: read its bytes, hash them, write the blob then the
    /// sidecar, and re-read + re-hash to verify the write landed intact.
    #[allow(clippy::expect_used)]
    pub fn create_backup(&self, path: &Path) -> Result<BackupRef, BackupError> {
        fs::create_dir_all(&self.dir).map_err(|e| BackupError::Io { path: self.dir.clone(), source: e })?;
        let bytes = fs::read(path).map_err(|e| BackupError::Io { path: path.to_path_buf(), source: e })?;
        let checksum = sha256_hex(&bytes);
        let backup_id = BackupId::new();
        let blob_path = self.blob_path(&backup_id);

        fs::write(&blob_path, &bytes).map_err(|e| BackupError::Io { path: blob_path.clone(), source: e })?;

        let verify = fs::read(&blob_path).map_err(|e| BackupError::Io { path: blob_path.clone(), source: e })?;
        if sha256_hex(&verify) != checksum {
            let _ = fs::remove_file(&blob_path);
            return Err(BackupError::IntegrityError { id: backup_id.to_string() });
        }

        let meta = BackupMeta::new(backup_id, path.to_path_buf(), self.clock.epoch_ms(), bytes.len() as u64, checksum);
        let meta_path = self.meta_path(&backup_id);
        let json = serde_json::to_vec_pretty(&meta).expect("BackupMeta always serializes");
        if let Err(e) = fs::write(&meta_path, json) {
            let _ = fs::remove_file(&blob_path);
            return Err(BackupError::Io { path: meta_path, source: e });
        }

        info!(backup_id = %backup_id, path = %path.display(), "created backup");
        Ok(BackupRef { backup_id, original_path: path.to_path_buf() })
    }

    fn load_meta(&self, id: &BackupId) -> Result<BackupMeta, BackupError> {
        let meta_path = self.meta_path(id);
        let bytes = fs::read(&meta_path).map_err(|_| BackupError::NotFound { id: id.to_string() })?;
        serde_json::from_slice(&bytes).map_err(|_| BackupError::NotFound { id: id.to_string() })
    }

    /// Restore `target` from backup `id`, re-verifying the checksum first.
    /// §4.A invariant (ii): a mismatch means the backup is treated as
    /// corrupt/absent rather than silently applied.
    pub fn restore(&self, id: &BackupId, target: &Path) -> Result<(), BackupError> {
        let meta = self.load_meta(id)?;
        let blob_path = self.blob_path(id);
        let bytes = fs::read(&blob_path).map_err(|_| BackupError::CorruptBackup { id: id.to_string() })?;
        let checksum = sha256_hex(&bytes);
        if !meta.verify(&checksum) {
            warn!(backup_id = %id, "checksum mismatch on restore");
            return Err(BackupError::CorruptBackup { id: id.to_string() });
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| BackupError::Io { path: parent.to_path_buf(), source: e })?;
        }
        let tmp = target.with_extension("triage-restore-tmp");
        fs::write(&tmp, &bytes).map_err(|e| BackupError::Io { path: tmp.clone(), source: e })?;
        fs::rename(&tmp, target).map_err(|e| BackupError::Io { path: target.to_path_buf(), source: e })?;
        Ok(())
    }

    /// Restore every `(id, path)` pair in reverse order, then delete every
    /// `created_files` entry. Each step is independently attempted: one
    /// failure never aborts the rest (§4.A "best-effort; report aggregate
    /// outcome").
    pub fn rollback(&self, backups: &[(BackupId, PathBuf)], created_files: &[PathBuf]) -> RollbackReport {
        let mut report = RollbackReport::default();
        for (id, path) in backups.iter().rev() {
            match self.restore(id, path) {
                Ok(()) => report.restored.push(path.clone()),
                Err(e) => report.restore_failures.push((path.clone(), e.to_string())),
            }
        }
        for path in created_files {
            match fs::remove_file(path) {
                Ok(()) => report.deleted_created.push(path.clone()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => report.deleted_created.push(path.clone()),
                Err(e) => report.delete_failures.push((path.clone(), e.to_string())),
            }
        }
        report
    }

    /// Delete backups older than `retention_days`, then trim the oldest
    /// survivors until at most `max_backups` remain.
    pub fn prune(&self) -> Result<usize, BackupError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(BackupError::Io { path: self.dir.clone(), source: e }),
        };

        let mut metas: Vec<(BackupId, BackupMeta)> = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Ok(bytes) = fs::read(&path) else { continue };
            let Ok(meta) = serde_json::from_slice::<BackupMeta>(&bytes) else { continue };
            metas.push((meta.backup_id, meta));
        }

        let now = self.clock.epoch_ms();
        let retention_ms = self.config.retention_days as u64 * 24 * 60 * 60 * 1000;
        let mut removed = 0usize;
        metas.retain(|(id, meta)| {
            if now.saturating_sub(meta.timestamp) > retention_ms {
                self.delete_pair(id);
                removed += 1;
                false
            } else {
                true
            }
        });

        metas.sort_by_key(|(_, m)| m.timestamp);
        while metas.len() > self.config.max_backups {
            let (id, _) = metas.remove(0);
            self.delete_pair(&id);
            removed += 1;
        }
        Ok(removed)
    }

    fn delete_pair(&self, id: &BackupId) {
        let _ = fs::remove_file(self.blob_path(id));
        let _ = fs::remove_file(self.meta_path(id));
    }
}
