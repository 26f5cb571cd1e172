// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Atomic JSON-on-disk persistence, shared by every component that owns a
//! single-file store: the backup index, lock table, agent registry,
//! analysis cache, pattern statistics.
//!
//! Writes go to a sibling temp file and are renamed into place, so a crash
//! mid-write never leaves a half-written file at the real path. A parse
//! failure on load is treated as an empty store rather than a hard error —
//! the crash-recovery posture the pipeline takes everywhere (§5).

use serde::{de::DeserializeOwned, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error at {path}: {source}")]
    Io { path: PathBuf, #[source] source: std::io::Error },
    #[error("serialization error at {path}: {source}")]
    Serde { path: PathBuf, #[source] source: serde_json::Error },
}

const MAX_BAK_FILES: u32 = 3;

/// Pick the next `.bak` / `.bak.N` path, rotating older backups out.
///
/// Keeps up to [`MAX_BAK_FILES`] backups. The oldest is dropped once the
/// limit is reached; the rest shift up by one.
fn rotate_bak_path(path: &Path) -> PathBuf {
    let bak = |n: u32| {
        if n == 1 {
            path.with_extension("bak")
        } else {
            path.with_extension(format!("bak.{n}"))
        }
    };

    let oldest = bak(MAX_BAK_FILES);
    if oldest.exists() {
        let _ = fs::remove_file(&oldest);
    }
    for n in (1..MAX_BAK_FILES).rev() {
        let src = bak(n);
        if src.exists() {
            let _ = fs::rename(&src, bak(n + 1));
        }
    }
    bak(1)
}

/// Read and deserialize `path` as JSON. Returns `default` (without error) if
/// the file is absent or fails to parse.
pub fn load_or_default<T>(path: &Path, default: T) -> Result<T, StoreError>
where
    T: DeserializeOwned,
{
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(default),
        Err(e) => return Err(StoreError::Io { path: path.to_path_buf(), source: e }),
    };
    match serde_json::from_slice(&bytes) {
        Ok(value) => Ok(value),
        Err(_) => Ok(default),
    }
}

/// Serialize `value` and write it to `path` atomically, rotating the
/// previous contents into a `.bak` file first.
pub fn save_atomic<T>(path: &Path, value: &T) -> Result<(), StoreError>
where
    T: Serialize,
{
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| StoreError::Io { path: parent.to_path_buf(), source: e })?;
    }
    if path.exists() {
        let bak = rotate_bak_path(path);
        let _ = fs::copy(path, bak);
    }
    let json = serde_json::to_vec_pretty(value).map_err(|e| StoreError::Serde { path: path.to_path_buf(), source: e })?;
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, &json).map_err(|e| StoreError::Io { path: tmp.clone(), source: e })?;
    fs::rename(&tmp, path).map_err(|e| StoreError::Io { path: path.to_path_buf(), source: e })?;
    Ok(())
}

/// A single JSON document backed by a file, loaded once and kept in memory
/// thereafter. Every store owned by a pipeline component (§5: "writers
/// serialize through an in-process mutex for that store and persist with
/// atomic write-then-rename") wraps one of these — callers supply the
/// mutex.
pub struct AtomicJsonStore<T> {
    path: PathBuf,
    value: T,
}

impl<T> AtomicJsonStore<T>
where
    T: Serialize + DeserializeOwned + Default,
{
    /// Load `path`, substituting `T::default()` if absent or unparseable.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let value = load_or_default(&path, T::default())?;
        Ok(Self { path, value })
    }

    pub fn get(&self) -> &T {
        &self.value
    }

    pub fn get_mut(&mut self) -> &mut T {
        &mut self.value
    }

    /// Persist the current in-memory value atomically.
    pub fn save(&self) -> Result<(), StoreError> {
        save_atomic(&self.path, &self.value)
    }

    /// Apply `f` to the in-memory value, then persist the result.
    pub fn update<F>(&mut self, f: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut T),
    {
        f(&mut self.value);
        self.save()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
