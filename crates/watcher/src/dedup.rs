// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Persisted, bounded set of already-emitted fingerprints (§4.H): "a
//! persisted `ProcessedErrors` set of `hash` values ... deduplicates".

use std::collections::VecDeque;
use std::path::PathBuf;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use triage_core::{AtomicJsonStore, StoreError};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ProcessedErrors {
    order: VecDeque<String>,
}

/// FIFO-bounded, disk-backed dedup set. Oldest fingerprints are evicted once
/// the set reaches `cap` entries.
pub struct ProcessedErrorsStore {
    store: Mutex<AtomicJsonStore<ProcessedErrors>>,
    cap: usize,
}

impl ProcessedErrorsStore {
    pub fn open(path: impl Into<PathBuf>, cap: usize) -> Result<Self, StoreError> {
        Ok(Self { store: Mutex::new(AtomicJsonStore::open(path)?), cap })
    }

    /// Returns `true` if `hash` was already seen (no state change); otherwise
    /// records it and returns `false`.
    pub fn check_and_insert(&self, hash: &str) -> Result<bool, StoreError> {
        let mut store = self.store.lock();
        if store.get().order.iter().any(|h| h == hash) {
            return Ok(true);
        }
        let cap = self.cap;
        store.update(|processed| {
            processed.order.push_back(hash.to_string());
            while processed.order.len() > cap {
                processed.order.pop_front();
            }
        })?;
        Ok(false)
    }

    pub fn len(&self) -> usize {
        self.store.lock().get().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_sighting_is_not_a_duplicate() {
        let dir = tempfile::tempdir().unwrap();
        let store = ProcessedErrorsStore::open(dir.path().join("processed.json"), 100).unwrap();
        assert!(!store.check_and_insert("abc12345").unwrap());
        assert!(store.check_and_insert("abc12345").unwrap());
    }

    #[test]
    fn evicts_oldest_once_over_capacity() {
        let dir = tempfile::tempdir().unwrap();
        let store = ProcessedErrorsStore::open(dir.path().join("processed.json"), 2).unwrap();
        store.check_and_insert("a").unwrap();
        store.check_and_insert("b").unwrap();
        store.check_and_insert("c").unwrap();
        assert_eq!(store.len(), 2);
        assert!(!store.check_and_insert("a").unwrap());
    }
}
