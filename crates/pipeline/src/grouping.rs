// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Grouping engine (Component D, §4.D): clusters classified events into
//! [`ErrorGroup`]s by weighted similarity, persisting the group table
//! through an [`AtomicJsonStore`].

use std::collections::HashMap;
use std::path::Path;

use parking_lot::Mutex;
use triage_core::{
    AtomicJsonStore, ErrorEvent, ErrorGroup, GroupId, GroupState, GroupingConfig, IdGen,
    StoreError,
};

use crate::text::{is_vendored, message_similarity, stack_frame_pair};

/// One group table entry, keyed by `GroupId`.
pub type GroupTable = HashMap<GroupId, ErrorGroup>;

/// Outcome of feeding one event through the grouping engine.
#[derive(Debug, Clone, PartialEq)]
pub enum GroupingOutcome {
    /// Joined an existing open group at the given similarity.
    Joined { group_id: GroupId, similarity: f64 },
    /// No existing open group was similar enough; a new one was created.
    Created { group_id: GroupId },
}

impl GroupingOutcome {
    pub fn group_id(&self) -> &GroupId {
        match self {
            Self::Joined { group_id, .. } | Self::Created { group_id } => group_id,
        }
    }
}

/// Weighted similarity between an incoming event and a group's
/// representative (§4.D step 2): `category*w_c + message*w_m + stack*w_s`.
pub fn weighted_similarity(event: &ErrorEvent, representative: &ErrorEvent, config: &GroupingConfig) -> f64 {
    let category_score = if event.classification.category == representative.classification.category { 1.0 } else { 0.0 };
    let message_score = message_similarity(&event.message, &representative.message);
    let stack_score = stack_similarity(&event.stack_lines, &representative.stack_lines, &config.vendored_marker);
    category_score * config.category_weight + message_score * config.message_weight + stack_score * config.stack_weight
}

/// Of the event's first three non-vendored stack frames, the fraction whose
/// `(file, function)` pair also appears among the representative's first
/// three non-vendored frames (§4.D step 1's "stack" term). Frames with no
/// stack at all on either side count as a perfect match rather than
/// penalizing events that carry no trace.
fn stack_similarity(event_frames: &[String], representative_frames: &[String], vendored_marker: &str) -> f64 {
    let non_vendored_pairs = |frames: &[String]| -> Vec<(String, String)> {
        frames
            .iter()
            .filter(|line| !is_vendored(line, vendored_marker))
            .take(3)
            .filter_map(|line| stack_frame_pair(line))
            .collect()
    };
    let event = non_vendored_pairs(event_frames);
    let representative: std::collections::HashSet<(String, String)> = non_vendored_pairs(representative_frames).into_iter().collect();
    if event.is_empty() && representative.is_empty() {
        return 1.0;
    }
    if event.is_empty() {
        return 0.0;
    }
    let matched = event.iter().filter(|pair| representative.contains(*pair)).count();
    matched as f64 / event.len() as f64
}

/// Owns the group table file and the in-process mutex serializing writers
/// to it, mirroring how [`triage_backup::BackupStore`] owns its directory.
pub struct GroupingEngine<I: IdGen> {
    store: Mutex<AtomicJsonStore<GroupTable>>,
    config: GroupingConfig,
    ids: I,
}

impl<I: IdGen> GroupingEngine<I> {
    pub fn open(path: impl AsRef<Path>, config: GroupingConfig, ids: I) -> Result<Self, StoreError> {
        Ok(Self { store: Mutex::new(AtomicJsonStore::open(path.as_ref())?), config, ids })
    }

    /// Fold `event` into the group table (§4.D): re-appending an
    /// already-seen hash to its existing group is a no-op via
    /// [`ErrorGroup::append`]'s own idempotence, so calling `group` twice
    /// with the same event is safe.
    pub fn group(&self, event: &ErrorEvent) -> Result<GroupingOutcome, StoreError> {
        let mut store = self.store.lock();
        let table = store.get();

        let mut best: Option<(GroupId, f64)> = None;
        for (id, group) in table.iter() {
            if group.state != GroupState::Open {
                continue;
            }
            if group.contains_hash(&event.hash) {
                return Ok(GroupingOutcome::Joined { group_id: id.clone(), similarity: 1.0 });
            }
            let similarity = weighted_similarity(event, &group.representative, &self.config);
            if similarity >= self.config.similarity_threshold {
                match &best {
                    Some((_, best_sim)) if *best_sim >= similarity => {}
                    _ => best = Some((id.clone(), similarity)),
                }
            }
        }

        let outcome = if let Some((group_id, similarity)) = best {
            store.update(|table| {
                if let Some(group) = table.get_mut(&group_id) {
                    group.append(event, similarity);
                }
            })?;
            GroupingOutcome::Joined { group_id, similarity }
        } else {
            let group_id = GroupId::from_string(self.ids.next());
            store.update(|table| {
                table.insert(group_id.clone(), ErrorGroup::new(group_id.clone(), event.clone()));
            })?;
            GroupingOutcome::Created { group_id }
        };
        Ok(outcome)
    }

    pub fn get(&self, group_id: &GroupId) -> Option<ErrorGroup> {
        self.store.lock().get().get(group_id).cloned()
    }

    pub fn close(&self, group_id: &GroupId, external_issue_ref: Option<String>) -> Result<bool, StoreError> {
        let mut store = self.store.lock();
        if !store.get().contains_key(group_id) {
            return Ok(false);
        }
        store.update(|table| {
            if let Some(group) = table.get_mut(group_id) {
                group.close(external_issue_ref);
            }
        })?;
        Ok(true)
    }

    pub fn open_groups(&self) -> Vec<ErrorGroup> {
        self.store.lock().get().values().filter(|g| g.state == GroupState::Open).cloned().collect()
    }
}
