// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pattern learner (Component F, §4.F): tracks per-pattern repair outcomes,
//! auto-disables chronically failing patterns, adjusts confidence on
//! learner-derived patterns, and mines recent failures for new candidates.

use std::collections::HashMap;
use std::path::Path;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use triage_core::{AtomicJsonStore, Clock, ErrorEvent, LearnerConfig, StoreError};

use crate::text::normalize;

#[derive(Debug, Error)]
pub enum LearnerError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Per-pattern outcome tally, the learner's view of [`triage_core::PatternStats`]
/// extended with the timing and disablement fields §4.F names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternLearnerEntry {
    pub pattern_id: String,
    pub attempts: u32,
    pub successes: u32,
    pub failures: u32,
    pub total_duration_ms: u64,
    pub disabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disabled_reason: Option<String>,
}

impl PatternLearnerEntry {
    fn new(pattern_id: impl Into<String>) -> Self {
        Self {
            pattern_id: pattern_id.into(),
            attempts: 0,
            successes: 0,
            failures: 0,
            total_duration_ms: 0,
            disabled: false,
            disabled_reason: None,
        }
    }

    pub fn success_rate(&self) -> f64 {
        if self.attempts == 0 {
            0.0
        } else {
            self.successes as f64 / self.attempts as f64
        }
    }

    pub fn avg_duration_ms(&self) -> f64 {
        if self.attempts == 0 {
            0.0
        } else {
            self.total_duration_ms as f64 / self.attempts as f64
        }
    }
}

/// A derived pattern the learner has surfaced, with its own adjustable
/// confidence (§4.F paragraph 2), distinct from the built-in registry's
/// fixed patterns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearnedPattern {
    pub normalized_message: String,
    pub occurrences: u64,
    pub examples: Vec<String>,
    pub confidence: f64,
    pub active: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct LearningData {
    patterns: HashMap<String, PatternLearnerEntry>,
    learned: HashMap<String, LearnedPattern>,
    /// Recent failure events, kept only long enough to feed
    /// `suggest_new_patterns`'s 7-day window; pruned on `record_result`.
    recent_failures: Vec<(u64, String, String)>,
}

/// Candidate pattern emitted by [`PatternLearner::suggest_new_patterns`].
#[derive(Debug, Clone, PartialEq)]
pub struct SuggestedPattern {
    pub normalized_message: String,
    pub occurrences: u64,
    pub examples: Vec<String>,
    pub confidence: f64,
}

/// Backing store for the learner's two documents (`learning-data.json`,
/// `learned-patterns.json` in the spec's terms, merged into one file here
/// since they're written atomically together on every outcome).
pub struct PatternLearner<C: Clock> {
    store: Mutex<AtomicJsonStore<LearningData>>,
    config: LearnerConfig,
    clock: C,
}

impl<C: Clock> PatternLearner<C> {
    pub fn open(path: impl AsRef<Path>, config: LearnerConfig, clock: C) -> Result<Self, LearnerError> {
        Ok(Self { store: Mutex::new(AtomicJsonStore::open(path.as_ref())?), config, clock })
    }

    /// Record one repair attempt's outcome against `pattern_id` (§4.F
    /// paragraph 1). Auto-disables the pattern once `attempts >=
    /// min_attempts_before_disable` and `success_rate < disable_success_rate_below`.
    pub fn record_result(&self, pattern_id: &str, ok: bool, duration_ms: u64, event: &ErrorEvent) -> Result<(), LearnerError> {
        let now = self.clock.epoch_ms();
        let mut store = self.store.lock();
        store.update(|data| {
            let entry = data.patterns.entry(pattern_id.to_string()).or_insert_with(|| PatternLearnerEntry::new(pattern_id));
            entry.attempts += 1;
            entry.total_duration_ms += duration_ms;
            if ok {
                entry.successes += 1;
            } else {
                entry.failures += 1;
            }
            if entry.attempts >= self.config.min_attempts_before_disable
                && entry.success_rate() < self.config.disable_success_rate_below
            {
                entry.disabled = true;
                entry.disabled_reason = Some(format!(
                    "success rate {:.2} over {} attempts is below the {:.2} floor",
                    entry.success_rate(),
                    entry.attempts,
                    self.config.disable_success_rate_below
                ));
            }

            if let Some(learned) = data.learned.get_mut(pattern_id) {
                let delta = if ok { self.config.learned_pattern_success_delta } else { self.config.learned_pattern_failure_delta };
                learned.confidence = (learned.confidence + delta).clamp(0.0, 1.0);
                if learned.confidence < self.config.learned_pattern_deactivate_below {
                    learned.active = false;
                }
            }

            if !ok {
                let normalized = normalize(&event.message);
                data.recent_failures.push((now, normalized, event.message.clone()));
            }
            let window_ms = self.config.suggest_window_days as u64 * 86_400_000;
            data.recent_failures.retain(|(ts, _, _)| now.saturating_sub(*ts) <= window_ms);
        })?;
        Ok(())
    }

    pub fn get(&self, pattern_id: &str) -> Option<PatternLearnerEntry> {
        self.store.lock().get().patterns.get(pattern_id).cloned()
    }

    pub fn is_disabled(&self, pattern_id: &str) -> bool {
        self.store.lock().get().patterns.get(pattern_id).map(|e| e.disabled).unwrap_or(false)
    }

    /// §4.F paragraph 3: group the retained window of failures by
    /// normalized message, emit every group of at least
    /// `suggest_min_occurrences` as a candidate, newest-first examples
    /// capped at 3.
    pub fn suggest_new_patterns(&self) -> Vec<SuggestedPattern> {
        let store = self.store.lock();
        let mut groups: HashMap<&str, Vec<&str>> = HashMap::new();
        for (_, normalized, raw) in &store.get().recent_failures {
            groups.entry(normalized.as_str()).or_default().push(raw.as_str());
        }
        let mut suggestions: Vec<SuggestedPattern> = groups
            .into_iter()
            .filter(|(_, examples)| examples.len() >= self.config.suggest_min_occurrences)
            .map(|(normalized, examples)| {
                let occurrences = examples.len() as u64;
                let examples = examples.iter().rev().take(3).map(|s| s.to_string()).collect();
                SuggestedPattern {
                    normalized_message: normalized.to_string(),
                    occurrences,
                    examples,
                    confidence: (occurrences as f64 / 10.0).min(1.0),
                }
            })
            .collect();
        suggestions.sort_by(|a, b| b.occurrences.cmp(&a.occurrences));
        suggestions
    }

    /// Promote a suggestion into an active [`LearnedPattern`] (outside the
    /// spec's direct naming but the natural bridge from suggestion to the
    /// confidence-adjustable record `record_result` mutates).
    pub fn adopt_learned_pattern(&self, suggestion: &SuggestedPattern) -> Result<(), LearnerError> {
        let mut store = self.store.lock();
        store.update(|data| {
            data.learned.insert(
                suggestion.normalized_message.clone(),
                LearnedPattern {
                    normalized_message: suggestion.normalized_message.clone(),
                    occurrences: suggestion.occurrences,
                    examples: suggestion.examples.clone(),
                    confidence: suggestion.confidence,
                    active: true,
                },
            );
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use triage_core::test_support::error_event;
    use triage_core::FakeClock;

    fn learner(dir: &std::path::Path, clock: FakeClock) -> PatternLearner<FakeClock> {
        PatternLearner::open(dir.join("learning.json"), LearnerConfig::default(), clock).unwrap()
    }

    #[test]
    fn first_attempt_creates_an_entry() {
        let dir = tempdir().unwrap();
        let clock = FakeClock::new();
        let learner = learner(dir.path(), clock.clone());
        let event = error_event("h1", clock.epoch_ms(), "boom");
        learner.record_result("EP001", true, 100, &event).unwrap();
        let entry = learner.get("EP001").unwrap();
        assert_eq!(entry.attempts, 1);
        assert_eq!(entry.successes, 1);
        assert!(!entry.disabled);
    }

    #[test]
    fn auto_disables_after_enough_failing_attempts() {
        let dir = tempdir().unwrap();
        let clock = FakeClock::new();
        let learner = learner(dir.path(), clock.clone());
        let event = error_event("h1", clock.epoch_ms(), "boom");
        for _ in 0..5 {
            learner.record_result("EP001", false, 50, &event).unwrap();
        }
        let entry = learner.get("EP001").unwrap();
        assert!(entry.disabled);
        assert!(entry.disabled_reason.is_some());
    }

    #[test]
    fn does_not_disable_below_min_attempts() {
        let dir = tempdir().unwrap();
        let clock = FakeClock::new();
        let learner = learner(dir.path(), clock.clone());
        let event = error_event("h1", clock.epoch_ms(), "boom");
        for _ in 0..4 {
            learner.record_result("EP001", false, 50, &event).unwrap();
        }
        assert!(!learner.get("EP001").unwrap().disabled);
    }

    #[test]
    fn learned_pattern_confidence_rises_on_success_and_falls_on_failure() {
        let dir = tempdir().unwrap();
        let clock = FakeClock::new();
        let learner = learner(dir.path(), clock.clone());
        let suggestion = SuggestedPattern {
            normalized_message: "boom at N".to_string(),
            occurrences: 3,
            examples: vec!["boom at 1".to_string()],
            confidence: 0.5,
        };
        learner.adopt_learned_pattern(&suggestion).unwrap();
        let event = error_event("h1", clock.epoch_ms(), "boom at 9");

        learner.record_result("boom at N", true, 10, &event).unwrap();
        assert!((learner.store.lock().get().learned["boom at N"].confidence - 0.6).abs() < 1e-9);

        learner.record_result("boom at N", false, 10, &event).unwrap();
        assert!((learner.store.lock().get().learned["boom at N"].confidence - 0.55).abs() < 1e-9);
    }

    #[test]
    fn learned_pattern_deactivates_below_threshold() {
        let dir = tempdir().unwrap();
        let clock = FakeClock::new();
        let learner = learner(dir.path(), clock.clone());
        let suggestion = SuggestedPattern {
            normalized_message: "boom at N".to_string(),
            occurrences: 3,
            examples: vec![],
            confidence: 0.32,
        };
        learner.adopt_learned_pattern(&suggestion).unwrap();
        let event = error_event("h1", clock.epoch_ms(), "boom at 9");
        learner.record_result("boom at N", false, 10, &event).unwrap();
        assert!(!learner.store.lock().get().learned["boom at N"].active);
    }

    #[test]
    fn suggest_new_patterns_requires_minimum_occurrences() {
        let dir = tempdir().unwrap();
        let clock = FakeClock::new();
        let learner = learner(dir.path(), clock.clone());
        let e1 = error_event("h1", clock.epoch_ms(), "disk full at /tmp/1");
        let e2 = error_event("h2", clock.epoch_ms(), "disk full at /tmp/2");
        learner.record_result("EP000", false, 1, &e1).unwrap();
        learner.record_result("EP000", false, 1, &e2).unwrap();
        assert!(learner.suggest_new_patterns().is_empty());

        let e3 = error_event("h3", clock.epoch_ms(), "disk full at /tmp/3");
        learner.record_result("EP000", false, 1, &e3).unwrap();
        let suggestions = learner.suggest_new_patterns();
        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].occurrences, 3);
        assert!(suggestions[0].examples.len() <= 3);
    }

    #[test]
    fn failures_older_than_the_window_drop_out_of_suggestions() {
        let dir = tempdir().unwrap();
        let clock = FakeClock::new();
        let learner = learner(dir.path(), clock.clone());
        let e1 = error_event("h1", clock.epoch_ms(), "disk full at /tmp/1");
        for i in 0..3 {
            learner.record_result("EP000", false, 1, &error_event(&format!("h{i}"), clock.epoch_ms(), "disk full at /tmp/1")).unwrap();
        }
        assert_eq!(learner.suggest_new_patterns().len(), 1);
        let _ = &e1;
        clock.advance(std::time::Duration::from_secs(8 * 24 * 3600));
        learner.record_result("EP000", true, 1, &error_event("hN", clock.epoch_ms(), "unrelated message")).unwrap();
        assert!(learner.suggest_new_patterns().is_empty());
    }
}
