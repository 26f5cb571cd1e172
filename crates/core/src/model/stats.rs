// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-pattern statistics and trend detection (Component E).

use serde::{Deserialize, Serialize};

/// Direction a pattern's occurrence rate is moving, compared across
/// consecutive windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Rising,
    Falling,
    Stable,
}

/// A single window-over-window comparison for one pattern.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Trend {
    pub direction: TrendDirection,
    pub current_window_count: u64,
    pub previous_window_count: u64,
    /// `(current - previous) / previous`, or 0.0 when `previous` is 0.
    pub change_ratio: f64,
}

impl Trend {
    pub fn compute(current_window_count: u64, previous_window_count: u64, rising_threshold: f64) -> Self {
        let change_ratio = if previous_window_count == 0 {
            if current_window_count == 0 {
                0.0
            } else {
                1.0
            }
        } else {
            (current_window_count as f64 - previous_window_count as f64) / previous_window_count as f64
        };
        let direction = if change_ratio >= rising_threshold {
            TrendDirection::Rising
        } else if change_ratio <= -rising_threshold {
            TrendDirection::Falling
        } else {
            TrendDirection::Stable
        };
        Self { direction, current_window_count, previous_window_count, change_ratio }
    }
}

/// Accumulated counters for one pattern, updated every time a classified
/// event carrying that pattern is observed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternStats {
    pub pattern_id: String,
    pub total_occurrences: u64,
    pub repairs_attempted: u64,
    pub repairs_succeeded: u64,
    pub first_seen: u64,
    pub last_seen: u64,
}

impl PatternStats {
    pub fn new(pattern_id: impl Into<String>, timestamp: u64) -> Self {
        Self {
            pattern_id: pattern_id.into(),
            total_occurrences: 1,
            repairs_attempted: 0,
            repairs_succeeded: 0,
            first_seen: timestamp,
            last_seen: timestamp,
        }
    }

    pub fn record_occurrence(&mut self, timestamp: u64) {
        self.total_occurrences += 1;
        self.last_seen = self.last_seen.max(timestamp);
        self.first_seen = self.first_seen.min(timestamp);
    }

    pub fn record_repair(&mut self, succeeded: bool) {
        self.repairs_attempted += 1;
        if succeeded {
            self.repairs_succeeded += 1;
        }
    }

    /// Fraction of attempted repairs that committed; `0.0` when none attempted.
    pub fn success_rate(&self) -> f64 {
        if self.repairs_attempted == 0 {
            0.0
        } else {
            self.repairs_succeeded as f64 / self.repairs_attempted as f64
        }
    }
}

#[cfg(test)]
#[path = "stats_tests.rs"]
mod tests;
