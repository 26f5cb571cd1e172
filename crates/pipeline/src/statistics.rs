// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Statistics & trend detection (Component E, §4.E): per-category,
//! per-severity, hour-of-day, and day-bucket counters, plus a
//! moving-average/least-squares trend over the daily series.

use std::collections::HashMap;
use std::path::Path;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use triage_core::{AtomicJsonStore, Clock, ErrorEvent, StatisticsConfig, StoreError, TrendDirection};

const MS_PER_DAY: u64 = 86_400_000;
const MS_PER_HOUR: u64 = 3_600_000;

/// One event retained in a [`DayBucket`]'s overflow-bounded recent-events
/// list (§4.E: "an overflow-bounded list of recent events (cap 100)").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecentEvent {
    pub hash: String,
    pub timestamp: u64,
    pub category: String,
}

/// One calendar day's tally. Every counter — `total`, `by_category`,
/// `by_severity`, `by_hour`, `by_day_of_week` — bumps on every ingested
/// event with no cap, so their sums stay in conservation with `total`
/// (§8 invariant 14). Only `recent`, the list of recent events kept for
/// inspection, is bounded at `events_per_day_bucket_cap` (§4.E).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DayBucket {
    pub total: u64,
    pub by_category: HashMap<String, u64>,
    pub by_severity: HashMap<String, u64>,
    pub by_hour: HashMap<u8, u64>,
    pub by_day_of_week: HashMap<u8, u64>,
    pub recent: Vec<RecentEvent>,
}

impl DayBucket {
    fn record(&mut self, event: &ErrorEvent, cap: usize) {
        self.total += 1;
        *self.by_category.entry(event.classification.category.clone()).or_insert(0) += 1;
        *self.by_severity.entry(format!("{:?}", event.classification.severity)).or_insert(0) += 1;
        let hour = ((event.timestamp % MS_PER_DAY) / MS_PER_HOUR) as u8;
        *self.by_hour.entry(hour).or_insert(0) += 1;
        let dow = day_of_week(event.timestamp);
        *self.by_day_of_week.entry(dow).or_insert(0) += 1;
        if self.recent.len() < cap {
            self.recent.push(RecentEvent {
                hash: event.hash.clone(),
                timestamp: event.timestamp,
                category: event.classification.category.clone(),
            });
        }
    }
}

/// ISO day-of-week (0 = Sunday .. 6 = Saturday, matching the teacher's own
/// `Date.getDay()`-shaped convention) for the epoch-ms `timestamp`. The
/// Unix epoch (day 0) fell on a Thursday.
fn day_of_week(timestamp: u64) -> u8 {
    let epoch_day = timestamp / MS_PER_DAY;
    ((epoch_day + 4) % 7) as u8
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StatisticsData {
    days: HashMap<u64, DayBucket>,
}

/// A single category's trend over the configured window (§4.E step 3).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CategoryTrend {
    pub direction: TrendDirection,
    pub rate: f64,
    pub window_days: u32,
}

/// A read-only rollup of current totals, handed out by [`StatisticsEngine::snapshot`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatisticsSnapshot {
    pub total_events: u64,
    pub by_category: HashMap<String, u64>,
    pub by_severity: HashMap<String, u64>,
    pub by_hour: HashMap<u8, u64>,
    pub by_day_of_week: HashMap<u8, u64>,
}

/// Owns the day-bucket store file, mirroring [`crate::grouping::GroupingEngine`].
pub struct StatisticsEngine<C: Clock> {
    store: Mutex<AtomicJsonStore<StatisticsData>>,
    config: StatisticsConfig,
    clock: C,
}

impl<C: Clock> StatisticsEngine<C> {
    pub fn open(path: impl AsRef<Path>, config: StatisticsConfig, clock: C) -> Result<Self, StoreError> {
        Ok(Self { store: Mutex::new(AtomicJsonStore::open(path.as_ref())?), config, clock })
    }

    fn day_index(timestamp: u64) -> u64 {
        timestamp / MS_PER_DAY
    }

    /// Fold one classified event into its day bucket (§4.E step 1).
    pub fn record(&self, event: &ErrorEvent) -> Result<(), StoreError> {
        let day = Self::day_index(event.timestamp);
        let cap = self.config.events_per_day_bucket_cap;
        let mut store = self.store.lock();
        store.update(|data| data.days.entry(day).or_default().record(event, cap))
    }

    /// Drop day buckets older than `day_bucket_retention_days` relative to
    /// the clock's current day (§4.E step 4).
    pub fn prune(&self) -> Result<usize, StoreError> {
        let today = Self::day_index(self.clock.epoch_ms());
        let retention = self.config.day_bucket_retention_days as u64;
        let mut removed = 0;
        let mut store = self.store.lock();
        store.update(|data| {
            let before = data.days.len();
            data.days.retain(|day, _| today.saturating_sub(*day) <= retention);
            removed = before - data.days.len();
        })?;
        Ok(removed)
    }

    /// Aggregate all retained buckets into one snapshot.
    pub fn snapshot(&self) -> StatisticsSnapshot {
        let store = self.store.lock();
        let mut snapshot = StatisticsSnapshot::default();
        for bucket in store.get().days.values() {
            snapshot.total_events += bucket.total;
            for (k, v) in &bucket.by_category {
                *snapshot.by_category.entry(k.clone()).or_insert(0) += v;
            }
            for (k, v) in &bucket.by_severity {
                *snapshot.by_severity.entry(k.clone()).or_insert(0) += v;
            }
            for (k, v) in &bucket.by_hour {
                *snapshot.by_hour.entry(*k).or_insert(0) += v;
            }
            for (k, v) in &bucket.by_day_of_week {
                *snapshot.by_day_of_week.entry(*k).or_insert(0) += v;
            }
        }
        snapshot
    }

    /// The capped recent-events list for the day bucket containing
    /// `timestamp` (§4.E), most useful for the day the caller just recorded
    /// into.
    pub fn recent_events(&self, timestamp: u64) -> Vec<RecentEvent> {
        let day = Self::day_index(timestamp);
        self.store.lock().get().days.get(&day).map(|b| b.recent.clone()).unwrap_or_default()
    }

    /// Trend for one category over the configured window (§4.E step 3):
    /// a centered moving average over the daily per-category counts,
    /// followed by a least-squares slope of the smoothed series.
    /// `rate = slope / max(first_smoothed, 1)`; rising/falling/stable at
    /// the configured `trend_rate_threshold`.
    pub fn trend_for_category(&self, category: &str) -> CategoryTrend {
        let today = Self::day_index(self.clock.epoch_ms());
        let window = self.config.trend_window_days as u64;
        let store = self.store.lock();
        let daily: Vec<f64> = (0..window)
            .map(|offset| {
                let day = today.saturating_sub(window - 1 - offset);
                store.get().days.get(&day).and_then(|b| b.by_category.get(category)).copied().unwrap_or(0) as f64
            })
            .collect();
        drop(store);

        let smoothed = centered_moving_average(&daily, self.config.trend_smoothing_window);
        let slope = least_squares_slope(&smoothed);
        let first = smoothed.first().copied().unwrap_or(0.0).max(1.0);
        let rate = slope / first;

        let threshold = self.config.trend_rate_threshold;
        let direction = if rate >= threshold {
            TrendDirection::Rising
        } else if rate <= -threshold {
            TrendDirection::Falling
        } else {
            TrendDirection::Stable
        };
        CategoryTrend { direction, rate, window_days: self.config.trend_window_days }
    }
}

/// Centered moving average with the given odd or even window; edges use a
/// shrinking window rather than padding with zeros, so a short series isn't
/// artificially flattened.
fn centered_moving_average(values: &[f64], window: usize) -> Vec<f64> {
    if window <= 1 || values.is_empty() {
        return values.to_vec();
    }
    let half = window / 2;
    (0..values.len())
        .map(|i| {
            let start = i.saturating_sub(half);
            let end = (i + half + 1).min(values.len());
            let slice = &values[start..end];
            slice.iter().sum::<f64>() / slice.len() as f64
        })
        .collect()
}

/// Ordinary least-squares slope of `values` against `0..values.len()`.
fn least_squares_slope(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }
    let xs: Vec<f64> = (0..n).map(|i| i as f64).collect();
    let mean_x = xs.iter().sum::<f64>() / n as f64;
    let mean_y = values.iter().sum::<f64>() / n as f64;
    let mut num = 0.0;
    let mut den = 0.0;
    for (x, y) in xs.iter().zip(values) {
        num += (x - mean_x) * (y - mean_y);
        den += (x - mean_x).powi(2);
    }
    if den == 0.0 {
        0.0
    } else {
        num / den
    }
}
