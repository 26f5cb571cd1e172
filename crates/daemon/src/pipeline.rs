// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The ingest cycle: one pass of H→C→D→E→(F,G), run on the watcher's
//! `scan_interval_ms` tick.

use tracing::{debug, info, warn};
use triage_core::Clock;
use triage_repair::RepairOptions;

use crate::lifecycle::{DaemonError, Engines};

impl<C: Clock> Engines<C> {
    /// Scan for new log entries, classify, group, record statistics, and
    /// attempt a repair for every newly grouped event (§4.G's admission
    /// checks decide whether the attempt actually does anything).
    pub async fn run_ingest_cycle(&mut self) -> Result<usize, DaemonError> {
        let entries = self.watcher.scan()?;
        if entries.is_empty() {
            return Ok(0);
        }
        debug!(count = entries.len(), "new log entries");

        for raw in &entries {
            let event = self.classifier.classify(raw);
            let outcome = self.grouping.group(&event)?;
            self.statistics.record(&event)?;

            let group_id = outcome.group_id().clone();
            let opts = RepairOptions { pid: std::process::id(), ..Default::default() };
            match self.repair.attempt_repair(&event, &group_id, opts).await {
                Ok(result) => info!(group_id = %group_id, outcome = ?result.outcome, "repair attempt finished"),
                Err(e) => warn!(group_id = %group_id, error = %e, "repair attempt skipped"),
            }
        }

        Ok(entries.len())
    }
}
