// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Per-run state: cancellation, counters and collected warnings.
//!
//! Everything here lives for one run and is handed back in the report.
//! Nothing survives into the next run.

use bimsync_geometry::{IndexStatistics, MatchStats};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Cooperative cancellation flag shared between a run and its caller.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Counters collected over one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunStats {
    pub host_elements: usize,
    pub reference_elements: usize,
    pub indexed_references: usize,
    pub hosts_without_geometry: usize,
    pub pairs_tested: usize,
    pub pairs_pruned: usize,
    pub intersection_failures: usize,
    pub union_failures: usize,
    pub planned_writes: usize,
    pub invalid_writes: usize,
    pub submitted_writes: usize,
    pub applied_writes: usize,
    pub strategy: Option<String>,
    pub elapsed_ms: u64,
}

impl RunStats {
    pub(crate) fn absorb_index(&mut self, stats: &IndexStatistics) {
        self.reference_elements = stats.requested;
        self.indexed_references = stats.indexed;
        self.union_failures += stats.aggregation.union_failures;
    }

    pub(crate) fn absorb_matching(&mut self, stats: &MatchStats) {
        self.pairs_tested = stats.pairs_tested;
        self.pairs_pruned = stats.pairs_pruned;
        self.intersection_failures = stats.intersection_failures;
    }
}

/// Mutable state owned by the orchestrator for the duration of one run.
#[derive(Debug)]
pub struct RunContext {
    token: CancellationToken,
    started: Instant,
    pub stats: RunStats,
    pub warnings: Vec<String>,
}

impl RunContext {
    pub fn new(token: CancellationToken) -> Self {
        Self {
            token,
            started: Instant::now(),
            stats: RunStats::default(),
            warnings: Vec::new(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!("{}", message);
        self.warnings.push(message);
    }

    /// Close the run and hand back its counters and warnings.
    pub fn finish(mut self) -> (RunStats, Vec<String>) {
        self.stats.elapsed_ms = u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX);
        (self.stats, self.warnings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_is_shared_between_clones() {
        let token = CancellationToken::new();
        let ctx = RunContext::new(token.clone());
        assert!(!ctx.is_cancelled());
        token.cancel();
        assert!(ctx.is_cancelled());
    }

    #[test]
    fn test_finish_returns_warnings() {
        let mut ctx = RunContext::new(CancellationToken::new());
        ctx.warn("first");
        ctx.stats.planned_writes = 3;
        let (stats, warnings) = ctx.finish();
        assert_eq!(stats.planned_writes, 3);
        assert_eq!(warnings, vec!["first".to_string()]);
    }
}
