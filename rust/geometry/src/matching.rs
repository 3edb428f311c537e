// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Overlap-based best-match selection.
//!
//! For one host solid, every indexed reference solid is intersected and the
//! largest positive intersection volume wins. Equal volumes keep the
//! candidate seen first in index order. A failed intersection is a zero
//! overlap for that pair only.

use crate::index::GeometryIndex;
use crate::solid::{sanitize_volume, Solid, SolidKernel};
use bimsync_core::ElementId;

/// One scanned reference with a positive overlap.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchCandidate {
    pub reference_id: ElementId,
    pub volume: f64,
}

/// Outcome of matching one host element.
///
/// `reference_id` is `None` exactly when no candidate had positive overlap,
/// in which case `intersection_volume` is `0.0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchResult {
    pub host_id: ElementId,
    pub reference_id: Option<ElementId>,
    pub intersection_volume: f64,
}

impl MatchResult {
    pub fn unmatched(host_id: ElementId) -> Self {
        Self {
            host_id,
            reference_id: None,
            intersection_volume: 0.0,
        }
    }

    #[inline]
    pub fn is_matched(&self) -> bool {
        self.reference_id.is_some()
    }
}

/// Counters for the matching phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatchStats {
    /// Host solids scanned
    pub hosts: usize,
    /// Boolean intersections requested from the kernel
    pub pairs_tested: usize,
    /// Pairs skipped because their bounds do not overlap
    pub pairs_pruned: usize,
    /// Intersections the kernel failed on (counted as zero overlap)
    pub intersection_failures: usize,
    pub matched: usize,
}

impl MatchStats {
    pub fn unmatched(&self) -> usize {
        self.hosts - self.matched
    }
}

pub struct MatchEngine<'k, K: SolidKernel + ?Sized> {
    kernel: &'k K,
    broad_phase: bool,
}

impl<'k, K: SolidKernel + ?Sized> MatchEngine<'k, K> {
    pub fn new(kernel: &'k K) -> Self {
        Self {
            kernel,
            broad_phase: true,
        }
    }

    /// Always run the boolean intersection, even for pairs whose bounds are
    /// disjoint.
    pub fn without_broad_phase(mut self) -> Self {
        self.broad_phase = false;
        self
    }

    /// Best reference match for `host` among all indexed solids.
    pub fn best_match(
        &self,
        host_id: ElementId,
        host: &Solid<K::Shape>,
        index: &GeometryIndex<K::Shape>,
    ) -> MatchResult {
        let mut stats = MatchStats::default();
        self.best_match_with_stats(host_id, host, index, &mut stats)
    }

    pub fn best_match_with_stats(
        &self,
        host_id: ElementId,
        host: &Solid<K::Shape>,
        index: &GeometryIndex<K::Shape>,
        stats: &mut MatchStats,
    ) -> MatchResult {
        stats.hosts += 1;
        let mut best = MatchResult::unmatched(host_id);

        for candidate in self.scan(host_id, host, index, stats) {
            // Strictly greater: ties keep the earlier candidate
            if candidate.volume > best.intersection_volume {
                best.reference_id = Some(candidate.reference_id);
                best.intersection_volume = candidate.volume;
            }
        }

        if best.is_matched() {
            stats.matched += 1;
        }
        best
    }

    /// All references overlapping `host`, in index order.
    pub fn candidates(
        &self,
        host_id: ElementId,
        host: &Solid<K::Shape>,
        index: &GeometryIndex<K::Shape>,
    ) -> Vec<MatchCandidate> {
        let mut stats = MatchStats::default();
        self.scan(host_id, host, index, &mut stats)
    }

    fn scan(
        &self,
        host_id: ElementId,
        host: &Solid<K::Shape>,
        index: &GeometryIndex<K::Shape>,
        stats: &mut MatchStats,
    ) -> Vec<MatchCandidate> {
        let host_bounds = if self.broad_phase {
            self.kernel.bounds(host.shape())
        } else {
            None
        };

        let mut candidates = Vec::new();
        for (reference_id, reference) in index.iter() {
            if let Some(hb) = &host_bounds {
                let disjoint = self
                    .kernel
                    .bounds(reference.shape())
                    .is_some_and(|rb| !hb.overlaps(&rb));
                if disjoint {
                    stats.pairs_pruned += 1;
                    continue;
                }
            }

            stats.pairs_tested += 1;
            let volume = match self
                .kernel
                .intersection_volume(host.shape(), reference.shape())
            {
                Ok(v) => sanitize_volume(v),
                Err(err) => {
                    stats.intersection_failures += 1;
                    tracing::debug!(
                        host = %host_id,
                        reference = %reference_id,
                        error = %err,
                        "Intersection failed, treating as no overlap"
                    );
                    0.0
                }
            };

            if volume > 0.0 {
                candidates.push(MatchCandidate {
                    reference_id,
                    volume,
                });
            }
        }
        candidates
    }
}
