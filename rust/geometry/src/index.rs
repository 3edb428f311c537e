// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Geometry Index Module
//!
//! Caches aggregated solids for a reference element set so that each host
//! element can be matched against them without re-aggregating the reference
//! side. Built once per run and read-only afterwards.
//!
//! Iteration order is build order, which is also the tie-break order used
//! by the match engine.

use crate::aggregate::{AggregateStats, SolidAggregator};
use crate::solid::{GeometrySource, Solid, SolidKernel};
use bimsync_core::{ElementId, ElementRef};
use rustc_hash::FxHashMap;

/// Aggregated reference solids keyed by element id, in build order
#[derive(Debug, Clone)]
pub struct GeometryIndex<S> {
    /// Successfully aggregated solids in build order
    entries: Vec<(ElementId, Solid<S>)>,
    /// Map from element id to position in `entries`
    positions: FxHashMap<ElementId, usize>,
    /// Build statistics
    statistics: IndexStatistics,
}

impl<S> GeometryIndex<S> {
    /// Create an empty index
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            positions: FxHashMap::default(),
            statistics: IndexStatistics::default(),
        }
    }

    /// Build the index for `elements`
    ///
    /// Every element is aggregated once. Elements without usable geometry
    /// are skipped and simply never show up as match candidates. Duplicate
    /// ids keep their first occurrence.
    pub fn build<K, G>(kernel: &K, source: &G, elements: &[ElementRef]) -> Self
    where
        K: SolidKernel<Shape = S> + ?Sized,
        G: GeometrySource<S> + ?Sized,
    {
        let aggregator = SolidAggregator::new(kernel);
        let mut index = Self::new();

        for element in elements {
            index.statistics.requested += 1;
            if index.positions.contains_key(&element.id) {
                index.statistics.duplicates += 1;
                continue;
            }

            let mut stats = AggregateStats::default();
            let raw = source.raw_geometry(element.id);
            match aggregator.aggregate_with_stats(raw, &mut stats) {
                Some(solid) => index.insert(element.id, solid),
                None => {
                    index.statistics.skipped += 1;
                    tracing::debug!(element = %element.id, "No usable reference geometry");
                }
            }
            index.statistics.aggregation.absorb(&stats);
        }

        tracing::debug!(
            requested = index.statistics.requested,
            indexed = index.len(),
            skipped = index.statistics.skipped,
            "Built geometry index"
        );
        index
    }

    /// Add an already aggregated solid; ignored if `id` is already present
    pub fn insert(&mut self, id: ElementId, solid: Solid<S>) {
        if self.positions.contains_key(&id) {
            return;
        }
        self.positions.insert(id, self.entries.len());
        self.entries.push((id, solid));
        self.statistics.indexed = self.entries.len();
    }

    /// Solid for `id`, or `None` if it was never indexed
    pub fn get(&self, id: ElementId) -> Option<&Solid<S>> {
        self.positions.get(&id).map(|&pos| &self.entries[pos].1)
    }

    pub fn contains(&self, id: ElementId) -> bool {
        self.positions.contains_key(&id)
    }

    /// Iterate in build order
    pub fn iter(&self) -> impl Iterator<Item = (ElementId, &Solid<S>)> {
        self.entries.iter().map(|(id, solid)| (*id, solid))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn statistics(&self) -> &IndexStatistics {
        &self.statistics
    }
}

impl<S> Default for GeometryIndex<S> {
    fn default() -> Self {
        Self::new()
    }
}

/// Statistics about one index build
#[derive(Debug, Clone, Default)]
pub struct IndexStatistics {
    /// Elements handed to `build`
    pub requested: usize,
    /// Elements with a solid in the index
    pub indexed: usize,
    /// Elements without usable geometry
    pub skipped: usize,
    /// Repeated ids ignored during build
    pub duplicates: usize,
    /// Fragment counts across all aggregations
    pub aggregation: AggregateStats,
}
