// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Solid aggregation
//!
//! Reduces the raw fragments of one element into a single representative
//! solid. Unions are best-effort: an operand whose union step fails is
//! dropped from the running total and aggregation carries on. Models with
//! small gaps and overlaps must still produce something to match against.

use crate::solid::{sanitize_volume, RawGeometry, Solid, SolidKernel};

/// Bookkeeping for one aggregation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AggregateStats {
    /// Fragments seen after flattening nested instances
    pub fragments: usize,
    /// Fragments with positive volume
    pub usable: usize,
    /// Fragments folded into the result
    pub merged: usize,
    /// Fragments dropped because their union step failed
    pub union_failures: usize,
}

impl AggregateStats {
    pub fn absorb(&mut self, other: &AggregateStats) {
        self.fragments += other.fragments;
        self.usable += other.usable;
        self.merged += other.merged;
        self.union_failures += other.union_failures;
    }
}

/// Folds raw fragments into one [`Solid`] with a given kernel.
pub struct SolidAggregator<'k, K: SolidKernel + ?Sized> {
    kernel: &'k K,
}

impl<'k, K: SolidKernel + ?Sized> SolidAggregator<'k, K> {
    pub fn new(kernel: &'k K) -> Self {
        Self { kernel }
    }

    /// Aggregate fragments into one solid.
    ///
    /// Returns `None` when no fragment has positive volume. That means "no
    /// usable geometry", which is different from a zero-volume solid and is
    /// never an error.
    pub fn aggregate<I>(&self, fragments: I) -> Option<Solid<K::Shape>>
    where
        I: IntoIterator<Item = RawGeometry<K::Shape>>,
    {
        let mut stats = AggregateStats::default();
        self.aggregate_with_stats(fragments, &mut stats)
    }

    pub fn aggregate_with_stats<I>(
        &self,
        fragments: I,
        stats: &mut AggregateStats,
    ) -> Option<Solid<K::Shape>>
    where
        I: IntoIterator<Item = RawGeometry<K::Shape>>,
    {
        // One level of nesting: instances contribute their solids directly
        let flat = fragments.into_iter().flat_map(|raw| match raw {
            RawGeometry::Solid(shape) => vec![shape],
            RawGeometry::Instance(shapes) => shapes,
        });

        let mut running: Option<K::Shape> = None;
        for shape in flat {
            stats.fragments += 1;
            if sanitize_volume(self.kernel.volume(&shape)) <= 0.0 {
                continue;
            }
            stats.usable += 1;

            running = match running {
                None => {
                    stats.merged += 1;
                    Some(shape)
                }
                Some(total) => match self.kernel.union(&total, &shape) {
                    Ok(merged) => {
                        stats.merged += 1;
                        Some(merged)
                    }
                    Err(err) => {
                        stats.union_failures += 1;
                        tracing::debug!(error = %err, "Union step failed, dropping fragment");
                        Some(total)
                    }
                },
            };
        }

        running.map(|shape| Solid::new(self.kernel, shape))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::box_kernel::{BoxKernel, BoxSolid};
    use crate::scripted::ScriptedKernel;
    use approx::assert_relative_eq;

    fn solid(key: u64, volume: f64) -> RawGeometry<crate::scripted::ScriptedShape> {
        RawGeometry::Solid(ScriptedKernel::shape(key, volume))
    }

    #[test]
    fn test_no_fragments_is_none() {
        let kernel = ScriptedKernel::new();
        let aggregator = SolidAggregator::new(&kernel);
        assert!(aggregator.aggregate(Vec::new()).is_none());
    }

    #[test]
    fn test_zero_volume_fragments_are_filtered() {
        let kernel = ScriptedKernel::new();
        let aggregator = SolidAggregator::new(&kernel);
        assert!(aggregator.aggregate(vec![solid(1, 0.0), solid(2, -1.0)]).is_none());
    }

    #[test]
    fn test_single_fragment_is_returned_unchanged() {
        let kernel = ScriptedKernel::new();
        let aggregator = SolidAggregator::new(&kernel);
        let result = aggregator.aggregate(vec![solid(1, 0.0), solid(7, 3.5)]).unwrap();
        assert_eq!(result.shape(), &ScriptedKernel::shape(7, 3.5));
    }

    #[test]
    fn test_failed_union_drops_only_that_operand() {
        let kernel = ScriptedKernel::new().with_failing_union(1, 2);
        let aggregator = SolidAggregator::new(&kernel);
        let mut stats = AggregateStats::default();
        let result = aggregator
            .aggregate_with_stats(
                vec![solid(1, 1.0), solid(2, 2.0), solid(3, 4.0), solid(4, 8.0)],
                &mut stats,
            )
            .unwrap();

        // 2.0 could not be folded in; everything else could
        assert_relative_eq!(result.volume(), 13.0);
        assert_eq!(stats.union_failures, 1);
        assert_eq!(stats.merged, 3);
        assert_eq!(stats.usable, 4);
    }

    #[test]
    fn test_nested_instance_is_flattened() {
        let kernel = ScriptedKernel::new();
        let aggregator = SolidAggregator::new(&kernel);
        let fragments = vec![
            RawGeometry::Instance(vec![
                ScriptedKernel::shape(1, 1.5),
                ScriptedKernel::shape(2, 2.5),
            ]),
            solid(3, 1.0),
        ];
        let mut stats = AggregateStats::default();
        let result = aggregator.aggregate_with_stats(fragments, &mut stats).unwrap();
        assert_relative_eq!(result.volume(), 5.0);
        assert_eq!(stats.fragments, 3);
    }

    #[test]
    fn test_box_fragments_union_exactly() {
        let kernel = BoxKernel::new();
        let aggregator = SolidAggregator::new(&kernel);
        let result = aggregator
            .aggregate(vec![
                RawGeometry::Solid(BoxSolid::cuboid([0.0, 0.0, 0.0], [2.0, 1.0, 1.0])),
                RawGeometry::Solid(BoxSolid::cuboid([1.0, 0.0, 0.0], [3.0, 1.0, 1.0])),
            ])
            .unwrap();
        assert_relative_eq!(result.volume(), 3.0, epsilon = 1e-12);
    }
}
