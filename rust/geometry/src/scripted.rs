// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Scripted solid kernel.
//!
//! Boolean results are declared up front instead of computed: overlaps are
//! looked up by shape key and failures are injected per pair. Hosts that
//! precompute clash volumes can feed them through this kernel, and tests use
//! it to pin exact volumes and failure points.

use crate::{Error, Result, SolidKernel};
use rustc_hash::{FxHashMap, FxHashSet};

/// Shape handled by [`ScriptedKernel`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScriptedShape {
    /// Lookup key. A union keeps the key of its left operand.
    pub key: u64,
    pub volume: f64,
}

#[inline]
fn pair(a: u64, b: u64) -> (u64, u64) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ScriptedKernel {
    overlaps: FxHashMap<(u64, u64), f64>,
    failing_unions: FxHashSet<(u64, u64)>,
    failing_intersections: FxHashSet<(u64, u64)>,
}

impl ScriptedKernel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shape(key: u64, volume: f64) -> ScriptedShape {
        ScriptedShape { key, volume }
    }

    /// Declare the intersection volume of two shape keys (symmetric).
    pub fn with_overlap(mut self, a: u64, b: u64, volume: f64) -> Self {
        self.overlaps.insert(pair(a, b), volume);
        self
    }

    /// Make the union of a running total keyed `a` with shape `b` fail.
    pub fn with_failing_union(mut self, a: u64, b: u64) -> Self {
        self.failing_unions.insert(pair(a, b));
        self
    }

    pub fn with_failing_intersection(mut self, a: u64, b: u64) -> Self {
        self.failing_intersections.insert(pair(a, b));
        self
    }
}

impl SolidKernel for ScriptedKernel {
    type Shape = ScriptedShape;

    fn volume(&self, shape: &ScriptedShape) -> f64 {
        shape.volume
    }

    /// Volumes add up: scripted fragments are treated as disjoint.
    fn union(&self, a: &ScriptedShape, b: &ScriptedShape) -> Result<ScriptedShape> {
        if self.failing_unions.contains(&pair(a.key, b.key)) {
            return Err(Error::boolean(format!("union of {} and {} refused", a.key, b.key)));
        }
        Ok(ScriptedShape {
            key: a.key,
            volume: a.volume + b.volume,
        })
    }

    fn intersect(&self, a: &ScriptedShape, b: &ScriptedShape) -> Result<ScriptedShape> {
        let volume = self.intersection_volume(a, b)?;
        Ok(ScriptedShape { key: u64::MAX, volume })
    }

    fn intersection_volume(&self, a: &ScriptedShape, b: &ScriptedShape) -> Result<f64> {
        let key = pair(a.key, b.key);
        if self.failing_intersections.contains(&key) {
            return Err(Error::boolean(format!(
                "intersection of {} and {} refused",
                a.key, b.key
            )));
        }
        Ok(self.overlaps.get(&key).copied().unwrap_or(0.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlaps_are_symmetric() {
        let kernel = ScriptedKernel::new().with_overlap(1, 2, 4.0);
        let a = ScriptedKernel::shape(1, 10.0);
        let b = ScriptedKernel::shape(2, 10.0);
        assert_eq!(kernel.intersection_volume(&a, &b), Ok(4.0));
        assert_eq!(kernel.intersection_volume(&b, &a), Ok(4.0));
        assert_eq!(kernel.intersect(&a, &b).unwrap().volume, 4.0);
    }

    #[test]
    fn test_injected_failures() {
        let kernel = ScriptedKernel::new()
            .with_failing_union(1, 2)
            .with_failing_intersection(1, 3);
        let a = ScriptedKernel::shape(1, 1.0);
        assert!(kernel.union(&a, &ScriptedKernel::shape(2, 1.0)).is_err());
        assert!(kernel.intersect(&a, &ScriptedKernel::shape(3, 1.0)).is_err());
        let u = kernel.union(&a, &ScriptedKernel::shape(4, 2.0)).unwrap();
        assert_eq!((u.key, u.volume), (1, 3.0));
    }
}
