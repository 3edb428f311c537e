// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Solid kernel contract and the immutable [`Solid`] wrapper.
//!
//! The host owns the actual boolean machinery. This crate only needs a
//! volume, a union, an intersection and (optionally) bounds to drive
//! aggregation and matching.

use crate::bounds::Aabb;
use crate::Result;
use bimsync_core::ElementId;
use rustc_hash::FxHashMap;
use std::fmt;
use std::sync::Arc;

/// Boolean solid operations provided by the host environment.
pub trait SolidKernel {
    /// Host representation of one solid.
    type Shape;

    /// Volume of `shape`. Kernels may return garbage for broken solids;
    /// callers clamp anything non-finite or negative to zero.
    fn volume(&self, shape: &Self::Shape) -> f64;

    fn union(&self, a: &Self::Shape, b: &Self::Shape) -> Result<Self::Shape>;

    fn intersect(&self, a: &Self::Shape, b: &Self::Shape) -> Result<Self::Shape>;

    /// Volume of `a ∩ b`. Override when the host can report the volume
    /// without materialising the intersection solid.
    fn intersection_volume(&self, a: &Self::Shape, b: &Self::Shape) -> Result<f64> {
        self.intersect(a, b).map(|s| self.volume(&s))
    }

    /// Axis-aligned bounds, when cheaply available. Used for broad-phase
    /// pruning only.
    fn bounds(&self, _shape: &Self::Shape) -> Option<Aabb> {
        None
    }
}

#[inline]
pub(crate) fn sanitize_volume(volume: f64) -> f64 {
    if volume.is_finite() && volume > 0.0 {
        volume
    } else {
        0.0
    }
}

/// An immutable aggregate volume.
///
/// Built once per element per run and never edited afterwards; a different
/// shape means a different `Solid`. Cloning shares the underlying shape.
pub struct Solid<S> {
    shape: Arc<S>,
    volume: f64,
}

impl<S> Solid<S> {
    /// Wrap a kernel shape, caching its (non-negative) volume.
    pub fn new<K: SolidKernel<Shape = S> + ?Sized>(kernel: &K, shape: S) -> Self {
        let volume = sanitize_volume(kernel.volume(&shape));
        Self {
            shape: Arc::new(shape),
            volume,
        }
    }

    #[inline]
    pub fn volume(&self) -> f64 {
        self.volume
    }

    #[inline]
    pub fn shape(&self) -> &S {
        &self.shape
    }
}

impl<S> Clone for Solid<S> {
    fn clone(&self) -> Self {
        Self {
            shape: Arc::clone(&self.shape),
            volume: self.volume,
        }
    }
}

impl<S> fmt::Debug for Solid<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Solid").field("volume", &self.volume).finish()
    }
}

/// Raw geometry the host reports for one element.
///
/// Container instances keep their real solids one level down; the aggregator
/// flattens exactly that one level.
#[derive(Debug, Clone)]
pub enum RawGeometry<S> {
    Solid(S),
    Instance(Vec<S>),
}

/// Host access to per-element raw geometry.
pub trait GeometrySource<S> {
    fn raw_geometry(&self, element: ElementId) -> Vec<RawGeometry<S>>;
}

/// In-memory geometry source keyed by element id.
#[derive(Debug, Clone)]
pub struct MemoryGeometry<S> {
    fragments: FxHashMap<ElementId, Vec<RawGeometry<S>>>,
}

impl<S> MemoryGeometry<S> {
    pub fn new() -> Self {
        Self {
            fragments: FxHashMap::default(),
        }
    }

    /// Add a free-standing solid fragment to `element`.
    pub fn add_solid(&mut self, element: ElementId, shape: S) -> &mut Self {
        self.fragments
            .entry(element)
            .or_default()
            .push(RawGeometry::Solid(shape));
        self
    }

    /// Add a nested instance whose solids belong to `element`.
    pub fn add_instance(&mut self, element: ElementId, shapes: Vec<S>) -> &mut Self {
        self.fragments
            .entry(element)
            .or_default()
            .push(RawGeometry::Instance(shapes));
        self
    }

    pub fn element_count(&self) -> usize {
        self.fragments.len()
    }
}

impl<S> Default for MemoryGeometry<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Clone> GeometrySource<S> for MemoryGeometry<S> {
    fn raw_geometry(&self, element: ElementId) -> Vec<RawGeometry<S>> {
        self.fragments.get(&element).cloned().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scripted::ScriptedKernel;

    #[test]
    fn test_solid_volume_is_never_negative() {
        let kernel = ScriptedKernel::new();
        assert_eq!(Solid::new(&kernel, ScriptedKernel::shape(1, -4.0)).volume(), 0.0);
        assert_eq!(Solid::new(&kernel, ScriptedKernel::shape(2, f64::NAN)).volume(), 0.0);
        assert_eq!(Solid::new(&kernel, ScriptedKernel::shape(3, 2.5)).volume(), 2.5);
    }

    #[test]
    fn test_solid_clone_shares_shape() {
        let kernel = ScriptedKernel::new();
        let a = Solid::new(&kernel, ScriptedKernel::shape(1, 1.0));
        let b = a.clone();
        assert!(std::ptr::eq(a.shape(), b.shape()));
    }

    #[test]
    fn test_memory_geometry() {
        let mut geometry = MemoryGeometry::new();
        geometry
            .add_solid(ElementId(1), 1u8)
            .add_instance(ElementId(1), vec![2, 3]);
        assert_eq!(geometry.raw_geometry(ElementId(1)).len(), 2);
        assert!(geometry.raw_geometry(ElementId(2)).is_empty());
        assert_eq!(geometry.element_count(), 1);
    }
}
