// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Unit-normalized dimension comparison.

use crate::classify::{ShapeClass, ShapeDescriptor};
use bimsync_core::LengthUnit;

/// Slack for binary representation error on top of the tolerance, so that
/// e.g. 300.0 vs 300.01 at tolerance 0.01 still passes.
const EPSILON: f64 = 1e-9;

/// Per-field difference between two descriptors, in the canonical unit.
#[derive(Debug, Clone, PartialEq)]
pub struct DimensionDelta {
    pub field: &'static str,
    pub host: Option<f64>,
    pub reference: Option<f64>,
}

impl DimensionDelta {
    /// Absolute difference, `None` when either side is missing.
    pub fn difference(&self) -> Option<f64> {
        Some((self.host? - self.reference?).abs())
    }

    pub fn within(&self, tolerance: f64) -> bool {
        self.difference()
            .is_some_and(|d| d.is_finite() && d <= tolerance + EPSILON)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DimensionComparator {
    canonical: LengthUnit,
    tolerance: f64,
}

impl DimensionComparator {
    pub fn new(canonical: LengthUnit, tolerance: f64) -> Self {
        Self { canonical, tolerance }
    }

    pub fn canonical_unit(&self) -> LengthUnit {
        self.canonical
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Whether both descriptors have the same class and every compared
    /// field agrees within the configured tolerance.
    pub fn compare(&self, host: &ShapeDescriptor, reference: &ShapeDescriptor) -> bool {
        self.compare_with(host, reference, self.tolerance)
    }

    pub fn compare_with(
        &self,
        host: &ShapeDescriptor,
        reference: &ShapeDescriptor,
        tolerance: f64,
    ) -> bool {
        if host.shape_class != reference.shape_class || host.shape_class == ShapeClass::Unknown {
            return false;
        }
        self.differences(host, reference)
            .iter()
            .all(|delta| delta.within(tolerance))
    }

    /// Compared fields for the host's shape class with both values
    /// converted to the canonical unit.
    pub fn differences(
        &self,
        host: &ShapeDescriptor,
        reference: &ShapeDescriptor,
    ) -> Vec<DimensionDelta> {
        let host = host.in_unit(self.canonical);
        let reference = reference.in_unit(self.canonical);
        host.shape_class
            .compared_fields()
            .iter()
            .map(|&field| DimensionDelta {
                field,
                host: host.dim(field),
                reference: reference.dim(field),
            })
            .collect()
    }
}

impl Default for DimensionComparator {
    fn default() -> Self {
        Self::new(LengthUnit::Millimeter, 0.01)
    }
}
