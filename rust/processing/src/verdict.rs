// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Per-element outcome of matching and comparison.

use crate::classify::{ShapeClass, ShapeDescriptor};
use crate::compare::DimensionComparator;
use bimsync_core::ElementId;
use bimsync_geometry::MatchResult;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum VerdictStatus {
    Approved,
    ShapeMismatch,
    DimensionMismatch,
    Unmatched,
}

impl fmt::Display for VerdictStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            VerdictStatus::Approved => "Approved",
            VerdictStatus::ShapeMismatch => "Shape mismatch",
            VerdictStatus::DimensionMismatch => "Dimension mismatch",
            VerdictStatus::Unmatched => "Unmatched",
        };
        f.write_str(label)
    }
}

/// Immutable result for one host element. Dimensions are in the canonical
/// comparison unit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VerdictRecord {
    pub host_id: ElementId,
    pub reference_id: Option<ElementId>,
    pub shape_class_host: ShapeClass,
    pub shape_class_ref: ShapeClass,
    pub dims_host: BTreeMap<String, f64>,
    pub dims_ref: BTreeMap<String, f64>,
    /// Intersection volume with the matched reference, 0 when unmatched
    pub volume: f64,
    pub status: VerdictStatus,
    pub note: String,
}

impl VerdictRecord {
    /// Verdict for a host element without a reference match.
    pub fn unmatched(host_id: ElementId, host: &ShapeDescriptor, note: impl Into<String>) -> Self {
        Self {
            host_id,
            reference_id: None,
            shape_class_host: host.shape_class,
            shape_class_ref: ShapeClass::Unknown,
            dims_host: host.dims.clone(),
            dims_ref: BTreeMap::new(),
            volume: 0.0,
            status: VerdictStatus::Unmatched,
            note: note.into(),
        }
    }

    /// Decide the verdict for a matched pair.
    ///
    /// A shape class disagreement always wins over a dimension mismatch.
    pub fn judge(
        matched: &MatchResult,
        host: &ShapeDescriptor,
        reference: &ShapeDescriptor,
        comparator: &DimensionComparator,
    ) -> Self {
        let unit = comparator.canonical_unit();
        let host_c = host.in_unit(unit);
        let reference_c = reference.in_unit(unit);

        let Some(reference_id) = matched.reference_id else {
            return Self::unmatched(matched.host_id, &host_c, "no overlapping reference element");
        };

        let (status, note) = if host.shape_class != reference.shape_class {
            (
                VerdictStatus::ShapeMismatch,
                format!("shape {} vs {}", host.shape_class, reference.shape_class),
            )
        } else if comparator.compare(host, reference) {
            (
                VerdictStatus::Approved,
                format!("within {} {}", comparator.tolerance(), unit.symbol()),
            )
        } else if host.shape_class == ShapeClass::Unknown {
            (
                VerdictStatus::DimensionMismatch,
                "shape class unknown on both sides".to_string(),
            )
        } else {
            let parts: Vec<String> = comparator
                .differences(host, reference)
                .iter()
                .filter(|delta| !delta.within(comparator.tolerance()))
                .map(|delta| match (delta.host, delta.reference) {
                    (Some(h), Some(r)) => format!("{} {:.3} vs {:.3} {}", delta.field, h, r, unit.symbol()),
                    _ => format!("{} missing", delta.field),
                })
                .collect();
            (VerdictStatus::DimensionMismatch, parts.join("; "))
        };

        Self {
            host_id: matched.host_id,
            reference_id: Some(reference_id),
            shape_class_host: host.shape_class,
            shape_class_ref: reference.shape_class,
            dims_host: host_c.dims,
            dims_ref: reference_c.dims,
            volume: matched.intersection_volume,
            status,
            note,
        }
    }

    pub fn is_approved(&self) -> bool {
        self.status == VerdictStatus::Approved
    }
}

/// Verdict counts per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct VerdictSummary {
    pub approved: usize,
    pub shape_mismatch: usize,
    pub dimension_mismatch: usize,
    pub unmatched: usize,
}

impl VerdictSummary {
    pub fn from_verdicts<'a>(verdicts: impl IntoIterator<Item = &'a VerdictRecord>) -> Self {
        let mut summary = Self::default();
        for verdict in verdicts {
            match verdict.status {
                VerdictStatus::Approved => summary.approved += 1,
                VerdictStatus::ShapeMismatch => summary.shape_mismatch += 1,
                VerdictStatus::DimensionMismatch => summary.dimension_mismatch += 1,
                VerdictStatus::Unmatched => summary.unmatched += 1,
            }
        }
        summary
    }

    pub fn total(&self) -> usize {
        self.approved + self.shape_mismatch + self.dimension_mismatch + self.unmatched
    }

    pub fn matched(&self) -> usize {
        self.total() - self.unmatched
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::{HEIGHT, WIDTH};
    use bimsync_core::LengthUnit;

    fn matched(volume: f64) -> MatchResult {
        MatchResult {
            host_id: ElementId(1),
            reference_id: Some(ElementId(2)),
            intersection_volume: volume,
        }
    }

    fn rect(unit: LengthUnit, w: f64, h: f64) -> ShapeDescriptor {
        ShapeDescriptor::new(ShapeClass::Rectangular, unit)
            .with_dim(WIDTH, w)
            .with_dim(HEIGHT, h)
    }

    #[test]
    fn test_approved() {
        let mm = LengthUnit::Millimeter;
        let verdict = VerdictRecord::judge(
            &matched(12.0),
            &rect(mm, 300.0, 500.0),
            &rect(mm, 300.0, 500.005),
            &DimensionComparator::default(),
        );
        assert_eq!(verdict.status, VerdictStatus::Approved);
        assert_eq!(verdict.reference_id, Some(ElementId(2)));
        assert_eq!(verdict.volume, 12.0);
    }

    #[test]
    fn test_shape_mismatch_takes_precedence() {
        let mm = LengthUnit::Millimeter;
        let square = ShapeDescriptor::new(ShapeClass::Square, mm).with_dim(WIDTH, 100.0);
        let verdict = VerdictRecord::judge(
            &matched(1.0),
            &rect(mm, 300.0, 500.0),
            &square,
            &DimensionComparator::default(),
        );
        assert_eq!(verdict.status, VerdictStatus::ShapeMismatch);
        assert_eq!(verdict.shape_class_ref, ShapeClass::Square);
    }

    #[test]
    fn test_dimension_mismatch_note_names_the_field() {
        let verdict = VerdictRecord::judge(
            &matched(1.0),
            &rect(LengthUnit::Meter, 0.3, 0.5),
            &rect(LengthUnit::Millimeter, 300.0, 520.0),
            &DimensionComparator::default(),
        );
        assert_eq!(verdict.status, VerdictStatus::DimensionMismatch);
        assert!(verdict.note.starts_with("height"));
        assert!(!verdict.note.contains("width"));
        assert!((verdict.dims_host[WIDTH] - 300.0).abs() < 1e-9);
    }

    #[test]
    fn test_unmatched_and_summary() {
        let host = rect(LengthUnit::Millimeter, 1.0, 2.0);
        let unmatched = VerdictRecord::judge(
            &MatchResult::unmatched(ElementId(1)),
            &host,
            &ShapeDescriptor::unknown(LengthUnit::Millimeter),
            &DimensionComparator::default(),
        );
        assert_eq!(unmatched.status, VerdictStatus::Unmatched);
        assert_eq!(unmatched.shape_class_ref, ShapeClass::Unknown);
        assert!(unmatched.dims_ref.is_empty());

        let approved = VerdictRecord::judge(&matched(1.0), &host, &host, &DimensionComparator::default());
        let summary = VerdictSummary::from_verdicts([&unmatched, &approved]);
        assert_eq!(summary.approved, 1);
        assert_eq!(summary.unmatched, 1);
        assert_eq!(summary.matched(), 1);
    }

    #[test]
    fn test_serializes_for_reports() {
        let host = rect(LengthUnit::Millimeter, 1.0, 2.0);
        let verdict = VerdictRecord::unmatched(ElementId(7), &host, "no usable geometry");
        let json = serde_json::to_value(&verdict).unwrap();
        assert_eq!(json["host_id"], 7);
        assert_eq!(json["status"], "Unmatched");
        assert_eq!(json["dims_host"]["width"], 1.0);
    }
}
