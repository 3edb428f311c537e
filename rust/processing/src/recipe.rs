// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Write recipes
//!
//! A recipe turns one verdict into the attribute writes it implies for the
//! host element. The engine never decides on its own what gets written
//! where; callers register recipes on the orchestrator.

use crate::validate::RawValue;
use crate::verdict::{VerdictRecord, VerdictStatus};
use bimsync_core::{lookup_value, AttributeValue, DeclaredType, ElementSource, LengthUnit, UnitToken};

/// One write planned for a verdict's host element.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedWrite {
    pub attribute_name: String,
    pub value: RawValue,
    pub declared_type: DeclaredType,
}

impl PlannedWrite {
    pub fn new(attribute_name: impl Into<String>, value: impl Into<RawValue>, declared_type: DeclaredType) -> Self {
        Self {
            attribute_name: attribute_name.into(),
            value: value.into(),
            declared_type,
        }
    }
}

/// Read access available to recipes while planning.
pub struct RecipeContext<'a> {
    pub host: &'a dyn ElementSource,
    pub reference: &'a dyn ElementSource,
    pub host_unit: LengthUnit,
    pub reference_unit: LengthUnit,
}

pub trait WriteRecipe {
    fn plan(&self, verdict: &VerdictRecord, ctx: &RecipeContext<'_>) -> Vec<PlannedWrite>;
}

impl<F> WriteRecipe for F
where
    F: Fn(&VerdictRecord, &RecipeContext<'_>) -> Vec<PlannedWrite>,
{
    fn plan(&self, verdict: &VerdictRecord, ctx: &RecipeContext<'_>) -> Vec<PlannedWrite> {
        self(verdict, ctx)
    }
}

/// Write the verdict status (and optionally its note) into text attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusNoteRecipe {
    pub status_attribute: String,
    pub note_attribute: Option<String>,
}

impl StatusNoteRecipe {
    pub fn new(status_attribute: impl Into<String>) -> Self {
        Self {
            status_attribute: status_attribute.into(),
            note_attribute: None,
        }
    }

    pub fn with_note(mut self, note_attribute: impl Into<String>) -> Self {
        self.note_attribute = Some(note_attribute.into());
        self
    }
}

impl WriteRecipe for StatusNoteRecipe {
    fn plan(&self, verdict: &VerdictRecord, _ctx: &RecipeContext<'_>) -> Vec<PlannedWrite> {
        let mut writes = vec![PlannedWrite::new(
            self.status_attribute.clone(),
            verdict.status.to_string(),
            DeclaredType::Text,
        )];
        if let Some(note) = &self.note_attribute {
            writes.push(PlannedWrite::new(note.clone(), verdict.note.clone(), DeclaredType::Text));
        }
        writes
    }
}

/// Copy an attribute from the matched reference element onto the host
/// element, e.g. a type designation.
///
/// Spatial values are tagged with the reference document's unit so the
/// validator converts them into the host unit.
#[derive(Debug, Clone, PartialEq)]
pub struct CopyAttributeRecipe {
    pub source: String,
    pub target: String,
    pub declared_type: DeclaredType,
    /// Only copy for approved verdicts
    pub approved_only: bool,
}

impl CopyAttributeRecipe {
    pub fn new(source: impl Into<String>, target: impl Into<String>, declared_type: DeclaredType) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            declared_type,
            approved_only: true,
        }
    }

    /// Copy for every matched verdict, not only approved ones.
    pub fn for_all_matches(mut self) -> Self {
        self.approved_only = false;
        self
    }

    fn raw(&self, value: AttributeValue, unit: LengthUnit) -> Option<RawValue> {
        Some(match value {
            AttributeValue::Double(v) => match self.declared_type {
                DeclaredType::Length => RawValue::Quantity { value: v, unit: UnitToken::Length(unit) },
                DeclaredType::Area => RawValue::Quantity { value: v, unit: UnitToken::Area(unit) },
                DeclaredType::Volume => RawValue::Quantity { value: v, unit: UnitToken::Volume(unit) },
                _ => RawValue::Number(v),
            },
            AttributeValue::Integer(v) => RawValue::Integer(v),
            AttributeValue::Text(s) => RawValue::Text(s),
            AttributeValue::ElementId(id) => RawValue::Integer(i64::try_from(id.value()).ok()?),
            AttributeValue::Empty => return None,
        })
    }
}

impl WriteRecipe for CopyAttributeRecipe {
    fn plan(&self, verdict: &VerdictRecord, ctx: &RecipeContext<'_>) -> Vec<PlannedWrite> {
        if verdict.status == VerdictStatus::Unmatched
            || (self.approved_only && !verdict.is_approved())
        {
            return Vec::new();
        }
        let Some(reference_id) = verdict.reference_id else {
            return Vec::new();
        };
        lookup_value(ctx.reference, reference_id, &self.source)
            .and_then(|value| self.raw(value, ctx.reference_unit))
            .map(|value| PlannedWrite {
                attribute_name: self.target.clone(),
                value,
                declared_type: self.declared_type,
            })
            .into_iter()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::ShapeClass;
    use bimsync_core::{Attribute, ElementId, MemoryDocument};
    use std::collections::BTreeMap;

    fn verdict(status: VerdictStatus) -> VerdictRecord {
        VerdictRecord {
            host_id: ElementId(1),
            reference_id: (status != VerdictStatus::Unmatched).then_some(ElementId(20)),
            shape_class_host: ShapeClass::Square,
            shape_class_ref: ShapeClass::Square,
            dims_host: BTreeMap::new(),
            dims_ref: BTreeMap::new(),
            volume: 1.0,
            status,
            note: "note".into(),
        }
    }

    fn reference() -> MemoryDocument {
        let mut doc = MemoryDocument::new();
        doc.add_type(ElementId(30), "Opening");
        doc.add_element(ElementId(20), Some(ElementId(30)));
        doc.set_attribute(ElementId(30), Attribute::text("Type Mark", "WD-01"));
        doc.set_attribute(ElementId(20), Attribute::double("Sill", 900.0));
        doc
    }

    fn plan(recipe: &dyn WriteRecipe, status: VerdictStatus) -> Vec<PlannedWrite> {
        let host = MemoryDocument::new();
        let reference = reference();
        let ctx = RecipeContext {
            host: &host,
            reference: &reference,
            host_unit: LengthUnit::Foot,
            reference_unit: LengthUnit::Millimeter,
        };
        recipe.plan(&verdict(status), &ctx)
    }

    #[test]
    fn test_status_note() {
        let recipe = StatusNoteRecipe::new("Check").with_note("Check Note");
        let writes = plan(&recipe, VerdictStatus::DimensionMismatch);
        assert_eq!(writes.len(), 2);
        assert_eq!(writes[0].value, RawValue::Text("Dimension mismatch".into()));
        assert_eq!(writes[1].attribute_name, "Check Note");
    }

    #[test]
    fn test_copy_reads_type_level_value() {
        let recipe = CopyAttributeRecipe::new("Type Mark", "Reference Mark", DeclaredType::Text);
        let writes = plan(&recipe, VerdictStatus::Approved);
        assert_eq!(writes, vec![PlannedWrite::new("Reference Mark", "WD-01", DeclaredType::Text)]);
        assert!(plan(&recipe, VerdictStatus::ShapeMismatch).is_empty());
        assert!(plan(&recipe.clone().for_all_matches(), VerdictStatus::ShapeMismatch).len() == 1);
        assert!(plan(&recipe.for_all_matches(), VerdictStatus::Unmatched).is_empty());
    }

    #[test]
    fn test_copy_tags_lengths_with_reference_unit() {
        let recipe = CopyAttributeRecipe::new("Sill", "Sill Height", DeclaredType::Length);
        let writes = plan(&recipe, VerdictStatus::Approved);
        assert_eq!(
            writes[0].value,
            RawValue::Quantity {
                value: 900.0,
                unit: UnitToken::Length(LengthUnit::Millimeter)
            }
        );
    }

    #[test]
    fn test_closure_recipe() {
        let recipe = |v: &VerdictRecord, _: &RecipeContext<'_>| {
            vec![PlannedWrite::new("Volume Check", v.volume, DeclaredType::Number)]
        };
        let writes = plan(&recipe, VerdictStatus::Approved);
        assert_eq!(writes[0].value, RawValue::Number(1.0));
    }
}
