// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Immediate writes with cached lookups and unit coercion.

use super::{check_writable, coerce_value, unchanged, write_in_transaction, ParameterOp, ParameterStrategy, StrategyKind};
use crate::validate::{expected_dimension, SemanticFamily};
use bimsync_core::{
    parse_quantity, resolve_handle_with, AngleUnit, AttributeHandle, AttributeValue, DeclaredType,
    Document, ElementId, ElementRef, Error, LengthUnit, Result, StorageKind,
};
use rustc_hash::FxHashMap;

/// Cache counters for one strategy instance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
    /// Text inputs converted through their unit suffix
    pub conversions: usize,
}

/// Basic-style writes that remember attribute handles per
/// `(element, name)` and derived types per element.
///
/// Handles are only valid for the document state they were resolved
/// against; call [`clear_cache`](Self::clear_cache) (or `reset`) between
/// independent runs.
#[derive(Debug, Clone)]
pub struct OptimizedStrategy {
    handles: FxHashMap<(ElementId, String), AttributeHandle>,
    types: FxHashMap<ElementId, Option<ElementId>>,
    stats: CacheStats,
    length_unit: LengthUnit,
    angle_unit: AngleUnit,
    transaction_name: String,
}

impl OptimizedStrategy {
    /// `length_unit` and `angle_unit` are the units the host stores values
    /// in; text with a unit suffix is converted into them.
    pub fn new(length_unit: LengthUnit, angle_unit: AngleUnit) -> Self {
        Self {
            handles: FxHashMap::default(),
            types: FxHashMap::default(),
            stats: CacheStats::default(),
            length_unit,
            angle_unit,
            transaction_name: "Set parameter".into(),
        }
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.stats
    }

    pub fn cached_handles(&self) -> usize {
        self.handles.len()
    }

    pub fn clear_cache(&mut self) {
        self.handles.clear();
        self.types.clear();
    }

    fn handle(&mut self, doc: &dyn Document, element: ElementId, name: &str) -> Result<AttributeHandle> {
        let key = (element, name.to_string());
        if let Some(handle) = self.handles.get(&key) {
            self.stats.hits += 1;
            return Ok(handle.clone());
        }
        self.stats.misses += 1;

        let types = &mut self.types;
        let handle = resolve_handle_with(doc, element, name, |e| {
            *types.entry(e).or_insert_with(|| doc.element_type(e))
        })?;
        self.handles.insert(key, handle.clone());
        Ok(handle)
    }

    /// Conversion of text input for numeric slots.
    ///
    /// A unit suffix must fit the declared type, or the attribute name's
    /// family when nothing is declared. Text that does not parse is passed
    /// on unchanged and left to coercion.
    fn convert(
        &mut self,
        handle: &AttributeHandle,
        value: AttributeValue,
        declared: Option<DeclaredType>,
    ) -> Result<AttributeValue> {
        let AttributeValue::Text(text) = &value else {
            return Ok(value);
        };
        let Ok(quantity) = parse_quantity(text) else {
            return Ok(value);
        };
        match (handle.storage, quantity.unit) {
            (StorageKind::Double, Some(unit)) => {
                let expected = declared
                    .and_then(expected_dimension)
                    .or_else(|| SemanticFamily::of(&handle.name).dimension());
                if let Some(expected) = expected.filter(|d| *d != unit.dimension()) {
                    return Err(Error::TypeMismatch {
                        name: handle.name.clone(),
                        kind: handle.storage,
                        detail: format!("unit '{}' does not fit a {:?} value", unit, expected),
                    });
                }
                self.stats.conversions += 1;
                Ok(AttributeValue::Double(unit.to_canonical(
                    quantity.value,
                    self.length_unit,
                    self.angle_unit,
                )))
            }
            // Integer slots get the range and integral checks of coercion
            (StorageKind::Double | StorageKind::Integer, None) => Ok(AttributeValue::Double(quantity.value)),
            _ => Ok(value),
        }
    }

    fn write(
        &mut self,
        doc: &mut dyn Document,
        element: &ElementRef,
        name: &str,
        value: AttributeValue,
        declared: Option<DeclaredType>,
    ) -> Result<bool> {
        let handle = self.handle(&*doc, element.id, name)?;
        check_writable(&handle)?;
        let value = self.convert(&handle, value, declared)?;
        let value = coerce_value(&handle, value)?;
        if unchanged(&*doc, &handle, &value) {
            return Ok(false);
        }

        match write_in_transaction(doc, &self.transaction_name, &handle, value) {
            Ok(()) => Ok(true),
            Err(err) => {
                if matches!(
                    err.root_cause(),
                    Error::ElementNotFound(_) | Error::AttributeNotFound { .. }
                ) {
                    self.evict(element.id, name);
                }
                Err(err)
            }
        }
    }

    fn evict(&mut self, element: ElementId, name: &str) {
        self.handles.remove(&(element, name.to_string()));
        self.types.remove(&element);
    }
}

impl ParameterStrategy for OptimizedStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Optimized
    }

    fn set(
        &mut self,
        doc: &mut dyn Document,
        element: &ElementRef,
        name: &str,
        value: AttributeValue,
    ) -> Result<bool> {
        self.write(doc, element, name, value, None)
    }

    fn submit(&mut self, doc: &mut dyn Document, op: ParameterOp) -> Result<bool> {
        self.write(doc, &op.target, &op.attribute_name, op.value, op.declared_type)
    }

    fn reset(&mut self) {
        self.clear_cache();
        self.stats = CacheStats::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use bimsync_core::{Attribute, MemoryDocument};

    fn doc() -> MemoryDocument {
        let mut doc = MemoryDocument::new();
        doc.add_type(ElementId(10), "Opening");
        doc.add_element(ElementId(1), Some(ElementId(10)));
        doc.set_attribute(ElementId(1), Attribute::double("Offset", 0.0));
        doc.set_attribute(ElementId(1), Attribute::double("Angle", 0.0));
        doc.set_attribute(ElementId(1), Attribute::integer("Count", 0));
        doc.set_attribute(ElementId(1), Attribute::double("Clearance", 0.0));
        doc.set_attribute(ElementId(10), Attribute::double("Width", 1.0));
        doc
    }

    fn target() -> ElementRef {
        ElementRef::new(1, "Openings")
    }

    fn strategy() -> OptimizedStrategy {
        OptimizedStrategy::new(LengthUnit::Foot, AngleUnit::Degree)
    }

    #[test]
    fn test_repeated_lookups_hit_the_cache() {
        let mut doc = doc();
        let mut strategy = strategy();
        strategy.set(&mut doc, &target(), "Offset", 1.0.into()).unwrap();
        strategy.set(&mut doc, &target(), "Offset", 2.0.into()).unwrap();
        strategy.set(&mut doc, &target(), "Width", 3.0.into()).unwrap();

        let stats = strategy.cache_stats();
        assert_eq!(stats.misses, 2);
        assert_eq!(stats.hits, 1);
        assert_eq!(doc.value(ElementId(10), "Width"), Some(&AttributeValue::Double(3.0)));
        assert_eq!(doc.commits(), 3);
    }

    #[test]
    fn test_text_with_unit_is_converted() {
        let mut doc = doc();
        let mut strategy = strategy();
        assert!(strategy.set(&mut doc, &target(), "Offset", "304.8 mm".into()).unwrap());
        let stored = doc.value(ElementId(1), "Offset").and_then(|v| v.as_f64()).unwrap();
        assert_relative_eq!(stored, 1.0, epsilon = 1e-9);
        assert_eq!(strategy.cache_stats().conversions, 1);

        strategy.set(&mut doc, &target(), "Angle", "45 deg".into()).unwrap();
        assert_eq!(doc.value(ElementId(1), "Angle"), Some(&AttributeValue::Double(45.0)));

        strategy.set(&mut doc, &target(), "Count", "3".into()).unwrap();
        assert_eq!(doc.value(ElementId(1), "Count"), Some(&AttributeValue::Integer(3)));
    }

    #[test]
    fn test_unparsable_text_is_a_type_mismatch() {
        let mut doc = doc();
        let mut strategy = strategy();
        assert!(matches!(
            strategy.set(&mut doc, &target(), "Offset", "far".into()),
            Err(Error::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_unit_of_the_wrong_dimension_is_rejected() {
        let mut doc = doc();
        let mut strategy = strategy();
        // "Offset" is a length by name
        assert!(matches!(
            strategy.set(&mut doc, &target(), "Offset", "2 m2".into()),
            Err(Error::TypeMismatch { .. })
        ));
        assert_eq!(doc.value(ElementId(1), "Offset"), Some(&AttributeValue::Double(0.0)));

        // Declared type decides when the name says nothing
        let op = ParameterOp::new(target(), "Clearance", "2 m2").with_declared_type(DeclaredType::Length);
        assert!(matches!(strategy.submit(&mut doc, op), Err(Error::TypeMismatch { .. })));
        let op = ParameterOp::new(target(), "Clearance", "2 m2").with_declared_type(DeclaredType::Area);
        assert!(strategy.submit(&mut doc, op).unwrap());
        assert_eq!(strategy.cache_stats().conversions, 1);
        assert_eq!(doc.commits(), 1);
    }

    #[test]
    fn test_out_of_range_integer_text_is_rejected() {
        let mut doc = doc();
        let mut strategy = strategy();
        assert!(matches!(
            strategy.set(&mut doc, &target(), "Count", "1e30".into()),
            Err(Error::TypeMismatch { .. })
        ));
        assert!(matches!(
            strategy.set(&mut doc, &target(), "Count", "2.5".into()),
            Err(Error::TypeMismatch { .. })
        ));
        assert_eq!(doc.value(ElementId(1), "Count"), Some(&AttributeValue::Integer(0)));
    }

    #[test]
    fn test_type_is_resolved_once_per_element() {
        let mut doc = doc();
        let mut strategy = strategy();
        strategy.set(&mut doc, &target(), "Width", 2.0.into()).unwrap();
        assert_eq!(strategy.types.get(&ElementId(1)), Some(&Some(ElementId(10))));
        strategy.set(&mut doc, &target(), "Width", 3.0.into()).unwrap();
        assert_eq!(strategy.cache_stats().hits, 1);
        assert_eq!(doc.value(ElementId(10), "Width"), Some(&AttributeValue::Double(3.0)));
    }

    #[test]
    fn test_reset_clears_cache() {
        let mut doc = doc();
        let mut strategy = strategy();
        strategy.set(&mut doc, &target(), "Offset", 1.0.into()).unwrap();
        assert_eq!(strategy.cached_handles(), 1);
        strategy.reset();
        assert_eq!(strategy.cached_handles(), 0);
        assert_eq!(strategy.cache_stats(), CacheStats::default());
    }

    #[test]
    fn test_stale_handle_is_evicted() {
        let mut strategy = strategy();
        let mut first = doc();
        strategy.set(&mut first, &target(), "Offset", 1.0.into()).unwrap();

        // Same element id in a document that lacks the slot
        let mut second = MemoryDocument::new();
        second.add_element(ElementId(1), None);
        let err = strategy.set(&mut second, &target(), "Offset", 2.0.into()).unwrap_err();
        assert!(matches!(err, Error::AttributeNotFound { .. }));
        assert_eq!(strategy.cached_handles(), 0);
    }
}
