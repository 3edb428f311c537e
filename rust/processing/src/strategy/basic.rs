// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Immediate writes, one transaction each.

use super::{check_writable, coerce_value, unchanged, write_in_transaction, ParameterStrategy, StrategyKind};
use bimsync_core::{resolve_handle, AttributeValue, Document, ElementRef, Result};

/// Looks every attribute up afresh and commits each write on its own.
#[derive(Debug, Clone)]
pub struct BasicStrategy {
    transaction_name: String,
}

impl BasicStrategy {
    pub fn new() -> Self {
        Self {
            transaction_name: "Set parameter".into(),
        }
    }

    pub fn with_transaction_name(mut self, name: impl Into<String>) -> Self {
        self.transaction_name = name.into();
        self
    }
}

impl Default for BasicStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl ParameterStrategy for BasicStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Basic
    }

    fn set(
        &mut self,
        doc: &mut dyn Document,
        element: &ElementRef,
        name: &str,
        value: AttributeValue,
    ) -> Result<bool> {
        let handle = resolve_handle(&*doc, element.id, name)?;
        check_writable(&handle)?;
        let value = coerce_value(&handle, value)?;
        if unchanged(&*doc, &handle, &value) {
            return Ok(false);
        }
        write_in_transaction(doc, &self.transaction_name, &handle, value)?;
        tracing::debug!(element = %element.id, attribute = name, "Parameter written");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bimsync_core::{Attribute, ElementId, Error, MemoryDocument, StorageKind};

    fn doc() -> MemoryDocument {
        let mut doc = MemoryDocument::new();
        doc.add_type(ElementId(10), "Opening");
        doc.add_element(ElementId(1), Some(ElementId(10)));
        doc.set_attribute(ElementId(1), Attribute::text("Mark", "A"));
        doc.set_attribute(ElementId(1), Attribute::double("Offset", 1.0));
        doc.set_attribute(ElementId(1), Attribute::text("Id", "x").read_only());
        doc.set_attribute(ElementId(1), Attribute::new("Host", StorageKind::ElementId, AttributeValue::Empty));
        doc.set_attribute(ElementId(10), Attribute::text("Type Mark", "T1"));
        doc
    }

    fn target() -> ElementRef {
        ElementRef::new(1, "Openings")
    }

    #[test]
    fn test_write_commits_immediately() {
        let mut doc = doc();
        let mut strategy = BasicStrategy::new();
        assert!(strategy.set(&mut doc, &target(), "Mark", "B".into()).unwrap());
        assert_eq!(doc.value(ElementId(1), "Mark"), Some(&AttributeValue::text("B")));
        assert_eq!(doc.commits(), 1);
        assert!(!doc.in_transaction());
    }

    #[test]
    fn test_type_level_slot_is_written_on_the_type() {
        let mut doc = doc();
        let mut strategy = BasicStrategy::new();
        assert!(strategy.set(&mut doc, &target(), "Type Mark", "T2".into()).unwrap());
        assert_eq!(doc.value(ElementId(10), "Type Mark"), Some(&AttributeValue::text("T2")));
    }

    #[test]
    fn test_equal_value_is_not_written() {
        let mut doc = doc();
        let mut strategy = BasicStrategy::new();
        assert!(!strategy.set(&mut doc, &target(), "Offset", 1i64.into()).unwrap());
        assert_eq!(doc.commits(), 0);
    }

    #[test]
    fn test_typed_errors() {
        let mut doc = doc();
        let mut strategy = BasicStrategy::new();
        assert!(matches!(
            strategy.set(&mut doc, &target(), "Missing", "x".into()),
            Err(Error::AttributeNotFound { .. })
        ));
        assert!(matches!(
            strategy.set(&mut doc, &target(), "Id", "y".into()),
            Err(Error::AttributeReadOnly { .. })
        ));
        assert!(matches!(
            strategy.set(&mut doc, &target(), "Host", AttributeValue::ElementId(ElementId(5))),
            Err(Error::UnsupportedStorageKind { .. })
        ));
        assert!(matches!(
            strategy.set(&mut doc, &ElementRef::new(99, "Openings"), "Mark", "x".into()),
            Err(Error::ElementNotFound(_))
        ));
        assert_eq!(doc.writes(), 0);
    }

    #[test]
    fn test_failed_write_rolls_back() {
        let mut doc = doc();
        doc.fail_writes_to(ElementId(1), "Mark");
        let mut strategy = BasicStrategy::new();
        assert!(strategy.set(&mut doc, &target(), "Mark", "B".into()).is_err());
        assert_eq!(doc.value(ElementId(1), "Mark"), Some(&AttributeValue::text("A")));
        assert!(!doc.in_transaction());
        assert_eq!(doc.rollbacks(), 1);
    }
}
