// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! In-memory host document
//!
//! A snapshot-based [`Document`] used by tests and by embedders that stage
//! element data outside a CAD session. Transactions and groups keep a copy
//! of the element table and restore it on rollback. Writes and commits can
//! be made to fail on purpose to exercise rollback paths.

use crate::attribute::{Attribute, AttributeValue, StorageKind};
use crate::element::ElementId;
use crate::error::{Error, Result};
use crate::host::{Document, ElementSource};
use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;

#[derive(Debug, Clone, Default)]
struct MemoryElement {
    type_name: Option<String>,
    type_id: Option<ElementId>,
    attributes: FxHashMap<String, Attribute>,
}

type ElementTable = FxHashMap<ElementId, MemoryElement>;

/// Snapshot-backed host document.
#[derive(Debug, Default)]
pub struct MemoryDocument {
    elements: ElementTable,
    /// Active transaction name and the table as it was when it started
    transaction: Option<(String, ElementTable)>,
    /// Open groups, innermost last
    groups: SmallVec<[(String, ElementTable); 2]>,
    failing_writes: FxHashSet<(ElementId, String)>,
    fail_commits: bool,
    fail_assimilate: bool,
    commits: usize,
    rollbacks: usize,
    writes: usize,
}

impl MemoryDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a type element. Types carry the display name their instances
    /// report through [`ElementSource::type_name`].
    pub fn add_type(&mut self, id: ElementId, name: impl Into<String>) -> &mut Self {
        let entry = self.elements.entry(id).or_default();
        entry.type_name = Some(name.into());
        self
    }

    /// Add an instance element, optionally bound to a type.
    pub fn add_element(&mut self, id: ElementId, type_id: Option<ElementId>) -> &mut Self {
        let entry = self.elements.entry(id).or_default();
        entry.type_id = type_id;
        self
    }

    /// Set or replace an attribute outside any transaction (fixture setup).
    pub fn set_attribute(&mut self, id: ElementId, attribute: Attribute) -> &mut Self {
        let entry = self.elements.entry(id).or_default();
        entry.attributes.insert(attribute.name.clone(), attribute);
        self
    }

    /// Attribute stored directly on `id`.
    pub fn attribute(&self, id: ElementId, name: &str) -> Option<&Attribute> {
        self.elements.get(&id)?.attributes.get(name)
    }

    /// Current value stored directly on `id`.
    pub fn value(&self, id: ElementId, name: &str) -> Option<&AttributeValue> {
        self.attribute(id, name).map(|a| &a.value)
    }

    /// Make every write to `(id, name)` fail with a transaction failure.
    pub fn fail_writes_to(&mut self, id: ElementId, name: impl Into<String>) -> &mut Self {
        self.failing_writes.insert((id, name.into()));
        self
    }

    pub fn fail_commits(&mut self, fail: bool) -> &mut Self {
        self.fail_commits = fail;
        self
    }

    pub fn fail_assimilate(&mut self, fail: bool) -> &mut Self {
        self.fail_assimilate = fail;
        self
    }

    pub fn in_transaction(&self) -> bool {
        self.transaction.is_some()
    }

    pub fn open_groups(&self) -> usize {
        self.groups.len()
    }

    /// Number of committed transactions.
    pub fn commits(&self) -> usize {
        self.commits
    }

    /// Number of rolled back transactions and groups.
    pub fn rollbacks(&self) -> usize {
        self.rollbacks
    }

    /// Number of accepted attribute writes, including later rolled back ones.
    pub fn writes(&self) -> usize {
        self.writes
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

impl ElementSource for MemoryDocument {
    fn contains(&self, element: ElementId) -> bool {
        self.elements.contains_key(&element)
    }

    fn type_name(&self, element: ElementId) -> Option<String> {
        let entry = self.elements.get(&element)?;
        match entry.type_id.and_then(|t| self.elements.get(&t)) {
            Some(type_entry) if type_entry.type_name.is_some() => type_entry.type_name.clone(),
            _ => entry.type_name.clone(),
        }
    }

    fn element_type(&self, element: ElementId) -> Option<ElementId> {
        self.elements.get(&element)?.type_id
    }

    fn lookup(&self, element: ElementId, name: &str) -> Option<Attribute> {
        self.attribute(element, name).cloned()
    }
}

impl Document for MemoryDocument {
    fn begin_transaction(&mut self, name: &str) -> Result<()> {
        if let Some((active, _)) = &self.transaction {
            return Err(Error::transaction(
                name,
                format!("transaction '{}' is already active", active),
            ));
        }
        self.transaction = Some((name.to_string(), self.elements.clone()));
        Ok(())
    }

    fn commit_transaction(&mut self) -> Result<()> {
        let name = match &self.transaction {
            Some((name, _)) => name.clone(),
            None => return Err(Error::NoActiveTransaction),
        };
        if self.fail_commits {
            return Err(Error::transaction(name, "commit refused by host"));
        }
        self.transaction = None;
        self.commits += 1;
        Ok(())
    }

    fn rollback_transaction(&mut self) {
        if let Some((_, snapshot)) = self.transaction.take() {
            self.elements = snapshot;
            self.rollbacks += 1;
        }
    }

    fn begin_group(&mut self, name: &str) -> Result<()> {
        if self.transaction.is_some() {
            return Err(Error::transaction(name, "cannot open a group inside a transaction"));
        }
        self.groups.push((name.to_string(), self.elements.clone()));
        Ok(())
    }

    fn assimilate_group(&mut self) -> Result<()> {
        let name = match self.groups.last() {
            Some((name, _)) => name.clone(),
            None => return Err(Error::NoActiveTransaction),
        };
        if self.transaction.is_some() {
            return Err(Error::transaction(name, "a transaction is still open"));
        }
        if self.fail_assimilate {
            return Err(Error::transaction(name, "group assimilation refused by host"));
        }
        self.groups.pop();
        Ok(())
    }

    fn rollback_group(&mut self) {
        self.rollback_transaction();
        if let Some((_, snapshot)) = self.groups.pop() {
            self.elements = snapshot;
            self.rollbacks += 1;
        }
    }

    fn write_attribute(
        &mut self,
        owner: ElementId,
        name: &str,
        value: AttributeValue,
    ) -> Result<()> {
        let tx_name = match &self.transaction {
            Some((tx_name, _)) => tx_name.clone(),
            None => return Err(Error::NoActiveTransaction),
        };
        if self.failing_writes.contains(&(owner, name.to_string())) {
            return Err(Error::transaction(
                tx_name,
                format!("host rejected write to '{}' on {}", name, owner),
            ));
        }

        let element = self
            .elements
            .get_mut(&owner)
            .ok_or(Error::ElementNotFound(owner))?;
        let attribute = element
            .attributes
            .get_mut(name)
            .ok_or_else(|| Error::AttributeNotFound {
                element: owner,
                name: name.to_string(),
            })?;

        if attribute.read_only {
            return Err(Error::AttributeReadOnly {
                element: owner,
                name: name.to_string(),
            });
        }
        let kind = value.natural_kind();
        if kind != attribute.storage && kind != StorageKind::None {
            return Err(Error::TypeMismatch {
                name: name.to_string(),
                kind: attribute.storage,
                detail: format!("host received a {:?} value", kind),
            });
        }

        attribute.value = value;
        self.writes += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> MemoryDocument {
        let mut doc = MemoryDocument::new();
        doc.add_type(ElementId(100), "Round Duct Opening")
            .add_element(ElementId(1), Some(ElementId(100)))
            .set_attribute(ElementId(1), Attribute::text("Mark", "A"))
            .set_attribute(ElementId(1), Attribute::integer("Count", 1).read_only());
        doc
    }

    #[test]
    fn test_type_name_comes_from_type() {
        let doc = sample();
        assert_eq!(doc.type_name(ElementId(1)).as_deref(), Some("Round Duct Opening"));
        assert_eq!(doc.type_name(ElementId(100)).as_deref(), Some("Round Duct Opening"));
        assert_eq!(doc.type_name(ElementId(5)), None);
    }

    #[test]
    fn test_write_requires_transaction() {
        let mut doc = sample();
        let err = doc
            .write_attribute(ElementId(1), "Mark", AttributeValue::text("B"))
            .unwrap_err();
        assert_eq!(err, Error::NoActiveTransaction);
    }

    #[test]
    fn test_commit_keeps_write() {
        let mut doc = sample();
        doc.begin_transaction("t").unwrap();
        doc.write_attribute(ElementId(1), "Mark", AttributeValue::text("B")).unwrap();
        doc.commit_transaction().unwrap();
        assert_eq!(doc.value(ElementId(1), "Mark"), Some(&AttributeValue::text("B")));
        assert_eq!(doc.commits(), 1);
        assert_eq!(doc.writes(), 1);
    }

    #[test]
    fn test_read_only_and_type_checks() {
        let mut doc = sample();
        doc.begin_transaction("t").unwrap();
        let err = doc
            .write_attribute(ElementId(1), "Count", AttributeValue::Integer(2))
            .unwrap_err();
        assert!(matches!(err, Error::AttributeReadOnly { .. }));
        let err = doc
            .write_attribute(ElementId(1), "Mark", AttributeValue::Double(2.0))
            .unwrap_err();
        assert!(matches!(err, Error::TypeMismatch { .. }));
        doc.rollback_transaction();
    }

    #[test]
    fn test_nested_transaction_rejected() {
        let mut doc = sample();
        doc.begin_transaction("outer").unwrap();
        assert!(doc.begin_transaction("inner").is_err());
        assert!(doc.begin_group("group").is_err());
    }

    #[test]
    fn test_injected_write_failure() {
        let mut doc = sample();
        doc.fail_writes_to(ElementId(1), "Mark");
        doc.begin_transaction("t").unwrap();
        let err = doc
            .write_attribute(ElementId(1), "Mark", AttributeValue::text("B"))
            .unwrap_err();
        assert!(matches!(err, Error::TransactionFailure { .. }));
    }

    #[test]
    fn test_group_assimilate_failure_keeps_group_open() {
        let mut doc = sample();
        doc.fail_assimilate(true);
        doc.begin_group("g").unwrap();
        assert!(doc.assimilate_group().is_err());
        assert_eq!(doc.open_groups(), 1);
        doc.rollback_group();
        assert_eq!(doc.open_groups(), 0);
    }
}
