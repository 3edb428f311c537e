// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Host document contract
//!
//! The engine never talks to a CAD application directly. It sees a host
//! document through two traits:
//!
//! - [`ElementSource`]: read-only access (display names, derived types,
//!   attribute lookup). Linked/reference models only need this.
//! - [`Document`]: adds transactions, transaction groups and raw writes.
//!
//! Attribute resolution across instance and type level lives in exactly one
//! place, [`resolve_attribute`].

use crate::attribute::{Attribute, AttributeHandle, AttributeScope, AttributeValue};
use crate::element::ElementId;
use crate::error::{Error, Result};

/// Read-only view of a host document.
pub trait ElementSource {
    /// Whether the element exists in this document.
    fn contains(&self, element: ElementId) -> bool;

    /// Family/type display name used for shape heuristics.
    fn type_name(&self, element: ElementId) -> Option<String>;

    /// The element's derived type, if it has one.
    fn element_type(&self, element: ElementId) -> Option<ElementId>;

    /// Look up an attribute stored directly on `element` (no type fallback).
    fn lookup(&self, element: ElementId, name: &str) -> Option<Attribute>;
}

/// View any element source as a trait object.
pub trait AsElementSource {
    fn as_source(&self) -> &dyn ElementSource;
}

impl<T: ElementSource> AsElementSource for T {
    fn as_source(&self) -> &dyn ElementSource {
        self
    }
}

/// Writable host document with transaction scopes.
///
/// Transactions do not nest. Transaction groups may wrap any number of
/// transactions and can be assimilated or rolled back as a whole.
pub trait Document: ElementSource + AsElementSource {
    fn begin_transaction(&mut self, name: &str) -> Result<()>;

    /// Commit the active transaction. On failure the transaction stays open
    /// and the caller is expected to roll it back.
    fn commit_transaction(&mut self) -> Result<()>;

    fn rollback_transaction(&mut self);

    fn begin_group(&mut self, name: &str) -> Result<()>;

    fn assimilate_group(&mut self) -> Result<()>;

    fn rollback_group(&mut self);

    /// Write a value into the slot `name` owned by `owner`. Requires an
    /// active transaction.
    fn write_attribute(&mut self, owner: ElementId, name: &str, value: AttributeValue)
        -> Result<()>;
}

/// Two-level lookup: the element's own attribute first, then its type's.
pub fn resolve_attribute<S: ElementSource + ?Sized>(
    source: &S,
    element: ElementId,
    name: &str,
) -> Option<(AttributeScope, Attribute)> {
    resolve_attribute_with(source, element, name, |e| source.element_type(e))
}

/// [`resolve_attribute`] with the derived type supplied by `element_type`.
///
/// `element_type` is only called when the instance has no slot `name`.
/// Callers that cache derived types pass their cache here.
pub fn resolve_attribute_with<S, F>(
    source: &S,
    element: ElementId,
    name: &str,
    element_type: F,
) -> Option<(AttributeScope, Attribute)>
where
    S: ElementSource + ?Sized,
    F: FnOnce(ElementId) -> Option<ElementId>,
{
    if let Some(attr) = source.lookup(element, name) {
        return Some((AttributeScope::Instance, attr));
    }
    let type_id = element_type(element)?;
    source
        .lookup(type_id, name)
        .map(|attr| (AttributeScope::Type(type_id), attr))
}

/// Current value of an attribute using the two-level lookup.
pub fn lookup_value<S: ElementSource + ?Sized>(
    source: &S,
    element: ElementId,
    name: &str,
) -> Option<AttributeValue> {
    resolve_attribute(source, element, name).map(|(_, attr)| attr.value)
}

/// First numeric value among `names`, in order, using the two-level lookup.
pub fn lookup_number<S: ElementSource + ?Sized>(
    source: &S,
    element: ElementId,
    names: &[impl AsRef<str>],
) -> Option<f64> {
    names
        .iter()
        .find_map(|name| lookup_value(source, element, name.as_ref()).and_then(|v| v.as_f64()))
}

/// Resolve a write handle for `name` on `element`.
///
/// Fails with `AttributeNotFound` when neither the instance nor its type has
/// the slot. Read-only and storage checks are left to the caller, which
/// knows whether it can coerce.
pub fn resolve_handle<S: ElementSource + ?Sized>(
    source: &S,
    element: ElementId,
    name: &str,
) -> Result<AttributeHandle> {
    resolve_handle_with(source, element, name, |e| source.element_type(e))
}

/// [`resolve_handle`] with the derived type supplied by `element_type`.
pub fn resolve_handle_with<S, F>(
    source: &S,
    element: ElementId,
    name: &str,
    element_type: F,
) -> Result<AttributeHandle>
where
    S: ElementSource + ?Sized,
    F: FnOnce(ElementId) -> Option<ElementId>,
{
    if !source.contains(element) {
        return Err(Error::ElementNotFound(element));
    }
    let (scope, attr) = resolve_attribute_with(source, element, name, element_type)
        .ok_or_else(|| Error::AttributeNotFound {
            element,
            name: name.to_string(),
        })?;
    let owner = match scope {
        AttributeScope::Instance => element,
        AttributeScope::Type(type_id) => type_id,
    };
    Ok(AttributeHandle {
        element,
        owner,
        scope,
        name: attr.name,
        storage: attr.storage,
        read_only: attr.read_only,
    })
}

/// Transaction scope that rolls back on drop unless committed.
pub struct Transaction<'a, D: Document + ?Sized> {
    doc: &'a mut D,
    name: String,
    finished: bool,
}

impl<'a, D: Document + ?Sized> Transaction<'a, D> {
    pub fn start(doc: &'a mut D, name: &str) -> Result<Self> {
        doc.begin_transaction(name)?;
        Ok(Self {
            doc,
            name: name.to_string(),
            finished: false,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn document(&mut self) -> &mut D {
        &mut *self.doc
    }

    /// Commit the scope. A refused commit is rolled back before the error is
    /// returned, so the document never keeps a half-open transaction.
    pub fn commit(mut self) -> Result<()> {
        self.finished = true;
        match self.doc.commit_transaction() {
            Ok(()) => Ok(()),
            Err(err) => {
                self.doc.rollback_transaction();
                Err(match err {
                    Error::TransactionFailure { .. } => err,
                    other => Error::transaction(&self.name, other.to_string()),
                })
            }
        }
    }

    pub fn rollback(mut self) {
        self.finished = true;
        self.doc.rollback_transaction();
    }
}

impl<D: Document + ?Sized> Drop for Transaction<'_, D> {
    fn drop(&mut self) {
        if !self.finished {
            self.doc.rollback_transaction();
        }
    }
}

/// Transaction group scope that rolls back on drop unless assimilated.
pub struct TransactionGroup<'a, D: Document + ?Sized> {
    doc: &'a mut D,
    name: String,
    finished: bool,
}

impl<'a, D: Document + ?Sized> TransactionGroup<'a, D> {
    pub fn start(doc: &'a mut D, name: &str) -> Result<Self> {
        doc.begin_group(name)?;
        Ok(Self {
            doc,
            name: name.to_string(),
            finished: false,
        })
    }

    pub fn document(&mut self) -> &mut D {
        &mut *self.doc
    }

    pub fn assimilate(mut self) -> Result<()> {
        self.finished = true;
        match self.doc.assimilate_group() {
            Ok(()) => Ok(()),
            Err(err) => {
                self.doc.rollback_group();
                Err(match err {
                    Error::TransactionFailure { .. } => err,
                    other => Error::transaction(&self.name, other.to_string()),
                })
            }
        }
    }

    pub fn rollback(mut self) {
        self.finished = true;
        self.doc.rollback_group();
    }
}

impl<D: Document + ?Sized> Drop for TransactionGroup<'_, D> {
    fn drop(&mut self) {
        if !self.finished {
            self.doc.rollback_group();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::StorageKind;
    use crate::memory::MemoryDocument;

    fn doc() -> MemoryDocument {
        let mut doc = MemoryDocument::new();
        doc.add_type(ElementId(10), "Rect Opening");
        doc.add_element(ElementId(1), Some(ElementId(10)));
        doc.set_attribute(ElementId(1), Attribute::double("Width", 1.0));
        doc.set_attribute(ElementId(10), Attribute::double("Width", 2.0));
        doc.set_attribute(ElementId(10), Attribute::double("Height", 3.0));
        doc
    }

    #[test]
    fn test_instance_shadows_type() {
        let doc = doc();
        let (scope, attr) = resolve_attribute(&doc, ElementId(1), "Width").unwrap();
        assert_eq!(scope, AttributeScope::Instance);
        assert_eq!(attr.value, AttributeValue::Double(1.0));
    }

    #[test]
    fn test_type_fallback() {
        let doc = doc();
        let handle = resolve_handle(&doc, ElementId(1), "Height").unwrap();
        assert_eq!(handle.scope, AttributeScope::Type(ElementId(10)));
        assert_eq!(handle.owner, ElementId(10));
        assert_eq!(handle.storage, StorageKind::Double);
    }

    #[test]
    fn test_missing_attribute() {
        let doc = doc();
        let err = resolve_handle(&doc, ElementId(1), "Depth").unwrap_err();
        assert!(matches!(err, Error::AttributeNotFound { .. }));
        let err = resolve_handle(&doc, ElementId(99), "Width").unwrap_err();
        assert_eq!(err, Error::ElementNotFound(ElementId(99)));
    }

    #[test]
    fn test_type_hook_drives_fallback() {
        let doc = doc();
        let mut calls = 0;
        let handle = resolve_handle_with(&doc, ElementId(1), "Height", |e| {
            calls += 1;
            doc.element_type(e)
        })
        .unwrap();
        assert_eq!(handle.owner, ElementId(10));
        assert_eq!(calls, 1);

        // Instance hit never asks for the type
        let handle = resolve_handle_with(&doc, ElementId(1), "Width", |_| -> Option<ElementId> {
            panic!("type lookup on an instance hit")
        })
        .unwrap();
        assert_eq!(handle.scope, AttributeScope::Instance);

        let err = resolve_handle_with(&doc, ElementId(1), "Height", |_| None).unwrap_err();
        assert!(matches!(err, Error::AttributeNotFound { .. }));
    }

    #[test]
    fn test_lookup_number_order() {
        let doc = doc();
        assert_eq!(lookup_number(&doc, ElementId(1), &["Depth", "Height", "Width"]), Some(3.0));
        assert_eq!(lookup_number(&doc, ElementId(1), &["Depth"]), None);
    }

    #[test]
    fn test_transaction_drop_rolls_back() {
        let mut doc = doc();
        {
            let mut tx = Transaction::start(&mut doc, "edit").unwrap();
            tx.document()
                .write_attribute(ElementId(1), "Width", AttributeValue::Double(5.0))
                .unwrap();
        }
        assert_eq!(lookup_value(&doc, ElementId(1), "Width"), Some(AttributeValue::Double(1.0)));
        assert_eq!(doc.rollbacks(), 1);
    }

    #[test]
    fn test_failed_commit_rolls_back() {
        let mut doc = doc();
        doc.fail_commits(true);
        let mut tx = Transaction::start(&mut doc, "edit").unwrap();
        tx.document()
            .write_attribute(ElementId(1), "Width", AttributeValue::Double(5.0))
            .unwrap();
        let err = tx.commit().unwrap_err();
        assert!(matches!(err, Error::TransactionFailure { .. }));
        assert_eq!(lookup_value(&doc, ElementId(1), "Width"), Some(AttributeValue::Double(1.0)));
    }

    #[test]
    fn test_group_rollback_undoes_committed_transactions() {
        let mut doc = doc();
        {
            let mut group = TransactionGroup::start(&mut doc, "run").unwrap();
            let tx = Transaction::start(group.document(), "edit").unwrap();
            drop(tx);
            let mut tx = Transaction::start(group.document(), "edit").unwrap();
            tx.document()
                .write_attribute(ElementId(1), "Width", AttributeValue::Double(9.0))
                .unwrap();
            tx.commit().unwrap();
            group.rollback();
        }
        assert_eq!(lookup_value(&doc, ElementId(1), "Width"), Some(AttributeValue::Double(1.0)));
    }
}
