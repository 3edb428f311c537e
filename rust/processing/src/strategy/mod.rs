// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Parameter write strategies
//!
//! Three interchangeable policies for applying attribute writes to a host
//! document:
//!
//! - [`BasicStrategy`]: one transaction per write, fresh lookup every time
//! - [`BatchStrategy`]: queue writes, apply them in one all-or-nothing
//!   transaction
//! - [`OptimizedStrategy`]: like Basic, with cached lookups and unit
//!   coercion of text input
//!
//! All three share the same writability checks and value coercion.

mod basic;
mod batch;
mod optimized;

pub use basic::BasicStrategy;
pub use batch::BatchStrategy;
pub use optimized::{CacheStats, OptimizedStrategy};

use crate::config::SyncConfig;
use crate::validate::parse_bool_token;
use bimsync_core::{
    AttributeHandle, AttributeValue, DeclaredType, Document, ElementRef, Result, StorageKind,
    Transaction,
};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One attribute write destined for a host element.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterOp {
    pub target: ElementRef,
    pub attribute_name: String,
    pub value: AttributeValue,
    pub declared_type: Option<DeclaredType>,
}

impl ParameterOp {
    pub fn new(target: ElementRef, attribute_name: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        Self {
            target,
            attribute_name: attribute_name.into(),
            value: value.into(),
            declared_type: None,
        }
    }

    pub fn with_declared_type(mut self, declared: DeclaredType) -> Self {
        self.declared_type = Some(declared);
        self
    }
}

/// Policy for applying attribute writes.
///
/// `set` reports whether the document changed. Queueing strategies only
/// change the document in [`finish`](ParameterStrategy::finish), which
/// reports how many writes it applied.
pub trait ParameterStrategy {
    fn kind(&self) -> StrategyKind;

    fn set(
        &mut self,
        doc: &mut dyn Document,
        element: &ElementRef,
        name: &str,
        value: AttributeValue,
    ) -> Result<bool>;

    fn submit(&mut self, doc: &mut dyn Document, op: ParameterOp) -> Result<bool> {
        self.set(doc, &op.target, &op.attribute_name, op.value)
    }

    /// Flush anything still pending.
    fn finish(&mut self, _doc: &mut dyn Document) -> Result<usize> {
        Ok(0)
    }

    /// Writes accepted but not yet applied.
    fn pending(&self) -> usize {
        0
    }

    /// Drop pending writes without applying them.
    fn discard(&mut self) {}

    /// Forget all state from a previous run.
    fn reset(&mut self) {
        self.discard();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    Basic,
    Batch,
    Optimized,
}

impl StrategyKind {
    pub fn build(self, config: &SyncConfig) -> Box<dyn ParameterStrategy> {
        match self {
            StrategyKind::Basic => Box::new(BasicStrategy::new()),
            StrategyKind::Batch => Box::new(BatchStrategy::new()),
            StrategyKind::Optimized => Box::new(OptimizedStrategy::new(
                config.host_length_unit,
                config.angle_unit,
            )),
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StrategyKind::Basic => "basic",
            StrategyKind::Batch => "batch",
            StrategyKind::Optimized => "optimized",
        };
        f.write_str(name)
    }
}

impl std::str::FromStr for StrategyKind {
    type Err = crate::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "basic" => Ok(StrategyKind::Basic),
            "batch" => Ok(StrategyKind::Batch),
            "optimized" | "optimised" => Ok(StrategyKind::Optimized),
            other => Err(crate::Error::InvalidConfig(format!("unknown strategy '{}'", other))),
        }
    }
}

/// Operation count at which batching pays off.
pub const BATCH_THRESHOLD: usize = 10;
/// Operation count at which cached lookups pay off.
pub const OPTIMIZED_THRESHOLD: usize = 5;

/// Suggest a strategy for `op_count` writes. `repeats` is whether several
/// writes target the same element.
pub fn recommend_strategy(op_count: usize, repeats: bool) -> StrategyKind {
    if op_count >= BATCH_THRESHOLD {
        StrategyKind::Batch
    } else if repeats || op_count >= OPTIMIZED_THRESHOLD {
        StrategyKind::Optimized
    } else {
        StrategyKind::Basic
    }
}

pub fn recommend_for(ops: &[ParameterOp]) -> StrategyKind {
    let mut seen = FxHashSet::default();
    let repeats = ops.iter().any(|op| !seen.insert(op.target.id));
    recommend_strategy(ops.len(), repeats)
}

/// Reject slots no strategy can assign.
pub(crate) fn check_writable(handle: &AttributeHandle) -> Result<()> {
    if handle.read_only {
        return Err(bimsync_core::Error::AttributeReadOnly {
            element: handle.element,
            name: handle.name.clone(),
        });
    }
    match handle.storage {
        StorageKind::ElementId | StorageKind::None => Err(bimsync_core::Error::UnsupportedStorageKind {
            name: handle.name.clone(),
            kind: handle.storage,
        }),
        _ => Ok(()),
    }
}

/// Fit `value` to the slot's storage kind.
///
/// Double slots take integers, integer slots take integral doubles and
/// yes/no tokens, text slots take text only. `Empty` clears any slot.
pub fn coerce_value(handle: &AttributeHandle, value: AttributeValue) -> Result<AttributeValue> {
    let mismatch = |detail: String| bimsync_core::Error::TypeMismatch {
        name: handle.name.clone(),
        kind: handle.storage,
        detail,
    };
    match (handle.storage, value) {
        (_, AttributeValue::Empty) => Ok(AttributeValue::Empty),
        (StorageKind::Double, AttributeValue::Double(v)) if v.is_finite() => Ok(AttributeValue::Double(v)),
        (StorageKind::Double, AttributeValue::Integer(v)) => Ok(AttributeValue::Double(v as f64)),
        (StorageKind::Integer, AttributeValue::Integer(v)) => Ok(AttributeValue::Integer(v)),
        (StorageKind::Integer, AttributeValue::Double(v))
            if v.is_finite() && v.fract() == 0.0 && v.abs() < i64::MAX as f64 =>
        {
            Ok(AttributeValue::Integer(v as i64))
        }
        (StorageKind::Integer, AttributeValue::Text(s)) => parse_bool_token(&s)
            .map(|b| AttributeValue::Integer(i64::from(b)))
            .ok_or_else(|| mismatch(format!("'{}' is not a yes/no token", s))),
        (StorageKind::String, AttributeValue::Text(s)) => Ok(AttributeValue::Text(s)),
        (StorageKind::ElementId | StorageKind::None, _) => {
            Err(bimsync_core::Error::UnsupportedStorageKind {
                name: handle.name.clone(),
                kind: handle.storage,
            })
        }
        (_, other) => Err(mismatch(format!("got {:?}", other))),
    }
}

/// Whether the slot already holds `value`.
pub(crate) fn unchanged(doc: &dyn Document, handle: &AttributeHandle, value: &AttributeValue) -> bool {
    doc.lookup(handle.owner, &handle.name)
        .is_some_and(|attr| attr.value == *value)
}

/// Write one value in its own transaction.
pub(crate) fn write_in_transaction(
    doc: &mut dyn Document,
    transaction_name: &str,
    handle: &AttributeHandle,
    value: AttributeValue,
) -> Result<()> {
    let mut tx = Transaction::start(doc, transaction_name)?;
    tx.document().write_attribute(handle.owner, &handle.name, value)?;
    tx.commit()
}

#[cfg(test)]
mod tests {
    use super::*;
    use bimsync_core::{AttributeScope, ElementId};

    fn handle(storage: StorageKind) -> AttributeHandle {
        AttributeHandle {
            element: ElementId(1),
            owner: ElementId(1),
            scope: AttributeScope::Instance,
            name: "Slot".into(),
            storage,
            read_only: false,
        }
    }

    fn op(id: u64) -> ParameterOp {
        ParameterOp::new(ElementRef::new(id, "Openings"), "Mark", "x")
    }

    #[test]
    fn test_recommendation() {
        assert_eq!(recommend_strategy(12, false), StrategyKind::Batch);
        assert_eq!(recommend_strategy(10, true), StrategyKind::Batch);
        assert_eq!(recommend_strategy(5, false), StrategyKind::Optimized);
        assert_eq!(recommend_strategy(2, true), StrategyKind::Optimized);
        assert_eq!(recommend_strategy(4, false), StrategyKind::Basic);

        assert_eq!(recommend_for(&[op(1), op(2)]), StrategyKind::Basic);
        assert_eq!(recommend_for(&[op(1), op(1)]), StrategyKind::Optimized);
    }

    #[test]
    fn test_coercion() {
        let double = handle(StorageKind::Double);
        assert_eq!(coerce_value(&double, 3i64.into()).unwrap(), AttributeValue::Double(3.0));
        assert!(matches!(
            coerce_value(&double, "3".into()),
            Err(bimsync_core::Error::TypeMismatch { .. })
        ));

        let integer = handle(StorageKind::Integer);
        assert_eq!(coerce_value(&integer, 4.0.into()).unwrap(), AttributeValue::Integer(4));
        assert_eq!(coerce_value(&integer, "yes".into()).unwrap(), AttributeValue::Integer(1));
        assert!(coerce_value(&integer, 4.5.into()).is_err());

        let text = handle(StorageKind::String);
        assert!(coerce_value(&text, 1.0.into()).is_err());
        assert_eq!(coerce_value(&text, AttributeValue::Empty).unwrap(), AttributeValue::Empty);
    }

    #[test]
    fn test_writability() {
        let mut read_only = handle(StorageKind::String);
        read_only.read_only = true;
        assert!(matches!(
            check_writable(&read_only),
            Err(bimsync_core::Error::AttributeReadOnly { .. })
        ));
        assert!(matches!(
            check_writable(&handle(StorageKind::ElementId)),
            Err(bimsync_core::Error::UnsupportedStorageKind { .. })
        ));
        assert!(check_writable(&handle(StorageKind::Double)).is_ok());
    }

    #[test]
    fn test_kind_parsing() {
        assert_eq!("Batch".parse::<StrategyKind>().unwrap(), StrategyKind::Batch);
        assert_eq!(StrategyKind::Optimized.to_string(), "optimized");
        assert!("fast".parse::<StrategyKind>().is_err());
    }
}
