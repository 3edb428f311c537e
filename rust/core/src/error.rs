// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::attribute::StorageKind;
use crate::element::ElementId;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Write-layer errors.
///
/// Geometry failures never show up here: they are absorbed into `None` or a
/// zero volume by the geometry crate. Everything below is raised by a write
/// and must reach the caller.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Element {0} not found")]
    ElementNotFound(ElementId),

    #[error("Attribute '{name}' not found on element {element}")]
    AttributeNotFound { element: ElementId, name: String },

    #[error("Attribute '{name}' on element {element} is read-only")]
    AttributeReadOnly { element: ElementId, name: String },

    #[error("Attribute '{name}' has storage kind {kind:?}, which cannot be assigned directly")]
    UnsupportedStorageKind { name: String, kind: StorageKind },

    #[error("Value for '{name}' does not fit storage kind {kind:?}: {detail}")]
    TypeMismatch {
        name: String,
        kind: StorageKind,
        detail: String,
    },

    #[error("Transaction '{name}' failed: {reason}")]
    TransactionFailure { name: String, reason: String },

    #[error("No active transaction")]
    NoActiveTransaction,

    #[error("Batch aborted at operation {position}: {source}")]
    BatchAborted {
        position: usize,
        #[source]
        source: Box<Error>,
    },

    #[error("Cannot parse '{input}' as a quantity: {reason}")]
    UnitParse { input: String, reason: String },

    #[error("Operation cancelled")]
    Cancelled,
}

impl Error {
    pub fn unit_parse(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::UnitParse {
            input: input.into(),
            reason: reason.into(),
        }
    }

    pub fn transaction(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::TransactionFailure {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// The innermost cause, looking through `BatchAborted` wrappers.
    pub fn root_cause(&self) -> &Error {
        match self {
            Error::BatchAborted { source, .. } => source.root_cause(),
            other => other,
        }
    }
}
