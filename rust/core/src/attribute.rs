// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Typed attribute slots and values.

use crate::element::ElementId;
use std::fmt;

/// How the host physically stores an attribute value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StorageKind {
    Double,
    Integer,
    String,
    /// Reference to another element. Not assignable through the strategies.
    ElementId,
    None,
}

/// What the attribute means, independent of its storage.
///
/// Numeric kinds carry a canonical unit chosen by the caller (see
/// `units::LengthUnit`); `YesNo` is stored as an integer 0/1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DeclaredType {
    Text,
    Integer,
    Number,
    Length,
    Area,
    Volume,
    Angle,
    YesNo,
    ElementId,
}

impl DeclaredType {
    /// Storage kind the host uses for this declared type.
    pub fn storage_kind(self) -> StorageKind {
        match self {
            DeclaredType::Text => StorageKind::String,
            DeclaredType::Integer | DeclaredType::YesNo => StorageKind::Integer,
            DeclaredType::Number
            | DeclaredType::Length
            | DeclaredType::Area
            | DeclaredType::Volume
            | DeclaredType::Angle => StorageKind::Double,
            DeclaredType::ElementId => StorageKind::ElementId,
        }
    }

    #[inline]
    pub fn is_numeric(self) -> bool {
        self.storage_kind() == StorageKind::Double
    }
}

/// A concrete attribute value.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AttributeValue {
    Double(f64),
    Integer(i64),
    Text(String),
    ElementId(ElementId),
    Empty,
}

impl AttributeValue {
    pub fn text(value: impl Into<String>) -> Self {
        AttributeValue::Text(value.into())
    }

    /// Numeric view of the value. Integers widen to `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttributeValue::Double(v) => Some(*v),
            AttributeValue::Integer(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            AttributeValue::Integer(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, AttributeValue::Empty)
    }

    /// Storage kind this value naturally maps to.
    pub fn natural_kind(&self) -> StorageKind {
        match self {
            AttributeValue::Double(_) => StorageKind::Double,
            AttributeValue::Integer(_) => StorageKind::Integer,
            AttributeValue::Text(_) => StorageKind::String,
            AttributeValue::ElementId(_) => StorageKind::ElementId,
            AttributeValue::Empty => StorageKind::None,
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Double(v) => write!(f, "{}", v),
            AttributeValue::Integer(v) => write!(f, "{}", v),
            AttributeValue::Text(s) => f.write_str(s),
            AttributeValue::ElementId(id) => write!(f, "{}", id),
            AttributeValue::Empty => Ok(()),
        }
    }
}

impl From<f64> for AttributeValue {
    fn from(v: f64) -> Self {
        AttributeValue::Double(v)
    }
}

impl From<i64> for AttributeValue {
    fn from(v: i64) -> Self {
        AttributeValue::Integer(v)
    }
}

impl From<&str> for AttributeValue {
    fn from(v: &str) -> Self {
        AttributeValue::Text(v.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(v: String) -> Self {
        AttributeValue::Text(v)
    }
}

/// An attribute as reported by the host.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Attribute {
    pub name: String,
    pub storage: StorageKind,
    pub read_only: bool,
    pub value: AttributeValue,
}

impl Attribute {
    pub fn new(name: impl Into<String>, storage: StorageKind, value: AttributeValue) -> Self {
        Self {
            name: name.into(),
            storage,
            read_only: false,
            value,
        }
    }

    pub fn double(name: impl Into<String>, value: f64) -> Self {
        Self::new(name, StorageKind::Double, AttributeValue::Double(value))
    }

    pub fn integer(name: impl Into<String>, value: i64) -> Self {
        Self::new(name, StorageKind::Integer, AttributeValue::Integer(value))
    }

    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(name, StorageKind::String, AttributeValue::Text(value.into()))
    }

    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }
}

/// Where an attribute was found by the two-level lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AttributeScope {
    /// On the element itself.
    Instance,
    /// On the element's type, identified by the type element's id.
    Type(ElementId),
}

/// A resolved, writable-or-not attribute slot.
///
/// Handles are only valid within the document state they were resolved
/// against; caches holding them must be cleared between runs.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeHandle {
    /// Element the lookup started from.
    pub element: ElementId,
    /// Element that actually owns the slot (the element or its type).
    pub owner: ElementId,
    pub scope: AttributeScope,
    pub name: String,
    pub storage: StorageKind,
    pub read_only: bool,
}
