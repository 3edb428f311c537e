// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # BIM-Sync Core
//!
//! Element, attribute and transaction contracts shared by the geometry
//! matcher and the synchronization pipeline.
//!
//! ## Overview
//!
//! - **Elements**: [`ElementId`] / [`ElementRef`] handles into a host document
//! - **Attributes**: typed slots ([`StorageKind`], [`DeclaredType`]) and values
//! - **Host contract**: [`ElementSource`] for reads, [`Document`] for
//!   transactional writes, and a single two-level lookup
//!   ([`resolve_attribute`]: instance first, then type)
//! - **Units**: [`parse_quantity`] and length/area/volume/angle conversion
//! - **Memory host**: [`MemoryDocument`], a snapshot-backed document for tests
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use bimsync_core::{Attribute, ElementId, MemoryDocument, resolve_handle};
//!
//! let mut doc = MemoryDocument::new();
//! doc.add_type(ElementId(10), "Rectangular Opening");
//! doc.add_element(ElementId(1), Some(ElementId(10)));
//! doc.set_attribute(ElementId(10), Attribute::double("Width", 0.98));
//!
//! let handle = resolve_handle(&doc, ElementId(1), "Width")?;
//! assert_eq!(handle.owner, ElementId(10));
//! ```
//!
//! ## Feature Flags
//!
//! - `serde`: Enable serialization support for elements, attributes and units

pub mod attribute;
pub mod element;
pub mod error;
pub mod host;
pub mod memory;
pub mod units;

pub use attribute::{
    Attribute, AttributeHandle, AttributeScope, AttributeValue, DeclaredType, StorageKind,
};
pub use element::{ElementId, ElementRef};
pub use error::{Error, Result};
pub use host::{
    lookup_number, lookup_value, resolve_attribute, resolve_attribute_with, resolve_handle,
    resolve_handle_with, AsElementSource, Document, ElementSource, Transaction, TransactionGroup,
};
pub use memory::MemoryDocument;
pub use units::{
    get_si_prefix_multiplier, parse_quantity, AngleUnit, Dimension, LengthUnit, Quantity,
    UnitToken,
};
