// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # BIM-Sync Processing
//!
//! Match host elements against a reference model, judge each pair and write
//! the resulting attributes back under all-or-nothing transaction rules.
//!
//! ## Overview
//!
//! - **Classification**: [`AttributeClassifier`] derives a shape class and
//!   dimensions from type names and numeric attributes
//! - **Comparison**: [`DimensionComparator`] compares dimensions in one
//!   canonical unit within a tolerance
//! - **Validation**: [`ParameterValidator`] normalizes values before they
//!   are written
//! - **Strategies**: [`BasicStrategy`], [`BatchStrategy`] and
//!   [`OptimizedStrategy`] apply writes
//! - **Orchestration**: [`SyncOrchestrator`] runs analysis, planning and
//!   writing, and returns a [`SyncReport`]
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use bimsync_processing::{HostModel, ReferenceModel, StatusNoteRecipe, SyncConfig, SyncOrchestrator};
//!
//! let mut orchestrator = SyncOrchestrator::new(&kernel, SyncConfig::from_env())?
//!     .with_recipe(StatusNoteRecipe::new("Check Status").with_note("Check Note"));
//!
//! let report = orchestrator.run(
//!     HostModel { document: &mut host_doc, geometry: &host_geometry, elements: &hosts },
//!     ReferenceModel { document: &linked_doc, geometry: &linked_geometry, elements: &refs },
//! );
//! println!("{:?}", report.summary());
//! ```

pub mod classify;
pub mod compare;
pub mod config;
pub mod context;
pub mod error;
pub mod orchestrator;
pub mod recipe;
pub mod strategy;
pub mod validate;
pub mod verdict;

pub use classify::{
    AttributeClassifier, ClassifierConfig, Resolver, ShapeClass, ShapeDescriptor, ShapeEvidence,
};
pub use compare::{DimensionComparator, DimensionDelta};
pub use config::{InvalidValuePolicy, SyncConfig};
pub use context::{CancellationToken, RunContext, RunStats};
pub use error::{Error, Result};
pub use orchestrator::{HostModel, ReferenceModel, SyncOrchestrator, SyncReport, WritePhase};
pub use recipe::{CopyAttributeRecipe, PlannedWrite, RecipeContext, StatusNoteRecipe, WriteRecipe};
pub use strategy::{
    coerce_value, recommend_for, recommend_strategy, BasicStrategy, BatchStrategy, CacheStats,
    OptimizedStrategy, ParameterOp, ParameterStrategy, StrategyKind,
};
pub use validate::{
    parse_bool_token, ParameterValidator, RawValue, SemanticFamily, ValidationOptions,
    ValidationOutcome,
};
pub use verdict::{VerdictRecord, VerdictStatus, VerdictSummary};
