//! BIM-Sync Geometry
//!
//! Solid consolidation and overlap matching between a host element set and
//! a reference (linked) element set. Boolean operations come from the host
//! through the [`SolidKernel`] trait; [`BoxKernel`] is a self-contained
//! kernel over axis-aligned box sets built on nalgebra.
//!
//! Geometry failures never raise: missing geometry is `None`, a failed union
//! drops its operand, a failed intersection is zero overlap.

pub mod aggregate;
pub mod bounds;
pub mod box_kernel;
pub mod error;
pub mod index;
pub mod matching;
pub mod scripted;
pub mod solid;

// Re-export nalgebra types for convenience
pub use nalgebra::Point3;

pub use aggregate::{AggregateStats, SolidAggregator};
pub use bounds::Aabb;
pub use box_kernel::{BoxKernel, BoxSolid};
pub use error::{Error, Result};
pub use index::{GeometryIndex, IndexStatistics};
pub use matching::{MatchCandidate, MatchEngine, MatchResult, MatchStats};
pub use scripted::{ScriptedKernel, ScriptedShape};
pub use solid::{GeometrySource, MemoryGeometry, RawGeometry, Solid, SolidKernel};
