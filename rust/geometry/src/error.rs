use thiserror::Error;

/// Result type for solid kernel operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors a solid kernel may report.
///
/// These never escape aggregation, indexing or matching: a failed union drops
/// its operand and a failed intersection counts as zero overlap.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Boolean operation failed: {0}")]
    BooleanFailed(String),

    #[error("Degenerate solid: {0}")]
    DegenerateSolid(String),
}

impl Error {
    pub fn boolean(msg: impl Into<String>) -> Self {
        Error::BooleanFailed(msg.into())
    }

    pub fn degenerate(msg: impl Into<String>) -> Self {
        Error::DegenerateSolid(msg.into())
    }
}
