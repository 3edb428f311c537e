// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the synchronization pipeline.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Write-layer failure from the host document or a strategy.
    #[error(transparent)]
    Core(#[from] bimsync_core::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid text pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// A planned value failed validation and the run is set to abort.
    #[error("Value for '{attribute}' on {element} rejected: {reason}")]
    ValidationFailed {
        element: bimsync_core::ElementId,
        attribute: String,
        reason: String,
    },
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::InvalidConfig(format!("JSON error: {}", err))
    }
}

impl From<regex::Error> for Error {
    fn from(err: regex::Error) -> Self {
        Error::InvalidPattern {
            pattern: String::new(),
            reason: err.to_string(),
        }
    }
}
