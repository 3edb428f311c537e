// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Run configuration loaded from defaults, JSON or environment variables.

use crate::classify::ClassifierConfig;
use crate::error::{Error, Result};
use crate::strategy::StrategyKind;
use bimsync_core::{AngleUnit, LengthUnit};
use serde::{Deserialize, Serialize};

/// What to do with a planned write whose value fails validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvalidValuePolicy {
    /// Drop the write, keep a warning, carry on.
    #[default]
    Skip,
    /// Abort the write phase before anything is written.
    Abort,
}

impl std::str::FromStr for InvalidValuePolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "skip" => Ok(Self::Skip),
            "abort" => Ok(Self::Abort),
            other => Err(Error::InvalidConfig(format!("unknown invalid-value policy '{}'", other))),
        }
    }
}

/// Synchronization run configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Absolute tolerance per compared dimension, in `canonical_unit`.
    pub tolerance: f64,
    /// Unit dimensions are compared in.
    pub canonical_unit: LengthUnit,
    /// Unit the host document stores lengths in.
    pub host_length_unit: LengthUnit,
    /// Unit the reference document stores lengths in; `None` means the same
    /// as the host.
    pub reference_length_unit: Option<LengthUnit>,
    /// Unit angles are written in.
    pub angle_unit: AngleUnit,
    /// Maximum text attribute length, in characters.
    pub max_text_length: usize,
    /// Explicit write strategy; `None` picks one from the planned writes.
    pub strategy: Option<StrategyKind>,
    pub on_invalid_value: InvalidValuePolicy,
    /// Name of the transaction group wrapping the write phase.
    pub transaction_name: String,
    pub classifier: ClassifierConfig,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            tolerance: 0.01,
            canonical_unit: LengthUnit::Millimeter,
            host_length_unit: LengthUnit::Foot,
            reference_length_unit: None,
            angle_unit: AngleUnit::Degree,
            max_text_length: 1024,
            strategy: None,
            on_invalid_value: InvalidValuePolicy::Skip,
            transaction_name: "Synchronize parameters".into(),
            classifier: ClassifierConfig::default(),
        }
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|raw| raw.trim().parse().ok())
        .unwrap_or(default)
}

impl SyncConfig {
    /// Load configuration from environment variables, falling back to the
    /// defaults for anything unset or unparsable.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            tolerance: env_or("BIMSYNC_TOLERANCE", defaults.tolerance),
            canonical_unit: env_or("BIMSYNC_CANONICAL_UNIT", defaults.canonical_unit),
            host_length_unit: env_or("BIMSYNC_HOST_UNIT", defaults.host_length_unit),
            max_text_length: env_or("BIMSYNC_MAX_TEXT_LENGTH", defaults.max_text_length),
            strategy: std::env::var("BIMSYNC_STRATEGY")
                .ok()
                .and_then(|raw| parse_strategy(&raw))
                .unwrap_or(defaults.strategy),
            on_invalid_value: env_or("BIMSYNC_ON_INVALID", defaults.on_invalid_value),
            ..defaults
        }
    }

    /// Parse a JSON document; missing fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            return Err(Error::InvalidConfig(format!(
                "tolerance must be a finite, non-negative number (got {})",
                self.tolerance
            )));
        }
        if self.max_text_length == 0 {
            return Err(Error::InvalidConfig("max_text_length must be positive".into()));
        }
        if !self.classifier.square_epsilon.is_finite() || self.classifier.square_epsilon < 0.0 {
            return Err(Error::InvalidConfig("classifier.square_epsilon must be non-negative".into()));
        }
        Ok(())
    }

    /// Length unit of the reference document.
    pub fn reference_unit(&self) -> LengthUnit {
        self.reference_length_unit.unwrap_or(self.host_length_unit)
    }
}

/// `Some(None)` for "auto", `Some(Some(kind))` for an explicit strategy.
fn parse_strategy(raw: &str) -> Option<Option<StrategyKind>> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("auto") {
        return Some(None);
    }
    raw.parse().ok().map(Some)
}
