// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Unit parsing and conversion
//!
//! Host documents store lengths in their own native unit (commonly decimal
//! feet) while engineering comparisons happen in millimetres. Everything that
//! crosses that boundary goes through this module so that no caller ever
//! differences two numbers in mismatched units.

use crate::error::{Error, Result};
use std::fmt;

/// SI prefix multipliers
/// Maps prefix names to their numeric multipliers
#[inline]
pub fn get_si_prefix_multiplier(prefix: &str) -> f64 {
    match prefix {
        "MICRO" => 1e-6,
        "MILLI" => 1e-3, // Most common: millimetres
        "CENTI" => 1e-2,
        "DECI" => 1e-1,
        "DECA" => 1e1,
        "HECTO" => 1e2,
        "KILO" => 1e3,
        _ => 1.0, // No prefix or unknown = base unit (metres)
    }
}

/// Length units understood by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum LengthUnit {
    #[default]
    Millimeter,
    Centimeter,
    Decimeter,
    Meter,
    Kilometer,
    Inch,
    Foot,
}

impl LengthUnit {
    /// Metres per one unit.
    #[inline]
    pub fn meters_per_unit(self) -> f64 {
        match self {
            LengthUnit::Millimeter => get_si_prefix_multiplier("MILLI"),
            LengthUnit::Centimeter => get_si_prefix_multiplier("CENTI"),
            LengthUnit::Decimeter => get_si_prefix_multiplier("DECI"),
            LengthUnit::Meter => 1.0,
            LengthUnit::Kilometer => get_si_prefix_multiplier("KILO"),
            LengthUnit::Inch => 0.0254,
            LengthUnit::Foot => 0.3048,
        }
    }

    /// Factor that converts a value in `self` into `target`.
    #[inline]
    pub fn factor_to(self, target: LengthUnit) -> f64 {
        if self == target {
            1.0
        } else {
            self.meters_per_unit() / target.meters_per_unit()
        }
    }

    #[inline]
    pub fn convert(self, value: f64, target: LengthUnit) -> f64 {
        value * self.factor_to(target)
    }

    pub fn symbol(self) -> &'static str {
        match self {
            LengthUnit::Millimeter => "mm",
            LengthUnit::Centimeter => "cm",
            LengthUnit::Decimeter => "dm",
            LengthUnit::Meter => "m",
            LengthUnit::Kilometer => "km",
            LengthUnit::Inch => "in",
            LengthUnit::Foot => "ft",
        }
    }

    /// Parse a unit token (`"mm"`, `"metre"`, `"'"`, ...), case-insensitive.
    pub fn from_token(token: &str) -> Option<Self> {
        let lower = token.trim().to_ascii_lowercase();
        let unit = match lower.as_str() {
            "mm" | "millimeter" | "millimeters" | "millimetre" | "millimetres" => {
                LengthUnit::Millimeter
            }
            "cm" | "centimeter" | "centimeters" | "centimetre" | "centimetres" => {
                LengthUnit::Centimeter
            }
            "dm" | "decimeter" | "decimeters" | "decimetre" | "decimetres" => {
                LengthUnit::Decimeter
            }
            "m" | "meter" | "meters" | "metre" | "metres" => LengthUnit::Meter,
            "km" | "kilometer" | "kilometers" | "kilometre" | "kilometres" => {
                LengthUnit::Kilometer
            }
            "in" | "inch" | "inches" | "\"" => LengthUnit::Inch,
            "ft" | "foot" | "feet" | "'" => LengthUnit::Foot,
            _ => return None,
        };
        Some(unit)
    }
}

impl fmt::Display for LengthUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl std::str::FromStr for LengthUnit {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        LengthUnit::from_token(s).ok_or_else(|| Error::unit_parse(s, "unknown length unit"))
    }
}

/// Angle units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum AngleUnit {
    #[default]
    Degree,
    Radian,
}

impl AngleUnit {
    #[inline]
    pub fn convert(self, value: f64, target: AngleUnit) -> f64 {
        match (self, target) {
            (AngleUnit::Degree, AngleUnit::Radian) => value.to_radians(),
            (AngleUnit::Radian, AngleUnit::Degree) => value.to_degrees(),
            _ => value,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            AngleUnit::Degree => "°",
            AngleUnit::Radian => "rad",
        }
    }
}

/// Physical dimension of a unit suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dimension {
    Length,
    Area,
    Volume,
    Angle,
    Ratio,
}

/// A unit suffix recognised after a number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnitToken {
    Length(LengthUnit),
    Area(LengthUnit),
    Volume(LengthUnit),
    Angle(AngleUnit),
    Percent,
}

impl UnitToken {
    pub fn dimension(self) -> Dimension {
        match self {
            UnitToken::Length(_) => Dimension::Length,
            UnitToken::Area(_) => Dimension::Area,
            UnitToken::Volume(_) => Dimension::Volume,
            UnitToken::Angle(_) => Dimension::Angle,
            UnitToken::Percent => Dimension::Ratio,
        }
    }

    /// Parse a suffix such as `mm`, `m²`, `m3`, `sqft`, `deg`, `%`.
    pub fn parse(token: &str) -> Option<Self> {
        let token = token.trim();
        if token.is_empty() {
            return None;
        }
        let lower = token.to_ascii_lowercase();
        match lower.as_str() {
            "%" | "percent" | "pct" => return Some(UnitToken::Percent),
            "°" | "deg" | "degree" | "degrees" => return Some(UnitToken::Angle(AngleUnit::Degree)),
            "rad" | "radian" | "radians" => return Some(UnitToken::Angle(AngleUnit::Radian)),
            "sqm" => return Some(UnitToken::Area(LengthUnit::Meter)),
            "sqft" | "sf" => return Some(UnitToken::Area(LengthUnit::Foot)),
            "cf" | "cuft" => return Some(UnitToken::Volume(LengthUnit::Foot)),
            _ => {}
        }

        // Power suffixes: m2, m², mm3, mm³
        if let Some(base) = lower.strip_suffix('2').or_else(|| lower.strip_suffix('²')) {
            return LengthUnit::from_token(base).map(UnitToken::Area);
        }
        if let Some(base) = lower.strip_suffix('3').or_else(|| lower.strip_suffix('³')) {
            return LengthUnit::from_token(base).map(UnitToken::Volume);
        }

        LengthUnit::from_token(&lower).map(UnitToken::Length)
    }

    /// Convert `value` (expressed in this unit) to the canonical unit of its
    /// dimension: `length` (or its square/cube) for spatial units, `angle`
    /// for angles, percent for ratios.
    pub fn to_canonical(self, value: f64, length: LengthUnit, angle: AngleUnit) -> f64 {
        match self {
            UnitToken::Length(u) => u.convert(value, length),
            UnitToken::Area(u) => value * u.factor_to(length).powi(2),
            UnitToken::Volume(u) => value * u.factor_to(length).powi(3),
            UnitToken::Angle(u) => u.convert(value, angle),
            UnitToken::Percent => value,
        }
    }
}

impl fmt::Display for UnitToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitToken::Length(u) => write!(f, "{}", u),
            UnitToken::Area(u) => write!(f, "{}²", u),
            UnitToken::Volume(u) => write!(f, "{}³", u),
            UnitToken::Angle(u) => f.write_str(u.symbol()),
            UnitToken::Percent => f.write_str("%"),
        }
    }
}

/// A number with an optional unit suffix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quantity {
    pub value: f64,
    pub unit: Option<UnitToken>,
}

/// Split `"300 mm"`, `"12.5m"`, `"1'"` or `"0,5 m"` into value and unit.
///
/// A bare number yields `unit: None`. Unknown suffixes and non-finite numbers
/// are errors.
pub fn parse_quantity(input: &str) -> Result<Quantity> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(Error::unit_parse(input, "empty input"));
    }

    // Accept a decimal comma when no decimal point is present
    let normalized;
    let text = if trimmed.contains(',') && !trimmed.contains('.') {
        normalized = trimmed.replacen(',', ".", 1);
        normalized.as_str()
    } else {
        trimmed
    };

    let (value, consumed) = fast_float::parse_partial::<f64, _>(text)
        .map_err(|_| Error::unit_parse(input, "no leading number"))?;
    if !value.is_finite() {
        return Err(Error::unit_parse(input, "number is not finite"));
    }

    let rest = text[consumed..].trim();
    if rest.is_empty() {
        return Ok(Quantity { value, unit: None });
    }

    match UnitToken::parse(rest) {
        Some(unit) => Ok(Quantity {
            value,
            unit: Some(unit),
        }),
        None => Err(Error::unit_parse(input, format!("unknown unit '{}'", rest))),
    }
}
