// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Parameter value validation
//!
//! Checks and normalizes a value before it is handed to a write strategy.
//! Rejections are reported through [`ValidationOutcome`], never raised: the
//! caller decides whether an invalid value skips the write or aborts the
//! run.
//!
//! The attribute name picks a [`SemanticFamily`] that only decides which
//! range checks and warnings apply. The declared type decides the shape of
//! the normalized value.

use crate::error::{Error, Result};
use bimsync_core::{
    parse_quantity, AngleUnit, AttributeValue, DeclaredType, Dimension, ElementId, LengthUnit,
    UnitToken,
};
use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

/// Advisory category derived from an attribute name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SemanticFamily {
    Length,
    Area,
    Volume,
    Angle,
    Count,
    Percentage,
    Text,
    Material,
    General,
}

/// Name patterns, tried in order. More specific families come first so that
/// "Opening Area" is an area even though it ends like nothing else.
fn family_patterns() -> &'static [(Regex, SemanticFamily)] {
    static PATTERNS: OnceLock<Vec<(Regex, SemanticFamily)>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            (r"(?i)percent|prozent|%|\bratio\b|anteil", SemanticFamily::Percentage),
            (r"(?i)area|fl(ä|ae)che|\bsqm\b", SemanticFamily::Area),
            (r"(?i)volume|volumen|rauminhalt", SemanticFamily::Volume),
            (r"(?i)angle|winkel|slope|neigung|rotation", SemanticFamily::Angle),
            (r"(?i)count|anzahl|quantity|\bqty\b|number of|\bnr\b", SemanticFamily::Count),
            (r"(?i)material|werkstoff", SemanticFamily::Material),
            (
                r"(?i)length|width|height|depth|thickness|diameter|radius|offset|elevation|l(ä|ae)nge|breite|h(ö|oe)he|tiefe|dicke|durchmesser|^[bhdlw]$",
                SemanticFamily::Length,
            ),
            (
                r"(?i)comment|note|mark|description|status|name|kommentar|bemerkung|beschreibung",
                SemanticFamily::Text,
            ),
        ]
        .into_iter()
        .filter_map(|(pattern, family)| Regex::new(pattern).ok().map(|re| (re, family)))
        .collect()
    })
}

impl SemanticFamily {
    pub fn of(attribute_name: &str) -> Self {
        family_patterns()
            .iter()
            .find(|(re, _)| re.is_match(attribute_name))
            .map(|(_, family)| *family)
            .unwrap_or(SemanticFamily::General)
    }

    /// Unit dimension implied by the family, if any.
    pub fn dimension(self) -> Option<Dimension> {
        match self {
            SemanticFamily::Length => Some(Dimension::Length),
            SemanticFamily::Area => Some(Dimension::Area),
            SemanticFamily::Volume => Some(Dimension::Volume),
            SemanticFamily::Angle => Some(Dimension::Angle),
            _ => None,
        }
    }

    fn is_spatial(self) -> bool {
        matches!(
            self,
            SemanticFamily::Length | SemanticFamily::Area | SemanticFamily::Volume
        )
    }
}

/// A value as produced by a write recipe, before normalization.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Number(f64),
    Integer(i64),
    Bool(bool),
    /// Free text; numeric slots accept an embedded unit suffix (`"300 mm"`)
    Text(String),
    /// A number already tagged with its unit
    Quantity { value: f64, unit: UnitToken },
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawValue::Number(v) => write!(f, "{}", v),
            RawValue::Integer(v) => write!(f, "{}", v),
            RawValue::Bool(v) => write!(f, "{}", v),
            RawValue::Text(s) => f.write_str(s),
            RawValue::Quantity { value, unit } => write!(f, "{} {}", value, unit),
        }
    }
}

impl From<f64> for RawValue {
    fn from(v: f64) -> Self {
        RawValue::Number(v)
    }
}

impl From<i64> for RawValue {
    fn from(v: i64) -> Self {
        RawValue::Integer(v)
    }
}

impl From<bool> for RawValue {
    fn from(v: bool) -> Self {
        RawValue::Bool(v)
    }
}

impl From<&str> for RawValue {
    fn from(v: &str) -> Self {
        RawValue::Text(v.to_string())
    }
}

impl From<String> for RawValue {
    fn from(v: String) -> Self {
        RawValue::Text(v)
    }
}

/// Boolean-like tokens accepted by integer and yes/no slots.
pub fn parse_bool_token(token: &str) -> Option<bool> {
    match token.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}

#[derive(Debug, Clone)]
pub struct ValidationOptions {
    /// Unit lengths (and derived areas/volumes) are normalized to
    pub length_unit: LengthUnit,
    pub angle_unit: AngleUnit,
    /// Maximum text length in characters
    pub max_text_length: usize,
    /// Text values must match this pattern when set
    pub pattern: Option<Regex>,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self {
            length_unit: LengthUnit::Millimeter,
            angle_unit: AngleUnit::Degree,
            max_text_length: 1024,
            pattern: None,
            min: None,
            max: None,
        }
    }
}

impl ValidationOptions {
    pub fn with_units(mut self, length_unit: LengthUnit, angle_unit: AngleUnit) -> Self {
        self.length_unit = length_unit;
        self.angle_unit = angle_unit;
        self
    }

    pub fn with_max_text_length(mut self, max: usize) -> Self {
        self.max_text_length = max;
        self
    }

    pub fn with_pattern(mut self, pattern: &str) -> Result<Self> {
        let re = Regex::new(pattern).map_err(|err| Error::InvalidPattern {
            pattern: pattern.to_string(),
            reason: err.to_string(),
        })?;
        self.pattern = Some(re);
        Ok(self)
    }

    pub fn with_range(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.min = min;
        self.max = max;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidationOutcome {
    pub is_valid: bool,
    pub normalized_value: Option<AttributeValue>,
    pub warnings: Vec<String>,
}

impl ValidationOutcome {
    fn accept(value: AttributeValue, warnings: Vec<String>) -> Self {
        Self {
            is_valid: true,
            normalized_value: Some(value),
            warnings,
        }
    }

    fn reject(mut warnings: Vec<String>, reason: impl Into<String>) -> Self {
        warnings.push(reason.into());
        Self {
            is_valid: false,
            normalized_value: None,
            warnings,
        }
    }

    /// The last warning of a rejected outcome is the rejection reason.
    pub fn reason(&self) -> Option<&str> {
        if self.is_valid {
            None
        } else {
            self.warnings.last().map(String::as_str)
        }
    }
}

/// Type- and unit-aware validator for attribute values.
#[derive(Debug, Clone, Default)]
pub struct ParameterValidator {
    options: ValidationOptions,
}

impl ParameterValidator {
    pub fn new(options: ValidationOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ValidationOptions {
        &self.options
    }

    pub fn validate(&self, name: &str, raw: &RawValue, declared: DeclaredType) -> ValidationOutcome {
        Self::validate_with(name, raw, declared, &self.options)
    }

    pub fn validate_with(
        name: &str,
        raw: &RawValue,
        declared: DeclaredType,
        options: &ValidationOptions,
    ) -> ValidationOutcome {
        let family = SemanticFamily::of(name);
        match declared {
            DeclaredType::Number
            | DeclaredType::Length
            | DeclaredType::Area
            | DeclaredType::Volume
            | DeclaredType::Angle => validate_number(name, raw, declared, family, options),
            DeclaredType::Integer | DeclaredType::YesNo => {
                validate_integer(name, raw, declared, family, options)
            }
            DeclaredType::Text => validate_text(name, raw, family, options),
            DeclaredType::ElementId => validate_element_id(name, raw),
        }
    }
}

/// Unit dimension a declared numeric type accepts.
pub(crate) fn expected_dimension(declared: DeclaredType) -> Option<Dimension> {
    match declared {
        DeclaredType::Length => Some(Dimension::Length),
        DeclaredType::Area => Some(Dimension::Area),
        DeclaredType::Volume => Some(Dimension::Volume),
        DeclaredType::Angle => Some(Dimension::Angle),
        _ => None,
    }
}

/// The unit a token normalizes to under `options`.
fn target_token(unit: UnitToken, options: &ValidationOptions) -> UnitToken {
    match unit {
        UnitToken::Length(_) => UnitToken::Length(options.length_unit),
        UnitToken::Area(_) => UnitToken::Area(options.length_unit),
        UnitToken::Volume(_) => UnitToken::Volume(options.length_unit),
        UnitToken::Angle(_) => UnitToken::Angle(options.angle_unit),
        UnitToken::Percent => UnitToken::Percent,
    }
}

fn check_range(name: &str, value: f64, options: &ValidationOptions) -> Option<String> {
    if let Some(min) = options.min.filter(|min| value < *min) {
        return Some(format!("{}: {} is below the minimum {}", name, value, min));
    }
    if let Some(max) = options.max.filter(|max| value > *max) {
        return Some(format!("{}: {} is above the maximum {}", name, value, max));
    }
    None
}

fn validate_number(
    name: &str,
    raw: &RawValue,
    declared: DeclaredType,
    family: SemanticFamily,
    options: &ValidationOptions,
) -> ValidationOutcome {
    let mut warnings = Vec::new();
    let (value, unit) = match raw {
        RawValue::Number(v) => (*v, None),
        RawValue::Integer(v) => (*v as f64, None),
        RawValue::Quantity { value, unit } => (*value, Some(*unit)),
        RawValue::Text(text) => match parse_quantity(text) {
            Ok(q) => (q.value, q.unit),
            Err(err) => return ValidationOutcome::reject(warnings, format!("{}: {}", name, err)),
        },
        RawValue::Bool(_) => {
            return ValidationOutcome::reject(
                warnings,
                format!("{}: a yes/no value cannot fill a numeric attribute", name),
            )
        }
    };
    if !value.is_finite() {
        return ValidationOutcome::reject(warnings, format!("{}: value is not a finite number", name));
    }

    let mut normalized = value;
    if let Some(unit) = unit {
        if let Some(expected) = expected_dimension(declared) {
            if unit.dimension() != expected {
                return ValidationOutcome::reject(
                    warnings,
                    format!("{}: unit '{}' does not fit a {:?} attribute", name, unit, declared),
                );
            }
        }
        normalized = unit.to_canonical(value, options.length_unit, options.angle_unit);
        let target = target_token(unit, options);
        if target != unit {
            warnings.push(format!(
                "{}: converted {} {} to {} {}",
                name, value, unit, normalized, target
            ));
        }
    }

    let spatial = matches!(
        declared,
        DeclaredType::Length | DeclaredType::Area | DeclaredType::Volume
    ) || family.is_spatial();
    if spatial && normalized < 0.0 {
        return ValidationOutcome::reject(
            warnings,
            format!("{}: negative value {} for a {:?} attribute", name, normalized, family),
        );
    }

    let percent = family == SemanticFamily::Percentage || unit == Some(UnitToken::Percent);
    if percent && !(0.0..=100.0).contains(&normalized) {
        return ValidationOutcome::reject(
            warnings,
            format!("{}: percentage {} outside 0..100", name, normalized),
        );
    }

    let angle_limit = AngleUnit::Degree.convert(360.0, options.angle_unit);
    let is_angle = declared == DeclaredType::Angle || family == SemanticFamily::Angle;
    if is_angle && normalized.abs() > angle_limit {
        warnings.push(format!("{}: angle {} exceeds a full turn", name, normalized));
    }

    if let Some(reason) = check_range(name, normalized, options) {
        return ValidationOutcome::reject(warnings, reason);
    }

    ValidationOutcome::accept(AttributeValue::Double(normalized), warnings)
}

fn integral(value: f64) -> Option<i64> {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        Some(value as i64)
    } else {
        None
    }
}

fn validate_integer(
    name: &str,
    raw: &RawValue,
    declared: DeclaredType,
    family: SemanticFamily,
    options: &ValidationOptions,
) -> ValidationOutcome {
    let warnings = Vec::new();
    let parsed = match raw {
        RawValue::Integer(v) => Some(*v),
        RawValue::Bool(b) => Some(i64::from(*b)),
        RawValue::Number(v) => integral(*v),
        RawValue::Text(text) => {
            let text = text.trim();
            parse_bool_token(text)
                .map(i64::from)
                .or_else(|| text.parse::<i64>().ok())
                .or_else(|| text.parse::<f64>().ok().and_then(integral))
        }
        RawValue::Quantity { .. } => {
            return ValidationOutcome::reject(
                warnings,
                format!("{}: a value with a unit cannot fill an integer attribute", name),
            )
        }
    };

    let Some(value) = parsed else {
        return ValidationOutcome::reject(warnings, format!("{}: '{}' is not an integer", name, raw));
    };

    if declared == DeclaredType::YesNo && !(0..=1).contains(&value) {
        return ValidationOutcome::reject(warnings, format!("{}: yes/no value must be 0 or 1, got {}", name, value));
    }
    if (family == SemanticFamily::Count || family.is_spatial()) && value < 0 {
        return ValidationOutcome::reject(warnings, format!("{}: negative count {}", name, value));
    }
    if family == SemanticFamily::Percentage && !(0..=100).contains(&value) {
        return ValidationOutcome::reject(warnings, format!("{}: percentage {} outside 0..100", name, value));
    }
    if let Some(reason) = check_range(name, value as f64, options) {
        return ValidationOutcome::reject(warnings, reason);
    }

    ValidationOutcome::accept(AttributeValue::Integer(value), warnings)
}

fn validate_text(
    name: &str,
    raw: &RawValue,
    family: SemanticFamily,
    options: &ValidationOptions,
) -> ValidationOutcome {
    let mut warnings = Vec::new();
    let text = match raw {
        RawValue::Text(s) => s.clone(),
        other => {
            warnings.push(format!("{}: stored {} as text", name, other));
            other.to_string()
        }
    };

    let length = text.chars().count();
    if length > options.max_text_length {
        return ValidationOutcome::reject(
            warnings,
            format!(
                "{}: text is {} characters long, the limit is {}",
                name, length, options.max_text_length
            ),
        );
    }
    if let Some(re) = &options.pattern {
        if !re.is_match(&text) {
            return ValidationOutcome::reject(
                warnings,
                format!("{}: '{}' does not match pattern '{}'", name, text, re.as_str()),
            );
        }
    }
    if family == SemanticFamily::Material && text.trim().is_empty() {
        warnings.push(format!("{}: material is empty", name));
    }

    ValidationOutcome::accept(AttributeValue::Text(text), warnings)
}

fn validate_element_id(name: &str, raw: &RawValue) -> ValidationOutcome {
    let parsed = match raw {
        RawValue::Integer(v) => u64::try_from(*v).ok(),
        RawValue::Text(text) => {
            let text = text.trim();
            text.strip_prefix('#').unwrap_or(text).parse::<u64>().ok()
        }
        _ => None,
    };
    match parsed {
        Some(id) => ValidationOutcome::accept(AttributeValue::ElementId(ElementId(id)), Vec::new()),
        None => ValidationOutcome::reject(
            Vec::new(),
            format!("{}: '{}' is not an element id", name, raw),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn validate(name: &str, raw: impl Into<RawValue>, declared: DeclaredType) -> ValidationOutcome {
        ParameterValidator::default().validate(name, &raw.into(), declared)
    }

    #[test]
    fn test_semantic_families() {
        assert_eq!(SemanticFamily::of("Width"), SemanticFamily::Length);
        assert_eq!(SemanticFamily::of("b"), SemanticFamily::Length);
        assert_eq!(SemanticFamily::of("Gross Area"), SemanticFamily::Area);
        assert_eq!(SemanticFamily::of("Netto Fläche"), SemanticFamily::Area);
        assert_eq!(SemanticFamily::of("Roof Slope"), SemanticFamily::Angle);
        assert_eq!(SemanticFamily::of("Fill %"), SemanticFamily::Percentage);
        assert_eq!(SemanticFamily::of("Anzahl"), SemanticFamily::Count);
        assert_eq!(SemanticFamily::of("Material"), SemanticFamily::Material);
        assert_eq!(SemanticFamily::of("Comments"), SemanticFamily::Text);
        assert_eq!(SemanticFamily::of("Fire Rating"), SemanticFamily::General);
    }

    #[test]
    fn test_length_with_unit_is_converted() {
        let outcome = validate("Width", "300 mm", DeclaredType::Length);
        assert!(outcome.is_valid);
        assert_eq!(outcome.normalized_value, Some(AttributeValue::Double(300.0)));
        assert!(outcome.warnings.is_empty());

        let outcome = validate("Width", "0.3 m", DeclaredType::Length);
        assert!(outcome.is_valid);
        assert_relative_eq!(outcome.normalized_value.unwrap().as_f64().unwrap(), 300.0, epsilon = 1e-9);
        assert_eq!(outcome.warnings.len(), 1);
        assert!(outcome.warnings[0].contains("converted"));
    }

    #[test]
    fn test_area_uses_squared_factor() {
        let options = ValidationOptions::default().with_units(LengthUnit::Meter, AngleUnit::Degree);
        let raw = RawValue::from("2500 cm2");
        let outcome = ParameterValidator::validate_with("Area", &raw, DeclaredType::Area, &options);
        assert!(outcome.is_valid);
        assert_relative_eq!(outcome.normalized_value.unwrap().as_f64().unwrap(), 0.25, epsilon = 1e-12);
    }

    #[test]
    fn test_wrong_dimension_is_rejected() {
        let outcome = validate("Width", "2 m2", DeclaredType::Length);
        assert!(!outcome.is_valid);
        assert!(outcome.normalized_value.is_none());
        assert!(outcome.reason().unwrap().contains("does not fit"));
    }

    #[test]
    fn test_numeric_rejections() {
        assert!(!validate("Height", -5.0, DeclaredType::Length).is_valid);
        assert!(!validate("Fill %", 120.0, DeclaredType::Number).is_valid);
        assert!(!validate("Width", "wide", DeclaredType::Length).is_valid);
        assert!(!validate("Width", true, DeclaredType::Length).is_valid);
        assert!(!validate("Width", f64::NAN, DeclaredType::Length).is_valid);
    }

    #[test]
    fn test_large_angle_only_warns() {
        let outcome = validate("Rotation", "400 deg", DeclaredType::Angle);
        assert!(outcome.is_valid);
        assert_eq!(outcome.warnings.len(), 1);
    }

    #[test]
    fn test_integer_tokens() {
        for (token, expected) in [("yes", 1), ("Off", 0), ("TRUE", 1), ("0", 0), ("42", 42), ("7.0", 7)] {
            let outcome = validate("Flag", token, DeclaredType::Integer);
            assert!(outcome.is_valid, "{}", token);
            assert_eq!(outcome.normalized_value, Some(AttributeValue::Integer(expected)));
        }
        assert!(!validate("Flag", "maybe", DeclaredType::Integer).is_valid);
        assert!(!validate("Flag", 2.5, DeclaredType::Integer).is_valid);
    }

    #[test]
    fn test_yes_no_and_count_ranges() {
        assert!(validate("Visible", 1i64, DeclaredType::YesNo).is_valid);
        assert!(!validate("Visible", 2i64, DeclaredType::YesNo).is_valid);
        assert!(!validate("Count", -1i64, DeclaredType::Integer).is_valid);
    }

    #[test]
    fn test_text_limits() {
        let options = ValidationOptions::default().with_max_text_length(5);
        let ok = ParameterValidator::validate_with("Mark", &"Höhe!".into(), DeclaredType::Text, &options);
        assert!(ok.is_valid);
        let long = ParameterValidator::validate_with("Mark", &"toolong".into(), DeclaredType::Text, &options);
        assert!(!long.is_valid);
        assert!(long.reason().unwrap().contains("limit is 5"));
    }

    #[test]
    fn test_text_pattern() {
        let options = ValidationOptions::default().with_pattern(r"^[A-Z]{2}-\d+$").unwrap();
        let validator = ParameterValidator::new(options);
        assert!(validator.validate("Mark", &"WD-12".into(), DeclaredType::Text).is_valid);
        assert!(!validator.validate("Mark", &"wd12".into(), DeclaredType::Text).is_valid);

        let err = ValidationOptions::default().with_pattern("([").unwrap_err();
        assert!(matches!(err, Error::InvalidPattern { ref pattern, .. } if pattern == "(["));
    }

    #[test]
    fn test_text_from_number_warns() {
        let outcome = validate("Comments", 12i64, DeclaredType::Text);
        assert!(outcome.is_valid);
        assert_eq!(outcome.normalized_value, Some(AttributeValue::text("12")));
        assert_eq!(outcome.warnings.len(), 1);

        let empty_material = validate("Material", "  ", DeclaredType::Text);
        assert!(empty_material.is_valid);
        assert_eq!(empty_material.warnings.len(), 1);
    }

    #[test]
    fn test_element_id() {
        let outcome = validate("Host", "#17", DeclaredType::ElementId);
        assert_eq!(outcome.normalized_value, Some(AttributeValue::ElementId(ElementId(17))));
        assert!(!validate("Host", -1i64, DeclaredType::ElementId).is_valid);
    }

    #[test]
    fn test_explicit_range() {
        let options = ValidationOptions::default().with_range(Some(10.0), Some(20.0));
        let validator = ParameterValidator::new(options);
        assert!(validator.validate("Offset", &15.0.into(), DeclaredType::Length).is_valid);
        assert!(!validator.validate("Offset", &25.0.into(), DeclaredType::Length).is_valid);
    }
}
