// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Shape classification
//!
//! Decides a coarse shape class for an element from an ordered list of
//! resolvers, stopping at the first one that answers:
//!
//! 1. the whole family/type name equals a keyword
//! 2. one token of the name (split on `-`, `_`, space) equals a keyword
//! 3. numeric width/height/diameter attributes
//!
//! Naming conventions differ between authoring tools, so the numeric
//! evidence is the fallback when names say nothing useful.

use bimsync_core::{lookup_number, ElementId, ElementSource, LengthUnit};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Dimension key for width (or the side of a square)
pub const WIDTH: &str = "width";
/// Dimension key for height
pub const HEIGHT: &str = "height";
/// Dimension key for diameter
pub const DIAMETER: &str = "diameter";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShapeClass {
    Circular,
    Square,
    Rectangular,
    Unknown,
}

impl ShapeClass {
    /// Dimension keys compared for this class.
    pub fn compared_fields(self) -> &'static [&'static str] {
        match self {
            ShapeClass::Circular => &[DIAMETER],
            ShapeClass::Square => &[WIDTH],
            ShapeClass::Rectangular => &[WIDTH, HEIGHT],
            ShapeClass::Unknown => &[],
        }
    }
}

impl fmt::Display for ShapeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ShapeClass::Circular => "Circular",
            ShapeClass::Square => "Square",
            ShapeClass::Rectangular => "Rectangular",
            ShapeClass::Unknown => "Unknown",
        };
        f.write_str(name)
    }
}

/// Shape class plus named length fields, tagged with their unit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShapeDescriptor {
    pub shape_class: ShapeClass,
    pub dims: BTreeMap<String, f64>,
    pub unit: LengthUnit,
}

impl ShapeDescriptor {
    pub fn unknown(unit: LengthUnit) -> Self {
        Self {
            shape_class: ShapeClass::Unknown,
            dims: BTreeMap::new(),
            unit,
        }
    }

    pub fn new(shape_class: ShapeClass, unit: LengthUnit) -> Self {
        Self {
            shape_class,
            dims: BTreeMap::new(),
            unit,
        }
    }

    pub fn with_dim(mut self, key: &str, value: f64) -> Self {
        self.dims.insert(key.to_string(), value);
        self
    }

    pub fn dim(&self, key: &str) -> Option<f64> {
        self.dims.get(key).copied()
    }

    /// Same descriptor with every length expressed in `unit`.
    pub fn in_unit(&self, unit: LengthUnit) -> Self {
        let factor = self.unit.factor_to(unit);
        Self {
            shape_class: self.shape_class,
            dims: self
                .dims
                .iter()
                .map(|(k, v)| (k.clone(), v * factor))
                .collect(),
            unit,
        }
    }
}

/// Keyword sets and attribute names the classifier looks for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub circular_keywords: Vec<String>,
    pub square_keywords: Vec<String>,
    pub rectangular_keywords: Vec<String>,
    /// Attribute names tried in order for the width
    pub width_fields: Vec<String>,
    pub height_fields: Vec<String>,
    pub diameter_fields: Vec<String>,
    /// Width and height closer than this (host units) make a square
    pub square_epsilon: f64,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            circular_keywords: strings(&["round", "circular", "circle", "rund", "kreis", "pipe", "cylinder"]),
            square_keywords: strings(&["square", "quadrat", "quadratisch"]),
            rectangular_keywords: strings(&["rectangular", "rectangle", "rect", "rechteck", "rechteckig"]),
            width_fields: strings(&["Width", "b", "Breite", "W"]),
            height_fields: strings(&["Height", "h", "Höhe", "H"]),
            diameter_fields: strings(&["Diameter", "d", "Durchmesser", "D"]),
            square_epsilon: 1e-6,
        }
    }
}

impl ClassifierConfig {
    /// Class whose keyword set contains `word` (case-insensitive).
    pub fn keyword_class(&self, word: &str) -> Option<ShapeClass> {
        let word = word.trim();
        if word.is_empty() {
            return None;
        }
        let hit = |set: &[String]| set.iter().any(|k| k.eq_ignore_ascii_case(word));
        if hit(&self.circular_keywords) {
            Some(ShapeClass::Circular)
        } else if hit(&self.square_keywords) {
            Some(ShapeClass::Square)
        } else if hit(&self.rectangular_keywords) {
            Some(ShapeClass::Rectangular)
        } else {
            None
        }
    }
}

/// Everything the resolvers may look at for one element.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShapeEvidence {
    pub name: Option<String>,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub diameter: Option<f64>,
}

/// One step of the resolution chain.
pub type Resolver = Box<dyn Fn(&ClassifierConfig, &ShapeEvidence) -> Option<ShapeClass> + Send + Sync>;

/// Whole-name keyword match.
pub fn resolve_by_name(config: &ClassifierConfig, evidence: &ShapeEvidence) -> Option<ShapeClass> {
    config.keyword_class(evidence.name.as_deref()?)
}

/// Token keyword match; the first matching token wins.
pub fn resolve_by_name_tokens(
    config: &ClassifierConfig,
    evidence: &ShapeEvidence,
) -> Option<ShapeClass> {
    evidence
        .name
        .as_deref()?
        .split(['-', '_', ' '])
        .find_map(|token| config.keyword_class(token))
}

/// Numeric fallback on width/height/diameter.
pub fn resolve_by_dimensions(
    config: &ClassifierConfig,
    evidence: &ShapeEvidence,
) -> Option<ShapeClass> {
    match (evidence.width, evidence.height) {
        (Some(w), Some(h)) if (w - h).abs() <= config.square_epsilon => Some(ShapeClass::Square),
        (Some(_), Some(_)) => Some(ShapeClass::Rectangular),
        (Some(_), None) => Some(ShapeClass::Square),
        _ if evidence.diameter.is_some() => Some(ShapeClass::Circular),
        _ => None,
    }
}

pub struct AttributeClassifier {
    config: ClassifierConfig,
    resolvers: Vec<Resolver>,
}

impl AttributeClassifier {
    pub fn new(config: ClassifierConfig) -> Self {
        Self {
            config,
            resolvers: vec![
                Box::new(resolve_by_name),
                Box::new(resolve_by_name_tokens),
                Box::new(resolve_by_dimensions),
            ],
        }
    }

    /// Append a resolver after the built-in ones.
    pub fn with_resolver<F>(mut self, resolver: F) -> Self
    where
        F: Fn(&ClassifierConfig, &ShapeEvidence) -> Option<ShapeClass> + Send + Sync + 'static,
    {
        self.resolvers.push(Box::new(resolver));
        self
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// Collect name and numeric evidence (instance first, then type).
    pub fn evidence<S: ElementSource + ?Sized>(&self, source: &S, element: ElementId) -> ShapeEvidence {
        ShapeEvidence {
            name: source.type_name(element),
            width: lookup_number(source, element, &self.config.width_fields),
            height: lookup_number(source, element, &self.config.height_fields),
            diameter: lookup_number(source, element, &self.config.diameter_fields),
        }
    }

    /// Run the resolver chain over already collected evidence.
    pub fn resolve(&self, evidence: &ShapeEvidence) -> ShapeClass {
        self.resolvers
            .iter()
            .find_map(|resolver| resolver(&self.config, evidence))
            .unwrap_or(ShapeClass::Unknown)
    }

    /// Classify an element whose lengths are stored in `unit`.
    pub fn classify<S: ElementSource + ?Sized>(
        &self,
        source: &S,
        element: ElementId,
        unit: LengthUnit,
    ) -> ShapeDescriptor {
        let evidence = self.evidence(source, element);
        let shape_class = self.resolve(&evidence);
        describe(shape_class, &evidence, unit)
    }
}

impl Default for AttributeClassifier {
    fn default() -> Self {
        Self::new(ClassifierConfig::default())
    }
}

fn describe(shape_class: ShapeClass, evidence: &ShapeEvidence, unit: LengthUnit) -> ShapeDescriptor {
    let mut descriptor = ShapeDescriptor::new(shape_class, unit);
    let mut put = |key: &str, value: Option<f64>| {
        if let Some(v) = value {
            descriptor.dims.insert(key.to_string(), v);
        }
    };
    match shape_class {
        ShapeClass::Circular => put(DIAMETER, evidence.diameter),
        ShapeClass::Square => put(WIDTH, evidence.width.or(evidence.height)),
        ShapeClass::Rectangular => {
            put(WIDTH, evidence.width);
            put(HEIGHT, evidence.height);
        }
        ShapeClass::Unknown => {
            put(WIDTH, evidence.width);
            put(HEIGHT, evidence.height);
            put(DIAMETER, evidence.diameter);
        }
    }
    descriptor
}
