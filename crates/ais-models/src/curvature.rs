//! Curvature pattern classification.
//!
//! Each of the three angles is thresholded into [`Curvature::Straight`] or
//! [`Curvature::Bent`]; the ordered triple is then looked up in a fixed table
//! of six clinical categories:
//!
//! | Pattern                  | Class           |
//! |--------------------------|-----------------|
//! | Straight-Straight-Straight | Normal        |
//! | Straight-Bent-Straight   | Thoracic        |
//! | Bent-Bent-Straight       | Double Thoracic |
//! | Straight-Bent-Bent       | Double major    |
//! | Bent-Bent-Bent           | Triple curve    |
//! | Straight-Straight-Bent   | Lumbar          |
//!
//! The remaining two patterns have no clinical mapping and classify as
//! [`CurvatureClass::Undefined`].

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::angles::AngleTriple;

/// Default straight/bent threshold in degrees.
///
/// Deployments have used both 5 and 8; callers pass the threshold explicitly.
pub const DEFAULT_CURVE_THRESHOLD: f64 = 5.0;

/// Shape of a single spinal segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum Curvature {
    Straight,
    Bent,
}

impl Curvature {
    /// `Straight` when `value <= threshold`, otherwise `Bent`.
    pub fn of(value: f64, threshold: f64) -> Self {
        if value <= threshold {
            Curvature::Straight
        } else {
            Curvature::Bent
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Curvature::Straight => "Straight",
            Curvature::Bent => "Bent",
        }
    }
}

impl fmt::Display for Curvature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Curvature {
    type Err = PatternParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Straight" => Ok(Curvature::Straight),
            "Bent" => Ok(Curvature::Bent),
            _ => Err(PatternParseError(s.to_string())),
        }
    }
}

/// Ordered curvature of the proximal thoracic, main thoracic and lumbar segments.
///
/// Serialized as its pattern key, e.g. `"Straight-Bent-Straight"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct CurvaturePattern(pub [Curvature; 3]);

impl CurvaturePattern {
    /// Threshold each angle independently against the same threshold.
    pub fn from_angles(angles: [f64; 3], threshold: f64) -> Self {
        Self(angles.map(|value| Curvature::of(value, threshold)))
    }

    pub fn labels(&self) -> &[Curvature; 3] {
        &self.0
    }

    /// Pattern key used in logs and responses.
    pub fn key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for CurvaturePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c] = self.0;
        write!(f, "{}-{}-{}", a, b, c)
    }
}

impl FromStr for CurvaturePattern {
    type Err = PatternParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('-').collect();
        match parts.as_slice() {
            [a, b, c] => Ok(Self([a.parse()?, b.parse()?, c.parse()?])),
            _ => Err(PatternParseError(s.to_string())),
        }
    }
}

impl From<CurvaturePattern> for String {
    fn from(pattern: CurvaturePattern) -> Self {
        pattern.to_string()
    }
}

impl TryFrom<String> for CurvaturePattern {
    type Error = PatternParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Error)]
#[error("Invalid curvature pattern: {0}")]
pub struct PatternParseError(String);

/// Clinical curvature category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum CurvatureClass {
    #[serde(rename = "Normal")]
    Normal,
    #[serde(rename = "Thoracic")]
    Thoracic,
    #[serde(rename = "Double Thoracic")]
    DoubleThoracic,
    #[serde(rename = "Double major")]
    DoubleMajor,
    #[serde(rename = "Triple curve")]
    TripleCurve,
    #[serde(rename = "Lumbar")]
    Lumbar,
    /// Pattern has no entry in the lookup table.
    #[serde(rename = "Undefined")]
    Undefined,
}

impl CurvatureClass {
    /// Exact lookup; no partial matches.
    pub fn from_pattern(pattern: &CurvaturePattern) -> Self {
        use Curvature::{Bent, Straight};

        match pattern.0 {
            [Straight, Straight, Straight] => CurvatureClass::Normal,
            [Straight, Bent, Straight] => CurvatureClass::Thoracic,
            [Bent, Bent, Straight] => CurvatureClass::DoubleThoracic,
            [Straight, Bent, Bent] => CurvatureClass::DoubleMajor,
            [Bent, Bent, Bent] => CurvatureClass::TripleCurve,
            [Straight, Straight, Bent] => CurvatureClass::Lumbar,
            [Bent, Straight, Straight] | [Bent, Straight, Bent] => CurvatureClass::Undefined,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CurvatureClass::Normal => "Normal",
            CurvatureClass::Thoracic => "Thoracic",
            CurvatureClass::DoubleThoracic => "Double Thoracic",
            CurvatureClass::DoubleMajor => "Double major",
            CurvatureClass::TripleCurve => "Triple curve",
            CurvatureClass::Lumbar => "Lumbar",
            CurvatureClass::Undefined => "Undefined",
        }
    }

    pub fn is_defined(&self) -> bool {
        !matches!(self, CurvatureClass::Undefined)
    }
}

impl fmt::Display for CurvatureClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classifier output.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Classification {
    pub class: CurvatureClass,
    /// Computed pattern, reported for every class including `Undefined`.
    #[schemars(with = "String")]
    pub pattern: CurvaturePattern,
    pub threshold: f64,
}

impl Classification {
    /// Human-readable result line.
    pub fn summary(&self) -> String {
        if self.class.is_defined() {
            format!("Result: {} ({})", self.class, self.pattern)
        } else {
            format!(
                "Result: Undefined pattern ({}). Please define a mapping if needed.",
                self.pattern
            )
        }
    }
}

/// Classify three angles (proximal thoracic, main thoracic, lumbar).
pub fn classify(a: f64, b: f64, c: f64, threshold: f64) -> Classification {
    let pattern = CurvaturePattern::from_angles([a, b, c], threshold);
    Classification {
        class: CurvatureClass::from_pattern(&pattern),
        pattern,
        threshold,
    }
}

/// Classify a regression result.
pub fn classify_angles(angles: &AngleTriple, threshold: f64) -> Classification {
    let [a, b, c] = angles.as_array();
    classify(a, b, c, threshold)
}
