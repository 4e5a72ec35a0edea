//! Spinal curvature angles produced by the regression model.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Angle names in output order.
pub const ANGLE_NAMES: [&str; 3] = ["proximal_thoracic", "main_thoracic", "lumbar"];

/// The three curvature angles, in degrees.
///
/// Serializes to the `/angle/` response body as-is.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct AngleTriple {
    pub proximal_thoracic: f64,
    pub main_thoracic: f64,
    pub lumbar: f64,
}

impl AngleTriple {
    pub fn new(proximal_thoracic: f64, main_thoracic: f64, lumbar: f64) -> Self {
        Self {
            proximal_thoracic,
            main_thoracic,
            lumbar,
        }
    }

    /// Angles in fixed order: proximal thoracic, main thoracic, lumbar.
    pub fn as_array(&self) -> [f64; 3] {
        [self.proximal_thoracic, self.main_thoracic, self.lumbar]
    }

    /// Multiply each component by its own factor.
    pub fn scaled(&self, factors: [f64; 3]) -> Self {
        Self {
            proximal_thoracic: self.proximal_thoracic * factors[0],
            main_thoracic: self.main_thoracic * factors[1],
            lumbar: self.lumbar * factors[2],
        }
    }
}

impl From<[f64; 3]> for AngleTriple {
    fn from(values: [f64; 3]) -> Self {
        Self::new(values[0], values[1], values[2])
    }
}

impl fmt::Display for AngleTriple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "proximal_thoracic={:.2}, main_thoracic={:.2}, lumbar={:.2}",
            self.proximal_thoracic, self.main_thoracic, self.lumbar
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serializes_with_endpoint_keys() {
        let angles = AngleTriple::new(1.5, 20.0, 12.25);
        let json = serde_json::to_value(angles).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "proximal_thoracic": 1.5,
                "main_thoracic": 20.0,
                "lumbar": 12.25
            })
        );
    }

    #[test]
    fn test_scaled() {
        let angles = AngleTriple::new(0.5, 0.5, 0.25).scaled([40.0, 65.0, 70.0]);
        assert_eq!(angles.as_array(), [20.0, 32.5, 17.5]);
    }

    #[test]
    fn test_order_matches_names() {
        let angles = AngleTriple::from([1.0, 2.0, 3.0]);
        assert_eq!(angles.as_array(), [1.0, 2.0, 3.0]);
        assert_eq!(ANGLE_NAMES[0], "proximal_thoracic");
        assert_eq!(ANGLE_NAMES[2], "lumbar");
    }
}
