//! Shared data models for the AIS angle service.
//!
//! This crate provides Serde-serializable types for:
//! - Regression output (the three spinal curvature angles)
//! - Curvature patterns and clinical classification labels
//! - The classifier that maps angles to a label

pub mod angles;
pub mod curvature;

// Re-export common types
pub use angles::{AngleTriple, ANGLE_NAMES};
pub use curvature::{
    classify, classify_angles, Classification, Curvature, CurvatureClass, CurvaturePattern,
    PatternParseError, DEFAULT_CURVE_THRESHOLD,
};
