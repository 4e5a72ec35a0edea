//! Request handlers.

pub mod angle;
pub mod health;

pub use angle::*;
pub use health::*;
