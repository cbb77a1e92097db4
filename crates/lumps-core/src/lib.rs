#![forbid(unsafe_code)]

//! Core value types for lumps: exact rationals, precision bounds, and
//! inclusive grid rectangles.

pub mod geometry;
pub mod precision;
pub mod rational;

pub use geometry::{Bounds, BoundsError};
pub use precision::PrecisionBound;
pub use rational::{Rational, RationalError};
