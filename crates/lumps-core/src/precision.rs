#![forbid(unsafe_code)]

//! Precision bound ("vantage") value type.
//!
//! A precision bound is the largest denominator a block currently commits to
//! representing. It is a positive arbitrary-precision integer: refinement
//! computes it from `1 / mass`, and masses shrink without limit as flow
//! compounds denominators.

use std::fmt;

use num_bigint::{BigInt, BigUint};
use num_rational::BigRational;
use num_traits::{One, Zero};

use crate::rational::Rational;

/// Positive integer precision bound.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PrecisionBound(BigUint);

impl PrecisionBound {
    /// Default bound for freshly created blocks.
    pub const DEFAULT_RAW: u64 = 100;

    /// Create a bound, rejecting 0.
    #[must_use]
    pub fn new(raw: u64) -> Option<Self> {
        if raw == 0 {
            return None;
        }
        Some(Self(BigUint::from(raw)))
    }

    /// Create a bound from a big integer, rejecting values `< 1`.
    #[must_use]
    pub fn from_bigint(raw: &BigInt) -> Option<Self> {
        raw.to_biguint()
            .filter(|value| !value.is_zero())
            .map(Self)
    }

    /// Raw value.
    #[must_use]
    pub fn get(&self) -> &BigUint {
        &self.0
    }

    /// The bound plus one.
    #[must_use]
    pub fn successor(&self) -> Self {
        Self(&self.0 + BigUint::one())
    }

    /// Smallest mass representable at this bound: `1 / bound`.
    #[must_use]
    pub fn resolution(&self) -> Rational {
        // The bound is never zero, so this denominator is always valid.
        Rational::from(BigRational::new(BigInt::one(), BigInt::from(self.0.clone())))
    }
}

impl Default for PrecisionBound {
    fn default() -> Self {
        Self(BigUint::from(Self::DEFAULT_RAW))
    }
}

impl fmt::Display for PrecisionBound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for PrecisionBound {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.0)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for PrecisionBound {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = <String as serde::Deserialize>::deserialize(deserializer)?;
        let value = text
            .trim()
            .parse::<BigUint>()
            .map_err(serde::de::Error::custom)?;
        if value.is_zero() {
            return Err(serde::de::Error::custom("precision bound must be positive"));
        }
        Ok(Self(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_is_rejected() {
        assert!(PrecisionBound::new(0).is_none());
        assert!(PrecisionBound::from_bigint(&BigInt::from(0)).is_none());
        assert!(PrecisionBound::from_bigint(&BigInt::from(-4)).is_none());
    }

    #[test]
    fn successor_strictly_grows() {
        let bound = PrecisionBound::new(50).expect("non-zero");
        assert!(bound.successor() > bound);
        assert_eq!(bound.successor().to_string(), "51");
    }

    #[test]
    fn resolution_is_reciprocal() {
        let bound = PrecisionBound::new(8).expect("non-zero");
        assert_eq!(bound.resolution(), Rational::new(1, 8).expect("valid"));
        assert_eq!(PrecisionBound::default().to_string(), "100");
    }
}
