#![forbid(unsafe_code)]

//! Exact rational numbers over arbitrary-precision integers.
//!
//! [`Rational`] wraps [`BigRational`], which keeps every value in lowest
//! terms with a strictly positive denominator. The wrapper narrows the API to
//! named, non-panicking operations: every division reports a zero divisor as
//! [`RationalError`] instead of panicking. Comparison never goes through
//! floating point; [`Rational::to_display_float`] exists for diagnostics only.

use std::fmt;
use std::str::FromStr;

use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{One, Signed, ToPrimitive, Zero};

/// Errors from rational construction and arithmetic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RationalError {
    /// Construction with a zero denominator.
    InvalidFraction,
    /// Division by (or reciprocal of) a zero-valued rational.
    DivisionByZero,
    /// Text that is not `n` or `n/d`.
    Parse { input: String, reason: String },
}

impl fmt::Display for RationalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidFraction => write!(f, "invalid fraction: denominator is zero"),
            Self::DivisionByZero => write!(f, "division by zero"),
            Self::Parse { input, reason } => {
                write!(f, "cannot parse {input:?} as a rational: {reason}")
            }
        }
    }
}

impl std::error::Error for RationalError {}

/// Exact fraction in reduced form with a positive denominator.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Rational(BigRational);

impl Rational {
    /// Create and reduce a fraction, rejecting a zero denominator.
    pub fn new(numer: impl Into<BigInt>, denom: impl Into<BigInt>) -> Result<Self, RationalError> {
        let denom = denom.into();
        if denom.is_zero() {
            return Err(RationalError::InvalidFraction);
        }
        Ok(Self(BigRational::new(numer.into(), denom)))
    }

    /// `1 / denom` for a positive integer denominator.
    #[must_use]
    pub fn unit_fraction(denom: std::num::NonZeroU64) -> Self {
        Self(BigRational::new(BigInt::one(), BigInt::from(denom.get())))
    }

    /// Whole number `value / 1`.
    #[must_use]
    pub fn from_integer(value: impl Into<BigInt>) -> Self {
        Self(BigRational::from_integer(value.into()))
    }

    #[must_use]
    pub fn zero() -> Self {
        Self(BigRational::zero())
    }

    #[must_use]
    pub fn one() -> Self {
        Self(BigRational::one())
    }

    /// Numerator (carries the sign).
    #[must_use]
    pub fn numer(&self) -> &BigInt {
        self.0.numer()
    }

    /// Denominator (always > 0).
    #[must_use]
    pub fn denom(&self) -> &BigInt {
        self.0.denom()
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    #[must_use]
    pub fn is_one(&self) -> bool {
        self.0.is_one()
    }

    #[must_use]
    pub fn is_positive(&self) -> bool {
        self.0.is_positive()
    }

    #[must_use]
    pub fn is_negative(&self) -> bool {
        self.0.is_negative()
    }

    /// `self + rhs`.
    #[allow(clippy::should_implement_trait)]
    #[must_use]
    pub fn add(&self, rhs: &Self) -> Self {
        Self(&self.0 + &rhs.0)
    }

    /// `self - rhs`.
    #[allow(clippy::should_implement_trait)]
    #[must_use]
    pub fn sub(&self, rhs: &Self) -> Self {
        Self(&self.0 - &rhs.0)
    }

    /// `self * rhs`.
    #[allow(clippy::should_implement_trait)]
    #[must_use]
    pub fn mul(&self, rhs: &Self) -> Self {
        Self(&self.0 * &rhs.0)
    }

    /// `self / rhs`, failing when `rhs` is zero.
    #[allow(clippy::should_implement_trait)]
    pub fn div(&self, rhs: &Self) -> Result<Self, RationalError> {
        if rhs.is_zero() {
            return Err(RationalError::DivisionByZero);
        }
        Ok(Self(&self.0 / &rhs.0))
    }

    /// Divide by a non-zero integer count.
    pub fn div_integer(&self, divisor: impl Into<BigInt>) -> Result<Self, RationalError> {
        let divisor = divisor.into();
        if divisor.is_zero() {
            return Err(RationalError::DivisionByZero);
        }
        Ok(Self(&self.0 / BigRational::from_integer(divisor)))
    }

    /// `1 / self`.
    pub fn recip(&self) -> Result<Self, RationalError> {
        if self.is_zero() {
            return Err(RationalError::DivisionByZero);
        }
        Ok(Self(self.0.recip()))
    }

    /// Smallest integer `>= self`.
    #[must_use]
    pub fn ceil(&self) -> BigInt {
        self.0.ceil().to_integer()
    }

    /// Lossy conversion for logs and rendering. Never feed the result back
    /// into mass computations.
    #[must_use]
    pub fn to_display_float(&self) -> f64 {
        self.0.to_f64().unwrap_or(f64::NAN)
    }
}

impl Default for Rational {
    fn default() -> Self {
        Self::zero()
    }
}

impl From<i64> for Rational {
    fn from(value: i64) -> Self {
        Self::from_integer(value)
    }
}

impl From<BigInt> for Rational {
    fn from(value: BigInt) -> Self {
        Self::from_integer(value)
    }
}

impl From<BigRational> for Rational {
    fn from(value: BigRational) -> Self {
        Self(value)
    }
}

impl<'a> std::iter::Sum<&'a Rational> for Rational {
    fn sum<I: Iterator<Item = &'a Rational>>(iter: I) -> Self {
        Self(iter.map(|value| &value.0).sum())
    }
}

impl std::iter::Sum<Rational> for Rational {
    fn sum<I: Iterator<Item = Rational>>(iter: I) -> Self {
        Self(iter.map(|value| value.0).sum())
    }
}

impl fmt::Display for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for Rational {
    type Err = RationalError;

    /// Parse `n` or `n/d`, ignoring surrounding whitespace.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<BigRational>()
            .map(Self)
            .map_err(|err| RationalError::Parse {
                input: s.to_string(),
                reason: err.to_string(),
            })
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Rational {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for Rational {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = <String as serde::Deserialize>::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}
