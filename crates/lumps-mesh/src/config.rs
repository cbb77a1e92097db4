#![forbid(unsafe_code)]

//! Simulation configuration.
//!
//! # Environment Variables
//!
//! | Variable | Format | Default |
//! |----------|--------|---------|
//! | `LUMPS_DOMAIN` | `WxH` | `16x16` |
//! | `LUMPS_INITIAL_MASS` | `n` or `n/d` | `1` |
//! | `LUMPS_PRECISION` | positive integer | `100` |
//! | `LUMPS_ALPHA` | `n/d` in `[0, 1]` | `1/10` |
//! | `LUMPS_BOUNDARY` | `open` / `closed` | `open` |
//! | `LUMPS_SPLIT_THRESHOLD` | `n/d` in `[0, 1]` | `1/5` |
//! | `LUMPS_MERGE_THRESHOLD` | `n/d` in `[0, 1]` | `1/300` |
//! | `LUMPS_SPLIT_SHARE` | `quarter` / `surviving` | `quarter` |
//!
//! Unset variables keep their defaults; malformed values are errors rather
//! than silently ignored.

use std::env;
use std::fmt;
use std::num::NonZeroU64;

use lumps_core::{PrecisionBound, Rational};
use serde::{Deserialize, Serialize};

use crate::adapt::{SplitShare, Thresholds};
use crate::error::MeshError;
use crate::flow::{Boundary, check_alpha};

pub const ENV_DOMAIN: &str = "LUMPS_DOMAIN";
pub const ENV_INITIAL_MASS: &str = "LUMPS_INITIAL_MASS";
pub const ENV_PRECISION: &str = "LUMPS_PRECISION";
pub const ENV_ALPHA: &str = "LUMPS_ALPHA";
pub const ENV_BOUNDARY: &str = "LUMPS_BOUNDARY";
pub const ENV_SPLIT_THRESHOLD: &str = "LUMPS_SPLIT_THRESHOLD";
pub const ENV_MERGE_THRESHOLD: &str = "LUMPS_MERGE_THRESHOLD";
pub const ENV_SPLIT_SHARE: &str = "LUMPS_SPLIT_SHARE";

const DEFAULT_ALPHA_DENOM: NonZeroU64 = NonZeroU64::new(10).expect("10 is non-zero");

/// A configuration value that could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    pub key: &'static str,
    pub value: String,
    pub reason: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={:?}: {}", self.key, self.value, self.reason)
    }
}

impl std::error::Error for ConfigError {}

/// Everything needed to build a domain and drive ticks over it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub x_extent: u32,
    pub y_extent: u32,
    pub initial_mass: Rational,
    pub initial_precision: PrecisionBound,
    /// Fraction of each leaf's mass sent to neighbors per tick.
    pub alpha: Rational,
    pub boundary: Boundary,
    pub split_threshold: Rational,
    pub merge_threshold: Rational,
    pub split_share: SplitShare,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        let thresholds = Thresholds::default();
        Self {
            x_extent: 16,
            y_extent: 16,
            initial_mass: Rational::one(),
            initial_precision: PrecisionBound::default(),
            alpha: Rational::unit_fraction(DEFAULT_ALPHA_DENOM),
            boundary: Boundary::Open,
            split_threshold: thresholds.split().clone(),
            merge_threshold: thresholds.merge().clone(),
            split_share: SplitShare::Quarter,
        }
    }
}

impl SimulationConfig {
    #[must_use]
    pub fn with_domain(mut self, x_extent: u32, y_extent: u32) -> Self {
        self.x_extent = x_extent;
        self.y_extent = y_extent;
        self
    }

    #[must_use]
    pub fn with_initial_mass(mut self, mass: Rational) -> Self {
        self.initial_mass = mass;
        self
    }

    #[must_use]
    pub fn with_initial_precision(mut self, precision: PrecisionBound) -> Self {
        self.initial_precision = precision;
        self
    }

    #[must_use]
    pub fn with_alpha(mut self, alpha: Rational) -> Self {
        self.alpha = alpha;
        self
    }

    #[must_use]
    pub fn with_boundary(mut self, boundary: Boundary) -> Self {
        self.boundary = boundary;
        self
    }

    #[must_use]
    pub fn with_thresholds(mut self, split: Rational, merge: Rational) -> Self {
        self.split_threshold = split;
        self.merge_threshold = merge;
        self
    }

    #[must_use]
    pub fn with_split_share(mut self, share: SplitShare) -> Self {
        self.split_share = share;
        self
    }

    /// Validated thresholds.
    pub fn thresholds(&self) -> Result<Thresholds, MeshError> {
        Thresholds::new(self.split_threshold.clone(), self.merge_threshold.clone())
    }

    /// Reject out-of-range values.
    pub fn validate(&self) -> Result<(), MeshError> {
        if self.x_extent == 0 || self.y_extent == 0 {
            return Err(MeshError::Bounds(lumps_core::BoundsError::ZeroExtent {
                axis: if self.x_extent == 0 { "x" } else { "y" },
            }));
        }
        if self.initial_mass.is_negative() {
            return Err(MeshError::NegativeMass {
                mass: self.initial_mass.clone(),
            });
        }
        check_alpha(&self.alpha)?;
        self.thresholds()?;
        Ok(())
    }

    /// Defaults overridden by `LUMPS_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each `LUMPS_*`
    /// key. Lets callers supply variables from somewhere other than the
    /// process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup(ENV_DOMAIN) {
            let (x, y) = parse_domain(&raw).ok_or_else(|| ConfigError {
                key: ENV_DOMAIN,
                value: raw.clone(),
                reason: "expected WxH with positive integers".to_string(),
            })?;
            config.x_extent = x;
            config.y_extent = y;
        }
        if let Some(raw) = lookup(ENV_INITIAL_MASS) {
            config.initial_mass = parse_rational(ENV_INITIAL_MASS, &raw)?;
        }
        if let Some(raw) = lookup(ENV_PRECISION) {
            config.initial_precision = raw
                .trim()
                .parse::<u64>()
                .ok()
                .and_then(PrecisionBound::new)
                .ok_or_else(|| ConfigError {
                    key: ENV_PRECISION,
                    value: raw.clone(),
                    reason: "expected a positive integer".to_string(),
                })?;
        }
        if let Some(raw) = lookup(ENV_ALPHA) {
            config.alpha = parse_rational(ENV_ALPHA, &raw)?;
        }
        if let Some(raw) = lookup(ENV_BOUNDARY) {
            config.boundary = raw.parse().map_err(|reason| ConfigError {
                key: ENV_BOUNDARY,
                value: raw.clone(),
                reason,
            })?;
        }
        if let Some(raw) = lookup(ENV_SPLIT_THRESHOLD) {
            config.split_threshold = parse_rational(ENV_SPLIT_THRESHOLD, &raw)?;
        }
        if let Some(raw) = lookup(ENV_MERGE_THRESHOLD) {
            config.merge_threshold = parse_rational(ENV_MERGE_THRESHOLD, &raw)?;
        }
        if let Some(raw) = lookup(ENV_SPLIT_SHARE) {
            config.split_share = raw.parse().map_err(|reason| ConfigError {
                key: ENV_SPLIT_SHARE,
                value: raw.clone(),
                reason,
            })?;
        }

        Ok(config)
    }
}

fn parse_rational(key: &'static str, raw: &str) -> Result<Rational, ConfigError> {
    raw.parse().map_err(|err: lumps_core::RationalError| ConfigError {
        key,
        value: raw.to_string(),
        reason: err.to_string(),
    })
}

fn parse_domain(raw: &str) -> Option<(u32, u32)> {
    let (x, y) = raw.trim().split_once(['x', 'X'])?;
    let x = x.trim().parse::<u32>().ok().filter(|v| *v > 0)?;
    let y = y.trim().parse::<u32>().ok().filter(|v| *v > 0)?;
    Some((x, y))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn q(n: i64, d: i64) -> Rational {
        Rational::new(n, d).expect("valid test fraction")
    }

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_reference_run() {
        let config = SimulationConfig::default();
        assert_eq!((config.x_extent, config.y_extent), (16, 16));
        assert_eq!(config.alpha, q(1, 10));
        assert_eq!(config.boundary, Boundary::Open);
        assert_eq!(config.split_threshold, q(1, 5));
        assert_eq!(config.merge_threshold, q(1, 300));
        assert_eq!(config.split_share, SplitShare::Quarter);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn lookup_overrides_defaults() {
        let config = SimulationConfig::from_lookup(lookup_from(&[
            (ENV_DOMAIN, "8x4"),
            (ENV_ALPHA, "1/4"),
            (ENV_BOUNDARY, "closed"),
            (ENV_MERGE_THRESHOLD, "1/200"),
            (ENV_PRECISION, "50"),
            (ENV_SPLIT_SHARE, "surviving"),
        ]))
        .expect("valid overrides");
        assert_eq!((config.x_extent, config.y_extent), (8, 4));
        assert_eq!(config.alpha, q(1, 4));
        assert_eq!(config.boundary, Boundary::Closed);
        assert_eq!(config.merge_threshold, q(1, 200));
        assert_eq!(config.initial_precision.to_string(), "50");
        assert_eq!(config.split_share, SplitShare::Surviving);
        assert_eq!(config.split_threshold, q(1, 5));
    }

    #[test]
    fn malformed_values_are_reported() {
        let err = SimulationConfig::from_lookup(lookup_from(&[(ENV_DOMAIN, "16 by 16")]))
            .expect_err("bad domain");
        assert_eq!(err.key, ENV_DOMAIN);

        let err = SimulationConfig::from_lookup(lookup_from(&[(ENV_ALPHA, "1/0")]))
            .expect_err("zero denominator");
        assert_eq!(err.key, ENV_ALPHA);

        let err = SimulationConfig::from_lookup(lookup_from(&[(ENV_PRECISION, "0")]))
            .expect_err("zero precision");
        assert_eq!(err.key, ENV_PRECISION);

        let err = SimulationConfig::from_lookup(lookup_from(&[(ENV_BOUNDARY, "wrap")]))
            .expect_err("unknown boundary");
        assert!(err.to_string().contains("LUMPS_BOUNDARY"));
    }

    #[test]
    fn validate_rejects_out_of_range() {
        let config = SimulationConfig::default().with_alpha(q(3, 2));
        assert_eq!(
            config.validate(),
            Err(MeshError::AlphaOutOfRange { alpha: q(3, 2) })
        );
        let config = SimulationConfig::default().with_thresholds(q(1, 5), q(2, 1));
        assert!(matches!(
            config.validate(),
            Err(MeshError::ThresholdOutOfRange { name: "merge", .. })
        ));
        let config = SimulationConfig::default().with_domain(0, 4);
        assert!(matches!(config.validate(), Err(MeshError::Bounds(_))));
    }

    #[test]
    fn config_round_trips_through_json() {
        let config = SimulationConfig::default().with_boundary(Boundary::Closed);
        let json = serde_json::to_value(&config).expect("serialize");
        assert_eq!(json["alpha"], serde_json::json!("1/10"));
        assert_eq!(json["boundary"], serde_json::json!("closed"));
        let back: SimulationConfig = serde_json::from_value(json).expect("deserialize");
        assert_eq!(back, config);
    }
}
