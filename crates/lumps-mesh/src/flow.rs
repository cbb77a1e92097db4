#![forbid(unsafe_code)]

//! Proportional mass transfer between adjacent leaves.
//!
//! Every leaf sends `alpha` of its mass, split evenly, to its edge neighbors
//! and keeps the rest. The step reads one snapshot of all masses and writes
//! the new masses only after every transfer has been computed, so no leaf
//! sees another leaf's updated value within the same step.

use std::fmt;
use std::str::FromStr;

use lumps_core::{Bounds, Rational};
use serde::{Deserialize, Serialize};

use crate::error::MeshError;
use crate::neighbor::neighbor_map;
use crate::tree::{BlockId, BlockTree};

/// What happens to outflow from a leaf with no neighbors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Boundary {
    /// Outflow is discarded.
    #[default]
    Open,
    /// Outflow is reflected back into the leaf.
    Closed,
}

impl Boundary {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
        }
    }
}

impl fmt::Display for Boundary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Boundary {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "open" => Ok(Self::Open),
            "closed" => Ok(Self::Closed),
            other => Err(format!("unknown boundary {other:?} (open|closed)")),
        }
    }
}

/// Accounting for one flow step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlowReport {
    pub leaves: usize,
    pub isolated: usize,
    pub mass_before: Rational,
    pub mass_after: Rational,
    pub discarded: Rational,
}

/// Fail unless `alpha` lies in `[0, 1]`.
pub fn check_alpha(alpha: &Rational) -> Result<(), MeshError> {
    if alpha.is_negative() || *alpha > Rational::one() {
        return Err(MeshError::AlphaOutOfRange {
            alpha: alpha.clone(),
        });
    }
    Ok(())
}

impl BlockTree {
    /// Run one simultaneous flow step over all leaves.
    pub fn flow_step(
        &mut self,
        alpha: &Rational,
        boundary: Boundary,
    ) -> Result<FlowReport, MeshError> {
        check_alpha(alpha)?;

        let mut ids: Vec<BlockId> = Vec::new();
        let mut bounds: Vec<Bounds> = Vec::new();
        let mut old_mass: Vec<Rational> = Vec::new();
        for leaf in self.leaves_in_order() {
            if let Some(mass) = leaf.mass() {
                ids.push(leaf.id());
                bounds.push(leaf.bounds());
                old_mass.push(mass.clone());
            }
        }
        let neighbors = neighbor_map(&bounds);

        let mut new_mass = vec![Rational::zero(); old_mass.len()];
        let mut discarded = Rational::zero();
        let mut isolated = 0usize;
        for (i, mass) in old_mass.iter().enumerate() {
            let outflow = mass.mul(alpha);
            new_mass[i] = new_mass[i].add(&mass.sub(&outflow));

            let targets = neighbors.neighbors(i);
            if targets.is_empty() {
                isolated += 1;
                match boundary {
                    Boundary::Closed => new_mass[i] = new_mass[i].add(&outflow),
                    Boundary::Open => discarded = discarded.add(&outflow),
                }
                continue;
            }
            let portion = outflow.div_integer(targets.len())?;
            for &j in targets {
                new_mass[j] = new_mass[j].add(&portion);
            }
        }

        let mass_before: Rational = old_mass.iter().sum();
        let mass_after: Rational = new_mass.iter().sum();
        for (id, mass) in ids.iter().zip(new_mass) {
            self.set_mass(*id, mass)?;
        }

        tracing::debug!(
            target: "lumps.flow",
            leaves = ids.len(),
            isolated,
            boundary = %boundary,
            before = %mass_before,
            after = %mass_after,
            discarded = %discarded,
            "flow step"
        );
        Ok(FlowReport {
            leaves: ids.len(),
            isolated,
            mass_before,
            mass_after,
            discarded,
        })
    }
}
