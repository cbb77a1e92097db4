#![forbid(unsafe_code)]

//! Mass aggregation over subtrees: sum, scale, normalize.

use lumps_core::Rational;
use serde::Serialize;

use crate::error::MeshError;
use crate::tree::{BlockId, BlockTree};

/// What [`BlockTree::normalize`] did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum NormalizeOutcome {
    /// Leaves were scaled by `1 / previous_total`.
    Scaled { previous_total: Rational },
    /// Total was already exactly 1.
    AlreadyNormalized,
    /// Total was zero; nothing to distribute.
    EmptyDistribution,
}

impl BlockTree {
    /// Sum of leaf masses under `id`.
    pub fn sum_mass(&self, id: BlockId) -> Result<Rational, MeshError> {
        Ok(self.leaves_under(id)?.filter_map(|leaf| leaf.mass()).sum())
    }

    /// Sum of all leaf masses.
    #[must_use]
    pub fn total_mass(&self) -> Rational {
        self.leaves_in_order().filter_map(|leaf| leaf.mass()).sum()
    }

    /// Multiply every leaf mass under `id` by `factor`, refining each touched
    /// leaf's precision bound. Returns the number of leaves touched.
    pub fn scale_mass(&mut self, id: BlockId, factor: &Rational) -> Result<usize, MeshError> {
        if factor.is_negative() {
            return Err(MeshError::NegativeScale {
                factor: factor.clone(),
            });
        }
        let leaves: Vec<BlockId> = self.leaves_under(id)?.map(|leaf| leaf.id()).collect();
        for leaf in &leaves {
            let mass = self.leaf_mass_mut(*leaf)?;
            *mass = mass.mul(factor);
            self.refine_precision(*leaf)?;
        }
        Ok(leaves.len())
    }

    /// Rescale the whole tree so its total mass is exactly 1.
    pub fn normalize(&mut self) -> Result<NormalizeOutcome, MeshError> {
        self.normalize_subtree(self.root())
    }

    /// Rescale the subtree under `id` so its mass is exactly 1.
    ///
    /// No-op when the subtree total is zero or already 1, which makes the
    /// operation idempotent.
    pub fn normalize_subtree(&mut self, id: BlockId) -> Result<NormalizeOutcome, MeshError> {
        let total = self.sum_mass(id)?;
        if !total.is_positive() {
            tracing::debug!(target: "lumps.normalize", block = id.get(), "empty distribution");
            return Ok(NormalizeOutcome::EmptyDistribution);
        }
        if total.is_one() {
            return Ok(NormalizeOutcome::AlreadyNormalized);
        }
        let factor = total.recip()?;
        let touched = self.scale_mass(id, &factor)?;
        tracing::debug!(
            target: "lumps.normalize",
            block = id.get(),
            previous_total = %total,
            touched,
            "normalized"
        );
        Ok(NormalizeOutcome::Scaled {
            previous_total: total,
        })
    }
}
