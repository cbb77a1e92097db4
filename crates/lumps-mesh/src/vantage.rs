#![forbid(unsafe_code)]

//! Per-leaf precision ("vantage") refinement.
//!
//! A leaf whose mass drops below `1 / precision_bound` can no longer be
//! represented at its committed precision. Refinement raises the bound to
//! `ceil(1 / mass)`, and always by at least one, so a bound never decreases
//! or stalls once refinement fires. Masses of exactly 0 or 1 never refine.

use lumps_core::{PrecisionBound, Rational};

use crate::error::MeshError;
use crate::tree::{BlockId, BlockTree};

/// New bound for `mass` at `bound`, or `None` when no refinement is needed.
#[must_use]
pub fn refined_bound(bound: &PrecisionBound, mass: &Rational) -> Option<PrecisionBound> {
    if !mass.is_positive() || *mass >= Rational::one() {
        return None;
    }
    if *mass >= bound.resolution() {
        return None;
    }
    let needed = mass.recip().ok()?.ceil();
    let candidate = PrecisionBound::from_bigint(&needed)?;
    Some(candidate.max(bound.successor()))
}

impl BlockTree {
    /// Refine the precision bound of leaf `id` against its current mass.
    ///
    /// Returns the new bound when it changed. Internal nodes are left alone.
    pub fn refine_precision(&mut self, id: BlockId) -> Result<Option<PrecisionBound>, MeshError> {
        let node = self.node_mut(id)?;
        let Some(mass) = node.mass() else {
            return Ok(None);
        };
        let Some(next) = refined_bound(node.precision_bound(), mass) else {
            return Ok(None);
        };
        tracing::trace!(
            target: "lumps.vantage",
            block = id.get(),
            from = %node.precision_bound(),
            to = %next,
            "precision refined"
        );
        node.set_precision_bound(next.clone());
        Ok(Some(next))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumps_core::Bounds;

    fn q(n: i64, d: i64) -> Rational {
        Rational::new(n, d).expect("valid test fraction")
    }

    fn bound(raw: u64) -> PrecisionBound {
        PrecisionBound::new(raw).expect("non-zero bound")
    }

    #[test]
    fn mass_above_resolution_is_untouched() {
        assert_eq!(refined_bound(&bound(100), &q(1, 100)), None);
        assert_eq!(refined_bound(&bound(100), &q(1, 4)), None);
    }

    #[test]
    fn zero_one_and_larger_masses_never_refine() {
        assert_eq!(refined_bound(&bound(2), &Rational::zero()), None);
        assert_eq!(refined_bound(&bound(2), &Rational::one()), None);
        assert_eq!(refined_bound(&bound(2), &q(3, 2)), None);
    }

    #[test]
    fn small_mass_raises_to_ceiling_of_reciprocal() {
        // 1 / (3/1000) = 333.33.. → 334
        assert_eq!(refined_bound(&bound(100), &q(3, 1000)), Some(bound(334)));
    }

    #[test]
    fn refinement_always_grows_strictly() {
        // Just under 1/100: ceil(100.01) = 101.
        let tight = q(100, 10_001);
        assert_eq!(refined_bound(&bound(100), &tight), Some(bound(101)));
        assert_eq!(refined_bound(&bound(100), &q(1, 101)), Some(bound(101)));
    }

    #[test]
    fn tree_refinement_only_touches_leaves() {
        let mut tree =
            BlockTree::new_leaf(Bounds::cell(0, 0), q(1, 2), bound(10)).expect("single leaf");
        let root = tree.root();
        assert_eq!(tree.refine_precision(root), Ok(None));
        tree.set_mass(root, q(1, 40)).expect("set mass");
        assert_eq!(
            tree.node(root).map(|node| node.precision_bound().clone()),
            Some(bound(40))
        );
    }
}
