//! Property-based invariant tests for the block tree.
//!
//! Trees are grown from random split sequences and random leaf masses, then
//! checked against:
//!
//! 1. Structural validity after every mutation.
//! 2. Exact mass conservation under closed flow.
//! 3. Mass never increases under open flow.
//! 4. Merge preserves the subtree sum.
//! 5. Normalize yields total 1 and is idempotent.
//! 6. Precision bounds never decrease across a tick.
//! 7. Refinement always moves past the old bound.
//! 8. Surviving-share splits conserve mass exactly.
//! 9. Closed ticks with surviving-share splits keep the total at exactly 1.

use std::collections::BTreeMap;

use lumps_core::{PrecisionBound, Rational};
use lumps_mesh::{
    BlockId, BlockTree, Boundary, NormalizeOutcome, SplitShare, Thresholds, TickParams,
    refined_bound, tick,
};
use proptest::prelude::*;

// ── Helpers ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct TreeRecipe {
    width: u32,
    height: u32,
    splits: Vec<usize>,
    masses: Vec<(i64, i64)>,
}

fn recipe_strategy() -> impl Strategy<Value = TreeRecipe> {
    (
        1u32..=12,
        1u32..=12,
        prop::collection::vec(any::<usize>(), 0..8),
        prop::collection::vec((0i64..=50, 1i64..=50), 0..40),
    )
        .prop_map(|(width, height, splits, masses)| TreeRecipe {
            width,
            height,
            splits,
            masses,
        })
}

fn alpha_strategy() -> impl Strategy<Value = Rational> {
    (0i64..=10).prop_map(|n| Rational::new(n, 10).expect("non-zero denominator"))
}

fn leaf_ids(tree: &BlockTree) -> Vec<BlockId> {
    tree.leaves_in_order().map(|leaf| leaf.id()).collect()
}

fn grow(recipe: &TreeRecipe) -> BlockTree {
    let mut tree =
        BlockTree::new_domain(recipe.width, recipe.height, Rational::one()).expect("domain");
    for pick in &recipe.splits {
        let ids = leaf_ids(&tree);
        let target = ids[pick % ids.len()];
        tree.split(target, SplitShare::Surviving).expect("split");
    }
    let ids = leaf_ids(&tree);
    for (id, (n, d)) in ids.iter().zip(&recipe.masses) {
        let mass = Rational::new(*n, *d).expect("non-zero denominator");
        tree.set_mass(*id, mass).expect("set mass");
    }
    tree
}

fn internal_ids(tree: &BlockTree) -> Vec<BlockId> {
    tree.nodes()
        .filter(|node| !node.is_leaf())
        .map(|node| node.id())
        .collect()
}

// ═════════════════════════════════════════════════════════════════════════
// 1-3. Flow
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn grown_trees_are_valid(recipe in recipe_strategy()) {
        let tree = grow(&recipe);
        prop_assert_eq!(tree.validate(), Ok(()));
        prop_assert!(tree.leaves().iter().all(|leaf| !leaf.mass.is_negative()));
    }

    #[test]
    fn closed_flow_conserves_mass(recipe in recipe_strategy(), alpha in alpha_strategy()) {
        let mut tree = grow(&recipe);
        let before = tree.total_mass();
        let report = tree.flow_step(&alpha, Boundary::Closed).expect("flow");
        prop_assert_eq!(tree.total_mass(), before);
        prop_assert!(report.discarded.is_zero());
        prop_assert_eq!(tree.validate(), Ok(()));
    }

    #[test]
    fn open_flow_never_adds_mass(recipe in recipe_strategy(), alpha in alpha_strategy()) {
        let mut tree = grow(&recipe);
        let before = tree.total_mass();
        let report = tree.flow_step(&alpha, Boundary::Open).expect("flow");
        let after = tree.total_mass();
        prop_assert!(after <= before, "mass grew from {} to {}", before, after);
        prop_assert_eq!(after.add(&report.discarded), before);
        prop_assert!(tree.leaves().iter().all(|leaf| !leaf.mass.is_negative()));
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 4. Merge
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn merge_preserves_subtree_sum(recipe in recipe_strategy(), pick in any::<usize>()) {
        let mut tree = grow(&recipe);
        let internal = internal_ids(&tree);
        prop_assume!(!internal.is_empty());
        let target = internal[pick % internal.len()];
        let subtree = tree.sum_mass(target).expect("sum");
        let total = tree.total_mass();

        prop_assert_eq!(tree.merge(target), Ok(true));
        let merged = tree.node(target).expect("merged node");
        prop_assert_eq!(merged.mass(), Some(&subtree));
        prop_assert_eq!(tree.total_mass(), total);
        prop_assert_eq!(tree.validate(), Ok(()));
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 5. Normalize
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn normalize_is_idempotent(recipe in recipe_strategy()) {
        let mut tree = grow(&recipe);
        let first = tree.normalize().expect("normalize");
        let snapshot = tree.clone();
        let second = tree.normalize().expect("normalize again");

        if first == NormalizeOutcome::EmptyDistribution {
            prop_assert!(tree.total_mass().is_zero());
            prop_assert_eq!(second, NormalizeOutcome::EmptyDistribution);
        } else {
            prop_assert!(tree.total_mass().is_one());
            prop_assert_eq!(second, NormalizeOutcome::AlreadyNormalized);
        }
        prop_assert_eq!(tree, snapshot);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 6-7. Vantage
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn precision_never_decreases(recipe in recipe_strategy(), alpha in alpha_strategy()) {
        let mut tree = grow(&recipe);
        let before: BTreeMap<BlockId, PrecisionBound> = tree
            .nodes()
            .map(|node| (node.id(), node.precision_bound().clone()))
            .collect();
        let params = TickParams::new(
            alpha,
            Boundary::Open,
            Thresholds::default(),
            SplitShare::Surviving,
        )
        .expect("params");
        tick(&mut tree, &params).expect("tick");

        for node in tree.nodes() {
            if let Some(old) = before.get(&node.id()) {
                prop_assert!(node.precision_bound() >= old, "bound of {:?} shrank", node.id());
            }
        }
    }

    #[test]
    fn refinement_moves_past_old_bound(raw in 1u64..=10_000, n in 1i64..=1000, d in 1i64..=1_000_000) {
        let bound = PrecisionBound::new(raw).expect("non-zero");
        let mass = Rational::new(n, d).expect("non-zero denominator");
        match refined_bound(&bound, &mass) {
            Some(next) => {
                prop_assert!(next > bound);
                prop_assert!(mass < bound.resolution());
                prop_assert!(mass >= next.resolution());
            }
            None => prop_assert!(mass >= bound.resolution() || mass >= Rational::one()),
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 8. Split share
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn surviving_split_conserves_mass(recipe in recipe_strategy(), pick in any::<usize>()) {
        let mut tree = grow(&recipe);
        let ids = leaf_ids(&tree);
        let target = ids[pick % ids.len()];
        let before = tree.total_mass();
        tree.split(target, SplitShare::Surviving).expect("split");
        prop_assert_eq!(tree.total_mass(), before);
        prop_assert_eq!(tree.validate(), Ok(()));
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 9. Closed multi-tick runs
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn closed_ticks_keep_unit_mass(
        recipe in recipe_strategy(),
        alpha in alpha_strategy(),
        ticks in 1usize..=5,
    ) {
        let mut tree = grow(&recipe);
        prop_assume!(tree.normalize().expect("normalize") != NormalizeOutcome::EmptyDistribution);
        let params = TickParams::new(
            alpha,
            Boundary::Closed,
            Thresholds::default(),
            SplitShare::Surviving,
        )
        .expect("params");

        for step in 1..=ticks {
            let report = tick(&mut tree, &params).expect("tick");
            prop_assert!(report.flow.discarded.is_zero());
            prop_assert!(
                tree.total_mass().is_one(),
                "tick {}: total {}",
                step,
                tree.total_mass()
            );
            prop_assert_eq!(tree.validate(), Ok(()));
        }
    }
}
