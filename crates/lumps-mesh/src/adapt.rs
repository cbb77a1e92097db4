#![forbid(unsafe_code)]

//! Mesh adaptation: splitting heavy leaves and merging light subtrees.

use std::fmt;
use std::num::NonZeroU64;
use std::str::FromStr;

use lumps_core::Rational;
use serde::{Deserialize, Serialize};

use crate::error::MeshError;
use crate::tree::{BlockId, BlockKind, BlockNode, BlockTree};

/// How a split leaf's mass is shared among its children.
///
/// `Quarter` always divides by four, even when a thin block yields only two
/// children, so mass is lost at odd domain edges. `Surviving` divides by the
/// number of children actually created and conserves mass exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitShare {
    #[default]
    Quarter,
    Surviving,
}

impl SplitShare {
    fn divisor(self, surviving: usize) -> usize {
        match self {
            Self::Quarter => 4,
            Self::Surviving => surviving,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Quarter => "quarter",
            Self::Surviving => "surviving",
        }
    }
}

impl fmt::Display for SplitShare {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SplitShare {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "quarter" => Ok(Self::Quarter),
            "surviving" => Ok(Self::Surviving),
            other => Err(format!("unknown split share {other:?} (quarter|surviving)")),
        }
    }
}

/// Result of [`BlockTree::split`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitOutcome {
    /// The leaf became internal with this many children.
    Split { children: usize },
    /// Target was already internal.
    NotLeaf,
    /// Unit-area leaf; cannot be subdivided.
    DegenerateSplit,
    /// Fewer than two quadrants were non-empty; the leaf was kept.
    TooFewChildren,
}

const DEFAULT_SPLIT_DENOM: NonZeroU64 = NonZeroU64::new(5).expect("5 is non-zero");
const DEFAULT_MERGE_DENOM: NonZeroU64 = NonZeroU64::new(300).expect("300 is non-zero");

/// Split and merge thresholds, both within `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Thresholds {
    split: Rational,
    merge: Rational,
}

impl Thresholds {
    /// Validate and build thresholds.
    pub fn new(split: Rational, merge: Rational) -> Result<Self, MeshError> {
        check_unit_interval("split", &split)?;
        check_unit_interval("merge", &merge)?;
        Ok(Self { split, merge })
    }

    /// Leaves with at least this mass (and area > 1) are split.
    #[must_use]
    pub fn split(&self) -> &Rational {
        &self.split
    }

    /// Internal nodes whose children total below this mass are merged.
    #[must_use]
    pub fn merge(&self) -> &Rational {
        &self.merge
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            split: Rational::unit_fraction(DEFAULT_SPLIT_DENOM),
            merge: Rational::unit_fraction(DEFAULT_MERGE_DENOM),
        }
    }
}

pub(crate) fn check_unit_interval(name: &'static str, value: &Rational) -> Result<(), MeshError> {
    if value.is_negative() || *value > Rational::one() {
        return Err(MeshError::ThresholdOutOfRange {
            name,
            value: value.clone(),
        });
    }
    Ok(())
}

/// Counts from one adaptive pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct AdaptReport {
    pub splits: usize,
    pub merges: usize,
}

impl AdaptReport {
    fn absorb(&mut self, other: AdaptReport) {
        self.splits += other.splits;
        self.merges += other.merges;
    }
}

impl BlockTree {
    /// Subdivide leaf `id` at its midpoints.
    ///
    /// Children are created in quadrant order, inherit the parent's precision
    /// bound unchanged, and receive `mass / divisor` per [`SplitShare`]. Empty
    /// quadrants are skipped. The parent's mass is dropped on success. A
    /// child's bound is refined on the next step that assigns its mass.
    pub fn split(&mut self, id: BlockId, share: SplitShare) -> Result<SplitOutcome, MeshError> {
        let node = self
            .node(id)
            .ok_or(MeshError::MissingNode { node_id: id })?;
        let Some(mass) = node.mass() else {
            return Ok(SplitOutcome::NotLeaf);
        };
        if node.area() <= 1 {
            return Ok(SplitOutcome::DegenerateSplit);
        }

        let quadrants: Vec<_> = node.bounds().quadrants().into_iter().flatten().collect();
        if quadrants.len() < 2 {
            return Ok(SplitOutcome::TooFewChildren);
        }
        let child_mass = mass.div_integer(share.divisor(quadrants.len()))?;
        let precision = node.precision_bound().clone();
        let parent_mass = mass.clone();

        let mut children = Vec::with_capacity(quadrants.len());
        for bounds in quadrants {
            let child_id = self.allocate_id()?;
            self.insert_node(BlockNode::leaf(
                child_id,
                Some(id),
                bounds,
                child_mass.clone(),
                precision.clone(),
            ));
            children.push(child_id);
        }

        let count = children.len();
        self.node_mut(id)?.kind = BlockKind::Internal { children };
        tracing::debug!(
            target: "lumps.adapt",
            block = id.get(),
            mass = %parent_mass,
            children = count,
            share = %share,
            "split"
        );
        Ok(SplitOutcome::Split { children: count })
    }

    /// Collapse internal node `id` into a leaf holding its descendants' total
    /// mass. Returns `false` when `id` is already a leaf.
    pub fn merge(&mut self, id: BlockId) -> Result<bool, MeshError> {
        let node = self
            .node(id)
            .ok_or(MeshError::MissingNode { node_id: id })?;
        if node.is_leaf() {
            return Ok(false);
        }
        let total = self.sum_mass(id)?;
        let descendants = self.descendant_ids(id)?;
        self.remove_nodes(&descendants);
        tracing::debug!(
            target: "lumps.adapt",
            block = id.get(),
            mass = %total,
            removed = descendants.len(),
            "merge"
        );
        self.node_mut(id)?.kind = BlockKind::Leaf { mass: total };
        self.refine_precision(id)?;
        Ok(true)
    }

    /// One adaptive pass over the subtree rooted at `id`.
    ///
    /// A leaf is split when its area exceeds 1 and its mass reaches the split
    /// threshold. An internal node first adapts every child, then merges when
    /// its children's resulting total is below the merge threshold. Leaves
    /// created by a split are not revisited in the same pass.
    pub fn adaptive_split_merge(
        &mut self,
        id: BlockId,
        thresholds: &Thresholds,
        share: SplitShare,
    ) -> Result<AdaptReport, MeshError> {
        let node = self
            .node(id)
            .ok_or(MeshError::MissingNode { node_id: id })?;
        let mut report = AdaptReport::default();

        if let Some(mass) = node.mass() {
            if node.area() > 1
                && mass >= thresholds.split()
                && let SplitOutcome::Split { .. } = self.split(id, share)?
            {
                report.splits += 1;
            }
            return Ok(report);
        }

        let children = node.children().to_vec();
        for child in &children {
            report.absorb(self.adaptive_split_merge(*child, thresholds, share)?);
        }
        let mut total = Rational::zero();
        for child in &children {
            total = total.add(&self.sum_mass(*child)?);
        }
        if total < *thresholds.merge() && self.merge(id)? {
            report.merges += 1;
        }
        Ok(report)
    }
}
