#![forbid(unsafe_code)]

//! Tick driver: Flow → Normalize → Adaptive split/merge.
//!
//! [`tick`] advances a caller-owned tree by one step. [`Simulation`] owns a
//! tree plus its parameters and counts ticks, for callers that just want to
//! run a configured domain forward.

use lumps_core::Rational;
use serde::Serialize;

use crate::adapt::{AdaptReport, SplitShare, Thresholds};
use crate::aggregate::NormalizeOutcome;
use crate::config::SimulationConfig;
use crate::error::MeshError;
use crate::flow::{Boundary, FlowReport, check_alpha};
use crate::tree::{BlockTree, LeafView};

/// Per-tick parameters, validated once up front.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TickParams {
    alpha: Rational,
    boundary: Boundary,
    thresholds: Thresholds,
    split_share: SplitShare,
}

impl TickParams {
    pub fn new(
        alpha: Rational,
        boundary: Boundary,
        thresholds: Thresholds,
        split_share: SplitShare,
    ) -> Result<Self, MeshError> {
        check_alpha(&alpha)?;
        Ok(Self {
            alpha,
            boundary,
            thresholds,
            split_share,
        })
    }

    /// Parameters described by `config`.
    pub fn from_config(config: &SimulationConfig) -> Result<Self, MeshError> {
        Self::new(
            config.alpha.clone(),
            config.boundary,
            config.thresholds()?,
            config.split_share,
        )
    }

    #[must_use]
    pub fn alpha(&self) -> &Rational {
        &self.alpha
    }

    #[must_use]
    pub const fn boundary(&self) -> Boundary {
        self.boundary
    }

    #[must_use]
    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    #[must_use]
    pub const fn split_share(&self) -> SplitShare {
        self.split_share
    }
}

/// What one tick did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TickReport {
    /// 1-based index within a [`Simulation`]; 0 for a bare [`tick`] call.
    pub tick: u64,
    pub flow: FlowReport,
    pub normalize: NormalizeOutcome,
    pub adapt: AdaptReport,
    pub leaf_count: usize,
    pub total_mass: Rational,
}

/// Advance `tree` by one tick.
///
/// Any error leaves the tree in whatever state the failing phase reached;
/// every phase keeps the structural invariants on its own.
pub fn tick(tree: &mut BlockTree, params: &TickParams) -> Result<TickReport, MeshError> {
    tick_numbered(tree, params, 0)
}

fn tick_numbered(
    tree: &mut BlockTree,
    params: &TickParams,
    index: u64,
) -> Result<TickReport, MeshError> {
    let _span =
        tracing::info_span!("lumps.tick", tick = index, leaves = tree.leaf_count()).entered();

    let flow = tree.flow_step(&params.alpha, params.boundary)?;
    let normalize = tree.normalize()?;
    let adapt = tree.adaptive_split_merge(tree.root(), &params.thresholds, params.split_share)?;

    let report = TickReport {
        tick: index,
        flow,
        normalize,
        adapt,
        leaf_count: tree.leaf_count(),
        total_mass: tree.total_mass(),
    };
    tracing::debug!(
        target: "lumps.tick",
        splits = report.adapt.splits,
        merges = report.adapt.merges,
        leaves = report.leaf_count,
        total = %report.total_mass,
        "tick complete"
    );
    Ok(report)
}

/// A tree plus the parameters that drive it.
#[derive(Debug, Clone)]
pub struct Simulation {
    tree: BlockTree,
    params: TickParams,
    ticks: u64,
}

impl Simulation {
    /// Build the configured domain.
    pub fn new(config: &SimulationConfig) -> Result<Self, MeshError> {
        config.validate()?;
        let tree = BlockTree::new_domain_with_precision(
            config.x_extent,
            config.y_extent,
            config.initial_mass.clone(),
            config.initial_precision.clone(),
        )?;
        Ok(Self::from_tree(tree, TickParams::from_config(config)?))
    }

    /// Drive an existing tree.
    #[must_use]
    pub fn from_tree(tree: BlockTree, params: TickParams) -> Self {
        Self {
            tree,
            params,
            ticks: 0,
        }
    }

    #[must_use]
    pub fn tree(&self) -> &BlockTree {
        &self.tree
    }

    #[must_use]
    pub fn into_tree(self) -> BlockTree {
        self.tree
    }

    #[must_use]
    pub fn params(&self) -> &TickParams {
        &self.params
    }

    /// Ticks completed so far.
    #[must_use]
    pub const fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn tick(&mut self) -> Result<TickReport, MeshError> {
        let index = self.ticks + 1;
        let report = tick_numbered(&mut self.tree, &self.params, index)?;
        self.ticks = index;
        Ok(report)
    }

    /// Run `n` ticks, stopping at the first error.
    pub fn run(&mut self, n: usize) -> Result<Vec<TickReport>, MeshError> {
        let mut reports = Vec::with_capacity(n);
        for _ in 0..n {
            reports.push(self.tick()?);
        }
        Ok(reports)
    }

    #[must_use]
    pub fn leaves(&self) -> Vec<LeafView> {
        self.tree.leaves()
    }

    #[must_use]
    pub fn total_mass(&self) -> Rational {
        self.tree.total_mass()
    }
}
