#![forbid(unsafe_code)]

//! Adaptive block tree over an integer grid.
//!
//! Nodes live in an arena keyed by stable [`BlockId`]s with explicit
//! parent/child links. A node is atomically either a leaf carrying mass or an
//! internal node carrying 2–4 children in quadrant order; internal nodes have
//! no mass field at all.
//!
//! Leaves are always visited in the same pre-order (bottom-left,
//! bottom-right, top-left, top-right), because neighbor indices and flow
//! update buffers are positional.

use std::collections::BTreeMap;

use lumps_core::{Bounds, PrecisionBound, Rational};
use serde::{Deserialize, Serialize};

use crate::error::MeshError;

/// Stable identifier for tree nodes.
///
/// `0` is reserved/invalid so IDs are always non-zero. IDs are never reused
/// within one tree, even after a merge discards the nodes holding them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockId(u64);

impl BlockId {
    /// Lowest valid block ID (always the root of a fresh tree).
    pub const MIN: Self = Self(1);

    /// Create a block ID, rejecting 0.
    pub fn new(raw: u64) -> Result<Self, MeshError> {
        if raw == 0 {
            return Err(MeshError::ZeroBlockId);
        }
        Ok(Self(raw))
    }

    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Return the next ID, or an error on overflow.
    pub fn checked_next(self) -> Result<Self, MeshError> {
        let Some(next) = self.0.checked_add(1) else {
            return Err(MeshError::BlockIdOverflow { current: self });
        };
        Self::new(next)
    }
}

/// Leaf/internal payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockKind {
    Leaf { mass: Rational },
    Internal { children: Vec<BlockId> },
}

/// One block of the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockNode {
    id: BlockId,
    parent: Option<BlockId>,
    bounds: Bounds,
    precision: PrecisionBound,
    pub(crate) kind: BlockKind,
}

impl BlockNode {
    pub(crate) fn leaf(
        id: BlockId,
        parent: Option<BlockId>,
        bounds: Bounds,
        mass: Rational,
        precision: PrecisionBound,
    ) -> Self {
        Self {
            id,
            parent,
            bounds,
            precision,
            kind: BlockKind::Leaf { mass },
        }
    }

    #[must_use]
    pub const fn id(&self) -> BlockId {
        self.id
    }

    #[must_use]
    pub const fn parent(&self) -> Option<BlockId> {
        self.parent
    }

    #[must_use]
    pub const fn bounds(&self) -> Bounds {
        self.bounds
    }

    #[must_use]
    pub fn precision_bound(&self) -> &PrecisionBound {
        &self.precision
    }

    pub(crate) fn set_precision_bound(&mut self, bound: PrecisionBound) {
        self.precision = bound;
    }

    #[must_use]
    pub fn kind(&self) -> &BlockKind {
        &self.kind
    }

    #[must_use]
    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, BlockKind::Leaf { .. })
    }

    /// Leaf mass, or `None` for internal nodes.
    #[must_use]
    pub fn mass(&self) -> Option<&Rational> {
        match &self.kind {
            BlockKind::Leaf { mass } => Some(mass),
            BlockKind::Internal { .. } => None,
        }
    }

    /// Children in quadrant order (empty for leaves).
    #[must_use]
    pub fn children(&self) -> &[BlockId] {
        match &self.kind {
            BlockKind::Leaf { .. } => &[],
            BlockKind::Internal { children } => children,
        }
    }

    #[must_use]
    pub const fn width(&self) -> u64 {
        self.bounds.width()
    }

    #[must_use]
    pub const fn height(&self) -> u64 {
        self.bounds.height()
    }

    #[must_use]
    pub const fn area(&self) -> u128 {
        self.bounds.area()
    }
}

/// Read-only view of one leaf for presentation layers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeafView {
    pub id: BlockId,
    pub bounds: Bounds,
    pub mass: Rational,
    pub precision_bound: PrecisionBound,
}

/// Pre-order leaf traversal. Calling [`BlockTree::leaves_in_order`] again
/// restarts from the beginning.
#[derive(Debug, Clone)]
pub struct LeafIter<'a> {
    tree: &'a BlockTree,
    stack: Vec<BlockId>,
}

impl<'a> Iterator for LeafIter<'a> {
    type Item = &'a BlockNode;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(id) = self.stack.pop() {
            debug_assert!(
                self.tree.nodes.contains_key(&id),
                "block {} missing from arena",
                id.get()
            );
            let Some(node) = self.tree.nodes.get(&id) else {
                continue;
            };
            match &node.kind {
                BlockKind::Leaf { .. } => return Some(node),
                BlockKind::Internal { children } => {
                    self.stack.extend(children.iter().rev().copied());
                }
            }
        }
        None
    }
}

/// Quadtree holding exact mass over a rectangular domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockTree {
    root: BlockId,
    next_id: BlockId,
    nodes: BTreeMap<BlockId, BlockNode>,
}

impl BlockTree {
    /// Single-leaf tree covering `bounds`.
    pub fn new_leaf(
        bounds: Bounds,
        mass: Rational,
        precision: PrecisionBound,
    ) -> Result<Self, MeshError> {
        if mass.is_negative() {
            return Err(MeshError::NegativeMass { mass });
        }
        let root = BlockId::MIN;
        let mut nodes = BTreeMap::new();
        let _ = nodes.insert(root, BlockNode::leaf(root, None, bounds, mass, precision));
        let mut tree = Self {
            root,
            next_id: root.checked_next()?,
            nodes,
        };
        tree.refine_precision(root)?;
        Ok(tree)
    }

    /// Domain `[0, x_extent - 1] × [0, y_extent - 1]` holding `initial_mass`
    /// in one root leaf with the default precision bound.
    pub fn new_domain(
        x_extent: u32,
        y_extent: u32,
        initial_mass: Rational,
    ) -> Result<Self, MeshError> {
        Self::new_domain_with_precision(x_extent, y_extent, initial_mass, PrecisionBound::default())
    }

    /// [`BlockTree::new_domain`] with an explicit starting precision bound.
    pub fn new_domain_with_precision(
        x_extent: u32,
        y_extent: u32,
        initial_mass: Rational,
        precision: PrecisionBound,
    ) -> Result<Self, MeshError> {
        let bounds = Bounds::from_extent(x_extent, y_extent)?;
        Self::new_leaf(bounds, initial_mass, precision)
    }

    #[must_use]
    pub const fn root(&self) -> BlockId {
        self.root
    }

    #[must_use]
    pub fn node(&self, id: BlockId) -> Option<&BlockNode> {
        self.nodes.get(&id)
    }

    /// Iterate nodes in ID order.
    pub fn nodes(&self) -> impl Iterator<Item = &BlockNode> {
        self.nodes.values()
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn leaf_count(&self) -> usize {
        self.nodes.values().filter(|node| node.is_leaf()).count()
    }

    /// Longest root-to-leaf path, counting edges.
    #[must_use]
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut stack = vec![(self.root, 0usize)];
        while let Some((id, depth)) = stack.pop() {
            let Some(node) = self.nodes.get(&id) else {
                continue;
            };
            deepest = deepest.max(depth);
            stack.extend(node.children().iter().map(|child| (*child, depth + 1)));
        }
        deepest
    }

    /// All leaves in deterministic pre-order.
    #[must_use]
    pub fn leaves_in_order(&self) -> LeafIter<'_> {
        LeafIter {
            tree: self,
            stack: vec![self.root],
        }
    }

    /// Leaves of the subtree rooted at `id`, in pre-order.
    pub fn leaves_under(&self, id: BlockId) -> Result<LeafIter<'_>, MeshError> {
        if !self.nodes.contains_key(&id) {
            return Err(MeshError::MissingNode { node_id: id });
        }
        Ok(LeafIter {
            tree: self,
            stack: vec![id],
        })
    }

    /// Snapshot of `(id, bounds, mass, precision_bound)` per leaf, in order.
    #[must_use]
    pub fn leaves(&self) -> Vec<LeafView> {
        self.leaves_in_order()
            .filter_map(|node| {
                node.mass().map(|mass| LeafView {
                    id: node.id,
                    bounds: node.bounds,
                    mass: mass.clone(),
                    precision_bound: node.precision.clone(),
                })
            })
            .collect()
    }

    /// Assign a leaf's mass and refine its precision bound.
    pub fn set_mass(&mut self, id: BlockId, mass: Rational) -> Result<(), MeshError> {
        if mass.is_negative() {
            return Err(MeshError::NegativeMass { mass });
        }
        *self.leaf_mass_mut(id)? = mass;
        self.refine_precision(id)?;
        Ok(())
    }

    pub(crate) fn node_mut(&mut self, id: BlockId) -> Result<&mut BlockNode, MeshError> {
        self.nodes
            .get_mut(&id)
            .ok_or(MeshError::MissingNode { node_id: id })
    }

    pub(crate) fn leaf_mass_mut(&mut self, id: BlockId) -> Result<&mut Rational, MeshError> {
        match &mut self.node_mut(id)?.kind {
            BlockKind::Leaf { mass } => Ok(mass),
            BlockKind::Internal { .. } => Err(MeshError::NotLeaf { node_id: id }),
        }
    }

    pub(crate) fn allocate_id(&mut self) -> Result<BlockId, MeshError> {
        let current = self.next_id;
        self.next_id = current.checked_next()?;
        Ok(current)
    }

    pub(crate) fn insert_node(&mut self, node: BlockNode) {
        let _ = self.nodes.insert(node.id, node);
    }

    /// Strict descendants of `id` (not including `id`).
    pub(crate) fn descendant_ids(&self, id: BlockId) -> Result<Vec<BlockId>, MeshError> {
        let node = self
            .nodes
            .get(&id)
            .ok_or(MeshError::MissingNode { node_id: id })?;
        let mut out = Vec::new();
        let mut stack = node.children().to_vec();
        while let Some(next) = stack.pop() {
            let child = self
                .nodes
                .get(&next)
                .ok_or(MeshError::MissingNode { node_id: next })?;
            stack.extend_from_slice(child.children());
            out.push(next);
        }
        Ok(out)
    }

    pub(crate) fn remove_nodes(&mut self, ids: &[BlockId]) {
        for id in ids {
            let _ = self.nodes.remove(id);
        }
    }

    /// Check structural invariants, returning the first violation.
    ///
    /// - the root exists and has no parent;
    /// - every internal node has 2–4 children that point back to it, lie
    ///   inside it, do not overlap, and cover it exactly;
    /// - leaf masses are non-negative;
    /// - every node is reachable from the root.
    pub fn validate(&self) -> Result<(), MeshError> {
        let root = self
            .nodes
            .get(&self.root)
            .ok_or(MeshError::MissingNode { node_id: self.root })?;
        if let Some(parent) = root.parent {
            return Err(MeshError::RootHasParent {
                root: self.root,
                parent,
            });
        }

        let mut reachable = 0usize;
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            let node = self
                .nodes
                .get(&id)
                .ok_or(MeshError::MissingNode { node_id: id })?;
            reachable += 1;
            match &node.kind {
                BlockKind::Leaf { mass } => {
                    if mass.is_negative() {
                        return Err(MeshError::NegativeMass { mass: mass.clone() });
                    }
                }
                BlockKind::Internal { children } => {
                    self.validate_children(node, children)?;
                    stack.extend(children.iter().copied());
                }
            }
        }

        if reachable != self.nodes.len() {
            let mut seen = std::collections::BTreeSet::new();
            let mut stack = vec![self.root];
            while let Some(id) = stack.pop() {
                if seen.insert(id)
                    && let Some(node) = self.nodes.get(&id)
                {
                    stack.extend(node.children().iter().copied());
                }
            }
            if let Some(orphan) = self.nodes.keys().find(|id| !seen.contains(id)) {
                return Err(MeshError::UnreachableNode { node_id: *orphan });
            }
        }
        Ok(())
    }

    fn validate_children(&self, node: &BlockNode, children: &[BlockId]) -> Result<(), MeshError> {
        if !(2..=4).contains(&children.len()) {
            return Err(MeshError::InvalidChildCount {
                node_id: node.id,
                count: children.len(),
            });
        }
        let mut covered = 0u128;
        let mut seen: Vec<&BlockNode> = Vec::with_capacity(children.len());
        for child_id in children {
            let child = self.nodes.get(child_id).ok_or(MeshError::MissingNode {
                node_id: *child_id,
            })?;
            if child.parent != Some(node.id) {
                return Err(MeshError::ParentMismatch {
                    node_id: child.id,
                    expected: Some(node.id),
                    actual: child.parent,
                });
            }
            if !node.bounds.contains_bounds(&child.bounds) {
                return Err(MeshError::ChildOutsideParent {
                    parent: node.id,
                    child: child.id,
                });
            }
            if let Some(other) = seen.iter().find(|other| other.bounds.overlaps(&child.bounds)) {
                return Err(MeshError::OverlappingChildren {
                    parent: node.id,
                    first: other.id,
                    second: child.id,
                });
            }
            covered += child.area();
            seen.push(child);
        }
        if covered != node.area() {
            return Err(MeshError::IncompletePartition {
                parent: node.id,
                covered,
                expected: node.area(),
            });
        }
        Ok(())
    }

    /// Deterministic FNV-1a hash over structure, masses, and precision bounds.
    ///
    /// Intended for tick logs and replay diagnostics.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        const OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
        const PRIME: u64 = 0x0000_0001_0000_01b3;

        fn mix_bytes(hash: &mut u64, bytes: &[u8]) {
            for byte in bytes {
                *hash ^= u64::from(*byte);
                *hash = hash.wrapping_mul(PRIME);
            }
        }

        let mut hash = OFFSET_BASIS;
        mix_bytes(&mut hash, &self.root.get().to_le_bytes());
        mix_bytes(&mut hash, &self.next_id.get().to_le_bytes());
        for node in self.nodes.values() {
            mix_bytes(&mut hash, &node.id.get().to_le_bytes());
            mix_bytes(&mut hash, &node.parent.map_or(0, BlockId::get).to_le_bytes());
            for edge in [
                node.bounds.x_min(),
                node.bounds.x_max(),
                node.bounds.y_min(),
                node.bounds.y_max(),
            ] {
                mix_bytes(&mut hash, &edge.to_le_bytes());
            }
            mix_bytes(&mut hash, &node.precision.get().to_bytes_le());
            match &node.kind {
                BlockKind::Leaf { mass } => {
                    mix_bytes(&mut hash, &[0]);
                    mix_bytes(&mut hash, &mass.numer().to_signed_bytes_le());
                    mix_bytes(&mut hash, &mass.denom().to_signed_bytes_le());
                }
                BlockKind::Internal { children } => {
                    mix_bytes(&mut hash, &[1]);
                    for child in children {
                        mix_bytes(&mut hash, &child.get().to_le_bytes());
                    }
                }
            }
        }
        hash
    }
}
