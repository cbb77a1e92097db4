#![forbid(unsafe_code)]

//! Error type shared by every mesh operation.

use std::fmt;

use lumps_core::{BoundsError, Rational, RationalError};

use crate::config::ConfigError;
use crate::tree::BlockId;

/// Failures from tree construction, mutation, and validation.
///
/// Degenerate splits and normalizing an empty distribution are not errors:
/// those operations report a no-op outcome instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MeshError {
    Arithmetic(RationalError),
    Bounds(BoundsError),
    Config(ConfigError),
    ZeroBlockId,
    BlockIdOverflow {
        current: BlockId,
    },
    MissingNode {
        node_id: BlockId,
    },
    NotLeaf {
        node_id: BlockId,
    },
    NegativeMass {
        mass: Rational,
    },
    NegativeScale {
        factor: Rational,
    },
    AlphaOutOfRange {
        alpha: Rational,
    },
    ThresholdOutOfRange {
        name: &'static str,
        value: Rational,
    },
    RootHasParent {
        root: BlockId,
        parent: BlockId,
    },
    ParentMismatch {
        node_id: BlockId,
        expected: Option<BlockId>,
        actual: Option<BlockId>,
    },
    InvalidChildCount {
        node_id: BlockId,
        count: usize,
    },
    ChildOutsideParent {
        parent: BlockId,
        child: BlockId,
    },
    OverlappingChildren {
        parent: BlockId,
        first: BlockId,
        second: BlockId,
    },
    IncompletePartition {
        parent: BlockId,
        covered: u128,
        expected: u128,
    },
    UnreachableNode {
        node_id: BlockId,
    },
}

impl fmt::Display for MeshError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Arithmetic(err) => write!(f, "arithmetic error: {err}"),
            Self::Bounds(err) => write!(f, "invalid bounds: {err}"),
            Self::Config(err) => write!(f, "invalid configuration: {err}"),
            Self::ZeroBlockId => write!(f, "block id 0 is invalid"),
            Self::BlockIdOverflow { current } => {
                write!(f, "block id overflow after {}", current.get())
            }
            Self::MissingNode { node_id } => write!(f, "block {} not found", node_id.get()),
            Self::NotLeaf { node_id } => write!(f, "block {} is not a leaf", node_id.get()),
            Self::NegativeMass { mass } => write!(f, "mass {mass} is negative"),
            Self::NegativeScale { factor } => write!(f, "scale factor {factor} is negative"),
            Self::AlphaOutOfRange { alpha } => {
                write!(f, "transfer fraction {alpha} is outside [0, 1]")
            }
            Self::ThresholdOutOfRange { name, value } => {
                write!(f, "{name} threshold {value} is outside [0, 1]")
            }
            Self::RootHasParent { root, parent } => write!(
                f,
                "root block {} must not have parent {}",
                root.get(),
                parent.get()
            ),
            Self::ParentMismatch {
                node_id,
                expected,
                actual,
            } => write!(
                f,
                "block {} parent mismatch: expected {:?}, got {:?}",
                node_id.get(),
                expected.map(BlockId::get),
                actual.map(BlockId::get)
            ),
            Self::InvalidChildCount { node_id, count } => write!(
                f,
                "internal block {} has {count} children (expected 2 to 4)",
                node_id.get()
            ),
            Self::ChildOutsideParent { parent, child } => write!(
                f,
                "child {} extends outside parent {}",
                child.get(),
                parent.get()
            ),
            Self::OverlappingChildren {
                parent,
                first,
                second,
            } => write!(
                f,
                "children {} and {} of block {} overlap",
                first.get(),
                second.get(),
                parent.get()
            ),
            Self::IncompletePartition {
                parent,
                covered,
                expected,
            } => write!(
                f,
                "children of block {} cover {covered} cells, parent has {expected}",
                parent.get()
            ),
            Self::UnreachableNode { node_id } => {
                write!(f, "block {} is unreachable from root", node_id.get())
            }
        }
    }
}

impl std::error::Error for MeshError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Arithmetic(err) => Some(err),
            Self::Bounds(err) => Some(err),
            Self::Config(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RationalError> for MeshError {
    fn from(err: RationalError) -> Self {
        Self::Arithmetic(err)
    }
}

impl From<BoundsError> for MeshError {
    fn from(err: BoundsError) -> Self {
        Self::Bounds(err)
    }
}

impl From<ConfigError> for MeshError {
    fn from(err: ConfigError) -> Self {
        Self::Config(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn wrapped_errors_expose_source() {
        let err = MeshError::from(RationalError::DivisionByZero);
        assert_eq!(err.to_string(), "arithmetic error: division by zero");
        assert!(err.source().is_some());
        assert!(MeshError::ZeroBlockId.source().is_none());
    }

    #[test]
    fn structural_errors_name_blocks() {
        let err = MeshError::InvalidChildCount {
            node_id: BlockId::MIN,
            count: 5,
        };
        assert_eq!(
            err.to_string(),
            "internal block 1 has 5 children (expected 2 to 4)"
        );
    }
}
