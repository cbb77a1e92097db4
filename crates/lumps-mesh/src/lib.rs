#![forbid(unsafe_code)]

//! Adaptive quadtree of exact rational mass.
//!
//! A [`BlockTree`] partitions an integer grid into leaves that each hold a
//! non-negative [`Rational`](lumps_core::Rational) mass. Each tick moves mass
//! between edge-adjacent leaves ([`flow`]), rescales the total back to 1
//! ([`aggregate`]), then splits heavy leaves and merges light subtrees
//! ([`adapt`]). Every leaf also carries a precision bound that only grows as
//! its mass shrinks ([`vantage`]).
//!
//! # Example
//!
//! ```
//! use lumps_mesh::{Simulation, SimulationConfig};
//!
//! let mut sim = Simulation::new(&SimulationConfig::default()).unwrap();
//! sim.run(3).unwrap();
//! assert!(sim.total_mass().is_one());
//! ```

pub mod adapt;
pub mod aggregate;
pub mod config;
pub mod error;
pub mod flow;
pub mod neighbor;
pub mod simulation;
pub mod tree;
pub mod vantage;

pub use adapt::{AdaptReport, SplitOutcome, SplitShare, Thresholds};
pub use aggregate::NormalizeOutcome;
pub use config::{ConfigError, SimulationConfig};
pub use error::MeshError;
pub use flow::{Boundary, FlowReport};
pub use neighbor::{NeighborMap, is_neighbor, neighbor_map};
pub use simulation::{Simulation, TickParams, TickReport, tick};
pub use tree::{BlockId, BlockKind, BlockNode, BlockTree, LeafIter, LeafView};
pub use vantage::refined_bound;
