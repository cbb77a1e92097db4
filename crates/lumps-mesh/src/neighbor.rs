#![forbid(unsafe_code)]

//! Edge adjacency between leaves.
//!
//! The map is built by checking every pair `i < j`, which is quadratic in the
//! leaf count. That is fine for the tens to low hundreds of leaves the split
//! and merge thresholds keep the tree at.

use lumps_core::Bounds;

/// Whether two blocks share an edge segment. Symmetric.
#[must_use]
pub fn is_neighbor(a: &Bounds, b: &Bounds) -> bool {
    a.is_neighbor(b)
}

/// Symmetric adjacency lists indexed by leaf position.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NeighborMap {
    adjacency: Vec<Vec<usize>>,
}

impl NeighborMap {
    /// Build the map for an ordered leaf sequence.
    #[must_use]
    pub fn build(leaves: &[Bounds]) -> Self {
        let mut adjacency = vec![Vec::new(); leaves.len()];
        for (i, a) in leaves.iter().enumerate() {
            for (j, b) in leaves.iter().enumerate().skip(i + 1) {
                if is_neighbor(a, b) {
                    adjacency[i].push(j);
                    adjacency[j].push(i);
                }
            }
        }
        Self { adjacency }
    }

    /// Neighbors of leaf `index`, ascending. Empty for out-of-range indices.
    #[must_use]
    pub fn neighbors(&self, index: usize) -> &[usize] {
        self.adjacency.get(index).map(Vec::as_slice).unwrap_or(&[])
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.adjacency.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.adjacency.is_empty()
    }
}

/// Adjacency for an ordered leaf sequence.
#[must_use]
pub fn neighbor_map(leaves: &[Bounds]) -> NeighborMap {
    NeighborMap::build(leaves)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn b(x_min: i64, x_max: i64, y_min: i64, y_max: i64) -> Bounds {
        Bounds::new(x_min, x_max, y_min, y_max).expect("ordered test bounds")
    }

    #[test]
    fn quadrants_form_a_ring() {
        let leaves = [b(0, 1, 0, 1), b(2, 3, 0, 1), b(0, 1, 2, 3), b(2, 3, 2, 3)];
        let map = neighbor_map(&leaves);
        assert_eq!(map.neighbors(0), &[1, 2]);
        assert_eq!(map.neighbors(1), &[0, 3]);
        assert_eq!(map.neighbors(2), &[0, 3]);
        assert_eq!(map.neighbors(3), &[1, 2]);
        assert_eq!(map.len(), 4);
    }

    #[test]
    fn unequal_edges_still_touch() {
        let big = b(0, 3, 0, 3);
        let small = b(4, 4, 3, 3);
        assert!(is_neighbor(&big, &small));
        assert!(is_neighbor(&small, &big));
    }

    #[test]
    fn lone_leaf_is_isolated() {
        let map = neighbor_map(&[b(0, 0, 0, 0), b(5, 5, 5, 5)]);
        assert!(map.neighbors(0).is_empty());
        assert!(map.neighbors(1).is_empty());
        assert!(map.neighbors(7).is_empty());
    }

    #[test]
    fn empty_input_gives_empty_map() {
        let map = neighbor_map(&[]);
        assert!(map.is_empty());
        assert_eq!(map.len(), 0);
    }
}
