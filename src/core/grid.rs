//! Grid geometry for small square node layouts.
//!
//! Nodes are laid out row-major in ascending id order. Row 0 is the bottom
//! row of the physical grid and rows grow upward, so `U` means "one row up"
//! (index + dimension).

use crate::core::NodeId;
use serde::{Deserialize, Serialize};

/// Largest supported grid (4x4).
pub const MAX_NODES: usize = 16;

/// Grid side length for a given number of live nodes.
///
/// Up to 9 nodes form a 3x3 grid; anything larger uses a 4x4 grid, leaving the
/// top row incomplete for 10 to 15 nodes.
pub fn dimension(node_count: usize) -> usize {
    if node_count <= 9 {
        3
    } else {
        4
    }
}

/// Position of a neighbor relative to a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Position {
    /// Left (west)
    L,
    /// Right (east)
    R,
    /// Up (north)
    U,
    /// Below (south)
    B,
    UL,
    UR,
    BL,
    BR,
}

impl Position {
    /// All eight positions.
    pub const ALL: [Position; 8] = [
        Position::L,
        Position::R,
        Position::U,
        Position::B,
        Position::UL,
        Position::UR,
        Position::BL,
        Position::BR,
    ];

    /// The four orthogonal positions.
    pub const ORTHOGONAL: [Position; 4] = [Position::L, Position::R, Position::U, Position::B];

    /// Column and row offset of this position.
    pub fn offset(self) -> (i32, i32) {
        match self {
            Position::L => (-1, 0),
            Position::R => (1, 0),
            Position::U => (0, 1),
            Position::B => (0, -1),
            Position::UL => (-1, 1),
            Position::UR => (1, 1),
            Position::BL => (-1, -1),
            Position::BR => (1, -1),
        }
    }
}

/// Row/column layout of one snapshot's live node set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridTopology {
    ids: Vec<NodeId>,
    dimension: usize,
}

impl GridTopology {
    /// Build the layout for a set of node ids. Duplicates are collapsed and
    /// the ids are ordered ascending.
    pub fn new(ids: impl IntoIterator<Item = NodeId>) -> Self {
        let mut ids: Vec<NodeId> = ids.into_iter().collect();
        ids.sort_unstable();
        ids.dedup();
        let dimension = dimension(ids.len());
        Self { ids, dimension }
    }

    /// Grid side length.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Ordinal position of `id` in ascending id order.
    pub fn index_of(&self, id: NodeId) -> Option<usize> {
        self.ids.binary_search(&id).ok()
    }

    /// Node at a linear grid index.
    pub fn id_at(&self, index: usize) -> Option<NodeId> {
        self.ids.get(index).copied()
    }

    /// `(col, row)` of a node.
    pub fn coords(&self, id: NodeId) -> Option<(usize, usize)> {
        self.index_of(id)
            .map(|idx| (idx % self.dimension, idx / self.dimension))
    }

    /// Neighbor of `id` in the given position, if it lies on the grid.
    ///
    /// Lookups never wrap around an edge, and a cell past the last live node
    /// of an incomplete row has no node.
    pub fn neighbor(&self, id: NodeId, position: Position) -> Option<NodeId> {
        let (col, row) = self.coords(id)?;
        let (dc, dr) = position.offset();
        let col = col as i32 + dc;
        let row = row as i32 + dr;
        let dim = self.dimension as i32;
        if col < 0 || col >= dim || row < 0 || row >= dim {
            return None;
        }
        self.id_at((row * dim + col) as usize)
    }

    /// All existing 8-neighbors of `id`.
    pub fn neighbors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        Position::ALL
            .into_iter()
            .filter_map(move |position| self.neighbor(id, position))
    }

    /// Whether `a` and `b` are 8-neighbors.
    pub fn are_neighbors(&self, a: NodeId, b: NodeId) -> bool {
        a != b && self.neighbors(a).any(|n| n == b)
    }

    /// Live node ids in ascending order.
    pub fn ids(&self) -> &[NodeId] {
        &self.ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(n: NodeId) -> GridTopology {
        GridTopology::new(1..=n)
    }

    #[test]
    fn test_dimension_discontinuity() {
        assert_eq!(dimension(0), 3);
        assert_eq!(dimension(9), 3);
        assert_eq!(dimension(10), 4);
        assert_eq!(dimension(16), 4);
    }

    #[test]
    fn test_coords_row_major_from_bottom() {
        let g = grid(9);
        assert_eq!(g.coords(1), Some((0, 0)));
        assert_eq!(g.coords(3), Some((2, 0)));
        assert_eq!(g.coords(4), Some((0, 1)));
        assert_eq!(g.coords(9), Some((2, 2)));
        assert_eq!(g.coords(10), None);
    }

    #[test]
    fn test_neighbors_of_center() {
        let g = grid(9);
        let mut n: Vec<NodeId> = g.neighbors(5).collect();
        n.sort();
        assert_eq!(n, vec![1, 2, 3, 4, 6, 7, 8, 9]);
        assert_eq!(g.neighbor(5, Position::U), Some(8));
        assert_eq!(g.neighbor(5, Position::B), Some(2));
        assert_eq!(g.neighbor(5, Position::UR), Some(9));
        assert_eq!(g.neighbor(5, Position::BL), Some(1));
    }

    #[test]
    fn test_edges_do_not_wrap() {
        let g = grid(9);
        assert_eq!(g.neighbor(3, Position::R), None);
        assert_eq!(g.neighbor(4, Position::L), None);
        assert_eq!(g.neighbor(1, Position::B), None);
        assert_eq!(g.neighbor(7, Position::U), None);
        assert_eq!(g.neighbor(3, Position::UR), None);
    }

    #[test]
    fn test_incomplete_top_row() {
        // 11 nodes on a 4-wide grid: top row holds only ids 9..=11.
        let g = grid(11);
        assert_eq!(g.dimension(), 4);
        assert_eq!(g.coords(11), Some((2, 2)));
        assert_eq!(g.neighbor(7, Position::U), Some(11));
        assert_eq!(g.neighbor(8, Position::U), None);
        assert_eq!(g.neighbor(11, Position::R), None);
    }

    #[test]
    fn test_sparse_ids_use_ordinal_position() {
        let g = GridTopology::new([40, 10, 30, 20]);
        assert_eq!(g.ids(), &[10, 20, 30, 40]);
        assert_eq!(g.coords(40), Some((0, 1)));
        assert!(g.are_neighbors(10, 40));
        assert!(!g.are_neighbors(10, 10));
    }

    fn opposite(position: Position) -> Position {
        let (dx, dy) = position.offset();
        Position::ALL
            .into_iter()
            .find(|p| p.offset() == (-dx, -dy))
            .unwrap()
    }

    #[test]
    fn test_neighbor_relation_is_symmetric() {
        let g = grid(16);
        for a in 1..=16 {
            for p in Position::ALL {
                if let Some(b) = g.neighbor(a, p) {
                    assert_eq!(g.neighbor(b, opposite(p)), Some(a));
                }
            }
        }
    }
}
