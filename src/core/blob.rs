//! Connected regions of active nodes.

use crate::core::grid::GridTopology;
use crate::core::NodeId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A point in grid-cell units (`x` = column, `y` = row).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// A maximal 8-connected set of active nodes within one snapshot.
///
/// Blobs are built only by [`Snapshot`](crate::core::Snapshot) clustering, so
/// they are never empty and their members are always active.
#[derive(Debug, Clone, PartialEq)]
pub struct Blob {
    members: BTreeSet<NodeId>,
    center: Point,
}

impl Blob {
    /// Build a blob from its members, computing the center on the owning
    /// snapshot's topology.
    pub(crate) fn new(members: BTreeSet<NodeId>, topology: &GridTopology) -> Self {
        let mut sum_x = 0.0;
        let mut sum_y = 0.0;
        let mut count = 0usize;
        for &id in &members {
            if let Some((col, row)) = topology.coords(id) {
                sum_x += col as f64;
                sum_y += row as f64;
                count += 1;
            }
        }
        let center = if count == 0 {
            Point { x: 0.0, y: 0.0 }
        } else {
            Point {
                x: sum_x / count as f64,
                y: sum_y / count as f64,
            }
        };
        Self { members, center }
    }

    /// Member ids in ascending order.
    pub fn members(&self) -> &BTreeSet<NodeId> {
        &self.members
    }

    pub fn size(&self) -> usize {
        self.members.len()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.members.contains(&id)
    }

    /// Mean `(col, row)` of the members.
    pub fn center(&self) -> Point {
        self.center
    }

    /// Whether the two blobs share at least one node.
    pub fn intersects(&self, other: &Blob) -> bool {
        // Both sets are sorted; walk the smaller one.
        let (small, large) = if self.size() <= other.size() {
            (&self.members, &other.members)
        } else {
            (&other.members, &self.members)
        };
        small.iter().any(|id| large.contains(id))
    }

    /// Whether the blobs are disjoint but touch through an 8-neighbor pair.
    pub fn is_neighboring(&self, other: &Blob, topology: &GridTopology) -> bool {
        if self.intersects(other) {
            return false;
        }
        self.members
            .iter()
            .any(|&id| topology.neighbors(id).any(|n| other.contains(n)))
    }
}
