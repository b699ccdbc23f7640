//! Inside/outside/boundary shading of nodes and blob contours.
//!
//! These are the derived views a renderer draws: a node is on the boundary
//! when one of its orthogonal neighbors is on the other side of the
//! threshold, and a blob's contour is the set of members with an orthogonal
//! side that leaves the blob (or the grid).

use crate::core::blob::Blob;
use crate::core::grid::Position;
use crate::core::snapshot::Snapshot;
use crate::core::NodeId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Shading of a single node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeShade {
    /// Active, and every orthogonal neighbor is active too.
    Inside,
    /// Inactive, and every orthogonal neighbor is inactive too.
    Outside,
    /// At least one orthogonal neighbor is on the other side of the threshold.
    Boundary,
}

/// Shade of `id`, or `None` if the node is not in the snapshot.
pub fn shade(snapshot: &Snapshot, id: NodeId) -> Option<NodeShade> {
    let node = snapshot.node(id)?;
    let active = node.is_active();
    let topology = snapshot.topology();

    let same = Position::ORTHOGONAL
        .into_iter()
        .filter_map(|position| topology.neighbor(id, position))
        .all(|neighbor| snapshot.is_active(neighbor) == active);

    Some(match (same, active) {
        (false, _) => NodeShade::Boundary,
        (true, true) => NodeShade::Inside,
        (true, false) => NodeShade::Outside,
    })
}

/// Members of `blob` that lie on its outline.
pub fn contour(snapshot: &Snapshot, blob: &Blob) -> BTreeSet<NodeId> {
    let topology = snapshot.topology();
    blob.members()
        .iter()
        .copied()
        .filter(|&id| {
            Position::ORTHOGONAL.into_iter().any(|position| {
                topology
                    .neighbor(id, position)
                    .map_or(true, |neighbor| !blob.contains(neighbor))
            })
        })
        .collect()
}

/// Text rendering of the grid, top row first.
///
/// `#` inside, `.` outside, `+` boundary active, `-` boundary inactive; cells
/// past the last node of an incomplete row are blank.
pub fn render_grid(snapshot: &Snapshot) -> String {
    let topology = snapshot.topology();
    let dim = topology.dimension();
    let mut out = String::new();

    for row in (0..dim).rev() {
        let cells: Vec<&str> = (0..dim)
            .map(|col| {
                let Some(id) = topology.id_at(row * dim + col) else {
                    return " ";
                };
                match shade(snapshot, id) {
                    Some(NodeShade::Inside) => "#",
                    Some(NodeShade::Outside) => ".",
                    Some(NodeShade::Boundary) if snapshot.is_active(id) => "+",
                    Some(NodeShade::Boundary) => "-",
                    None => " ",
                }
            })
            .collect();
        out.push_str(cells.join(" ").trim_end());
        out.push('\n');
    }
    out
}
