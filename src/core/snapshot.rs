//! Per-tick capture of every node reading, clustered into blobs.
//!
//! A `Snapshot` is built once from the latest reading of each registered node
//! and never changes afterwards, except for the [`Event`] attached when it is
//! compared against its predecessor.
//!
//! Clustering is a worklist flood fill: active nodes are visited in ascending
//! id order and each unassigned one seeds a blob that absorbs every active
//! node reachable through 8-neighbors.

use crate::core::blob::Blob;
use crate::core::event::Event;
use crate::core::grid::GridTopology;
use crate::core::NodeId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// The latest sample reported by one node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reading {
    pub sample: i32,
    /// Source time of the sample in milliseconds.
    pub timestamp_ms: i64,
}

impl Reading {
    pub fn new(sample: i32, timestamp_ms: i64) -> Self {
        Self {
            sample,
            timestamp_ms,
        }
    }
}

/// One node's state inside a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Node {
    pub id: NodeId,
    pub threshold: i32,
    pub sample: i32,
    pub sample_timestamp: i64,
}

impl Node {
    /// A node is active when its sample reaches the threshold.
    pub fn is_active(&self) -> bool {
        self.sample >= self.threshold
    }
}

/// A clustered capture of all node states at one instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "PersistedSnapshot", into = "PersistedSnapshot")]
pub struct Snapshot {
    threshold: i32,
    nodes: BTreeMap<NodeId, Node>,
    topology: GridTopology,
    blobs: Vec<Blob>,
    event: Option<Event>,
}

impl Snapshot {
    /// Capture readings under a shared threshold and cluster the active nodes.
    pub fn capture(threshold: i32, readings: impl IntoIterator<Item = (NodeId, Reading)>) -> Self {
        let nodes: BTreeMap<NodeId, Node> = readings
            .into_iter()
            .map(|(id, reading)| {
                (
                    id,
                    Node {
                        id,
                        threshold,
                        sample: reading.sample,
                        sample_timestamp: reading.timestamp_ms,
                    },
                )
            })
            .collect();
        let topology = GridTopology::new(nodes.keys().copied());
        let blobs = cluster(&nodes, &topology);

        Self {
            threshold,
            nodes,
            topology,
            blobs,
            event: None,
        }
    }

    /// Number of nodes in the snapshot.
    pub fn size(&self) -> usize {
        self.nodes.len()
    }

    pub fn threshold(&self) -> i32 {
        self.threshold
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    /// Nodes in ascending id order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn topology(&self) -> &GridTopology {
        &self.topology
    }

    /// Blobs ordered by their smallest member id.
    pub fn blobs(&self) -> &[Blob] {
        &self.blobs
    }

    pub fn blob_count(&self) -> usize {
        self.blobs.len()
    }

    /// Total number of nodes across all blobs.
    pub fn active_count(&self) -> usize {
        self.blobs.iter().map(Blob::size).sum()
    }

    pub fn is_active(&self, id: NodeId) -> bool {
        self.nodes.get(&id).is_some_and(Node::is_active)
    }

    /// Newest sample timestamp across all nodes, 0 for an empty snapshot.
    pub fn latest_sample_timestamp(&self) -> i64 {
        self.nodes
            .values()
            .map(|node| node.sample_timestamp)
            .max()
            .unwrap_or(0)
    }

    /// Event computed against the predecessor, if one was attached.
    pub fn event(&self) -> Option<&Event> {
        self.event.as_ref()
    }

    pub(crate) fn attach_event(&mut self, event: Event) {
        self.event = Some(event);
    }

    /// Whether the active state differs from another snapshot: the node set
    /// changed or some node's active flag flipped.
    pub fn differs(&self, other: &Snapshot) -> bool {
        if !self.nodes.keys().eq(other.nodes.keys()) {
            return true;
        }
        self.nodes
            .values()
            .any(|node| node.is_active() != other.is_active(node.id))
    }

    /// Multi-line dump of the snapshot for logs and the `inspect` command.
    pub fn debug(&self) -> String {
        let mut out = format!(
            "snapshot @{} threshold={} nodes={} blobs={}\n",
            self.latest_sample_timestamp(),
            self.threshold,
            self.size(),
            self.blob_count()
        );
        for node in self.nodes.values() {
            out.push_str(&format!(
                "  node[{}] sample={} ts={} active={}\n",
                node.id,
                node.sample,
                node.sample_timestamp,
                node.is_active()
            ));
        }
        for (i, blob) in self.blobs.iter().enumerate() {
            let center = blob.center();
            out.push_str(&format!(
                "  blob[{i}] members={:?} center=({:.2}, {:.2})\n",
                blob.members(),
                center.x,
                center.y
            ));
        }
        match &self.event {
            Some(event) => out.push_str(&format!("  event: {event}\n")),
            None => out.push_str("  event: none\n"),
        }
        out
    }
}

/// Partition active nodes into 8-connected blobs.
fn cluster(nodes: &BTreeMap<NodeId, Node>, topology: &GridTopology) -> Vec<Blob> {
    let mut assigned: BTreeSet<NodeId> = BTreeSet::new();
    let mut blobs = Vec::new();

    let is_active = |id: NodeId| nodes.get(&id).is_some_and(Node::is_active);

    for (&seed, node) in nodes {
        if !node.is_active() || assigned.contains(&seed) {
            continue;
        }

        let mut members = BTreeSet::new();
        let mut worklist = vec![seed];
        assigned.insert(seed);

        while let Some(current) = worklist.pop() {
            members.insert(current);
            for neighbor in topology.neighbors(current) {
                if is_active(neighbor) && assigned.insert(neighbor) {
                    worklist.push(neighbor);
                }
            }
        }

        blobs.push(Blob::new(members, topology));
    }

    blobs
}

/// On-disk form of a snapshot. Blobs are derived, so only readings,
/// threshold, and the attached event are stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct PersistedSnapshot {
    threshold: i32,
    nodes: Vec<PersistedNode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    event: Option<Event>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PersistedNode {
    id: NodeId,
    sample: i32,
    ts: i64,
}

impl From<Snapshot> for PersistedSnapshot {
    fn from(snapshot: Snapshot) -> Self {
        Self {
            threshold: snapshot.threshold,
            nodes: snapshot
                .nodes
                .values()
                .map(|node| PersistedNode {
                    id: node.id,
                    sample: node.sample,
                    ts: node.sample_timestamp,
                })
                .collect(),
            event: snapshot.event,
        }
    }
}

impl From<PersistedSnapshot> for Snapshot {
    fn from(persisted: PersistedSnapshot) -> Self {
        let mut snapshot = Snapshot::capture(
            persisted.threshold,
            persisted
                .nodes
                .into_iter()
                .map(|node| (node.id, Reading::new(node.sample, node.ts))),
        );
        snapshot.event = persisted.event;
        snapshot
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// A snapshot of `size` nodes (ids `1..=size`) where `active` read 80 and
    /// the rest read 0, threshold 50.
    pub(crate) fn snapshot_with_active(size: NodeId, active: &[NodeId], ts: i64) -> Snapshot {
        Snapshot::capture(
            50,
            (1..=size).map(|id| {
                let sample = if active.contains(&id) { 80 } else { 0 };
                (id, Reading::new(sample, ts))
            }),
        )
    }

    fn members(snapshot: &Snapshot) -> Vec<Vec<NodeId>> {
        snapshot
            .blobs()
            .iter()
            .map(|b| b.members().iter().copied().collect())
            .collect()
    }

    #[test]
    fn test_no_active_nodes() {
        let s = snapshot_with_active(9, &[], 0);
        assert_eq!(s.size(), 9);
        assert_eq!(s.blob_count(), 0);
        assert_eq!(s.active_count(), 0);
    }

    #[test]
    fn test_empty_snapshot_is_legal() {
        let s = Snapshot::capture(50, std::iter::empty());
        assert_eq!(s.size(), 0);
        assert_eq!(s.blob_count(), 0);
        assert_eq!(s.latest_sample_timestamp(), 0);
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let s = Snapshot::capture(50, [(1, Reading::new(50, 0)), (2, Reading::new(49, 0))]);
        assert!(s.is_active(1));
        assert!(!s.is_active(2));
    }

    #[test]
    fn test_l_shape_is_one_blob() {
        let s = snapshot_with_active(9, &[1, 2, 4], 0);
        assert_eq!(members(&s), vec![vec![1, 2, 4]]);
    }

    #[test]
    fn test_diagonal_chain_is_connected() {
        // 3 -> 5 -> 7 runs down-left to up-right diagonals only.
        let s = snapshot_with_active(9, &[3, 5, 7], 0);
        assert_eq!(members(&s), vec![vec![3, 5, 7]]);
    }

    #[test]
    fn test_reached_only_from_below_left() {
        // Staircase climbing up and to the right, then bending back left.
        let s = snapshot_with_active(16, &[2, 3, 8, 12, 15], 0);
        assert_eq!(members(&s), vec![vec![2, 3, 8, 12, 15]]);
    }

    #[test]
    fn test_separate_blobs_in_order() {
        let s = snapshot_with_active(9, &[7, 1, 3], 0);
        assert_eq!(members(&s), vec![vec![1], vec![3], vec![7]]);
        assert!(s.blobs().iter().all(|b| b.size() == 1));
        assert!(!s.blobs().iter().any(|b| b.contains(2)));
    }

    #[test]
    fn test_differs() {
        let a = snapshot_with_active(9, &[1, 2], 0);
        let b = snapshot_with_active(9, &[1, 2], 500);
        let c = snapshot_with_active(9, &[1], 0);
        let d = snapshot_with_active(16, &[1, 2], 0);
        assert!(!a.differs(&a));
        assert!(!a.differs(&b));
        assert!(a.differs(&c) && c.differs(&a));
        assert!(a.differs(&d) && d.differs(&a));
    }

    #[test]
    fn test_latest_sample_timestamp() {
        let s = Snapshot::capture(10, [(1, Reading::new(0, 40)), (2, Reading::new(0, 90))]);
        assert_eq!(s.latest_sample_timestamp(), 90);
    }

    #[test]
    fn test_json_rebuilds_blobs() {
        let mut s = snapshot_with_active(16, &[1, 6, 11, 4], 7);
        s.attach_event(Event {
            expanded: true,
            ..Event::default()
        });
        let json = serde_json::to_string(&s).unwrap();
        let back: Snapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, s);
        assert_eq!(members(&back), vec![vec![1, 6, 11], vec![4]]);
    }
}
