//! Classification of the change between two consecutive snapshots.
//!
//! Every facet is evaluated on its own; an event can be, for example, both
//! `SPLIT` and `FORMED` at once.

use crate::core::blob::{Blob, Point};
use crate::core::snapshot::Snapshot;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Compass direction of a blob move. North is toward higher rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    N,
    S,
    E,
    W,
    NE,
    NW,
    SE,
    SW,
}

impl Direction {
    /// Direction of a displacement, or `None` when it is zero on both axes.
    pub fn from_delta(dx: f64, dy: f64) -> Option<Direction> {
        use std::cmp::Ordering::*;
        let sign = |v: f64| v.partial_cmp(&0.0).unwrap_or(Equal);
        match (sign(dx), sign(dy)) {
            (Greater, Greater) => Some(Direction::NE),
            (Greater, Less) => Some(Direction::SE),
            (Greater, Equal) => Some(Direction::E),
            (Less, Greater) => Some(Direction::NW),
            (Less, Less) => Some(Direction::SW),
            (Less, Equal) => Some(Direction::W),
            (Equal, Greater) => Some(Direction::N),
            (Equal, Less) => Some(Direction::S),
            (Equal, Equal) => None,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Direction::N => "N",
            Direction::S => "S",
            Direction::E => "E",
            Direction::W => "W",
            Direction::NE => "NE",
            Direction::NW => "NW",
            Direction::SE => "SE",
            Direction::SW => "SW",
        };
        f.write_str(s)
    }
}

/// One independent event facet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Facet {
    Formed,
    Vanished,
    Merged,
    Split,
    Expanded,
    Shrunk,
    Moved,
}

impl fmt::Display for Facet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Facet::Formed => "FORMED",
            Facet::Vanished => "VANISHED",
            Facet::Merged => "MERGED",
            Facet::Split => "SPLIT",
            Facet::Expanded => "EXPANDED",
            Facet::Shrunk => "SHRUNK",
            Facet::Moved => "MOVED",
        };
        f.write_str(s)
    }
}

/// The classified change between a snapshot and its predecessor.
///
/// `moved` carries the direction; a move is only reported when it has one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub formed: bool,
    pub vanished: bool,
    pub merged: bool,
    pub split: bool,
    pub expanded: bool,
    pub shrunk: bool,
    pub moved: Option<Direction>,
}

impl Event {
    /// An event with no facets set.
    pub fn none() -> Self {
        Self::default()
    }

    /// Whether no facet is set.
    pub fn is_empty(&self) -> bool {
        self.facets().is_empty()
    }

    pub fn has(&self, facet: Facet) -> bool {
        match facet {
            Facet::Formed => self.formed,
            Facet::Vanished => self.vanished,
            Facet::Merged => self.merged,
            Facet::Split => self.split,
            Facet::Expanded => self.expanded,
            Facet::Shrunk => self.shrunk,
            Facet::Moved => self.moved.is_some(),
        }
    }

    /// Set facets in a fixed order.
    pub fn facets(&self) -> Vec<Facet> {
        [
            Facet::Formed,
            Facet::Vanished,
            Facet::Merged,
            Facet::Split,
            Facet::Expanded,
            Facet::Shrunk,
            Facet::Moved,
        ]
        .into_iter()
        .filter(|facet| self.has(*facet))
        .collect()
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let facets = self.facets();
        if facets.is_empty() {
            return f.write_str("No Event");
        }
        let labels: Vec<String> = facets
            .into_iter()
            .map(|facet| match (facet, self.moved) {
                (Facet::Moved, Some(direction)) => format!("MOVED {direction}"),
                _ => facet.to_string(),
            })
            .collect();
        f.write_str(&labels.join(" | "))
    }
}

/// Round to two decimal places.
fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn displacement(from: Point, to: Point) -> (f64, f64) {
    (round2(to.x - from.x), round2(to.y - from.y))
}

/// Whether any blob on one side overlaps two or more blobs on the other.
fn overlaps_many(side: &[Blob], other: &[Blob]) -> bool {
    side.iter()
        .any(|blob| other.iter().filter(|o| blob.intersects(o)).count() >= 2)
}

/// Classify the change from `previous` to `current`.
///
/// Move candidates are evaluated in blob order (previous, then current) and
/// the last candidate with a nonzero displacement decides the direction.
pub fn classify(previous: &Snapshot, current: &Snapshot) -> Event {
    let before = previous.blobs();
    let after = current.blobs();
    let topology = previous.topology();

    let mut moved = None;
    for from in before {
        for to in after {
            if from.size() != to.size() {
                continue;
            }
            if !(from.intersects(to) || from.is_neighboring(to, topology)) {
                continue;
            }
            let (dx, dy) = displacement(from.center(), to.center());
            if let Some(direction) = Direction::from_delta(dx, dy) {
                moved = Some(direction);
            }
        }
    }

    let active_before = previous.active_count();
    let active_after = current.active_count();

    Event {
        formed: after.len() > before.len(),
        vanished: after.len() < before.len(),
        merged: overlaps_many(after, before),
        split: overlaps_many(before, after),
        expanded: active_after > active_before,
        shrunk: active_after < active_before,
        moved,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::snapshot::tests::snapshot_with_active;

    #[test]
    fn test_direction_from_delta() {
        assert_eq!(Direction::from_delta(1.0, 0.0), Some(Direction::E));
        assert_eq!(Direction::from_delta(-1.0, 0.0), Some(Direction::W));
        assert_eq!(Direction::from_delta(0.0, 0.5), Some(Direction::N));
        assert_eq!(Direction::from_delta(0.0, -0.5), Some(Direction::S));
        assert_eq!(Direction::from_delta(0.3, 0.3), Some(Direction::NE));
        assert_eq!(Direction::from_delta(-0.3, -0.3), Some(Direction::SW));
        assert_eq!(Direction::from_delta(0.0, 0.0), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(Event::none().to_string(), "No Event");
        let event = Event {
            formed: true,
            moved: Some(Direction::NE),
            ..Event::default()
        };
        assert_eq!(event.to_string(), "FORMED | MOVED NE");
    }

    #[test]
    fn test_formed_from_nothing() {
        let prev = snapshot_with_active(9, &[], 0);
        let cur = snapshot_with_active(9, &[1, 2, 4], 1);
        let event = classify(&prev, &cur);
        assert!(event.formed);
        assert!(event.expanded);
        assert!(!event.vanished);
        assert_eq!(event.moved, None);
    }

    #[test]
    fn test_vanished_and_shrunk() {
        let prev = snapshot_with_active(9, &[1, 9], 0);
        let cur = snapshot_with_active(9, &[1], 1);
        let event = classify(&prev, &cur);
        assert!(event.vanished);
        assert!(event.shrunk);
        assert!(!event.formed);
        // {1} stays put: same size and overlapping, but no displacement.
        assert_eq!(event.moved, None);
    }

    #[test]
    fn test_last_qualifying_pair_decides_direction() {
        // 4x4: {1} -> {5} steps N, then {3} -> {8} steps NE and is seen last.
        let prev = snapshot_with_active(16, &[1, 3], 0);
        let cur = snapshot_with_active(16, &[5, 8], 1);
        assert_eq!(classify(&prev, &cur).moved, Some(Direction::NE));

        // {1} -> {5} (N) is still a candidate, but {3} -> {4} (E) comes later.
        let prev = snapshot_with_active(16, &[1, 3], 0);
        let cur = snapshot_with_active(16, &[4, 5], 1);
        assert_eq!(classify(&prev, &cur).moved, Some(Direction::E));
    }

    #[test]
    fn test_stationary_blob_is_not_a_move() {
        let prev = snapshot_with_active(9, &[1, 2], 0);
        let cur = snapshot_with_active(9, &[1, 2], 1);
        assert_eq!(classify(&prev, &cur).moved, None);
    }

    #[test]
    fn test_move_east() {
        let prev = snapshot_with_active(9, &[1, 2, 4], 0);
        let cur = snapshot_with_active(9, &[2, 3, 5], 1);
        let event = classify(&prev, &cur);
        assert_eq!(event.moved, Some(Direction::E));
        assert!(!event.expanded && !event.shrunk);
        assert_eq!(event.facets(), vec![Facet::Moved]);
    }

    #[test]
    fn test_move_through_neighbor_without_overlap() {
        // Single node steps diagonally up-right.
        let prev = snapshot_with_active(9, &[1], 0);
        let cur = snapshot_with_active(9, &[5], 1);
        assert_eq!(classify(&prev, &cur).moved, Some(Direction::NE));
    }

    #[test]
    fn test_jump_is_not_a_move() {
        let prev = snapshot_with_active(9, &[1], 0);
        let cur = snapshot_with_active(9, &[9], 1);
        assert_eq!(classify(&prev, &cur).moved, None);
    }

    #[test]
    fn test_merge_and_split() {
        let apart = snapshot_with_active(9, &[1, 3], 0);
        let joined = snapshot_with_active(9, &[1, 2, 3], 1);
        let merge = classify(&apart, &joined);
        assert!(merge.merged);
        assert!(merge.vanished);
        assert!(!merge.split);

        let split = classify(&joined, &apart);
        assert!(split.split);
        assert!(split.formed);
        assert!(!split.merged);
    }

    #[test]
    fn test_classification_is_idempotent() {
        let prev = snapshot_with_active(16, &[1, 2, 6], 0);
        let cur = snapshot_with_active(16, &[6, 7, 11, 16], 1);
        assert_eq!(classify(&prev, &cur), classify(&prev, &cur));
    }
}
