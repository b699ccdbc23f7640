//! Bounded history of snapshots with change suppression.
//!
//! A new snapshot whose active state matches the last stored one replaces it
//! in place, which keeps the newest timestamps without growing the history.
//! Only a real change is classified and appended.

use crate::core::event::{classify, Event};
use crate::core::snapshot::Snapshot;
use std::collections::VecDeque;
use std::sync::Arc;

/// Default number of snapshots kept.
pub const DEFAULT_HISTORY_CAPACITY: usize = 10;

/// What [`SnapshotHistory::push`] did with a snapshot.
#[derive(Debug, Clone, PartialEq)]
pub enum HistoryUpdate {
    /// The history was empty; nothing to compare against.
    Started,
    /// The active state was unchanged; the last entry was replaced.
    Replaced,
    /// The active state changed; the snapshot was classified and appended.
    Appended(Event),
}

impl HistoryUpdate {
    /// The event produced by this update, if any.
    pub fn event(&self) -> Option<&Event> {
        match self {
            HistoryUpdate::Appended(event) => Some(event),
            _ => None,
        }
    }
}

/// Oldest-first buffer of published snapshots.
#[derive(Debug, Clone)]
pub struct SnapshotHistory {
    entries: VecDeque<Arc<Snapshot>>,
    capacity: usize,
}

impl Default for SnapshotHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

impl SnapshotHistory {
    /// Create a history holding at most `capacity` snapshots. A capacity of 0
    /// is raised to 1; [`TrackingEngine`](crate::core::TrackingEngine) rejects it
    /// up front instead.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Insert the snapshot for a new tick.
    ///
    /// A replacing snapshot carries no event: the tick produced no change.
    pub fn push(&mut self, mut current: Snapshot) -> HistoryUpdate {
        let Some(last) = self.entries.back() else {
            self.entries.push_back(Arc::new(current));
            return HistoryUpdate::Started;
        };

        if !last.differs(&current) {
            if let Some(slot) = self.entries.back_mut() {
                *slot = Arc::new(current);
            }
            return HistoryUpdate::Replaced;
        }

        let event = classify(last, &current);
        current.attach_event(event);
        self.entries.push_back(Arc::new(current));
        if self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
        HistoryUpdate::Appended(event)
    }

    /// Most recent snapshot.
    pub fn latest(&self) -> Option<&Arc<Snapshot>> {
        self.entries.back()
    }

    /// Snapshot before the most recent one.
    pub fn previous(&self) -> Option<&Arc<Snapshot>> {
        let len = self.entries.len();
        if len < 2 {
            return None;
        }
        self.entries.get(len - 2)
    }

    /// Event attached to the latest snapshot; "no event" when there is none.
    pub fn last_event(&self) -> Event {
        self.latest()
            .and_then(|snapshot| snapshot.event().copied())
            .unwrap_or_default()
    }

    /// Snapshots oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Snapshot>> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::snapshot::tests::snapshot_with_active;

    #[test]
    fn test_first_push_starts() {
        let mut history = SnapshotHistory::default();
        assert_eq!(history.last_event(), Event::none());
        assert_eq!(history.push(snapshot_with_active(9, &[], 0)), HistoryUpdate::Started);
        assert_eq!(history.len(), 1);
        assert!(history.latest().is_some_and(|s| s.event().is_none()));
        assert!(history.previous().is_none());
    }

    #[test]
    fn test_unchanged_state_replaces() {
        let mut history = SnapshotHistory::default();
        history.push(snapshot_with_active(9, &[1], 100));
        let update = history.push(snapshot_with_active(9, &[1], 200));
        assert_eq!(update, HistoryUpdate::Replaced);
        assert_eq!(history.len(), 1);
        assert_eq!(
            history.latest().map(|s| s.latest_sample_timestamp()),
            Some(200)
        );
    }

    #[test]
    fn test_replacement_clears_event() {
        let mut history = SnapshotHistory::default();
        history.push(snapshot_with_active(9, &[], 0));
        history.push(snapshot_with_active(9, &[5], 1));
        assert!(history.last_event().formed);
        history.push(snapshot_with_active(9, &[5], 2));
        assert!(history.last_event().is_empty());
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn test_change_appends_with_event() {
        let mut history = SnapshotHistory::default();
        history.push(snapshot_with_active(9, &[], 0));
        let update = history.push(snapshot_with_active(9, &[1, 2, 4], 1));
        let event = update.event().copied().unwrap_or_default();
        assert!(event.formed);
        assert_eq!(history.len(), 2);
        assert_eq!(history.latest().and_then(|s| s.event().copied()), Some(event));
        assert_eq!(history.previous().map(|s| s.blob_count()), Some(0));
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let mut history = SnapshotHistory::new(3);
        for tick in 0..6 {
            // Alternate so every push is a change.
            let active: &[u16] = if tick % 2 == 0 { &[1] } else { &[9] };
            history.push(snapshot_with_active(9, active, tick));
        }
        assert_eq!(history.len(), 3);
        let stamps: Vec<i64> = history.iter().map(|s| s.latest_sample_timestamp()).collect();
        assert_eq!(stamps, vec![3, 4, 5]);
    }
}
