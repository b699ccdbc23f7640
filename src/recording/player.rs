//! Frame-by-frame playback of a loaded recording.

use crate::core::Snapshot;
use std::time::Duration;

/// Steps through recorded snapshots, paced by their sample timestamps.
#[derive(Debug, Clone)]
pub struct Player {
    snapshots: Vec<Snapshot>,
    /// Index of the frame on display; `None` before the first frame.
    current: Option<usize>,
}

impl Player {
    pub fn new(snapshots: Vec<Snapshot>) -> Self {
        Self {
            snapshots,
            current: None,
        }
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn snapshots(&self) -> &[Snapshot] {
        &self.snapshots
    }

    /// Time between the first and last frame, in seconds.
    pub fn duration_secs(&self) -> f64 {
        match (self.snapshots.first(), self.snapshots.last()) {
            (Some(first), Some(last)) => {
                (last.latest_sample_timestamp() - first.latest_sample_timestamp()) as f64 / 1000.0
            }
            _ => 0.0,
        }
    }

    fn next_index(&self) -> Option<usize> {
        let next = self.current.map_or(0, |i| i + 1);
        (next < self.snapshots.len()).then_some(next)
    }

    /// Advance to the next frame. Returns `None` at the end.
    pub fn next_frame(&mut self) -> Option<&Snapshot> {
        let next = self.next_index()?;
        self.current = Some(next);
        self.snapshots.get(next)
    }

    pub fn current(&self) -> Option<&Snapshot> {
        self.current.and_then(|i| self.snapshots.get(i))
    }

    /// Time to wait before showing the next frame.
    pub fn delay_to_next(&self) -> Option<Duration> {
        let next = self.snapshots.get(self.next_index()?)?;
        let Some(current) = self.current() else {
            return Some(Duration::ZERO);
        };
        let gap = next.latest_sample_timestamp() - current.latest_sample_timestamp();
        Some(Duration::from_millis(gap.max(0) as u64))
    }

    /// Position playback `secs` seconds after the first frame.
    ///
    /// The next frame shown is the last one recorded at or before that point.
    /// Seeking past the end puts the player on the last frame.
    pub fn seek(&mut self, secs: u64) -> Option<&Snapshot> {
        let first = self.snapshots.first()?.latest_sample_timestamp();
        let last_index = self.snapshots.len() - 1;
        let offset_ms = i64::try_from(secs).unwrap_or(i64::MAX).saturating_mul(1000);
        let target = first.saturating_add(offset_ms);

        if target >= self.snapshots[last_index].latest_sample_timestamp() {
            self.current = Some(last_index);
        } else {
            let at_or_before = self
                .snapshots
                .iter()
                .rposition(|s| s.latest_sample_timestamp() <= target)
                .unwrap_or(0);
            self.current = at_or_before.checked_sub(1);
        }
        self.current()
    }

    /// Status line for the current frame.
    pub fn caption(&self) -> Option<String> {
        let snapshot = self.current()?;
        let event = snapshot
            .event()
            .map_or_else(|| "No Event".to_string(), |event| event.to_string());
        Some(format!("{event}, {}", snapshot.latest_sample_timestamp()))
    }

    pub fn rewind(&mut self) {
        self.current = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::snapshot::tests::snapshot_with_active;
    use crate::core::SnapshotHistory;

    fn frames() -> Vec<Snapshot> {
        vec![
            snapshot_with_active(9, &[], 0),
            snapshot_with_active(9, &[1], 1500),
            snapshot_with_active(9, &[1, 2], 2500),
            snapshot_with_active(9, &[], 4200),
        ]
    }

    #[test]
    fn test_duration() {
        assert_eq!(Player::new(frames()).duration_secs(), 4.2);
        assert_eq!(Player::new(Vec::new()).duration_secs(), 0.0);
    }

    #[test]
    fn test_plays_in_order() {
        let mut player = Player::new(frames());
        assert!(player.current().is_none());
        assert_eq!(player.delay_to_next(), Some(Duration::ZERO));
        player.next_frame();
        assert_eq!(player.delay_to_next(), Some(Duration::from_millis(1500)));

        let mut seen = 1;
        while player.next_frame().is_some() {
            seen += 1;
        }
        assert_eq!(seen, 4);
        assert_eq!(player.delay_to_next(), None);

        player.rewind();
        assert_eq!(player.next_frame().map(|s| s.latest_sample_timestamp()), Some(0));
    }

    #[test]
    fn test_seek_selects_last_frame_before_target() {
        let mut player = Player::new(frames());
        player.seek(2);
        let next = player.next_frame().map(|s| s.latest_sample_timestamp());
        assert_eq!(next, Some(1500));

        player.seek(0);
        assert!(player.current().is_none());

        let end = player.seek(60).map(|s| s.latest_sample_timestamp());
        assert_eq!(end, Some(4200));
        assert!(player.next_frame().is_none());
    }

    #[test]
    fn test_seek_far_past_end_lands_on_last_frame() {
        let mut player = Player::new(frames());
        let end = player.seek(u64::MAX).map(|s| s.latest_sample_timestamp());
        assert_eq!(end, Some(4200));

        let end = player.seek(i64::MAX as u64 + 1).map(|s| s.latest_sample_timestamp());
        assert_eq!(end, Some(4200));
    }

    #[test]
    fn test_caption() {
        let mut history = SnapshotHistory::default();
        history.push(snapshot_with_active(9, &[], 0));
        history.push(snapshot_with_active(9, &[5], 700));
        let recorded: Vec<Snapshot> = history.iter().map(|s| (**s).clone()).collect();

        let mut player = Player::new(recorded);
        assert!(player.caption().is_none());
        player.next_frame();
        assert_eq!(player.caption().as_deref(), Some("No Event, 0"));
        player.next_frame();
        assert_eq!(player.caption().as_deref(), Some("FORMED | EXPANDED, 700"));
    }
}
