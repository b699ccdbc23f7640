//! The tracking façade driven by the periodic tick.
//!
//! Each tick turns the latest reading of every registered node into a
//! [`Snapshot`], feeds it to the [`SnapshotHistory`], and publishes the result
//! through a [`SharedLatest`] handle that readers can poll from other threads.

use crate::config::{validate_history_capacity, validate_threshold, Config};
use crate::core::event::Event;
use crate::core::history::{HistoryUpdate, SnapshotHistory, DEFAULT_HISTORY_CAPACITY};
use crate::core::snapshot::{Reading, Snapshot};
use crate::core::NodeId;
use crate::error::{Result, TrackingError};
use crate::stats::{create_shared_stats, SharedTrackingStats};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, RwLock};

/// A sample as delivered by the transport. The timestamp may be missing on a
/// corrupted packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleReport {
    pub sample: i32,
    pub timestamp_ms: Option<i64>,
}

impl SampleReport {
    pub fn new(sample: i32, timestamp_ms: i64) -> Self {
        Self {
            sample,
            timestamp_ms: Some(timestamp_ms),
        }
    }
}

/// Input for one tick: the registered node set and the newest report per node.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReadingBatch {
    pub registered: BTreeSet<NodeId>,
    pub readings: BTreeMap<NodeId, SampleReport>,
}

impl ReadingBatch {
    /// A batch whose registered set is exactly the reporting nodes.
    pub fn from_readings(readings: impl IntoIterator<Item = (NodeId, SampleReport)>) -> Self {
        let readings: BTreeMap<NodeId, SampleReport> = readings.into_iter().collect();
        Self {
            registered: readings.keys().copied().collect(),
            readings,
        }
    }
}

/// Latest published snapshot, shared with readers.
///
/// A snapshot is only published after clustering and classification have
/// finished, so readers never see a partially built one.
#[derive(Debug, Clone, Default)]
pub struct SharedLatest(Arc<RwLock<Option<Arc<Snapshot>>>>);

impl SharedLatest {
    pub fn get(&self) -> Option<Arc<Snapshot>> {
        match self.0.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn publish(&self, snapshot: Arc<Snapshot>) {
        match self.0.write() {
            Ok(mut guard) => *guard = Some(snapshot),
            Err(poisoned) => *poisoned.into_inner() = Some(snapshot),
        }
    }
}

/// Builds snapshots, maintains history, and reports events.
pub struct TrackingEngine {
    threshold: i32,
    history: SnapshotHistory,
    latest: SharedLatest,
    stats: SharedTrackingStats,
}

impl TrackingEngine {
    /// Create an engine. Fails if the threshold is out of range or the
    /// history capacity is zero.
    pub fn new(threshold: i32, history_capacity: usize) -> Result<Self> {
        let threshold = validate_threshold(threshold as i64)?;
        let capacity = validate_history_capacity(history_capacity)?;
        Ok(Self {
            threshold,
            history: SnapshotHistory::new(capacity),
            latest: SharedLatest::default(),
            stats: create_shared_stats(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(config.threshold, config.history_capacity)
    }

    /// Use an externally owned stats handle.
    pub fn with_stats(mut self, stats: SharedTrackingStats) -> Self {
        self.stats = stats;
        self
    }

    pub fn threshold(&self) -> i32 {
        self.threshold
    }

    /// Change the threshold for subsequent ticks. An invalid value is
    /// rejected and the current threshold stays in effect.
    pub fn set_threshold(&mut self, threshold: i64) -> Result<()> {
        self.threshold = validate_threshold(threshold)?;
        tracing::info!(threshold = self.threshold, "threshold updated");
        Ok(())
    }

    pub fn history(&self) -> &SnapshotHistory {
        &self.history
    }

    /// Handle for readers of the latest snapshot.
    pub fn latest_handle(&self) -> SharedLatest {
        self.latest.clone()
    }

    pub fn latest(&self) -> Option<Arc<Snapshot>> {
        self.history.latest().cloned()
    }

    pub fn stats(&self) -> &SharedTrackingStats {
        &self.stats
    }

    /// Process one tick and return the event it produced, if any.
    ///
    /// Malformed readings are dropped; a registered node without a usable
    /// reading keeps the value it had in the previous snapshot.
    pub fn tick(&mut self, batch: &ReadingBatch) -> Option<Event> {
        let (readings, dropped) = self.collect_readings(batch);
        self.stats.record_tick();
        if !dropped.is_empty() {
            self.stats.record_dropped(dropped.len() as u64);
            for err in &dropped {
                tracing::warn!("dropping reading: {err}");
            }
        }

        let snapshot = Snapshot::capture(self.threshold, readings);
        tracing::debug!(
            nodes = snapshot.size(),
            blobs = snapshot.blob_count(),
            active = snapshot.active_count(),
            "snapshot captured"
        );

        let update = self.history.push(snapshot);
        match &update {
            HistoryUpdate::Started | HistoryUpdate::Appended(_) => self.stats.record_appended(),
            HistoryUpdate::Replaced => self.stats.record_replaced(),
        }

        if let Some(latest) = self.history.latest() {
            self.latest.publish(Arc::clone(latest));
        }

        let event = update.event().copied();
        if let Some(event) = event.filter(|e| !e.is_empty()) {
            self.stats.record_event();
            tracing::info!(%event, "event detected");
        }
        event
    }

    fn collect_readings(&self, batch: &ReadingBatch) -> (Vec<(NodeId, Reading)>, Vec<TrackingError>) {
        let mut dropped = Vec::new();
        let mut usable: BTreeMap<NodeId, Reading> = BTreeMap::new();

        for (&id, report) in &batch.readings {
            if !batch.registered.contains(&id) {
                dropped.push(TrackingError::MalformedInput {
                    node: id,
                    reason: "node is not registered".to_string(),
                });
                continue;
            }
            match report.timestamp_ms {
                Some(ts) => {
                    usable.insert(id, Reading::new(report.sample, ts));
                }
                None => dropped.push(TrackingError::MalformedInput {
                    node: id,
                    reason: "missing sample timestamp".to_string(),
                }),
            }
        }

        let previous = self.history.latest();
        let readings = batch
            .registered
            .iter()
            .filter_map(|&id| {
                usable.get(&id).copied().or_else(|| {
                    previous
                        .and_then(|snapshot| snapshot.node(id))
                        .map(|node| Reading::new(node.sample, node.sample_timestamp))
                })
                .map(|reading| (id, reading))
            })
            .collect();

        (readings, dropped)
    }
}

impl Default for TrackingEngine {
    fn default() -> Self {
        Self {
            threshold: crate::config::DEFAULT_THRESHOLD,
            history: SnapshotHistory::new(DEFAULT_HISTORY_CAPACITY),
            latest: SharedLatest::default(),
            stats: create_shared_stats(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch(samples: &[(NodeId, i32)], ts: i64) -> ReadingBatch {
        ReadingBatch::from_readings(
            samples
                .iter()
                .map(|&(id, sample)| (id, SampleReport::new(sample, ts))),
        )
    }

    fn grid_batch(active: &[NodeId], ts: i64) -> ReadingBatch {
        let samples: Vec<(NodeId, i32)> = (1..=9)
            .map(|id| (id, if active.contains(&id) { 80 } else { 0 }))
            .collect();
        batch(&samples, ts)
    }

    #[test]
    fn test_invalid_threshold_rejected() {
        assert!(TrackingEngine::new(0, 10).is_err());
        let mut engine = TrackingEngine::new(50, 10).unwrap();
        assert!(engine.set_threshold(2000).is_err());
        assert_eq!(engine.threshold(), 50);
    }

    #[test]
    fn test_zero_history_capacity_rejected() {
        assert!(matches!(
            TrackingEngine::new(50, 0),
            Err(TrackingError::InvalidConfiguration {
                field: "history_capacity",
                ..
            })
        ));
        assert!(TrackingEngine::new(50, 1).is_ok());
    }

    #[test]
    fn test_first_tick_has_no_event() {
        let mut engine = TrackingEngine::new(50, 10).unwrap();
        assert_eq!(engine.tick(&grid_batch(&[], 0)), None);
        assert_eq!(engine.history().len(), 1);
    }

    #[test]
    fn test_unchanged_tick_returns_none() {
        let mut engine = TrackingEngine::new(50, 10).unwrap();
        engine.tick(&grid_batch(&[1], 0));
        assert_eq!(engine.tick(&grid_batch(&[1], 1000)), None);
        assert_eq!(engine.history().len(), 1);
        assert_eq!(engine.stats().stats().snapshots_replaced, 1);
    }

    #[test]
    fn test_publishes_latest() {
        let mut engine = TrackingEngine::new(50, 10).unwrap();
        let handle = engine.latest_handle();
        assert!(handle.get().is_none());
        engine.tick(&grid_batch(&[], 0));
        engine.tick(&grid_batch(&[5], 10));
        let latest = handle.get().unwrap();
        assert_eq!(latest.blob_count(), 1);
        assert!(latest.event().is_some_and(|e| e.formed));
    }

    #[test]
    fn test_unregistered_reading_dropped() {
        let mut engine = TrackingEngine::new(50, 10).unwrap();
        let mut b = grid_batch(&[], 0);
        b.readings.insert(42, SampleReport::new(900, 0));
        engine.tick(&b);
        let latest = engine.latest().unwrap();
        assert_eq!(latest.size(), 9);
        assert!(latest.node(42).is_none());
        assert_eq!(engine.stats().stats().readings_dropped, 1);
    }

    #[test]
    fn test_missing_timestamp_keeps_previous_value() {
        let mut engine = TrackingEngine::new(50, 10).unwrap();
        engine.tick(&grid_batch(&[3], 0));

        let mut b = grid_batch(&[], 100);
        b.readings.insert(
            3,
            SampleReport {
                sample: 0,
                timestamp_ms: None,
            },
        );
        // Node 3 keeps its previous active reading, so nothing changed.
        assert_eq!(engine.tick(&b), None);
        let latest = engine.latest().unwrap();
        assert!(latest.is_active(3));
        assert_eq!(latest.node(3).map(|n| n.sample_timestamp), Some(0));
    }

    #[test]
    fn test_new_threshold_applies_next_tick() {
        let mut engine = TrackingEngine::new(50, 10).unwrap();
        engine.tick(&grid_batch(&[1], 0));
        engine.set_threshold(100).unwrap();
        let event = engine.tick(&grid_batch(&[1], 1)).unwrap();
        assert!(event.vanished);
        assert_eq!(engine.latest().map(|s| s.threshold()), Some(100));
    }
}
