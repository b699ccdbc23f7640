//! Tracking statistics.
//!
//! Counters are atomics so the tick loop can update them while a status
//! reader holds the same `Arc`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Running counters for one tracking session.
#[derive(Debug)]
pub struct TrackingStats {
    /// Ticks processed
    ticks: AtomicU64,
    /// Snapshots appended to the history
    snapshots_appended: AtomicU64,
    /// Snapshots that replaced an unchanged predecessor
    snapshots_replaced: AtomicU64,
    /// Non-empty events produced
    events_emitted: AtomicU64,
    /// Readings dropped as malformed
    readings_dropped: AtomicU64,
    /// Session start time
    session_start: DateTime<Utc>,
    /// Path for persisting stats
    persist_path: Option<PathBuf>,
}

impl TrackingStats {
    pub fn new() -> Self {
        Self {
            ticks: AtomicU64::new(0),
            snapshots_appended: AtomicU64::new(0),
            snapshots_replaced: AtomicU64::new(0),
            events_emitted: AtomicU64::new(0),
            readings_dropped: AtomicU64::new(0),
            session_start: Utc::now(),
            persist_path: None,
        }
    }

    /// Create stats that continue from, and save back to, a JSON file.
    pub fn with_persistence(path: PathBuf) -> Self {
        let mut stats = Self::new();
        stats.persist_path = Some(path);

        if let Err(e) = stats.load() {
            tracing::warn!("could not load previous tracking stats: {e}");
        }

        stats
    }

    pub fn record_tick(&self) {
        self.ticks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_appended(&self) {
        self.snapshots_appended.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_replaced(&self) {
        self.snapshots_replaced.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_event(&self) {
        self.events_emitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dropped(&self, count: u64) {
        self.readings_dropped.fetch_add(count, Ordering::Relaxed);
    }

    /// Current counter values.
    pub fn stats(&self) -> StatsSnapshot {
        StatsSnapshot {
            ticks: self.ticks.load(Ordering::Relaxed),
            snapshots_appended: self.snapshots_appended.load(Ordering::Relaxed),
            snapshots_replaced: self.snapshots_replaced.load(Ordering::Relaxed),
            events_emitted: self.events_emitted.load(Ordering::Relaxed),
            readings_dropped: self.readings_dropped.load(Ordering::Relaxed),
            session_start: self.session_start,
            session_duration_secs: (Utc::now() - self.session_start).num_seconds().max(0) as u64,
        }
    }

    /// Summary for display at the end of a run.
    pub fn summary(&self) -> String {
        let stats = self.stats();
        format!(
            "Tracking Statistics:\n\
             - Ticks processed: {}\n\
             - Snapshots appended: {}\n\
             - Snapshots replaced: {}\n\
             - Events emitted: {}\n\
             - Readings dropped: {}\n\
             - Session duration: {} seconds",
            stats.ticks,
            stats.snapshots_appended,
            stats.snapshots_replaced,
            stats.events_emitted,
            stats.readings_dropped,
            stats.session_duration_secs
        )
    }

    /// Save counters to disk, if persistence is configured.
    pub fn save(&self) -> Result<(), std::io::Error> {
        if let Some(ref path) = self.persist_path {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            let stats = self.stats();
            let persisted = PersistedStats {
                ticks: stats.ticks,
                snapshots_appended: stats.snapshots_appended,
                snapshots_replaced: stats.snapshots_replaced,
                events_emitted: stats.events_emitted,
                readings_dropped: stats.readings_dropped,
                last_updated: Utc::now(),
            };

            let json = serde_json::to_string_pretty(&persisted).map_err(std::io::Error::other)?;
            std::fs::write(path, json)?;
        }
        Ok(())
    }

    fn load(&mut self) -> Result<(), std::io::Error> {
        if let Some(ref path) = self.persist_path {
            if path.exists() {
                let content = std::fs::read_to_string(path)?;
                let persisted: PersistedStats =
                    serde_json::from_str(&content).map_err(std::io::Error::other)?;

                self.ticks.store(persisted.ticks, Ordering::Relaxed);
                self.snapshots_appended
                    .store(persisted.snapshots_appended, Ordering::Relaxed);
                self.snapshots_replaced
                    .store(persisted.snapshots_replaced, Ordering::Relaxed);
                self.events_emitted
                    .store(persisted.events_emitted, Ordering::Relaxed);
                self.readings_dropped
                    .store(persisted.readings_dropped, Ordering::Relaxed);
            }
        }
        Ok(())
    }

    pub fn reset(&self) {
        self.ticks.store(0, Ordering::Relaxed);
        self.snapshots_appended.store(0, Ordering::Relaxed);
        self.snapshots_replaced.store(0, Ordering::Relaxed);
        self.events_emitted.store(0, Ordering::Relaxed);
        self.readings_dropped.store(0, Ordering::Relaxed);
    }
}

impl Default for TrackingStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub ticks: u64,
    pub snapshots_appended: u64,
    pub snapshots_replaced: u64,
    pub events_emitted: u64,
    pub readings_dropped: u64,
    pub session_start: DateTime<Utc>,
    pub session_duration_secs: u64,
}

#[derive(Debug, Serialize, Deserialize)]
struct PersistedStats {
    ticks: u64,
    snapshots_appended: u64,
    snapshots_replaced: u64,
    events_emitted: u64,
    readings_dropped: u64,
    last_updated: DateTime<Utc>,
}

/// Thread-safe shared stats.
pub type SharedTrackingStats = Arc<TrackingStats>;

pub fn create_shared_stats() -> SharedTrackingStats {
    Arc::new(TrackingStats::new())
}

pub fn create_shared_stats_with_persistence(path: PathBuf) -> SharedTrackingStats {
    Arc::new(TrackingStats::with_persistence(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counting() {
        let stats = TrackingStats::new();
        stats.record_tick();
        stats.record_tick();
        stats.record_appended();
        stats.record_dropped(3);

        let s = stats.stats();
        assert_eq!(s.ticks, 2);
        assert_eq!(s.snapshots_appended, 1);
        assert_eq!(s.readings_dropped, 3);
    }

    #[test]
    fn test_reset() {
        let stats = TrackingStats::new();
        stats.record_event();
        stats.record_replaced();
        stats.reset();

        let s = stats.stats();
        assert_eq!(s.events_emitted, 0);
        assert_eq!(s.snapshots_replaced, 0);
    }

    #[test]
    fn test_persistence_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stats.json");

        let stats = TrackingStats::with_persistence(path.clone());
        stats.record_tick();
        stats.record_event();
        stats.save().unwrap();

        let reloaded = TrackingStats::with_persistence(path);
        assert_eq!(reloaded.stats().ticks, 1);
        assert_eq!(reloaded.stats().events_emitted, 1);
    }

    #[test]
    fn test_summary_format() {
        let summary = TrackingStats::new().summary();
        assert!(summary.contains("Ticks processed"));
        assert!(summary.contains("Events emitted"));
    }
}
