//! Contour Tracking - blob tracking for small sensor-node grids.
//!
//! Nodes on a 3x3 or 4x4 grid periodically report a sample. Once per tick the
//! tracker marks every node whose sample reaches the threshold as active,
//! groups 8-connected active nodes into blobs, and classifies how the blobs
//! changed since the previous snapshot (formed, vanished, merged, split,
//! expanded, shrunk, moved).
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Contour Tracking                        │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐   ┌─────────────┐   ┌─────────────┐       │
//! │  │  Collector  │──▶│   Reading   │──▶│  Tracking   │       │
//! │  │  (packets)  │   │    Store    │   │   Engine    │       │
//! │  └─────────────┘   └─────────────┘   └─────────────┘       │
//! │                                             │               │
//! │                    ┌────────────────────────┼───────┐       │
//! │                    ▼                        ▼       ▼       │
//! │             ┌─────────────┐   ┌─────────────┐ ┌─────────┐  │
//! │             │  Snapshot   │   │  Recording  │ │  Stats  │  │
//! │             │   History   │   │   (JSONL)   │ │         │  │
//! │             └─────────────┘   └─────────────┘ └─────────┘  │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use contour_tracking::core::{ReadingBatch, SampleReport, TrackingEngine};
//!
//! let mut engine = TrackingEngine::new(50, 10).unwrap();
//! let quiet = ReadingBatch::from_readings((1..=9).map(|id| (id, SampleReport::new(0, 0))));
//! assert!(engine.tick(&quiet).is_none());
//!
//! let warm = ReadingBatch::from_readings(
//!     (1..=9).map(|id| (id, SampleReport::new(if id == 5 { 80 } else { 0 }, 100))),
//! );
//! let event = engine.tick(&warm).unwrap();
//! assert!(event.formed);
//! ```

pub mod collector;
pub mod config;
pub mod core;
pub mod error;
pub mod recording;
pub mod stats;

// Re-export key types at crate root for convenience
pub use collector::{Collector, CollectorConfig, CollectorError, ReadingMessage, ReadingStore};
pub use config::{Config, ConfigError};
pub use core::{Blob, Direction, Event, Snapshot, SnapshotHistory, TrackingEngine};
pub use error::{Result, TrackingError};
pub use recording::{read_recording, Player, Recording, RecordingWriter};
pub use stats::{SharedTrackingStats, StatsSnapshot, TrackingStats};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
