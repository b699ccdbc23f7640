//! Core tracking logic.
//!
//! This module contains:
//! - Grid topology for 3x3 and 4x4 node layouts
//! - Snapshot capture and blob clustering
//! - Event classification between consecutive snapshots
//! - Bounded snapshot history and the tick-driven engine

pub mod blob;
pub mod engine;
pub mod event;
pub mod grid;
pub mod history;
pub mod shading;
pub mod snapshot;

/// Identifier of a sensor node.
pub type NodeId = u16;

// Re-export commonly used types
pub use blob::{Blob, Point};
pub use engine::{ReadingBatch, SampleReport, SharedLatest, TrackingEngine};
pub use event::{classify, Direction, Event, Facet};
pub use grid::{dimension, GridTopology, Position, MAX_NODES};
pub use history::{HistoryUpdate, SnapshotHistory, DEFAULT_HISTORY_CAPACITY};
pub use shading::{contour, render_grid, shade, NodeShade};
pub use snapshot::{Node, Reading, Snapshot};
