//! Reading collection for the contour tracker.
//!
//! Node packets arrive on a channel, the [`ReadingStore`] keeps the newest
//! sample per node, and [`SamplingControl`] negotiates the sampling period and
//! threshold with the nodes.

pub mod control;
pub mod simulated;
pub mod store;
pub mod types;

// Re-export commonly used types
pub use control::{PeriodUpdate, SamplingControl};
pub use simulated::{CollectorConfig, CollectorError, SimulatedCollector};
pub use store::ReadingStore;
pub use types::{Beacon, ReadingMessage, NREADINGS};

/// Collector type used by the binary.
pub type Collector = SimulatedCollector;
