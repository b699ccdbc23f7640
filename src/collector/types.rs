//! Messages exchanged with the sensor nodes.

use crate::core::NodeId;
use serde::{Deserialize, Serialize};

/// Number of samples a node packs into one message.
pub const NREADINGS: usize = 10;

/// One packet of consecutive samples from a node.
///
/// `clock_ms` is the time of the last sample; earlier samples are spaced one
/// `interval` apart. `count` is the packet sequence number, so the first
/// sample in `readings` is sample number `count * NREADINGS`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadingMessage {
    pub id: NodeId,
    pub version: i32,
    pub interval: u32,
    pub threshold: i32,
    pub clock_ms: i64,
    pub count: u32,
    pub readings: Vec<u16>,
}

impl ReadingMessage {
    /// Samples paired with their reconstructed timestamps, oldest first.
    pub fn timed_samples(&self) -> impl Iterator<Item = (i64, u16)> + '_ {
        let n = self.readings.len() as i64;
        let step = self.interval as i64;
        self.readings
            .iter()
            .enumerate()
            .map(move |(i, &sample)| (self.clock_ms - (n - 1 - i as i64) * step, sample))
    }
}

/// Control message broadcast to every node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Beacon {
    pub version: i32,
    pub interval: u32,
    pub threshold: i32,
    pub clock_ms: i64,
}
