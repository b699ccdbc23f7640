//! Version-stamped sampling parameters shared with the nodes.
//!
//! Every change bumps the version. Nodes report the version they run with,
//! and whichever side is behind catches up: a newer node version is adopted,
//! an older one is answered with a fresh beacon.

use crate::collector::types::Beacon;
use crate::config::{validate_interval, validate_threshold, DEFAULT_INTERVAL, DEFAULT_THRESHOLD};
use crate::error::Result;

/// Outcome of comparing a node's version with ours.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeriodUpdate {
    /// The node was ahead; its interval is now ours.
    Adopted,
    /// The node was behind and should receive this beacon.
    Rebroadcast(Beacon),
    Unchanged,
}

#[derive(Debug, Clone)]
pub struct SamplingControl {
    version: i32,
    interval: u32,
    threshold: i32,
}

impl Default for SamplingControl {
    fn default() -> Self {
        Self {
            // Below any node version so the first report is adopted.
            version: -1,
            interval: DEFAULT_INTERVAL,
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

impl SamplingControl {
    pub fn new(interval: u32, threshold: i32) -> Self {
        Self {
            interval,
            threshold,
            ..Self::default()
        }
    }

    pub fn version(&self) -> i32 {
        self.version
    }

    pub fn interval(&self) -> u32 {
        self.interval
    }

    pub fn threshold(&self) -> i32 {
        self.threshold
    }

    /// Reconcile with the version and interval a node reported.
    pub fn period_update(&mut self, version: i32, interval: u32, clock_ms: i64) -> PeriodUpdate {
        if version > self.version {
            tracing::debug!(version, interval, "adopting node sampling period");
            self.version = version;
            self.interval = interval;
            PeriodUpdate::Adopted
        } else if version < self.version {
            PeriodUpdate::Rebroadcast(self.beacon(clock_ms))
        } else {
            PeriodUpdate::Unchanged
        }
    }

    /// Change the sampling interval. Returns the beacon announcing it.
    pub fn set_interval(&mut self, interval: i64, clock_ms: i64) -> Result<Beacon> {
        self.interval = validate_interval(interval)?;
        self.version += 1;
        tracing::info!(interval = self.interval, version = self.version, "sampling interval changed");
        Ok(self.beacon(clock_ms))
    }

    /// Change the activation threshold. Returns the beacon announcing it.
    pub fn set_threshold(&mut self, threshold: i64, clock_ms: i64) -> Result<Beacon> {
        self.threshold = validate_threshold(threshold)?;
        self.version += 1;
        tracing::info!(threshold = self.threshold, version = self.version, "threshold changed");
        Ok(self.beacon(clock_ms))
    }

    pub fn beacon(&self, clock_ms: i64) -> Beacon {
        Beacon {
            version: self.version,
            interval: self.interval,
            threshold: self.threshold,
            clock_ms,
        }
    }
}
