//! Simulated node grid.
//!
//! A background thread plays the part of the radio: every period each node
//! sends a packet of samples, and a warm region wanders across the grid so
//! that blobs form, move, split, and vanish. Beacons sent through
//! [`SimulatedCollector::broadcast`] are adopted by every node, the same way
//! motes pick up a newer sampling version.

use crate::collector::types::{Beacon, ReadingMessage, NREADINGS};
use crate::config::{DEFAULT_INTERVAL, DEFAULT_THRESHOLD};
use crate::core::grid::{dimension, MAX_NODES};
use crate::core::NodeId;
use crossbeam_channel::{bounded, Receiver, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Settings for the simulated grid.
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// Number of nodes, 9 or 16
    pub nodes: usize,
    /// Time between packets from each node
    pub period: Duration,
    pub interval: u32,
    pub threshold: i32,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            nodes: 9,
            period: Duration::from_millis(500),
            interval: DEFAULT_INTERVAL,
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

/// Errors that can occur during collection.
#[derive(Debug, thiserror::Error)]
pub enum CollectorError {
    #[error("Collector is already running")]
    AlreadyRunning,
    #[error("Unsupported grid size: {0} nodes")]
    UnsupportedGrid(usize),
}

pub struct SimulatedCollector {
    config: CollectorConfig,
    sender: Sender<ReadingMessage>,
    receiver: Receiver<ReadingMessage>,
    beacon_tx: Sender<Beacon>,
    beacon_rx: Receiver<Beacon>,
    running: Arc<AtomicBool>,
    thread_handle: Option<JoinHandle<()>>,
}

impl SimulatedCollector {
    pub fn new(config: CollectorConfig) -> Self {
        // Bounded so a stalled consumer cannot grow memory without limit
        let (sender, receiver) = bounded(1_024);
        let (beacon_tx, beacon_rx) = bounded(64);
        Self {
            config,
            sender,
            receiver,
            beacon_tx,
            beacon_rx,
            running: Arc::new(AtomicBool::new(false)),
            thread_handle: None,
        }
    }

    /// Start emitting packets in a background thread.
    pub fn start(&mut self) -> Result<(), CollectorError> {
        if self.running.load(Ordering::SeqCst) {
            return Err(CollectorError::AlreadyRunning);
        }
        if self.config.nodes == 0 || self.config.nodes > MAX_NODES {
            return Err(CollectorError::UnsupportedGrid(self.config.nodes));
        }

        self.running.store(true, Ordering::SeqCst);

        let sender = self.sender.clone();
        let beacons = self.beacon_rx.clone();
        let running = self.running.clone();
        let mut config = self.config.clone();

        let handle = thread::spawn(move || {
            tracing::info!(nodes = config.nodes, "simulated collector started");
            let mut field = HotSpot::new(dimension(config.nodes), config.threshold);
            let mut version = 0;
            let mut count = 0u32;
            let started = std::time::Instant::now();

            while running.load(Ordering::SeqCst) {
                for beacon in beacons.try_iter() {
                    if beacon.version > version {
                        version = beacon.version;
                        config.interval = beacon.interval;
                        config.threshold = beacon.threshold;
                        // A packet holds NREADINGS samples taken one interval apart
                        config.period =
                            Duration::from_millis(u64::from(beacon.interval) * NREADINGS as u64);
                        tracing::debug!(version, "nodes adopted beacon");
                    }
                }

                let clock_ms = started.elapsed().as_millis() as i64;
                for message in field.packets(&config, version, count, clock_ms) {
                    // Drop rather than block when the consumer falls behind
                    if sender.try_send(message).is_err() {
                        tracing::warn!("collector channel full, dropping packet");
                    }
                }
                field.step();
                count = count.wrapping_add(1);
                thread::sleep(config.period);
            }
            tracing::info!("simulated collector stopped");
        });

        self.thread_handle = Some(handle);
        Ok(())
    }

    /// Stop emitting packets.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Deliver a beacon to every node. Nodes ignore beacons that are not
    /// newer than the version they already run.
    pub fn broadcast(&self, beacon: Beacon) {
        if self.beacon_tx.try_send(beacon).is_err() {
            tracing::warn!(version = beacon.version, "beacon queue full, dropping beacon");
        }
    }

    pub fn receiver(&self) -> &Receiver<ReadingMessage> {
        &self.receiver
    }

    /// Try to receive a packet without blocking.
    pub fn try_recv(&self) -> Option<ReadingMessage> {
        self.receiver.try_recv().ok()
    }
}

impl Drop for SimulatedCollector {
    fn drop(&mut self) {
        self.stop();
    }
}

/// A warm region moving along a closed path over the grid.
#[derive(Debug, Clone)]
pub(crate) struct HotSpot {
    dim: usize,
    /// Sample level of the warm region's edge.
    scale: i32,
    phase: f64,
}

impl HotSpot {
    const STEP: f64 = 0.35;
    const RADIUS: f64 = 0.9;

    pub(crate) fn new(dim: usize, scale: i32) -> Self {
        Self {
            dim,
            scale,
            phase: 0.0,
        }
    }

    pub(crate) fn step(&mut self) {
        self.phase += Self::STEP;
    }

    /// Center of the region in grid coordinates.
    fn center(&self) -> (f64, f64) {
        let mid = (self.dim as f64 - 1.0) / 2.0;
        (
            mid + mid * self.phase.cos(),
            mid + mid * (2.0 * self.phase).sin(),
        )
    }

    /// Sample for the node at `(col, row)`; hot inside the region.
    pub(crate) fn sample(&self, col: usize, row: usize) -> u16 {
        let (cx, cy) = self.center();
        let distance = ((col as f64 - cx).powi(2) + (row as f64 - cy).powi(2)).sqrt();
        let base = self.scale.max(1) as f64;
        let value = if distance <= Self::RADIUS {
            base * (1.6 - 0.4 * distance / Self::RADIUS)
        } else {
            base * 0.3 / distance
        };
        value.clamp(0.0, u16::MAX as f64) as u16
    }

    fn packets(
        &self,
        config: &CollectorConfig,
        version: i32,
        count: u32,
        clock_ms: i64,
    ) -> Vec<ReadingMessage> {
        (0..config.nodes)
            .map(|index| {
                let sample = self.sample(index % self.dim, index / self.dim);
                ReadingMessage {
                    id: (index + 1) as NodeId,
                    version,
                    interval: config.interval,
                    threshold: config.threshold,
                    clock_ms,
                    count,
                    readings: vec![sample; NREADINGS],
                }
            })
            .collect()
    }
}
