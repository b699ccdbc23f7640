//! Latest reading per registered node.

use crate::collector::types::ReadingMessage;
use crate::core::grid::MAX_NODES;
use crate::core::{NodeId, ReadingBatch, SampleReport};
use crate::error::{Result, TrackingError};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct StoredReading {
    report: SampleReport,
    count: u32,
}

/// Keeps the newest sample each node has reported.
///
/// Nodes register themselves by sending their first message. The tick loop
/// takes a [`ReadingBatch`] from here once per period.
#[derive(Debug, Default)]
pub struct ReadingStore {
    registered: BTreeSet<NodeId>,
    latest: BTreeMap<NodeId, StoredReading>,
}

impl ReadingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a node without a reading. Returns `true` if it was new.
    pub fn register(&mut self, id: NodeId) -> Result<bool> {
        if id == 0 {
            return Err(TrackingError::MalformedInput {
                node: id,
                reason: "node ids start at 1".to_string(),
            });
        }
        if self.registered.contains(&id) {
            return Ok(false);
        }
        if self.registered.len() >= MAX_NODES {
            return Err(TrackingError::GridFull {
                node: id,
                max: MAX_NODES,
            });
        }
        self.registered.insert(id);
        tracing::info!(node = id, total = self.registered.len(), "node registered");
        Ok(true)
    }

    /// Store the newest sample from a message.
    ///
    /// Returns `true` when the message registered a new node. A message older
    /// than the last one seen from the same node is ignored.
    pub fn ingest(&mut self, msg: &ReadingMessage) -> Result<bool> {
        let Some((timestamp_ms, sample)) = msg.timed_samples().last() else {
            return Err(TrackingError::MalformedInput {
                node: msg.id,
                reason: "message carries no readings".to_string(),
            });
        };

        let is_new = self.register(msg.id)?;

        if let Some(stored) = self.latest.get(&msg.id) {
            if msg.count < stored.count {
                tracing::debug!(node = msg.id, count = msg.count, "ignoring stale message");
                return Ok(is_new);
            }
        }

        self.latest.insert(
            msg.id,
            StoredReading {
                report: SampleReport::new(sample as i32, timestamp_ms),
                count: msg.count,
            },
        );
        Ok(is_new)
    }

    pub fn registered(&self) -> &BTreeSet<NodeId> {
        &self.registered
    }

    pub fn latest(&self, id: NodeId) -> Option<SampleReport> {
        self.latest.get(&id).map(|stored| stored.report)
    }

    /// Input for the next tick.
    pub fn batch(&self) -> ReadingBatch {
        ReadingBatch {
            registered: self.registered.clone(),
            readings: self
                .latest
                .iter()
                .map(|(&id, stored)| (id, stored.report))
                .collect(),
        }
    }

    pub fn clear(&mut self) {
        self.registered.clear();
        self.latest.clear();
    }
}
