//! Error types for the contour tracking crate.

use crate::core::NodeId;

/// Errors raised by configuration, ingestion, and recording.
///
/// The classifier itself never fails; an empty history is answered with
/// "no event" rather than an error.
#[derive(Debug, thiserror::Error)]
pub enum TrackingError {
    /// A configuration value is outside its supported range. The previous
    /// value stays in effect.
    #[error("invalid configuration: {field} = {value} (expected {expected})")]
    InvalidConfiguration {
        field: &'static str,
        value: i64,
        expected: &'static str,
    },

    /// A reading could not be used for the current tick.
    #[error("malformed input from node {node}: {reason}")]
    MalformedInput { node: NodeId, reason: String },

    /// The grid already holds the maximum number of nodes.
    #[error("grid is full ({max} nodes), cannot register node {node}")]
    GridFull { node: NodeId, max: usize },

    /// Reading or writing a recording failed.
    #[error("recording I/O error: {0}")]
    Recording(#[from] std::io::Error),

    /// A recording line could not be decoded.
    #[error("recording decode error at line {line}: {message}")]
    Decode { line: usize, message: String },
}

/// Convenience result alias.
pub type Result<T> = std::result::Result<T, TrackingError>;
