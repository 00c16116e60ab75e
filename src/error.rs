//! Error types for Synheart Pulse

use thiserror::Error;

/// Errors that can occur while ingesting or replaying telemetry
#[derive(Debug, Error)]
pub enum PulseError {
    /// The notification buffer is shorter than the fixed-size fields its own
    /// flag byte declares. The buffer is dropped; the pipeline continues.
    #[error("measurement buffer truncated: flags declare {expected} bytes, got {actual}")]
    TruncatedBuffer { expected: usize, actual: usize },

    #[error("replay timescale must be positive, got {0}")]
    InvalidTimescale(f64),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}
