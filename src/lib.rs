//! Synheart Pulse - BLE heart-rate telemetry ingestion and validation
//!
//! Pulse turns raw Heart Rate Measurement notifications into a validated,
//! timeline-corrected stream of (heart-rate, RR-interval) records through a
//! deterministic pipeline: characteristic decoding → plausibility gating →
//! drift reconciliation → durable session logging.
//!
//! ## Modules
//!
//! - **Live ingestion**: decode characteristic buffers delivered by a BLE stack
//!   and log each session as it happens
//! - **Replay**: re-run recorded sessions through the same gate/tracker
//!   pipeline at a configurable pace, without a physical sensor

pub mod config;
pub mod decoder;
pub mod drift;
pub mod error;
pub mod gate;
pub mod pipeline;
pub mod replay;
pub mod session;
pub mod source;
pub mod types;

pub use config::{PipelineConfig, ReplayConfig};
pub use decoder::HrmMeasurement;
pub use drift::{DriftTracker, DriftUpdate};
pub use error::PulseError;
pub use gate::{PlausibilityGate, RejectReason, Verdict};
pub use pipeline::{PulseProcessor, SessionCounters};
pub use replay::{ReplayDriver, ReplaySummary};
pub use session::{RecordSink, SessionLogger};
pub use types::{DecodedSample, ReplayRow, ValidatedRecord};

/// Pulse version embedded in reports and diagnostics
pub const PULSE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for reports and diagnostics
pub const PRODUCER_NAME: &str = "synheart-pulse";
