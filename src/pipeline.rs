//! Pipeline orchestration
//!
//! Ties the gate and the drift tracker together: every decoded sample goes
//! through classification, accepted samples with an RR-interval advance the
//! tracker, and exactly one validated record comes out per sample. Samples
//! must be processed one at a time, in arrival order: the tracker state is
//! order-dependent.

use crate::config::PipelineConfig;
use crate::decoder;
use crate::drift::DriftTracker;
use crate::error::PulseError;
use crate::gate::{PlausibilityGate, Verdict, REJECTED_HR, REJECTED_RRI};
use crate::types::{DecodedSample, ValidatedRecord};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Running totals over one session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCounters {
    pub accepted: u64,
    pub rejected: u64,
    /// Staleness resets the tracker performed
    pub resets: u64,
}

/// Stateful sample processor for one session.
///
/// Owns the session's gate and drift tracker; the tracker state lives and
/// dies with the processor, so a new session always starts from a clean
/// timeline.
pub struct PulseProcessor {
    gate: PlausibilityGate,
    tracker: DriftTracker,
    counters: SessionCounters,
    instance_id: String,
}

impl Default for PulseProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl PulseProcessor {
    /// Create a processor with default bounds and correction factors
    pub fn new() -> Self {
        Self::with_config(PipelineConfig::default())
    }

    pub fn with_config(config: PipelineConfig) -> Self {
        Self {
            tracker: DriftTracker::new(&config),
            gate: PlausibilityGate::new(config),
            counters: SessionCounters::default(),
            instance_id: Uuid::new_v4().to_string(),
        }
    }

    /// Run one decoded sample through the gate and, when it qualifies, the
    /// drift tracker. Always returns a record; a rejected sample comes back
    /// with the fixed replacement values instead of its real ones.
    pub fn process_sample(&mut self, sample: &DecodedSample) -> ValidatedRecord {
        match self.gate.classify(sample) {
            Verdict::Accepted => {
                let drift = sample
                    .rr_interval
                    .map(|rri| self.tracker.update(sample.captured_at, rri));
                if drift.is_some_and(|update| update.reset) {
                    self.counters.resets += 1;
                }
                self.counters.accepted += 1;

                ValidatedRecord {
                    timestamp: sample.captured_at,
                    heart_rate: sample.heart_rate,
                    rr_interval: sample.rr_interval,
                    accepted: true,
                    drift_error: drift.map(|update| update.error),
                }
            }
            Verdict::Rejected(reason) => {
                // the real values still reach the diagnostic log before the
                // marker replaces them in the record
                log::debug!(
                    "[{}] rejected sample hr={} rr={:?}: {:?}",
                    self.instance_id,
                    sample.heart_rate,
                    sample.rr_interval,
                    reason
                );
                self.counters.rejected += 1;

                ValidatedRecord {
                    timestamp: sample.captured_at,
                    heart_rate: REJECTED_HR,
                    rr_interval: Some(REJECTED_RRI),
                    accepted: false,
                    drift_error: None,
                }
            }
        }
    }

    /// Decode one notification buffer and process every sample it yields,
    /// in transmission order.
    pub fn process_buffer(
        &mut self,
        buf: &[u8],
        captured_at: i64,
    ) -> Result<Vec<ValidatedRecord>, PulseError> {
        let samples = decoder::decode(buf, captured_at)?;
        Ok(samples
            .iter()
            .map(|sample| self.process_sample(sample))
            .collect())
    }

    pub fn counters(&self) -> SessionCounters {
        self.counters
    }

    pub fn tracker(&self) -> &DriftTracker {
        &self.tracker
    }

    /// Unique id of this processor instance, for correlating diagnostics
    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }
}
