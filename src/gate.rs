//! Physiological plausibility gating
//!
//! Classifies decoded samples against fixed heart-rate and RR-interval bounds.
//! Rejected samples are not dropped: the pipeline emits them with fixed
//! replacement values so the validated log carries an explicit flatline
//! marker where implausible data arrived.

use crate::config::PipelineConfig;
use crate::types::DecodedSample;
use serde::{Deserialize, Serialize};

/// Heart rate written in place of a rejected sample (bpm)
pub const REJECTED_HR: u16 = 120;
/// RR-interval written in place of a rejected sample (seconds)
pub const REJECTED_RRI: f64 = 0.5;

/// Which bound a rejected sample violated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    HeartRateOutOfRange,
    RrIntervalOutOfRange,
}

/// Gate classification result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Accepted,
    Rejected(RejectReason),
}

impl Verdict {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Verdict::Accepted)
    }
}

/// Fixed-bounds acceptance check for decoded samples.
///
/// A sample without an RR-interval is judged on heart rate alone: it can be
/// accepted for recording, but it cannot feed the drift tracker.
#[derive(Debug, Clone)]
pub struct PlausibilityGate {
    config: PipelineConfig,
}

impl PlausibilityGate {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn classify(&self, sample: &DecodedSample) -> Verdict {
        if sample.heart_rate < self.config.hr_min || sample.heart_rate > self.config.hr_max {
            return Verdict::Rejected(RejectReason::HeartRateOutOfRange);
        }

        if let Some(rri) = sample.rr_interval {
            if rri < self.config.rri_min() || rri > self.config.rri_max() {
                return Verdict::Rejected(RejectReason::RrIntervalOutOfRange);
            }
        }

        Verdict::Accepted
    }
}
