//! Pipeline tuning
//!
//! The physiological bounds and timeline-correction factors are explicit
//! configuration rather than hard-wired literals, so a session can be run
//! with different acceptance windows (e.g. sleep vs. exercise recordings).

use serde::{Deserialize, Serialize};

/// Default heart-rate acceptance floor (bpm)
pub const DEFAULT_HR_MIN: u16 = 40;
/// Default heart-rate acceptance ceiling (bpm)
pub const DEFAULT_HR_MAX: u16 = 100;
/// Default timeline disagreement that marks a discontinuity (seconds)
pub const DEFAULT_STALENESS_THRESHOLD: f64 = 20.0;
/// Default fraction of the drift error folded back into the timeline per sample
pub const DEFAULT_CATCHUP_FACTOR: f64 = 0.1;
/// Default replay speed divisor (1.0 = real time)
pub const DEFAULT_TIMESCALE: f64 = 1.0;

/// Tunables for the gate and the drift tracker
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub hr_min: u16,
    pub hr_max: u16,
    /// Seconds of disagreement between the reconstructed beat timeline and the
    /// wall clock beyond which accumulated state is discarded
    pub staleness_threshold: f64,
    pub catchup_factor: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            hr_min: DEFAULT_HR_MIN,
            hr_max: DEFAULT_HR_MAX,
            staleness_threshold: DEFAULT_STALENESS_THRESHOLD,
            catchup_factor: DEFAULT_CATCHUP_FACTOR,
        }
    }
}

impl PipelineConfig {
    /// Shortest plausible RR-interval, derived from the heart-rate ceiling
    pub fn rri_min(&self) -> f64 {
        60.0 / f64::from(self.hr_max)
    }

    /// Longest plausible RR-interval, derived from the heart-rate floor
    pub fn rri_max(&self) -> f64 {
        60.0 / f64::from(self.hr_min)
    }
}

/// Tunables for the replay driver
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayConfig {
    /// Speed divisor applied to recorded inter-row gaps: 1.0 replays in real
    /// time, 1000.0 compresses each recorded second to a millisecond
    pub timescale: f64,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            timescale: DEFAULT_TIMESCALE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rr_bounds_derive_from_heart_rate_bounds() {
        let config = PipelineConfig::default();

        assert!((config.rri_min() - 0.6).abs() < 1e-12);
        assert!((config.rri_max() - 1.5).abs() < 1e-12);
    }

    #[test]
    fn test_custom_bounds() {
        let config = PipelineConfig {
            hr_min: 30,
            hr_max: 120,
            ..Default::default()
        };

        assert!((config.rri_min() - 0.5).abs() < 1e-12);
        assert!((config.rri_max() - 2.0).abs() < 1e-12);
    }
}
