//! RR-interval timeline reconciliation
//!
//! RR-intervals measure inter-beat time with high precision but accumulate
//! error against wall-clock timestamps as packets are missed or sensor clocks
//! skew. The tracker keeps a reconstructed beat timeline anchored to real
//! time: small disagreement is folded back gradually so inter-beat precision
//! survives expected jitter, while a large disagreement means the accumulated
//! state no longer describes the same stretch of time and is discarded.

use crate::config::PipelineConfig;
use serde::{Deserialize, Serialize};

/// Outcome of feeding one accepted sample to the tracker
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DriftUpdate {
    /// Seconds the wall clock is ahead (+) or behind (-) the reconstructed
    /// beat timeline, measured before any correction was applied
    pub error: f64,
    /// True when the error crossed the staleness threshold and the tracker
    /// re-anchored at the current sample
    pub reset: bool,
}

/// Running reconciliation between summed RR-intervals and wall-clock time.
///
/// One tracker instance belongs to one session. Only accepted samples that
/// carry an RR-interval reach [`DriftTracker::update`]; rejected samples and
/// RR-less samples must not touch the state, which is strictly order-dependent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriftTracker {
    reference_timestamp: i64,
    accumulated_rri: f64,
    tracking: bool,
    staleness_threshold: f64,
    catchup_factor: f64,
}

impl DriftTracker {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            reference_timestamp: 0,
            accumulated_rri: 0.0,
            tracking: false,
            staleness_threshold: config.staleness_threshold,
            catchup_factor: config.catchup_factor,
        }
    }

    /// Fold one accepted sample into the reconstructed timeline.
    ///
    /// The first sample anchors the timeline at its own timestamp; no error
    /// check applies to that transition. Every later sample extends the
    /// accumulator by its RR-interval and then either re-anchors (stale) or
    /// nudges the accumulator toward the wall clock by `catchup_factor` of
    /// the measured error.
    pub fn update(&mut self, timestamp: i64, rr_interval: f64) -> DriftUpdate {
        if !self.tracking {
            self.reference_timestamp = timestamp;
            self.accumulated_rri = 0.0;
            self.tracking = true;
            return DriftUpdate {
                error: 0.0,
                reset: false,
            };
        }

        self.accumulated_rri += rr_interval;
        let elapsed = (timestamp - self.reference_timestamp) as f64;
        let error = elapsed - self.accumulated_rri;

        if error.abs() > self.staleness_threshold {
            // Missed packets, a sensor restart, or a long silence: the
            // accumulated timeline no longer covers the same stretch of time.
            log::warn!("stale data detected at {timestamp}");
            self.accumulated_rri = 0.0;
            self.reference_timestamp = timestamp;
            DriftUpdate { error, reset: true }
        } else {
            self.accumulated_rri += error * self.catchup_factor;
            DriftUpdate {
                error,
                reset: false,
            }
        }
    }

    pub fn reference_timestamp(&self) -> i64 {
        self.reference_timestamp
    }

    pub fn accumulated_rri(&self) -> f64 {
        self.accumulated_rri
    }

    /// False until the first accepted sample with an RR-interval arrives
    pub fn is_tracking(&self) -> bool {
        self.tracking
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn tracker() -> DriftTracker {
        DriftTracker::new(&PipelineConfig::default())
    }

    #[test]
    fn test_first_sample_anchors_timeline() {
        let mut tracker = tracker();

        let update = tracker.update(1000, 0.9);

        assert!(!update.reset);
        assert_eq!(update.error, 0.0);
        assert!(tracker.is_tracking());
        assert_eq!(tracker.reference_timestamp(), 1000);
        assert_eq!(tracker.accumulated_rri(), 0.0);
    }

    #[test]
    fn test_accumulator_extends_before_the_branch() {
        let mut tracker = tracker();
        tracker.update(1000, 1.0);

        // acc = 0 + 0.9, error = (1001 - 1000) - 0.9 = 0.1
        let update = tracker.update(1001, 0.9);

        assert!((update.error - 0.1).abs() < EPS);
        assert!(!update.reset);
    }

    #[test]
    fn test_small_error_applies_partial_correction() {
        let mut tracker = tracker();
        tracker.update(1000, 1.0);

        let update = tracker.update(1001, 0.9);

        // post: acc = 0.9 + 0.1 * 0.1
        assert!(!update.reset);
        assert!((tracker.accumulated_rri() - 0.91).abs() < EPS);
        assert_eq!(tracker.reference_timestamp(), 1000);
    }

    #[test]
    fn test_large_error_resets_state() {
        let mut tracker = tracker();
        tracker.update(1000, 1.0);

        // acc = 1.0, error = 30 - 1.0 = 29 > 20
        let update = tracker.update(1030, 1.0);

        assert!(update.reset);
        assert!((update.error - 29.0).abs() < EPS);
        assert_eq!(tracker.accumulated_rri(), 0.0);
        assert_eq!(tracker.reference_timestamp(), 1030);
    }

    #[test]
    fn test_negative_error_magnitude_also_resets() {
        let config = PipelineConfig {
            staleness_threshold: 2.0,
            ..Default::default()
        };
        let mut tracker = DriftTracker::new(&config);
        tracker.update(1000, 1.0);

        // four seconds of claimed beats against one wall-clock second:
        // error = 1 - 4 = -3.0, past the threshold in the negative direction
        let update = tracker.update(1001, 4.0);

        assert!((update.error + 3.0).abs() < EPS);
        assert!(update.reset);
        assert_eq!(tracker.accumulated_rri(), 0.0);
        assert_eq!(tracker.reference_timestamp(), 1001);
    }

    #[test]
    fn test_correction_tracks_wall_clock_over_time() {
        let mut tracker = tracker();
        tracker.update(1000, 1.0);

        // sensor claims 0.9 s beats while the wall clock advances 1 s per
        // sample; the accumulator should keep closing on elapsed time
        let mut last_error = f64::MAX;
        for i in 1..=10 {
            let update = tracker.update(1000 + i, 0.9);
            assert!(!update.reset);
            last_error = update.error;
        }

        assert!(last_error.abs() < 20.0);
        assert!(tracker.accumulated_rri() > 0.0);
    }

    #[test]
    fn test_reference_moves_only_on_reset() {
        let mut tracker = tracker();
        tracker.update(1000, 1.0);
        tracker.update(1001, 1.0);
        tracker.update(1002, 1.0);
        assert_eq!(tracker.reference_timestamp(), 1000);

        tracker.update(1100, 1.0);
        assert_eq!(tracker.reference_timestamp(), 1100);
    }
}
