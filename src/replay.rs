//! Recorded-session replay
//!
//! Feeds a previously recorded session through the gate/tracker pipeline at a
//! configurable pace: deterministic regression material for the validation
//! logic, including known stale-data and out-of-range stretches, without a
//! physical sensor on the desk.

use crate::config::ReplayConfig;
use crate::error::PulseError;
use crate::pipeline::PulseProcessor;
use crate::session::RecordSink;
use crate::types::ReplayRow;
use crossbeam_channel::{Receiver, RecvTimeoutError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::thread;
use std::time::Duration;

/// Totals reported after a replay run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplaySummary {
    pub rows_processed: u64,
    /// Lines that were not four-field session rows, or did not parse
    pub rows_skipped: u64,
    pub accepted: u64,
    pub rejected: u64,
    pub resets: u64,
    /// True when a cancellation arrived before the recording ran out
    pub cancelled: bool,
}

/// Paced replay of a recorded session file.
///
/// Rows are fed directly as decoded samples (the characteristic decoder is
/// skipped, since the recording is already structured) and go through the
/// gate and tracker exactly as live data would.
pub struct ReplayDriver {
    config: ReplayConfig,
    stop: Option<Receiver<()>>,
}

impl ReplayDriver {
    pub fn new(config: ReplayConfig) -> Result<Self, PulseError> {
        if config.timescale <= 0.0 {
            return Err(PulseError::InvalidTimescale(config.timescale));
        }
        Ok(Self { config, stop: None })
    }

    /// Abort the remaining replay when a message arrives on `stop`. The
    /// inter-row pause is the only suspension point, so cancellation never
    /// lands mid-record: everything already appended stays valid.
    pub fn with_cancellation(mut self, stop: Receiver<()>) -> Self {
        self.stop = Some(stop);
        self
    }

    /// Replay `source` through `processor`, appending every gated record to
    /// the sink's validated log.
    pub fn run<S: RecordSink>(
        &self,
        source: &Path,
        processor: &mut PulseProcessor,
        sink: &mut S,
    ) -> Result<ReplaySummary, PulseError> {
        let text = fs::read_to_string(source)?;

        let mut summary = ReplaySummary::default();
        let mut last_timestamp: Option<i64> = None;

        for line in text.lines() {
            let Some(row) = ReplayRow::parse(line) else {
                if !line.trim().is_empty() {
                    summary.rows_skipped += 1;
                }
                continue;
            };

            // the first row plays immediately; every later row waits out the
            // recorded gap, scaled
            if let Some(previous) = last_timestamp {
                let delay = inter_row_delay(previous, row.timestamp, self.config.timescale);
                if !self.pause(delay) {
                    summary.cancelled = true;
                    break;
                }
            }
            last_timestamp = Some(row.timestamp);

            log::info!("{} {} {}", row.label, row.heart_rate, row.rr_interval);
            let record = processor.process_sample(&row.to_sample());
            sink.append_validated(&record)?;
            summary.rows_processed += 1;
        }

        let counters = processor.counters();
        summary.accepted = counters.accepted;
        summary.rejected = counters.rejected;
        summary.resets = counters.resets;
        Ok(summary)
    }

    /// Wait out one inter-row gap. Returns false when cancellation cut the
    /// wait short.
    fn pause(&self, delay: Duration) -> bool {
        match &self.stop {
            Some(stop) => match stop.recv_timeout(delay) {
                Ok(()) => false,
                Err(RecvTimeoutError::Timeout) => true,
                // a dropped handle means cancellation can no longer arrive
                Err(RecvTimeoutError::Disconnected) => {
                    thread::sleep(delay);
                    true
                }
            },
            None => {
                thread::sleep(delay);
                true
            }
        }
    }
}

/// Wall-clock wait between two recorded rows at the given time scale:
/// `(current − previous) × (1000 / timescale)` milliseconds. A time scale of
/// 1.0 reproduces the recorded pacing; 1000.0 compresses each recorded second
/// into a millisecond.
pub fn inter_row_delay(previous: i64, current: i64, timescale: f64) -> Duration {
    let gap = (current - previous).max(0) as f64;
    Duration::from_millis((gap * (1000.0 / timescale)) as u64)
}
