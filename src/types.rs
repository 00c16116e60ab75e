//! Core types for the Synheart Pulse pipeline
//!
//! This module defines the data that flows through each stage of the pipeline:
//! decoded samples out of the characteristic decoder, validated records out of
//! the gate/tracker, and the parsed form of recorded session rows.

use serde::{Deserialize, Serialize};

/// One structured sample decoded from a Heart Rate Measurement notification.
///
/// A single notification buffer can yield several samples, one per RR-interval
/// field it carries, all sharing the same capture timestamp, heart rate, and
/// energy reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodedSample {
    /// Capture timestamp in seconds, supplied by the caller at decode time:
    /// wall clock for live notifications, the recorded timestamp for replay
    pub captured_at: i64,
    /// Heart rate in beats per minute
    pub heart_rate: u16,
    /// Time between two consecutive beats, in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rr_interval: Option<f64>,
    /// Energy Expended field, when the sensor transmits one (kilojoules)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub energy_expended: Option<u16>,
}

/// The pipeline's verdict on one decoded sample.
///
/// Emitted once per sample regardless of acceptance. A rejected record carries
/// the fixed replacement values from [`crate::gate`] instead of the sample's
/// real ones, so the validated log shows an explicit marker rather than
/// silence or implausible data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatedRecord {
    pub timestamp: i64,
    pub heart_rate: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rr_interval: Option<f64>,
    pub accepted: bool,
    /// Wall-clock disagreement of the reconstructed beat timeline, present
    /// only when the drift tracker ran for this sample
    #[serde(skip_serializing_if = "Option::is_none")]
    pub drift_error: Option<f64>,
}

/// One parsed row of a recorded session file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayRow {
    /// Human-readable capture-time label carried through from the recording
    pub label: String,
    /// Recorded capture timestamp in seconds
    pub timestamp: i64,
    pub heart_rate: u16,
    /// RR-interval in seconds, as recorded
    pub rr_interval: f64,
}

impl ReplayRow {
    /// Parse one recorded CSV row.
    ///
    /// Only lines with exactly four comma-separated fields are rows of ours;
    /// anything else (headers, blank lines, partial writes) yields `None`.
    /// A four-field row whose numeric fields do not parse is also skipped,
    /// with a warning, since it usually means a corrupted recording.
    pub fn parse(line: &str) -> Option<Self> {
        let fields: Vec<&str> = line.split(',').collect();
        if fields.len() != 4 {
            return None;
        }

        let timestamp = fields[1].trim().parse::<i64>();
        let heart_rate = fields[2].trim().parse::<u16>();
        let rr_interval = fields[3].trim().parse::<f64>();

        match (timestamp, heart_rate, rr_interval) {
            (Ok(timestamp), Ok(heart_rate), Ok(rr_interval)) => Some(Self {
                label: fields[0].trim().trim_matches('"').to_string(),
                timestamp,
                heart_rate,
                rr_interval,
            }),
            _ => {
                log::warn!("skipping malformed session row: {line}");
                None
            }
        }
    }

    /// View the row as a decoded sample, ready for the gate/tracker pipeline.
    /// Recorded rows always carry an RR-interval; energy is never recorded.
    pub fn to_sample(&self) -> DecodedSample {
        DecodedSample {
            captured_at: self.timestamp,
            heart_rate: self.heart_rate,
            rr_interval: Some(self.rr_interval),
            energy_expended: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_recorded_row() {
        let row = ReplayRow::parse("\"14:23:45\",1620690061,70,0.9").unwrap();

        assert_eq!(row.label, "14:23:45");
        assert_eq!(row.timestamp, 1620690061);
        assert_eq!(row.heart_rate, 70);
        assert_eq!(row.rr_interval, 0.9);
    }

    #[test]
    fn test_rows_with_other_field_counts_are_skipped() {
        assert_eq!(ReplayRow::parse(""), None);
        assert_eq!(ReplayRow::parse("1620690061,70,0.9"), None);
        assert_eq!(ReplayRow::parse("a,b,c,d,e"), None);
    }

    #[test]
    fn test_rows_with_unparsable_numbers_are_skipped() {
        assert_eq!(ReplayRow::parse("\"x\",not-a-time,70,0.9"), None);
        assert_eq!(ReplayRow::parse("\"x\",1620690061,seventy,0.9"), None);
        assert_eq!(ReplayRow::parse("\"x\",1620690061,70,fast"), None);
    }

    #[test]
    fn test_record_serialization_omits_absent_fields() {
        let record = ValidatedRecord {
            timestamp: 1000,
            heart_rate: 70,
            rr_interval: None,
            accepted: true,
            drift_error: None,
        };

        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(
            json,
            serde_json::json!({"timestamp": 1000, "heart_rate": 70, "accepted": true})
        );
    }

    #[test]
    fn test_row_to_sample() {
        let row = ReplayRow::parse("\"14:23:45\",1000,70,0.9").unwrap();
        let sample = row.to_sample();

        assert_eq!(
            sample,
            DecodedSample {
                captured_at: 1000,
                heart_rate: 70,
                rr_interval: Some(0.9),
                energy_expended: None,
            }
        );
    }
}
