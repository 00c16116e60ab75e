//! Heart Rate Measurement characteristic decoding
//!
//! Parses the raw byte buffer of a Bluetooth SIG Heart Rate Measurement
//! notification into structured samples. The layout is fixed by the
//! specification of characteristic 0x2A37: a flag byte, a heart-rate field
//! whose width the flags select, an optional Energy Expended field, and an
//! optional run of RR-interval fields filling the rest of the buffer.

use crate::error::PulseError;
use crate::types::DecodedSample;
use serde::{Deserialize, Serialize};

/// Flag bit 0: heart-rate field is 16-bit little-endian instead of 8-bit
const FLAG_HR_WIDE: u8 = 1 << 0;
/// Flag bit 3: a 16-bit Energy Expended field follows the heart rate
const FLAG_ENERGY_PRESENT: u8 = 1 << 3;
/// Flag bit 4: the remainder of the buffer is RR-interval fields
const FLAG_RR_PRESENT: u8 = 1 << 4;

/// RR-intervals are transmitted in units of 1/1024 second
const RR_TICKS_PER_SECOND: f64 = 1024.0;

/// One parsed Heart Rate Measurement notification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HrmMeasurement {
    pub heart_rate: u16,
    pub energy_expended: Option<u16>,
    /// RR-intervals in seconds, in transmission order; empty when the
    /// notification carried none
    pub rr_intervals: Vec<f64>,
}

impl HrmMeasurement {
    /// Parse one notification buffer.
    ///
    /// Fails only when the buffer is shorter than the fixed-size fields its
    /// own flag byte declares. A trailing odd byte after the RR-interval run
    /// is discarded, not an error.
    pub fn parse(buf: &[u8]) -> Result<Self, PulseError> {
        let flags = *buf.first().ok_or(PulseError::TruncatedBuffer {
            expected: 2,
            actual: 0,
        })?;

        let hr_len = if flags & FLAG_HR_WIDE != 0 { 2 } else { 1 };
        let energy_len = if flags & FLAG_ENERGY_PRESENT != 0 { 2 } else { 0 };
        let fixed_len = 1 + hr_len + energy_len;
        if buf.len() < fixed_len {
            return Err(PulseError::TruncatedBuffer {
                expected: fixed_len,
                actual: buf.len(),
            });
        }

        let mut offset = 1;
        let heart_rate = if flags & FLAG_HR_WIDE != 0 {
            let hr = u16::from_le_bytes([buf[offset], buf[offset + 1]]);
            offset += 2;
            hr
        } else {
            let hr = u16::from(buf[offset]);
            offset += 1;
            hr
        };

        // Energy Expended advances the offset even though nothing downstream
        // reads it; skipping it would shift every RR-interval by two bytes.
        let energy_expended = if flags & FLAG_ENERGY_PRESENT != 0 {
            let energy = u16::from_le_bytes([buf[offset], buf[offset + 1]]);
            offset += 2;
            Some(energy)
        } else {
            None
        };

        let mut rr_intervals = Vec::new();
        if flags & FLAG_RR_PRESENT != 0 {
            while buf.len() - offset >= 2 {
                let ticks = u16::from_le_bytes([buf[offset], buf[offset + 1]]);
                offset += 2;
                rr_intervals.push(f64::from(ticks) / RR_TICKS_PER_SECOND);
            }
        }

        Ok(Self {
            heart_rate,
            energy_expended,
            rr_intervals,
        })
    }

    /// Expand the measurement into pipeline samples, one per RR-interval,
    /// or exactly one sample without an RR-interval when the notification
    /// carried none. Never empty.
    pub fn into_samples(self, captured_at: i64) -> Vec<DecodedSample> {
        if self.rr_intervals.is_empty() {
            return vec![DecodedSample {
                captured_at,
                heart_rate: self.heart_rate,
                rr_interval: None,
                energy_expended: self.energy_expended,
            }];
        }

        self.rr_intervals
            .iter()
            .map(|&rr| DecodedSample {
                captured_at,
                heart_rate: self.heart_rate,
                rr_interval: Some(rr),
                energy_expended: self.energy_expended,
            })
            .collect()
    }
}

/// Decode one notification buffer straight into pipeline samples
pub fn decode(buf: &[u8], captured_at: i64) -> Result<Vec<DecodedSample>, PulseError> {
    Ok(HrmMeasurement::parse(buf)?.into_samples(captured_at))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_decode_rr_only_buffer() {
        // flags 0x10: 8-bit heart rate, RR-intervals present
        let samples = decode(&[0x10, 70, 0x00, 0x04], 1000).unwrap();

        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].heart_rate, 70);
        // 0x0400 ticks = 1024/1024 = exactly one second
        assert_eq!(samples[0].rr_interval, Some(1.0));
        assert_eq!(samples[0].captured_at, 1000);
        assert_eq!(samples[0].energy_expended, None);
    }

    #[test]
    fn test_decode_plain_heart_rate() {
        let samples = decode(&[0x00, 60], 1000).unwrap();

        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].heart_rate, 60);
        assert_eq!(samples[0].rr_interval, None);
    }

    #[test]
    fn test_decode_wide_heart_rate() {
        // 0x012C little-endian = 300 bpm, beyond the 8-bit field
        let samples = decode(&[0x01, 0x2C, 0x01], 1000).unwrap();

        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].heart_rate, 300);
    }

    #[test]
    fn test_energy_expended_is_consumed() {
        // flags 0x18: energy present and RR present; the RR field must be
        // read from after the energy bytes, not from them
        let samples = decode(&[0x18, 72, 0x10, 0x00, 0x00, 0x04], 1000).unwrap();

        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].energy_expended, Some(16));
        assert_eq!(samples[0].rr_interval, Some(1.0));
    }

    #[test]
    fn test_multiple_rr_fields_yield_multiple_samples() {
        let samples = decode(&[0x10, 70, 0x00, 0x02, 0x00, 0x04], 1000).unwrap();

        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].rr_interval, Some(0.5));
        assert_eq!(samples[1].rr_interval, Some(1.0));
        // shared fields repeat on every sample from the buffer
        assert_eq!(samples[0].heart_rate, 70);
        assert_eq!(samples[1].heart_rate, 70);
        assert_eq!(samples[1].captured_at, 1000);
    }

    #[test]
    fn test_trailing_odd_byte_is_discarded() {
        let samples = decode(&[0x10, 70, 0x00, 0x04, 0xFF], 1000).unwrap();

        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].rr_interval, Some(1.0));
    }

    #[test]
    fn test_rr_flag_without_rr_bytes_yields_bare_sample() {
        let samples = decode(&[0x10, 70], 1000).unwrap();

        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].rr_interval, None);
    }

    #[test]
    fn test_truncated_buffers_are_rejected() {
        assert!(matches!(
            HrmMeasurement::parse(&[]),
            Err(PulseError::TruncatedBuffer {
                expected: 2,
                actual: 0
            })
        ));
        // wide heart rate declared, second byte missing
        assert!(matches!(
            HrmMeasurement::parse(&[0x01, 70]),
            Err(PulseError::TruncatedBuffer {
                expected: 3,
                actual: 2
            })
        ));
        // energy declared but absent
        assert!(matches!(
            HrmMeasurement::parse(&[0x08, 70]),
            Err(PulseError::TruncatedBuffer {
                expected: 5,
                actual: 2
            })
        ));
    }
}
