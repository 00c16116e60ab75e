//! BLE delivery boundary
//!
//! Pulse does not talk to a Bluetooth stack itself. Whatever does (a
//! platform GATT binding, a test harness) subscribes to the Heart Rate
//! Measurement characteristic and pushes each notification into the bounded
//! channel created here. A single [`NotificationPump`] drains that channel
//! strictly in arrival order, which is what keeps the drift tracker's
//! order-dependent state safe without any further locking.
//!
//! Per-device failures during discovery belong to the stack side of this
//! boundary: a misbehaving candidate is skipped and enumeration continues.

use crate::error::PulseError;
use crate::pipeline::{PulseProcessor, SessionCounters};
use crate::session::RecordSink;
use chrono::{Local, TimeZone, Utc};
use crossbeam_channel::{bounded, Receiver, Sender};
use serde::{Deserialize, Serialize};
use uuid::{uuid, Uuid};

/// Heart Rate GATT service
pub const HEART_RATE_SERVICE: Uuid = uuid!("0000180d-0000-1000-8000-00805f9b34fb");
/// Heart Rate Measurement characteristic
pub const HEART_RATE_MEASUREMENT: Uuid = uuid!("00002a37-0000-1000-8000-00805f9b34fb");

/// Default bound on in-flight notifications. At one notification per second
/// from a heart-rate sensor this is a minute of backlog.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// Connection state as reported by the BLE stack
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    Connected,
    Disconnected,
}

/// One raw characteristic notification, stamped at delivery
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    /// Wall-clock seconds at the moment the stack delivered the value
    pub received_at: i64,
    pub payload: Vec<u8>,
}

impl Notification {
    /// Stamp a payload with the current wall clock
    pub fn now(payload: Vec<u8>) -> Self {
        Self {
            received_at: Utc::now().timestamp(),
            payload,
        }
    }
}

/// Events crossing the delivery boundary
#[derive(Debug, Clone, PartialEq)]
pub enum SourceEvent {
    Measurement(Notification),
    /// Observed and logged only; there is no reconnection policy
    ConnectionChanged(ConnectionStatus),
}

/// Create the bounded delivery channel. The stack side keeps the sender and
/// may clone it; the pump takes the receiver. A full channel applies
/// backpressure to the stack rather than growing without bound.
pub fn notification_channel(capacity: usize) -> (Sender<SourceEvent>, Receiver<SourceEvent>) {
    bounded(capacity)
}

/// Single consumer turning delivery events into logged records.
///
/// Each measurement runs decode → gate → drift → append to completion before
/// the next one is taken, so records land in the logs in arrival order.
pub struct NotificationPump<S: RecordSink> {
    processor: PulseProcessor,
    sink: S,
}

impl<S: RecordSink> NotificationPump<S> {
    pub fn new(processor: PulseProcessor, sink: S) -> Self {
        Self { processor, sink }
    }

    /// Drain the channel until every sender is gone, then report the
    /// session's totals.
    ///
    /// An undecodable buffer is dropped with a warning and processing
    /// continues with the next notification; only sink failures end the run.
    pub fn run(&mut self, events: &Receiver<SourceEvent>) -> Result<SessionCounters, PulseError> {
        for event in events.iter() {
            match event {
                SourceEvent::Measurement(notification) => {
                    self.handle_notification(&notification)?;
                }
                SourceEvent::ConnectionChanged(status) => {
                    log::info!("connection status: {status:?}");
                }
            }
        }
        Ok(self.processor.counters())
    }

    fn handle_notification(&mut self, notification: &Notification) -> Result<(), PulseError> {
        let records = match self
            .processor
            .process_buffer(&notification.payload, notification.received_at)
        {
            Ok(records) => records,
            Err(err) => {
                log::warn!("dropping undecodable notification: {err}");
                return Ok(());
            }
        };

        let label = capture_label(notification.received_at);
        for record in records {
            if record.accepted {
                self.sink.append_raw(&label, &record)?;
            }
            self.sink.append_validated(&record)?;
        }
        Ok(())
    }

    pub fn processor(&self) -> &PulseProcessor {
        &self.processor
    }

    /// Hand back the sink (and its file handles) when the session ends
    pub fn into_sink(self) -> S {
        self.sink
    }
}

/// Local-time label recorded next to each raw log line
fn capture_label(received_at: i64) -> String {
    match Local.timestamp_opt(received_at, 0) {
        chrono::LocalResult::Single(t) => t.format("%H:%M:%S").to_string(),
        _ => received_at.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ValidatedRecord;
    use pretty_assertions::assert_eq;

    #[derive(Default)]
    struct MemorySink {
        raw: Vec<String>,
        validated: Vec<ValidatedRecord>,
    }

    impl RecordSink for MemorySink {
        fn append_raw(&mut self, label: &str, record: &ValidatedRecord) -> Result<(), PulseError> {
            self.raw.push(format!("{label} {}", record.heart_rate));
            Ok(())
        }

        fn append_validated(&mut self, record: &ValidatedRecord) -> Result<(), PulseError> {
            self.validated.push(record.clone());
            Ok(())
        }
    }

    fn measurement(received_at: i64, payload: Vec<u8>) -> SourceEvent {
        SourceEvent::Measurement(Notification {
            received_at,
            payload,
        })
    }

    #[test]
    fn test_gatt_identifiers() {
        assert_eq!(
            HEART_RATE_SERVICE.to_string(),
            "0000180d-0000-1000-8000-00805f9b34fb"
        );
        assert_eq!(
            HEART_RATE_MEASUREMENT.to_string(),
            "00002a37-0000-1000-8000-00805f9b34fb"
        );
    }

    #[test]
    fn test_pump_processes_notifications_in_order() {
        let (tx, rx) = notification_channel(DEFAULT_CHANNEL_CAPACITY);
        tx.send(measurement(1000, vec![0x10, 70, 0x00, 0x04])).unwrap();
        tx.send(SourceEvent::ConnectionChanged(ConnectionStatus::Disconnected))
            .unwrap();
        tx.send(measurement(1001, vec![0x10, 72, 0x66, 0x03])).unwrap();
        drop(tx);

        let mut pump = NotificationPump::new(PulseProcessor::new(), MemorySink::default());
        let counters = pump.run(&rx).unwrap();

        assert_eq!(counters.accepted, 2);
        let sink = pump.into_sink();
        assert_eq!(sink.validated.len(), 2);
        assert_eq!(sink.validated[0].heart_rate, 70);
        assert_eq!(sink.validated[1].heart_rate, 72);
    }

    #[test]
    fn test_pump_survives_undecodable_buffer() {
        let (tx, rx) = notification_channel(DEFAULT_CHANNEL_CAPACITY);
        // wide heart rate declared, buffer ends early
        tx.send(measurement(1000, vec![0x01, 70])).unwrap();
        tx.send(measurement(1001, vec![0x10, 70, 0x00, 0x04])).unwrap();
        drop(tx);

        let mut pump = NotificationPump::new(PulseProcessor::new(), MemorySink::default());
        let counters = pump.run(&rx).unwrap();

        assert_eq!(counters.accepted, 1);
        assert_eq!(pump.into_sink().validated.len(), 1);
    }

    #[test]
    fn test_rejected_samples_skip_the_raw_log() {
        let (tx, rx) = notification_channel(DEFAULT_CHANNEL_CAPACITY);
        tx.send(measurement(1000, vec![0x10, 70, 0x00, 0x04])).unwrap();
        // 160 bpm is outside the acceptance window
        tx.send(measurement(1001, vec![0x10, 160, 0x00, 0x04])).unwrap();
        drop(tx);

        let mut pump = NotificationPump::new(PulseProcessor::new(), MemorySink::default());
        pump.run(&rx).unwrap();

        let sink = pump.into_sink();
        assert_eq!(sink.raw.len(), 1);
        // the validated log still carries both, the second as a marker
        assert_eq!(sink.validated.len(), 2);
        assert!(!sink.validated[1].accepted);
        assert_eq!(sink.validated[1].heart_rate, 120);
    }
}
