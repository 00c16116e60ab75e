//! Durable session logging
//!
//! One session produces up to two append-only CSV logs, created on demand:
//!
//! - the **raw** log (`<session>.csv`): one line per accepted live sample,
//!   with a human-readable capture-time label; never written during replay
//! - the **validated** log (`<session>_filtered.csv`): one line per gated
//!   sample, accepted or rejected; rejected lines carry the fixed marker
//!   values instead of the sample's real ones
//!
//! The pipeline only depends on [`RecordSink`]; file handling stays here at
//! the edge. Appends happen in processing order and each line is flushed as
//! it is written, so a crash loses at most the in-flight record.

use crate::error::PulseError;
use crate::types::ValidatedRecord;
use chrono::Local;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Where validated records go once the pipeline is done with them
pub trait RecordSink {
    /// Append one accepted live sample to the raw session log
    fn append_raw(&mut self, label: &str, record: &ValidatedRecord) -> Result<(), PulseError>;

    /// Append one gated sample (accepted or rejected) to the validated log
    fn append_validated(&mut self, record: &ValidatedRecord) -> Result<(), PulseError>;
}

/// `"<label>",<timestamp>,<heart-rate>,<rr-interval>`
fn raw_line(label: &str, record: &ValidatedRecord) -> String {
    format!(
        "\"{}\",{},{},{}",
        label,
        record.timestamp,
        record.heart_rate,
        fmt_rri(record.rr_interval)
    )
}

/// `<timestamp>,<heart-rate>,<rr-interval>`; the RR field stays empty for
/// accepted samples that carried none
fn validated_line(record: &ValidatedRecord) -> String {
    format!(
        "{},{},{}",
        record.timestamp,
        record.heart_rate,
        fmt_rri(record.rr_interval)
    )
}

fn fmt_rri(rr_interval: Option<f64>) -> String {
    rr_interval.map(|rri| rri.to_string()).unwrap_or_default()
}

/// File-backed [`RecordSink`] writing the session's two CSV logs
pub struct SessionLogger {
    raw_path: PathBuf,
    validated_path: PathBuf,
    raw: Option<File>,
    validated: Option<File>,
}

impl SessionLogger {
    /// Logger for the session named `session`, placing both logs in `dir`.
    /// Files are not created until the first record is appended.
    pub fn new(dir: &Path, session: &str) -> Self {
        Self {
            raw_path: dir.join(format!("{session}.csv")),
            validated_path: dir.join(format!("{session}_filtered.csv")),
            raw: None,
            validated: None,
        }
    }

    /// Logger for a live recording session, named from the local wall clock
    pub fn for_live_session(dir: &Path) -> Self {
        let session = Local::now().format("%Y_%m_%d-%H_%M").to_string();
        log::info!("starting session {session}");
        Self::new(dir, &session)
    }

    /// Logger for a replay of `source`, named after the source file and
    /// writing next to it. A validated log left over from an earlier run of
    /// the same source is removed so the replay starts clean.
    pub fn for_replay(source: &Path) -> Result<Self, PulseError> {
        let session = source
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "replay".to_string());
        let dir = source.parent().unwrap_or_else(|| Path::new("."));

        let logger = Self::new(dir, &session);
        if logger.validated_path.exists() {
            std::fs::remove_file(&logger.validated_path)?;
        }
        Ok(logger)
    }

    pub fn raw_path(&self) -> &Path {
        &self.raw_path
    }

    pub fn validated_path(&self) -> &Path {
        &self.validated_path
    }

    fn append_line(slot: &mut Option<File>, path: &Path, line: &str) -> Result<(), PulseError> {
        if slot.is_none() {
            *slot = Some(OpenOptions::new().create(true).append(true).open(path)?);
        }
        if let Some(file) = slot.as_mut() {
            writeln!(file, "{line}")?;
            file.flush()?;
        }
        Ok(())
    }
}

impl RecordSink for SessionLogger {
    fn append_raw(&mut self, label: &str, record: &ValidatedRecord) -> Result<(), PulseError> {
        Self::append_line(&mut self.raw, &self.raw_path, &raw_line(label, record))
    }

    fn append_validated(&mut self, record: &ValidatedRecord) -> Result<(), PulseError> {
        Self::append_line(
            &mut self.validated,
            &self.validated_path,
            &validated_line(record),
        )
    }
}
