//! Pulse CLI - Command-line interface for Synheart Pulse
//!
//! Commands:
//! - replay: pace a recorded session through the validation pipeline
//! - validate: gate a recorded session without pacing and report totals
//! - decode: decode one Heart Rate Measurement buffer given as hex

use clap::{Parser, Subcommand};
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use chrono::Utc;
use synheart_pulse::config::DEFAULT_TIMESCALE;
use synheart_pulse::{
    decoder, PulseError, PulseProcessor, ReplayConfig, ReplayDriver, ReplayRow, ReplaySummary,
    SessionLogger, PRODUCER_NAME, PULSE_VERSION,
};

/// Pulse - BLE heart-rate telemetry validation and replay
#[derive(Parser)]
#[command(name = "pulse")]
#[command(author = "Synheart AI Inc")]
#[command(version = PULSE_VERSION)]
#[command(about = "Validate and replay heart-rate telemetry", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a recorded session through the validation pipeline at speed
    Replay {
        /// Recorded session CSV
        input: PathBuf,

        /// Replay speed divisor: 1.0 replays in real time, 1000 compresses
        /// each recorded second into a millisecond
        #[arg(long, default_value_t = DEFAULT_TIMESCALE)]
        timescale: f64,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Gate a recorded session without pacing or log output
    Validate {
        /// Recorded session CSV
        input: PathBuf,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Decode one Heart Rate Measurement buffer
    Decode {
        /// Characteristic payload as hex bytes, e.g. "10 46 00 04"
        hex: String,

        /// Capture timestamp to stamp on the samples (seconds; defaults to now)
        #[arg(long)]
        timestamp: Option<i64>,
    },
}

fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

/// Interactive runs default to echoing rows and stale-data warnings; piped
/// runs stay quiet. RUST_LOG overrides either way.
fn init_logging() {
    let default_level = if atty::is(atty::Stream::Stderr) {
        log::LevelFilter::Info
    } else {
        log::LevelFilter::Warn
    };

    let mut builder = env_logger::Builder::new();
    builder.filter_level(default_level);
    builder.parse_default_env();
    builder.init();
}

fn run(cli: Cli) -> Result<(), PulseCliError> {
    match cli.command {
        Commands::Replay {
            input,
            timescale,
            json,
        } => cmd_replay(&input, timescale, json),
        Commands::Validate { input, json } => cmd_validate(&input, json),
        Commands::Decode { hex, timestamp } => cmd_decode(&hex, timestamp),
    }
}

fn cmd_replay(input: &Path, timescale: f64, json: bool) -> Result<(), PulseCliError> {
    let driver = ReplayDriver::new(ReplayConfig { timescale })?;
    let mut processor = PulseProcessor::new();
    let mut logger = SessionLogger::for_replay(input)?;

    let summary = driver.run(input, &mut processor, &mut logger)?;

    if summary.rows_processed == 0 {
        return Err(PulseCliError::EmptySession(input.display().to_string()));
    }
    print_summary("Replay Report", &summary, json)?;
    println!(
        "validated log: {}",
        logger.validated_path().display()
    );
    Ok(())
}

fn cmd_validate(input: &Path, json: bool) -> Result<(), PulseCliError> {
    let text = std::fs::read_to_string(input).map_err(PulseError::from)?;
    let mut processor = PulseProcessor::new();

    let mut summary = ReplaySummary::default();
    for line in text.lines() {
        match ReplayRow::parse(line) {
            Some(row) => {
                processor.process_sample(&row.to_sample());
                summary.rows_processed += 1;
            }
            None => {
                if !line.trim().is_empty() {
                    summary.rows_skipped += 1;
                }
            }
        }
    }

    let counters = processor.counters();
    summary.accepted = counters.accepted;
    summary.rejected = counters.rejected;
    summary.resets = counters.resets;

    if summary.rows_processed == 0 {
        return Err(PulseCliError::EmptySession(input.display().to_string()));
    }
    print_summary("Validation Report", &summary, json)
}

fn cmd_decode(hex: &str, timestamp: Option<i64>) -> Result<(), PulseCliError> {
    let payload = parse_hex(hex)?;
    let captured_at = timestamp.unwrap_or_else(|| Utc::now().timestamp());

    let samples = decoder::decode(&payload, captured_at)?;
    println!("{}", serde_json::to_string_pretty(&samples)?);
    Ok(())
}

fn print_summary(title: &str, summary: &ReplaySummary, json: bool) -> Result<(), PulseCliError> {
    if json {
        let report = SummaryReport {
            producer: PRODUCER_NAME,
            version: PULSE_VERSION,
            summary: *summary,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{title}");
        println!("{}", "=".repeat(title.len()));
        println!("Rows processed: {}", summary.rows_processed);
        println!("Rows skipped:   {}", summary.rows_skipped);
        println!("Accepted:       {}", summary.accepted);
        println!("Rejected:       {}", summary.rejected);
        println!("Stale resets:   {}", summary.resets);
        if summary.cancelled {
            println!("(cancelled before the recording ran out)");
        }
    }
    Ok(())
}

fn parse_hex(hex: &str) -> Result<Vec<u8>, PulseCliError> {
    let compact: String = hex
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ':')
        .collect();
    if compact.is_empty() || compact.len() % 2 != 0 {
        return Err(PulseCliError::BadHex(hex.to_string()));
    }

    (0..compact.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&compact[i..i + 2], 16)
                .map_err(|_| PulseCliError::BadHex(hex.to_string()))
        })
        .collect()
}

// Error types

#[derive(Debug)]
enum PulseCliError {
    Pulse(PulseError),
    Io(io::Error),
    Json(serde_json::Error),
    BadHex(String),
    EmptySession(String),
}

impl From<PulseError> for PulseCliError {
    fn from(e: PulseError) -> Self {
        PulseCliError::Pulse(e)
    }
}

impl From<io::Error> for PulseCliError {
    fn from(e: io::Error) -> Self {
        PulseCliError::Io(e)
    }
}

impl From<serde_json::Error> for PulseCliError {
    fn from(e: serde_json::Error) -> Self {
        PulseCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct SummaryReport {
    producer: &'static str,
    version: &'static str,
    #[serde(flatten)]
    summary: ReplaySummary,
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<PulseCliError> for CliError {
    fn from(e: PulseCliError) -> Self {
        match e {
            PulseCliError::Pulse(e) => CliError {
                code: "PULSE_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check the input recording and options".to_string()),
            },
            PulseCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            PulseCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: None,
            },
            PulseCliError::BadHex(input) => CliError {
                code: "BAD_HEX".to_string(),
                message: format!("cannot parse '{input}' as hex bytes"),
                hint: Some("Pass the payload as pairs of hex digits, e.g. \"10 46 00 04\"".to_string()),
            },
            PulseCliError::EmptySession(path) => CliError {
                code: "EMPTY_SESSION".to_string(),
                message: format!("no usable rows in {path}"),
                hint: Some("Expected 4-field rows: label,timestamp,heart_rate,rr_interval".to_string()),
            },
        }
    }
}
