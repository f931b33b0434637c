//! # Telemetry Module
//!
//! Records what the session transmitted to JSONL files with rotation.
//!
//! This module handles:
//! - Formatting flight events as JSONL (JSON Lines)
//! - Writing to rotating log files
//! - Managing file rotation (max N records per file)
//! - Retaining only the last M files

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::TelemetryConfig;
use crate::control::Command;
use crate::error::{Result, TeleopError};

/// Log file name prefix; retention only touches files carrying it.
const FILE_PREFIX: &str = "flight_";
const FILE_SUFFIX: &str = ".jsonl";

/// One loggable occurrence. Serialized flat, discriminated by `event`.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum FlightEvent {
    /// A velocity command transmitted to the vehicle.
    Velocity {
        lateral: i32,
        longitudinal: i32,
        vertical: i32,
        yaw: i32,
    },
    /// A one-shot command dispatched to the vehicle.
    Command { name: &'static str },
}

impl FlightEvent {
    /// Event for a dispatched one-shot command.
    #[must_use]
    pub fn command(command: &Command) -> Self {
        let name = match command {
            Command::Takeoff => "takeoff",
            Command::Land => "land",
            Command::EmergencyStop => "emergency_stop",
            Command::Flip(_) => "flip",
        };
        Self::Command { name }
    }
}

#[derive(Serialize)]
struct FlightRecord<'a> {
    timestamp: String,
    #[serde(flatten)]
    event: &'a FlightEvent,
}

/// JSONL flight log with size-based rotation and count-based retention.
pub struct FlightLog {
    dir: PathBuf,
    max_records_per_file: usize,
    max_files_to_keep: usize,
    writer: BufWriter<File>,
    records_in_file: usize,
    sequence: u64,
}

impl std::fmt::Debug for FlightLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlightLog")
            .field("dir", &self.dir)
            .field("records_in_file", &self.records_in_file)
            .field("sequence", &self.sequence)
            .finish_non_exhaustive()
    }
}

impl FlightLog {
    /// Opens a fresh log file under the configured directory, creating the
    /// directory if needed.
    ///
    /// # Errors
    ///
    /// Returns `Io` error if the directory or the first file cannot be
    /// created.
    pub fn open(config: &TelemetryConfig) -> Result<Self> {
        let dir = PathBuf::from(&config.log_dir);
        fs::create_dir_all(&dir)?;

        let sequence = 0;
        let writer = Self::open_file(&dir, sequence)?;

        info!("Flight log writing to {}", dir.display());

        Ok(Self {
            dir,
            max_records_per_file: config.max_records_per_file,
            max_files_to_keep: config.max_files_to_keep,
            writer,
            records_in_file: 0,
            sequence,
        })
    }

    /// Appends one event as a JSONL record, rotating when the file is full.
    ///
    /// # Errors
    ///
    /// Returns `Io` error if the write fails, or `Telemetry` error if the
    /// record cannot be serialized.
    pub fn record(&mut self, event: &FlightEvent) -> Result<()> {
        if self.records_in_file >= self.max_records_per_file {
            self.rotate()?;
        }

        let record = FlightRecord {
            timestamp: Utc::now().to_rfc3339(),
            event,
        };
        let line = serde_json::to_string(&record)
            .map_err(|e| TeleopError::Telemetry(format!("Failed to serialize record: {}", e)))?;

        self.writer.write_all(line.as_bytes())?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        self.records_in_file += 1;

        Ok(())
    }

    /// Closes the current file and opens the next one, pruning old files
    /// past the retention limit.
    fn rotate(&mut self) -> Result<()> {
        self.writer.flush()?;
        self.sequence += 1;
        self.writer = Self::open_file(&self.dir, self.sequence)?;
        self.records_in_file = 0;
        debug!("Rotated flight log to file #{}", self.sequence);

        if let Err(e) = self.prune() {
            warn!("Failed to prune old flight logs: {}", e);
        }

        Ok(())
    }

    fn open_file(dir: &Path, sequence: u64) -> Result<BufWriter<File>> {
        let stamp = Utc::now().format("%Y%m%d_%H%M%S");
        let path = dir.join(format!("{}{}_{:04}{}", FILE_PREFIX, stamp, sequence, FILE_SUFFIX));
        let file = File::create(path)?;
        Ok(BufWriter::new(file))
    }

    /// Deletes the oldest log files beyond the retention count.
    fn prune(&self) -> Result<()> {
        let mut files: Vec<PathBuf> = fs::read_dir(&self.dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.file_name()
                    .and_then(|n| n.to_str())
                    .map(|n| n.starts_with(FILE_PREFIX) && n.ends_with(FILE_SUFFIX))
                    .unwrap_or(false)
            })
            .collect();

        if files.len() <= self.max_files_to_keep {
            return Ok(());
        }

        // Name ordering is chronological: timestamp then sequence
        files.sort();
        let excess = files.len() - self.max_files_to_keep;
        for path in files.iter().take(excess) {
            debug!("Removing old flight log {}", path.display());
            fs::remove_file(path)?;
        }

        Ok(())
    }
}
