//! # Telemetry Logger
//!
//! Writes received measurements to JSONL files with rotation.
//!
//! This module handles:
//! - Formatting one JSON object per line (JSON Lines)
//! - Rotating to a fresh file after a configured record count
//! - Retaining only the newest files
//!
//! Each line carries the measurement record flattened alongside the link
//! metadata for that reception, so a file can be analyzed without the
//! radio in the loop.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::TelemetryConfig;
use crate::error::Result;
use crate::radio::quality::LinkQuality;
use crate::telemetry::TelemetryRecord;

const FILE_PREFIX: &str = "telemetry_";
const FILE_SUFFIX: &str = ".jsonl";

/// One logged line: link metadata plus the flattened measurement record
#[derive(Debug, Serialize)]
pub struct TelemetryEntry {
    /// Reception time in RFC 3339 form
    pub timestamp: String,
    /// Signal strength of the carrying frame in dBm
    pub rssi_dbm: i16,
    /// Link quality indicator of the carrying frame
    pub lqi: u8,
    /// Signal strength classification
    pub quality: LinkQuality,
    #[serde(flatten)]
    pub record: TelemetryRecord,
}

impl TelemetryEntry {
    /// Stamp a received record with the current time and link metadata
    pub fn new(record: TelemetryRecord, rssi_dbm: i16, lqi: u8, quality: LinkQuality) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            rssi_dbm,
            lqi,
            quality,
            record,
        }
    }
}

/// Rotating JSONL writer for telemetry entries
///
/// Files are named `telemetry_<timestamp>_<sequence>.jsonl`; the fixed
/// width timestamp and zero-padded sequence make names sort in write
/// order, which the retention pass relies on. File names share the UTC
/// basis of the entry timestamps, so a file's date always matches the
/// lines inside it.
pub struct TelemetryLogger {
    config: TelemetryConfig,
    writer: Option<File>,
    records_in_file: usize,
    file_seq: u32,
}

impl TelemetryLogger {
    /// Create a logger, making sure the log directory exists
    ///
    /// No file is opened until the first record arrives, so an idle base
    /// station leaves no empty files behind.
    pub fn new(config: &TelemetryConfig) -> Result<Self> {
        if config.enabled {
            fs::create_dir_all(&config.log_dir)?;
        }
        Ok(Self {
            config: config.clone(),
            writer: None,
            records_in_file: 0,
            file_seq: 0,
        })
    }

    /// Append one entry, rotating and pruning as configured
    ///
    /// Every line is flushed immediately; at telemetry rates the cost is
    /// negligible and a crash loses at most the line being written.
    pub fn log(&mut self, entry: &TelemetryEntry) -> Result<()> {
        if !self.config.enabled {
            return Ok(());
        }

        if self.writer.is_none() {
            self.open_next_file()?;
        }

        let line = serde_json::to_string(entry)?;
        if let Some(file) = self.writer.as_mut() {
            writeln!(file, "{}", line)?;
            file.flush()?;
        }
        self.records_in_file += 1;

        if self.records_in_file >= self.config.max_records_per_file {
            debug!(
                "Telemetry file reached {} records, rotating",
                self.config.max_records_per_file
            );
            self.writer = None;
            self.records_in_file = 0;
        }
        Ok(())
    }

    fn open_next_file(&mut self) -> Result<()> {
        self.file_seq += 1;
        let stamp = Utc::now().format("%Y%m%d_%H%M%S");
        let name = format!("{}{}_{:04}{}", FILE_PREFIX, stamp, self.file_seq, FILE_SUFFIX);
        let path = Path::new(&self.config.log_dir).join(name);

        let file = File::create(&path)?;
        info!("Logging telemetry to {}", path.display());
        self.writer = Some(file);
        self.records_in_file = 0;

        self.prune_old_files()?;
        Ok(())
    }

    fn prune_old_files(&self) -> Result<()> {
        let mut files: Vec<PathBuf> = fs::read_dir(&self.config.log_dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.file_name()
                    .and_then(|name| name.to_str())
                    .map(|name| name.starts_with(FILE_PREFIX) && name.ends_with(FILE_SUFFIX))
                    .unwrap_or(false)
            })
            .collect();

        if files.len() <= self.config.max_files_to_keep {
            return Ok(());
        }

        files.sort();
        let excess = files.len() - self.config.max_files_to_keep;
        for path in files.into_iter().take(excess) {
            match fs::remove_file(&path) {
                Ok(()) => debug!("Pruned old telemetry file {}", path.display()),
                Err(e) => warn!(
                    "Failed to prune old telemetry file {}: {}",
                    path.display(),
                    e
                ),
            }
        }
        Ok(())
    }
}
