//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::analysis::Cadence;
use crate::schema::InstrumentModel;
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Aethalometer - averaging tool for AE33/AE31 data files
///
/// Loads one or more aethalometer data files, averages the black-carbon
/// channels over fixed or custom time windows and writes the result as
/// CSV or JSON.
///
/// Examples:
///   aethalometer AE33_20190514.dat
///   aethalometer --model ae31 --freq minutely --ilength 30 day1.csv day2.csv
///   aethalometer --intervals campaign.csv --bckey BC1 AE33_20190514.dat
///   aethalometer --freq raw --format json
///   aethalometer --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Data files to process, in chronological order
    ///
    /// Leave empty to use the newest file in the configured data directory.
    #[arg(value_name = "FILE")]
    pub files: Vec<PathBuf>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .aethalometer.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Instrument model of the data files (default: ae33)
    #[arg(short, long, value_name = "MODEL", env = "AETHALOMETER_MODEL")]
    pub model: Option<InstrumentModel>,

    /// Averaging frequency; `raw` disables averaging
    #[arg(long, value_name = "FREQ")]
    pub freq: Option<Frequency>,

    /// Stride between window starts, in units of --freq
    ///
    /// e.g. 4 with hourly averages every fourth hour.
    #[arg(long, value_name = "N")]
    pub ilength: Option<u32>,

    /// CSV file with `start` and `end` columns defining the windows
    ///
    /// Takes precedence over --freq averaging.
    #[arg(long, value_name = "FILE")]
    pub intervals: Option<PathBuf>,

    /// Channel to summarise: BC1 through BC7, or BB for AE33 (default: BC6 = 880 nm)
    #[arg(long, value_name = "CHANNEL")]
    pub bckey: Option<String>,

    /// Fractional digits kept in averaged values
    #[arg(long, value_name = "N")]
    pub decimals: Option<u32>,

    /// Output format (csv, json)
    #[arg(long, default_value = "csv", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Write the table to this file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .aethalometer.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Comma separated values (default)
    #[default]
    Csv,
    /// JSON document
    Json,
}

/// Averaging frequency as chosen on the command line or in the config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    /// No averaging; every record is reported
    Raw,
    Hourly,
    Minutely,
    Secondly,
}

impl Frequency {
    /// The window cadence, or `None` for raw output.
    pub fn cadence(&self) -> Option<Cadence> {
        match self {
            Frequency::Raw => None,
            Frequency::Hourly => Some(Cadence::Hourly),
            Frequency::Minutely => Some(Cadence::Minutely),
            Frequency::Secondly => Some(Cadence::Secondly),
        }
    }
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if self.ilength == Some(0) {
            return Err("0 is an invalid positive int value for --ilength".to_string());
        }

        for file in &self.files {
            if !file.is_file() {
                return Err(format!("Data file does not exist: {}", file.display()));
            }
        }

        if let Some(ref intervals) = self.intervals {
            if !intervals.is_file() {
                return Err(format!(
                    "Interval file does not exist: {}",
                    intervals.display()
                ));
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    ///
    /// `config_verbose` is the `verbose` key of the configuration file;
    /// `--quiet` wins over both.
    pub fn log_level(&self, config_verbose: bool) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose || config_verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
