//! Aethalometer - averaging tool for black-carbon instrument data
//!
//! A CLI tool that loads AE33/AE31 aethalometer data files, averages the
//! measurement channels over fixed-cadence or custom time windows and
//! writes the averaged table as CSV or JSON.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (bad arguments, unreadable or malformed data, etc.)

mod analysis;
mod cli;
mod config;
mod error;
mod ingest;
mod models;
mod report;
mod scanner;
mod schema;

use analysis::SeriesSummary;
use anyhow::{Context, Result};
use chrono::Utc;
use cli::{Args, OutputFormat};
use config::Config;
use indicatif::{ProgressBar, ProgressStyle};
use ingest::MeasurementTable;
use report::{OutputTable, Report, ReportMetadata};
use schema::InstrumentModel;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Load configuration before logging so its `verbose` key applies
    let (mut config, origin) = match load_config(&args) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    };
    config.merge_with_args(&args);

    // Initialize logging
    init_logging(args.log_level(config.general.verbose));

    debug!("Aethalometer v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);
    origin.log();

    if let Err(e) = run(args, config) {
        error!("Processing failed: {:#}", e);
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Handle --init-config: generate a default .aethalometer.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(config::DEFAULT_CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "{} already exists. Remove it first or edit it manually.",
            config::DEFAULT_CONFIG_FILE
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", config::DEFAULT_CONFIG_FILE))?;

    eprintln!("Created {} with default settings.", config::DEFAULT_CONFIG_FILE);
    Ok(())
}

/// Initialize logging at the given level.
///
/// Logs go to stderr; stdout is reserved for the output table.
fn init_logging(level: tracing::Level) {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("Warning: a global tracing subscriber was already installed");
    }
}

/// Load, average and write the data.
fn run(args: Args, config: Config) -> Result<()> {
    let model = config.general.model;
    info!("Using {} file structure", model);

    let selected = model
        .validate_channel(&config.averaging.channel)
        .context("Invalid --bckey")?;

    let files = resolve_files(&args, &config)?;
    let table = load_tables(&files, model, args.quiet)?;
    info!("Loaded {} records from {} file(s)", table.len(), files.len());

    let channels = model.default_channels();
    let decimals = config.averaging.decimals;

    let (output, averaging, interval, series) = if let Some(ref path) = args.intervals {
        info!("Averaging over intervals from {}", path.display());
        let windows = ingest::load_windows_from_path(path)
            .with_context(|| format!("Failed to load intervals from {}", path.display()))?;
        let averaged = analysis::aggregate_table(&table, &windows, &channels, decimals);
        (
            OutputTable::from_aggregate(&averaged, decimals),
            "custom".to_string(),
            None,
            averaged.series(&selected),
        )
    } else if let Some(cadence) = config.averaging.freq.cadence() {
        let step = config.averaging.effective_interval();
        let windows = analysis::generate_windows(&table, cadence, step)
            .context("Cannot generate averaging windows")?;
        let averaged = analysis::aggregate_table(&table, &windows, &channels, decimals);
        (
            OutputTable::from_aggregate(&averaged, decimals),
            cadence.to_string(),
            Some(step),
            averaged.series(&selected),
        )
    } else {
        info!("Raw output, no averaging");
        (
            OutputTable::from_frame(&table.frame(&channels)),
            "raw".to_string(),
            None,
            table.series(&selected),
        )
    };

    let summary = SeriesSummary::of(&selected, &series);

    let rendered = match args.format {
        OutputFormat::Csv => report::generate_csv(&output)?,
        OutputFormat::Json => {
            let metadata = ReportMetadata {
                model,
                files: files.iter().map(|f| f.display().to_string()).collect(),
                averaging,
                interval,
                decimals,
                records: table.len(),
                generated_at: Utc::now(),
            };
            report::generate_json_report(&Report::new(metadata, &output, summary.clone()))?
        }
    };

    match args.output {
        Some(ref path) => {
            std::fs::write(path, &rendered)
                .with_context(|| format!("Failed to write output to {}", path.display()))?;
            info!("Wrote {} rows to {}", output.rows.len(), path.display());
        }
        None => print!("{}", rendered),
    }

    if !args.quiet {
        eprintln!("\n{}", report::generate_summary_text(model, &summary));
    }

    Ok(())
}

/// Where the configuration came from.
///
/// Configuration is read before the subscriber is installed, so the
/// outcome is kept and logged afterwards.
enum ConfigOrigin {
    Explicit(PathBuf),
    DefaultFile,
    Defaults,
    Unreadable(anyhow::Error),
}

impl ConfigOrigin {
    fn log(&self) {
        match self {
            ConfigOrigin::Explicit(path) => info!("Loaded config from: {}", path.display()),
            ConfigOrigin::DefaultFile => {
                info!("Loaded default config from {}", config::DEFAULT_CONFIG_FILE)
            }
            ConfigOrigin::Defaults => debug!("No config file found, using defaults"),
            ConfigOrigin::Unreadable(e) => warn!("Failed to load config: {:#}", e),
        }
    }
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<(Config, ConfigOrigin)> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        let config = Config::load(config_path)?;
        return Ok((config, ConfigOrigin::Explicit(config_path.clone())));
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => Ok((config, ConfigOrigin::DefaultFile)),
        Ok(None) => Ok((Config::default(), ConfigOrigin::Defaults)),
        Err(e) => Ok((Config::default(), ConfigOrigin::Unreadable(e))),
    }
}

/// Files named on the command line, or the newest file in the data directory.
fn resolve_files(args: &Args, config: &Config) -> Result<Vec<PathBuf>> {
    if !args.files.is_empty() {
        return Ok(args.files.clone());
    }

    let file_scanner = scanner::FileScanner::new(scanner::ScanConfig::from(&config.general));
    let newest = file_scanner.newest()?;
    info!("No files given, using newest: {}", newest.display());
    Ok(vec![newest])
}

/// Load every file and concatenate them in the given order.
fn load_tables(files: &[PathBuf], model: InstrumentModel, quiet: bool) -> Result<MeasurementTable> {
    let progress = if files.len() > 1 && !quiet {
        let pb = ProgressBar::new(files.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        Some(pb)
    } else {
        None
    };

    let mut tables = Vec::with_capacity(files.len());
    for file in files {
        info!("Loading file: {}", file.display());
        if let Some(ref pb) = progress {
            pb.set_message(file.display().to_string());
        }

        let table = MeasurementTable::from_path(file, model)
            .with_context(|| format!("Failed to load {}", file.display()))?;
        debug!("{}: {} records", file.display(), table.len());
        tables.push(table);

        if let Some(ref pb) = progress {
            pb.inc(1);
        }
    }

    if let Some(pb) = progress {
        pb.finish_and_clear();
    }

    Ok(MeasurementTable::concat(tables)?)
}
