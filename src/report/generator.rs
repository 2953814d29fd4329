//! Output table generation.
//!
//! Aggregated windows and raw records are both rendered through
//! [`OutputTable`]: one row per window end (or record timestamp), a units
//! row under the header in CSV, and a self-describing document in JSON.

use crate::analysis::SeriesSummary;
use crate::models::{AggregateTable, Frame, TIMESTAMP_FORMAT};
use crate::schema::{self, InstrumentModel};
use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;

/// One output row.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputRow {
    /// Window end, or the record timestamp for raw output.
    pub key: NaiveDateTime,
    /// Window start; absent for raw output.
    pub start: Option<NaiveDateTime>,
    pub values: Vec<Option<f64>>,
}

/// A table ready for rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputTable {
    /// Header of the key column.
    pub key_label: &'static str,
    /// Whether rows carry a window start column.
    pub windowed: bool,
    pub channels: Vec<String>,
    pub rows: Vec<OutputRow>,
    /// Fixed number of fractional digits, or shortest form when `None`.
    pub precision: Option<usize>,
}

impl OutputTable {
    /// Averages keyed by window end.
    pub fn from_aggregate(table: &AggregateTable, decimals: u32) -> Self {
        Self {
            key_label: "end",
            windowed: true,
            channels: table.channels.clone(),
            rows: table
                .rows
                .iter()
                .map(|r| OutputRow {
                    key: r.end,
                    start: Some(r.start),
                    values: r.values.clone(),
                })
                .collect(),
            precision: Some(decimals as usize),
        }
    }

    /// Unaveraged records keyed by their timestamp.
    pub fn from_frame(frame: &Frame) -> Self {
        Self {
            key_label: "Datetime",
            windowed: false,
            channels: frame.channels.clone(),
            rows: frame
                .rows
                .iter()
                .map(|r| OutputRow {
                    key: r.timestamp,
                    start: None,
                    values: r.values.clone(),
                })
                .collect(),
            precision: None,
        }
    }

    fn format_value(&self, value: Option<f64>) -> String {
        match (value, self.precision) {
            (Some(v), Some(p)) => format!("{:.*}", p, v),
            (Some(v), None) => v.to_string(),
            (None, _) => String::new(),
        }
    }
}

/// Write the table as CSV: header, units row, then data rows.
///
/// Channels without a unit leave their units cell empty so columns stay
/// aligned.
pub fn write_csv<W: Write>(table: &OutputTable, writer: W) -> Result<()> {
    let mut out = csv::Writer::from_writer(writer);

    let mut header = vec![table.key_label.to_string()];
    let mut units = vec!["-".to_string()];
    if table.windowed {
        header.push("start".to_string());
        units.push("-".to_string());
    }
    for channel in &table.channels {
        header.push(channel.clone());
        units.push(schema::unit(channel).unwrap_or("").to_string());
    }
    out.write_record(&header).context("Failed to write CSV header")?;
    out.write_record(&units).context("Failed to write CSV units")?;

    for row in &table.rows {
        let mut record = vec![row.key.format(TIMESTAMP_FORMAT).to_string()];
        if table.windowed {
            record.push(
                row.start
                    .map(|s| s.format(TIMESTAMP_FORMAT).to_string())
                    .unwrap_or_default(),
            );
        }
        record.extend(row.values.iter().map(|v| table.format_value(*v)));
        out.write_record(&record).context("Failed to write CSV row")?;
    }

    out.flush().context("Failed to flush CSV output")?;
    Ok(())
}

/// Render the table as a CSV string.
pub fn generate_csv(table: &OutputTable) -> Result<String> {
    let mut buffer = Vec::new();
    write_csv(table, &mut buffer)?;
    String::from_utf8(buffer).context("CSV output is not UTF-8")
}

/// Metadata about a processing run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// Instrument model of the input files.
    pub model: InstrumentModel,
    /// Input files in load order.
    pub files: Vec<String>,
    /// `raw`, a cadence name, or `custom`.
    pub averaging: String,
    /// Stride multiplier for fixed cadences.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval: Option<u32>,
    pub decimals: u32,
    /// Number of records loaded.
    pub records: usize,
    pub generated_at: DateTime<Utc>,
}

/// A row of the JSON document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRow {
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
    pub values: BTreeMap<String, Option<f64>>,
}

/// Complete JSON output document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub metadata: ReportMetadata,
    /// Unit of each channel that declares one.
    pub units: BTreeMap<String, String>,
    /// Statistics of the selected channel.
    pub summary: SeriesSummary,
    pub rows: Vec<JsonRow>,
}

impl Report {
    pub fn new(metadata: ReportMetadata, table: &OutputTable, summary: SeriesSummary) -> Self {
        let units = table
            .channels
            .iter()
            .filter_map(|c| schema::unit(c).map(|u| (c.clone(), u.to_string())))
            .collect();

        let rows = table
            .rows
            .iter()
            .map(|row| JsonRow {
                key: row.key.format(TIMESTAMP_FORMAT).to_string(),
                start: row.start.map(|s| s.format(TIMESTAMP_FORMAT).to_string()),
                values: table
                    .channels
                    .iter()
                    .cloned()
                    .zip(row.values.iter().copied())
                    .collect(),
            })
            .collect();

        Self {
            metadata,
            units,
            summary,
            rows,
        }
    }
}

/// Generate a JSON report.
pub fn generate_json_report(report: &Report) -> Result<String> {
    serde_json::to_string_pretty(report).context("Failed to serialize report to JSON")
}

/// Human-readable statistics block for the selected channel.
pub fn generate_summary_text(model: InstrumentModel, summary: &SeriesSummary) -> String {
    let mut lines = Vec::new();

    let mut title = format!("Aethalometer Model {}", model);
    if let Some(nm) = schema::wavelength(&summary.channel) {
        title.push_str(&format!(" (λ={}nm)", nm));
    }
    lines.push(title);

    let unit = schema::unit(&summary.channel)
        .map(|u| format!(" ({})", u))
        .unwrap_or_default();
    lines.push(format!(
        "{} [{}]{}",
        schema::channel_label(&summary.channel),
        summary.channel,
        unit
    ));

    let fmt = |v: Option<f64>, p: usize| match v {
        Some(v) => format!("{:.*}", p, v),
        None => "n/a".to_string(),
    };
    lines.push(format!(
        "n={}  μ={}  σ={}",
        summary.count,
        fmt(summary.mean, 2),
        fmt(summary.std_dev, 3)
    ));

    lines.join("\n")
}
