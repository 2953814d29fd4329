//! Canonical measurement table.
//!
//! A [`MeasurementTable`] holds the records of one or more instrument
//! files in load order. Rows are never sorted or deduplicated; range
//! queries scan the whole table so that out-of-order concatenation still
//! yields every matching row.

use crate::error::{AethError, AethResult};
use crate::ingest::record_line;
use crate::ingest::timestamp::parse_timestamp;
use crate::models::{Frame, Record, Window};
use crate::schema::{ChannelSchema, InstrumentModel, DATE_FIELD, TIME_FIELD};
use chrono::NaiveDateTime;
use csv::StringRecord;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use tracing::debug;

/// Anything that can slice itself by a closed time range.
///
/// The channel set of the returned frame is decided by the implementor.
pub trait SubsetSource {
    /// Rows with `start <= timestamp <= end`, in table order.
    fn subset(&self, start: NaiveDateTime, end: NaiveDateTime) -> Frame;
}

/// Datetime-indexed measurements of one instrument model.
#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementTable {
    model: InstrumentModel,
    channels: Vec<String>,
    records: Vec<Record>,
}

impl MeasurementTable {
    /// Create an empty table for a model.
    pub fn empty(model: InstrumentModel) -> Self {
        Self {
            model,
            channels: model.schema().channels(),
            records: Vec::new(),
        }
    }

    /// Parse a raw instrument file.
    ///
    /// Header lines are skipped per the model's schema and blank lines are
    /// ignored. Fields are read with the schema's separator and `"` quoting,
    /// so a quoted field may contain the separator. The first line whose
    /// field count differs from the schema aborts the load with
    /// [`AethError::MalformedRecord`].
    pub fn load<R: BufRead>(mut reader: R, model: InstrumentModel) -> AethResult<Self> {
        let schema = model.schema();
        let date_idx = schema.position(DATE_FIELD).unwrap_or(0);
        let time_idx = schema.position(TIME_FIELD).unwrap_or(1);

        let mut skipped = String::new();
        for _ in 0..schema.skip_rows {
            skipped.clear();
            if reader.read_line(&mut skipped)? == 0 {
                break;
            }
        }

        let mut text = String::new();
        reader.read_to_string(&mut text)?;

        let mut rows = csv::ReaderBuilder::new()
            .delimiter(schema.separator as u8)
            .has_headers(false)
            .flexible(true)
            .from_reader(text.as_bytes());

        let mut table = Self::empty(model);

        for result in rows.records() {
            let record = result?;
            let line_no = record_line(&text, &record) + schema.skip_rows;

            if record.iter().all(|f| f.trim().is_empty()) {
                continue;
            }

            let fields = record_fields(&record, schema);
            if fields.len() != schema.field_count() {
                return Err(AethError::MalformedRecord {
                    line: line_no,
                    expected: schema.field_count(),
                    found: fields.len(),
                });
            }

            let stamp = format!("{} {}{}", fields[date_idx], fields[time_idx], schema.time_suffix);
            let timestamp = parse_timestamp(&stamp).ok_or_else(|| AethError::InvalidTimestamp {
                line: line_no,
                value: stamp.clone(),
            })?;

            let values = fields
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != date_idx && *i != time_idx)
                .map(|(_, field)| parse_value(field))
                .collect();

            table.records.push(Record { timestamp, values });
        }

        debug!("Parsed {} {} records", table.records.len(), model);
        Ok(table)
    }

    /// Open and parse a raw instrument file from disk.
    pub fn from_path(path: &Path, model: InstrumentModel) -> AethResult<Self> {
        let file = File::open(path)?;
        Self::load(BufReader::new(file), model)
    }

    /// Append tables in the given order. Rows are neither sorted nor
    /// deduplicated. An empty input gives an empty AE33 table.
    pub fn concat<I>(tables: I) -> AethResult<Self>
    where
        I: IntoIterator<Item = MeasurementTable>,
    {
        let mut tables = tables.into_iter();
        let mut merged = match tables.next() {
            Some(first) => first,
            None => return Ok(Self::empty(InstrumentModel::default())),
        };

        for table in tables {
            if table.model != merged.model {
                return Err(AethError::ModelMismatch {
                    expected: merged.model.to_string(),
                    found: table.model.to_string(),
                });
            }
            merged.records.extend(table.records);
        }

        Ok(merged)
    }

    pub fn model(&self) -> InstrumentModel {
        self.model
    }

    pub fn channels(&self) -> &[String] {
        &self.channels
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Earliest and latest timestamp, or `None` for an empty table.
    pub fn time_span(&self) -> Option<(NaiveDateTime, NaiveDateTime)> {
        let first = self.records.first()?.timestamp;
        Some(self.records.iter().fold((first, first), |(lo, hi), r| {
            (lo.min(r.timestamp), hi.max(r.timestamp))
        }))
    }

    /// All values of one channel in table order.
    pub fn series(&self, channel: &str) -> Vec<Option<f64>> {
        match self.channel_index(channel) {
            Some(idx) => self.records.iter().map(|r| r.values[idx]).collect(),
            None => vec![None; self.records.len()],
        }
    }

    /// Rows in the closed range `[start, end]` restricted to `channels`.
    ///
    /// Channels the table does not carry come back as empty columns.
    pub fn subset_channels(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
        channels: &[String],
    ) -> Frame {
        let window = Window::new(start, end);
        self.project(channels, |ts| window.contains(ts))
    }

    /// Every row restricted to `channels`.
    pub fn frame(&self, channels: &[String]) -> Frame {
        self.project(channels, |_| true)
    }

    /// View of this table that slices to an explicit channel set.
    pub fn select(&self, channels: &[String]) -> ChannelSelection<'_> {
        ChannelSelection {
            table: self,
            channels: channels.to_vec(),
        }
    }

    fn channel_index(&self, channel: &str) -> Option<usize> {
        self.channels.iter().position(|c| c == channel)
    }

    fn project<F>(&self, channels: &[String], keep: F) -> Frame
    where
        F: Fn(NaiveDateTime) -> bool,
    {
        let positions: Vec<Option<usize>> =
            channels.iter().map(|c| self.channel_index(c)).collect();

        let rows = self
            .records
            .iter()
            .filter(|r| keep(r.timestamp))
            .map(|r| Record {
                timestamp: r.timestamp,
                values: positions
                    .iter()
                    .map(|pos| pos.and_then(|i| r.values[i]))
                    .collect(),
            })
            .collect();

        Frame {
            channels: channels.to_vec(),
            rows,
        }
    }
}

impl SubsetSource for MeasurementTable {
    /// Slices to the model's default channel set.
    fn subset(&self, start: NaiveDateTime, end: NaiveDateTime) -> Frame {
        self.subset_channels(start, end, &self.model.default_channels())
    }
}

/// A table paired with the channels callers want back.
#[derive(Debug, Clone)]
pub struct ChannelSelection<'a> {
    table: &'a MeasurementTable,
    channels: Vec<String>,
}

impl SubsetSource for ChannelSelection<'_> {
    fn subset(&self, start: NaiveDateTime, end: NaiveDateTime) -> Frame {
        self.table.subset_channels(start, end, &self.channels)
    }
}

/// Fields of one raw record.
///
/// A single empty trailing field (the line ended in a separator) is dropped.
fn record_fields<'a>(record: &'a StringRecord, schema: &ChannelSchema) -> Vec<&'a str> {
    let mut fields: Vec<&str> = record.iter().collect();
    if fields.len() == schema.field_count() + 1 && fields.last().is_some_and(|f| f.is_empty()) {
        fields.pop();
    }
    fields
}

/// Numeric cell value; anything unparseable or NaN is missing.
fn parse_value(field: &str) -> Option<f64> {
    field.trim().parse::<f64>().ok().filter(|v| !v.is_nan())
}
