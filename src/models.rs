//! Data models shared by the ingestion, analysis and report layers.
//!
//! This module contains the row and window types that flow from a
//! loaded measurement table to the aggregated output.

use chrono::NaiveDateTime;

/// Timestamp layout used for all textual output.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One parsed data line of an instrument file.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// Combined `Date` + `Time` of the line.
    pub timestamp: NaiveDateTime,
    /// Channel values aligned with the owning table's channel list.
    /// `None` marks a value that was missing or not numeric.
    pub values: Vec<Option<f64>>,
}

/// A time range `[start, end]` to average over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl Window {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self { start, end }
    }

    /// Whether `ts` lies in the closed range.
    pub fn contains(&self, ts: NaiveDateTime) -> bool {
        self.start <= ts && ts <= self.end
    }
}

/// Rows of a table slice restricted to a set of channels.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
    /// Column names, in request order.
    pub channels: Vec<String>,
    /// Selected rows, in table order.
    pub rows: Vec<Record>,
}

impl Frame {
    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the slice holds no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Present values of one column.
    pub fn column(&self, index: usize) -> impl Iterator<Item = f64> + '_ {
        self.rows
            .iter()
            .filter_map(move |row| row.values.get(index).copied().flatten())
    }
}

/// The averaged values of one window, keyed by `end`.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateRow {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    /// Means aligned with [`AggregateTable::channels`]; `None` when the
    /// window had no observation for that channel.
    pub values: Vec<Option<f64>>,
}

/// Aggregated output, one row per input window in window order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregateTable {
    pub channels: Vec<String>,
    pub rows: Vec<AggregateRow>,
}

impl AggregateTable {
    /// Position of a channel column.
    pub fn channel_index(&self, channel: &str) -> Option<usize> {
        self.channels.iter().position(|c| c == channel)
    }

    /// All values of one channel in row order (missing rows included).
    pub fn series(&self, channel: &str) -> Vec<Option<f64>> {
        match self.channel_index(channel) {
            Some(idx) => self.rows.iter().map(|r| r.values[idx]).collect(),
            None => vec![None; self.rows.len()],
        }
    }
}
