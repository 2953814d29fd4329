//! Data ingestion.
//!
//! Raw instrument files are parsed into a [`MeasurementTable`]; interval
//! files are parsed into a list of [`crate::models::Window`]s.

pub mod intervals;
pub mod table;
pub mod timestamp;

pub use intervals::*;
pub use table::*;
pub use timestamp::parse_timestamp;

use csv::StringRecord;

/// 1-based line of `record` within `text`.
///
/// The csv reader skips empty lines and may report a position in front of
/// them, so line breaks at that position are stepped over first.
pub(crate) fn record_line(text: &str, record: &StringRecord) -> usize {
    let bytes = text.as_bytes();
    let offset = record
        .position()
        .map_or(0, |p| p.byte() as usize)
        .min(bytes.len());
    let start = bytes[offset..]
        .iter()
        .position(|&b| b != b'\n' && b != b'\r')
        .map_or(bytes.len(), |i| offset + i);
    bytes[..start].iter().filter(|&&b| b == b'\n').count() + 1
}
