//! Externally supplied averaging intervals.
//!
//! Interval files are delimited text with a header row naming at least a
//! `start` and an `end` column. Other columns are ignored. Windows come
//! back in file order without any validation: reversed, overlapping or
//! duplicate windows are passed through untouched.

use crate::error::{AethError, AethResult};
use crate::ingest::record_line;
use crate::ingest::timestamp::parse_timestamp;
use crate::models::Window;
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// Parse interval windows from CSV text.
pub fn load_windows<R: Read>(mut reader: R) -> AethResult<Vec<Window>> {
    let mut text = String::new();
    reader.read_to_string(&mut text)?;

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers = reader.headers()?.clone();
    let find = |name: &str| {
        headers
            .iter()
            .position(|h| h.eq_ignore_ascii_case(name))
            .ok_or_else(|| AethError::MissingColumn(name.to_string()))
    };
    let start_idx = find("start")?;
    let end_idx = find("end")?;

    let mut windows = Vec::new();
    for result in reader.records() {
        let record = result?;
        let line = record_line(&text, &record);

        let cell = |idx: usize| -> AethResult<_> {
            let value = record.get(idx).unwrap_or("");
            parse_timestamp(value).ok_or_else(|| AethError::InvalidTimestamp {
                line,
                value: value.to_string(),
            })
        };

        windows.push(Window::new(cell(start_idx)?, cell(end_idx)?));
    }

    debug!("Loaded {} custom intervals", windows.len());
    Ok(windows)
}

/// Parse interval windows from a file.
pub fn load_windows_from_path(path: &Path) -> AethResult<Vec<Window>> {
    let file = std::fs::File::open(path)?;
    load_windows(file)
}
