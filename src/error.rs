//! Domain errors.
//!
//! Ingestion, windowing and aggregation report failures through
//! [`AethError`]; the command-line layer wraps them in `anyhow`.

use thiserror::Error;

/// Errors raised while loading instrument data or building windows.
#[derive(Debug, Error)]
pub enum AethError {
    /// The instrument model identifier is not one of the supported models.
    #[error("Aethalometer model {0} unknown")]
    UnsupportedModel(String),

    /// A raw data line does not have the field count of its schema.
    #[error("line {line}: expected {expected} fields, found {found}")]
    MalformedRecord {
        line: usize,
        expected: usize,
        found: usize,
    },

    /// A date/time cell could not be parsed.
    #[error("line {line}: cannot parse timestamp '{value}'")]
    InvalidTimestamp { line: usize, value: String },

    /// There is no timestamp to anchor fixed-cadence windows on.
    #[error("no valid timestamps in input")]
    EmptyInput,

    /// The interval file lacks a required column.
    #[error("interval file is missing the '{0}' column")]
    MissingColumn(String),

    /// The selected channel is not available for the instrument model.
    #[error("channel {channel} is not available for model {model}")]
    UnknownChannel { channel: String, model: String },

    /// Tables from different instrument models cannot be concatenated.
    #[error("cannot concatenate {found} data onto {expected} data")]
    ModelMismatch { expected: String, found: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),
}

/// Convenience alias used throughout the data modules.
pub type AethResult<T> = std::result::Result<T, AethError>;
