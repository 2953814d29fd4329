//! Instrument schema registry.
//!
//! Each supported aethalometer model writes a fixed positional layout.
//! This module describes those layouts together with the unit and
//! wavelength metadata of the measurement channels.

use crate::error::AethError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The seven optical channels, shortest wavelength first.
pub const OPTICAL_CHANNELS: [&str; 7] = ["BC1", "BC2", "BC3", "BC4", "BC5", "BC6", "BC7"];

/// Channel used when the caller does not choose one (eBC at 880 nm).
pub const DEFAULT_CHANNEL: &str = "BC6";

/// Biomass-burning fraction, reported by the AE33 only.
pub const BIOMASS_CHANNEL: &str = "BB";

/// Names of the raw fields combined into the record timestamp.
pub const DATE_FIELD: &str = "Date";
pub const TIME_FIELD: &str = "Time";

#[rustfmt::skip]
const AE33_FIELDS: &[&str] = &[
    "Date", "Time", "Timebase",
    "RefCh1", "Sen1Ch1", "Sen2Ch1",
    "RefCh2", "Sen1Ch2", "Sen2Ch2",
    "RefCh3", "Sen1Ch3", "Sen2Ch3",
    "RefCh4", "Sen1Ch4", "Sen2Ch4",
    "RefCh5", "Sen1Ch5", "Sen2Ch5",
    "RefCh6", "Sen1Ch6", "Sen2Ch6",
    "RefCh7", "Sen1Ch7", "Sen2Ch7",
    "Flow1", "Flow2", "FlowC",
    "Pressure", "Temperature", "BB",
    "ContTemp", "SupplyTemp",
    "Status", "ContStatus", "DetectStatus", "LedStatus", "ValveStatus",
    "LedTemp",
    "BC11", "BC12", "BC1",
    "BC21", "BC22", "BC2",
    "BC31", "BC32", "BC3",
    "BC41", "BC42", "BC4",
    "BC51", "BC52", "BC5",
    "BC61", "BC62", "BC6",
    "BC71", "BC72", "BC7",
    "K1", "K2", "K3", "K4", "K5", "K6", "K7",
    "TapeAdvCount",
    "ID_com1", "ID_com2", "ID_com3",
];

#[rustfmt::skip]
const AE31_FIELDS: &[&str] = &[
    "Date", "Time",
    "BC1", "BC2", "BC3", "BC4", "BC5", "BC6", "BC7",
    "vflow",
    "Sample zero signal 1", "sensing beam signal 1", "reference zero signal 1",
    "reference beam signal 1", "fra 1", "optical attenuation 1",
    "Sample zero signal 2", "sensing beam signal 2", "reference zero signal 2",
    "reference beam signal 2", "fra 2", "optical attenuation 2",
    "Sample zero signal 3", "sensing beam signal 3", "reference zero signal 3",
    "reference beam signal 3", "fra 3", "optical attenuation 3",
    "Sample zero signal 4", "sensing beam signal 4", "reference zero signal 4",
    "reference beam signal 4", "fra 4", "optical attenuation 4",
    "Sample zero signal 5", "sensing beam signal 5", "reference zero signal 5",
    "reference beam signal 5", "fra 5", "optical attenuation 5",
    "Sample zero signal 6", "sensing beam signal 6", "reference zero signal 6",
    "reference beam signal 6", "fra 6", "optical attenuation 6",
    "Sample zero signal 7", "sensing beam signal 7", "reference zero signal 7",
    "reference beam signal 7", "fra 7", "optical attenuation 7",
    "massfl",
];

const AE33_SCHEMA: ChannelSchema = ChannelSchema {
    fields: AE33_FIELDS,
    separator: ' ',
    skip_rows: 8,
    time_suffix: "",
};

// AE31 writes HH:MM, so seconds are appended before parsing.
const AE31_SCHEMA: ChannelSchema = ChannelSchema {
    fields: AE31_FIELDS,
    separator: ',',
    skip_rows: 0,
    time_suffix: ":00",
};

/// Supported instrument models.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, clap::ValueEnum,
)]
pub enum InstrumentModel {
    /// Magee AE33 (space separated, 8 header lines)
    #[default]
    #[serde(rename = "AE33", alias = "ae33")]
    Ae33,
    /// Magee AE31 (comma separated, no header)
    #[serde(rename = "AE31", alias = "ae31")]
    Ae31,
}

impl fmt::Display for InstrumentModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstrumentModel::Ae33 => write!(f, "AE33"),
            InstrumentModel::Ae31 => write!(f, "AE31"),
        }
    }
}

impl FromStr for InstrumentModel {
    type Err = AethError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "AE33" => Ok(InstrumentModel::Ae33),
            "AE31" => Ok(InstrumentModel::Ae31),
            _ => Err(AethError::UnsupportedModel(s.to_string())),
        }
    }
}

impl InstrumentModel {
    /// Returns the raw file layout of this model.
    pub fn schema(&self) -> &'static ChannelSchema {
        match self {
            InstrumentModel::Ae33 => &AE33_SCHEMA,
            InstrumentModel::Ae31 => &AE31_SCHEMA,
        }
    }

    /// Channels averaged and reported when no explicit set is requested.
    pub fn default_channels(&self) -> Vec<String> {
        let mut channels: Vec<String> = OPTICAL_CHANNELS.iter().map(|c| c.to_string()).collect();
        if *self == InstrumentModel::Ae33 {
            channels.push(BIOMASS_CHANNEL.to_string());
        }
        channels
    }

    /// Normalises a user supplied channel name and checks it is selectable.
    ///
    /// Any wavelength channel is accepted; `BB` only for the AE33.
    pub fn validate_channel(&self, name: &str) -> Result<String, AethError> {
        let channel = name.trim().to_ascii_uppercase();
        let selectable = wavelength(&channel).is_some()
            || (*self == InstrumentModel::Ae33 && channel == BIOMASS_CHANNEL);

        if selectable {
            Ok(channel)
        } else {
            Err(AethError::UnknownChannel {
                channel: name.to_string(),
                model: self.to_string(),
            })
        }
    }
}

/// Positional layout of one model's raw data files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelSchema {
    /// Raw field names in file order.
    pub fields: &'static [&'static str],
    /// Field separator.
    pub separator: char,
    /// Leading non-data lines.
    pub skip_rows: usize,
    /// Literal appended to the time field before parsing.
    pub time_suffix: &'static str,
}

impl ChannelSchema {
    /// Number of fields every data line must carry.
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Position of a named field.
    pub fn position(&self, field: &str) -> Option<usize> {
        self.fields.iter().position(|f| *f == field)
    }

    /// Measurement channels: every field except the date and time parts.
    pub fn channels(&self) -> Vec<String> {
        self.fields
            .iter()
            .filter(|f| **f != DATE_FIELD && **f != TIME_FIELD)
            .map(|f| f.to_string())
            .collect()
    }
}

/// Physical unit of a channel, if it declares one.
pub fn unit(channel: &str) -> Option<&'static str> {
    let unit = match channel {
        "Timebase" => "seconds",
        "Flow1" | "Flow2" | "FlowC" => "cc/min",
        "Pressure" => "Pa",
        "Temperature" | "ContTemp" | "SupplyTemp" => "°C",
        "BB" => "%",
        "BC11" | "BC12" | "BC1" | "BC21" | "BC22" | "BC2" | "BC31" | "BC32" | "BC3" | "BC41"
        | "BC42" | "BC4" | "BC51" | "BC52" | "BC5" | "BC61" | "BC62" | "BC6" | "BC71"
        | "BC72" | "BC7" => "ng/m³",
        "vflow" | "massfl" => "lpm",
        _ => return None,
    };
    Some(unit)
}

/// Wavelength in nanometres of an optical channel.
pub fn wavelength(channel: &str) -> Option<u32> {
    match channel {
        "BC1" => Some(370),
        "BC2" => Some(470),
        "BC3" => Some(520),
        "BC4" => Some(590),
        "BC5" => Some(660),
        "BC6" => Some(880),
        "BC7" => Some(950),
        _ => None,
    }
}

/// Descriptive label of what a channel measures.
pub fn channel_label(channel: &str) -> &'static str {
    if wavelength(channel).is_some() {
        "Equivalent Black Carbon"
    } else {
        "Biomass Burning Fraction"
    }
}
