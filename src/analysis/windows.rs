//! Fixed-cadence averaging windows.
//!
//! Window starts are anchored on the observed time span of a table,
//! rounded to the nearest cadence unit, and advanced by a stride of
//! `step` units. Each window is one alignment unit wide whatever the
//! stride, so a stride larger than one leaves gaps between windows.

use crate::error::{AethError, AethResult};
use crate::ingest::MeasurementTable;
use crate::models::Window;
use chrono::{Duration, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info};

/// Granularity of generated windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Cadence {
    Hourly,
    Minutely,
    Secondly,
}

impl fmt::Display for Cadence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cadence::Hourly => write!(f, "hourly"),
            Cadence::Minutely => write!(f, "minutely"),
            Cadence::Secondly => write!(f, "secondly"),
        }
    }
}

impl FromStr for Cadence {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hourly" => Ok(Cadence::Hourly),
            "minutely" => Ok(Cadence::Minutely),
            "secondly" => Ok(Cadence::Secondly),
            other => Err(format!("unknown cadence '{}'", other)),
        }
    }
}

impl Cadence {
    /// Unit the span bounds are rounded to. Also the window width.
    ///
    /// The secondly cadence rounds to, and averages over, whole minutes.
    pub fn width(&self) -> Duration {
        match self {
            Cadence::Hourly => Duration::hours(1),
            Cadence::Minutely | Cadence::Secondly => Duration::minutes(1),
        }
    }

    /// Distance between consecutive window starts for `step == 1`.
    pub fn stride_unit(&self) -> Duration {
        match self {
            Cadence::Hourly => Duration::hours(1),
            Cadence::Minutely => Duration::minutes(1),
            Cadence::Secondly => Duration::seconds(1),
        }
    }

    /// Stride multiplier used when none is configured.
    pub fn default_step(&self) -> u32 {
        match self {
            Cadence::Secondly => 10,
            Cadence::Hourly | Cadence::Minutely => 1,
        }
    }

    /// Round a timestamp to the nearest alignment unit.
    pub fn align(&self, ts: NaiveDateTime) -> NaiveDateTime {
        match self {
            Cadence::Hourly => round_to_hour(ts),
            Cadence::Minutely | Cadence::Secondly => round_to_minute(ts),
        }
    }
}

/// Nearest hour: minutes `>= 30` round up.
pub fn round_to_hour(ts: NaiveDateTime) -> NaiveDateTime {
    let floor = ts
        .with_nanosecond(0)
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_minute(0))
        .unwrap_or(ts);
    floor + Duration::hours(i64::from(ts.minute() / 30))
}

/// Nearest minute: seconds `>= 30` round up.
pub fn round_to_minute(ts: NaiveDateTime) -> NaiveDateTime {
    let floor = ts
        .with_nanosecond(0)
        .and_then(|t| t.with_second(0))
        .unwrap_or(ts);
    floor + Duration::minutes(i64::from(ts.second() / 30))
}

/// Generate windows covering the table's observed span.
///
/// The first start is the rounded earliest timestamp; starts advance by
/// `step` stride units while they do not pass the rounded latest
/// timestamp minus one width. A span shorter than one unit yields no
/// windows. A `step` of zero is treated as one.
pub fn generate_windows(
    table: &MeasurementTable,
    cadence: Cadence,
    step: u32,
) -> AethResult<Vec<Window>> {
    let (first, last) = table.time_span().ok_or(AethError::EmptyInput)?;

    let tmin = cadence.align(first);
    let tmax = cadence.align(last) - cadence.width();
    let stride =
        Duration::seconds(cadence.stride_unit().num_seconds() * i64::from(step.max(1)));
    debug!("Window anchors: {} .. {} (stride {})", tmin, tmax, stride);

    let mut windows = Vec::new();
    let mut start = tmin;
    while start <= tmax {
        windows.push(Window::new(start, start + cadence.width()));
        match start.checked_add_signed(stride) {
            Some(next) => start = next,
            None => break,
        }
    }

    info!("Generated {} {} windows (step {})", windows.len(), cadence, step);
    Ok(windows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::InstrumentModel;
    use chrono::NaiveDate;
    use std::io::Cursor;

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2019, 5, 14)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    /// AE31 table with one row per given `HH:MM` time.
    fn table_at(times: &[&str]) -> MeasurementTable {
        let text: Vec<String> = times
            .iter()
            .map(|t| {
                let mut fields = vec!["14-may-19".to_string(), t.to_string()];
                fields.extend((0..51).map(|k| k.to_string()));
                fields.join(",")
            })
            .collect();
        MeasurementTable::load(Cursor::new(text.join("\n")), InstrumentModel::Ae31).unwrap()
    }

    #[test]
    fn test_round_to_hour_is_nearest_not_floor() {
        assert_eq!(round_to_hour(at(10, 31, 0)), at(11, 0, 0));
        assert_eq!(round_to_hour(at(10, 30, 0)), at(11, 0, 0));
        assert_eq!(round_to_hour(at(10, 29, 0)), at(10, 0, 0));
        assert_eq!(round_to_hour(at(10, 29, 59)), at(10, 0, 0));
        assert_eq!(round_to_hour(at(23, 45, 0)), at(0, 0, 0) + Duration::days(1));
    }

    #[test]
    fn test_round_to_minute() {
        assert_eq!(round_to_minute(at(10, 5, 30)), at(10, 6, 0));
        assert_eq!(round_to_minute(at(10, 5, 29)), at(10, 5, 0));
        assert_eq!(round_to_minute(at(10, 59, 45)), at(11, 0, 0));
    }

    #[test]
    fn test_empty_table_is_an_error() {
        let table = MeasurementTable::empty(InstrumentModel::Ae33);
        assert!(matches!(
            generate_windows(&table, Cadence::Hourly, 1),
            Err(AethError::EmptyInput)
        ));
    }

    #[test]
    fn test_hourly_windows_are_contiguous() {
        let table = table_at(&["00:10", "05:50"]);
        let windows = generate_windows(&table, Cadence::Hourly, 1).unwrap();

        // 00:00 .. 05:00 (rounded 06:00 minus one hour)
        assert_eq!(windows.len(), 6);
        assert_eq!(windows[0], Window::new(at(0, 0, 0), at(1, 0, 0)));
        assert_eq!(windows[5], Window::new(at(5, 0, 0), at(6, 0, 0)));
        for pair in windows.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
        }
    }

    #[test]
    fn test_step_sets_stride_not_width() {
        let table = table_at(&["00:00", "09:00"]);
        let windows = generate_windows(&table, Cadence::Hourly, 4).unwrap();

        let starts: Vec<_> = windows.iter().map(|w| w.start).collect();
        assert_eq!(starts, vec![at(0, 0, 0), at(4, 0, 0), at(8, 0, 0)]);
        for w in &windows {
            assert_eq!(w.end - w.start, Duration::hours(1));
        }
    }

    #[test]
    fn test_huge_step_gives_single_window() {
        let table = table_at(&["00:00", "09:00"]);

        for step in [2_147_483_648, u32::MAX] {
            let windows = generate_windows(&table, Cadence::Hourly, step).unwrap();
            assert_eq!(windows, vec![Window::new(at(0, 0, 0), at(1, 0, 0))]);
        }

        let windows = generate_windows(&table, Cadence::Secondly, u32::MAX).unwrap();
        assert_eq!(windows.len(), 1);
    }

    #[test]
    fn test_short_span_gives_no_windows() {
        let table = table_at(&["10:05", "10:20"]);
        assert!(generate_windows(&table, Cadence::Hourly, 1).unwrap().is_empty());
    }

    #[test]
    fn test_minutely_windows() {
        let table = table_at(&["10:00", "10:05"]);
        let windows = generate_windows(&table, Cadence::Minutely, 2).unwrap();

        let starts: Vec<_> = windows.iter().map(|w| w.start).collect();
        assert_eq!(starts, vec![at(10, 0, 0), at(10, 2, 0), at(10, 4, 0)]);
        assert_eq!(windows[0].end, at(10, 1, 0));
    }

    #[test]
    fn test_secondly_windows_are_one_minute_wide() {
        let table = table_at(&["10:00", "10:02"]);
        let windows = generate_windows(&table, Cadence::Secondly, 30).unwrap();

        // Starts every 30 s from 10:00:00 up to 10:01:00 inclusive.
        assert_eq!(windows.len(), 3);
        assert_eq!(windows[1], Window::new(at(10, 0, 30), at(10, 1, 30)));
        assert_eq!(windows[2].start, at(10, 1, 0));
    }

    #[test]
    fn test_cadence_parsing_and_defaults() {
        assert_eq!("HOURLY".parse::<Cadence>().unwrap(), Cadence::Hourly);
        assert!("weekly".parse::<Cadence>().is_err());
        assert_eq!(Cadence::Secondly.default_step(), 10);
        assert_eq!(Cadence::Minutely.default_step(), 1);
    }
}
