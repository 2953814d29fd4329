//! Per-window channel averages and series statistics.
//!
//! This module turns a list of windows into an [`AggregateTable`]: one row
//! per window, in window order, keyed by the window end. Each requested
//! channel gets the mean of the values present in the window, rounded
//! half-to-even. A channel with no values in a window is left empty.

use crate::ingest::{MeasurementTable, SubsetSource};
use crate::models::{AggregateRow, AggregateTable, Frame, Window};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Average `channels` over every window of `source`.
///
/// Channels the source does not return are reported as missing.
pub fn aggregate<S>(
    source: &S,
    windows: &[Window],
    channels: &[String],
    decimals: u32,
) -> AggregateTable
where
    S: SubsetSource + ?Sized,
{
    let rows = windows
        .iter()
        .map(|window| {
            let frame = source.subset(window.start, window.end);
            debug!(
                "Window {} .. {}: {} rows",
                window.start,
                window.end,
                frame.len()
            );
            AggregateRow {
                start: window.start,
                end: window.end,
                values: channels
                    .iter()
                    .map(|c| channel_mean(&frame, c).map(|m| round_half_even(m, decimals)))
                    .collect(),
            }
        })
        .collect();

    AggregateTable {
        channels: channels.to_vec(),
        rows,
    }
}

/// Average an explicit channel set of a table.
pub fn aggregate_table(
    table: &MeasurementTable,
    windows: &[Window],
    channels: &[String],
    decimals: u32,
) -> AggregateTable {
    aggregate(&table.select(channels), windows, channels, decimals)
}

/// Arithmetic mean of the present values, `None` if there are none.
pub fn mean<I>(values: I) -> Option<f64>
where
    I: IntoIterator<Item = f64>,
{
    let (sum, count) = values
        .into_iter()
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    (count > 0).then(|| sum / count as f64)
}

fn channel_mean(frame: &Frame, channel: &str) -> Option<f64> {
    let idx = frame.channels.iter().position(|c| c == channel)?;
    mean(frame.column(idx))
}

/// Round to `decimals` fractional digits, ties to even.
pub fn round_half_even(value: f64, decimals: u32) -> f64 {
    if !value.is_finite() {
        return value;
    }
    let factor = 10f64.powi(decimals as i32);
    let scaled = value * factor;
    if !scaled.is_finite() {
        return value;
    }
    scaled.round_ties_even() / factor
}

/// Descriptive statistics of one channel's series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesSummary {
    pub channel: String,
    /// Number of present values.
    pub count: usize,
    pub mean: Option<f64>,
    /// Sample standard deviation (n - 1).
    pub std_dev: Option<f64>,
}

impl SeriesSummary {
    /// Summarise the present values of a series.
    pub fn of(channel: &str, values: &[Option<f64>]) -> Self {
        let present: Vec<f64> = values.iter().flatten().copied().collect();
        let mean = mean(present.iter().copied());

        let std_dev = match mean {
            Some(mu) if present.len() > 1 => {
                let ss: f64 = present.iter().map(|v| (v - mu).powi(2)).sum();
                Some((ss / (present.len() - 1) as f64).sqrt())
            }
            _ => None,
        };

        Self {
            channel: channel.to_string(),
            count: present.len(),
            mean,
            std_dev,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::InstrumentModel;
    use chrono::{Duration, NaiveDate, NaiveDateTime};
    use std::io::Cursor;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2019, 5, 14)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn channels(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    /// AE31 table from `(HH:MM, BC1, BC6)` rows.
    fn table(rows: &[(&str, &str, &str)]) -> MeasurementTable {
        let lines: Vec<String> = rows
            .iter()
            .map(|(time, bc1, bc6)| {
                let mut fields = vec!["14-may-19".to_string(), time.to_string()];
                for k in 0..51 {
                    fields.push(match k {
                        0 => bc1.to_string(),
                        5 => bc6.to_string(),
                        _ => k.to_string(),
                    });
                }
                fields.join(",")
            })
            .collect();
        MeasurementTable::load(Cursor::new(lines.join("\n")), InstrumentModel::Ae31).unwrap()
    }

    #[test]
    fn test_mean_ignores_missing_values() {
        let t = table(&[("10:00", "1", "10"), ("10:01", "1", "NaN"), ("10:02", "1", "20")]);
        let result = aggregate_table(&t, &[Window::new(at(10, 0), at(10, 2))], &channels(&["BC6"]), 0);
        assert_eq!(result.rows[0].values, vec![Some(15.0)]);
    }

    #[test]
    fn test_all_missing_gives_none() {
        let t = table(&[("10:00", "1", "NaN"), ("10:01", "1", "x")]);
        let result = aggregate_table(&t, &[Window::new(at(10, 0), at(10, 1))], &channels(&["BC6"]), 0);
        assert_eq!(result.rows[0].values, vec![None]);
    }

    #[test]
    fn test_round_half_even() {
        assert_eq!(round_half_even(0.5, 0), 0.0);
        assert_eq!(round_half_even(1.5, 0), 2.0);
        assert_eq!(round_half_even(2.5, 0), 2.0);
        assert_eq!(round_half_even(-2.5, 0), -2.0);
        assert_eq!(round_half_even(0.125, 2), 0.12);
        assert_eq!(round_half_even(0.375, 2), 0.38);
        assert_eq!(round_half_even(1234.4, 0), 1234.0);
        assert!(round_half_even(f64::INFINITY, 2).is_infinite());
    }

    #[test]
    fn test_mean_is_rounded_after_averaging() {
        // The raw mean is 1.0099999999999998.
        let t = table(&[("10:00", "1.005", "0"), ("10:01", "1.015", "0")]);
        let result = aggregate_table(&t, &[Window::new(at(10, 0), at(10, 1))], &channels(&["BC1"]), 2);
        assert_eq!(result.rows[0].values, vec![Some(1.01)]);
    }

    #[test]
    fn test_boundary_rows_belong_to_both_windows() {
        let t = table(&[("10:00", "1", "10"), ("11:00", "1", "30"), ("12:00", "1", "50")]);
        let windows = [Window::new(at(10, 0), at(11, 0)), Window::new(at(11, 0), at(12, 0))];
        let result = aggregate_table(&t, &windows, &channels(&["BC6"]), 0);

        assert_eq!(result.series("BC6"), vec![Some(20.0), Some(40.0)]);
    }

    #[test]
    fn test_overlapping_and_reversed_windows() {
        let t = table(&[("10:00", "1", "10"), ("10:30", "1", "20"), ("11:00", "1", "30")]);
        let windows = [
            Window::new(at(10, 0), at(11, 0)),
            Window::new(at(10, 30), at(11, 0)),
            Window::new(at(11, 0), at(10, 0)),
        ];
        let result = aggregate_table(&t, &windows, &channels(&["BC6"]), 0);

        assert_eq!(result.rows.len(), 3);
        assert_eq!(result.series("BC6"), vec![Some(20.0), Some(25.0), None]);
        assert_eq!(result.rows[2].end, at(10, 0));
    }

    #[test]
    fn test_empty_table_gives_null_rows() {
        let empty = MeasurementTable::empty(InstrumentModel::Ae31);
        let windows = [Window::new(at(10, 0), at(11, 0)), Window::new(at(11, 0), at(12, 0))];
        let result = aggregate_table(&empty, &windows, &channels(&["BC1", "BC6"]), 0);

        assert_eq!(result.rows.len(), 2);
        assert!(result.rows.iter().all(|r| r.values == vec![None, None]));
    }

    #[test]
    fn test_table_source_uses_default_channels() {
        let t = table(&[("10:00", "4", "10"), ("10:01", "6", "20")]);
        let result = aggregate(
            &t,
            &[Window::new(at(10, 0), at(10, 1))],
            &channels(&["BC1", "Flow1", "BC6"]),
            1,
        );
        // Flow1 is not part of the default AE31 set.
        assert_eq!(result.rows[0].values, vec![Some(5.0), None, Some(15.0)]);
    }

    #[test]
    fn test_full_day_hourly() {
        use crate::analysis::{generate_windows, Cadence};

        // Every 5 minutes from 00:00 to 23:55; BC1 = hour, BC6 = minute.
        let rows: Vec<(String, String, String)> = (0..24 * 12)
            .map(|i| {
                let (h, m) = (i / 12, (i % 12) * 5);
                (format!("{:02}:{:02}", h, m), h.to_string(), m.to_string())
            })
            .collect();
        let borrowed: Vec<(&str, &str, &str)> = rows
            .iter()
            .map(|(t, a, b)| (t.as_str(), a.as_str(), b.as_str()))
            .collect();
        let t = table(&borrowed);

        let windows = generate_windows(&t, Cadence::Hourly, 1).unwrap();
        let result = aggregate_table(&t, &windows, &channels(&["BC1", "BC6"]), 0);

        // 00:00 .. 23:55 rounds to 00:00 .. 00:00 + 1 day, minus one hour.
        assert_eq!(result.rows.len(), 24);
        assert_eq!(result.rows[0].end, at(1, 0));
        assert_eq!(result.rows[23].end, at(0, 0) + Duration::days(1));

        // 10:00 .. 11:00 holds 12 rows of hour 10 and the 11:00 row:
        // BC1 = (12 * 10 + 11) / 13 = 10.08 -> 10
        // BC6 = (0 + 5 + ... + 55 + 0) / 13 = 330 / 13 = 25.38 -> 25
        assert_eq!(result.rows[10].start, at(10, 0));
        assert_eq!(result.rows[10].values, vec![Some(10.0), Some(25.0)]);

        // The last window has no closing 00:00 row.
        // BC6 = 330 / 12 = 27.5 -> 28
        assert_eq!(result.rows[23].values, vec![Some(23.0), Some(28.0)]);
    }

    #[test]
    fn test_series_summary() {
        let summary = SeriesSummary::of("BC6", &[Some(2.0), None, Some(4.0), Some(6.0)]);
        assert_eq!(summary.count, 3);
        assert_eq!(summary.mean, Some(4.0));
        assert_eq!(summary.std_dev, Some(2.0));

        let single = SeriesSummary::of("BC6", &[Some(1.0)]);
        assert_eq!(single.std_dev, None);

        let empty = SeriesSummary::of("BC6", &[None]);
        assert_eq!(empty.mean, None);
        assert_eq!(empty.count, 0);
    }
}
