//! Derived metrics for a date-resolved series.
//!
//! Given records in ingestion order, this module computes each row's
//! open-to-close percentage change and its short and long trailing moving
//! averages of the close. Everything here is a pure function of its input.

pub mod primitives;
pub mod windows;

use crate::config::MetricsConfig;
use crate::date_resolver::DatedRecord;
use crate::time_series::TimeSeriesRow;
use chrono::NaiveDate;
use primitives::{mean, percent_change};

/// Trailing moving average of `closes`.
///
/// Early indices average over the shorter available window instead of
/// yielding a gap.
///
/// # Examples
/// ```
/// use price_insights::analytics::moving_average;
/// use price_insights::analytics::windows::WindowPolicy;
/// use chrono::NaiveDate;
///
/// let dates: Vec<NaiveDate> = (1..=3)
///     .map(|d| NaiveDate::from_ymd_opt(2024, 1, d).unwrap())
///     .collect();
/// let ma = moving_average(&dates, &[100.0, 110.0, 90.0], 7, WindowPolicy::Positional);
/// assert_eq!(ma, vec![100.0, 105.0, 100.0]);
/// ```
pub fn moving_average(
    dates: &[NaiveDate],
    closes: &[f64],
    window: usize,
    policy: windows::WindowPolicy,
) -> Vec<f64> {
    policy.apply(window, dates, closes, mean)
}

/// Builds metric-enriched rows from date-resolved records.
pub fn enrich(records: Vec<DatedRecord>, config: &MetricsConfig) -> Vec<TimeSeriesRow> {
    let dates: Vec<NaiveDate> = records.iter().map(|r| r.date).collect();
    let closes: Vec<f64> = records.iter().map(|r| r.record.number("close")).collect();

    let short = moving_average(&dates, &closes, config.short_window, config.window_policy);
    let long = moving_average(&dates, &closes, config.long_window, config.window_policy);

    records
        .into_iter()
        .zip(short)
        .zip(long)
        .map(|((dated, ma7), ma30)| {
            let record = dated.record;
            let open = record.number("open");
            let close = record.number("close");
            TimeSeriesRow {
                date: dated.date,
                open,
                high: record.number("high"),
                low: record.number("low"),
                close,
                volume: record.number("volume"),
                market_cap: record.number("marketCap"),
                price_change: percent_change(open, close),
                ma7,
                ma30,
                fields: record.text,
            }
        })
        .collect()
}
