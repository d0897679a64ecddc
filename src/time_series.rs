use crate::ingest::IngestReport;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// One validated, date-resolved, metric-enriched record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSeriesRow {
    /// Calendar date of the record
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub market_cap: f64,
    /// Open-to-close change in percent, two decimals
    pub price_change: f64,
    /// Trailing 7-row (or 7-day) mean close
    pub ma7: f64,
    /// Trailing 30-row (or 30-day) mean close
    pub ma30: f64,
    /// Remaining non-numeric source columns
    #[serde(flatten)]
    pub fields: BTreeMap<String, String>,
}

/// Date range for querying time-series data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    /// Start date (inclusive)
    pub start: NaiveDate,
    /// End date (inclusive)
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        DateRange { start, end }
    }

    /// Creates a range covering a single day.
    pub fn single_day(date: NaiveDate) -> Self {
        DateRange {
            start: date,
            end: date,
        }
    }

    /// Whether `date` lies in `[start, end]`. Always false when `start > end`.
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// Returns the rows dated within `range`, preserving order.
///
/// A reversed range (`start > end`) yields nothing rather than an error.
pub fn filter_by_date_range<'a>(
    rows: &'a [TimeSeriesRow],
    range: &DateRange,
) -> Vec<&'a TimeSeriesRow> {
    rows.iter().filter(|row| range.contains(row.date)).collect()
}

/// Returns the row with the largest absolute price change.
///
/// Ties keep the first row encountered. An empty slice yields `None`.
pub fn highest_volatility(rows: &[TimeSeriesRow]) -> Option<&TimeSeriesRow> {
    let mut iter = rows.iter();
    let first = iter.next()?;
    Some(iter.fold(first, |best, row| {
        if row.price_change.abs() > best.price_change.abs() {
            row
        } else {
            best
        }
    }))
}

/// Immutable view of one ingestion's output.
///
/// Snapshots are never mutated; a new ingestion produces a new snapshot
/// with a higher version.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesSnapshot {
    /// Increases by one per ingestion; 0 means nothing has been loaded
    pub version: u64,
    rows: Arc<[TimeSeriesRow]>,
    /// Diagnostics from the ingestion that produced this snapshot
    pub report: IngestReport,
}

impl SeriesSnapshot {
    pub fn new(version: u64, rows: Vec<TimeSeriesRow>, report: IngestReport) -> Self {
        SeriesSnapshot {
            version,
            rows: rows.into(),
            report,
        }
    }

    /// The snapshot that exists before any ingestion has run.
    pub fn empty() -> Self {
        SeriesSnapshot::new(0, Vec::new(), IngestReport::default())
    }

    pub fn rows(&self) -> &[TimeSeriesRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn in_range(&self, range: &DateRange) -> Vec<&TimeSeriesRow> {
        filter_by_date_range(&self.rows, range)
    }

    /// Highest-volatility row across the whole snapshot, ignoring any range.
    pub fn highest_volatility(&self) -> Option<&TimeSeriesRow> {
        highest_volatility(&self.rows)
    }
}

impl Default for SeriesSnapshot {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn row(date: NaiveDate, price_change: f64) -> TimeSeriesRow {
        TimeSeriesRow {
            date,
            open: 100.0,
            high: 100.0,
            low: 100.0,
            close: 100.0,
            volume: 0.0,
            market_cap: 0.0,
            price_change,
            ma7: 100.0,
            ma30: 100.0,
            fields: BTreeMap::new(),
        }
    }

    fn sample_rows() -> Vec<TimeSeriesRow> {
        vec![
            row(date(2024, 1, 14), 1.0),
            row(date(2024, 1, 15), -3.5),
            row(date(2024, 1, 15), 3.5),
            row(date(2024, 1, 16), 2.0),
            row(date(2024, 1, 17), -0.5),
        ]
    }

    #[test]
    fn date_range_filtering_is_inclusive() {
        let rows = sample_rows();
        let range = DateRange::new(date(2024, 1, 15), date(2024, 1, 16));
        let result = filter_by_date_range(&rows, &range);
        assert_eq!(result.len(), 3);
        assert!(result.iter().all(|r| range.contains(r.date)));
        assert_eq!(result[0].price_change, -3.5);
        assert_eq!(result[2].price_change, 2.0);
    }

    #[test]
    fn reversed_range_is_empty() {
        let rows = sample_rows();
        let range = DateRange::new(date(2024, 1, 16), date(2024, 1, 15));
        assert!(filter_by_date_range(&rows, &range).is_empty());
    }

    #[test]
    fn single_day_range_returns_duplicates() {
        let rows = sample_rows();
        let result = filter_by_date_range(&rows, &DateRange::single_day(date(2024, 1, 15)));
        assert_eq!(result.len(), 2);

        let none = filter_by_date_range(&rows, &DateRange::single_day(date(2024, 2, 1)));
        assert!(none.is_empty());
    }

    #[test]
    fn highest_volatility_uses_absolute_change_and_first_tie() {
        let rows = sample_rows();
        let best = highest_volatility(&rows).unwrap();
        assert_eq!(best.price_change, -3.5);
        assert_eq!(best.date, date(2024, 1, 15));
        assert!(rows
            .iter()
            .all(|r| best.price_change.abs() >= r.price_change.abs()));
    }

    #[test]
    fn highest_volatility_of_empty_is_none() {
        assert!(highest_volatility(&[]).is_none());
        assert!(SeriesSnapshot::empty().highest_volatility().is_none());
    }

    #[test]
    fn highest_volatility_with_all_flat_rows_is_first() {
        let rows = vec![row(date(2024, 1, 1), 0.0), row(date(2024, 1, 2), 0.0)];
        assert_eq!(highest_volatility(&rows).unwrap().date, date(2024, 1, 1));
    }

    #[test]
    fn snapshot_ignores_range_for_extremum() {
        let snapshot = SeriesSnapshot::new(3, sample_rows(), IngestReport::default());
        let range = DateRange::single_day(date(2024, 1, 17));
        assert_eq!(snapshot.in_range(&range).len(), 1);
        assert_eq!(snapshot.highest_volatility().unwrap().price_change, -3.5);
        assert_eq!(snapshot.version, 3);
        assert_eq!(snapshot.len(), 5);
    }

    #[test]
    fn row_serializes_camel_case_with_flattened_fields() {
        let mut r = row(date(2024, 1, 2), -5.26);
        r.fields.insert("name".to_string(), "Bitcoin".to_string());
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["date"], "2024-01-02");
        assert_eq!(json["priceChange"], -5.26);
        assert_eq!(json["marketCap"], 0.0);
        assert_eq!(json["ma7"], 100.0);
        assert_eq!(json["name"], "Bitcoin");
    }
}
