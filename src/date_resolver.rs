//! Flexible resolution of free-form date strings into calendar dates.
//!
//! The resolver is deliberately forgiving: it accepts RFC 3339 / RFC 2822
//! timestamps, naive date-times, numeric and month-name dates, Unix epochs
//! and a handful of relative phrases ("yesterday", "3 days ago"). Anything
//! it cannot read resolves to `None`, and the pipeline drops that record.
//!
//! Timestamps carrying an offset are converted to UTC before the calendar
//! date is taken.

use crate::csv_parser::NormalizedRecord;
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};

const DATETIME_FORMATS: [&str; 10] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%d.%m.%Y %H:%M:%S",
];

const OFFSET_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f%z", "%Y-%m-%d %H:%M:%S%z"];

// Month-name forms run after commas are dropped and ordinals stripped.
const DATE_FORMATS: [&str; 12] = [
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%d.%m.%Y",
    "%Y%m%d",
    "%B %d %Y",
    "%d %B %Y",
    "%A %B %d %Y",
    "%A %d %B %Y",
    "%B %Y %d",
    "%Y %B %d",
    "%m-%d-%Y",
];

/// Resolves date strings relative to a fixed reference day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateResolver {
    reference: NaiveDate,
}

impl Default for DateResolver {
    fn default() -> Self {
        DateResolver::new(Utc::now().date_naive())
    }
}

impl DateResolver {
    /// Creates a resolver whose relative phrases count from `reference`.
    pub fn new(reference: NaiveDate) -> Self {
        DateResolver { reference }
    }

    /// Resolves `input` to a calendar date, or `None` when it is unreadable.
    pub fn resolve(&self, input: &str) -> Option<NaiveDate> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return None;
        }

        self.resolve_relative(trimmed)
            .or_else(|| resolve_timestamp(trimmed))
            .or_else(|| resolve_epoch(trimmed))
            .or_else(|| resolve_calendar(trimmed))
    }

    fn resolve_relative(&self, input: &str) -> Option<NaiveDate> {
        let lowered = input.to_ascii_lowercase();
        let words: Vec<&str> = lowered.split_whitespace().collect();

        match words.as_slice() {
            ["today"] | ["now"] => Some(self.reference),
            ["yesterday"] => self.reference.checked_sub_signed(Duration::days(1)),
            ["tomorrow"] => self.reference.checked_add_signed(Duration::days(1)),
            [count, unit, "ago"] => {
                let offset = relative_offset(count, unit)?;
                self.reference.checked_sub_signed(offset)
            }
            ["in", count, unit] => {
                let offset = relative_offset(count, unit)?;
                self.reference.checked_add_signed(offset)
            }
            _ => None,
        }
    }
}

fn relative_offset(count: &str, unit: &str) -> Option<Duration> {
    let count: i64 = match count {
        "a" | "one" => 1,
        other => other.parse().ok()?,
    };
    match unit.trim_end_matches('s') {
        "day" => Duration::try_days(count),
        "week" => Duration::try_weeks(count),
        _ => None,
    }
}

fn resolve_timestamp(input: &str) -> Option<NaiveDate> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Some(dt.with_timezone(&Utc).date_naive());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(input) {
        return Some(dt.with_timezone(&Utc).date_naive());
    }
    for fmt in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(input, fmt) {
            return Some(dt.with_timezone(&Utc).date_naive());
        }
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(input, fmt).ok())
        .map(|dt| dt.date())
}

fn resolve_epoch(input: &str) -> Option<NaiveDate> {
    if !input.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let value: i64 = input.parse().ok()?;
    let datetime = match input.len() {
        10 => DateTime::from_timestamp(value, 0)?,
        13 => DateTime::from_timestamp_millis(value)?,
        _ => return None,
    };
    Some(datetime.date_naive())
}

fn resolve_calendar(input: &str) -> Option<NaiveDate> {
    let cleaned = clean_words(input);
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(&cleaned, fmt).ok())
}

/// Drops commas, collapses whitespace and strips ordinal suffixes ("5th" -> "5").
fn clean_words(input: &str) -> String {
    input
        .replace(',', " ")
        .split_whitespace()
        .map(strip_ordinal)
        .collect::<Vec<_>>()
        .join(" ")
}

fn strip_ordinal(word: &str) -> &str {
    let lowered = word.to_ascii_lowercase();
    for suffix in ["st", "nd", "rd", "th"] {
        if lowered.ends_with(suffix) {
            let stem = &word[..word.len() - suffix.len()];
            if !stem.is_empty() && stem.bytes().all(|b| b.is_ascii_digit()) {
                return stem;
            }
        }
    }
    word
}

/// A normalized record whose date column resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct DatedRecord {
    pub date: NaiveDate,
    pub record: NormalizedRecord,
}

/// Resolves every record's `date_column`, dropping those that fail.
///
/// Returns the surviving records in input order and the number dropped.
pub fn resolve_records(
    records: Vec<NormalizedRecord>,
    date_column: &str,
    resolver: &DateResolver,
) -> (Vec<DatedRecord>, usize) {
    let total = records.len();
    let resolved: Vec<DatedRecord> = records
        .into_iter()
        .enumerate()
        .filter_map(|(index, record)| {
            let raw = record.text(date_column).unwrap_or_default();
            match resolver.resolve(raw) {
                Some(date) => Some(DatedRecord { date, record }),
                None => {
                    log::debug!("Dropping record {}: unresolvable date '{}'", index, raw);
                    None
                }
            }
        })
        .collect();

    let dropped = total - resolved.len();
    (resolved, dropped)
}
