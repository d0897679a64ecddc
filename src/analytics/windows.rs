//! Windowing strategies that supply slices to primitives.
//!
//! [`FixedWindow`] counts rows; [`CalendarWindow`] counts days. Which one the
//! moving averages use is chosen by [`WindowPolicy`].

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

/// Trailing window over the previous `size` rows, shorter at the start.
#[derive(Debug, Clone, Copy)]
pub struct FixedWindow {
    size: usize,
}

impl FixedWindow {
    pub fn new(size: usize) -> Self {
        FixedWindow { size: size.max(1) }
    }

    /// Applies the primitive to the window ending at each index.
    pub fn apply<F>(&self, data: &[f64], mut primitive: F) -> Vec<f64>
    where
        F: FnMut(&[f64]) -> f64,
    {
        (0..data.len())
            .map(|index| {
                let start = (index + 1).saturating_sub(self.size);
                primitive(&data[start..=index])
            })
            .collect()
    }
}

/// Trailing window over the previous `days` calendar days.
///
/// For index `i` the window holds every earlier-or-equal index `j` whose date
/// falls in `(date_i - days, date_i]`. Rows are not reordered.
#[derive(Debug, Clone, Copy)]
pub struct CalendarWindow {
    days: usize,
}

impl CalendarWindow {
    pub fn new(days: usize) -> Self {
        CalendarWindow { days: days.max(1) }
    }

    pub fn apply<F>(&self, dates: &[NaiveDate], data: &[f64], mut primitive: F) -> Vec<f64>
    where
        F: FnMut(&[f64]) -> f64,
    {
        let span = i64::try_from(self.days - 1).ok().and_then(Duration::try_days);
        let mut window = Vec::with_capacity(self.days.min(data.len()));

        dates
            .iter()
            .zip(data)
            .enumerate()
            .map(|(index, (&date, _))| {
                let earliest = span
                    .and_then(|span| date.checked_sub_signed(span))
                    .unwrap_or(NaiveDate::MIN);
                window.clear();
                window.extend(
                    dates[..=index]
                        .iter()
                        .zip(&data[..=index])
                        .filter(|(d, _)| **d >= earliest && **d <= date)
                        .map(|(_, value)| *value),
                );
                primitive(&window)
            })
            .collect()
    }
}

/// How moving-average windows are measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowPolicy {
    /// Count rows in ingestion order, regardless of gaps or duplicate dates
    #[default]
    Positional,
    /// Count calendar days back from each row's date
    Calendar,
}

impl WindowPolicy {
    /// Applies `primitive` over a window of `size` under this policy.
    pub fn apply<F>(
        &self,
        size: usize,
        dates: &[NaiveDate],
        data: &[f64],
        primitive: F,
    ) -> Vec<f64>
    where
        F: FnMut(&[f64]) -> f64,
    {
        match self {
            WindowPolicy::Positional => FixedWindow::new(size).apply(data, primitive),
            WindowPolicy::Calendar => CalendarWindow::new(size).apply(dates, data, primitive),
        }
    }
}

impl std::fmt::Display for WindowPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WindowPolicy::Positional => write!(f, "positional"),
            WindowPolicy::Calendar => write!(f, "calendar"),
        }
    }
}

impl std::str::FromStr for WindowPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "positional" | "rows" => Ok(WindowPolicy::Positional),
            "calendar" | "days" => Ok(WindowPolicy::Calendar),
            other => Err(format!("unknown window policy '{}'", other)),
        }
    }
}
