//! Shared application state for the API server

use crate::session::InsightsSession;
use crate::time_series::DateRange;
use chrono::NaiveDate;

/// Shared application state
pub struct AppState {
    /// Series snapshot and prediction store
    pub session: InsightsSession,
    /// Range served when a series query omits `start` or `end`
    pub default_range: DateRange,
}

impl AppState {
    /// Creates a new application state with the dashboard's initial range.
    pub fn new(session: InsightsSession) -> Self {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or(NaiveDate::MIN);
        let end = NaiveDate::from_ymd_opt(2029, 5, 31).unwrap_or(NaiveDate::MAX);
        AppState::with_default_range(session, DateRange::new(start, end))
    }

    pub fn with_default_range(session: InsightsSession, default_range: DateRange) -> Self {
        AppState {
            session,
            default_range,
        }
    }
}
