//! Configuration for ingestion, analytics, the predictor client and the server.
//!
//! Every section has a `Default` matching the dashboard's historical behavior.
//! [`InsightsConfig::from_env`] layers environment overrides on top, falling
//! back to defaults when a variable is missing or malformed.

use crate::analytics::windows::WindowPolicy;
use crate::ingest::DataSource;
use crate::server::ServerConfig;
use chrono::NaiveDate;

/// Column that carries the free-form date of each record.
pub const DEFAULT_DATE_COLUMN: &str = "timeOpen";

/// Columns parsed as floating point during normalization.
pub const DEFAULT_NUMERIC_COLUMNS: [&str; 6] =
    ["open", "high", "low", "close", "volume", "marketCap"];

/// Default location of the static price history.
pub const DEFAULT_DATA_SOURCE: &str = "data/bitcoin_daily_history.csv";

/// Default predictor service address.
pub const DEFAULT_PREDICTOR_URL: &str = "http://localhost:5000";

/// CSV ingestion settings.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestConfig {
    /// Field separator (default: `;`)
    pub delimiter: u8,
    /// Column resolved into the row's calendar date
    pub date_column: String,
    /// Columns coerced to `f64` (zero-filled on failure)
    pub numeric_columns: Vec<String>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        IngestConfig {
            delimiter: b';',
            date_column: DEFAULT_DATE_COLUMN.to_string(),
            numeric_columns: DEFAULT_NUMERIC_COLUMNS.iter().map(|c| c.to_string()).collect(),
        }
    }
}

impl IngestConfig {
    /// Columns the header must contain for an ingestion to proceed.
    pub fn required_columns(&self) -> Vec<&str> {
        std::iter::once(self.date_column.as_str())
            .chain(self.numeric_columns.iter().map(String::as_str))
            .collect()
    }

    pub fn is_numeric(&self, column: &str) -> bool {
        self.numeric_columns.iter().any(|c| c == column)
    }
}

/// Moving-average settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsConfig {
    /// Short moving-average window (default: 7)
    pub short_window: usize,
    /// Long moving-average window (default: 30)
    pub long_window: usize,
    /// Whether windows count rows or calendar days (default: rows)
    pub window_policy: WindowPolicy,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        MetricsConfig {
            short_window: 7,
            long_window: 30,
            window_policy: WindowPolicy::Positional,
        }
    }
}

/// Settings for the external predictor service.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictorConfig {
    /// Base URL of the predictor (default: `http://localhost:5000`)
    pub base_url: String,
    /// Route appended to the base URL (default: `/predict`)
    pub route: String,
    /// Request timeout in seconds (default: 30)
    pub timeout_seconds: u64,
    /// Earliest date a prediction may be requested for (default: 2015-01-01)
    pub earliest_date: NaiveDate,
}

impl Default for PredictorConfig {
    fn default() -> Self {
        PredictorConfig {
            base_url: DEFAULT_PREDICTOR_URL.to_string(),
            route: "/predict".to_string(),
            timeout_seconds: 30,
            earliest_date: NaiveDate::from_ymd_opt(2015, 1, 1).unwrap_or(NaiveDate::MIN),
        }
    }
}

impl PredictorConfig {
    /// Creates a configuration pointing at `base_url` with default settings otherwise.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        PredictorConfig {
            base_url: base_url.into(),
            ..PredictorConfig::default()
        }
    }

    /// Full endpoint URL.
    pub fn endpoint(&self) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            self.route.trim_start_matches('/')
        )
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default)]
pub struct InsightsConfig {
    pub data_source: DataSource,
    pub ingest: IngestConfig,
    pub metrics: MetricsConfig,
    pub predictor: PredictorConfig,
    pub server: ServerConfig,
}

impl InsightsConfig {
    /// Builds a configuration from environment variables.
    ///
    /// Recognized variables: `DATA_SOURCE`, `PREDICTOR_URL`,
    /// `PREDICTOR_TIMEOUT_SECS`, `MA_WINDOW_POLICY`, `HOST`, `PORT`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = InsightsConfig::default();

        if let Some(source) = lookup("DATA_SOURCE") {
            config.data_source = DataSource::parse(&source);
        }
        if let Some(url) = lookup("PREDICTOR_URL") {
            config.predictor.base_url = url;
        }
        if let Some(raw) = lookup("PREDICTOR_TIMEOUT_SECS") {
            match raw.parse::<u64>() {
                Ok(secs) => config.predictor.timeout_seconds = secs,
                Err(_) => log::warn!("Ignoring invalid PREDICTOR_TIMEOUT_SECS '{}'", raw),
            }
        }
        if let Some(raw) = lookup("MA_WINDOW_POLICY") {
            match raw.parse::<WindowPolicy>() {
                Ok(policy) => config.metrics.window_policy = policy,
                Err(e) => log::warn!("Ignoring MA_WINDOW_POLICY: {}", e),
            }
        }
        if let Some(host) = lookup("HOST") {
            config.server.host = host;
        }
        if let Some(raw) = lookup("PORT") {
            match raw.parse::<u16>() {
                Ok(port) => config.server.port = port,
                Err(_) => log::warn!("Ignoring invalid PORT '{}'", raw),
            }
        }

        config
    }
}
