//! Ingestion pipeline: fetch, parse, resolve dates, enrich.
//!
//! [`ingest_text`] never fails. A structural parse error, like an unreadable
//! source in [`load`], produces an empty row sequence and a report carrying
//! the cause, so callers always get a "load complete" outcome.

use crate::analytics;
use crate::config::{IngestConfig, MetricsConfig, DEFAULT_DATA_SOURCE};
use crate::csv_parser::{parse_csv_str, ParseError};
use crate::date_resolver::{resolve_records, DateResolver};
use crate::time_series::TimeSeriesRow;
use reqwest::Client;
use serde::Serialize;
use std::path::PathBuf;

/// Where the price history is read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSource {
    /// Local file
    File(PathBuf),
    /// `http://` or `https://` URL
    Url(String),
}

impl Default for DataSource {
    fn default() -> Self {
        DataSource::File(PathBuf::from(DEFAULT_DATA_SOURCE))
    }
}

impl std::fmt::Display for DataSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataSource::File(path) => write!(f, "{}", path.display()),
            DataSource::Url(url) => write!(f, "{}", url),
        }
    }
}

impl DataSource {
    /// Interprets `location` as a URL when it has an http(s) scheme, else as a path.
    pub fn parse(location: &str) -> Self {
        let trimmed = location.trim();
        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            DataSource::Url(trimmed.to_string())
        } else {
            DataSource::File(PathBuf::from(trimmed))
        }
    }

    /// Reads the whole source as text.
    ///
    /// # Errors
    /// Returns `SourceError` if the file cannot be read, the request fails,
    /// or the server answers with a non-success status.
    pub async fn fetch_text(&self, client: &Client) -> Result<String, SourceError> {
        match self {
            DataSource::File(path) => tokio::fs::read_to_string(path)
                .await
                .map_err(|e| SourceError::Io(format!("{}: {}", path.display(), e))),
            DataSource::Url(url) => {
                let response = client
                    .get(url)
                    .send()
                    .await
                    .map_err(|e| SourceError::Network(e.to_string()))?;

                let status = response.status();
                if !status.is_success() {
                    return Err(SourceError::Status(status.as_u16()));
                }

                response
                    .text()
                    .await
                    .map_err(|e| SourceError::Network(e.to_string()))
            }
        }
    }
}

/// Errors that can occur while fetching raw text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    /// Local file could not be read
    Io(String),
    /// Request to a remote source failed
    Network(String),
    /// Remote source answered with a non-success status
    Status(u16),
}

impl std::fmt::Display for SourceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceError::Io(msg) => write!(f, "IO error: {}", msg),
            SourceError::Network(msg) => write!(f, "Network error: {}", msg),
            SourceError::Status(code) => write!(f, "HTTP {}", code),
        }
    }
}

impl std::error::Error for SourceError {}

/// Diagnostics for one ingestion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestReport {
    /// Data lines read from the source
    pub raw_rows: usize,
    /// Rows that survived date resolution
    pub rows: usize,
    /// Rows dropped because their date could not be resolved
    pub dropped_rows: usize,
    /// Numeric fields zero-filled during normalization
    pub coerced_fields: usize,
    /// Why the ingestion produced nothing, if it failed outright
    pub failure: Option<String>,
}

impl IngestReport {
    fn failed(cause: impl std::fmt::Display) -> Self {
        IngestReport {
            failure: Some(cause.to_string()),
            ..IngestReport::default()
        }
    }
}

/// Parses, resolves and enriches `text`, propagating structural errors.
pub fn build_rows(
    text: &str,
    ingest: &IngestConfig,
    metrics: &MetricsConfig,
    resolver: &DateResolver,
) -> Result<(Vec<TimeSeriesRow>, IngestReport), ParseError> {
    let parsed = parse_csv_str(text, ingest)?;
    let raw_rows = parsed.records.len();

    let (dated, dropped_rows) = resolve_records(parsed.records, &ingest.date_column, resolver);
    let rows = analytics::enrich(dated, metrics);

    let report = IngestReport {
        raw_rows,
        rows: rows.len(),
        dropped_rows,
        coerced_fields: parsed.coerced_fields,
        failure: None,
    };
    Ok((rows, report))
}

/// Runs the pipeline over `text`. Structural failures yield an empty result.
pub fn ingest_text(
    text: &str,
    ingest: &IngestConfig,
    metrics: &MetricsConfig,
    resolver: &DateResolver,
) -> (Vec<TimeSeriesRow>, IngestReport) {
    match build_rows(text, ingest, metrics, resolver) {
        Ok((rows, report)) => {
            log::info!(
                "Ingested {} rows ({} raw, {} dropped, {} numeric fields zero-filled)",
                report.rows,
                report.raw_rows,
                report.dropped_rows,
                report.coerced_fields
            );
            if report.dropped_rows > 0 {
                log::warn!("{} rows had unresolvable dates", report.dropped_rows);
            }
            (rows, report)
        }
        Err(e) => {
            log::error!("Parse error, dataset left empty: {}", e);
            (Vec::new(), IngestReport::failed(e))
        }
    }
}

/// Fetches `source` and runs the pipeline. Fetch failures yield an empty result.
pub async fn load(
    source: &DataSource,
    client: &Client,
    ingest: &IngestConfig,
    metrics: &MetricsConfig,
    resolver: &DateResolver,
) -> (Vec<TimeSeriesRow>, IngestReport) {
    log::info!("Loading price history from {}", source);

    match source.fetch_text(client).await {
        Ok(text) => ingest_text(&text, ingest, metrics, resolver),
        Err(e) => {
            log::error!("Fetch error, dataset left empty: {}", e);
            (Vec::new(), IngestReport::failed(e))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    const SAMPLE: &str = "\
timeOpen;open;high;low;close;volume;marketCap
\"2024-01-01T00:00:00.000Z\";100;105;95;100;10;1000
\"2024-01-02T00:00:00.000Z\";100;115;99;110;11;1100
\"not a date\";1;1;1;1;1;1
\"2024-01-03T00:00:00.000Z\";95;96;85;90;x;900
";

    fn run(text: &str) -> (Vec<TimeSeriesRow>, IngestReport) {
        ingest_text(
            text,
            &IngestConfig::default(),
            &MetricsConfig::default(),
            &DateResolver::new(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()),
        )
    }

    #[test]
    fn pipeline_drops_unresolved_rows_and_counts_coercions() {
        let (rows, report) = run(SAMPLE);

        assert_eq!(report.raw_rows, 4);
        assert_eq!(report.rows, 3);
        assert_eq!(report.dropped_rows, 1);
        assert_eq!(report.coerced_fields, 1);
        assert!(report.failure.is_none());

        let ma7: Vec<f64> = rows.iter().map(|r| r.ma7).collect();
        assert_eq!(ma7, vec![100.0, 105.0, 100.0]);
        assert_eq!(rows[2].price_change, -5.26);
        assert_eq!(rows[2].volume, 0.0);
    }

    #[test]
    fn structural_error_yields_empty_dataset() {
        let (rows, report) = run("timeOpen;open\n2024-01-01;1;2;3\n");
        assert!(rows.is_empty());
        assert_eq!(report.rows, 0);
        assert!(report.failure.is_some());
    }

    #[test]
    fn build_rows_propagates_parse_errors() {
        let result = build_rows(
            "open;close\n1;2\n",
            &IngestConfig::default(),
            &MetricsConfig::default(),
            &DateResolver::default(),
        );
        assert_eq!(
            result.unwrap_err(),
            ParseError::MissingColumn("timeOpen".to_string())
        );
    }

    #[test]
    fn data_source_parses_urls_and_paths() {
        assert_eq!(
            DataSource::parse("https://host/data.csv"),
            DataSource::Url("https://host/data.csv".to_string())
        );
        assert_eq!(
            DataSource::parse(" data/prices.csv "),
            DataSource::File(PathBuf::from("data/prices.csv"))
        );
    }

    #[tokio::test]
    async fn load_missing_file_yields_empty_dataset() {
        let source = DataSource::File(PathBuf::from("definitely/not/here.csv"));
        let (rows, report) = load(
            &source,
            &Client::new(),
            &IngestConfig::default(),
            &MetricsConfig::default(),
            &DateResolver::default(),
        )
        .await;

        assert!(rows.is_empty());
        assert!(report.failure.unwrap().contains("IO error"));
    }
}
