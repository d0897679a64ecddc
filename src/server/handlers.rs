//! HTTP request handlers for API endpoints

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

use super::error::ApiError;
use super::state::AppState;
use crate::ingest::IngestReport;
use crate::prediction::Prediction;
use crate::time_series::{DateRange, SeriesSnapshot, TimeSeriesRow};

/// Health check endpoint
pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok"
    }))
}

fn parse_date(raw: &str, label: &str) -> Result<NaiveDate, ApiError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|e| ApiError::InvalidDateRange(format!("Invalid {} date: {}", label, e)))
}

/// Query parameters for the series endpoint
#[derive(Debug, Deserialize)]
pub struct SeriesQueryParams {
    pub start: Option<String>,
    pub end: Option<String>,
}

/// Response for a series query
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesResponse {
    pub version: u64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub rows: Vec<TimeSeriesRow>,
}

/// GET /series - Rows dated within `[start, end]`
///
/// A reversed range is not an error; it simply matches nothing.
pub async fn get_series(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SeriesQueryParams>,
) -> Result<Json<SeriesResponse>, ApiError> {
    let start = match params.start.as_deref() {
        Some(raw) => parse_date(raw, "start")?,
        None => state.default_range.start,
    };
    let end = match params.end.as_deref() {
        Some(raw) => parse_date(raw, "end")?,
        None => state.default_range.end,
    };
    let range = DateRange::new(start, end);

    let snapshot = state.session.series().await;
    let rows: Vec<TimeSeriesRow> = snapshot.in_range(&range).into_iter().cloned().collect();

    tracing::debug!(
        version = snapshot.version,
        start = %start,
        end = %end,
        rows = rows.len(),
        "Served series range"
    );

    Ok(Json(SeriesResponse {
        version: snapshot.version,
        start_date: start,
        end_date: end,
        rows,
    }))
}

/// Response describing the current snapshot
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryResponse {
    pub version: u64,
    pub row_count: usize,
    pub report: IngestReport,
    pub highest_volatility: Option<TimeSeriesRow>,
}

impl From<&SeriesSnapshot> for SummaryResponse {
    fn from(snapshot: &SeriesSnapshot) -> Self {
        SummaryResponse {
            version: snapshot.version,
            row_count: snapshot.len(),
            report: snapshot.report.clone(),
            highest_volatility: snapshot.highest_volatility().cloned(),
        }
    }
}

/// GET /series/summary - Snapshot diagnostics and the most volatile day
pub async fn get_summary(State(state): State<Arc<AppState>>) -> Json<SummaryResponse> {
    let snapshot = state.session.series().await;
    Json(SummaryResponse::from(&*snapshot))
}

/// POST /series/reload - Re-ingest the configured source
pub async fn reload_series(State(state): State<Arc<AppState>>) -> Json<SummaryResponse> {
    let snapshot = state.session.load().await;
    tracing::info!(version = snapshot.version, rows = snapshot.len(), "Series reloaded");
    Json(SummaryResponse::from(&*snapshot))
}

/// Body of a prediction request
#[derive(Debug, Deserialize)]
pub struct PredictBody {
    #[serde(default)]
    pub date: Option<String>,
}

/// POST /predict - Relay a prediction request to the predictor
pub async fn predict(
    State(state): State<Arc<AppState>>,
    Json(body): Json<PredictBody>,
) -> Result<Json<Prediction>, ApiError> {
    let raw = body
        .date
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .ok_or_else(|| {
            ApiError::InvalidParameter("Please select a date for prediction".to_string())
        })?;
    let date = parse_date(raw, "prediction")?;

    match state.session.predict(date).await {
        Ok(prediction) => Ok(Json((*prediction).clone())),
        Err(e) => {
            tracing::warn!(date = %date, error = %e, "Prediction request failed");
            Err(e.into())
        }
    }
}

/// Response for the stored prediction
#[derive(Debug, Serialize)]
pub struct PredictionStateResponse {
    pub prediction: Option<Prediction>,
}

/// GET /prediction - The most recent stored prediction, if any
pub async fn get_prediction(State(state): State<Arc<AppState>>) -> Json<PredictionStateResponse> {
    let prediction = state.session.prediction().await.map(|p| (*p).clone());
    Json(PredictionStateResponse { prediction })
}
