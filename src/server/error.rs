//! Error types for the REST API server

use crate::prediction::PredictError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// API error types
#[derive(Debug)]
pub enum ApiError {
    /// Invalid parameter in request
    InvalidParameter(String),
    /// Invalid date or date range
    InvalidDateRange(String),
    /// Prediction request rejected before reaching the predictor
    PredictionRejected(String),
    /// Predictor unreachable or answered with an error
    PredictionFailed(String),
    /// A newer prediction request replaced this one
    PredictionSuperseded,
    /// Internal server error
    InternalError(String),
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::InvalidParameter(msg) => write!(f, "Invalid parameter: {}", msg),
            ApiError::InvalidDateRange(msg) => write!(f, "Invalid date range: {}", msg),
            ApiError::PredictionRejected(msg) => write!(f, "Prediction rejected: {}", msg),
            ApiError::PredictionFailed(msg) => write!(f, "Prediction failed: {}", msg),
            ApiError::PredictionSuperseded => write!(f, "Prediction superseded"),
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match &self {
            ApiError::InvalidParameter(msg) => {
                (StatusCode::BAD_REQUEST, "InvalidParameter", msg.clone())
            }
            ApiError::InvalidDateRange(msg) => {
                (StatusCode::BAD_REQUEST, "InvalidDateRange", msg.clone())
            }
            ApiError::PredictionRejected(msg) => {
                (StatusCode::BAD_REQUEST, "PredictionRejected", msg.clone())
            }
            ApiError::PredictionFailed(msg) => (
                StatusCode::BAD_GATEWAY,
                "PredictionFailed",
                format!("Failed to fetch prediction: {}", msg),
            ),
            ApiError::PredictionSuperseded => (
                StatusCode::CONFLICT,
                "PredictionSuperseded",
                "A newer prediction request replaced this one".to_string(),
            ),
            ApiError::InternalError(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "InternalError", msg.clone())
            }
        };

        let body = Json(json!({
            "error": error_type,
            "message": message,
        }));

        (status, body).into_response()
    }
}

impl From<PredictError> for ApiError {
    fn from(err: PredictError) -> Self {
        match err {
            PredictError::DateOutOfRange { .. } => ApiError::PredictionRejected(err.to_string()),
            PredictError::Superseded => ApiError::PredictionSuperseded,
            PredictError::ClientCreation(msg) => ApiError::InternalError(msg),
            _ => ApiError::PredictionFailed(err.to_string()),
        }
    }
}
