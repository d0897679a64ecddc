use crate::config::PredictorConfig;
use chrono::NaiveDate;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// A prediction relayed from the predictor service.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Prediction {
    /// Date the caller asked about
    pub requested_date: NaiveDate,
    pub predicted_price: f64,
    pub rmse: f64,
    pub mae: f64,
    /// Date the service actually used; falls back to the requested date
    pub selected_date: String,
}

#[derive(Debug, Serialize)]
struct PredictionRequest {
    date: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PredictorResult {
    predicted_price: f64,
    rmse: f64,
    mae: f64,
    #[serde(default)]
    selected_date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PredictorFailure {
    error: String,
}

// Failure is tried first so a body carrying `error` is never read as success.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PredictorReply {
    Failure(PredictorFailure),
    Success(PredictorResult),
}

/// Client for the external predictor service.
///
/// Sends exactly one request per call and never retries.
#[derive(Debug, Clone)]
pub struct PredictionClient {
    client: Client,
    config: PredictorConfig,
}

impl PredictionClient {
    /// Creates a client with its own HTTP connection pool.
    ///
    /// # Errors
    /// Returns `PredictError::ClientCreation` if the HTTP client cannot be built.
    pub fn new(config: PredictorConfig) -> Result<Self, PredictError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| PredictError::ClientCreation(e.to_string()))?;

        Ok(PredictionClient { client, config })
    }

    /// Rejects dates before the configured earliest date.
    pub fn validate(&self, date: NaiveDate) -> Result<(), PredictError> {
        if date < self.config.earliest_date {
            return Err(PredictError::DateOutOfRange {
                date,
                earliest: self.config.earliest_date,
            });
        }
        Ok(())
    }

    /// Validates `date` and asks the predictor for a price.
    ///
    /// # Errors
    /// Returns `DateOutOfRange` without sending anything for early dates;
    /// otherwise `Network`, `Status`, `Service` or `InvalidResponse` depending
    /// on how the exchange failed.
    pub async fn predict(&self, date: NaiveDate) -> Result<Prediction, PredictError> {
        self.validate(date)?;

        let requested = date.format("%Y-%m-%d").to_string();
        let response = self
            .client
            .post(self.config.endpoint())
            .json(&PredictionRequest {
                date: requested.clone(),
            })
            .send()
            .await
            .map_err(|e| PredictError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| PredictError::Network(e.to_string()))?;

        if !status.is_success() {
            let message = serde_json::from_str::<PredictorFailure>(&body)
                .ok()
                .map(|failure| failure.error);
            return Err(PredictError::Status {
                status: status.as_u16(),
                message,
            });
        }

        match serde_json::from_str::<PredictorReply>(&body) {
            Ok(PredictorReply::Failure(failure)) => Err(PredictError::Service(failure.error)),
            Ok(PredictorReply::Success(result)) => Ok(Prediction {
                requested_date: date,
                predicted_price: result.predicted_price,
                rmse: result.rmse,
                mae: result.mae,
                selected_date: result.selected_date.unwrap_or(requested),
            }),
            Err(e) => Err(PredictError::InvalidResponse(e.to_string())),
        }
    }
}

/// Identifies one issued prediction request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RequestToken(u64);

/// Holds the latest prediction and guards it against stale responses.
///
/// Each request takes a token from [`PredictionStore::issue`]. A response is
/// only committed if no newer token has been issued since, so a slow early
/// request can never overwrite the answer to a later one.
#[derive(Debug, Default)]
pub struct PredictionStore {
    issued: AtomicU64,
    current: RwLock<Option<Arc<Prediction>>>,
}

impl PredictionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issues a token newer than every token issued before it.
    pub fn issue(&self) -> RequestToken {
        RequestToken(self.issued.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Replaces the stored prediction if `token` is still the newest.
    ///
    /// Returns `false` (leaving state untouched) when the token is stale.
    pub async fn commit(&self, token: RequestToken, prediction: Prediction) -> bool {
        let mut current = self.current.write().await;
        if token.0 != self.issued.load(Ordering::SeqCst) {
            return false;
        }
        *current = Some(Arc::new(prediction));
        true
    }

    pub async fn current(&self) -> Option<Arc<Prediction>> {
        self.current.read().await.clone()
    }
}

/// Errors surfaced to the user when a prediction cannot be produced.
#[derive(Debug, Clone, PartialEq)]
pub enum PredictError {
    /// Requested date precedes the earliest supported date; nothing was sent
    DateOutOfRange { date: NaiveDate, earliest: NaiveDate },
    /// HTTP client creation failed
    ClientCreation(String),
    /// Request could not be sent or the body could not be read
    Network(String),
    /// Service answered with a non-success status
    Status { status: u16, message: Option<String> },
    /// Service answered with an `error` payload
    Service(String),
    /// Service answered with a body that matched neither contract
    InvalidResponse(String),
    /// A newer request was issued before this one completed
    Superseded,
}

impl std::fmt::Display for PredictError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PredictError::DateOutOfRange { date, earliest } => write!(
                f,
                "Prediction date {} is before the earliest supported date {}",
                date, earliest
            ),
            PredictError::ClientCreation(msg) => write!(f, "Client creation error: {}", msg),
            PredictError::Network(msg) => write!(f, "Network error: {}", msg),
            PredictError::Status {
                status,
                message: Some(msg),
            } => write!(f, "Predictor returned HTTP {}: {}", status, msg),
            PredictError::Status {
                status,
                message: None,
            } => write!(f, "Predictor returned HTTP {}", status),
            PredictError::Service(msg) => write!(f, "Predictor error: {}", msg),
            PredictError::InvalidResponse(msg) => write!(f, "Invalid predictor response: {}", msg),
            PredictError::Superseded => write!(f, "Superseded by a newer prediction request"),
        }
    }
}

impl std::error::Error for PredictError {}
