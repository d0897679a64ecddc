//! Session state: the current series snapshot and the latest prediction.
//!
//! Both are replaced wholesale. Readers receive an `Arc` to the snapshot that
//! was current when they asked, which stays valid even if a reload swaps in
//! a newer one meanwhile.

use crate::config::InsightsConfig;
use crate::date_resolver::DateResolver;
use crate::ingest::{self, IngestReport};
use crate::prediction::{PredictError, Prediction, PredictionClient, PredictionStore};
use crate::time_series::{SeriesSnapshot, TimeSeriesRow};
use chrono::NaiveDate;
use reqwest::Client;
use std::sync::Arc;
use tokio::sync::RwLock;

pub struct InsightsSession {
    config: InsightsConfig,
    http: Client,
    series: RwLock<Arc<SeriesSnapshot>>,
    predictor: PredictionClient,
    predictions: PredictionStore,
}

impl InsightsSession {
    /// Creates a session with an empty series and no prediction.
    ///
    /// # Errors
    /// Returns `PredictError::ClientCreation` if an HTTP client cannot be built.
    pub fn new(config: InsightsConfig) -> Result<Self, PredictError> {
        let predictor = PredictionClient::new(config.predictor.clone())?;
        Ok(InsightsSession {
            config,
            http: Client::new(),
            series: RwLock::new(Arc::new(SeriesSnapshot::empty())),
            predictor,
            predictions: PredictionStore::new(),
        })
    }

    /// The snapshot current at the time of the call.
    pub async fn series(&self) -> Arc<SeriesSnapshot> {
        Arc::clone(&*self.series.read().await)
    }

    /// Fetches the configured source and installs the result as a new snapshot.
    ///
    /// Always completes; a failed fetch or parse installs an empty snapshot
    /// whose report records the cause.
    pub async fn load(&self) -> Arc<SeriesSnapshot> {
        let (rows, report) = ingest::load(
            &self.config.data_source,
            &self.http,
            &self.config.ingest,
            &self.config.metrics,
            &DateResolver::default(),
        )
        .await;
        self.install(rows, report).await
    }

    /// Runs the pipeline over in-memory text and installs the result.
    pub async fn load_text(&self, text: &str) -> Arc<SeriesSnapshot> {
        let (rows, report) = ingest::ingest_text(
            text,
            &self.config.ingest,
            &self.config.metrics,
            &DateResolver::default(),
        );
        self.install(rows, report).await
    }

    // The version is derived under the write lock so installs are ordered.
    async fn install(
        &self,
        rows: Vec<TimeSeriesRow>,
        report: IngestReport,
    ) -> Arc<SeriesSnapshot> {
        let mut current = self.series.write().await;
        let version = current.version + 1;
        let snapshot = Arc::new(SeriesSnapshot::new(version, rows, report));
        *current = Arc::clone(&snapshot);
        log::info!("Installed series snapshot v{} ({} rows)", version, snapshot.len());
        snapshot
    }

    /// Requests a prediction for `date` and stores it if still current.
    ///
    /// # Errors
    /// Validation and service failures leave the stored prediction untouched.
    /// `Superseded` means a newer request was issued while this one was in
    /// flight; its answer was discarded.
    pub async fn predict(&self, date: NaiveDate) -> Result<Arc<Prediction>, PredictError> {
        self.predictor.validate(date)?;

        let token = self.predictions.issue();
        let prediction = match self.predictor.predict(date).await {
            Ok(prediction) => prediction,
            Err(e) => {
                log::warn!("Prediction for {} failed: {}", date, e);
                return Err(e);
            }
        };

        let stored = Arc::new(prediction.clone());
        if self.predictions.commit(token, prediction).await {
            Ok(stored)
        } else {
            log::info!("Discarding stale prediction for {}", date);
            Err(PredictError::Superseded)
        }
    }

    pub async fn prediction(&self) -> Option<Arc<Prediction>> {
        self.predictions.current().await
    }
}
