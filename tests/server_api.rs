use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use httpmock::prelude::*;
use price_insights::config::{InsightsConfig, PredictorConfig};
use price_insights::ingest::DataSource;
use price_insights::server::{create_router, AppState};
use price_insights::InsightsSession;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;
use tower::ServiceExt;

fn fixture_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/btc_sample.csv")
}

async fn app_with_predictor(base_url: &str) -> Router {
    let _ = env_logger::builder().is_test(true).try_init();
    let config = InsightsConfig {
        data_source: DataSource::File(fixture_path()),
        predictor: PredictorConfig::with_base_url(base_url),
        ..InsightsConfig::default()
    };
    let session = InsightsSession::new(config).unwrap();
    session.load().await;
    create_router(Arc::new(AppState::new(session)))
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn health_reports_ok() {
    let app = app_with_predictor("http://127.0.0.1:9").await;
    let (status, body) = send(&app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn series_defaults_to_dashboard_range() {
    let app = app_with_predictor("http://127.0.0.1:9").await;
    let (status, body) = send(&app, get("/series")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["startDate"], "2024-01-01");
    assert_eq!(body["endDate"], "2029-05-31");
    let rows = body["rows"].as_array().unwrap();
    assert_eq!(rows.len(), 10);
    assert_eq!(rows[0]["date"], "2024-01-01");
    assert_eq!(rows[0]["priceChange"], 2.0);
    assert_eq!(rows[0]["marketCap"], 799680000000.0);
    assert_eq!(rows[0]["name"], "2781");
}

#[tokio::test]
async fn series_filters_inclusive_range() {
    let app = app_with_predictor("http://127.0.0.1:9").await;

    let (status, body) = send(&app, get("/series?start=2024-01-04&end=2024-01-06")).await;
    assert_eq!(status, StatusCode::OK);
    let dates: Vec<&str> = body["rows"]
        .as_array()
        .unwrap()
        .iter()
        .map(|row| row["date"].as_str().unwrap())
        .collect();
    assert_eq!(dates, vec!["2024-01-04", "2024-01-05", "2024-01-06"]);

    let (status, body) = send(&app, get("/series?start=2024-01-06&end=2024-01-04")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["rows"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn series_rejects_malformed_dates() {
    let app = app_with_predictor("http://127.0.0.1:9").await;
    let (status, body) = send(&app, get("/series?start=01/04/2024")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "InvalidDateRange");
}

#[tokio::test]
async fn summary_reports_ingest_and_peak_day() {
    let app = app_with_predictor("http://127.0.0.1:9").await;
    let (status, body) = send(&app, get("/series/summary")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["version"], 1);
    assert_eq!(body["rowCount"], 10);
    assert_eq!(body["report"]["droppedRows"], 1);
    assert_eq!(body["report"]["coercedFields"], 1);
    assert_eq!(body["highestVolatility"]["date"], "2024-01-08");
    assert_eq!(body["highestVolatility"]["priceChange"], 10.0);
}

#[tokio::test]
async fn reload_bumps_version() {
    let app = app_with_predictor("http://127.0.0.1:9").await;
    let (status, body) = send(&app, post_json("/series/reload", json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["version"], 2);
    assert_eq!(body["rowCount"], 10);
}

#[tokio::test]
async fn predict_relays_and_stores_result() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/predict")
                .json_body(json!({ "date": "2025-03-01" }));
            then.status(200).json_body(json!({
                "predictedPrice": 87250.5,
                "rmse": 343.25,
                "mae": 221.14,
                "selectedDate": "2025-03-01"
            }));
        })
        .await;
    let app = app_with_predictor(&server.base_url()).await;

    let (status, body) = send(&app, get("/prediction")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["prediction"].is_null());

    let (status, body) = send(&app, post_json("/predict", json!({ "date": "2025-03-01" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["predictedPrice"], 87250.5);
    assert_eq!(body["rmse"], 343.25);
    assert_eq!(body["mae"], 221.14);
    assert_eq!(body["selectedDate"], "2025-03-01");
    mock.assert_async().await;

    let (_, body) = send(&app, get("/prediction")).await;
    assert_eq!(body["prediction"]["requestedDate"], "2025-03-01");
}

#[tokio::test]
async fn predict_rejects_early_and_missing_dates_without_calling_service() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/predict");
            then.status(200).json_body(json!({ "predictedPrice": 1, "rmse": 1, "mae": 1 }));
        })
        .await;
    let app = app_with_predictor(&server.base_url()).await;

    let (status, body) = send(&app, post_json("/predict", json!({ "date": "2014-12-31" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "PredictionRejected");

    let (status, body) = send(&app, post_json("/predict", json!({ "date": "  " }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "InvalidParameter");

    let (status, _) = send(&app, post_json("/predict", json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    mock.assert_hits_async(0).await;
}

#[tokio::test]
async fn predictor_failure_maps_to_bad_gateway_and_keeps_previous() {
    let server = MockServer::start_async().await;
    let mut ok = server
        .mock_async(|when, then| {
            when.method(POST).path("/predict");
            then.status(200)
                .json_body(json!({ "predictedPrice": 70000, "rmse": 343.25, "mae": 221.14 }));
        })
        .await;
    let app = app_with_predictor(&server.base_url()).await;

    let (status, _) = send(&app, post_json("/predict", json!({ "date": "2025-01-01" }))).await;
    assert_eq!(status, StatusCode::OK);

    ok.delete_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/predict");
            then.status(500).json_body(json!({ "error": "model not loaded" }));
        })
        .await;

    let (status, body) = send(&app, post_json("/predict", json!({ "date": "2025-02-01" }))).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"], "PredictionFailed");
    assert!(body["message"].as_str().unwrap().contains("model not loaded"));

    let (_, body) = send(&app, get("/prediction")).await;
    assert_eq!(body["prediction"]["requestedDate"], "2025-01-01");
    assert_eq!(body["prediction"]["predictedPrice"], 70000.0);
}
