//! Route definitions for the API server

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers;
use super::state::AppState;

/// Creates the main application router with all routes and middleware
pub fn create_router(state: Arc<AppState>) -> Router {
    // The dashboard front end is served from a different origin.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/series", get(handlers::get_series))
        .route("/series/summary", get(handlers::get_summary))
        .route("/series/reload", post(handlers::reload_series))
        .route("/predict", post(handlers::predict))
        .route("/prediction", get(handlers::get_prediction))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
