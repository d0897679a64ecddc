//! JSON API over the series and prediction state

mod error;
mod handlers;
mod routes;
mod state;

pub use error::ApiError;
pub use routes::create_router;
pub use state::AppState;

use crate::config::InsightsConfig;
use crate::session::InsightsSession;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Server configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Server host address (default: "127.0.0.1")
    pub host: String,
    /// Server port (default: 3000)
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

impl ServerConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Runs the API server
///
/// Loads the configured price history once, then serves until the process
/// is stopped. A failed load still starts the server with an empty series.
///
/// # Example
/// ```rust,no_run
/// use price_insights::config::InsightsConfig;
/// use price_insights::server::run_server;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     run_server(InsightsConfig::from_env()).await?;
///     Ok(())
/// }
/// ```
pub async fn run_server(config: InsightsConfig) -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();

    let addr = config.server.address();
    let session = InsightsSession::new(config)?;

    let snapshot = session.load().await;
    tracing::info!(
        version = snapshot.version,
        rows = snapshot.len(),
        dropped = snapshot.report.dropped_rows,
        coerced = snapshot.report.coerced_fields,
        "Initial load complete"
    );

    let state = Arc::new(AppState::new(session));
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
