//! Price Insights API Server Binary
//!
//! Run with: `cargo run --bin insights-server`

use price_insights::{run_server, InsightsConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Tracing is initialized in run_server(). RUST_LOG controls the level:
    //   RUST_LOG=debug cargo run --bin insights-server
    //   RUST_LOG=price_insights::ingest=debug cargo run --bin insights-server
    let config = InsightsConfig::from_env();

    println!("Starting Price Insights API Server...");
    println!("   Host: {}", config.server.host);
    println!("   Port: {}", config.server.port);
    println!("   Data source: {}", config.data_source);
    println!("   Predictor: {}", config.predictor.endpoint());
    println!("   Window policy: {}", config.metrics.window_policy);
    println!();
    println!("Server will be available at: http://{}", config.server.address());
    println!();
    println!("Available endpoints:");
    println!("  GET  /health                    - Health check");
    println!("  GET  /series?start=&end=        - Enriched rows in a date range");
    println!("  GET  /series/summary            - Ingest report and most volatile day");
    println!("  POST /series/reload             - Re-ingest the data source");
    println!("  POST /predict                   - Request a price prediction");
    println!("  GET  /prediction                - Latest stored prediction");
    println!();

    run_server(config).await?;

    Ok(())
}
