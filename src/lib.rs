pub mod analytics;
pub mod config;
pub mod csv_parser;
pub mod date_resolver;
pub mod ingest;
pub mod prediction;
pub mod server;
pub mod session;
pub mod time_series;

pub use analytics::{enrich, moving_average};
pub use analytics::windows::WindowPolicy;
pub use config::{InsightsConfig, IngestConfig, MetricsConfig, PredictorConfig};
pub use csv_parser::{parse_csv_str, NormalizedRecord, ParseError, ParsedCsv};
pub use date_resolver::{resolve_records, DateResolver, DatedRecord};
pub use ingest::{DataSource, IngestReport, SourceError};
pub use prediction::{
    PredictError, Prediction, PredictionClient, PredictionStore, RequestToken,
};
pub use server::{run_server, ApiError, AppState, ServerConfig};
pub use session::InsightsSession;
pub use time_series::{
    filter_by_date_range, highest_volatility, DateRange, SeriesSnapshot, TimeSeriesRow,
};
