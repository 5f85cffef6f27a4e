//! tabql API Server
//!
//! Run with: cargo run --bin tabql-api
//!
//! # Configuration
//!
//! Config file from the standard locations (see `tabql config`), then
//! environment variables:
//! - `TABQL_API_HOST`: Host to bind to (default: 0.0.0.0)
//! - `TABQL_API_PORT`: Port to listen on (default: 8082)
//! - `TABQL_DATA_DIR`: Directory of CSV datasets (optional)
//! - `TABQL_LOG_LEVEL`: Log level (default: info)
//! - `TABQL_LOG_FORMAT`: pretty or json (default: pretty)
//! - `RUST_LOG`: Full filter directive, overrides the level

use tabql::api::{serve, AppState};
use tabql::config::Config;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load_default();
    config.logging.init();

    tracing::info!("Starting tabql API server v{}", env!("CARGO_PKG_VERSION"));
    match &config.datasets.dir {
        Some(dir) => tracing::info!("Dataset directory: {}", dir),
        None => tracing::info!("No dataset directory configured (set TABQL_DATA_DIR)"),
    }

    let state = AppState::from_config(&config)?;
    tracing::info!("Datasets: {}", state.datasets.names().join(", "));

    serve(state, &config.api).await?;

    tracing::info!("tabql API server stopped");
    Ok(())
}
