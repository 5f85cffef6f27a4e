//! tabql REST API
//!
//! HTTP API layer for tabql, built with Axum.
//!
//! # Endpoints
//!
//! ## Query
//! - `POST /filter` - Filter a dataset, body `{data, instructions_list}`
//! - `POST /aggregate` - Aggregate a dataset, body `{data, instructions_list}`
//!
//! ## Datasets
//! - `GET /datasets` - List registered datasets
//!
//! ## Health
//! - `GET /hello` - Fixed greeting
//! - `GET /health/live` - Liveness probe
//! - `GET /health` - Full health status
//!
//! # Example
//!
//! ```rust,ignore
//! use tabql::api::{serve, AppState};
//! use tabql::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load_default();
//!     let state = AppState::from_config(&config)?;
//!     serve(state, &config.api).await?;
//!
//!     Ok(())
//! }
//! ```

pub mod dto;
pub mod error;
pub mod routes;
pub mod state;

pub use crate::config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use state::AppState;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};

/// Build the API router with all routes and middleware
pub fn build_router(state: AppState) -> Router {
    let query_routes = Router::new()
        .route("/filter", post(routes::query::filter))
        .route("/aggregate", post(routes::query::aggregate))
        .layer(DefaultBodyLimit::max(state.config.max_body_size));

    let health_routes = Router::new()
        .route("/live", get(routes::health::liveness))
        .route("/", get(routes::health::full_health));

    let timeout = Duration::from_secs(state.config.request_timeout_secs);

    // Create shared state
    let shared_state = Arc::new(state);

    Router::new()
        .merge(query_routes)
        .route("/hello", get(routes::health::hello))
        .route("/datasets", get(routes::datasets::list_datasets))
        .nest("/health", health_routes)
        .layer(TimeoutLayer::new(timeout))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(shared_state)
}

/// Start the API server
pub async fn serve(state: AppState, config: &ApiConfig) -> Result<(), ApiError> {
    let datasets = state.datasets.len();
    let router = build_router(state);

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("tabql API listening on {} ({} datasets)", addr, datasets);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ApiError::Internal(format!("Server error: {}", e)))?;

    tracing::info!("tabql API shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datasets::DatasetRegistry;
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
        response::Response,
    };
    use serde_json::{json, Value as Json};
    use tower::util::ServiceExt;

    fn create_test_app() -> Router {
        let datasets = DatasetRegistry::with_builtin().unwrap();
        build_router(AppState::new(datasets, ApiConfig::default()))
    }

    async fn get_path(uri: &str) -> Response {
        create_test_app()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    async fn post_json(uri: &str, body: String) -> Response {
        create_test_app()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header("Content-Type", "application/json")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap()
    }

    async fn body_json(response: Response) -> Json {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_hello() {
        let response = get_path("/hello").await;
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"hello world");
    }

    #[tokio::test]
    async fn test_health_live() {
        let response = get_path("/health/live").await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_health_full() {
        let response = get_path("/health").await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["datasets"], 2);
    }

    #[tokio::test]
    async fn test_list_datasets() {
        let response = get_path("/datasets").await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["datasets"][0]["name"], "iris");
        assert_eq!(body["datasets"][0]["rows"], 150);
        assert_eq!(body["datasets"][0]["columns"][4]["type"], "categorical");
    }

    #[tokio::test]
    async fn test_filter_rows() {
        let body = json!({
            "data": "iris",
            "instructions_list": [
                {"column": "Sepal.Length", "operator": "between", "min": 4.9, "max": 5},
                {"column": "Species", "operator": "in", "values": ["setosa", "versicolor"]}
            ]
        });
        let response = post_json("/filter", body.to_string()).await;
        assert_eq!(response.status(), StatusCode::OK);

        let rows = body_json(response).await;
        let rows = rows.as_array().unwrap();
        assert_eq!(rows.len(), 15);
        for row in rows {
            let length = row["Sepal.Length"].as_f64().unwrap();
            assert!((4.9..=5.0).contains(&length));
            assert_ne!(row["Species"], "virginica");
        }

        let keys: Vec<&String> = rows[0].as_object().unwrap().keys().collect();
        assert_eq!(
            keys,
            vec!["Sepal.Length", "Sepal.Width", "Petal.Length", "Petal.Width", "Species"]
        );
    }

    #[tokio::test]
    async fn test_aggregate_rows() {
        let body = json!({
            "data": "iris",
            "instructions_list": {
                "groups": {"column": ["Species"]},
                "aggregates": [
                    {"column": "Sepal.Length", "fun": "mean"},
                    {"column": "Sepal.Length", "fun": "median"}
                ]
            }
        });
        let response = post_json("/aggregate", body.to_string()).await;
        assert_eq!(response.status(), StatusCode::OK);

        let rows = body_json(response).await;
        assert_eq!(
            rows,
            json!([
                {"Species": "setosa", "Sepal.Length_mean": 5.01, "Sepal.Length_median": 5.0},
                {"Species": "versicolor", "Sepal.Length_mean": 5.94, "Sepal.Length_median": 5.9},
                {"Species": "virginica", "Sepal.Length_mean": 6.59, "Sepal.Length_median": 6.5}
            ])
        );
    }

    #[tokio::test]
    async fn test_instructions_as_string() {
        let instructions = r#"[{"column": "cyl", "operator": "in", "values": [6]}]"#;
        let body = json!({"data": "mtcars", "instructions_list": instructions});
        let response = post_json("/filter", body.to_string()).await;
        assert_eq!(response.status(), StatusCode::OK);

        let rows = body_json(response).await;
        assert_eq!(rows.as_array().unwrap().len(), 7);
        assert_eq!(rows[0]["model"], "Mazda RX4");
    }

    #[tokio::test]
    async fn test_validation_error() {
        let body = json!({
            "data": "iris",
            "instructions_list": [{"column": "Petal.Colour", "operator": "in", "values": ["red"]}]
        });
        let response = post_json("/filter", body.to_string()).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        assert!(body["error"]["message"]
            .as_str()
            .unwrap()
            .contains("instructions[0].column"));
        assert!(body["request_id"].is_string());
    }

    #[tokio::test]
    async fn test_type_mismatch() {
        let body = json!({
            "data": "iris",
            "instructions_list": {
                "groups": {"column": ["Species"]},
                "aggregates": [{"column": "Species", "fun": "mean"}]
            }
        });
        let response = post_json("/aggregate", body.to_string()).await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "TYPE_MISMATCH");
    }

    #[tokio::test]
    async fn test_unknown_dataset() {
        let body = json!({"data": "titanic", "instructions_list": []});
        let response = post_json("/filter", body.to_string()).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "DATASET_NOT_FOUND");
    }

    #[tokio::test]
    async fn test_malformed_body() {
        let response = post_json("/filter", "not json".to_string()).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = post_json("/aggregate", r#"{"data": "iris"}"#.to_string()).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }
}
