//! Dataset Routes
//!
//! - GET /datasets - List registered datasets with their schemas

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::api::dto::DatasetsResponse;
use crate::api::state::AppState;

/// GET /datasets
pub async fn list_datasets(State(state): State<Arc<AppState>>) -> Json<DatasetsResponse> {
    Json(DatasetsResponse {
        datasets: state.datasets.describe(),
    })
}
