//! Query Routes
//!
//! Endpoints that evaluate instructions against a registered dataset.
//!
//! - POST /filter - Keep rows matching every clause
//! - POST /aggregate - Summarise per group
//!
//! Both return the result as an array of row objects.

use axum::{extract::rejection::JsonRejection, extract::State, Json};
use std::sync::Arc;
use std::time::Instant;

use crate::api::dto::{QueryRequest, Record};
use crate::api::error::ApiResult;
use crate::api::state::AppState;
use crate::query;
use crate::table::Table;

/// POST /filter
pub async fn filter(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<QueryRequest>, JsonRejection>,
) -> ApiResult<Json<Vec<Record>>> {
    let Json(req) = payload?;
    run(&state, "filter", &req, query::filter_json)
}

/// POST /aggregate
pub async fn aggregate(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<QueryRequest>, JsonRejection>,
) -> ApiResult<Json<Vec<Record>>> {
    let Json(req) = payload?;
    run(&state, "aggregate", &req, query::aggregate_json)
}

fn run(
    state: &AppState,
    operation: &str,
    req: &QueryRequest,
    execute: fn(&Table, &serde_json::Value) -> query::QueryResult<Table>,
) -> ApiResult<Json<Vec<Record>>> {
    let start = Instant::now();
    let table = state.datasets.resolve(&req.data)?;
    let result = execute(&table, &req.instructions_list)?;

    tracing::info!(
        operation,
        dataset = %req.data,
        rows = result.num_rows(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Query served"
    );

    Ok(Json(result.to_records()))
}
