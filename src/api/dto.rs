//! Data Transfer Objects
//!
//! Request and response types for the API endpoints.
//! These types are serialized/deserialized to/from JSON.

use serde::{Deserialize, Serialize};

use crate::datasets::DatasetInfo;

// ============================================
// QUERY DTOs
// ============================================

/// Body of `POST /filter` and `POST /aggregate`
#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    /// Registered dataset name
    pub data: String,
    /// Instructions as structured JSON or as a string holding JSON
    pub instructions_list: serde_json::Value,
}

/// One result row keyed by column name, columns in table order
pub type Record = serde_json::Map<String, serde_json::Value>;

// ============================================
// DATASET DTOs
// ============================================

/// Response of `GET /datasets`
#[derive(Debug, Serialize)]
pub struct DatasetsResponse {
    pub datasets: Vec<DatasetInfo>,
}

// ============================================
// HEALTH DTOs
// ============================================

/// Full health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// "healthy" when at least one dataset is loaded, "degraded" otherwise
    pub status: String,
    pub datasets: usize,
    pub uptime_seconds: u64,
    pub version: String,
}
