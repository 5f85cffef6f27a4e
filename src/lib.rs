//! # tabql
//!
//! Declarative queries over in-memory tables: row filters and grouped
//! aggregates described as JSON instructions, evaluated without mutating
//! the source, and served over HTTP.
//!
//! ## Features
//!
//! - **Filtering**: inclusive `between` ranges and `in` membership with type coercion
//! - **Aggregation**: mean, median, sum, min, max, sd, var and count per group
//! - **Validation**: every rejected request names the offending field
//! - **Datasets**: built-in `iris` and `mtcars`, plus a directory of CSV files
//!
//! ## Modules
//!
//! - [`table`]: Typed, immutable columnar tables
//! - [`query`]: Validator, evaluators, combiner and executor
//! - [`datasets`]: Named tables and the CSV loader
//! - [`api`]: REST API server with Axum
//! - [`config`]: TOML configuration with environment overrides
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tabql::datasets;
//! use tabql::query::{self, AggregateFunc, AggregateRequest, FilterClause, FilterRequest};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let iris = datasets::iris()?;
//!
//!     // Rows with Sepal.Length in [4.9, 5] from two species
//!     let request = FilterRequest::default()
//!         .clause(FilterClause::between("Sepal.Length", 4.9, 5.0))
//!         .clause(FilterClause::is_in("Species", ["setosa", "versicolor"]));
//!     let rows = query::filter(&iris, &request)?;
//!     println!("{} matching rows", rows.num_rows());
//!
//!     // Mean Sepal.Length per species
//!     let request = AggregateRequest::group_by(&["Species"])
//!         .aggregate("Sepal.Length", AggregateFunc::Mean);
//!     let summary = query::aggregate(&iris, &request)?;
//!     println!("{}", serde_json::to_string_pretty(&summary.to_records())?);
//!
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod datasets;
pub mod query;
pub mod table;

// Re-export top-level types for convenience
pub use table::{Column, ColumnType, Table, TableError, TableResult, Value};

pub use query::{
    AggregateFunc, AggregateItem, AggregateRequest, FilterClause, FilterOperator, FilterRequest,
    QueryError, QueryResult,
};

pub use datasets::{CsvLoader, DatasetError, DatasetRegistry};

pub use api::{build_router, serve, ApiError, AppState};

pub use config::{ApiConfig, Config, ConfigError, DatasetsConfig, LoggingConfig};
