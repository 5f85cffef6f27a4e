//! tabql Query Engine
//!
//! Evaluates declarative instructions against an in-memory [`Table`]:
//!
//! - **AST**: typed filter and aggregate requests
//! - **Validator**: turns raw JSON payloads into requests, field by field
//! - **Filter / Aggregate**: evaluate one clause or one aggregate
//! - **Combine**: intersect filter outputs, left-join aggregate outputs
//! - **Executor**: validate → evaluate → combine
//!
//! # Instruction Language
//!
//! ```text
//! filter:    [{column, operator: between, min, max} | {column, operator: in, values}]
//! aggregate: {groups: {column: [..]}, aggregates: [{column, fun}]}
//!            fun ∈ mean | median | sum | min | max | sd | var | count
//! ```
//!
//! # Examples
//!
//! ## Using Request Builders
//!
//! ```rust,ignore
//! use tabql::query::{self, AggregateFunc, AggregateRequest, FilterClause, FilterRequest};
//!
//! let request = FilterRequest::default()
//!     .clause(FilterClause::between("Sepal.Length", 4.9, 5.0))
//!     .clause(FilterClause::is_in("Species", ["setosa", "versicolor"]));
//! let rows = query::filter(&iris, &request)?;
//!
//! let request = AggregateRequest::group_by(&["Species"])
//!     .aggregate("Sepal.Length", AggregateFunc::Mean);
//! let summary = query::aggregate(&iris, &request)?;
//! ```
//!
//! ## Using Raw Payloads
//!
//! ```rust,ignore
//! let summary = query::aggregate_json(&iris, &serde_json::json!({
//!     "groups": {"column": ["Species"]},
//!     "aggregates": [{"column": "Sepal.Length", "fun": "median"}]
//! }))?;
//! ```
//!
//! [`Table`]: crate::table::Table

mod aggregate;
mod ast;
mod combine;
mod error;
mod executor;
mod filter;
mod validator;

pub use aggregate::{apply_aggregate, group_rows, OUTPUT_PRECISION};
pub use ast::{
    output_column_name, AggregateFunc, AggregateItem, AggregateRequest, FilterClause,
    FilterOperator, FilterRequest, Predicate, Scalar,
};
pub use combine::{combine_aggregates, combine_filters};
pub use error::{QueryError, QueryResult};
pub use executor::{aggregate, aggregate_json, filter, filter_json};
pub use filter::apply_clause;
pub use validator::{
    decode_payload, parse_aggregate_request, parse_filter_request, validate_aggregate,
    validate_filter,
};
