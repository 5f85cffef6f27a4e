//! Query Executor
//!
//! Runs a request end to end against one table:
//!
//! ```text
//! Payload → Validate → Evaluate (per clause / per aggregate) → Combine → Table
//! ```
//!
//! Any validation or evaluation failure aborts the whole request; partial
//! results are never returned. The source table is never modified.

use std::time::Instant;

use serde_json::Value as Json;
use tracing::debug;

use crate::query::aggregate::apply_aggregate;
use crate::query::ast::{AggregateRequest, FilterRequest};
use crate::query::combine::{combine_aggregates, combine_filters};
use crate::query::error::QueryResult;
use crate::query::filter::apply_clause;
use crate::query::validator::{
    parse_aggregate_request, parse_filter_request, validate_aggregate, validate_filter,
};
use crate::table::Table;

/// Keep the rows that satisfy every clause
///
/// An empty request returns the table unchanged.
pub fn filter(table: &Table, request: &FilterRequest) -> QueryResult<Table> {
    let start = Instant::now();
    validate_filter(table, request)?;

    if request.is_empty() {
        return Ok(table.clone());
    }

    let partials = request
        .clauses()
        .iter()
        .map(|clause| apply_clause(table, clause))
        .collect::<QueryResult<Vec<_>>>()?;
    let result = combine_filters(&partials)?;

    debug!(
        clauses = request.len(),
        rows_in = table.num_rows(),
        rows_out = result.num_rows(),
        elapsed_us = start.elapsed().as_micros() as u64,
        "Filter executed"
    );

    Ok(result)
}

/// Summarise the table per group, one output column per aggregate
pub fn aggregate(table: &Table, request: &AggregateRequest) -> QueryResult<Table> {
    let start = Instant::now();
    validate_aggregate(table, request)?;

    let partials = request
        .aggregates
        .iter()
        .map(|item| apply_aggregate(table, &request.groups, &item.column, item.fun))
        .collect::<QueryResult<Vec<_>>>()?;
    let result = combine_aggregates(&request.groups, &partials)?;

    debug!(
        groups = ?request.groups,
        aggregates = request.aggregates.len(),
        rows_in = table.num_rows(),
        rows_out = result.num_rows(),
        elapsed_us = start.elapsed().as_micros() as u64,
        "Aggregate executed"
    );

    Ok(result)
}

/// Parse a raw filter payload and execute it
pub fn filter_json(table: &Table, payload: &Json) -> QueryResult<Table> {
    let request = parse_filter_request(table, payload)?;
    filter(table, &request)
}

/// Parse a raw aggregate payload and execute it
pub fn aggregate_json(table: &Table, payload: &Json) -> QueryResult<Table> {
    let request = parse_aggregate_request(table, payload)?;
    aggregate(table, &request)
}
