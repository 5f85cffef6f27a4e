//! In-memory tables
//!
//! The value model every query operates on:
//!
//! - **Types**: `Value`, `ColumnType`, `Column`, `Table`
//! - **Errors**: `TableError` for invariant violations and load failures
//!
//! Tables are immutable. Filtering and aggregation build new tables and
//! never touch their input.

mod error;
mod types;

pub use error::{TableError, TableResult};
pub use types::{format_timestamp, parse_timestamp, round_to, Column, ColumnType, Table, Value};
