//! Query error types
//!
//! Two failure kinds reach callers: a request that is malformed or names
//! something that does not exist (`Validation`), and an operation applied
//! to a column whose type cannot support it (`TypeMismatch`). Both are
//! deterministic for a given table and request.

use thiserror::Error;

use crate::table::{ColumnType, TableError};

/// Errors that can occur during query validation and evaluation
#[derive(Error, Debug)]
pub enum QueryError {
    /// Malformed or unaddressable request
    #[error("Validation error at `{field}`: {message}")]
    Validation { field: String, message: String },

    /// Operator or function applied to an incompatible column
    #[error("Type mismatch: {operation} cannot be applied to column `{column}` of type {column_type}")]
    TypeMismatch {
        column: String,
        operation: String,
        column_type: ColumnType,
    },

    /// A combiner was called with no tables
    #[error("Nothing to combine: at least one table is required")]
    EmptyCombination,

    /// Tables handed to the filter combiner do not share a schema
    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    /// Building a result table failed
    #[error("Table error: {0}")]
    Table(#[from] TableError),
}

impl QueryError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn type_mismatch(
        column: impl Into<String>,
        operation: impl std::fmt::Display,
        column_type: ColumnType,
    ) -> Self {
        Self::TypeMismatch {
            column: column.into(),
            operation: operation.to_string(),
            column_type,
        }
    }

    /// Validation error for a reference to a column the table lacks
    pub fn unknown_column(field: impl Into<String>, column: &str) -> Self {
        Self::validation(field, format!("column '{}' does not exist", column))
    }

    /// Validation error for a value outside a closed set
    pub fn not_allowed(field: impl Into<String>, kind: &str, value: &str, allowed: &[&str]) -> Self {
        Self::validation(
            field,
            format!("unknown {} '{}' (allowed: {})", kind, value, allowed.join(", ")),
        )
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }

    pub fn is_type_mismatch(&self) -> bool {
        matches!(self, Self::TypeMismatch { .. })
    }
}

/// Result type for query operations
pub type QueryResult<T> = Result<T, QueryError>;
