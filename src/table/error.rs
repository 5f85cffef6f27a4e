//! Table error types
//!
//! Defines all errors that can occur while building or loading tables.

use thiserror::Error;

use super::types::ColumnType;

/// Errors that can occur in the table layer
#[derive(Error, Debug)]
pub enum TableError {
    /// Two columns share a name
    #[error("Duplicate column name: {0}")]
    DuplicateColumn(String),

    /// Columns of unequal length
    #[error("Column {column} has {actual} rows, expected {expected}")]
    LengthMismatch {
        column: String,
        expected: usize,
        actual: usize,
    },

    /// A cell does not match its column's declared type
    #[error("Column {column} is declared {expected} but holds a {found} value")]
    ValueType {
        column: String,
        expected: ColumnType,
        found: &'static str,
    },

    /// Requested column does not exist
    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    /// I/O operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV reading failed
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A cell could not be parsed as its column type
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Result type alias for table operations
pub type TableResult<T> = Result<T, TableError>;
