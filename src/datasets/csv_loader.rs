//! CSV Loader
//!
//! Reads a delimited file into a [`Table`]. Column types are inferred from
//! the cells unless overridden; empty cells and `NA` are missing values.
//!
//! Inference tries, in order: integer, float, boolean, temporal, text. A
//! column with no present values is text.

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use crate::table::{parse_timestamp, Column, ColumnType, Table, TableError, TableResult, Value};

/// CSV reader with configurable delimiter, null markers and type overrides
pub struct CsvLoader {
    delimiter: u8,
    null_values: Vec<String>,
    column_types: HashMap<String, ColumnType>,
}

impl Default for CsvLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl CsvLoader {
    /// Create a loader with default settings (comma separated, `NA` as null)
    pub fn new() -> Self {
        Self {
            delimiter: b',',
            null_values: vec![String::new(), "NA".to_string()],
            column_types: HashMap::new(),
        }
    }

    /// Set the field delimiter
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Add a string that reads as a missing value
    pub fn with_null_value(mut self, value: &str) -> Self {
        self.null_values.push(value.to_string());
        self
    }

    /// Force a column's type instead of inferring it
    pub fn with_column_type(mut self, column: &str, kind: ColumnType) -> Self {
        self.column_types.insert(column.to_string(), kind);
        self
    }

    /// Load a table from a CSV file
    pub fn load(&self, path: &Path) -> TableResult<Table> {
        let reader = csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .from_path(path)?;
        self.read_all(reader)
    }

    /// Load a table from any reader (used for embedded data and tests)
    pub fn from_reader<R: Read>(&self, source: R) -> TableResult<Table> {
        let reader = csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .from_reader(source);
        self.read_all(reader)
    }

    fn read_all<R: Read>(&self, mut reader: csv::Reader<R>) -> TableResult<Table> {
        let headers: Vec<String> = reader.headers()?.iter().map(|h| h.trim().to_string()).collect();
        let mut cells: Vec<Vec<Option<String>>> = vec![Vec::new(); headers.len()];

        for record in reader.records() {
            let record = record?;
            for (column, field) in cells.iter_mut().zip(record.iter()) {
                let field = field.trim();
                column.push(if self.is_null(field) {
                    None
                } else {
                    Some(field.to_string())
                });
            }
        }

        let columns = headers
            .into_iter()
            .zip(cells)
            .map(|(name, raw)| {
                let kind = match self.column_types.get(&name) {
                    Some(kind) => *kind,
                    None => infer_type(&raw),
                };
                convert(name, kind, raw)
            })
            .collect::<TableResult<Vec<_>>>()?;

        Table::new(columns)
    }

    fn is_null(&self, field: &str) -> bool {
        self.null_values.iter().any(|n| n == field)
    }
}

/// Narrowest type every present cell parses as
pub fn infer_type(cells: &[Option<String>]) -> ColumnType {
    let present: Vec<&str> = cells.iter().flatten().map(String::as_str).collect();
    if present.is_empty() {
        return ColumnType::Text;
    }

    if present.iter().all(|s| s.parse::<i64>().is_ok()) {
        ColumnType::Integer
    } else if present.iter().all(|s| s.parse::<f64>().is_ok()) {
        ColumnType::Float
    } else if present.iter().all(|s| parse_bool(s).is_some()) {
        ColumnType::Boolean
    } else if present.iter().all(|s| parse_timestamp(s).is_some()) {
        ColumnType::Temporal
    } else {
        ColumnType::Text
    }
}

fn convert(name: String, kind: ColumnType, raw: Vec<Option<String>>) -> TableResult<Column> {
    let values = raw
        .into_iter()
        .enumerate()
        .map(|(row, cell)| match cell {
            None => Ok(Value::Null),
            Some(text) => parse_cell(kind, text).ok_or_else(|| {
                TableError::Parse(format!(
                    "row {}: column '{}' expects {}",
                    row + 1,
                    name,
                    kind
                ))
            }),
        })
        .collect::<TableResult<Vec<_>>>()?;

    Ok(Column::new(name, kind, values))
}

fn parse_cell(kind: ColumnType, text: String) -> Option<Value> {
    match kind {
        ColumnType::Integer => text.parse().ok().map(Value::Int),
        ColumnType::Float => text.parse().ok().map(Value::Float),
        ColumnType::Boolean => parse_bool(&text).map(Value::Bool),
        ColumnType::Temporal => parse_timestamp(&text).map(Value::Timestamp),
        ColumnType::Text | ColumnType::Categorical => Some(Value::Text(text)),
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.to_lowercase().as_str() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}
