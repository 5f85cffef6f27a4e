//! Core data types for in-memory tables
//!
//! This module defines the fundamental types the query engine operates on:
//! - `Value`: A single cell, possibly missing
//! - `ColumnType`: The declared type of a column
//! - `Column`: A named, typed vector of values
//! - `Table`: An ordered set of equal-length columns

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::hash::{Hash, Hasher};

use super::error::{TableError, TableResult};

/// Declared type of a column
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    /// 64-bit signed integers
    Integer,
    /// 64-bit floats
    Float,
    /// Free-form text
    Text,
    /// Text drawn from a small set of levels (a factor)
    Categorical,
    /// true / false
    Boolean,
    /// UTC timestamps, milliseconds since the Unix epoch
    Temporal,
}

impl ColumnType {
    /// Get all column types for iteration
    pub fn all() -> &'static [ColumnType] {
        &[
            ColumnType::Integer,
            ColumnType::Float,
            ColumnType::Text,
            ColumnType::Categorical,
            ColumnType::Boolean,
            ColumnType::Temporal,
        ]
    }

    /// Integer or float
    pub fn is_numeric(&self) -> bool {
        matches!(self, ColumnType::Integer | ColumnType::Float)
    }

    pub fn is_temporal(&self) -> bool {
        matches!(self, ColumnType::Temporal)
    }

    /// Text-backed types (compared as strings)
    pub fn is_textual(&self) -> bool {
        matches!(self, ColumnType::Text | ColumnType::Categorical)
    }

    /// Parse from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "integer" | "int" => Some(Self::Integer),
            "float" | "double" | "numeric" => Some(Self::Float),
            "text" | "string" => Some(Self::Text),
            "categorical" | "factor" => Some(Self::Categorical),
            "boolean" | "bool" | "logical" => Some(Self::Boolean),
            "temporal" | "date" | "datetime" => Some(Self::Temporal),
            _ => None,
        }
    }

    /// Whether a (non-missing) value may be stored in a column of this type
    fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (_, Value::Null) => true,
            (ColumnType::Integer, Value::Int(_)) => true,
            (ColumnType::Float, Value::Float(_)) => true,
            (ColumnType::Text | ColumnType::Categorical, Value::Text(_)) => true,
            (ColumnType::Boolean, Value::Bool(_)) => true,
            (ColumnType::Temporal, Value::Timestamp(_)) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for ColumnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ColumnType::Integer => write!(f, "integer"),
            ColumnType::Float => write!(f, "float"),
            ColumnType::Text => write!(f, "text"),
            ColumnType::Categorical => write!(f, "categorical"),
            ColumnType::Boolean => write!(f, "boolean"),
            ColumnType::Temporal => write!(f, "temporal"),
        }
    }
}

/// A single cell value
///
/// Equality, hashing and ordering are total so that rows can be used as
/// set keys: `-0.0` equals `0.0` and all NaNs are equal to each other.
#[derive(Debug, Clone)]
pub enum Value {
    /// Missing value
    Null,
    Int(i64),
    Float(f64),
    /// Text and categorical cells
    Text(String),
    Bool(bool),
    /// Milliseconds since the Unix epoch (UTC)
    Timestamp(i64),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Numeric view of integer and float cells
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Short name of the variant, for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
            Value::Text(_) => "text",
            Value::Bool(_) => "boolean",
            Value::Timestamp(_) => "timestamp",
        }
    }

    /// Round float cells to `places` decimal places; other cells are unchanged
    pub fn rounded(&self, places: u32) -> Value {
        match self {
            Value::Float(v) => Value::Float(round_to(*v, places)),
            other => other.clone(),
        }
    }

    /// Convert to a JSON value for row-major responses
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Int(v) => serde_json::Value::from(*v),
            Value::Float(v) => serde_json::Number::from_f64(*v)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Text(s) => serde_json::Value::String(s.clone()),
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Timestamp(ms) => format_timestamp(*ms)
                .map(serde_json::Value::String)
                .unwrap_or(serde_json::Value::Null),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Int(_) => 2,
            Value::Float(_) => 3,
            Value::Timestamp(_) => 4,
            Value::Text(_) => 5,
        }
    }
}

/// Collapse -0.0 onto 0.0 and every NaN onto one bit pattern
fn canonical(v: f64) -> f64 {
    if v == 0.0 {
        0.0
    } else if v.is_nan() {
        f64::NAN
    } else {
        v
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Null => {}
            Value::Int(v) | Value::Timestamp(v) => v.hash(state),
            Value::Float(v) => canonical(*v).to_bits().hash(state),
            Value::Text(s) => s.hash(state),
            Value::Bool(b) => b.hash(state),
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) | (Value::Timestamp(a), Value::Timestamp(b)) => a.cmp(b),
            (Value::Float(a), Value::Float(b)) => canonical(*a).total_cmp(&canonical(*b)),
            (Value::Text(a), Value::Text(b)) => a.cmp(b),
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => write!(f, "NA"),
            Value::Int(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Text(s) => write!(f, "{}", s),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Timestamp(ms) => match format_timestamp(*ms) {
                Some(s) => write!(f, "{}", s),
                None => write!(f, "{}", ms),
            },
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

/// Round half away from zero to `places` decimal places
pub fn round_to(value: f64, places: u32) -> f64 {
    if !value.is_finite() {
        return value;
    }
    let factor = 10f64.powi(places as i32);
    let scaled = value * factor;
    if scaled.is_infinite() {
        return value;
    }
    scaled.round() / factor
}

/// Format milliseconds since the epoch as RFC 3339 (UTC)
pub fn format_timestamp(ms: i64) -> Option<String> {
    Utc.timestamp_millis_opt(ms)
        .single()
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Secs, true))
}

/// Parse a date or date-time string into milliseconds since the epoch
///
/// Accepts RFC 3339, `YYYY-MM-DDTHH:MM:SS`, `YYYY-MM-DD HH:MM:SS`,
/// `YYYY-MM-DD` and `YYYY/MM/DD`. Dates without a time are midnight UTC.
pub fn parse_timestamp(s: &str) -> Option<i64> {
    let s = s.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc).timestamp_millis());
    }

    for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.and_utc().timestamp_millis());
        }
    }

    for fmt in ["%Y-%m-%d", "%Y/%m/%d"] {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return date
                .and_hms_opt(0, 0, 0)
                .map(|dt| dt.and_utc().timestamp_millis());
        }
    }

    None
}

/// A named, typed column
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    name: String,
    kind: ColumnType,
    values: Vec<Value>,
}

impl Column {
    /// Create a column from raw values; types are checked by [`Table::new`]
    pub fn new(name: impl Into<String>, kind: ColumnType, values: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            kind,
            values,
        }
    }

    pub fn integer(name: impl Into<String>, values: impl IntoIterator<Item = i64>) -> Self {
        Self::new(name, ColumnType::Integer, values.into_iter().map(Value::Int).collect())
    }

    pub fn float(name: impl Into<String>, values: impl IntoIterator<Item = f64>) -> Self {
        Self::new(name, ColumnType::Float, values.into_iter().map(Value::Float).collect())
    }

    pub fn text<S: Into<String>>(name: impl Into<String>, values: impl IntoIterator<Item = S>) -> Self {
        Self::new(
            name,
            ColumnType::Text,
            values.into_iter().map(|s| Value::Text(s.into())).collect(),
        )
    }

    pub fn categorical<S: Into<String>>(
        name: impl Into<String>,
        values: impl IntoIterator<Item = S>,
    ) -> Self {
        Self::new(
            name,
            ColumnType::Categorical,
            values.into_iter().map(|s| Value::Text(s.into())).collect(),
        )
    }

    pub fn boolean(name: impl Into<String>, values: impl IntoIterator<Item = bool>) -> Self {
        Self::new(name, ColumnType::Boolean, values.into_iter().map(Value::Bool).collect())
    }

    /// Timestamps in milliseconds since the epoch
    pub fn temporal(name: impl Into<String>, values: impl IntoIterator<Item = i64>) -> Self {
        Self::new(
            name,
            ColumnType::Temporal,
            values.into_iter().map(Value::Timestamp).collect(),
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ColumnType {
        self.kind
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, row: usize) -> Option<&Value> {
        self.values.get(row)
    }

    /// Builder method: change the declared type (e.g. text to categorical)
    pub fn with_kind(mut self, kind: ColumnType) -> Self {
        self.kind = kind;
        self
    }

    /// Gather the given rows into a new column
    pub fn take(&self, rows: &[usize]) -> Column {
        Column {
            name: self.name.clone(),
            kind: self.kind,
            values: rows.iter().map(|&i| self.values[i].clone()).collect(),
        }
    }

    /// Round float cells; no-op for other types
    pub fn rounded(&self, places: u32) -> Column {
        if self.kind != ColumnType::Float {
            return self.clone();
        }
        Column {
            name: self.name.clone(),
            kind: self.kind,
            values: self.values.iter().map(|v| v.rounded(places)).collect(),
        }
    }
}

/// An ordered set of named, typed, equal-length columns
///
/// Column names are unique and every column holds values of its declared
/// type (or `Null`). Tables are immutable once built; every operation
/// returns a new table.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    columns: Vec<Column>,
    num_rows: usize,
}

impl Table {
    /// Build a table, checking the column invariants
    pub fn new(columns: Vec<Column>) -> TableResult<Self> {
        let num_rows = columns.first().map(|c| c.len()).unwrap_or(0);
        let mut seen = HashSet::new();

        for column in &columns {
            if !seen.insert(column.name.as_str()) {
                return Err(TableError::DuplicateColumn(column.name.clone()));
            }
            if column.len() != num_rows {
                return Err(TableError::LengthMismatch {
                    column: column.name.clone(),
                    expected: num_rows,
                    actual: column.len(),
                });
            }
            if let Some(bad) = column.values.iter().find(|v| !column.kind.accepts(v)) {
                return Err(TableError::ValueType {
                    column: column.name.clone(),
                    expected: column.kind,
                    found: bad.type_name(),
                });
            }
        }

        Ok(Self { columns, num_rows })
    }

    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.num_rows == 0
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Look up a column by name
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Name and type of every column, in order
    pub fn schema(&self) -> Vec<(String, ColumnType)> {
        self.columns
            .iter()
            .map(|c| (c.name.clone(), c.kind))
            .collect()
    }

    /// All cells of one row, in column order
    pub fn row(&self, index: usize) -> Vec<&Value> {
        self.columns.iter().map(|c| &c.values[index]).collect()
    }

    /// Cells of one row restricted to the given column positions
    pub fn row_key(&self, index: usize, positions: &[usize]) -> Vec<Value> {
        positions
            .iter()
            .map(|&p| self.columns[p].values[index].clone())
            .collect()
    }

    /// Gather the given rows (in the given order) into a new table
    pub fn take(&self, rows: &[usize]) -> Table {
        Table {
            columns: self.columns.iter().map(|c| c.take(rows)).collect(),
            num_rows: rows.len(),
        }
    }

    /// Round every float column to `places` decimal places
    pub fn rounded(&self, places: u32) -> Table {
        Table {
            columns: self.columns.iter().map(|c| c.rounded(places)).collect(),
            num_rows: self.num_rows,
        }
    }

    /// Row-major view: one JSON object per row keyed by column name
    pub fn to_records(&self) -> Vec<serde_json::Map<String, serde_json::Value>> {
        (0..self.num_rows)
            .map(|row| {
                self.columns
                    .iter()
                    .map(|c| (c.name.clone(), c.values[row].to_json()))
                    .collect()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        Table::new(vec![
            Column::float("x", [1.0, 2.5, -0.0]),
            Column::text("name", ["a", "b", "c"]),
        ])
        .unwrap()
    }

    #[test]
    fn test_table_creation() {
        let table = sample();
        assert_eq!(table.num_rows(), 3);
        assert_eq!(table.num_columns(), 2);
        assert_eq!(table.column_names(), vec!["x", "name"]);
        assert!(table.has_column("name"));
        assert!(!table.has_column("missing"));
    }

    #[test]
    fn test_duplicate_column_rejected() {
        let result = Table::new(vec![Column::float("x", [1.0]), Column::float("x", [2.0])]);
        assert!(matches!(result, Err(TableError::DuplicateColumn(name)) if name == "x"));
    }

    #[test]
    fn test_length_mismatch_rejected() {
        let result = Table::new(vec![Column::float("x", [1.0, 2.0]), Column::text("y", ["a"])]);
        assert!(matches!(
            result,
            Err(TableError::LengthMismatch { expected: 2, actual: 1, .. })
        ));
    }

    #[test]
    fn test_value_type_checked() {
        let column = Column::new("x", ColumnType::Integer, vec![Value::Int(1), Value::Text("a".into())]);
        let result = Table::new(vec![column]);
        assert!(matches!(result, Err(TableError::ValueType { found: "text", .. })));

        let with_null = Column::new("x", ColumnType::Integer, vec![Value::Int(1), Value::Null]);
        assert!(Table::new(vec![with_null]).is_ok());
    }

    #[test]
    fn test_take_preserves_order() {
        let table = sample();
        let taken = table.take(&[2, 0]);
        assert_eq!(taken.num_rows(), 2);
        assert_eq!(taken.column("name").unwrap().values()[0], Value::from("c"));
        assert_eq!(taken.column("name").unwrap().values()[1], Value::from("a"));
    }

    #[test]
    fn test_value_equality_is_total() {
        assert_eq!(Value::Float(-0.0), Value::Float(0.0));
        assert_eq!(Value::Float(f64::NAN), Value::Float(f64::NAN));
        assert_ne!(Value::Int(1), Value::Timestamp(1));
        assert!(Value::Null < Value::Int(-5));
        assert!(Value::from("apple") < Value::from("banana"));
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(5.006, 2), 5.01);
        assert_eq!(round_to(5.936, 2), 5.94);
        assert_eq!(round_to(-1.005, 0), -1.0);
        assert!(round_to(f64::NAN, 2).is_nan());
    }

    #[test]
    fn test_round_to_near_float_limits() {
        assert_eq!(round_to(1e307, 2), 1e307);
        assert_eq!(round_to(f64::MAX, 2), f64::MAX);
        assert_eq!(round_to(-f64::MAX, 2), -f64::MAX);
        assert!(round_to(f64::MAX, 2).is_finite());
    }

    #[test]
    fn test_rounded_only_touches_floats() {
        let table = Table::new(vec![
            Column::float("f", [1.23456]),
            Column::integer("i", [7]),
        ])
        .unwrap();
        let rounded = table.rounded(2);
        assert_eq!(rounded.column("f").unwrap().values()[0], Value::Float(1.23));
        assert_eq!(rounded.column("i").unwrap().values()[0], Value::Int(7));
    }

    #[test]
    fn test_parse_timestamp() {
        assert_eq!(parse_timestamp("1970-01-02"), Some(86_400_000));
        assert_eq!(parse_timestamp("1970-01-01T00:00:01Z"), Some(1000));
        assert_eq!(parse_timestamp("1970-01-01 00:01:00"), Some(60_000));
        assert_eq!(parse_timestamp("not a date"), None);
    }

    #[test]
    fn test_to_records() {
        let table = Table::new(vec![
            Column::float("x", [1.5]),
            Column::temporal("t", [0]),
            Column::new("n", ColumnType::Boolean, vec![Value::Null]),
        ])
        .unwrap();
        let records = table.to_records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["x"], serde_json::json!(1.5));
        assert_eq!(records[0]["t"], serde_json::json!("1970-01-01T00:00:00Z"));
        assert_eq!(records[0]["n"], serde_json::Value::Null);
        let keys: Vec<&String> = records[0].keys().collect();
        assert_eq!(keys, vec!["x", "t", "n"]);
    }
}
