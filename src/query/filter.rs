//! Filter Evaluator
//!
//! Applies one clause to a table and returns the matching rows, in their
//! original order and without deduplication.
//!
//! # Coercion rules for `in`
//!
//! | column type          | operand handling                                   |
//! |----------------------|----------------------------------------------------|
//! | text, categorical    | compared as text (numbers/booleans via JSON text)  |
//! | boolean              | text form compared case-insensitively to true/false |
//! | integer, float       | compared numerically; numeric strings are parsed   |
//! | temporal             | numbers are epoch ms; strings are dates/date-times |
//!
//! Operands that cannot be brought into a numeric, temporal or boolean
//! column's representation never match. Missing cells never match.

use std::collections::HashSet;

use crate::query::ast::{FilterClause, FilterOperator, Predicate, Scalar};
use crate::query::error::{QueryError, QueryResult};
use crate::table::{parse_timestamp, Column, ColumnType, Table, Value};

/// Apply a single filter clause
///
/// A clause with missing operands returns the table unchanged.
pub fn apply_clause(table: &Table, clause: &FilterClause) -> QueryResult<Table> {
    if clause.predicate.is_noop() {
        return Ok(table.clone());
    }

    let column = table
        .column(&clause.column)
        .ok_or_else(|| QueryError::unknown_column("column", &clause.column))?;

    let rows = match &clause.predicate {
        Predicate::Between {
            min: Some(min),
            max: Some(max),
        } => between(column, min, max)?,
        Predicate::In { values } => membership(column, values)?,
        Predicate::Between { .. } => return Ok(table.clone()),
    };

    Ok(table.take(&rows))
}

/// Rows where `min <= value <= max`
fn between(column: &Column, min: &Scalar, max: &Scalar) -> QueryResult<Vec<usize>> {
    let kind = column.kind();
    if !(kind.is_numeric() || kind.is_temporal()) {
        return Err(QueryError::type_mismatch(
            column.name(),
            FilterOperator::Between,
            kind,
        ));
    }

    let min = numeric_operand(column, FilterOperator::Between, min)?;
    let max = numeric_operand(column, FilterOperator::Between, max)?;

    Ok(select(column, |value| {
        ordinal(value).map(|v| min <= v && v <= max).unwrap_or(false)
    }))
}

/// Rows whose value, after coercion, is one of `values`
fn membership(column: &Column, values: &[Scalar]) -> QueryResult<Vec<usize>> {
    let kind = column.kind();

    let rows = match kind {
        ColumnType::Text | ColumnType::Categorical => {
            let targets: HashSet<String> = values.iter().map(Scalar::to_text).collect();
            select(column, |value| match value {
                Value::Text(s) => targets.contains(s),
                _ => false,
            })
        }
        ColumnType::Boolean => {
            let targets: HashSet<bool> = values.iter().filter_map(boolean_operand).collect();
            select(column, |value| match value {
                Value::Bool(b) => targets.contains(b),
                _ => false,
            })
        }
        ColumnType::Integer | ColumnType::Float | ColumnType::Temporal => {
            let targets: Vec<f64> = values
                .iter()
                .filter_map(|v| numeric_operand(column, FilterOperator::In, v).ok())
                .collect();
            select(column, |value| {
                ordinal(value)
                    .map(|v| targets.iter().any(|t| *t == v))
                    .unwrap_or(false)
            })
        }
    };

    Ok(rows)
}

fn select(column: &Column, predicate: impl Fn(&Value) -> bool) -> Vec<usize> {
    column
        .values()
        .iter()
        .enumerate()
        .filter(|&(_, value)| predicate(value))
        .map(|(i, _)| i)
        .collect()
}

/// Position of a numeric or temporal cell on the number line
fn ordinal(value: &Value) -> Option<f64> {
    match value {
        Value::Int(v) => Some(*v as f64),
        Value::Float(v) => Some(*v),
        Value::Timestamp(ms) => Some(*ms as f64),
        _ => None,
    }
}

/// Bring an operand into a numeric or temporal column's representation
fn numeric_operand(column: &Column, operator: FilterOperator, operand: &Scalar) -> QueryResult<f64> {
    let coerced = match (column.kind(), operand) {
        (_, Scalar::Number(n)) => Some(*n),
        (ColumnType::Temporal, Scalar::Text(s)) => parse_timestamp(s).map(|ms| ms as f64),
        (_, Scalar::Text(s)) => s.trim().parse::<f64>().ok(),
        (_, Scalar::Bool(_)) => None,
    };

    coerced.ok_or_else(|| {
        QueryError::type_mismatch(
            column.name(),
            format!("{} with operand {}", operator, operand),
            column.kind(),
        )
    })
}

fn boolean_operand(operand: &Scalar) -> Option<bool> {
    match operand.to_text().to_lowercase().as_str() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> Table {
        Table::new(vec![
            Column::new(
                "x",
                ColumnType::Float,
                vec![
                    Value::Float(4.8),
                    Value::Float(4.9),
                    Value::Null,
                    Value::Float(5.0),
                    Value::Float(5.1),
                    Value::Float(4.9),
                ],
            ),
            Column::integer("n", [1, 2, 3, 4, 5, 2]),
            Column::categorical("species", ["a", "b", "a", "c", "b", "b"]),
            Column::boolean("flag", [true, false, true, false, true, false]),
            Column::temporal("day", [0, 86_400_000, 172_800_000, 259_200_000, 345_600_000, 86_400_000]),
        ])
        .unwrap()
    }

    fn column_values(table: &Table, name: &str) -> Vec<Value> {
        table.column(name).unwrap().values().to_vec()
    }

    #[test]
    fn test_between_inclusive() {
        let result = apply_clause(&table(), &FilterClause::between("x", 4.9, 5.0)).unwrap();
        assert_eq!(
            column_values(&result, "x"),
            vec![Value::Float(4.9), Value::Float(5.0), Value::Float(4.9)]
        );
    }

    #[test]
    fn test_between_keeps_duplicates_and_order() {
        let result = apply_clause(&table(), &FilterClause::between("n", 2.0, 2.0)).unwrap();
        assert_eq!(result.num_rows(), 2);
        assert_eq!(column_values(&result, "x"), vec![Value::Float(4.9), Value::Float(4.9)]);
    }

    #[test]
    fn test_between_on_temporal() {
        let clause = FilterClause::new(
            "day",
            Predicate::Between {
                min: Some(Scalar::from("1970-01-02")),
                max: Some(Scalar::from("1970-01-03")),
            },
        );
        let result = apply_clause(&table(), &clause).unwrap();
        assert_eq!(column_values(&result, "n"), vec![Value::Int(2), Value::Int(3), Value::Int(2)]);

        let by_ms = apply_clause(&table(), &FilterClause::between("day", 0.0, 0.0)).unwrap();
        assert_eq!(by_ms.num_rows(), 1);
    }

    #[test]
    fn test_between_rejects_text_column() {
        let err = apply_clause(&table(), &FilterClause::between("species", 1.0, 2.0)).unwrap_err();
        assert!(matches!(
            err,
            QueryError::TypeMismatch { ref column, column_type: ColumnType::Categorical, .. } if column == "species"
        ));
    }

    #[test]
    fn test_missing_operands_are_noop() {
        let source = table();
        let half_open = FilterClause::new(
            "x",
            Predicate::Between {
                min: Some(Scalar::Number(5.0)),
                max: None,
            },
        );
        assert_eq!(apply_clause(&source, &half_open).unwrap(), source);

        let empty_in = FilterClause::is_in("species", Vec::<Scalar>::new());
        assert_eq!(apply_clause(&source, &empty_in).unwrap(), source);

        // operands missing, so even an incompatible column passes through
        let text_between = FilterClause::new("species", Predicate::Between { min: None, max: None });
        assert_eq!(apply_clause(&source, &text_between).unwrap(), source);
    }

    #[test]
    fn test_in_text() {
        let result = apply_clause(&table(), &FilterClause::is_in("species", ["a", "c"])).unwrap();
        assert_eq!(column_values(&result, "n"), vec![Value::Int(1), Value::Int(3), Value::Int(4)]);
    }

    #[test]
    fn test_in_numeric_coercion() {
        let clause = FilterClause::is_in("n", [Scalar::from(2i64), Scalar::from("5")]);
        let result = apply_clause(&table(), &clause).unwrap();
        assert_eq!(column_values(&result, "n"), vec![Value::Int(2), Value::Int(5), Value::Int(2)]);

        let none = apply_clause(&table(), &FilterClause::is_in("n", ["two"])).unwrap();
        assert!(none.is_empty());

        let mixed = FilterClause::is_in("n", [Scalar::from("2"), Scalar::from("abc")]);
        let result = apply_clause(&table(), &mixed).unwrap();
        assert_eq!(column_values(&result, "n"), vec![Value::Int(2), Value::Int(2)]);
    }

    #[test]
    fn test_in_unparseable_date_never_matches() {
        let clause = FilterClause::is_in("day", [Scalar::from("not a date"), Scalar::from("1970-01-01")]);
        let result = apply_clause(&table(), &clause).unwrap();
        assert_eq!(column_values(&result, "n"), vec![Value::Int(1)]);
    }

    #[test]
    fn test_in_boolean() {
        let clause = FilterClause::is_in("flag", [Scalar::from("TRUE")]);
        let result = apply_clause(&table(), &clause).unwrap();
        assert_eq!(result.num_rows(), 3);

        let clause = FilterClause::is_in("flag", [false]);
        let result = apply_clause(&table(), &clause).unwrap();
        assert_eq!(column_values(&result, "n"), vec![Value::Int(2), Value::Int(4), Value::Int(2)]);
    }

    #[test]
    fn test_null_never_matches() {
        let result = apply_clause(&table(), &FilterClause::between("x", f64::MIN, f64::MAX)).unwrap();
        assert_eq!(result.num_rows(), 5);
    }

    #[test]
    fn test_source_not_mutated() {
        let source = table();
        let before = source.clone();
        let _ = apply_clause(&source, &FilterClause::is_in("species", ["b"])).unwrap();
        assert_eq!(source, before);
    }
}
