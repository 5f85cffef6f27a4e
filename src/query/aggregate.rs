//! Aggregate Evaluator
//!
//! Computes one summary column per call: rows are grouped by the full
//! group tuple, groups keep the order in which they first appear in the
//! source table, and the output column is named `<column>_<fun>`.

use std::collections::HashMap;

use crate::query::ast::{output_column_name, AggregateFunc};
use crate::query::error::{QueryError, QueryResult};
use crate::table::{Column, ColumnType, Table, Value};

/// Decimal places kept in float outputs
pub const OUTPUT_PRECISION: u32 = 2;

/// Summarise `column` with `fun` for every distinct group tuple
///
/// The result holds the group columns followed by one output column.
pub fn apply_aggregate(
    table: &Table,
    group_columns: &[String],
    column: &str,
    fun: AggregateFunc,
) -> QueryResult<Table> {
    let source = table
        .column(column)
        .ok_or_else(|| QueryError::unknown_column("column", column))?;

    let mut output_kind = output_type(fun, source.kind())
        .ok_or_else(|| QueryError::type_mismatch(column, fun, source.kind()))?;

    let positions = group_columns
        .iter()
        .map(|name| {
            table
                .column_index(name)
                .ok_or_else(|| QueryError::unknown_column("groups.column", name))
        })
        .collect::<QueryResult<Vec<_>>>()?;

    let groups = group_rows(table, &positions);
    let first_rows: Vec<usize> = groups.iter().map(|rows| rows[0]).collect();

    let mut columns: Vec<Column> = positions
        .iter()
        .map(|&p| table.columns()[p].take(&first_rows))
        .collect();

    let mut values: Vec<Value> = groups
        .iter()
        .map(|rows| summarise(source, rows, fun))
        .collect();

    // an integer sum that left the i64 range widens the whole column
    if output_kind == ColumnType::Integer && values.iter().any(|v| matches!(v, Value::Float(_))) {
        output_kind = ColumnType::Float;
        values = values
            .into_iter()
            .map(|v| match v {
                Value::Int(i) => Value::Float(i as f64),
                other => other,
            })
            .collect();
    }

    columns.push(
        Column::new(output_column_name(column, fun), output_kind, values).rounded(OUTPUT_PRECISION),
    );

    Ok(Table::new(columns)?)
}

/// Row indices of each distinct group tuple, in first-appearance order
pub fn group_rows(table: &Table, positions: &[usize]) -> Vec<Vec<usize>> {
    let mut index: HashMap<Vec<&Value>, usize> = HashMap::new();
    let mut groups: Vec<Vec<usize>> = Vec::new();

    for row in 0..table.num_rows() {
        let key: Vec<&Value> = positions
            .iter()
            .map(|&p| &table.columns()[p].values()[row])
            .collect();

        match index.get(&key) {
            Some(&group) => groups[group].push(row),
            None => {
                index.insert(key, groups.len());
                groups.push(vec![row]);
            }
        }
    }

    groups
}

/// Type of the output column, or `None` if `fun` does not apply to `input`
fn output_type(fun: AggregateFunc, input: ColumnType) -> Option<ColumnType> {
    match fun {
        AggregateFunc::Count => Some(ColumnType::Integer),
        AggregateFunc::Min | AggregateFunc::Max => Some(input),
        AggregateFunc::Sum if input.is_numeric() => Some(input),
        AggregateFunc::Mean | AggregateFunc::Median | AggregateFunc::Sd | AggregateFunc::Var
            if input.is_numeric() =>
        {
            Some(ColumnType::Float)
        }
        _ => None,
    }
}

/// Aggregate one group; missing cells are skipped except by `count`
fn summarise(source: &Column, rows: &[usize], fun: AggregateFunc) -> Value {
    let present = || {
        rows.iter()
            .map(|&r| &source.values()[r])
            .filter(|v| !v.is_null())
    };

    match fun {
        AggregateFunc::Count => Value::Int(rows.len() as i64),
        AggregateFunc::Min => present().min().cloned().unwrap_or(Value::Null),
        AggregateFunc::Max => present().max().cloned().unwrap_or(Value::Null),
        AggregateFunc::Sum if source.kind() == ColumnType::Integer => {
            let ints: Vec<i64> = present()
                .filter_map(|v| match v {
                    Value::Int(i) => Some(*i),
                    _ => None,
                })
                .collect();
            if ints.is_empty() {
                return Value::Null;
            }
            let total: i128 = ints.iter().map(|&i| i as i128).sum();
            i64::try_from(total)
                .map(Value::Int)
                .unwrap_or(Value::Float(total as f64))
        }
        _ => {
            let numbers: Vec<f64> = present().filter_map(Value::as_f64).collect();
            fun.apply(&numbers).map(Value::Float).unwrap_or(Value::Null)
        }
    }
}
