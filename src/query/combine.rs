//! Result Combiner
//!
//! Merges the per-clause and per-aggregate tables into one result.
//!
//! - Filters combine by intersection: a row survives if it is present in
//!   every clause's output. Order follows the first table; duplicates
//!   collapse to one row.
//! - Aggregates combine by a left join on the group tuple, anchored on the
//!   first summary table. Group tuples absent from the anchor are dropped;
//!   anchor tuples absent from a later table get missing cells.

use std::collections::{HashMap, HashSet};

use crate::query::aggregate::OUTPUT_PRECISION;
use crate::query::error::{QueryError, QueryResult};
use crate::table::{Column, Table, Value};

/// Intersect clause outputs row-wise
///
/// A single table is returned unchanged.
pub fn combine_filters(tables: &[Table]) -> QueryResult<Table> {
    let (first, rest) = tables.split_first().ok_or(QueryError::EmptyCombination)?;
    if rest.is_empty() {
        return Ok(first.clone());
    }

    let schema = first.schema();
    if let Some(other) = rest.iter().find(|t| t.schema() != schema) {
        return Err(QueryError::SchemaMismatch(format!(
            "expected columns {:?}, found {:?}",
            first.column_names(),
            other.column_names()
        )));
    }

    let others: Vec<HashSet<Vec<&Value>>> = rest
        .iter()
        .map(|t| (0..t.num_rows()).map(|row| t.row(row)).collect())
        .collect();

    let mut seen: HashSet<Vec<&Value>> = HashSet::new();
    let mut keep = Vec::new();
    for row in 0..first.num_rows() {
        let cells = first.row(row);
        if others.iter().all(|set| set.contains(&cells)) && seen.insert(cells) {
            keep.push(row);
        }
    }

    Ok(first.take(&keep))
}

/// Left-join summary tables on `group_columns`, anchored on the first
pub fn combine_aggregates(group_columns: &[String], tables: &[Table]) -> QueryResult<Table> {
    let (anchor, rest) = tables.split_first().ok_or(QueryError::EmptyCombination)?;

    let mut joined = anchor.clone();
    for right in rest {
        joined = left_join(&joined, right, group_columns)?;
    }

    Ok(joined.rounded(OUTPUT_PRECISION))
}

fn left_join(left: &Table, right: &Table, keys: &[String]) -> QueryResult<Table> {
    let left_keys = key_positions(left, keys)?;
    let right_keys = key_positions(right, keys)?;

    let mut index: HashMap<Vec<&Value>, Vec<usize>> = HashMap::new();
    for row in 0..right.num_rows() {
        index.entry(key_of(right, row, &right_keys)).or_default().push(row);
    }

    // (left row, matching right row) pairs in left order
    let mut pairs: Vec<(usize, Option<usize>)> = Vec::with_capacity(left.num_rows());
    for row in 0..left.num_rows() {
        match index.get(&key_of(left, row, &left_keys)) {
            Some(matches) => pairs.extend(matches.iter().map(|&m| (row, Some(m)))),
            None => pairs.push((row, None)),
        }
    }

    let left_rows: Vec<usize> = pairs.iter().map(|&(l, _)| l).collect();
    let mut columns: Vec<Column> = left.columns().iter().map(|c| c.take(&left_rows)).collect();

    for (position, column) in right.columns().iter().enumerate() {
        if right_keys.contains(&position) {
            continue;
        }
        let values = pairs
            .iter()
            .map(|&(_, r)| r.map(|r| column.values()[r].clone()).unwrap_or(Value::Null))
            .collect();
        columns.push(Column::new(column.name(), column.kind(), values));
    }

    Ok(Table::new(columns)?)
}

fn key_positions(table: &Table, keys: &[String]) -> QueryResult<Vec<usize>> {
    keys.iter()
        .map(|key| {
            table
                .column_index(key)
                .ok_or_else(|| QueryError::unknown_column("groups.column", key))
        })
        .collect()
}

fn key_of<'a>(table: &'a Table, row: usize, positions: &[usize]) -> Vec<&'a Value> {
    positions
        .iter()
        .map(|&p| &table.columns()[p].values()[row])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::ColumnType;

    fn rows(ids: &[i64], names: &[&str]) -> Table {
        Table::new(vec![
            Column::integer("id", ids.iter().copied()),
            Column::text("name", names.iter().copied()),
        ])
        .unwrap()
    }

    fn summary(groups: &[&str], name: &str, values: &[f64]) -> Table {
        Table::new(vec![
            Column::categorical("g", groups.iter().copied()),
            Column::float(name, values.iter().copied()),
        ])
        .unwrap()
    }

    #[test]
    fn test_empty_input() {
        assert!(matches!(combine_filters(&[]), Err(QueryError::EmptyCombination)));
        assert!(matches!(
            combine_aggregates(&["g".to_string()], &[]),
            Err(QueryError::EmptyCombination)
        ));
    }

    #[test]
    fn test_single_table_is_identity() {
        let table = rows(&[1, 1, 2], &["a", "a", "b"]);
        assert_eq!(combine_filters(&[table.clone()]).unwrap(), table);
    }

    #[test]
    fn test_intersection_keeps_first_order() {
        let first = rows(&[3, 1, 2, 4], &["c", "a", "b", "d"]);
        let second = rows(&[2, 3, 5], &["b", "c", "e"]);
        let result = combine_filters(&[first, second]).unwrap();
        assert_eq!(result.column("id").unwrap().values(), &[Value::Int(3), Value::Int(2)]);
    }

    #[test]
    fn test_intersection_dedups() {
        let first = rows(&[1, 2, 1], &["a", "b", "a"]);
        let second = rows(&[1, 1], &["a", "a"]);
        let result = combine_filters(&[first, second]).unwrap();
        assert_eq!(result.num_rows(), 1);
    }

    #[test]
    fn test_intersection_is_commutative_as_a_set() {
        let a = rows(&[1, 2, 3, 4], &["a", "b", "c", "d"]);
        let b = rows(&[4, 2, 9], &["d", "b", "z"]);
        let ab = combine_filters(&[a.clone(), b.clone()]).unwrap();
        let ba = combine_filters(&[b, a]).unwrap();

        let as_set = |t: &Table| -> HashSet<Vec<Value>> {
            (0..t.num_rows())
                .map(|r| t.row(r).into_iter().cloned().collect())
                .collect()
        };
        assert_eq!(as_set(&ab), as_set(&ba));
    }

    #[test]
    fn test_intersection_is_idempotent() {
        let c = rows(&[1, 2, 3], &["a", "b", "c"]);
        let d = rows(&[2, 3, 4], &["b", "c", "d"]);

        assert_eq!(combine_filters(&[c.clone(), c.clone()]).unwrap(), c);
        assert_eq!(
            combine_filters(&[c.clone(), c.clone(), d.clone()]).unwrap(),
            combine_filters(&[c.clone(), d.clone()]).unwrap()
        );
        assert_eq!(
            combine_filters(&[d.clone(), c.clone(), d.clone()]).unwrap(),
            combine_filters(&[d, c]).unwrap()
        );
    }

    #[test]
    fn test_schema_mismatch() {
        let first = rows(&[1], &["a"]);
        let second = Table::new(vec![Column::integer("id", [1])]).unwrap();
        assert!(matches!(
            combine_filters(&[first, second]),
            Err(QueryError::SchemaMismatch(_))
        ));
    }

    #[test]
    fn test_left_join_drops_groups_missing_from_anchor() {
        let keys = vec!["g".to_string()];
        let anchor = summary(&["a", "b"], "x_mean", &[1.0, 2.0]);
        let other = summary(&["b", "c", "a"], "x_max", &[5.0, 6.0, 7.0]);

        let result = combine_aggregates(&keys, &[anchor, other]).unwrap();
        assert_eq!(result.column_names(), vec!["g", "x_mean", "x_max"]);
        assert_eq!(result.num_rows(), 2);
        assert_eq!(
            result.column("g").unwrap().values(),
            &[Value::from("a"), Value::from("b")]
        );
        assert_eq!(
            result.column("x_max").unwrap().values(),
            &[Value::Float(7.0), Value::Float(5.0)]
        );
    }

    #[test]
    fn test_left_join_fills_missing_cells() {
        let keys = vec!["g".to_string()];
        let anchor = summary(&["a", "b"], "x_mean", &[1.0, 2.0]);
        let other = summary(&["a"], "x_sd", &[0.5]);

        let result = combine_aggregates(&keys, &[anchor, other]).unwrap();
        assert_eq!(
            result.column("x_sd").unwrap().values(),
            &[Value::Float(0.5), Value::Null]
        );
        assert_eq!(result.column("x_sd").unwrap().kind(), ColumnType::Float);
    }

    #[test]
    fn test_rounds_after_join() {
        let keys = vec!["g".to_string()];
        let anchor = summary(&["a"], "x_mean", &[1.23456]);
        let result = combine_aggregates(&keys, &[anchor]).unwrap();
        assert_eq!(result.column("x_mean").unwrap().values(), &[Value::Float(1.23)]);
    }

    #[test]
    fn test_name_clash_is_an_error() {
        let keys = vec!["g".to_string()];
        let anchor = summary(&["a"], "x_mean", &[1.0]);
        let again = summary(&["a"], "x_mean", &[1.0]);
        assert!(matches!(
            combine_aggregates(&keys, &[anchor, again]),
            Err(QueryError::Table(_))
        ));
    }
}
