//! Schema Validator
//!
//! Turns untrusted instruction payloads into typed requests, failing fast
//! with a `QueryError::Validation` that names the offending field.
//!
//! Checks run in a fixed order:
//! 1. Shape: field names and nesting
//! 2. Addressability: every referenced column exists in the table
//! 3. Enumerations: `operator` / `fun` are drawn from the allowed set
//!
//! A payload may be structured JSON or a string holding JSON.

use serde_json::{Map, Value as Json};
use std::borrow::Cow;
use std::collections::HashSet;

use crate::query::ast::{
    AggregateFunc, AggregateItem, AggregateRequest, FilterClause, FilterOperator, FilterRequest,
    Predicate, Scalar,
};
use crate::query::error::{QueryError, QueryResult};
use crate::table::Table;

/// Field path used for errors about the payload as a whole
const ROOT: &str = "instructions";

const CLAUSE_FIELDS: &[&str] = &["column", "operator", "min", "max", "values"];
const AGGREGATE_FIELDS: &[&str] = &["groups", "aggregates"];
const GROUP_FIELDS: &[&str] = &["column"];
const ITEM_FIELDS: &[&str] = &["column", "fun"];

/// Check that every clause of a typed filter request addresses the table
pub fn validate_filter(table: &Table, request: &FilterRequest) -> QueryResult<()> {
    for (i, clause) in request.clauses().iter().enumerate() {
        require_column(table, clause_field(i, "column"), &clause.column)?;
    }
    Ok(())
}

/// Check a typed aggregate request against the table
///
/// Besides column existence this rejects empty group or aggregate lists and
/// any request whose output columns would collide.
pub fn validate_aggregate(table: &Table, request: &AggregateRequest) -> QueryResult<()> {
    if request.groups.is_empty() {
        return Err(QueryError::validation(
            "groups.column",
            "at least one group column is required",
        ));
    }
    if request.aggregates.is_empty() {
        return Err(QueryError::validation(
            "aggregates",
            "at least one aggregate is required",
        ));
    }

    let mut outputs = HashSet::new();

    for (i, group) in request.groups.iter().enumerate() {
        let field = format!("groups.column[{}]", i);
        require_column(table, field.as_str(), group)?;
        if !outputs.insert(group.clone()) {
            return Err(QueryError::validation(
                field,
                format!("column '{}' is listed more than once", group),
            ));
        }
    }

    for (i, item) in request.aggregates.iter().enumerate() {
        require_column(table, format!("aggregates[{}].column", i), &item.column)?;
        let output = item.output_name();
        if !outputs.insert(output.clone()) {
            return Err(QueryError::validation(
                format!("aggregates[{}]", i),
                format!("output column '{}' would be produced twice", output),
            ));
        }
    }

    Ok(())
}

/// Build a filter request from a raw payload
pub fn parse_filter_request(table: &Table, payload: &Json) -> QueryResult<FilterRequest> {
    let payload = decode_payload(payload)?;
    let raw = filter_shape(&payload)?;

    for (i, clause) in raw.iter().enumerate() {
        require_column(table, clause_field(i, "column"), &clause.column)?;
    }

    let clauses = raw
        .into_iter()
        .enumerate()
        .map(|(i, clause)| clause.resolve(i))
        .collect::<QueryResult<Vec<_>>>()?;

    Ok(FilterRequest::new(clauses))
}

/// Build an aggregate request from a raw payload
pub fn parse_aggregate_request(table: &Table, payload: &Json) -> QueryResult<AggregateRequest> {
    let payload = decode_payload(payload)?;
    let raw = aggregate_shape(&payload)?;

    for (i, group) in raw.groups.iter().enumerate() {
        require_column(table, format!("groups.column[{}]", i), group)?;
    }
    for (i, (column, _)) in raw.items.iter().enumerate() {
        require_column(table, format!("aggregates[{}].column", i), column)?;
    }

    let allowed: Vec<&str> = AggregateFunc::all().iter().map(|f| f.as_str()).collect();
    let aggregates = raw
        .items
        .into_iter()
        .enumerate()
        .map(|(i, (column, fun))| {
            let fun = AggregateFunc::from_str(&fun).ok_or_else(|| {
                QueryError::not_allowed(format!("aggregates[{}].fun", i), "function", &fun, &allowed)
            })?;
            Ok(AggregateItem::new(column, fun))
        })
        .collect::<QueryResult<Vec<_>>>()?;

    let request = AggregateRequest {
        groups: raw.groups,
        aggregates,
    };
    validate_aggregate(table, &request)?;

    Ok(request)
}

/// Unwrap a payload transmitted as a JSON-encoded string
pub fn decode_payload(payload: &Json) -> QueryResult<Cow<'_, Json>> {
    match payload {
        Json::String(encoded) => serde_json::from_str(encoded)
            .map(Cow::Owned)
            .map_err(|e| QueryError::validation(ROOT, format!("not valid JSON: {}", e))),
        other => Ok(Cow::Borrowed(other)),
    }
}

/// A filter clause after the shape check, before enum resolution
struct RawClause {
    column: String,
    operator: String,
    min: Option<Scalar>,
    max: Option<Scalar>,
    values: Option<Vec<Scalar>>,
}

impl RawClause {
    fn resolve(self, index: usize) -> QueryResult<FilterClause> {
        let operator = FilterOperator::from_str(&self.operator).ok_or_else(|| {
            let allowed: Vec<&str> = FilterOperator::all().iter().map(|op| op.as_str()).collect();
            QueryError::not_allowed(clause_field(index, "operator"), "operator", &self.operator, &allowed)
        })?;

        let predicate = match operator {
            FilterOperator::Between => {
                if self.values.is_some() {
                    return Err(QueryError::validation(
                        clause_field(index, "values"),
                        "not used by operator 'between' (expected min and max)",
                    ));
                }
                Predicate::Between {
                    min: self.min,
                    max: self.max,
                }
            }
            FilterOperator::In => {
                if let Some(key) = [("min", &self.min), ("max", &self.max)]
                    .iter()
                    .find(|(_, v)| v.is_some())
                    .map(|(k, _)| *k)
                {
                    return Err(QueryError::validation(
                        clause_field(index, key),
                        "not used by operator 'in' (expected values)",
                    ));
                }
                Predicate::In {
                    values: self.values.unwrap_or_default(),
                }
            }
        };

        Ok(FilterClause::new(self.column, predicate))
    }
}

/// An aggregate spec after the shape check: group names and (column, fun) pairs
struct RawAggregate {
    groups: Vec<String>,
    items: Vec<(String, String)>,
}

fn filter_shape(payload: &Json) -> QueryResult<Vec<RawClause>> {
    let items = payload.as_array().ok_or_else(|| {
        QueryError::validation(
            ROOT,
            format!("expected an array of filter clauses, found {}", json_kind(payload)),
        )
    })?;

    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let object = expect_object(item, &format!("{}[{}]", ROOT, i))?;
            check_fields(object, CLAUSE_FIELDS, |key| clause_field(i, key))?;

            Ok(RawClause {
                column: required_string(object, "column", &clause_field(i, "column"))?,
                operator: required_string(object, "operator", &clause_field(i, "operator"))?,
                min: bound(object.get("min"), &clause_field(i, "min"))?,
                max: bound(object.get("max"), &clause_field(i, "max"))?,
                values: value_list(object.get("values"), &clause_field(i, "values"))?,
            })
        })
        .collect()
}

fn aggregate_shape(payload: &Json) -> QueryResult<RawAggregate> {
    let object = expect_object(payload, ROOT)?;
    check_fields(object, AGGREGATE_FIELDS, |key| key.to_string())?;

    let groups = object
        .get("groups")
        .ok_or_else(|| QueryError::validation("groups", "missing required field"))?;
    let groups = expect_object(groups, "groups")?;
    check_fields(groups, GROUP_FIELDS, |key| format!("groups.{}", key))?;

    let groups = match groups.get("column") {
        None => {
            return Err(QueryError::validation(
                "groups.column",
                "missing required field",
            ))
        }
        Some(Json::String(single)) => vec![single.clone()],
        Some(Json::Array(columns)) => columns
            .iter()
            .enumerate()
            .map(|(i, column)| {
                column.as_str().map(str::to_string).ok_or_else(|| {
                    QueryError::validation(
                        format!("groups.column[{}]", i),
                        format!("expected a string, found {}", json_kind(column)),
                    )
                })
            })
            .collect::<QueryResult<Vec<_>>>()?,
        Some(other) => {
            return Err(QueryError::validation(
                "groups.column",
                format!("expected an array of column names, found {}", json_kind(other)),
            ))
        }
    };

    let aggregates = object
        .get("aggregates")
        .ok_or_else(|| QueryError::validation("aggregates", "missing required field"))?;
    let aggregates = aggregates.as_array().ok_or_else(|| {
        QueryError::validation(
            "aggregates",
            format!("expected an array of aggregates, found {}", json_kind(aggregates)),
        )
    })?;

    let items = aggregates
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let path = format!("aggregates[{}]", i);
            let object = expect_object(item, &path)?;
            check_fields(object, ITEM_FIELDS, |key| format!("{}.{}", path, key))?;
            Ok((
                required_string(object, "column", &format!("{}.column", path))?,
                required_string(object, "fun", &format!("{}.fun", path))?,
            ))
        })
        .collect::<QueryResult<Vec<_>>>()?;

    Ok(RawAggregate { groups, items })
}

fn require_column(table: &Table, field: impl Into<String>, column: &str) -> QueryResult<()> {
    if table.has_column(column) {
        Ok(())
    } else {
        Err(QueryError::unknown_column(field, column))
    }
}

fn clause_field(index: usize, key: &str) -> String {
    format!("{}[{}].{}", ROOT, index, key)
}

fn json_kind(value: &Json) -> &'static str {
    match value {
        Json::Null => "null",
        Json::Bool(_) => "boolean",
        Json::Number(_) => "number",
        Json::String(_) => "string",
        Json::Array(_) => "array",
        Json::Object(_) => "object",
    }
}

fn expect_object<'a>(value: &'a Json, field: &str) -> QueryResult<&'a Map<String, Json>> {
    value.as_object().ok_or_else(|| {
        QueryError::validation(field, format!("expected an object, found {}", json_kind(value)))
    })
}

fn check_fields(
    object: &Map<String, Json>,
    allowed: &[&str],
    path: impl Fn(&str) -> String,
) -> QueryResult<()> {
    match object.keys().find(|key| !allowed.contains(&key.as_str())) {
        Some(key) => Err(QueryError::not_allowed(path(key), "field", key, allowed)),
        None => Ok(()),
    }
}

fn required_string(object: &Map<String, Json>, key: &str, field: &str) -> QueryResult<String> {
    match object.get(key) {
        None | Some(Json::Null) => Err(QueryError::validation(field, "missing required field")),
        Some(Json::String(s)) => Ok(s.clone()),
        Some(other) => Err(QueryError::validation(
            field,
            format!("expected a string, found {}", json_kind(other)),
        )),
    }
}

/// A scalar operand; `null` counts as absent
fn scalar(value: &Json, field: &str) -> QueryResult<Option<Scalar>> {
    match value {
        Json::Null => Ok(None),
        Json::Bool(b) => Ok(Some(Scalar::Bool(*b))),
        Json::String(s) => Ok(Some(Scalar::Text(s.clone()))),
        Json::Number(n) => n
            .as_f64()
            .map(|n| Some(Scalar::Number(n)))
            .ok_or_else(|| QueryError::validation(field, "number out of range")),
        other => Err(QueryError::validation(
            field,
            format!("expected a scalar, found {}", json_kind(other)),
        )),
    }
}

/// A `between` bound: a number, or a date string for temporal columns
fn bound(value: Option<&Json>, field: &str) -> QueryResult<Option<Scalar>> {
    match value {
        None => Ok(None),
        Some(Json::Bool(_)) => Err(QueryError::validation(
            field,
            "expected a number or date string, found boolean",
        )),
        Some(v) => scalar(v, field),
    }
}

fn value_list(value: Option<&Json>, field: &str) -> QueryResult<Option<Vec<Scalar>>> {
    match value {
        None | Some(Json::Null) => Ok(None),
        Some(Json::Array(items)) => items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                let item_field = format!("{}[{}]", field, i);
                scalar(item, &item_field)?.ok_or_else(|| {
                    QueryError::validation(item_field, "expected a scalar, found null")
                })
            })
            .collect::<QueryResult<Vec<_>>>()
            .map(Some),
        Some(other) => Err(QueryError::validation(
            field,
            format!("expected an array of values, found {}", json_kind(other)),
        )),
    }
}
