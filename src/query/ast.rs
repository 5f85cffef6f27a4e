//! Query instruction types
//!
//! Typed forms of the two instruction payloads the engine accepts:
//!
//! - `FilterRequest`: a list of `FilterClause`s, each one `between` or `in`
//! - `AggregateRequest`: group columns plus a list of `AggregateItem`s
//!
//! # Example Payloads
//!
//! ```text
//! [{"column": "Sepal.Length", "operator": "between", "min": 4.9, "max": 5},
//!  {"column": "Species", "operator": "in", "values": ["setosa", "versicolor"]}]
//!
//! {"groups": {"column": ["Species"]},
//!  "aggregates": [{"column": "Sepal.Length", "fun": "mean"}]}
//! ```
//!
//! Raw JSON is turned into these types by [`crate::query::parse_filter_request`]
//! and [`crate::query::parse_aggregate_request`].

use serde::{Deserialize, Serialize};

/// Filter operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterOperator {
    /// Inclusive range on a numeric or temporal column
    Between,
    /// Membership in a set of scalars
    In,
}

impl FilterOperator {
    /// Get all operators for iteration
    pub fn all() -> &'static [FilterOperator] {
        &[FilterOperator::Between, FilterOperator::In]
    }

    /// Wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Between => "between",
            Self::In => "in",
        }
    }

    /// Parse from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "between" => Some(Self::Between),
            "in" => Some(Self::In),
            _ => None,
        }
    }
}

impl std::fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A scalar operand taken from an instruction payload
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Number(f64),
    Text(String),
    Bool(bool),
}

impl Scalar {
    /// Text form used when comparing against text-backed columns
    pub fn to_text(&self) -> String {
        match self {
            Scalar::Number(n) => n.to_string(),
            Scalar::Text(s) => s.clone(),
            Scalar::Bool(b) => b.to_string(),
        }
    }
}

impl std::fmt::Display for Scalar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Scalar::Text(s) => write!(f, "\"{}\"", s),
            other => write!(f, "{}", other.to_text()),
        }
    }
}

impl From<f64> for Scalar {
    fn from(v: f64) -> Self {
        Scalar::Number(v)
    }
}

impl From<i64> for Scalar {
    fn from(v: i64) -> Self {
        Scalar::Number(v as f64)
    }
}

impl From<bool> for Scalar {
    fn from(v: bool) -> Self {
        Scalar::Bool(v)
    }
}

impl From<&str> for Scalar {
    fn from(v: &str) -> Self {
        Scalar::Text(v.to_string())
    }
}

impl From<String> for Scalar {
    fn from(v: String) -> Self {
        Scalar::Text(v)
    }
}

/// Operator together with its operands
///
/// Absent operands are kept as `None` / empty: such a clause passes every
/// row through unchanged.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Between {
        min: Option<Scalar>,
        max: Option<Scalar>,
    },
    In {
        values: Vec<Scalar>,
    },
}

impl Predicate {
    pub fn operator(&self) -> FilterOperator {
        match self {
            Predicate::Between { .. } => FilterOperator::Between,
            Predicate::In { .. } => FilterOperator::In,
        }
    }

    /// True when required operands are missing
    pub fn is_noop(&self) -> bool {
        match self {
            Predicate::Between { min, max } => min.is_none() || max.is_none(),
            Predicate::In { values } => values.is_empty(),
        }
    }
}

/// One atomic filter condition on one column
#[derive(Debug, Clone, PartialEq)]
pub struct FilterClause {
    /// Column the predicate reads
    pub column: String,
    pub predicate: Predicate,
}

impl FilterClause {
    pub fn new(column: impl Into<String>, predicate: Predicate) -> Self {
        Self {
            column: column.into(),
            predicate,
        }
    }

    /// Create an inclusive numeric range clause
    pub fn between(column: impl Into<String>, min: f64, max: f64) -> Self {
        Self::new(
            column,
            Predicate::Between {
                min: Some(Scalar::Number(min)),
                max: Some(Scalar::Number(max)),
            },
        )
    }

    /// Create a membership clause
    pub fn is_in<S: Into<Scalar>>(column: impl Into<String>, values: impl IntoIterator<Item = S>) -> Self {
        Self::new(
            column,
            Predicate::In {
                values: values.into_iter().map(Into::into).collect(),
            },
        )
    }

    pub fn operator(&self) -> FilterOperator {
        self.predicate.operator()
    }
}

/// An ordered list of filter clauses, combined by intersection
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FilterRequest {
    clauses: Vec<FilterClause>,
}

impl FilterRequest {
    pub fn new(clauses: Vec<FilterClause>) -> Self {
        Self { clauses }
    }

    /// Builder method: append a clause
    pub fn clause(mut self, clause: FilterClause) -> Self {
        self.clauses.push(clause);
        self
    }

    pub fn clauses(&self) -> &[FilterClause] {
        &self.clauses
    }

    pub fn len(&self) -> usize {
        self.clauses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }
}

/// Aggregation functions available in aggregate requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregateFunc {
    /// Arithmetic mean
    Mean,
    /// Middle value (mean of the two middle values for even counts)
    Median,
    /// Sum of values
    Sum,
    /// Minimum value
    Min,
    /// Maximum value
    Max,
    /// Sample standard deviation
    Sd,
    /// Sample variance
    Var,
    /// Number of rows in the group
    Count,
}

impl AggregateFunc {
    /// Get all functions for iteration
    pub fn all() -> &'static [AggregateFunc] {
        &[
            Self::Mean,
            Self::Median,
            Self::Sum,
            Self::Min,
            Self::Max,
            Self::Sd,
            Self::Var,
            Self::Count,
        ]
    }

    /// Wire name, also the suffix of output column names
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mean => "mean",
            Self::Median => "median",
            Self::Sum => "sum",
            Self::Min => "min",
            Self::Max => "max",
            Self::Sd => "sd",
            Self::Var => "var",
            Self::Count => "count",
        }
    }

    /// Parse from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "mean" => Some(Self::Mean),
            "median" => Some(Self::Median),
            "sum" => Some(Self::Sum),
            "min" => Some(Self::Min),
            "max" => Some(Self::Max),
            "sd" => Some(Self::Sd),
            "var" => Some(Self::Var),
            "count" => Some(Self::Count),
            _ => None,
        }
    }

    /// Apply to a slice of present (non-missing) numeric values
    ///
    /// Returns `None` when the statistic is undefined: no values, or fewer
    /// than two for `sd` / `var`.
    pub fn apply(&self, values: &[f64]) -> Option<f64> {
        if values.is_empty() {
            return None;
        }

        let n = values.len() as f64;
        Some(match self {
            Self::Mean => values.iter().sum::<f64>() / n,
            Self::Median => {
                let mut sorted = values.to_vec();
                sorted.sort_by(|a, b| a.total_cmp(b));
                let mid = sorted.len() / 2;
                if sorted.len() % 2 == 0 {
                    (sorted[mid - 1] + sorted[mid]) / 2.0
                } else {
                    sorted[mid]
                }
            }
            Self::Sum => values.iter().sum(),
            Self::Min => values.iter().cloned().fold(f64::INFINITY, f64::min),
            Self::Max => values.iter().cloned().fold(f64::NEG_INFINITY, f64::max),
            Self::Var | Self::Sd => {
                if values.len() < 2 {
                    return None;
                }
                let mean = values.iter().sum::<f64>() / n;
                let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
                if *self == Self::Sd {
                    var.sqrt()
                } else {
                    var
                }
            }
            Self::Count => n,
        })
    }
}

impl std::fmt::Display for AggregateFunc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One `aggregates` entry: a source column and a function
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateItem {
    pub column: String,
    pub fun: AggregateFunc,
}

impl AggregateItem {
    pub fn new(column: impl Into<String>, fun: AggregateFunc) -> Self {
        Self {
            column: column.into(),
            fun,
        }
    }

    /// Output column name: `<column>_<fun>`
    pub fn output_name(&self) -> String {
        output_column_name(&self.column, self.fun)
    }
}

/// Name of the summary column produced by aggregating `column` with `fun`
pub fn output_column_name(column: &str, fun: AggregateFunc) -> String {
    format!("{}_{}", column, fun.as_str())
}

/// A group/aggregate specification
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AggregateRequest {
    /// Group-by columns; together they form the group tuple
    pub groups: Vec<String>,
    /// Summaries to compute, one output column each
    pub aggregates: Vec<AggregateItem>,
}

impl AggregateRequest {
    /// Start a request grouped by the given columns
    pub fn group_by(columns: &[&str]) -> Self {
        Self {
            groups: columns.iter().map(|c| c.to_string()).collect(),
            aggregates: Vec::new(),
        }
    }

    /// Builder method: add an aggregate
    pub fn aggregate(mut self, column: impl Into<String>, fun: AggregateFunc) -> Self {
        self.aggregates.push(AggregateItem::new(column, fun));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operator_parsing() {
        assert_eq!(FilterOperator::from_str("between"), Some(FilterOperator::Between));
        assert_eq!(FilterOperator::from_str("IN"), Some(FilterOperator::In));
        assert_eq!(FilterOperator::from_str("like"), None);
        for op in FilterOperator::all() {
            assert_eq!(FilterOperator::from_str(op.as_str()), Some(*op));
        }
    }

    #[test]
    fn test_aggregate_func_parsing() {
        for fun in AggregateFunc::all() {
            assert_eq!(AggregateFunc::from_str(fun.as_str()), Some(*fun));
        }
        assert_eq!(AggregateFunc::from_str("avg"), None);
    }

    #[test]
    fn test_output_name() {
        let item = AggregateItem::new("Sepal.Length", AggregateFunc::Mean);
        assert_eq!(item.output_name(), "Sepal.Length_mean");
        assert_eq!(output_column_name("mpg", AggregateFunc::Sd), "mpg_sd");
    }

    #[test]
    fn test_noop_detection() {
        let partial = Predicate::Between {
            min: Some(Scalar::Number(1.0)),
            max: None,
        };
        assert!(partial.is_noop());
        assert!(FilterClause::is_in("x", Vec::<Scalar>::new()).predicate.is_noop());
        assert!(!FilterClause::between("x", 1.0, 2.0).predicate.is_noop());
    }

    #[test]
    fn test_aggregate_functions() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];

        assert_eq!(AggregateFunc::Mean.apply(&values), Some(5.0));
        assert_eq!(AggregateFunc::Median.apply(&values), Some(4.5));
        assert_eq!(AggregateFunc::Sum.apply(&values), Some(40.0));
        assert_eq!(AggregateFunc::Min.apply(&values), Some(2.0));
        assert_eq!(AggregateFunc::Max.apply(&values), Some(9.0));
        assert_eq!(AggregateFunc::Count.apply(&values), Some(8.0));

        let var = AggregateFunc::Var.apply(&values).unwrap();
        assert!((var - 32.0 / 7.0).abs() < 1e-12);
        let sd = AggregateFunc::Sd.apply(&values).unwrap();
        assert!((sd - (32.0f64 / 7.0).sqrt()).abs() < 1e-12);

        assert_eq!(AggregateFunc::Median.apply(&[3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(AggregateFunc::Var.apply(&[1.0]), None);
        assert_eq!(AggregateFunc::Mean.apply(&[]), None);
    }

    #[test]
    fn test_scalar_text() {
        assert_eq!(Scalar::from(5i64).to_text(), "5");
        assert_eq!(Scalar::from(4.9).to_text(), "4.9");
        assert_eq!(Scalar::from(true).to_text(), "true");
        assert_eq!(Scalar::from("setosa").to_string(), "\"setosa\"");
    }

    #[test]
    fn test_aggregate_builder() {
        let request = AggregateRequest::group_by(&["Species"])
            .aggregate("Sepal.Length", AggregateFunc::Mean)
            .aggregate("Sepal.Length", AggregateFunc::Median);
        assert_eq!(request.groups, vec!["Species"]);
        assert_eq!(request.aggregates.len(), 2);
    }
}
