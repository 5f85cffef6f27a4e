//! Built-in datasets
//!
//! - `iris`: 150 flowers, four measurements and `Species` (categorical)
//! - `mtcars`: 32 cars, model name in `model` plus ten numeric attributes

use crate::datasets::csv_loader::CsvLoader;
use crate::table::{ColumnType, Table, TableResult};

const IRIS_CSV: &str = include_str!("data/iris.csv");
const MTCARS_CSV: &str = include_str!("data/mtcars.csv");

/// Names of the built-in datasets
pub const BUILTIN_NAMES: &[&str] = &["iris", "mtcars"];

pub fn iris() -> TableResult<Table> {
    CsvLoader::new()
        .with_column_type("Species", ColumnType::Categorical)
        .from_reader(IRIS_CSV.as_bytes())
}

pub fn mtcars() -> TableResult<Table> {
    CsvLoader::new().from_reader(MTCARS_CSV.as_bytes())
}

/// Load a built-in dataset by name
pub fn builtin(name: &str) -> Option<TableResult<Table>> {
    match name {
        "iris" => Some(iris()),
        "mtcars" => Some(mtcars()),
        _ => None,
    }
}
