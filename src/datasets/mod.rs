//! tabql Datasets
//!
//! Named tables the HTTP and CLI front-ends resolve the `data` field
//! against:
//!
//! - **builtin**: embedded `iris` and `mtcars`
//! - **csv_loader**: CSV files with type inference and per-column overrides
//!
//! The registry is built once at startup and shared read-only; tables are
//! held behind `Arc` so handlers never copy them.

mod builtin;
mod csv_loader;

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

use crate::config::DatasetsConfig;
use crate::table::{ColumnType, Table, TableError};

pub use builtin::{builtin, iris, mtcars, BUILTIN_NAMES};
pub use csv_loader::{infer_type, CsvLoader};

/// Errors that can occur while resolving or loading datasets
#[derive(Error, Debug)]
pub enum DatasetError {
    /// No dataset registered under this name
    #[error("Dataset not found: {0}")]
    NotFound(String),

    /// A dataset file could not be turned into a table
    #[error("Failed to load dataset '{name}': {source}")]
    Load {
        name: String,
        #[source]
        source: TableError,
    },

    /// Reading the dataset directory failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for dataset operations
pub type DatasetResult<T> = Result<T, DatasetError>;

/// Summary of one registered dataset
#[derive(Debug, Clone, Serialize)]
pub struct DatasetInfo {
    pub name: String,
    pub rows: usize,
    pub columns: Vec<ColumnInfo>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ColumnInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ColumnType,
}

/// Named, immutable tables
#[derive(Debug, Default)]
pub struct DatasetRegistry {
    tables: BTreeMap<String, Arc<Table>>,
}

impl DatasetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding only the built-in datasets
    pub fn with_builtin() -> DatasetResult<Self> {
        let mut registry = Self::new();
        for name in BUILTIN_NAMES {
            if let Some(table) = builtin(name) {
                let table = table.map_err(|source| DatasetError::Load {
                    name: name.to_string(),
                    source,
                })?;
                registry.register(*name, table);
            }
        }
        Ok(registry)
    }

    /// Build the registry described by the `[datasets]` config section
    pub fn from_config(config: &DatasetsConfig) -> DatasetResult<Self> {
        let mut registry = if config.builtin {
            Self::with_builtin()?
        } else {
            Self::new()
        };

        if let Some(dir) = &config.dir {
            let loaded = registry.load_dir(Path::new(dir), config)?;
            tracing::info!("Loaded {} dataset(s) from {}", loaded, dir);
        }

        Ok(registry)
    }

    /// Register (or replace) a dataset
    pub fn register(&mut self, name: impl Into<String>, table: Table) {
        let name = name.into();
        if self.tables.insert(name.clone(), Arc::new(table)).is_some() {
            tracing::warn!("Dataset '{}' replaced", name);
        }
    }

    /// Register every `*.csv` in `dir` under its file stem
    ///
    /// Files that fail to load are logged and skipped. Returns the number of
    /// datasets registered.
    pub fn load_dir(&mut self, dir: &Path, config: &DatasetsConfig) -> DatasetResult<usize> {
        let mut paths: Vec<_> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.extension()
                    .map(|ext| ext.eq_ignore_ascii_case("csv"))
                    .unwrap_or(false)
            })
            .collect();
        paths.sort();

        let mut loaded = 0;
        for path in paths {
            let Some(name) = path.file_stem().map(|s| s.to_string_lossy().to_string()) else {
                continue;
            };

            let mut loader = CsvLoader::new().with_delimiter(config.delimiter_byte());
            if let Some(overrides) = config.column_types.get(&name) {
                for (column, kind) in overrides {
                    loader = loader.with_column_type(column, *kind);
                }
            }

            match loader.load(&path) {
                Ok(table) => {
                    tracing::debug!(
                        dataset = %name,
                        rows = table.num_rows(),
                        columns = table.num_columns(),
                        "Dataset loaded"
                    );
                    self.register(name, table);
                    loaded += 1;
                }
                Err(e) => {
                    tracing::warn!("Skipping dataset {:?}: {}", path, e);
                }
            }
        }

        Ok(loaded)
    }

    /// Look up a dataset by name
    pub fn resolve(&self, name: &str) -> DatasetResult<Arc<Table>> {
        self.tables
            .get(name)
            .cloned()
            .ok_or_else(|| DatasetError::NotFound(name.to_string()))
    }

    /// Dataset names in sorted order
    pub fn names(&self) -> Vec<&str> {
        self.tables.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Name, size and schema of every dataset
    pub fn describe(&self) -> Vec<DatasetInfo> {
        self.tables
            .iter()
            .map(|(name, table)| DatasetInfo {
                name: name.clone(),
                rows: table.num_rows(),
                columns: table
                    .schema()
                    .into_iter()
                    .map(|(name, kind)| ColumnInfo { name, kind })
                    .collect(),
            })
            .collect()
    }
}
