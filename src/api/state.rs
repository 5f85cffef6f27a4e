//! Application State
//!
//! Shared state accessible by all API handlers.
//! Wrapped in Arc for thread-safe sharing across async tasks.

use std::sync::Arc;
use std::time::Instant;

use crate::config::{ApiConfig, Config};
use crate::datasets::{DatasetRegistry, DatasetResult};

/// Shared application state for all handlers
#[derive(Clone)]
pub struct AppState {
    /// Named tables requests are evaluated against
    pub datasets: Arc<DatasetRegistry>,
    /// API configuration
    pub config: Arc<ApiConfig>,
    /// Server start time for uptime tracking
    pub start_time: Instant,
}

impl AppState {
    pub fn new(datasets: DatasetRegistry, config: ApiConfig) -> Self {
        Self {
            datasets: Arc::new(datasets),
            config: Arc::new(config),
            start_time: Instant::now(),
        }
    }

    /// Load datasets and take API settings from the full config
    pub fn from_config(config: &Config) -> DatasetResult<Self> {
        let datasets = DatasetRegistry::from_config(&config.datasets)?;
        Ok(Self::new(datasets, config.api.clone()))
    }

    /// Get server uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
