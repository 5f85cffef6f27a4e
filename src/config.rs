//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::table::ColumnType;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub datasets: DatasetsConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// API server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Largest accepted request body, in bytes
    #[serde(default = "default_max_body_size")]
    pub max_body_size: usize,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8082
}

fn default_request_timeout() -> u64 {
    30
}

fn default_max_body_size() -> usize {
    16 * 1024 * 1024 // 16 MB
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_secs: default_request_timeout(),
            max_body_size: default_max_body_size(),
        }
    }
}

impl ApiConfig {
    /// Create config with custom host and port
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Default::default()
        }
    }

    /// Get the socket address string
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Dataset registry configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DatasetsConfig {
    /// Register the embedded `iris` and `mtcars` tables
    #[serde(default = "default_builtin")]
    pub builtin: bool,

    /// Directory scanned for `*.csv` files
    #[serde(default)]
    pub dir: Option<String>,

    /// Field delimiter; must be a single ASCII character
    #[serde(default = "default_delimiter")]
    pub delimiter: char,

    /// Per dataset, per column type overrides
    #[serde(default)]
    pub column_types: HashMap<String, HashMap<String, ColumnType>>,
}

fn default_builtin() -> bool {
    true
}

fn default_delimiter() -> char {
    ','
}

impl Default for DatasetsConfig {
    fn default() -> Self {
        Self {
            builtin: default_builtin(),
            dir: None,
            delimiter: default_delimiter(),
            column_types: HashMap::new(),
        }
    }
}

impl DatasetsConfig {
    /// The delimiter as the byte the CSV reader expects
    ///
    /// A non-ASCII delimiter has no single-byte form; it is ignored with a
    /// warning and `,` is used instead.
    pub fn delimiter_byte(&self) -> u8 {
        if self.delimiter.is_ascii() {
            self.delimiter as u8
        } else {
            tracing::warn!(
                "Ignoring non-ASCII CSV delimiter {:?}, using ','",
                self.delimiter
            );
            b','
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// `pretty` or `json`
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl LoggingConfig {
    /// Install the global tracing subscriber
    ///
    /// `RUST_LOG` wins over the configured level when set.
    pub fn init(&self) {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            format!("tabql={},tower_http=debug", self.level).into()
        });
        let registry = tracing_subscriber::registry().with(filter);

        let result = if self.format.eq_ignore_ascii_case("json") {
            registry.with(tracing_subscriber::fmt::layer().json()).try_init()
        } else {
            registry.with(tracing_subscriber::fmt::layer()).try_init()
        };

        if let Err(e) = result {
            eprintln!("tracing already initialised: {}", e);
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Self::from_toml(&content).map_err(|error| ConfigError::Parse {
            path: path.to_path_buf(),
            error,
        })
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self, String> {
        let config: Config = toml::from_str(content).map_err(|e| e.to_string())?;

        if !config.datasets.delimiter.is_ascii() {
            return Err(format!(
                "datasets.delimiter must be an ASCII character, got {:?}",
                config.datasets.delimiter
            ));
        }

        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("tabql").join("config.toml")),
            Some(PathBuf::from("/etc/tabql/config.toml")),
            Some(PathBuf::from("./config.toml")),
        ];

        for path in config_paths.iter().flatten() {
            if path.exists() {
                match Self::load_with_env(path) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path, e);
                    }
                }
            }
        }

        tracing::info!("Using default config with environment overrides");
        Self::from_env()
    }

    /// Explicit path if given, default locations otherwise
    pub fn resolve(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load_with_env(path),
            None => Ok(Self::load_default()),
        }
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(host) = var("TABQL_API_HOST") {
            self.api.host = host;
        }
        if let Some(port) = var("TABQL_API_PORT") {
            match port.parse() {
                Ok(p) => self.api.port = p,
                Err(_) => tracing::warn!("Ignoring invalid TABQL_API_PORT: {}", port),
            }
        }

        if let Some(dir) = var("TABQL_DATA_DIR") {
            self.datasets.dir = Some(dir);
        }

        if let Some(level) = var("TABQL_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = var("TABQL_LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# tabql Configuration
#
# Environment variables override these settings:
# - TABQL_API_HOST
# - TABQL_API_PORT
# - TABQL_DATA_DIR
# - TABQL_LOG_LEVEL
# - TABQL_LOG_FORMAT

[api]
# Host to bind to
host = "0.0.0.0"

# Port to listen on
port = 8082

# Request timeout (seconds)
request_timeout_secs = 30

# Largest accepted request body (bytes)
max_body_size = 16777216

[datasets]
# Register the built-in iris and mtcars datasets
builtin = true

# Every *.csv in this directory is registered under its file name
# dir = "./data"

# Field delimiter for CSV files
delimiter = ","

# Column type overrides, per dataset
# (integer, float, text, categorical, boolean, temporal)
# [datasets.column_types.sales]
# region = "categorical"

[logging]
# Log level (trace, debug, info, warn, error)
level = "info"

# Log format (pretty, json)
format = "pretty"
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.api.port, 8082);
        assert!(config.datasets.builtin);
        assert!(config.datasets.dir.is_none());
        assert_eq!(config.logging.format, "pretty");
    }

    #[test]
    fn test_generated_config_parses() {
        let config = Config::from_toml(&generate_default_config()).unwrap();
        assert_eq!(config.api.host, "0.0.0.0");
        assert_eq!(config.api.max_body_size, 16 * 1024 * 1024);
        assert_eq!(config.datasets.delimiter, ',');
    }

    #[test]
    fn test_partial_config() {
        let config = Config::from_toml(
            r#"
            [api]
            port = 9000

            [datasets.column_types.sales]
            region = "categorical"
            "#,
        )
        .unwrap();
        assert_eq!(config.api.port, 9000);
        assert_eq!(config.api.request_timeout_secs, 30);
        assert_eq!(
            config.datasets.column_types["sales"]["region"],
            ColumnType::Categorical
        );
    }

    #[test]
    fn test_overrides() {
        let mut config = Config::default();
        let vars = HashMap::from([
            ("TABQL_API_PORT", "9100"),
            ("TABQL_DATA_DIR", "/srv/data"),
            ("TABQL_LOG_FORMAT", "json"),
        ]);
        config.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.api.port, 9100);
        assert_eq!(config.datasets.dir.as_deref(), Some("/srv/data"));
        assert_eq!(config.logging.format, "json");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_delimiter_must_be_ascii() {
        let config = Config::from_toml("[datasets]\ndelimiter = \";\"\n").unwrap();
        assert_eq!(config.datasets.delimiter_byte(), b';');

        let err = Config::from_toml("[datasets]\ndelimiter = \"‖\"\n").unwrap_err();
        assert!(err.contains("datasets.delimiter"));

        let mut file = NamedTempFile::new().unwrap();
        file.write_all("[datasets]\ndelimiter = \"‖\"\n".as_bytes()).unwrap();
        assert!(matches!(
            Config::load(file.path()),
            Err(ConfigError::Parse { .. })
        ));

        // built in code rather than parsed
        let datasets = DatasetsConfig {
            delimiter: '‖',
            ..DatasetsConfig::default()
        };
        assert_eq!(datasets.delimiter_byte(), b',');
    }

    #[test]
    fn test_load_errors() {
        let missing = Config::load(Path::new("/no/such/config.toml"));
        assert!(matches!(missing, Err(ConfigError::Io { .. })));

        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"[api\nport = ").unwrap();
        assert!(matches!(
            Config::load(file.path()),
            Err(ConfigError::Parse { .. })
        ));
    }
}
