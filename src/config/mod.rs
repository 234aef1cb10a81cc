//! Configuration management for chiv
//!
//! This module handles loading, parsing, and saving configuration:
//! - Configuration files (TOML format)
//! - Command-line arguments
//!
//! Configuration precedence (highest to lowest):
//! 1. Command-line arguments (`DATABASE_URL` stands in for `--database`)
//! 2. Configuration file
//! 3. Default values

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ConfigError, Result};
use crate::export::{ExportOption, FormatKind};
use crate::source::Driver;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Object store configuration
    #[serde(default)]
    pub store: StoreConfig,

    /// Default export options
    #[serde(default)]
    pub export: ExportConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Database-related configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DatabaseConfig {
    /// Database URL
    #[serde(default = "default_database_url")]
    pub url: String,

    /// Database driver; inferred from the URL scheme when not set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver: Option<Driver>,

    /// Maximum pool size
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

/// Object store configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoreConfig {
    /// Store backend
    #[serde(default)]
    pub kind: StoreKind,

    /// Root directory of the filesystem store
    #[serde(default = "default_store_root")]
    pub root: PathBuf,

    /// Base URL of the HTTP store
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// Connect timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

/// Store backends
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    /// Directory tree on the local filesystem
    #[default]
    Fs,
    /// HTTP endpoint accepting PUT requests
    Http,
}

/// Default export options
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ExportConfig {
    /// Output format
    #[serde(default)]
    pub format: FormatKind,

    /// Explicit destination key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,

    /// Key extension override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extension: Option<String>,

    /// Null sentinel
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub null: Option<String>,

    /// Columns to export (empty for all)
    #[serde(default)]
    pub columns: Vec<String>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: LogLevel,

    /// Enable timestamps in logs
    #[serde(default = "default_log_timestamps")]
    pub timestamps: bool,
}

/// Log level options
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

// Default value functions
fn default_database_url() -> String {
    "sqlite://chiv.db".to_string()
}

fn default_max_connections() -> u32 {
    4
}

fn default_store_root() -> PathBuf {
    config_dir().join("store")
}

fn default_timeout() -> u64 {
    30
}

fn default_log_level() -> LogLevel {
    LogLevel::Warn
}

fn default_log_timestamps() -> bool {
    true
}

fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".chiv")
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            driver: None,
            max_connections: default_max_connections(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            kind: StoreKind::default(),
            root: default_store_root(),
            endpoint: None,
            timeout: default_timeout(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            timestamps: default_log_timestamps(),
        }
    }
}

impl Config {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a file
    ///
    /// # Arguments
    /// * `path` - Path to the configuration file (TOML format)
    ///
    /// # Returns
    /// * `Result<Config>` - Loaded configuration or error
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::FileNotFound(path.display().to_string())
            } else {
                ConfigError::InvalidFormat(format!("{}: {}", path.display(), e))
            }
        })?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| ConfigError::InvalidFormat(format!("{}: {}", path.display(), e)))?;
        Ok(config)
    }

    /// Load configuration
    ///
    /// An explicitly given file must exist. Without one, the default path is
    /// read if present and defaults are used otherwise.
    ///
    /// # Arguments
    /// * `path` - Optional explicit configuration file
    ///
    /// # Returns
    /// * `Result<Config>` - Loaded configuration or error
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let path = Self::default_path();
                if path.exists() {
                    Self::from_file(path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Get the default configuration file path
    ///
    /// # Returns
    /// * `PathBuf` - Path to default configuration file
    pub fn default_path() -> PathBuf {
        config_dir().join("config.toml")
    }

    /// Render the configuration as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| ConfigError::InvalidFormat(e.to_string()).into())
    }

    /// Validate the configuration
    ///
    /// # Returns
    /// * `Result<()>` - Ok if valid, error otherwise
    pub fn validate(&self) -> Result<()> {
        if self.database.url.trim().is_empty() {
            return Err(ConfigError::MissingField("database.url".to_string()).into());
        }
        if self.database.max_connections == 0 {
            return Err(invalid("database.max_connections", "0"));
        }
        self.driver()?;
        if self.store.timeout == 0 {
            return Err(invalid("store.timeout", "0"));
        }

        if self.store.kind == StoreKind::Http {
            let endpoint = self
                .store
                .endpoint
                .as_deref()
                .ok_or_else(|| ConfigError::MissingField("store.endpoint".to_string()))?;
            if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
                return Err(invalid("store.endpoint", endpoint));
            }
        }

        if let Some(key) = &self.export.key {
            if key.trim().is_empty() {
                return Err(invalid("export.key", key));
            }
        }
        if let Some(column) = self.export.columns.iter().find(|c| c.trim().is_empty()) {
            return Err(invalid("export.columns", column));
        }

        Ok(())
    }

    /// Export options implied by the `[export]` section
    pub fn to_export_options(&self) -> Vec<ExportOption> {
        let export = &self.export;
        let mut options = vec![ExportOption::format(export.format)];

        if let Some(key) = &export.key {
            options.push(ExportOption::key(key));
        }
        if let Some(extension) = &export.extension {
            options.push(ExportOption::extension(extension));
        }
        if let Some(null) = &export.null {
            options.push(ExportOption::null(null));
        }
        if !export.columns.is_empty() {
            options.push(ExportOption::columns(export.columns.iter().cloned()));
        }

        options
    }

    /// Database driver to connect with
    ///
    /// # Returns
    /// * `Result<Driver>` - The configured driver, or the one named by the
    ///   URL scheme; an error when neither is known
    pub fn driver(&self) -> Result<Driver> {
        self.database
            .driver
            .or_else(|| Driver::from_url(&self.database.url))
            .ok_or_else(|| invalid("database.url", &self.database.url))
    }

    /// Get store connect timeout as Duration
    pub fn store_timeout(&self) -> Duration {
        Duration::from_secs(self.store.timeout)
    }
}

fn invalid(field: &str, value: &str) -> crate::error::ChivError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
    }
    .into()
}

impl LogLevel {
    /// Convert to tracing::Level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }

    /// Level `steps` notches more verbose, saturating at trace
    pub fn raised(self, steps: u8) -> LogLevel {
        const ORDER: [LogLevel; 5] = [
            LogLevel::Error,
            LogLevel::Warn,
            LogLevel::Info,
            LogLevel::Debug,
            LogLevel::Trace,
        ];
        let index = self as usize + steps as usize;
        ORDER[index.min(ORDER.len() - 1)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ChivError;
    use crate::export::ExportOptions;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.database.url, "sqlite://chiv.db");
        assert_eq!(config.store.kind, StoreKind::Fs);
        assert_eq!(config.export.format, FormatKind::Csv);
        assert_eq!(config.logging.level, LogLevel::Warn);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[database]
url = "sqlite:///var/db/shop.db"

[export]
format = "json"
null = "NULL"
columns = ["id", "total"]
"#,
        )
        .unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.database.url, "sqlite:///var/db/shop.db");
        assert_eq!(config.database.max_connections, 4);
        assert_eq!(config.export.format, FormatKind::Json);
        assert_eq!(config.logging, LoggingConfig::default());

        let options = ExportOptions::default().apply(&config.to_export_options());
        assert_eq!(options.format, FormatKind::Json);
        assert_eq!(options.null.as_deref(), Some(&b"NULL"[..]));
        assert_eq!(options.columns, vec!["id", "total"]);
        assert!(options.key.is_none());
    }

    #[test]
    fn test_toml_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = Config::default();
        config.database.driver = Some(Driver::Mysql);
        config.store.kind = StoreKind::Http;
        config.store.endpoint = Some("http://localhost:9000".to_string());
        config.export.key = Some("archive.dat".to_string());
        std::fs::write(&path, config.to_toml().unwrap()).unwrap();

        assert_eq!(Config::from_file(&path).unwrap(), config);
    }

    #[test]
    fn test_driver_resolution() {
        let mut config = Config::default();
        assert_eq!(config.driver().unwrap(), Driver::Sqlite);

        config.database.url = "postgresql://localhost/shop".to_string();
        assert_eq!(config.driver().unwrap(), Driver::Postgres);

        config.database.url = "localhost:3306/shop".to_string();
        assert!(matches!(
            config.validate(),
            Err(ChivError::Config(ConfigError::InvalidValue { .. }))
        ));

        config.database.driver = Some(Driver::Mysql);
        assert_eq!(config.driver().unwrap(), Driver::Mysql);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_and_malformed_files() {
        let dir = TempDir::new().unwrap();

        let missing = Config::load(Some(&dir.path().join("absent.toml")));
        assert!(matches!(
            missing,
            Err(ChivError::Config(ConfigError::FileNotFound(_)))
        ));

        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[export]\nformat = \"xlsx\"\n").unwrap();
        assert!(matches!(
            Config::from_file(&path),
            Err(ChivError::Config(ConfigError::InvalidFormat(_)))
        ));
    }

    #[test]
    fn test_validate() {
        let mut config = Config::default();
        config.store.kind = StoreKind::Http;
        assert!(matches!(
            config.validate(),
            Err(ChivError::Config(ConfigError::MissingField(_)))
        ));

        config.store.endpoint = Some("ftp://store".to_string());
        assert!(matches!(
            config.validate(),
            Err(ChivError::Config(ConfigError::InvalidValue { .. }))
        ));

        config.store.endpoint = Some("https://store.example.com".to_string());
        assert!(config.validate().is_ok());

        config.database.max_connections = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_log_level_raised() {
        assert_eq!(LogLevel::Warn.raised(0), LogLevel::Warn);
        assert_eq!(LogLevel::Warn.raised(1), LogLevel::Info);
        assert_eq!(LogLevel::Warn.raised(9), LogLevel::Trace);
    }
}
