//! Application configuration.
//!
//! Settings come from a YAML file (default [`DEFAULT_CONFIG_PATH`]). Every
//! key has a default, so a partial file or no file at the default path both
//! work:
//!
//! ```yaml
//! api:
//!   version: "59.0"
//!   timeout: "60s"
//!   login_url: "https://login.salesforce.com"
//! bulk:
//!   batch_size: 200
//!   max_batch_size: 200
//!   on_response_mismatch: truncate
//! logging:
//!   level: info
//!   file: logs/crm-sync.log   # optional, in addition to stderr
//! csv:
//!   delimiter: ","
//!   encoding: utf-8
//!   results_directory: results
//! ```

mod duration;

pub use duration::parse_duration;

use crm_bulk::{BulkConfig, MismatchPolicy, MAX_COLLECTION_SIZE};
use crm_client::{ClientConfig, DEFAULT_API_VERSION, DEFAULT_LOGIN_URL};
use crm_sync_csv::{CsvOptions, DEFAULT_ENCODING};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Config file used when `--config` is not given.
pub const DEFAULT_CONFIG_PATH: &str = "config/config.yaml";

/// Errors that can occur while loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Error reading the config file
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Error parsing YAML
    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A value that parsed but is not acceptable
    #[error("Invalid value for '{key}': {message}")]
    InvalidValue { key: &'static str, message: String },
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub bulk: BulkSection,
    pub logging: LoggingConfig,
    pub csv: CsvConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub version: String,
    /// Per-request timeout, e.g. "60s" or "5m"
    pub timeout: String,
    pub login_url: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            version: DEFAULT_API_VERSION.to_string(),
            timeout: "60s".to_string(),
            login_url: DEFAULT_LOGIN_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct BulkSection {
    pub batch_size: usize,
    pub max_batch_size: usize,
    /// `truncate` or `fail_unmatched`
    pub on_response_mismatch: String,
}

impl Default for BulkSection {
    fn default() -> Self {
        Self {
            batch_size: MAX_COLLECTION_SIZE,
            max_batch_size: MAX_COLLECTION_SIZE,
            on_response_mismatch: MismatchPolicy::default().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// Log file written alongside the console output
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CsvConfig {
    pub delimiter: String,
    /// Character encoding of input files (WHATWG label, e.g. `windows-1252`)
    pub encoding: String,
    pub results_directory: PathBuf,
}

impl Default for CsvConfig {
    fn default() -> Self {
        Self {
            delimiter: ",".to_string(),
            encoding: DEFAULT_ENCODING.to_string(),
            results_directory: PathBuf::from("results"),
        }
    }
}

impl AppConfig {
    /// Load configuration.
    ///
    /// With `path`, the file must exist. Without it, [`DEFAULT_CONFIG_PATH`]
    /// is read when present and defaults are used otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_PATH);
                if default_path.exists() {
                    Self::from_file(default_path)
                } else {
                    debug!("No config file at {DEFAULT_CONFIG_PATH}, using defaults");
                    Ok(Self::default())
                }
            }
        }
    }

    /// Load configuration from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn client_config(&self) -> Result<ClientConfig, ConfigError> {
        let api_version = self.api.version.trim().trim_start_matches('v').to_string();
        if api_version.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "api.version",
                message: "API version must not be empty".to_string(),
            });
        }

        let timeout = parse_duration(&self.api.timeout)?;
        if timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                key: "api.timeout",
                message: "timeout must be greater than zero".to_string(),
            });
        }

        Ok(ClientConfig {
            api_version,
            timeout,
        })
    }

    pub fn bulk_config(&self) -> Result<BulkConfig, ConfigError> {
        let max_batch_size = self.bulk.max_batch_size;
        if max_batch_size == 0 || max_batch_size > MAX_COLLECTION_SIZE {
            return Err(ConfigError::InvalidValue {
                key: "bulk.max_batch_size",
                message: format!("must be between 1 and {MAX_COLLECTION_SIZE}, got {max_batch_size}"),
            });
        }

        let batch_size = self.bulk.batch_size;
        if batch_size == 0 || batch_size > max_batch_size {
            return Err(ConfigError::InvalidValue {
                key: "bulk.batch_size",
                message: format!("must be between 1 and {max_batch_size}, got {batch_size}"),
            });
        }

        let mismatch_policy = self
            .bulk
            .on_response_mismatch
            .parse::<MismatchPolicy>()
            .map_err(|e| ConfigError::InvalidValue {
                key: "bulk.on_response_mismatch",
                message: e.to_string(),
            })?;

        Ok(BulkConfig {
            batch_size,
            max_batch_size,
            mismatch_policy,
        })
    }

    /// Reader options for input files.
    pub fn csv_options(&self) -> Result<CsvOptions, ConfigError> {
        let encoding = self.csv.encoding.trim();
        if !crm_sync_csv::is_known_encoding(encoding) {
            return Err(ConfigError::InvalidValue {
                key: "csv.encoding",
                message: format!("unknown encoding '{encoding}'"),
            });
        }

        Ok(CsvOptions::default()
            .with_delimiter(self.delimiter()?)
            .with_encoding(encoding))
    }

    /// CSV delimiter as a byte; must be one ASCII character.
    pub fn delimiter(&self) -> Result<u8, ConfigError> {
        match self.csv.delimiter.as_bytes() {
            [byte] if byte.is_ascii() => Ok(*byte),
            _ => Err(ConfigError::InvalidValue {
                key: "csv.delimiter",
                message: format!(
                    "expected a single ASCII character, got '{}'",
                    self.csv.delimiter
                ),
            }),
        }
    }
}
