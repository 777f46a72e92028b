//! Configuration loading and typed config structures for the harvester.
//!
//! Configuration is an optional YAML document (conventionally
//! `harvest.yaml`). Every field has a default, so an empty document, or no
//! document at all, yields a working configuration that harvests the full
//! rugby archive into `data/match_data.csv`.
//!
//! Environment variables are applied on top of the parsed file:
//!
//! | Variable                  | Field               |
//! |---------------------------|---------------------|
//! | `HARVEST_DATA_DIR`        | `storage.data_dir`  |
//! | `HARVEST_SOURCE_BASE_URL` | `source.base_url`   |
//! | `HARVEST_USER_AGENT`      | `source.user_agent` |
//! | `HARVEST_BUCKET_DIR`      | `sync.bucket_dir`   |
//! | `HARVEST_BUCKET`          | `sync.bucket`       |
//! | `AWS_DEFAULT_REGION`      | `sync.region`       |

use std::path::{Path, PathBuf};
use std::time::Duration;

use harvest_source::SourceConfig;
use serde::Deserialize;

use crate::retry::RetryPolicy;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file {}: {source}", path.display())]
    Io {
        /// File that could not be read.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level harvester configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct HarvestConfig {
    /// Scorepanel API settings.
    #[serde(default)]
    pub source: SourceConfig,

    /// Where the dataset lives on disk.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Retry policy for transient fetch failures.
    #[serde(default)]
    pub retry: RetryConfig,

    /// Object-store sync settings.
    #[serde(default)]
    pub sync: SyncConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl HarvestConfig {
    /// Load configuration from a YAML file, then apply environment
    /// overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if it is not valid YAML for this schema.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string, then apply environment
    /// overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        // serde_yml reads an empty document as null rather than an empty map.
        let mut config: Self = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yml::from_str(yaml)?
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Override fields from `HARVEST_*` environment variables.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    /// Override fields from a variable lookup. Unset names are skipped.
    pub fn apply_overrides<F>(&mut self, var: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = var("HARVEST_DATA_DIR") {
            self.storage.data_dir = PathBuf::from(val);
        }
        if let Some(val) = var("HARVEST_SOURCE_BASE_URL") {
            self.source.base_url = val;
        }
        if let Some(val) = var("HARVEST_USER_AGENT") {
            self.source.user_agent = val;
        }
        if let Some(val) = var("HARVEST_BUCKET_DIR") {
            self.sync.bucket_dir = Some(PathBuf::from(val));
        }
        if let Some(val) = var("HARVEST_BUCKET") {
            self.sync.bucket = Some(val);
        }
        if let Some(val) = var("AWS_DEFAULT_REGION") {
            self.sync.region = Some(val);
        }
    }
}

/// Dataset location.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StorageConfig {
    /// Directory holding the canonical and staging files.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// File name of the canonical dataset.
    #[serde(default = "default_filename")]
    pub filename: String,
}

impl StorageConfig {
    /// Full path of the canonical dataset.
    pub fn canonical_path(&self) -> PathBuf {
        self.data_dir.join(&self.filename)
    }

    /// Use `name` as the dataset file name, adding `.csv` if absent.
    pub fn set_filename(&mut self, name: &str) {
        self.filename = if name.ends_with(".csv") {
            name.to_owned()
        } else {
            format!("{name}.csv")
        };
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            filename: default_filename(),
        }
    }
}

/// Retry settings for transient fetch failures.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RetryConfig {
    /// Total attempts per day, including the first.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Fixed pause between attempts, in milliseconds.
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
}

impl RetryConfig {
    /// The policy these settings describe.
    pub const fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, Duration::from_millis(self.backoff_ms))
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_ms: default_backoff_ms(),
        }
    }
}

/// Object-store sync settings.
///
/// At most one of `bucket` and `bucket_dir` may be set; sync is
/// unavailable when neither is. S3 credentials are read from the
/// environment, never from the file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SyncConfig {
    /// Directory acting as the bucket.
    #[serde(default)]
    pub bucket_dir: Option<PathBuf>,

    /// S3 bucket name.
    #[serde(default)]
    pub bucket: Option<String>,

    /// AWS region of `bucket`.
    #[serde(default)]
    pub region: Option<String>,

    /// Custom endpoint for S3-compatible stores.
    #[serde(default)]
    pub endpoint: Option<String>,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Default log level filter, used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable text.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_filename() -> String {
    "match_data.csv".to_owned()
}

const fn default_max_attempts() -> u32 {
    3
}

const fn default_backoff_ms() -> u64 {
    500
}

fn default_log_level() -> String {
    "info".to_owned()
}
