//! Sync configuration module
//!
//! Configuration is assembled through [`SyncConfigBuilder`], either directly,
//! from environment variables ([`SyncConfig::from_env`]) or from a TOML file
//! ([`SyncConfig::from_toml_file`]). Every source ends in `build()`, which
//! validates the result.
//!
//! | Key | Env var | Default |
//! |---|---|---|
//! | `remote_url` | `CURRICULUM_REMOTE_URL` | none (offline) |
//! | `collection` | `CURRICULUM_COLLECTION` | `study_plans` |
//! | `data_dir` | `CURRICULUM_DATA_DIR` | `<data dir>/curriculum-sync` |
//! | `cache_ttl_secs` | `CURRICULUM_CACHE_TTL_SECS` | `300` |
//! | `request_timeout_secs` | `CURRICULUM_REQUEST_TIMEOUT_SECS` | `30` |
//! | `auth_token` | `CURRICULUM_AUTH_TOKEN` | none |

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Default remote collection name
pub const DEFAULT_COLLECTION: &str = "study_plans";

/// Default freshness window for the last remote snapshot
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(5 * 60);

/// Default timeout for remote requests
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Sync configuration
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Base URL of the remote document store
    pub remote_url: Option<String>,
    /// Remote collection holding the records
    pub collection: String,
    /// Directory of the file-backed local store
    pub data_dir: PathBuf,
    /// How long a pulled snapshot is considered fresh
    pub cache_ttl: Duration,
    /// Timeout applied to each remote request
    pub request_timeout: Duration,
    /// Bearer token sent to the remote store
    pub auth_token: Option<String>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            remote_url: None,
            collection: DEFAULT_COLLECTION.to_string(),
            data_dir: default_data_dir(),
            cache_ttl: DEFAULT_CACHE_TTL,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            auth_token: None,
        }
    }
}

impl SyncConfig {
    /// Create a new SyncConfigBuilder
    pub fn builder() -> SyncConfigBuilder {
        SyncConfigBuilder::default()
    }

    /// Build a configuration from `CURRICULUM_*` environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut builder = Self::builder();

        if let Ok(url) = std::env::var("CURRICULUM_REMOTE_URL") {
            builder = builder.remote_url(url);
        }
        if let Ok(collection) = std::env::var("CURRICULUM_COLLECTION") {
            builder = builder.collection(collection);
        }
        if let Ok(dir) = std::env::var("CURRICULUM_DATA_DIR") {
            builder = builder.data_dir(dir);
        }
        if let Ok(raw) = std::env::var("CURRICULUM_CACHE_TTL_SECS") {
            builder = builder.cache_ttl(Duration::from_secs(parse_secs("CURRICULUM_CACHE_TTL_SECS", &raw)?));
        }
        if let Ok(raw) = std::env::var("CURRICULUM_REQUEST_TIMEOUT_SECS") {
            builder = builder.request_timeout(Duration::from_secs(parse_secs(
                "CURRICULUM_REQUEST_TIMEOUT_SECS",
                &raw,
            )?));
        }
        if let Ok(token) = std::env::var("CURRICULUM_AUTH_TOKEN") {
            builder = builder.auth_token(token);
        }

        builder.build()
    }

    /// Parse a TOML document
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let file: FileConfig = toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        file.into_builder().build()
    }

    /// Read and parse a TOML configuration file
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&text)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(url) = &self.remote_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::InvalidUrl(url.clone()));
            }
        }
        if self.collection.trim().is_empty() {
            return Err(ConfigError::MissingValue("collection"));
        }
        if self.collection.contains('/') {
            return Err(ConfigError::InvalidValue {
                key: "collection",
                message: "must not contain '/'".to_string(),
            });
        }
        Ok(())
    }

    /// Remote base URL without a trailing slash
    pub fn remote_base(&self) -> Option<&str> {
        self.remote_url.as_deref().map(|url| url.trim_end_matches('/'))
    }
}

/// Builder for SyncConfig
#[derive(Debug, Default)]
pub struct SyncConfigBuilder {
    remote_url: Option<String>,
    collection: Option<String>,
    data_dir: Option<PathBuf>,
    cache_ttl: Option<Duration>,
    request_timeout: Option<Duration>,
    auth_token: Option<String>,
}

impl SyncConfigBuilder {
    /// Set the remote store URL
    pub fn remote_url(mut self, url: impl Into<String>) -> Self {
        self.remote_url = Some(url.into());
        self
    }

    /// Set the remote collection
    pub fn collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = Some(collection.into());
        self
    }

    /// Set the local data directory
    pub fn data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(dir.into());
        self
    }

    /// Set the snapshot freshness window
    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = Some(ttl);
        self
    }

    /// Set the remote request timeout
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Set the bearer token
    pub fn auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<SyncConfig, ConfigError> {
        let defaults = SyncConfig::default();
        let config = SyncConfig {
            remote_url: self.remote_url.filter(|url| !url.trim().is_empty()),
            collection: self.collection.unwrap_or(defaults.collection),
            data_dir: self.data_dir.unwrap_or(defaults.data_dir),
            cache_ttl: self.cache_ttl.unwrap_or(defaults.cache_ttl),
            request_timeout: self.request_timeout.unwrap_or(defaults.request_timeout),
            auth_token: self.auth_token.filter(|token| !token.is_empty()),
        };
        config.validate()?;
        Ok(config)
    }
}

/// On-disk TOML layout
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    remote_url: Option<String>,
    collection: Option<String>,
    data_dir: Option<PathBuf>,
    cache_ttl_secs: Option<u64>,
    request_timeout_secs: Option<u64>,
    auth_token: Option<String>,
}

impl FileConfig {
    fn into_builder(self) -> SyncConfigBuilder {
        SyncConfigBuilder {
            remote_url: self.remote_url,
            collection: self.collection,
            data_dir: self.data_dir,
            cache_ttl: self.cache_ttl_secs.map(Duration::from_secs),
            request_timeout: self.request_timeout_secs.map(Duration::from_secs),
            auth_token: self.auth_token,
        }
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
    #[error("missing value: {0}")]
    MissingValue(&'static str),
    #[error("invalid value for {key}: {message}")]
    InvalidValue { key: &'static str, message: String },
    #[error("failed to parse configuration: {0}")]
    Parse(String),
    #[error("failed to read configuration: {0}")]
    Io(String),
}

fn default_data_dir() -> PathBuf {
    let mut path = dirs::data_dir().unwrap_or_else(std::env::temp_dir);
    path.push("curriculum-sync");
    path
}

fn parse_secs(key: &'static str, raw: &str) -> Result<u64, ConfigError> {
    raw.trim().parse::<u64>().map_err(|e| ConfigError::InvalidValue {
        key,
        message: e.to_string(),
    })
}
