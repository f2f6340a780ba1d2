//! Backend connection configuration.
//!
//! Configuration comes from an optional TOML file (`--config <path>` or
//! `REELHUB_CONFIG`), then environment overrides:
//! - `BACKEND_API_URL`: base URL of the backend API
//! - `BACKEND_API_TIMEOUT`: request timeout in seconds
//! - `TENANT_DEFAULT_API_KEY`: credential used when a request carries none

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "https://fitform100.com";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_LMDB_SIZE_MB: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct BackendConfig {
    pub api_url: String,
    pub timeout_secs: u64,
    pub default_api_key: String,
    pub cache: CacheSettings,
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct CacheSettings {
    pub backend: CacheBackendKind,
    pub lmdb_path: Option<PathBuf>,
    pub lmdb_max_size_mb: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheBackendKind {
    Memory,
    Lmdb,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Text,
    Json,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            default_api_key: String::new(),
            cache: CacheSettings::default(),
            log_format: LogFormat::Text,
        }
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            backend: CacheBackendKind::Memory,
            lmdb_path: None,
            lmdb_max_size_mb: DEFAULT_LMDB_SIZE_MB,
        }
    }
}

impl BackendConfig {
    /// Load from the file named on the command line or in `REELHUB_CONFIG`
    /// (defaults when neither is set), then apply environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let path = match config_path_from_args()? {
            Some(path) => Some(path),
            None => config_path_from_env(),
        };
        let mut config = match path {
            Some(path) => Self::from_path(&path)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|e| ConfigError::Parse {
            reason: e.to_string(),
        })
    }

    /// Apply environment-style overrides through `lookup`.
    ///
    /// Unparseable timeouts are ignored and the file value is kept.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("BACKEND_API_URL").filter(|s| !s.trim().is_empty()) {
            self.api_url = url.trim().to_string();
        }
        if let Some(timeout) = lookup("BACKEND_API_TIMEOUT").and_then(|s| s.trim().parse().ok()) {
            self.timeout_secs = timeout;
        }
        if let Some(key) = lookup("TENANT_DEFAULT_API_KEY") {
            self.default_api_key = key;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = self.api_url.trim();
        if url.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "api_url",
                reason: "must not be empty".to_string(),
            });
        }
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::InvalidValue {
                field: "api_url",
                reason: "must start with http:// or https://".to_string(),
            });
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "timeout_secs",
                reason: "must be > 0".to_string(),
            });
        }
        if self.cache.backend == CacheBackendKind::Lmdb {
            match &self.cache.lmdb_path {
                Some(path) if !path.as_os_str().is_empty() => {}
                _ => {
                    return Err(ConfigError::InvalidValue {
                        field: "cache.lmdb_path",
                        reason: "required when cache.backend = \"lmdb\"".to_string(),
                    })
                }
            }
            if self.cache.lmdb_max_size_mb == 0 {
                return Err(ConfigError::InvalidValue {
                    field: "cache.lmdb_max_size_mb",
                    reason: "must be > 0".to_string(),
                });
            }
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        self.api_url.trim().trim_end_matches('/')
    }
}

fn config_path_from_env() -> Option<PathBuf> {
    std::env::var("REELHUB_CONFIG").ok().map(PathBuf::from)
}

fn config_path_from_args() -> Result<Option<PathBuf>, ConfigError> {
    config_path_in(std::env::args().skip(1))
}

/// Find the value following `--config`. A trailing `--config` with no value
/// is an error rather than a silent fallback to defaults.
fn config_path_in<I>(args: I) -> Result<Option<PathBuf>, ConfigError>
where
    I: IntoIterator<Item = String>,
{
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        if arg == "--config" {
            return match args.next() {
                Some(path) if !path.starts_with("--") => Ok(Some(PathBuf::from(path))),
                _ => Err(ConfigError::MissingConfigPath),
            };
        }
    }
    Ok(None)
}
