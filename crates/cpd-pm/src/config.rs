//! User configuration (~/.cpd/config.toml)
//!
//! ```toml
//! default_repository = "official"
//! cache_dir = "/var/cache/cpd"
//! lock_timeout_secs = 30
//!
//! [store]
//! url = "https://packages.example.com/cpd"
//!
//! [platform]
//! arch = "x86_64"
//! name = "ubuntu"
//! version = "22.04"
//! ```

use crate::package::is_valid_name;
use crate::store::{FetchError, HttpFileProvider, LocalFileProvider, PackageStore, Platform};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Repository used when a specifier does not name one
pub const DEFAULT_REPOSITORY: &str = "official";

/// Errors that can occur while loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to parse TOML
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Validation error
    #[error("Invalid config: {0}")]
    ValidationError(String),

    /// Home directory could not be determined
    #[error("Could not determine home directory")]
    NoHomeDir,

    /// Neither the config nor the command line names a store
    #[error("No package store configured: set [store] in the config or pass --store-dir/--store-url")]
    NoStore,

    /// Store provider could not be created
    #[error("Failed to set up package store: {0}")]
    Store(#[from] FetchError),
}

/// Where packages are fetched from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreConfig {
    /// A directory laid out like the store
    Local(PathBuf),
    /// Base URL of an HTTP(S) store
    Url(String),
}

/// Package manager configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PmConfig {
    #[serde(default = "default_repository")]
    pub default_repository: String,

    /// Cache directory (default: ~/.cpd/cache)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store: Option<StoreConfig>,

    /// Seconds to wait for the cache lock; unset waits indefinitely
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lock_timeout_secs: Option<u64>,

    #[serde(default)]
    pub platform: Platform,
}

fn default_repository() -> String {
    DEFAULT_REPOSITORY.to_string()
}

impl Default for PmConfig {
    fn default() -> Self {
        Self {
            default_repository: default_repository(),
            cache_dir: None,
            store: None,
            lock_timeout_secs: None,
            platform: Platform::default(),
        }
    }
}

impl PmConfig {
    /// `~/.cpd`
    pub fn home_dir() -> Result<PathBuf, ConfigError> {
        dirs::home_dir()
            .map(|home| home.join(".cpd"))
            .ok_or(ConfigError::NoHomeDir)
    }

    /// Load `~/.cpd/config.toml`, or the defaults when it does not exist
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::home_dir()?.join("config.toml");
        if path.exists() {
            Self::from_file(&path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let config: PmConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !is_valid_name(&self.default_repository) {
            return Err(ConfigError::ValidationError(format!(
                "default_repository '{}' must match ^[a-z][a-z_]*$",
                self.default_repository
            )));
        }
        for (field, value) in [
            ("arch", &self.platform.arch),
            ("name", &self.platform.name),
            ("version", &self.platform.version),
        ] {
            if value.is_empty() || value.contains('/') {
                return Err(ConfigError::ValidationError(format!(
                    "platform.{} '{}' must be a non-empty path segment",
                    field, value
                )));
            }
        }
        Ok(())
    }

    /// Configured cache directory, or `~/.cpd/cache`
    pub fn cache_dir(&self) -> Result<PathBuf, ConfigError> {
        match self.cache_dir {
            Some(ref dir) => Ok(dir.clone()),
            None => Ok(Self::home_dir()?.join("cache")),
        }
    }

    pub fn lock_timeout(&self) -> Option<Duration> {
        self.lock_timeout_secs.map(Duration::from_secs)
    }

    /// Build the package store described by `store` and `platform`
    pub fn package_store(&self) -> Result<PackageStore, ConfigError> {
        let store = self.store.as_ref().ok_or(ConfigError::NoStore)?;
        let provider: Box<dyn crate::store::FileProvider> = match store {
            StoreConfig::Local(dir) => Box::new(LocalFileProvider::new(dir)),
            StoreConfig::Url(url) => Box::new(HttpFileProvider::new(url)?),
        };
        Ok(PackageStore::new(provider, self.platform.clone()))
    }
}
