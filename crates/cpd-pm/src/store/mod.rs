//! Package store access
//!
//! The store publishes everything per platform:
//!
//! ```text
//! repositories/<platform>/repositories.json
//! indexes/<platform>/<repository>.json
//! packages/<platform>/<repository>/<name>-<version>.zip
//! ```
//!
//! where `<platform>` is `<arch>-<name>-<version>`.

mod fetch;

pub use fetch::{
    FetchError, FileProvider, HttpFileProvider, LocalFileProvider, Progress, MAX_CONTENT_SIZE,
    REQUEST_TIMEOUT,
};

use crate::package::{is_valid_name, PackageRef};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;
use tracing::debug;

/// Errors raised while reading store metadata
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// `repositories.json` is not a JSON list of names
    #[error("Invalid repository list: {0}")]
    InvalidRepositoryList(#[source] serde_json::Error),

    /// The repository list contains a name that is not a valid identifier
    #[error("Invalid repository name in repository list: '{0}'")]
    InvalidRepositoryName(String),

    /// The repository list names the same repository twice
    #[error("Repository '{0}' is listed more than once")]
    DuplicateRepository(String),
}

/// Target platform of the packages being fetched
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Platform {
    pub arch: String,
    pub name: String,
    pub version: String,
}

impl Platform {
    pub fn new(
        arch: impl Into<String>,
        name: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            arch: arch.into(),
            name: name.into(),
            version: version.into(),
        }
    }

    /// The path segment used by the store: `<arch>-<name>-<version>`
    pub fn canonical(&self) -> String {
        format!("{}-{}-{}", self.arch, self.name, self.version)
    }
}

impl Default for Platform {
    /// The host architecture and operating system with a generic version
    fn default() -> Self {
        Self::new(std::env::consts::ARCH, std::env::consts::OS, "generic")
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical())
    }
}

/// Path of the repository list for a platform
pub fn repositories_path(platform: &Platform) -> String {
    format!("repositories/{}/repositories.json", platform.canonical())
}

/// Path of a repository index for a platform
pub fn index_path(platform: &Platform, repository: &str) -> String {
    format!("indexes/{}/{}.json", platform.canonical(), repository)
}

/// Path of a package archive for a platform
pub fn package_path(platform: &Platform, package_ref: &PackageRef) -> String {
    let (repository, name, version) = package_ref.unpack();
    format!(
        "packages/{}/{}/{}-{}.zip",
        platform.canonical(),
        repository,
        name,
        version
    )
}

/// Platform-scoped view of a [`FileProvider`]
pub struct PackageStore {
    provider: Box<dyn FileProvider>,
    platform: Platform,
}

impl PackageStore {
    pub fn new(provider: Box<dyn FileProvider>, platform: Platform) -> Self {
        Self { provider, platform }
    }

    pub fn platform(&self) -> &Platform {
        &self.platform
    }

    /// List the repositories published for this platform
    pub fn get_repositories(&self) -> Result<Vec<String>, StoreError> {
        let bytes = self.provider.get(&repositories_path(&self.platform), None)?;
        let repositories: Vec<String> =
            serde_json::from_slice(&bytes).map_err(StoreError::InvalidRepositoryList)?;

        let mut seen = HashSet::new();
        for repository in &repositories {
            if !is_valid_name(repository) {
                return Err(StoreError::InvalidRepositoryName(repository.clone()));
            }
            if !seen.insert(repository.as_str()) {
                return Err(StoreError::DuplicateRepository(repository.clone()));
            }
        }

        debug!(count = repositories.len(), platform = %self.platform, "listed repositories");
        Ok(repositories)
    }

    /// Fetch the raw (unvalidated) index of a repository
    pub fn get_index(&self, repository: &str) -> Result<Vec<u8>, FetchError> {
        self.provider.get(&index_path(&self.platform, repository), None)
    }

    /// Fetch the archive of a package, reporting transfer progress
    pub fn get_package_file(
        &self,
        package_ref: &PackageRef,
        progress: Option<&dyn Fn(Progress)>,
    ) -> Result<Vec<u8>, FetchError> {
        self.provider
            .get(&package_path(&self.platform, package_ref), progress)
    }
}
