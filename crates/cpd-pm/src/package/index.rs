//! Repository index
//!
//! One index per repository lists every published package, its versions, the
//! dependencies of each version and the SHA-256 digest of its archive.
//!
//! ```json
//! {
//!   "repository": "official",
//!   "packages": {
//!     "boost": {
//!       "versions": {
//!         "1.2.3": { "dependencies": ["official-zlib-1.0.0"], "sha256": "..." }
//!       },
//!       "latest": "1.2.3"
//!     }
//!   }
//! }
//! ```

use super::PackageRef;
use crate::semver::SemanticVersion;
use crate::specifier::VersionSpecType;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors raised when an index fails validation
#[derive(Debug, Error)]
pub enum IndexError {
    /// The bytes are not a well-formed index document
    #[error("Failed to parse package index for repository '{repository}': {source}")]
    Malformed {
        repository: String,
        #[source]
        source: serde_json::Error,
    },

    /// The index belongs to a different repository
    #[error("Package index inconsistency detected: got repository '{found}', expected '{expected}'")]
    RepositoryMismatch { expected: String, found: String },

    /// A package lists no versions at all
    #[error("Package index inconsistency detected: package '{package}' in repository '{repository}' has no versions")]
    NoVersions { repository: String, package: String },

    /// `latest` names a version that is not listed
    #[error("Package index inconsistency detected: latest version {latest} of package '{package}' in repository '{repository}' is not listed")]
    LatestNotListed {
        repository: String,
        package: String,
        latest: SemanticVersion,
    },
}

/// Dependencies and archive digest of one package version
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageSpecs {
    #[serde(default)]
    pub dependencies: Vec<PackageRef>,

    /// Hex-encoded SHA-256 of the package archive
    pub sha256: String,
}

/// All published versions of one package
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageEntry {
    pub versions: BTreeMap<SemanticVersion, PackageSpecs>,
    pub latest: SemanticVersion,
}

/// Per-repository manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageIndex {
    pub repository: String,
    #[serde(default)]
    pub packages: BTreeMap<String, PackageEntry>,
}

impl PackageIndex {
    /// Look up a package by name
    pub fn package(&self, name: &str) -> Option<&PackageEntry> {
        self.packages.get(name)
    }

    /// Look up the specs of one package version
    pub fn specs(&self, name: &str, version: &SemanticVersion) -> Option<&PackageSpecs> {
        self.package(name)?.versions.get(version)
    }

    /// Pick the version of `name` that a version spec selects.
    ///
    /// `Latest` follows the index's `latest` entry, `Exact` must be listed and
    /// `Bounds` yields the highest listed version that satisfies every bound.
    pub fn select_version(&self, name: &str, spec: &VersionSpecType) -> Option<SemanticVersion> {
        let entry = self.package(name)?;
        match spec {
            VersionSpecType::Latest => Some(entry.latest),
            VersionSpecType::Exact(version) => {
                entry.versions.contains_key(version).then_some(*version)
            }
            VersionSpecType::Bounds(_) => entry
                .versions
                .keys()
                .rev()
                .find(|version| spec.matches(version))
                .copied(),
        }
    }

    /// Serialize as pretty JSON (key order is stable)
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Deserialize and validate an index fetched for `requested_repository`.
///
/// Indexes come from a store that may be stale or controlled by a third
/// party, so an index is only accepted when it names the requested
/// repository and every package has at least one version including its
/// `latest`.
pub fn validate_package_index(
    bytes: &[u8],
    requested_repository: &str,
) -> Result<PackageIndex, IndexError> {
    let index: PackageIndex =
        serde_json::from_slice(bytes).map_err(|source| IndexError::Malformed {
            repository: requested_repository.to_string(),
            source,
        })?;

    if index.repository != requested_repository {
        return Err(IndexError::RepositoryMismatch {
            expected: requested_repository.to_string(),
            found: index.repository,
        });
    }

    for (name, entry) in &index.packages {
        if entry.versions.is_empty() {
            return Err(IndexError::NoVersions {
                repository: index.repository.clone(),
                package: name.clone(),
            });
        }
        if !entry.versions.contains_key(&entry.latest) {
            return Err(IndexError::LatestNotListed {
                repository: index.repository.clone(),
                package: name.clone(),
                latest: entry.latest,
            });
        }
    }

    Ok(index)
}
