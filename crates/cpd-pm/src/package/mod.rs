//! Package references and repository indexes

mod index;

pub use index::{validate_package_index, IndexError, PackageEntry, PackageIndex, PackageSpecs};

use crate::semver::{SemanticVersion, VersionError};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

static NAME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z][a-z_]*$").expect("name pattern is a valid regex"));

/// Check a repository or package name against `^[a-z][a-z_]*$`
pub fn is_valid_name(name: &str) -> bool {
    NAME_PATTERN.is_match(name)
}

/// Errors that can occur while building a package reference
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PackageRefError {
    /// Not exactly three `-`-separated components
    #[error("Invalid package reference '{0}': expected <repository>-<name>-<version>")]
    InvalidFormat(String),

    /// Repository does not match the name pattern
    #[error("Invalid repository '{repository}' in package reference: must match ^[a-z][a-z_]*$")]
    InvalidRepository { repository: String },

    /// Package name does not match the name pattern
    #[error("Invalid package name '{name}' in package reference: must match ^[a-z][a-z_]*$")]
    InvalidName { name: String },

    /// Version is not a valid semantic version
    #[error("Invalid version in package reference: {0}")]
    InvalidVersion(#[from] VersionError),
}

/// A fully resolved package identity: `<repository>-<name>-<version>`
///
/// Both names match `^[a-z][a-z_]*$`, so the canonical string splits back
/// unambiguously on `-`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PackageRef {
    repository: String,
    name: String,
    version: SemanticVersion,
}

impl PackageRef {
    /// Build a reference from validated parts
    pub fn new(
        repository: impl Into<String>,
        name: impl Into<String>,
        version: SemanticVersion,
    ) -> Result<Self, PackageRefError> {
        let repository = repository.into();
        let name = name.into();

        if !is_valid_name(&repository) {
            return Err(PackageRefError::InvalidRepository { repository });
        }
        if !is_valid_name(&name) {
            return Err(PackageRefError::InvalidName { name });
        }

        Ok(Self {
            repository,
            name,
            version,
        })
    }

    /// Parse `<repository>-<name>-<version>`
    pub fn parse(s: &str) -> Result<Self, PackageRefError> {
        let components: Vec<&str> = s.split('-').collect();
        let [repository, name, version] = components.as_slice() else {
            return Err(PackageRefError::InvalidFormat(s.to_string()));
        };
        let version = SemanticVersion::parse(version)?;
        Self::new(*repository, *name, version)
    }

    pub fn repository(&self) -> &str {
        &self.repository
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> SemanticVersion {
        self.version
    }

    /// The `(repository, name, version)` triple
    pub fn unpack(&self) -> (&str, &str, SemanticVersion) {
        (&self.repository, &self.name, self.version)
    }
}

impl fmt::Display for PackageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.repository, self.name, self.version)
    }
}

impl FromStr for PackageRef {
    type Err = PackageRefError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for PackageRef {
    type Error = PackageRefError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<PackageRef> for String {
    fn from(package_ref: PackageRef) -> Self {
        package_ref.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_names() {
        assert!(is_valid_name("boost"));
        assert!(is_valid_name("simple_package"));
        assert!(!is_valid_name("Boost"));
        assert!(!is_valid_name("_boost"));
        assert!(!is_valid_name("boost2"));
        assert!(!is_valid_name("my-lib"));
        assert!(!is_valid_name(""));
    }

    #[test]
    fn test_parse_and_unpack() {
        let r = PackageRef::parse("repo-name-1.2.3").unwrap();
        assert_eq!(r.unpack(), ("repo", "name", SemanticVersion::new(1, 2, 3)));
        assert_eq!(r.to_string(), "repo-name-1.2.3");
    }

    #[test]
    fn test_parse_rejects_bad_arity() {
        assert!(matches!(
            PackageRef::parse("repo-name"),
            Err(PackageRefError::InvalidFormat(_))
        ));
        assert!(matches!(
            PackageRef::parse("a-b-c-1.0.0"),
            Err(PackageRefError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_parse_rejects_bad_version() {
        assert!(matches!(
            PackageRef::parse("repo-name-1.2"),
            Err(PackageRefError::InvalidVersion(_))
        ));
    }

    #[test]
    fn test_parse_rejects_bad_names() {
        assert!(matches!(
            PackageRef::parse("Repo-name-1.0.0"),
            Err(PackageRefError::InvalidRepository { .. })
        ));
        assert!(matches!(
            PackageRef::parse("repo-name2-1.0.0"),
            Err(PackageRefError::InvalidName { .. })
        ));
    }

    #[test]
    fn test_serde_as_string() {
        let r: PackageRef = serde_json::from_str("\"repo-simple_package-1.0.0\"").unwrap();
        assert_eq!(r.name(), "simple_package");
        assert_eq!(
            serde_json::to_string(&r).unwrap(),
            "\"repo-simple_package-1.0.0\""
        );
    }
}
