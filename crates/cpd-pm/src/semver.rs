//! Semantic versioning restricted to `MAJOR.MINOR.PATCH`
//!
//! Provides the exact version used by package references and indexes, and the
//! partial version that only ever appears as the operand of a version bound.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur while validating versions
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VersionError {
    /// Wrong number of components or a component that is not a number
    #[error("Invalid semantic version '{0}': expected <major>.<minor>.<patch> with non-negative integer parts")]
    InvalidVersion(String),

    /// A component outside the u64 range
    #[error("Invalid {component} component '{value}' in version '{version}'")]
    InvalidComponent {
        component: &'static str,
        value: String,
        version: String,
    },

    /// A component written with a leading zero, such as `01.2.3`
    #[error("Version '{version}' has a leading zero in its {component} component; write '{canonical}' instead of '{value}'")]
    LeadingZero {
        component: &'static str,
        value: String,
        canonical: String,
        version: String,
    },

    /// `SemanticVersionWithOptionalParts` built with a patch but no minor
    #[error("Cannot specify a patch version without a minor version (major = {major}, patch = {patch})")]
    PatchWithoutMinor { major: u64, patch: u64 },
}

/// Semantic version (MAJOR.MINOR.PATCH)
///
/// Ordering is lexicographic on `(major, minor, patch)`. The canonical string
/// form is `"<major>.<minor>.<patch>"` without leading zeros, so parsing and
/// printing round-trip exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SemanticVersion {
    major: u64,
    minor: u64,
    patch: u64,
}

impl SemanticVersion {
    /// Create a version from its parts
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Parse a version string of the exact form `<major>.<minor>.<patch>`
    pub fn parse(s: &str) -> Result<Self, VersionError> {
        let parts: Vec<&str> = s.split('.').collect();
        if parts.len() != 3 {
            return Err(VersionError::InvalidVersion(s.to_string()));
        }

        let major = parse_component("major", parts[0], s)?;
        let minor = parse_component("minor", parts[1], s)?;
        let patch = parse_component("patch", parts[2], s)?;

        Ok(Self::new(major, minor, patch))
    }

    /// Check whether a string is a valid semantic version
    pub fn is_valid(s: &str) -> bool {
        Self::parse(s).is_ok()
    }

    pub fn major(&self) -> u64 {
        self.major
    }

    pub fn minor(&self) -> u64 {
        self.minor
    }

    pub fn patch(&self) -> u64 {
        self.patch
    }

    /// The components as a tuple
    pub fn parts(&self) -> (u64, u64, u64) {
        (self.major, self.minor, self.patch)
    }
}

/// Parse one numeric version component.
///
/// Only ASCII digits are accepted (no sign, no whitespace) and leading zeros
/// are rejected so that the string form stays canonical.
fn parse_component(component: &'static str, value: &str, version: &str) -> Result<u64, VersionError> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(VersionError::InvalidVersion(version.to_string()));
    }

    let parsed: u64 = value.parse().map_err(|_| VersionError::InvalidComponent {
        component,
        value: value.to_string(),
        version: version.to_string(),
    })?;

    if value.len() > 1 && value.starts_with('0') {
        return Err(VersionError::LeadingZero {
            component,
            value: value.to_string(),
            canonical: parsed.to_string(),
            version: version.to_string(),
        });
    }

    Ok(parsed)
}

impl fmt::Display for SemanticVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for SemanticVersion {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for SemanticVersion {
    type Error = VersionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<SemanticVersion> for String {
    fn from(version: SemanticVersion) -> Self {
        version.to_string()
    }
}

impl PartialOrd for SemanticVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SemanticVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        match self.major.cmp(&other.major) {
            Ordering::Equal => {}
            ord => return ord,
        }
        match self.minor.cmp(&other.minor) {
            Ordering::Equal => {}
            ord => return ord,
        }
        self.patch.cmp(&other.patch)
    }
}

/// A version with optional minor and patch parts.
///
/// Valid shapes are `<major>`, `<major>.<minor>` and `<major>.<minor>.<patch>`.
/// Used only as the operand of a version bound, never as a resolved version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SemanticVersionWithOptionalParts {
    major: u64,
    minor: Option<u64>,
    patch: Option<u64>,
}

impl SemanticVersionWithOptionalParts {
    /// Create a partial version; a patch without a minor is rejected
    pub fn new(major: u64, minor: Option<u64>, patch: Option<u64>) -> Result<Self, VersionError> {
        if let (None, Some(patch)) = (minor, patch) {
            return Err(VersionError::PatchWithoutMinor { major, patch });
        }
        Ok(Self {
            major,
            minor,
            patch,
        })
    }

    /// Parse `"1"`, `"1.2"` or `"1.2.3"`
    pub fn parse(s: &str) -> Result<Self, VersionError> {
        let parts: Vec<&str> = s.split('.').collect();
        if parts.len() > 3 {
            return Err(VersionError::InvalidVersion(s.to_string()));
        }

        let major = parse_component("major", parts[0], s)?;
        let minor = parts
            .get(1)
            .map(|p| parse_component("minor", p, s))
            .transpose()?;
        let patch = parts
            .get(2)
            .map(|p| parse_component("patch", p, s))
            .transpose()?;

        Self::new(major, minor, patch)
    }

    pub fn major(&self) -> u64 {
        self.major
    }

    pub fn minor(&self) -> Option<u64> {
        self.minor
    }

    pub fn patch(&self) -> Option<u64> {
        self.patch
    }

    /// Compare against the same-length prefix of a full version.
    ///
    /// `2.0` compared with `2.0.5` is `Equal`, `1` compared with `1.9.9` is
    /// `Equal`, `1.5` compared with `1.4.0` is `Greater`.
    pub fn compare_prefix(&self, version: &SemanticVersion) -> Ordering {
        match self.major.cmp(&version.major()) {
            Ordering::Equal => {}
            ord => return ord,
        }
        let Some(minor) = self.minor else {
            return Ordering::Equal;
        };
        match minor.cmp(&version.minor()) {
            Ordering::Equal => {}
            ord => return ord,
        }
        match self.patch {
            Some(patch) => patch.cmp(&version.patch()),
            None => Ordering::Equal,
        }
    }
}

impl From<SemanticVersion> for SemanticVersionWithOptionalParts {
    fn from(version: SemanticVersion) -> Self {
        Self {
            major: version.major(),
            minor: Some(version.minor()),
            patch: Some(version.patch()),
        }
    }
}

impl fmt::Display for SemanticVersionWithOptionalParts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.major)?;
        if let Some(minor) = self.minor {
            write!(f, ".{}", minor)?;
            if let Some(patch) = self.patch {
                write!(f, ".{}", patch)?;
            }
        }
        Ok(())
    }
}

impl FromStr for SemanticVersionWithOptionalParts {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
