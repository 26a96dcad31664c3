//! Dependency specifiers
//!
//! A specifier is the human-written dependency string
//! `[<repository>/]<name>[[<version_spec>]]`, for example `boost`,
//! `official/boost[1.2.3]` or `boost[>=1.5,<2.0]`.
//!
//! ## Version specs
//!
//! - `latest` (also the default when the brackets are omitted)
//! - an exact version `<major>.<minor>.<patch>`
//! - a comma-separated list of bounds `<op><major>[.<minor>[.<patch>]]`
//!   with `op` one of `<`, `<=`, `>`, `>=`; all bounds must hold

mod error;
pub mod lexer;
mod parser;

pub use error::SpecifierError;
pub use parser::parse_dependency_specifier;

use crate::semver::{SemanticVersion, SemanticVersionWithOptionalParts};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// Comparison operator of a version bound
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VersionSpecBoundOperand {
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
}

impl VersionSpecBoundOperand {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LessThan => "<",
            Self::LessThanOrEqual => "<=",
            Self::GreaterThan => ">",
            Self::GreaterThanOrEqual => ">=",
        }
    }

    /// Whether an ordering of `candidate` relative to the bound satisfies the operator
    fn accepts(&self, candidate_vs_bound: Ordering) -> bool {
        match self {
            Self::LessThan => candidate_vs_bound == Ordering::Less,
            Self::LessThanOrEqual => candidate_vs_bound != Ordering::Greater,
            Self::GreaterThan => candidate_vs_bound == Ordering::Greater,
            Self::GreaterThanOrEqual => candidate_vs_bound != Ordering::Less,
        }
    }
}

impl fmt::Display for VersionSpecBoundOperand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One inequality constraint on an acceptable version
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VersionSpecBound {
    pub operand: VersionSpecBoundOperand,
    pub version: SemanticVersionWithOptionalParts,
}

impl VersionSpecBound {
    /// Check a version against this bound.
    ///
    /// Only the components present in the bound take part in the comparison:
    /// `<2.0` rejects `2.0.5` and `<=1` accepts `1.9.9`.
    pub fn matches(&self, version: &SemanticVersion) -> bool {
        let candidate_vs_bound = self.version.compare_prefix(version).reverse();
        self.operand.accepts(candidate_vs_bound)
    }
}

impl fmt::Display for VersionSpecBound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.operand, self.version)
    }
}

/// The version part of a specifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum VersionSpecType {
    /// Whatever the index declares as latest
    #[default]
    Latest,

    /// Exactly this version
    Exact(SemanticVersion),

    /// All bounds must hold (never empty when produced by the parser)
    Bounds(Vec<VersionSpecBound>),
}

impl VersionSpecType {
    /// Check if a version satisfies this spec
    ///
    /// `Latest` accepts every version; picking the actual latest one is up to
    /// the index.
    pub fn matches(&self, version: &SemanticVersion) -> bool {
        match self {
            VersionSpecType::Latest => true,
            VersionSpecType::Exact(v) => v == version,
            VersionSpecType::Bounds(bounds) => bounds.iter().all(|b| b.matches(version)),
        }
    }
}

impl fmt::Display for VersionSpecType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionSpecType::Latest => f.write_str("latest"),
            VersionSpecType::Exact(v) => write!(f, "{}", v),
            VersionSpecType::Bounds(bounds) => {
                for (i, bound) in bounds.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{}", bound)?;
                }
                Ok(())
            }
        }
    }
}

/// Result of parsing a specifier string.
///
/// `repository == None` means the default repository, which the caller must
/// fill in before using the parts as a cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DependencySpecifierParts {
    pub repository: Option<String>,
    pub name: String,
    pub version_spec: VersionSpecType,
}

impl DependencySpecifierParts {
    /// The repository, or `default` when none was given
    pub fn repository_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.repository.as_deref().unwrap_or(default)
    }
}

/// Canonical composition: `[<repository>/]<name>[<version_spec>]`
impl fmt::Display for DependencySpecifierParts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref repository) = self.repository {
            write!(f, "{}/", repository)?;
        }
        write!(f, "{}[{}]", self.name, self.version_spec)
    }
}

/// A validated dependency specifier string together with its parts
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DependencySpecifier {
    raw: String,
    parts: DependencySpecifierParts,
}

impl DependencySpecifier {
    /// Parse and validate a specifier string
    pub fn parse(s: &str) -> Result<Self, SpecifierError> {
        let parts = parse_dependency_specifier(s)?;
        Ok(Self {
            raw: s.to_string(),
            parts,
        })
    }

    /// Compose the canonical specifier for a set of parts.
    ///
    /// The composed string is re-parsed, so parts that cannot be expressed
    /// (an empty bounds list, a name that is not an identifier) are rejected.
    pub fn from_parts(parts: &DependencySpecifierParts) -> Result<Self, SpecifierError> {
        Self::parse(&parts.to_string())
    }

    pub fn parts(&self) -> &DependencySpecifierParts {
        &self.parts
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl PartialEq for DependencySpecifier {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for DependencySpecifier {}

impl Hash for DependencySpecifier {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

impl fmt::Display for DependencySpecifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for DependencySpecifier {
    type Err = SpecifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for DependencySpecifier {
    type Error = SpecifierError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let parts = parse_dependency_specifier(&value)?;
        Ok(Self { raw: value, parts })
    }
}

impl From<DependencySpecifier> for String {
    fn from(specifier: DependencySpecifier) -> Self {
        specifier.raw
    }
}
