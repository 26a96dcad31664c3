//! cpd Package Manager Library
//!
//! This crate provides the package management core of cpd, including:
//! - Dependency specifier parsing (`official/boost[>=1.5,<2.0]`)
//! - Semantic versions and partial version bounds
//! - Package references and repository index validation
//! - Store access over a local directory or HTTP
//! - A lock-protected local cache of indexes and extracted packages

pub mod cache;
pub mod config;
pub mod package;
pub mod semver;
pub mod specifier;
pub mod store;

pub use cache::{CacheError, CacheLock, CachedPackage, PackageCache, PackageFileSpecs};
pub use config::{ConfigError, PmConfig, StoreConfig, DEFAULT_REPOSITORY};
pub use package::{
    is_valid_name, validate_package_index, IndexError, PackageEntry, PackageIndex, PackageRef,
    PackageRefError, PackageSpecs,
};
pub use semver::{SemanticVersion, SemanticVersionWithOptionalParts, VersionError};
pub use specifier::{
    parse_dependency_specifier, DependencySpecifier, DependencySpecifierParts, SpecifierError,
    VersionSpecBound, VersionSpecBoundOperand, VersionSpecType,
};
pub use store::{
    FetchError, FileProvider, HttpFileProvider, LocalFileProvider, PackageStore, Platform,
    Progress, StoreError,
};
