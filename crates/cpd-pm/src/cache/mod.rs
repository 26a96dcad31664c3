//! Local package cache
//!
//! Mirrors repository indexes and extracted package archives on disk.
//!
//! Directory structure:
//! ```text
//! <cache_dir>/
//! ├── indexes/
//! │   └── <repository>.json
//! ├── packages/
//! │   └── <repository>-<name>-<version>/
//! │       ├── bin/
//! │       ├── lib/
//! │       └── include/
//! ├── .tmp/
//! └── .lock
//! ```
//!
//! Everything is fetched and unpacked under `.tmp/` first and only renamed
//! into `indexes/` or `packages/` while holding the cache lock, so readers
//! never observe partially written files.

mod lock;
mod package;

pub use lock::CacheLock;
pub use package::{CachedPackage, PackageFileSpecs};

use crate::package::{
    validate_package_index, IndexError, PackageIndex, PackageRef, PackageRefError, PackageSpecs,
};
use crate::semver::SemanticVersion;
use crate::specifier::DependencySpecifierParts;
use crate::store::{FetchError, PackageStore, Progress, StoreError};
use package::extract_archive;
use sha2::{Digest, Sha256};
use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;
use thiserror::Error;
use tracing::{debug, info};

const INDEXES_DIR: &str = "indexes";
const PACKAGES_DIR: &str = "packages";
const TMP_DIR: &str = ".tmp";
const LOCK_FILE: &str = ".lock";

/// Errors that can occur during cache operations
#[derive(Debug, Error)]
pub enum CacheError {
    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Store metadata could not be read
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Transport failure while fetching from the store
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// A freshly fetched index failed validation
    #[error(transparent)]
    InvalidIndex(#[from] IndexError),

    /// An index already in the cache failed validation
    #[error("Cached index of repository '{repository}' is corrupt: {source}")]
    CorruptIndex {
        repository: String,
        #[source]
        source: IndexError,
    },

    /// No index is cached for the repository
    #[error("Repository '{repository}' is not in the cache")]
    MissingRepository { repository: String },

    /// The repository index does not list the package
    #[error("Package '{name}' was not found in repository '{repository}'")]
    MissingPackage { repository: String, name: String },

    /// The repository index does not list the version
    #[error("Version {version} of package '{name}' was not found in repository '{repository}'")]
    MissingVersion {
        repository: String,
        name: String,
        version: SemanticVersion,
    },

    /// No listed version satisfies a version spec
    #[error("No version of package '{name}' in repository '{repository}' matches '{spec}'")]
    NoMatchingVersion {
        repository: String,
        name: String,
        spec: String,
    },

    /// Resolved parts do not form a valid package reference
    #[error(transparent)]
    InvalidPackageRef(#[from] PackageRefError),

    /// The cache lock could not be acquired in time
    #[error("The cache is already in use by another process (waited {timeout:?} for {path})")]
    Contention { path: PathBuf, timeout: Duration },

    /// Downloaded archive does not match the index digest
    #[error("Checksum mismatch for package {package}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        package: PackageRef,
        expected: String,
        actual: String,
    },

    /// Archive could not be unpacked
    #[error("Failed to extract package {package}: {source}")]
    Extraction {
        package: PackageRef,
        #[source]
        source: io::Error,
    },

    /// Archive entry would be written outside the package directory
    #[error("Package {package} contains an unsafe path: {}", path.display())]
    UnsafeArchivePath { package: PackageRef, path: PathBuf },
}

impl CacheError {
    /// Actionable advice for the user, if there is any
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            CacheError::MissingRepository { .. }
            | CacheError::MissingPackage { .. }
            | CacheError::MissingVersion { .. }
            | CacheError::NoMatchingVersion { .. } => {
                Some("run `cpd update` to refresh the repository indices")
            }
            CacheError::Contention { .. } => {
                Some("another process holds the cache lock; retry once it has finished")
            }
            CacheError::CorruptIndex { .. } => {
                Some("the cache is inconsistent; run `cpd update` to replace the index")
            }
            CacheError::ChecksumMismatch { .. } => {
                Some("the store and the cached index disagree; run `cpd update` and retry")
            }
            _ => None,
        }
    }
}

/// Disk-persisted mirror of repository indexes and extracted packages
pub struct PackageCache {
    root: PathBuf,
    store: PackageStore,
    lock_timeout: Option<Duration>,
}

impl PackageCache {
    /// Open the cache at `root`, creating its directory structure if needed
    ///
    /// # Arguments
    /// * `root` - Cache directory
    /// * `store` - Where indexes and archives are fetched from
    pub fn open(root: impl Into<PathBuf>, store: PackageStore) -> Result<Self, CacheError> {
        let root = root.into();
        fs::create_dir_all(root.join(INDEXES_DIR))?;
        fs::create_dir_all(root.join(PACKAGES_DIR))?;
        fs::create_dir_all(root.join(TMP_DIR))?;

        Ok(Self {
            root,
            store,
            lock_timeout: None,
        })
    }

    /// How long writers wait for the cache lock (`None` waits indefinitely)
    pub fn with_lock_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.lock_timeout = timeout;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn store(&self) -> &PackageStore {
        &self.store
    }

    fn index_file(&self, repository: &str) -> PathBuf {
        self.root.join(INDEXES_DIR).join(format!("{}.json", repository))
    }

    /// Directory a package is extracted to
    pub fn package_dir(&self, package_ref: &PackageRef) -> PathBuf {
        self.root.join(PACKAGES_DIR).join(package_ref.to_string())
    }

    fn lock(&self) -> Result<CacheLock, CacheError> {
        CacheLock::acquire(&self.root.join(LOCK_FILE), self.lock_timeout)
    }

    /// Scratch directory inside `.tmp/`, removed when dropped
    fn scratch_dir(&self) -> Result<TempDir, CacheError> {
        Ok(tempfile::Builder::new()
            .prefix("cpd-")
            .tempdir_in(self.root.join(TMP_DIR))?)
    }

    /// Fetch and validate every repository index, then replace the cached
    /// indexes in one critical section
    ///
    /// Cached indexes of repositories the store no longer lists are removed
    /// in the same critical section.
    ///
    /// # Returns
    /// * `Ok(Vec<String>)` - Repositories whose index was updated
    /// * `Err(CacheError)` - Nothing in `indexes/` was modified
    pub fn update_repositories(&self) -> Result<Vec<String>, CacheError> {
        let repositories = self.store.get_repositories()?;
        let scratch = self.scratch_dir()?;

        let mut staged = Vec::with_capacity(repositories.len());
        for repository in &repositories {
            debug!(%repository, "fetching index");
            let bytes = self.store.get_index(repository)?;
            let index = validate_package_index(&bytes, repository)?;

            let staged_path = scratch.path().join(format!("{}.json", repository));
            fs::write(&staged_path, &bytes)?;
            staged.push((repository, staged_path));
            debug!(%repository, packages = index.packages.len(), "staged index");
        }

        let _lock = self.lock()?;
        for (repository, staged_path) in staged {
            fs::rename(&staged_path, self.index_file(repository))?;
        }
        for stale in self.cached_repositories()? {
            if !repositories.contains(&stale) {
                debug!(repository = %stale, "removing index of unlisted repository");
                fs::remove_file(self.index_file(&stale))?;
            }
        }

        info!(count = repositories.len(), "updated repository indices");
        Ok(repositories)
    }

    /// Repositories with a cached index, sorted
    pub fn cached_repositories(&self) -> Result<Vec<String>, CacheError> {
        let mut repositories = Vec::new();
        for entry in fs::read_dir(self.root.join(INDEXES_DIR))? {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                if let Some(stem) = path.file_stem() {
                    repositories.push(stem.to_string_lossy().into_owned());
                }
            }
        }
        repositories.sort();
        Ok(repositories)
    }

    /// Load the cached index of a repository
    pub fn load_index(&self, repository: &str) -> Result<PackageIndex, CacheError> {
        let bytes = fs::read(self.index_file(repository)).map_err(|err| {
            if err.kind() == io::ErrorKind::NotFound {
                CacheError::MissingRepository {
                    repository: repository.to_string(),
                }
            } else {
                CacheError::Io(err)
            }
        })?;

        validate_package_index(&bytes, repository).map_err(|source| CacheError::CorruptIndex {
            repository: repository.to_string(),
            source,
        })
    }

    /// Compute the set of packages `package_ref` needs, itself included.
    ///
    /// Reads the cached indexes only; the cache is never modified.
    pub fn resolve(&self, package_ref: &PackageRef) -> Result<HashSet<PackageRef>, CacheError> {
        Ok(self.resolve_specs(package_ref)?.into_keys().collect())
    }

    /// Depth-first walk over the dependency lists of the cached indexes
    fn resolve_specs(
        &self,
        package_ref: &PackageRef,
    ) -> Result<HashMap<PackageRef, PackageSpecs>, CacheError> {
        let mut indexes: HashMap<String, PackageIndex> = HashMap::new();
        let mut resolved: HashMap<PackageRef, PackageSpecs> = HashMap::new();
        let mut to_visit = vec![package_ref.clone()];

        while let Some(current) = to_visit.pop() {
            if resolved.contains_key(&current) {
                continue;
            }

            let (repository, name, version) = current.unpack();
            let index = match indexes.entry(repository.to_string()) {
                Entry::Occupied(entry) => entry.into_mut(),
                Entry::Vacant(entry) => entry.insert(self.load_index(repository)?),
            };

            let entry = index
                .package(name)
                .ok_or_else(|| CacheError::MissingPackage {
                    repository: repository.to_string(),
                    name: name.to_string(),
                })?;
            let specs = entry
                .versions
                .get(&version)
                .ok_or_else(|| CacheError::MissingVersion {
                    repository: repository.to_string(),
                    name: name.to_string(),
                    version,
                })?;

            to_visit.extend(
                specs
                    .dependencies
                    .iter()
                    .filter(|dependency| !resolved.contains_key(*dependency))
                    .cloned(),
            );
            let specs = specs.clone();
            resolved.insert(current, specs);
        }

        debug!(package = %package_ref, count = resolved.len(), "resolved dependencies");
        Ok(resolved)
    }

    /// Turn parsed specifier parts into a concrete reference using the
    /// cached index of its repository
    pub fn resolve_specifier(
        &self,
        parts: &DependencySpecifierParts,
        default_repository: &str,
    ) -> Result<PackageRef, CacheError> {
        let repository = parts.repository_or(default_repository);
        let index = self.load_index(repository)?;

        if index.package(&parts.name).is_none() {
            return Err(CacheError::MissingPackage {
                repository: repository.to_string(),
                name: parts.name.clone(),
            });
        }

        let version = index
            .select_version(&parts.name, &parts.version_spec)
            .ok_or_else(|| CacheError::NoMatchingVersion {
                repository: repository.to_string(),
                name: parts.name.clone(),
                spec: parts.version_spec.to_string(),
            })?;

        Ok(PackageRef::new(repository, parts.name.as_str(), version)?)
    }

    /// Whether a package is already extracted in the cache
    pub fn is_package_cached(&self, package_ref: &PackageRef) -> bool {
        self.package_dir(package_ref).is_dir()
    }

    /// Make `package_ref` and everything it depends on available in the cache
    ///
    /// The returned set carries no install order.
    pub fn get_package_with_dependencies(
        &self,
        package_ref: &PackageRef,
    ) -> Result<HashSet<CachedPackage>, CacheError> {
        let resolved = self.resolve_specs(package_ref)?;

        let mut packages = HashSet::with_capacity(resolved.len());
        for (package_ref, specs) in resolved {
            let package_dir = self.package_dir(&package_ref);
            if package_dir.is_dir() {
                debug!(package = %package_ref, "already cached");
            } else {
                self.install_package(&package_ref, &specs)?;
            }
            packages.insert(CachedPackage::load(package_dir, package_ref)?);
        }
        Ok(packages)
    }

    /// Download, verify and extract one package, then move it into place
    fn install_package(
        &self,
        package_ref: &PackageRef,
        specs: &PackageSpecs,
    ) -> Result<(), CacheError> {
        let report = |progress: Progress| {
            debug!(
                package = %package_ref,
                retrieved = progress.retrieved_bytes,
                total = ?progress.total_bytes,
                "downloading"
            );
        };
        let archive = self.store.get_package_file(package_ref, Some(&report))?;

        let actual = hex::encode(Sha256::digest(&archive));
        if !actual.eq_ignore_ascii_case(&specs.sha256) {
            return Err(CacheError::ChecksumMismatch {
                package: package_ref.clone(),
                expected: specs.sha256.clone(),
                actual,
            });
        }

        let scratch = self.scratch_dir()?;
        let staged = scratch.path().join("package");
        fs::create_dir(&staged)?;
        extract_archive(&archive, &staged, package_ref)?;

        let _lock = self.lock()?;
        let target = self.package_dir(package_ref);
        if target.exists() {
            // Another process installed it while we were downloading
            debug!(package = %package_ref, "keeping concurrently installed package");
        } else {
            fs::rename(&staged, &target)?;
            info!(package = %package_ref, "installed package");
        }
        Ok(())
    }
}
