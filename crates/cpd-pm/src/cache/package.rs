//! Extracted packages

use super::CacheError;
use crate::package::PackageRef;
use std::fs::{self, File};
use std::io::{self, Cursor};
use std::path::{Path, PathBuf};
use zip::ZipArchive;

/// Files a package provides, relative to its `bin/`, `lib/` and `include/`
/// directories, sorted
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct PackageFileSpecs {
    pub binaries: Vec<String>,
    pub libraries: Vec<String>,
    pub includes: Vec<String>,
}

/// A package that is extracted in the cache
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CachedPackage {
    pub package_ref: PackageRef,
    pub path: PathBuf,
    pub file_specs: PackageFileSpecs,
}

impl CachedPackage {
    /// Describe the package extracted at `path`
    pub fn load(path: PathBuf, package_ref: PackageRef) -> io::Result<Self> {
        let file_specs = PackageFileSpecs {
            binaries: list_entries(&path.join("bin"), true)?,
            libraries: list_entries(&path.join("lib"), true)?,
            includes: list_entries(&path.join("include"), false)?,
        };
        Ok(Self {
            package_ref,
            path,
            file_specs,
        })
    }

    pub fn bin_dir(&self) -> PathBuf {
        self.path.join("bin")
    }

    pub fn lib_dir(&self) -> PathBuf {
        self.path.join("lib")
    }

    pub fn include_dir(&self) -> PathBuf {
        self.path.join("include")
    }
}

/// Sorted entry names of `dir`; a missing directory is empty
fn list_entries(dir: &Path, files_only: bool) -> io::Result<Vec<String>> {
    let read_dir = match fs::read_dir(dir) {
        Ok(read_dir) => read_dir,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(err),
    };

    let mut names = Vec::new();
    for entry in read_dir {
        let entry = entry?;
        if files_only && !entry.file_type()?.is_file() {
            continue;
        }
        names.push(entry.file_name().to_string_lossy().into_owned());
    }
    names.sort();
    Ok(names)
}

/// Extract a zip archive into `target_dir`, refusing entries that would
/// land outside of it
pub(crate) fn extract_archive(
    archive_bytes: &[u8],
    target_dir: &Path,
    package_ref: &PackageRef,
) -> Result<(), CacheError> {
    let extraction_error = |source: io::Error| CacheError::Extraction {
        package: package_ref.clone(),
        source,
    };
    let zip_error = |err: zip::result::ZipError| extraction_error(io::Error::other(err));

    let mut archive = ZipArchive::new(Cursor::new(archive_bytes)).map_err(zip_error)?;
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).map_err(zip_error)?;
        let entry_path = match entry.enclosed_name() {
            Some(relative) => target_dir.join(relative),
            None => {
                return Err(CacheError::UnsafeArchivePath {
                    package: package_ref.clone(),
                    path: PathBuf::from(entry.name()),
                })
            }
        };

        if entry.is_dir() {
            fs::create_dir_all(&entry_path).map_err(extraction_error)?;
            continue;
        }
        if let Some(parent) = entry_path.parent() {
            fs::create_dir_all(parent).map_err(extraction_error)?;
        }
        let mut file = File::create(&entry_path).map_err(extraction_error)?;
        io::copy(&mut entry, &mut file).map_err(extraction_error)?;
        restore_mode(&entry_path, entry.unix_mode()).map_err(extraction_error)?;
    }
    Ok(())
}

/// Keep the permission bits stored in the archive, so binaries stay executable
#[cfg(unix)]
fn restore_mode(path: &Path, mode: Option<u32>) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    match mode {
        Some(mode) => fs::set_permissions(path, fs::Permissions::from_mode(mode & 0o777)),
        None => Ok(()),
    }
}

#[cfg(not(unix))]
fn restore_mode(_path: &Path, _mode: Option<u32>) -> io::Result<()> {
    Ok(())
}
