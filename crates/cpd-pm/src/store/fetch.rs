//! Byte fetching for store artifacts
//!
//! A [`FileProvider`] returns the bytes stored under a relative path. The
//! local provider reads from a directory, the HTTP provider issues GET
//! requests against a base URL; callers cannot tell them apart.

use reqwest::blocking::Client;
use std::io::{self, Read};
use std::path::{Component, Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Maximum size of a single artifact (512 MB)
pub const MAX_CONTENT_SIZE: u64 = 512 * 1024 * 1024;

/// HTTP request timeout
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

const READ_CHUNK_SIZE: usize = 64 * 1024;

/// Upper bound on the buffer reserved from an announced content length
const MAX_PREALLOCATION: u64 = 1024 * 1024;

/// Capacity to reserve for a body; the announced length is not trusted
fn initial_capacity(total_bytes: Option<u64>) -> usize {
    total_bytes.unwrap_or(0).min(MAX_PREALLOCATION) as usize
}

/// Errors that can occur while fetching bytes
#[derive(Debug, Error)]
pub enum FetchError {
    /// Nothing is stored under the path
    #[error("Artifact not found: {0}")]
    NotFound(String),

    /// Path escapes the store root
    #[error("Invalid artifact path: {0}")]
    InvalidPath(String),

    /// IO error while reading a local artifact
    #[error("IO error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success HTTP status
    #[error("HTTP {status} for URL: {url}")]
    HttpStatus { status: u16, url: String },

    /// Invalid base URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Content too large
    #[error("Content too large: {size} bytes (max: {max})")]
    ContentTooLarge { size: u64, max: u64 },
}

/// Transfer progress passed to the optional callback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    /// Total size if known up front
    pub total_bytes: Option<u64>,
    pub retrieved_bytes: u64,
}

/// Source of store artifacts
pub trait FileProvider: Send + Sync {
    /// Fetch the bytes stored under `path` (relative, `/`-separated)
    fn get(&self, path: &str, progress: Option<&dyn Fn(Progress)>) -> Result<Vec<u8>, FetchError>;
}

/// Reject absolute paths and `..` so a path cannot leave the store root
fn check_relative(path: &str) -> Result<(), FetchError> {
    let escapes = Path::new(path)
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if path.is_empty() || escapes {
        return Err(FetchError::InvalidPath(path.to_string()));
    }
    Ok(())
}

/// Reads artifacts from a local directory
#[derive(Debug, Clone)]
pub struct LocalFileProvider {
    root: PathBuf,
}

impl LocalFileProvider {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl FileProvider for LocalFileProvider {
    fn get(&self, path: &str, progress: Option<&dyn Fn(Progress)>) -> Result<Vec<u8>, FetchError> {
        check_relative(path)?;
        let full_path = self.root.join(path);
        debug!(path = %full_path.display(), "reading local artifact");

        let content = std::fs::read(&full_path).map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                FetchError::NotFound(path.to_string())
            } else {
                FetchError::Io {
                    path: path.to_string(),
                    source,
                }
            }
        })?;

        if let Some(callback) = progress {
            let size = content.len() as u64;
            callback(Progress {
                total_bytes: Some(size),
                retrieved_bytes: size,
            });
        }

        Ok(content)
    }
}

/// Fetches artifacts over HTTP(S) from a base URL
pub struct HttpFileProvider {
    client: Client,
    base_url: String,
    max_size: u64,
}

impl HttpFileProvider {
    /// Create a provider for `base_url` (http or https)
    pub fn new(base_url: &str) -> Result<Self, FetchError> {
        let parsed =
            url::Url::parse(base_url).map_err(|_| FetchError::InvalidUrl(base_url.to_string()))?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(FetchError::InvalidUrl(base_url.to_string()));
        }

        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .connect_timeout(Duration::from_secs(10))
            .user_agent(format!("cpd/{}", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            max_size: MAX_CONTENT_SIZE,
        })
    }

    /// Override the maximum artifact size
    pub fn with_max_size(mut self, max_size: u64) -> Self {
        self.max_size = max_size;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn compose_url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

impl FileProvider for HttpFileProvider {
    fn get(&self, path: &str, progress: Option<&dyn Fn(Progress)>) -> Result<Vec<u8>, FetchError> {
        check_relative(path)?;
        let url = self.compose_url(path);
        debug!(%url, "fetching remote artifact");

        let response = self.client.get(&url).send()?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(FetchError::NotFound(path.to_string()));
        }
        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                status: status.as_u16(),
                url,
            });
        }

        let total_bytes = response.content_length();
        if let Some(len) = total_bytes {
            if len > self.max_size {
                return Err(FetchError::ContentTooLarge {
                    size: len,
                    max: self.max_size,
                });
            }
        }

        // Read with a size limit, reporting progress per chunk
        let mut content = Vec::with_capacity(initial_capacity(total_bytes));
        let mut reader = response.take(self.max_size + 1);
        let mut chunk = vec![0u8; READ_CHUNK_SIZE];
        loop {
            let read = reader.read(&mut chunk).map_err(|source| FetchError::Io {
                path: path.to_string(),
                source,
            })?;
            if read == 0 {
                break;
            }
            content.extend_from_slice(&chunk[..read]);
            if let Some(callback) = progress {
                callback(Progress {
                    total_bytes,
                    retrieved_bytes: content.len() as u64,
                });
            }
        }

        if content.len() as u64 > self.max_size {
            return Err(FetchError::ContentTooLarge {
                size: content.len() as u64,
                max: self.max_size,
            });
        }

        Ok(content)
    }
}
