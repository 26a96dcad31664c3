//! Cross-process cache lock

use super::CacheError;
use fs4::FileExt;
use std::fs::{File, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Exclusive lock on the cache, released when dropped
#[derive(Debug)]
pub struct CacheLock {
    file: File,
    path: PathBuf,
}

impl CacheLock {
    /// Acquire the lock file at `path`.
    ///
    /// `None` waits for as long as it takes. `Some(timeout)` gives up with
    /// [`CacheError::Contention`] once the timeout elapses.
    pub fn acquire(path: &Path, timeout: Option<Duration>) -> Result<Self, CacheError> {
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(path)?;

        match timeout {
            None => file.lock_exclusive()?,
            Some(timeout) => Self::poll(&file, path, timeout)?,
        }

        debug!(path = %path.display(), "acquired cache lock");
        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    fn poll(file: &File, path: &Path, timeout: Duration) -> Result<(), CacheError> {
        let deadline = Instant::now() + timeout;
        loop {
            match file.try_lock_exclusive() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::WouldBlock => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Err(CacheError::Contention {
                            path: path.to_path_buf(),
                            timeout,
                        });
                    }
                    trace!(path = %path.display(), "cache lock busy, waiting");
                    thread::sleep(POLL_INTERVAL.min(deadline - now));
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for CacheLock {
    fn drop(&mut self) {
        if let Err(err) = FileExt::unlock(&self.file) {
            debug!(path = %self.path.display(), error = %err, "failed to release cache lock");
        }
    }
}
