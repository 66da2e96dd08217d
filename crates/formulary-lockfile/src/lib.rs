//! Exclusive locking of an install prefix.
//!
//! Installs and uninstalls mutate the cellar and the shared `bin`
//! directory; two of them running against the same prefix would interleave
//! link creation. [`PrefixLock`] serializes them with an advisory lock on
//! `<prefix>/.formulary.lock`. The lock is released when the guard drops,
//! and by the kernel if the process dies.

use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use tracing::{debug, info};

/// Errors raised while acquiring a prefix lock.
#[derive(Debug, thiserror::Error)]
pub enum LockError {
    /// The lock file could not be created or opened.
    #[error("cannot open lock file {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Another process holds the lock and waiting was not allowed.
    #[error("{} is locked by another formulary process", path.display())]
    Busy { path: PathBuf },

    /// Locking failed for a reason other than contention.
    #[error("cannot lock {}: {source}", path.display())]
    Lock {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, LockError>;

/// Held exclusive lock on a prefix. Dropping it releases the lock.
#[derive(Debug)]
pub struct PrefixLock {
    file: File,
    path: PathBuf,
}

impl PrefixLock {
    /// Acquire the lock at `path`, blocking while another process holds it.
    pub fn acquire(path: &Path) -> Result<Self> {
        let file = open(path)?;
        match file.try_lock_exclusive() {
            Ok(()) => {}
            Err(e) if is_contended(&e) => {
                info!(lock = %path.display(), "waiting for another formulary process");
                file.lock_exclusive().map_err(|source| LockError::Lock {
                    path: path.to_path_buf(),
                    source,
                })?;
            }
            Err(source) => {
                return Err(LockError::Lock {
                    path: path.to_path_buf(),
                    source,
                });
            }
        }
        Ok(Self::locked(file, path))
    }

    /// Acquire the lock at `path` without waiting.
    ///
    /// # Errors
    ///
    /// Returns [`LockError::Busy`] if another process holds it.
    pub fn try_acquire(path: &Path) -> Result<Self> {
        let file = open(path)?;
        match file.try_lock_exclusive() {
            Ok(()) => Ok(Self::locked(file, path)),
            Err(e) if is_contended(&e) => Err(LockError::Busy {
                path: path.to_path_buf(),
            }),
            Err(source) => Err(LockError::Lock {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn locked(mut file: File, path: &Path) -> Self {
        // Holder pid is informational only.
        let _ = file.set_len(0);
        let _ = writeln!(file, "{}", std::process::id());
        debug!(lock = %path.display(), "acquired");
        Self {
            file,
            path: path.to_path_buf(),
        }
    }
}

impl Drop for PrefixLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
        debug!(lock = %self.path.display(), "released");
    }
}

fn open(path: &Path) -> Result<File> {
    let open_err = |source| LockError::Open {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(open_err)?;
    }
    OpenOptions::new()
        .create(true)
        .truncate(false)
        .read(true)
        .write(true)
        .open(path)
        .map_err(open_err)
}

fn is_contended(e: &std::io::Error) -> bool {
    e.kind() == ErrorKind::WouldBlock || e.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
