//! Fetch error types.

use std::path::{Path, PathBuf};

/// Errors that can occur while fetching archives.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// The URL could not be reached (DNS, refused connection, missing file,
    /// interrupted transfer).
    #[error("failed to fetch {url}: {message}")]
    Unreachable {
        /// The URL that was requested.
        url: String,
        /// Transport-level description.
        message: String,
    },

    /// The server answered with a non-success status.
    #[error("failed to fetch {url}: HTTP status {code}")]
    Status {
        /// The URL that was requested.
        url: String,
        /// The HTTP status code.
        code: u16,
    },

    /// The URL scheme is not one formulary can fetch.
    #[error("unsupported URL scheme: {0}")]
    UnsupportedScheme(String),

    /// The archive's digest disagrees with its declared checksum.
    #[error("checksum mismatch for {name} ({url}): expected {expected}, got {actual}")]
    ChecksumMismatch {
        /// Archive name (package or resource).
        name: String,
        /// Where it was fetched from.
        url: String,
        /// Declared checksum.
        expected: String,
        /// Actual digest.
        actual: String,
    },

    /// Strict mode refused a placeholder checksum.
    #[error("refusing to fetch {name}: checksum is a placeholder (strict_checksums is on)")]
    Unverified {
        /// Archive name.
        name: String,
    },

    /// Local file-system failure in the download cache.
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        /// Path being accessed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
}

/// Convenience alias used throughout the fetch crate.
pub type Result<T> = std::result::Result<T, FetchError>;

impl FetchError {
    /// Creates a [`FetchError::Io`] for `path`.
    pub fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Returns `true` if this is a [`FetchError::ChecksumMismatch`].
    pub fn is_checksum_mismatch(&self) -> bool {
        matches!(self, Self::ChecksumMismatch { .. })
    }
}
