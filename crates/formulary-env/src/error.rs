//! Environment error types.

use std::path::{Path, PathBuf};

/// Errors raised while preparing or populating an isolated environment.
#[derive(Debug, thiserror::Error)]
pub enum EnvError {
    /// A program could not be found or spawned.
    #[error("failed to execute {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// A program exited with a non-zero status.
    #[error("{program} failed (exit code {code:?}): {stderr}")]
    CommandFailed {
        program: String,
        /// The exit code, or `None` if the process was killed by a signal.
        code: Option<i32>,
        stderr: String,
    },

    /// A program ran past its deadline and was killed.
    #[error("{program} did not finish within {timeout:?}")]
    Timeout { program: String, timeout: std::time::Duration },

    /// No executable satisfying a dependency was found.
    #[error("dependency {dependency} not found (tried {searched})")]
    RuntimeNotFound { dependency: String, searched: String },

    /// A file would be overwritten by an entry-point link.
    #[error("refusing to overwrite {} (not a link managed by formulary)", path.display())]
    LinkConflict { path: PathBuf },

    /// The installed package exposed no entry points.
    #[error("{package} installed no executables")]
    NoEntryPoints { package: String },

    /// Local file-system failure.
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Convenience alias used throughout the env crate.
pub type Result<T> = std::result::Result<T, EnvError>;

impl EnvError {
    /// Creates an [`EnvError::Io`] for `path`.
    pub fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}
