//! Install failure taxonomy.

use std::path::{Path, PathBuf};

use formulary_core::receipt::ReceiptError;
use formulary_core::validation;
use formulary_env::EnvError;
use formulary_fetch::FetchError;
use formulary_lockfile::LockError;

/// Why an install, smoke test or uninstall failed.
///
/// Nothing is recovered locally; every variant aborts the operation.
#[derive(Debug, thiserror::Error)]
pub enum InstallFailure {
    /// An archive could not be fetched.
    #[error(transparent)]
    Fetch(FetchError),

    /// An archive's digest disagrees with its declared checksum.
    #[error("checksum mismatch for {name} ({url}): expected {expected}, got {actual}")]
    ChecksumMismatch {
        name: String,
        url: String,
        expected: String,
        actual: String,
    },

    /// The environment installer failed.
    #[error("installing {package} failed: {source}")]
    Install {
        package: String,
        #[source]
        source: EnvError,
    },

    /// The smoke test did not see what it expected.
    #[error("smoke test for {package} failed: {reason}")]
    Assertion {
        package: String,
        binary: PathBuf,
        reason: String,
        /// Combined output of the run, empty if it never finished.
        output: String,
    },

    /// The formula declares no smoke test.
    #[error("{package} has no smoke test")]
    NoSmokeTest { package: String },

    /// The package (or the binary under test) is not installed.
    #[error("{package} is not installed")]
    NotInstalled { package: String },

    /// A package name, version or binary name is not a single path
    /// component and would resolve outside the prefix.
    #[error("'{value}' is not a valid {what}")]
    InvalidName { what: &'static str, value: String },

    #[error(transparent)]
    Lock(#[from] LockError),

    #[error("cannot read install receipt in {}: {source}", keg.display())]
    Receipt {
        keg: PathBuf,
        #[source]
        source: ReceiptError,
    },

    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, InstallFailure>;

impl From<FetchError> for InstallFailure {
    fn from(e: FetchError) -> Self {
        match e {
            FetchError::ChecksumMismatch {
                name,
                url,
                expected,
                actual,
            } => Self::ChecksumMismatch {
                name,
                url,
                expected,
                actual,
            },
            other => Self::Fetch(other),
        }
    }
}

impl InstallFailure {
    pub fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn receipt(keg: &Path, source: ReceiptError) -> Self {
        Self::Receipt {
            keg: keg.to_path_buf(),
            source,
        }
    }

    /// Reject `value` unless it is a single path component.
    pub fn check_name(what: &'static str, value: &str) -> Result<()> {
        if validation::is_path_component(value) {
            Ok(())
        } else {
            Err(Self::InvalidName {
                what,
                value: value.to_string(),
            })
        }
    }

    /// Stable machine-readable name of the failure class.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Fetch(_) => "fetch_error",
            Self::ChecksumMismatch { .. } => "checksum_mismatch",
            Self::Install { .. } => "install_error",
            Self::Assertion { .. } => "assertion_error",
            Self::NoSmokeTest { .. } => "no_smoke_test",
            Self::NotInstalled { .. } => "not_installed",
            Self::InvalidName { .. } => "invalid_name",
            Self::Lock(_) => "lock_error",
            Self::Receipt { .. } | Self::Io { .. } => "io_error",
        }
    }
}
