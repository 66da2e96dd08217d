//! Isolated environments for installed packages.
//!
//! Locates pinned runtimes, builds a virtual environment inside a keg,
//! links entry points onto the search path and runs installed binaries.

pub mod error;
pub mod installer;
pub mod link;
pub mod process;
pub mod runtime;
pub mod smoke;

#[cfg(all(unix, any(test, feature = "test-utils")))]
pub mod test_utils;

pub use error::{EnvError, Result};
pub use installer::{ArchiveFile, EnvironmentInstaller, InstallPlan, InstalledEnv, VirtualenvInstaller};
pub use runtime::Runtime;
pub use smoke::SmokeOutput;
