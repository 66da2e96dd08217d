//! Smoke-testing installed packages.

use std::path::Path;
use std::time::Duration;

use formulary_config::Layout;
use formulary_core::{PackageDescriptor, SmokeTest};
use formulary_env::{SmokeOutput, smoke};
use tracing::info;

use crate::error::{InstallFailure, Result};

/// Run the descriptor's smoke test against its linked entry point.
///
/// # Errors
///
/// - [`InstallFailure::NoSmokeTest`] if the formula declares none
/// - [`InstallFailure::NotInstalled`] if the entry point is not linked
/// - [`InstallFailure::Assertion`] if the run does not meet expectations
pub fn smoke_test(layout: &Layout, descriptor: &PackageDescriptor, timeout: Duration) -> Result<SmokeOutput> {
    let test = descriptor.test.as_ref().ok_or_else(|| InstallFailure::NoSmokeTest {
        package: descriptor.name.clone(),
    })?;
    InstallFailure::check_name("binary name", descriptor.test_binary())?;
    let binary = layout.bin_dir().join(descriptor.test_binary());
    if binary.symlink_metadata().is_err() {
        return Err(InstallFailure::NotInstalled {
            package: descriptor.name.clone(),
        });
    }
    test_binary(&descriptor.name, &binary, test, timeout)
}

/// Run `binary` with the test's arguments and check its output.
///
/// A binary that cannot be started or runs past `timeout` fails the test.
pub fn test_binary(package: &str, binary: &Path, test: &SmokeTest, timeout: Duration) -> Result<SmokeOutput> {
    let assertion = |reason: String, output: String| InstallFailure::Assertion {
        package: package.to_string(),
        binary: binary.to_path_buf(),
        reason,
        output,
    };
    info!(package, binary = %binary.display(), args = ?test.args, "running smoke test");
    let run = smoke::run_binary(binary, &test.args, timeout).map_err(|e| assertion(e.to_string(), String::new()))?;
    match run.failure(test) {
        Some(reason) => Err(assertion(reason, run.output)),
        None => Ok(run),
    }
}
