//! Running an installed binary for its smoke test.

use std::path::{Path, PathBuf};
use std::time::Duration;

use formulary_core::SmokeTest;
use tracing::debug;

use crate::error::Result;
use crate::process;

/// What an installed binary did when run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmokeOutput {
    pub binary: PathBuf,
    pub args: Vec<String>,
    /// Exit code, or `None` if killed by a signal.
    pub status: Option<i32>,
    /// Stdout followed by stderr.
    pub output: String,
}

impl SmokeOutput {
    /// Why `test` does not accept this run, or `None` if it passes.
    pub fn failure(&self, test: &SmokeTest) -> Option<String> {
        if !self.output.contains(&test.expect) {
            return Some(format!("output does not contain {:?}", test.expect));
        }
        match test.status {
            Some(expected) if self.status != Some(expected) => Some(format!(
                "exit status {} (expected {expected})",
                self.status
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| "signal".to_string())
            )),
            _ => None,
        }
    }
}

/// Run `binary` with `args`, capturing both output streams.
///
/// # Errors
///
/// Returns [`EnvError::Spawn`](crate::EnvError::Spawn) if the binary cannot
/// be started, or [`EnvError::Timeout`](crate::EnvError::Timeout) if it
/// runs past `timeout`.
pub fn run_binary(binary: &Path, args: &[String], timeout: Duration) -> Result<SmokeOutput> {
    let captured = process::capture_with_timeout(binary, args, timeout)?;
    let output = captured.combined();
    debug!(binary = %binary.display(), status = ?captured.status.code(), bytes = output.len(), "smoke run finished");
    Ok(SmokeOutput {
        binary: binary.to_path_buf(),
        args: args.to_vec(),
        status: captured.status.code(),
        output,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
