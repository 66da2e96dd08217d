//! Locating the runtimes a formula depends on.
//!
//! Dependencies are pins, not requirements to solve: a dependency is
//! satisfied by an executable already on the machine whose reported version
//! matches the pin. Nothing is downloaded or built here.

use std::path::{Path, PathBuf};

use formulary_core::Dependency;
use formulary_core::receipt::RuntimeRecord;
use formulary_core::version::Version;
use tracing::debug;

use crate::error::{EnvError, Result};
use crate::process;

/// A located runtime executable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Runtime {
    pub name: String,
    pub path: PathBuf,
    /// Reported version, if the executable printed one.
    pub version: Option<Version>,
}

impl Runtime {
    /// Receipt form of this runtime.
    pub fn record(&self) -> RuntimeRecord {
        RuntimeRecord {
            name: self.name.clone(),
            version: self
                .version
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_default(),
            path: self.path.display().to_string(),
        }
    }
}

/// Returns `true` if a dependency names the Python runtime.
pub fn is_python(dependency: &Dependency) -> bool {
    dependency.name == "python" || dependency.name == "python3"
}

/// Executable names to try for a dependency, most specific first.
///
/// `python@3.8` tries `python3.8`, `python3`, `python`.
pub fn candidate_names(dependency: &Dependency) -> Vec<String> {
    let mut names = Vec::new();
    if is_python(dependency) {
        if let Some(pin) = dependency.constraint.pinned() {
            if pin.len() >= 2 {
                names.push(format!("python{}.{}", pin[0], pin[1]));
            }
        }
        names.push("python3".to_string());
        names.push("python".to_string());
    } else {
        names.push(dependency.name.clone());
    }
    names.dedup();
    names
}

/// Ask an executable for its version via `--version`.
///
/// Some interpreters print the banner to stderr, so both streams are read.
pub fn probe_version(path: &Path) -> Option<Version> {
    let captured = process::capture(path, &["--version"], None).ok()?;
    if !captured.status.success() {
        return None;
    }
    Version::find_in(&captured.combined())
}

/// Locate an executable satisfying `dependency`.
///
/// `explicit` (from configuration) is tried first and must satisfy the
/// constraint like any other candidate.
///
/// # Errors
///
/// Returns [`EnvError::RuntimeNotFound`] if no candidate exists on `PATH`
/// or none reports a matching version.
pub fn locate(dependency: &Dependency, explicit: Option<&Path>) -> Result<Runtime> {
    let mut tried = Vec::new();
    let mut paths: Vec<PathBuf> = Vec::new();

    if let Some(path) = explicit {
        tried.push(path.display().to_string());
        paths.push(path.to_path_buf());
    }
    for name in candidate_names(dependency) {
        tried.push(name.clone());
        if let Some(found) = process::find_executable(&name) {
            if !paths.contains(&found) {
                paths.push(found);
            }
        }
    }

    for path in paths {
        if dependency.constraint.is_any() {
            let version = probe_version(&path);
            debug!(dependency = %dependency, path = %path.display(), "located runtime");
            return Ok(Runtime {
                name: dependency.name.clone(),
                path,
                version,
            });
        }
        match probe_version(&path) {
            Some(version) if dependency.constraint.matches(&version) => {
                debug!(dependency = %dependency, path = %path.display(), %version, "located runtime");
                return Ok(Runtime {
                    name: dependency.name.clone(),
                    path,
                    version: Some(version),
                });
            }
            Some(version) => {
                tried.push(format!("{} (version {version})", path.display()));
            }
            None => {
                tried.push(format!("{} (no version)", path.display()));
            }
        }
    }

    Err(EnvError::RuntimeNotFound {
        dependency: dependency.to_string(),
        searched: tried.join(", "),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
