//! Installed kegs: listing and removal.

use std::path::{Path, PathBuf};

use formulary_config::Layout;
use formulary_core::receipt::{self, InstallReceipt};
use formulary_env::link;
use formulary_lockfile::PrefixLock;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{InstallFailure, Result};

/// What an uninstall removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Uninstalled {
    pub name: String,
    pub kegs: Vec<PathBuf>,
    /// Entry-point links removed from the prefix's `bin/`.
    pub unlinked: Vec<String>,
}

/// Receipts of every installed keg, sorted by name then version.
///
/// Kegs without a receipt (interrupted installs from older runs) are skipped.
pub fn list_installed(layout: &Layout) -> Result<Vec<InstallReceipt>> {
    let cellar = layout.cellar();
    let mut receipts = Vec::new();
    for name in dir_names(&cellar)? {
        let rack = cellar.join(&name);
        for version in dir_names(&rack)? {
            let keg = rack.join(&version);
            match receipt::load_receipt(&keg).map_err(|e| InstallFailure::receipt(&keg, e))? {
                Some(r) => receipts.push(r),
                None => debug!(keg = %keg.display(), "no receipt; skipping"),
            }
        }
    }
    Ok(receipts)
}

/// Receipt of one installed version, if present.
pub fn installed_receipt(layout: &Layout, name: &str, version: &str) -> Result<Option<InstallReceipt>> {
    InstallFailure::check_name("package name", name)?;
    InstallFailure::check_name("version", version)?;
    let keg = layout.keg(name, version);
    receipt::load_receipt(&keg).map_err(|e| InstallFailure::receipt(&keg, e))
}

/// Remove every installed version of `name` and their links.
///
/// # Errors
///
/// Returns [`InstallFailure::InvalidName`] if `name` is not a plain package
/// name, or [`InstallFailure::NotInstalled`] if nothing is installed.
pub fn uninstall(layout: &Layout, name: &str) -> Result<Uninstalled> {
    InstallFailure::check_name("package name", name)?;
    let rack = layout.rack(name);
    if !rack.is_dir() {
        return Err(InstallFailure::NotInstalled {
            package: name.to_string(),
        });
    }
    let _lock = PrefixLock::acquire(&layout.lock_path())?;

    let mut kegs = Vec::new();
    let mut unlinked = Vec::new();
    for version in dir_names(&rack)? {
        let keg = rack.join(version);
        let removed = link::unlink_keg(&layout.bin_dir(), &keg).map_err(|source| InstallFailure::Install {
            package: name.to_string(),
            source,
        })?;
        unlinked.extend(removed);
        kegs.push(keg);
    }
    std::fs::remove_dir_all(&rack).map_err(|e| InstallFailure::io(&rack, e))?;
    unlinked.sort();
    info!(package = name, kegs = kegs.len(), "uninstalled");
    Ok(Uninstalled {
        name: name.to_string(),
        kegs,
        unlinked,
    })
}

fn dir_names(dir: &Path) -> Result<Vec<String>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut names = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(|e| InstallFailure::io(dir, e))? {
        let entry = entry.map_err(|e| InstallFailure::io(dir, e))?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if entry.path().is_dir() && !name.starts_with('.') {
            names.push(name);
        }
    }
    names.sort();
    Ok(names)
}
