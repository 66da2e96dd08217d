//! Entry-point links.
//!
//! Installed executables live inside their keg. They become reachable on
//! the search path through links in `<prefix>/bin` pointing into the keg.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{EnvError, Result};

/// Link each of `names` from `source_dir` into `bin_dir`.
///
/// A link already pointing inside `owner` is replaced, so relinking is
/// idempotent and a new version takes over from an old one. Anything else
/// at a link path (a regular file, or a link owned by another package) is
/// a conflict.
///
/// # Errors
///
/// Returns [`EnvError::LinkConflict`] if a link path is taken, or
/// [`EnvError::Io`] on file-system failure.
pub fn link_entry_points(source_dir: &Path, bin_dir: &Path, names: &[String], owner: &Path) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(bin_dir).map_err(|e| EnvError::io(bin_dir, e))?;

    // Check every link path before creating any, so a conflict links nothing.
    for name in names {
        let link = bin_dir.join(name);
        if link.symlink_metadata().is_err() {
            continue;
        }
        match std::fs::read_link(&link) {
            Ok(target) if target.starts_with(owner) => {}
            _ => return Err(EnvError::LinkConflict { path: link }),
        }
    }

    let mut created = Vec::with_capacity(names.len());
    for name in names {
        let target = source_dir.join(name);
        let link = bin_dir.join(name);
        if link.symlink_metadata().is_ok() {
            std::fs::remove_file(&link).map_err(|e| EnvError::io(&link, e))?;
        }
        make_link(&target, &link)?;
        debug!(link = %link.display(), target = %target.display(), "linked");
        created.push(link);
    }
    Ok(created)
}

/// Remove every link in `bin_dir` that points inside `keg`.
///
/// Returns the names of removed links.
pub fn unlink_keg(bin_dir: &Path, keg: &Path) -> Result<Vec<String>> {
    let mut removed = Vec::new();
    if !bin_dir.is_dir() {
        return Ok(removed);
    }
    let entries = std::fs::read_dir(bin_dir).map_err(|e| EnvError::io(bin_dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| EnvError::io(bin_dir, e))?;
        let path = entry.path();
        let Ok(target) = std::fs::read_link(&path) else {
            continue;
        };
        if target.starts_with(keg) {
            std::fs::remove_file(&path).map_err(|e| EnvError::io(&path, e))?;
            removed.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    removed.sort();
    Ok(removed)
}

/// Names of the entries in a directory, sorted. Missing directories are empty.
pub fn dir_entries(dir: &Path) -> Result<Vec<String>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .map_err(|e| EnvError::io(dir, e))?
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    Ok(names)
}

#[cfg(unix)]
fn make_link(target: &Path, link: &Path) -> Result<()> {
    std::os::unix::fs::symlink(target, link).map_err(|e| EnvError::io(link, e))
}

#[cfg(not(unix))]
fn make_link(target: &Path, link: &Path) -> Result<()> {
    std::fs::copy(target, link)
        .map(|_| ())
        .map_err(|e| EnvError::io(link, e))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
