//! The install pipeline.
//!
//! Fetch and verify every archive, then hand them to the environment
//! installer, then link the entry points and write the receipt. Nothing in
//! the prefix is touched until every archive has verified, so an integrity
//! failure never leaves a partial install behind.

use std::path::{Path, PathBuf};

use chrono::Utc;
use formulary_config::Layout;
use formulary_core::receipt::{self, InstallReceipt, ResourceRecord};
use formulary_core::{ArchiveKind, PackageDescriptor};
use formulary_env::installer::KEG_BIN_DIR;
use formulary_env::{ArchiveFile, EnvironmentInstaller, InstallPlan, link};
use formulary_fetch::{FetchedArchive, Fetcher};
use formulary_lockfile::PrefixLock;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{InstallFailure, Result};

/// Per-run install switches.
#[derive(Debug, Clone, Copy, Default)]
pub struct InstallOptions {
    /// Reinstall even if an identical install is present.
    pub force: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InstallStatus {
    Installed,
    AlreadyInstalled,
}

/// What an install run did.
#[derive(Debug, Clone, Serialize)]
pub struct InstallOutcome {
    pub status: InstallStatus,
    pub keg: PathBuf,
    pub receipt: InstallReceipt,
    /// Entry-point links in the prefix's `bin/`.
    pub links: Vec<PathBuf>,
}

/// Runs installs into one prefix.
pub struct Installer<E> {
    layout: Layout,
    fetcher: Fetcher,
    env: E,
}

impl<E: EnvironmentInstaller> Installer<E> {
    pub fn new(layout: Layout, fetcher: Fetcher, env: E) -> Self {
        Self {
            layout,
            fetcher,
            env,
        }
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn fetcher(&self) -> &Fetcher {
        &self.fetcher
    }

    pub fn environment(&self) -> &E {
        &self.env
    }

    /// Fetch, verify and install `descriptor`.
    ///
    /// Re-running with an unchanged descriptor is a no-op reported as
    /// [`InstallStatus::AlreadyInstalled`] unless `options.force` is set.
    ///
    /// # Errors
    ///
    /// - [`InstallFailure::Fetch`] if an archive cannot be fetched
    /// - [`InstallFailure::ChecksumMismatch`] if an archive fails verification
    /// - [`InstallFailure::Install`] if the environment installer or linking fails
    /// - [`InstallFailure::InvalidName`] if the name or version is not a plain
    ///   directory name
    ///
    /// A reinstall moves the existing keg aside first and puts it back, links
    /// included, if the new install fails.
    pub fn install(&self, descriptor: &PackageDescriptor, options: InstallOptions) -> Result<InstallOutcome> {
        let package = descriptor.name.as_str();
        let version = descriptor.version();
        InstallFailure::check_name("package name", package)?;
        InstallFailure::check_name("version", &version)?;

        // Same order as `Fetcher::fetch_all`: resources, then the package.
        let resources = descriptor
            .archives()
            .iter()
            .filter(|a| a.kind == ArchiveKind::Resource)
            .map(|a| self.fetcher.fetch(a))
            .collect::<std::result::Result<Vec<FetchedArchive>, _>>()?;
        let primary = self.fetcher.fetch(&descriptor.primary_archive())?;
        let resource_digests: Vec<(String, String)> = resources
            .iter()
            .map(|a| (a.name.clone(), a.sha256.clone()))
            .collect();

        let keg = self.layout.keg(package, &version);
        let _lock = PrefixLock::acquire(&self.layout.lock_path())?;

        if !options.force {
            let existing = receipt::load_receipt(&keg).map_err(|e| InstallFailure::receipt(&keg, e))?;
            if let Some(existing) = existing {
                if existing.matches(descriptor, &primary.sha256, &resource_digests) {
                    // Relink in case the links were removed by hand.
                    let links = self.link(package, &keg, &existing.entry_points)?;
                    info!(package, %version, "already installed");
                    return Ok(InstallOutcome {
                        status: InstallStatus::AlreadyInstalled,
                        keg,
                        receipt: existing,
                        links,
                    });
                }
                debug!(package, %version, "installed receipt differs; reinstalling");
            }
        }

        let previous = self.set_aside(package, &version, &keg)?;

        let plan = InstallPlan {
            descriptor,
            keg: &keg,
            resources: resources
                .iter()
                .map(|a| ArchiveFile {
                    name: &a.name,
                    path: &a.path,
                })
                .collect(),
            primary: ArchiveFile {
                name: &primary.name,
                path: &primary.path,
            },
        };
        info!(package, %version, installer = self.env.name(), "installing");
        let installed = match self.env.install(&plan) {
            Ok(installed) => installed,
            Err(source) => {
                self.discard(package, &keg, previous.as_deref());
                return Err(InstallFailure::Install {
                    package: package.to_string(),
                    source,
                });
            }
        };

        let linked = self
            .link(package, &keg, &installed.entry_points)
            .and_then(|links| self.unlink_other_versions(package, &keg).map(|()| links));
        let links = match linked {
            Ok(links) => links,
            Err(e) => {
                self.discard(package, &keg, previous.as_deref());
                return Err(e);
            }
        };

        let record = InstallReceipt {
            name: package.to_string(),
            version: version.clone(),
            source_url: descriptor.url.clone(),
            sha256: primary.sha256.clone(),
            unverified: !primary.verified || resources.iter().any(|a| !a.verified),
            license: descriptor.license.clone(),
            dependencies: descriptor.depends_on.iter().map(ToString::to_string).collect(),
            resources: resources
                .iter()
                .map(|a| ResourceRecord {
                    name: a.name.clone(),
                    sha256: a.sha256.clone(),
                })
                .collect(),
            runtime: installed.runtime.as_ref().map(|r| r.record()),
            entry_points: installed.entry_points.clone(),
            installed_at: Utc::now(),
        };
        if let Err(e) = receipt::save_receipt(&keg, &record) {
            self.discard(package, &keg, previous.as_deref());
            return Err(InstallFailure::receipt(&keg, e));
        }
        if let Some(previous) = previous {
            self.drop_previous(&previous);
        }

        info!(package, %version, entry_points = ?record.entry_points, "installed");
        Ok(InstallOutcome {
            status: InstallStatus::Installed,
            keg,
            receipt: record,
            links,
        })
    }

    /// Link entry points, taking over links owned by any version of `package`.
    fn link(&self, package: &str, keg: &Path, names: &[String]) -> Result<Vec<PathBuf>> {
        let rack = self.layout.rack(package);
        link::link_entry_points(&keg.join(KEG_BIN_DIR), &self.layout.bin_dir(), names, &rack).map_err(
            |source| InstallFailure::Install {
                package: package.to_string(),
                source,
            },
        )
    }

    /// Move an existing keg to `<prefix>/.previous/<name>/<version>` so a
    /// failed reinstall can put it back. Its links are left dangling until
    /// the new keg is linked or the old one restored.
    fn set_aside(&self, package: &str, version: &str, keg: &Path) -> Result<Option<PathBuf>> {
        if !keg.exists() {
            return Ok(None);
        }
        let previous = self.layout.previous_keg(package, version);
        if previous.exists() {
            debug!(path = %previous.display(), "removing stale set-aside keg");
            std::fs::remove_dir_all(&previous).map_err(|e| InstallFailure::io(&previous, e))?;
        }
        if let Some(parent) = previous.parent() {
            std::fs::create_dir_all(parent).map_err(|e| InstallFailure::io(parent, e))?;
        }
        debug!(keg = %keg.display(), to = %previous.display(), "setting previous keg aside");
        std::fs::rename(keg, &previous).map_err(|e| InstallFailure::io(keg, e))?;
        Ok(Some(previous))
    }

    /// Delete a set-aside keg once its replacement is complete.
    fn drop_previous(&self, previous: &Path) {
        if let Err(e) = std::fs::remove_dir_all(previous) {
            warn!(path = %previous.display(), error = %e, "failed to remove previous keg");
        }
        if let Some(parent) = previous.parent() {
            let _ = std::fs::remove_dir(parent);
        }
    }

    /// Drop links into other installed versions so the new keg owns the names.
    fn unlink_other_versions(&self, package: &str, keg: &Path) -> Result<()> {
        let rack = self.layout.rack(package);
        let versions = link::dir_entries(&rack).map_err(|source| InstallFailure::Install {
            package: package.to_string(),
            source,
        })?;
        for version in versions {
            let other = rack.join(version);
            if other == keg {
                continue;
            }
            link::unlink_keg(&self.layout.bin_dir(), &other).map_err(|source| InstallFailure::Install {
                package: package.to_string(),
                source,
            })?;
        }
        Ok(())
    }

    /// Best-effort removal of a half-built keg, restoring the keg it
    /// replaced if there was one.
    fn discard(&self, package: &str, keg: &Path, previous: Option<&Path>) {
        warn!(keg = %keg.display(), "removing incomplete install");
        if let Err(e) = link::unlink_keg(&self.layout.bin_dir(), keg) {
            warn!(error = %e, "failed to remove links");
        }
        if keg.exists() {
            if let Err(e) = std::fs::remove_dir_all(keg) {
                warn!(keg = %keg.display(), error = %e, "failed to remove keg");
            }
        }
        match previous {
            Some(previous) => self.restore(package, keg, previous),
            None => {
                if let Some(rack) = keg.parent() {
                    // Only succeeds if no other version is installed.
                    let _ = std::fs::remove_dir(rack);
                }
            }
        }
    }

    /// Move a set-aside keg back and relink its entry points.
    fn restore(&self, package: &str, keg: &Path, previous: &Path) {
        if let Err(e) = std::fs::rename(previous, keg) {
            warn!(keg = %keg.display(), error = %e, "failed to restore previous keg");
            return;
        }
        if let Some(parent) = previous.parent() {
            let _ = std::fs::remove_dir(parent);
        }
        let entry_points = match receipt::load_receipt(keg) {
            Ok(Some(r)) => r.entry_points,
            Ok(None) => return,
            Err(e) => {
                warn!(keg = %keg.display(), error = %e, "cannot read restored receipt");
                return;
            }
        };
        match self.link(package, keg, &entry_points) {
            Ok(_) => info!(keg = %keg.display(), "restored previous install"),
            Err(e) => warn!(keg = %keg.display(), error = %e, "failed to relink previous install"),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
