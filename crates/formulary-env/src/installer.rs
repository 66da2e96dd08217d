//! Isolated environment installers.
//!
//! [`EnvironmentInstaller`] is the seam between the install pipeline and
//! whatever actually creates an environment. The pipeline hands over
//! verified archives; the installer creates the environment inside the keg,
//! installs resources then the package, and leaves the package's
//! executables in `<keg>/bin`.
//!
//! [`VirtualenvInstaller`] is the production implementation: a Python
//! virtual environment populated with `pip install --no-deps`.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use formulary_core::{Dependency, PackageDescriptor};
use formulary_core::version::VersionConstraint;
use tracing::{debug, info};

use crate::error::{EnvError, Result};
use crate::link;
use crate::process;
use crate::runtime::{self, Runtime};

/// Directory inside a keg holding the environment itself.
pub const LIBEXEC_DIR: &str = "libexec";

/// Directory inside a keg holding the package's executables.
pub const KEG_BIN_DIR: &str = "bin";

/// A verified archive on disk.
#[derive(Debug, Clone, Copy)]
pub struct ArchiveFile<'a> {
    pub name: &'a str,
    pub path: &'a Path,
}

/// Everything an installer needs for one package.
#[derive(Debug)]
pub struct InstallPlan<'a> {
    pub descriptor: &'a PackageDescriptor,
    /// Keg directory to install into; may not exist yet.
    pub keg: &'a Path,
    /// Resources in install order.
    pub resources: Vec<ArchiveFile<'a>>,
    pub primary: ArchiveFile<'a>,
}

impl InstallPlan<'_> {
    /// Where the installer must leave the package's executables.
    pub fn bin_dir(&self) -> PathBuf {
        self.keg.join(KEG_BIN_DIR)
    }
}

/// Result of a successful environment install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledEnv {
    /// Executable names in `<keg>/bin`, sorted.
    pub entry_points: Vec<String>,
    /// Runtime the environment was built on.
    pub runtime: Option<Runtime>,
}

/// Creates an isolated environment for a package inside its keg.
pub trait EnvironmentInstaller {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Create the environment and install `plan` into it.
    ///
    /// On error the keg may be partially populated; the caller removes it.
    fn install(&self, plan: &InstallPlan<'_>) -> Result<InstalledEnv>;
}

/// Installs into a Python virtual environment with resources.
#[derive(Debug, Clone, Default)]
pub struct VirtualenvInstaller {
    python: Option<PathBuf>,
}

impl VirtualenvInstaller {
    /// Use `python` as the base interpreter when set; otherwise search `PATH`.
    pub fn new(python: Option<PathBuf>) -> Self {
        Self { python }
    }

    /// The descriptor's Python pin, or an unconstrained one.
    fn python_dependency(descriptor: &PackageDescriptor) -> Dependency {
        descriptor
            .depends_on
            .iter()
            .find(|d| runtime::is_python(d))
            .cloned()
            .unwrap_or_else(|| Dependency {
                name: "python".to_string(),
                constraint: VersionConstraint::Any,
            })
    }

    /// Locate every runtime the descriptor pins; Python first.
    fn locate_runtimes(&self, descriptor: &PackageDescriptor) -> Result<Runtime> {
        for dep in descriptor.depends_on.iter().filter(|d| !runtime::is_python(d)) {
            runtime::locate(dep, None)?;
        }
        runtime::locate(&Self::python_dependency(descriptor), self.python.as_deref())
    }

    fn pip_install(venv_python: &Path, archive: ArchiveFile<'_>) -> Result<()> {
        info!(archive = archive.name, "pip install");
        let args: [&OsStr; 8] = [
            OsStr::new("-m"),
            OsStr::new("pip"),
            OsStr::new("install"),
            OsStr::new("--no-deps"),
            OsStr::new("--no-input"),
            OsStr::new("--disable-pip-version-check"),
            OsStr::new("--ignore-installed"),
            archive.path.as_os_str(),
        ];
        process::run_command(venv_python, &args, None)?;
        Ok(())
    }
}

impl EnvironmentInstaller for VirtualenvInstaller {
    fn name(&self) -> &str {
        "virtualenv"
    }

    fn install(&self, plan: &InstallPlan<'_>) -> Result<InstalledEnv> {
        let runtime = self.locate_runtimes(plan.descriptor)?;

        std::fs::create_dir_all(plan.keg).map_err(|e| EnvError::io(plan.keg, e))?;
        let libexec = plan.keg.join(LIBEXEC_DIR);
        info!(venv = %libexec.display(), python = %runtime.path.display(), "creating virtualenv");
        process::run_command(
            &runtime.path,
            &[OsStr::new("-m"), OsStr::new("venv"), libexec.as_os_str()],
            None,
        )?;

        let venv_bin = venv_bin_dir(&libexec);
        let venv_python = venv_bin.join(python_exe());

        for resource in &plan.resources {
            Self::pip_install(&venv_python, *resource)?;
        }

        let before = link::dir_entries(&venv_bin)?;
        Self::pip_install(&venv_python, plan.primary)?;
        let entry_points: Vec<String> = link::dir_entries(&venv_bin)?
            .into_iter()
            .filter(|name| !before.contains(name))
            .collect();
        debug!(?entry_points, "new executables");

        if entry_points.is_empty() {
            return Err(EnvError::NoEntryPoints {
                package: plan.descriptor.name.clone(),
            });
        }

        link::link_entry_points(&venv_bin, &plan.bin_dir(), &entry_points, plan.keg)?;
        Ok(InstalledEnv {
            entry_points,
            runtime: Some(runtime),
        })
    }
}

#[cfg(windows)]
fn venv_bin_dir(venv: &Path) -> PathBuf {
    venv.join("Scripts")
}

#[cfg(not(windows))]
fn venv_bin_dir(venv: &Path) -> PathBuf {
    venv.join("bin")
}

#[cfg(windows)]
fn python_exe() -> &'static str {
    "python.exe"
}

#[cfg(not(windows))]
fn python_exe() -> &'static str {
    "python"
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::test_utils::{write_fake_python, write_failing_pip_python};
    use pretty_assertions::assert_eq;

    fn descriptor(with_resource: bool) -> PackageDescriptor {
        let mut value = serde_json::json!({
            "name": "mcpverse",
            "url": "https://x/mcpverse-0.1.0.tar.gz",
            "sha256": "placeholder",
            "depends_on": ["python@3.8"],
        });
        if with_resource {
            value["resources"] = serde_json::json!([
                {"name": "click", "url": "https://x/click-8.1.7.tar.gz", "sha256": "placeholder"}
            ]);
        }
        serde_json::from_value(value).unwrap()
    }

    struct Archives {
        dir: tempfile::TempDir,
    }

    impl Archives {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            for name in ["click-8.1.7.tar.gz", "mcpverse-0.1.0.tar.gz"] {
                std::fs::write(dir.path().join(name), name).unwrap();
            }
            Self { dir }
        }

        fn path(&self, name: &str) -> PathBuf {
            self.dir.path().join(name)
        }
    }

    #[test]
    fn installs_resources_then_package() {
        let work = tempfile::tempdir().unwrap();
        let python = write_fake_python(work.path());
        let archives = Archives::new();
        let click = archives.path("click-8.1.7.tar.gz");
        let primary = archives.path("mcpverse-0.1.0.tar.gz");
        let keg = work.path().join("cellar/mcpverse/0.1.0");
        let d = descriptor(true);

        let plan = InstallPlan {
            descriptor: &d,
            keg: &keg,
            resources: vec![ArchiveFile { name: "click", path: &click }],
            primary: ArchiveFile { name: "mcpverse", path: &primary },
        };
        let installed = VirtualenvInstaller::new(Some(python)).install(&plan).unwrap();

        // the resource's executable existed before the package install
        assert_eq!(installed.entry_points, vec!["mcpverse"]);
        assert_eq!(
            installed.runtime.unwrap().version.unwrap().to_string(),
            "3.8.10"
        );
        assert!(keg.join("libexec/bin/click").is_file());
        let out = process::run_command(&keg.join("bin/mcpverse"), &["proxy", "https://example.com"], None)
            .unwrap();
        assert!(out.contains("URL: https://example.com"), "{out}");
    }

    #[test]
    fn installs_without_resources() {
        let work = tempfile::tempdir().unwrap();
        let python = write_fake_python(work.path());
        let archives = Archives::new();
        let primary = archives.path("mcpverse-0.1.0.tar.gz");
        let keg = work.path().join("keg");
        let d = descriptor(false);

        let plan = InstallPlan {
            descriptor: &d,
            keg: &keg,
            resources: Vec::new(),
            primary: ArchiveFile { name: "mcpverse", path: &primary },
        };
        let installed = VirtualenvInstaller::new(Some(python)).install(&plan).unwrap();
        assert_eq!(installed.entry_points, vec!["mcpverse"]);
    }

    #[test]
    fn pip_failure_is_reported() {
        let work = tempfile::tempdir().unwrap();
        let python = write_failing_pip_python(work.path());
        let archives = Archives::new();
        let primary = archives.path("mcpverse-0.1.0.tar.gz");
        let keg = work.path().join("keg");
        let d = descriptor(false);

        let plan = InstallPlan {
            descriptor: &d,
            keg: &keg,
            resources: Vec::new(),
            primary: ArchiveFile { name: "mcpverse", path: &primary },
        };
        let err = VirtualenvInstaller::new(Some(python)).install(&plan).unwrap_err();
        assert!(matches!(err, EnvError::CommandFailed { code: Some(1), .. }), "{err}");
    }
}
