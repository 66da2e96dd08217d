//! Runtime context for command execution.
//!
//! The [`RuntimeContext`] holds what every command handler needs: global
//! flags, the effective configuration and the resolved prefix layout.

use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use formulary_config::{FormularyConfig, Layout, config_path, load_config};
use formulary_core::PackageDescriptor;
use formulary_env::VirtualenvInstaller;
use formulary_fetch::{FetchOptions, Fetcher};
use formulary_install::Installer;

use crate::cli::GlobalArgs;

/// Runtime context passed to every command handler.
///
/// Constructed once in `main` after CLI parsing, before command dispatch.
#[derive(Debug)]
pub struct RuntimeContext {
    /// Whether to produce JSON output.
    pub json: bool,

    /// Verbose output.
    pub verbose: bool,

    /// Quiet mode: suppress non-essential output.
    pub quiet: bool,

    /// Configuration file in effect (may not exist).
    pub config_file: PathBuf,

    /// Effective configuration after all layers and flags.
    pub config: FormularyConfig,

    /// Directory layout of the prefix.
    pub layout: Layout,

    /// Working directory for formula lookup.
    pub cwd: PathBuf,
}

impl RuntimeContext {
    /// Build a `RuntimeContext` from parsed global arguments.
    ///
    /// `--prefix` overrides every configuration layer. Relative paths are
    /// made absolute so entry-point links stay valid from any directory.
    pub fn from_global_args(global: &GlobalArgs) -> Result<Self> {
        let cwd = env::current_dir().context("cannot determine the current directory")?;
        let config_file = config_path(global.config.as_deref());
        let mut config = load_config(Some(&config_file))
            .with_context(|| format!("failed to load configuration from {}", config_file.display()))?;

        if let Some(prefix) = &global.prefix {
            config.prefix = Some(prefix.clone());
        }
        config.prefix = config.prefix.map(|p| absolute(&cwd, p));
        config.cache_dir = config.cache_dir.map(|p| absolute(&cwd, p));

        let layout = Layout::from_config(&config)?;

        Ok(Self {
            json: global.json,
            verbose: global.verbose,
            quiet: global.quiet,
            config_file,
            config,
            layout,
            cwd,
        })
    }

    /// Locate and load a formula by name or path, rejecting invalid ones.
    pub fn load_formula(&self, formula: &str) -> Result<PackageDescriptor> {
        let path = self.find_formula(formula)?;
        formulary_formula::load_formula(&path).with_context(|| format!("failed to load {}", path.display()))
    }

    /// Resolve a formula name or path to a file.
    pub fn find_formula(&self, formula: &str) -> Result<PathBuf> {
        Ok(formulary_formula::find_formula(
            formula,
            &self.cwd,
            &[self.layout.formulas_dir()],
        )?)
    }

    pub fn fetcher(&self) -> Fetcher {
        Fetcher::new(
            self.layout.downloads_dir(),
            FetchOptions {
                timeout: Duration::from_secs(self.config.http.timeout_secs),
                user_agent: self.config.http.user_agent.clone(),
                strict_checksums: self.config.strict_checksums,
            },
        )
    }

    /// The production installer: virtualenvs built from the located Python.
    pub fn installer(&self) -> Installer<VirtualenvInstaller> {
        Installer::new(
            self.layout.clone(),
            self.fetcher(),
            VirtualenvInstaller::new(self.config.python.clone()),
        )
    }

    pub fn test_timeout(&self) -> Duration {
        Duration::from_secs(self.config.test.timeout_secs)
    }

    /// Print a progress line unless `--quiet` or `--json`.
    pub fn say(&self, line: impl AsRef<str>) {
        if !self.quiet && !self.json {
            println!("{}", line.as_ref());
        }
    }
}

fn absolute(cwd: &Path, path: PathBuf) -> PathBuf {
    if path.is_absolute() { path } else { cwd.join(path) }
}
