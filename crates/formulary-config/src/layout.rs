//! On-disk layout of an installation prefix.
//!
//! ```text
//! <prefix>/
//!   bin/                         entry-point symlinks into the cellar
//!   cellar/<name>/<version>/     one keg per installed package
//!   cache/downloads/             verified archives
//!   formulas/                    user formula directory
//!   .previous/<name>/<version>/  keg set aside during a reinstall
//!   .formulary.lock              advisory install lock
//! ```

use std::path::{Path, PathBuf};

use crate::config::{ConfigError, FormularyConfig};

/// Default prefix directory name under the home directory.
const PREFIX_DIR_NAME: &str = ".formulary";

/// Environment variable overriding the configuration directory.
const CONFIG_DIR_ENV: &str = "FORMULARY_CONFIG_DIR";

/// Name of the lock file inside the prefix.
const LOCK_FILE: &str = ".formulary.lock";

/// Directory inside the prefix holding kegs set aside during a reinstall.
const PREVIOUS_DIR: &str = ".previous";

/// Resolved directories for one prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    prefix: PathBuf,
    cache: PathBuf,
}

impl Layout {
    /// Layout rooted at `prefix` with the cache in `<prefix>/cache`.
    pub fn new(prefix: impl Into<PathBuf>) -> Self {
        let prefix = prefix.into();
        let cache = prefix.join("cache");
        Self { prefix, cache }
    }

    /// Layout for a loaded configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NoHome`] if the prefix cannot be determined.
    pub fn from_config(config: &FormularyConfig) -> Result<Self, ConfigError> {
        let mut layout = Self::new(config.resolved_prefix()?);
        if let Some(cache) = &config.cache_dir {
            layout.cache = cache.clone();
        }
        Ok(layout)
    }

    pub fn prefix(&self) -> &Path {
        &self.prefix
    }

    /// Directory holding entry-point links; the "search path" of installed binaries.
    pub fn bin_dir(&self) -> PathBuf {
        self.prefix.join("bin")
    }

    pub fn cellar(&self) -> PathBuf {
        self.prefix.join("cellar")
    }

    /// Directory holding every installed version of `name`.
    pub fn rack(&self, name: &str) -> PathBuf {
        self.cellar().join(name)
    }

    /// Directory of one installed version.
    pub fn keg(&self, name: &str, version: &str) -> PathBuf {
        self.rack(name).join(version)
    }

    /// Where a keg is kept while its replacement is being installed.
    pub fn previous_keg(&self, name: &str, version: &str) -> PathBuf {
        self.prefix.join(PREVIOUS_DIR).join(name).join(version)
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache
    }

    pub fn downloads_dir(&self) -> PathBuf {
        self.cache.join("downloads")
    }

    pub fn formulas_dir(&self) -> PathBuf {
        self.prefix.join("formulas")
    }

    pub fn lock_path(&self) -> PathBuf {
        self.prefix.join(LOCK_FILE)
    }

    /// Create the prefix skeleton if missing.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Write`] if a directory cannot be created.
    pub fn ensure(&self) -> Result<(), ConfigError> {
        for dir in [self.bin_dir(), self.cellar(), self.downloads_dir()] {
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }
}

/// Get the user's home directory.
pub fn home_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE").ok().map(PathBuf::from)
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME").ok().map(PathBuf::from)
    }
}

/// `~/.formulary`, if the home directory is known.
pub fn default_prefix() -> Option<PathBuf> {
    home_dir().map(|h| h.join(PREFIX_DIR_NAME))
}

/// The configuration directory.
///
/// `FORMULARY_CONFIG_DIR` wins; otherwise `$XDG_CONFIG_HOME/formulary`,
/// then `~/.config/formulary`.
pub fn default_config_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var(CONFIG_DIR_ENV) {
        if !dir.is_empty() {
            return Some(PathBuf::from(dir));
        }
    }
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        if !xdg.is_empty() {
            return Some(PathBuf::from(xdg).join("formulary"));
        }
    }
    home_dir().map(|h| h.join(".config").join("formulary"))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
