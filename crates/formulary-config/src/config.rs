//! Configuration types and loading for formulary.
//!
//! The main entry point is [`FormularyConfig`], assembled by [`load_config`]
//! from layered sources (lowest priority first):
//!
//! 1. built-in defaults
//! 2. `config.yaml` in the config directory (or an explicit file)
//! 3. `FORMULARY_*` environment variables, nested keys split on `__`
//!
//! CLI flags are applied on top by the binary.

use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::layout;

/// Prefix of configuration environment variables.
pub const ENV_PREFIX: &str = "FORMULARY_";

/// Name of the configuration file inside the config directory.
pub const CONFIG_FILE: &str = "config.yaml";

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A configuration source could not be read or merged.
    #[error("failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),

    /// The configuration file could not be written.
    #[error("failed to write config file: {0}")]
    Write(#[from] std::io::Error),

    /// Serialization of the configuration failed.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] serde_yaml::Error),

    /// No home directory is known and no prefix was configured.
    #[error("cannot determine home directory; set FORMULARY_PREFIX")]
    NoHome,

    /// A configuration value was invalid.
    #[error("invalid configuration value for key '{key}': {reason}")]
    InvalidValue {
        /// The configuration key that had an invalid value.
        key: String,
        /// A description of why the value is invalid.
        reason: String,
    },
}

impl From<figment::Error> for ConfigError {
    fn from(value: figment::Error) -> Self {
        Self::Load(Box::new(value))
    }
}

/// A specialized `Result` type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// HTTP client settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Whole-request timeout in seconds.
    #[serde(default = "default_http_timeout")]
    pub timeout_secs: u64,

    /// User-Agent header sent with every request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_http_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_http_timeout() -> u64 {
    300
}

fn default_user_agent() -> String {
    format!("formulary/{}", env!("CARGO_PKG_VERSION"))
}

/// Smoke-test settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestConfig {
    /// Seconds before a smoke-test process is killed.
    #[serde(default = "default_test_timeout")]
    pub timeout_secs: u64,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_test_timeout(),
        }
    }
}

fn default_test_timeout() -> u64 {
    60
}

// ---------------------------------------------------------------------------
// Main config struct
// ---------------------------------------------------------------------------

/// The full formulary configuration.
///
/// All fields use `serde` defaults so that a partially-specified file
/// deserializes with sensible values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct FormularyConfig {
    /// Installation prefix (default `~/.formulary`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<PathBuf>,

    /// Download cache directory (default `<prefix>/cache`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<PathBuf>,

    /// Explicit Python interpreter for virtualenv installs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub python: Option<PathBuf>,

    /// Refuse to install archives whose checksum is a placeholder.
    #[serde(default)]
    pub strict_checksums: bool,

    /// HTTP settings.
    #[serde(default)]
    pub http: HttpConfig,

    /// Smoke-test settings.
    #[serde(default)]
    pub test: TestConfig,
}

impl FormularyConfig {
    /// Resolve the installation prefix, falling back to `~/.formulary`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NoHome`] if no prefix is set and the home
    /// directory is unknown.
    pub fn resolved_prefix(&self) -> Result<PathBuf> {
        match &self.prefix {
            Some(p) => Ok(p.clone()),
            None => layout::default_prefix().ok_or(ConfigError::NoHome),
        }
    }

    /// Check values that serde cannot constrain.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for zero timeouts.
    pub fn validate(&self) -> Result<()> {
        if self.http.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "http.timeout_secs".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.test.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "test.timeout_secs".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Build the layered figment for a config file path.
///
/// A missing file is skipped silently by the YAML provider.
pub fn figment(config_file: &Path) -> Figment {
    Figment::from(Serialized::defaults(FormularyConfig::default()))
        .merge(Yaml::file(config_file))
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
}

/// The config file in effect: `explicit`, or `config.yaml` in the default
/// config directory.
pub fn config_path(explicit: Option<&Path>) -> PathBuf {
    match explicit {
        Some(p) => p.to_path_buf(),
        None => layout::default_config_dir()
            .map(|d| d.join(CONFIG_FILE))
            .unwrap_or_else(|| PathBuf::from(CONFIG_FILE)),
    }
}

/// Load configuration from `config_file` (or the default location) and the
/// environment.
///
/// # Errors
///
/// Returns [`ConfigError::Load`] if a source is malformed and
/// [`ConfigError::InvalidValue`] if a value is out of range.
pub fn load_config(config_file: Option<&Path>) -> Result<FormularyConfig> {
    let path = config_path(config_file);
    let config: FormularyConfig = figment(&path).extract()?;
    config.validate()?;
    Ok(config)
}

/// Save configuration as YAML, creating the parent directory.
///
/// # Errors
///
/// Returns [`ConfigError::Write`] on I/O failure.
pub fn save_config(config_file: &Path, config: &FormularyConfig) -> Result<()> {
    if let Some(parent) = config_file.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let yaml = serde_yaml::to_string(config)?;
    std::fs::write(config_file, yaml)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
