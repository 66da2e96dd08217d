//! Configuration management for formulary.
//!
//! This crate loads the layered [`config::FormularyConfig`] (defaults, YAML
//! file, `FORMULARY_*` environment) and maps an installation prefix onto
//! its directory [`layout::Layout`].

pub mod config;
pub mod layout;

pub use config::{ConfigError, FormularyConfig, config_path, load_config, save_config};
pub use layout::Layout;
