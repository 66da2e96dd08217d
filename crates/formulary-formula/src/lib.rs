//! Formula files for the formulary package installer.
//!
//! A formula is a TOML (or JSON) file describing one package: where its
//! source archive lives, the archive's checksum, bundled resources, runtime
//! dependency pins and a smoke test. This crate parses formula files into
//! [`formulary_core::PackageDescriptor`] values and finds them by name.

pub mod parser;

pub use parser::{FormulaError, find_formula, load_formula};
