//! The formulary install pipeline.
//!
//! Ties fetching, environment installation, linking, receipts and the
//! smoke test together, and maps every failure into [`InstallFailure`].

pub mod error;
pub mod kegs;
pub mod pipeline;
pub mod smoke;

pub use error::{InstallFailure, Result};
pub use kegs::{Uninstalled, installed_receipt, list_installed, uninstall};
pub use pipeline::{InstallOptions, InstallOutcome, InstallStatus, Installer};
pub use smoke::{smoke_test, test_binary};
