//! Core types for the formulary package installer.
//!
//! This crate holds the descriptor data model shared by every other crate:
//! package descriptors and their resources, checksums, version constraints,
//! audit rules and install receipts. It performs no network or process I/O.

pub mod checksum;
pub mod descriptor;
pub mod receipt;
pub mod validation;
pub mod version;

pub use checksum::Checksum;
pub use descriptor::{ArchiveKind, ArchiveRef, Dependency, PackageDescriptor, Resource, SmokeTest};
pub use receipt::InstallReceipt;
