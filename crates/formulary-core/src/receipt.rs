//! Install receipts.
//!
//! Every installed keg carries an `INSTALL_RECEIPT.json` recording exactly
//! what went into it. Receipts drive `list`, `uninstall` and the
//! already-installed check that makes reinstalls idempotent.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::descriptor::PackageDescriptor;

/// File name of the receipt inside a keg.
pub const RECEIPT_FILE: &str = "INSTALL_RECEIPT.json";

/// Errors reading or writing a receipt.
#[derive(Debug, thiserror::Error)]
pub enum ReceiptError {
    #[error("failed to access receipt: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed receipt: {0}")]
    Json(#[from] serde_json::Error),
}

/// The runtime a keg's environment was created with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeRecord {
    pub name: String,
    pub version: String,
    pub path: String,
}

/// A resource as installed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRecord {
    pub name: String,
    pub sha256: String,
}

/// Record of one installed package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallReceipt {
    pub name: String,
    pub version: String,
    pub source_url: String,
    /// Actual digest of the installed archive.
    pub sha256: String,
    /// Whether the declared checksum was a placeholder.
    #[serde(default)]
    pub unverified: bool,
    #[serde(default)]
    pub license: String,
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub resources: Vec<ResourceRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime: Option<RuntimeRecord>,
    /// Entry points linked into the prefix's `bin/`.
    #[serde(default)]
    pub entry_points: Vec<String>,
    pub installed_at: DateTime<Utc>,
}

impl InstallReceipt {
    /// Returns `true` if this receipt describes an install of exactly the
    /// archives `descriptor` declares, given their actual digests.
    ///
    /// `resource_digests` pairs each resource name with its fetched digest.
    pub fn matches(
        &self,
        descriptor: &PackageDescriptor,
        sha256: &str,
        resource_digests: &[(String, String)],
    ) -> bool {
        if self.name != descriptor.name
            || self.version != descriptor.version()
            || self.source_url != descriptor.url
            || self.sha256 != sha256
            || self.resources.len() != resource_digests.len()
        {
            return false;
        }
        self.resources
            .iter()
            .zip(resource_digests)
            .all(|(r, (name, digest))| &r.name == name && &r.sha256 == digest)
    }
}

/// Load the receipt from a keg directory.
///
/// Returns `Ok(None)` if the keg has no receipt.
///
/// # Errors
///
/// Returns [`ReceiptError`] if the file exists but cannot be read or parsed.
pub fn load_receipt(keg: &Path) -> Result<Option<InstallReceipt>, ReceiptError> {
    let path = keg.join(RECEIPT_FILE);
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(path)?;
    Ok(Some(serde_json::from_str(&content)?))
}

/// Write a receipt into a keg directory.
///
/// # Errors
///
/// Returns [`ReceiptError`] on I/O or serialization failure.
pub fn save_receipt(keg: &Path, receipt: &InstallReceipt) -> Result<(), ReceiptError> {
    let json = serde_json::to_string_pretty(receipt)?;
    std::fs::write(keg.join(RECEIPT_FILE), json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn descriptor() -> PackageDescriptor {
        serde_json::from_value(serde_json::json!({
            "name": "mcpverse",
            "url": "https://x/mcpverse-0.1.0.tar.gz",
            "sha256": "placeholder",
        }))
        .unwrap()
    }

    fn receipt() -> InstallReceipt {
        InstallReceipt {
            name: "mcpverse".into(),
            version: "0.1.0".into(),
            source_url: "https://x/mcpverse-0.1.0.tar.gz".into(),
            sha256: "aa".into(),
            unverified: true,
            license: "MIT".into(),
            dependencies: vec!["python@3.8".into()],
            resources: vec![ResourceRecord {
                name: "click".into(),
                sha256: "bb".into(),
            }],
            runtime: None,
            entry_points: vec!["mcpv".into()],
            installed_at: Utc::now(),
        }
    }

    #[test]
    fn save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_receipt(dir.path()).unwrap().is_none());
        let r = receipt();
        save_receipt(dir.path(), &r).unwrap();
        assert_eq!(load_receipt(dir.path()).unwrap(), Some(r));
    }

    #[test]
    fn matches_compares_digests() {
        let d = descriptor();
        let r = receipt();
        let resources = vec![("click".to_string(), "bb".to_string())];
        assert!(r.matches(&d, "aa", &resources));
        assert!(!r.matches(&d, "cc", &resources));
        assert!(!r.matches(&d, "aa", &[]));
        let changed = vec![("click".to_string(), "zz".to_string())];
        assert!(!r.matches(&d, "aa", &changed));
    }
}
