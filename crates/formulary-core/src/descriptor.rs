//! Package descriptor data model.
//!
//! A [`PackageDescriptor`] is the parsed contents of one formula file. It is
//! built once when the formula is loaded and only ever borrowed afterwards.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::checksum::Checksum;
use crate::validation::{self, Severity};
use crate::version::{self, InvalidConstraint, VersionConstraint};

/// Errors describing a structurally unusable descriptor.
#[derive(Debug, thiserror::Error)]
pub enum DescriptorError {
    /// One or more error-level lint findings.
    #[error("invalid formula '{name}': {}", .problems.join("; "))]
    Invalid {
        /// Formula name (may be empty).
        name: String,
        /// Human-readable problems.
        problems: Vec<String>,
    },

    /// A dependency string could not be parsed.
    #[error("invalid dependency '{spec}': {source}")]
    Dependency {
        /// The dependency as written.
        spec: String,
        /// Underlying constraint error.
        #[source]
        source: InvalidConstraint,
    },
}

/// Root structure of a formula file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageDescriptor {
    /// Package name; also the default entry-point name.
    pub name: String,

    /// One-line description.
    #[serde(default, alias = "desc")]
    pub description: String,

    /// Project homepage.
    #[serde(default)]
    pub homepage: String,

    /// Source archive URL.
    pub url: String,

    /// Checksum of the source archive.
    pub sha256: Checksum,

    /// License identifier (SPDX style, e.g. `MIT`).
    #[serde(default)]
    pub license: String,

    /// Explicit version; derived from `url` when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Runtime dependency pins, in declared order.
    #[serde(default, alias = "dependencies")]
    pub depends_on: Vec<Dependency>,

    /// Auxiliary archives installed before the package, in declared order.
    #[serde(default)]
    pub resources: Vec<Resource>,

    /// Post-install smoke test.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test: Option<SmokeTest>,

    /// Where this formula was loaded from (set by the parser).
    #[serde(skip)]
    pub source: String,
}

impl PackageDescriptor {
    /// The package version: explicit, or derived from the source URL.
    pub fn version(&self) -> String {
        self.version
            .clone()
            .unwrap_or_else(|| version::version_from_url(&self.url))
    }

    /// Name of the binary the smoke test runs.
    pub fn test_binary(&self) -> &str {
        self.test
            .as_ref()
            .and_then(|t| t.bin.as_deref())
            .unwrap_or(&self.name)
    }

    /// The primary source archive as a fetchable reference.
    pub fn primary_archive(&self) -> ArchiveRef<'_> {
        ArchiveRef {
            name: &self.name,
            url: &self.url,
            checksum: &self.sha256,
            kind: ArchiveKind::Primary,
        }
    }

    /// Every archive the install needs: resources in declared order, then
    /// the primary archive.
    pub fn archives(&self) -> Vec<ArchiveRef<'_>> {
        let mut all: Vec<ArchiveRef<'_>> = self
            .resources
            .iter()
            .map(|r| ArchiveRef {
                name: &r.name,
                url: &r.url,
                checksum: &r.sha256,
                kind: ArchiveKind::Resource,
            })
            .collect();
        all.push(self.primary_archive());
        all
    }

    /// Look up a dependency by name.
    pub fn dependency(&self, name: &str) -> Option<&Dependency> {
        self.depends_on.iter().find(|d| d.name == name)
    }

    /// Reject descriptors with error-level lint findings.
    ///
    /// # Errors
    ///
    /// Returns [`DescriptorError::Invalid`] listing every error finding.
    pub fn validate(&self) -> Result<(), DescriptorError> {
        let problems: Vec<String> = validation::lint(self)
            .into_iter()
            .filter(|f| f.severity == Severity::Error)
            .map(|f| f.to_string())
            .collect();
        if problems.is_empty() {
            Ok(())
        } else {
            Err(DescriptorError::Invalid {
                name: self.name.clone(),
                problems,
            })
        }
    }
}

/// A runtime dependency pin, written `name@constraint` (e.g. `python@3.8`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "DependencySpec", into = "String")]
pub struct Dependency {
    /// Dependency name (e.g. `python`).
    pub name: String,
    /// Accepted versions.
    pub constraint: VersionConstraint,
}

impl Dependency {
    /// Parse `name` or `name@constraint`.
    ///
    /// # Errors
    ///
    /// Returns [`DescriptorError::Dependency`] for a malformed constraint.
    pub fn parse(spec: &str) -> Result<Self, DescriptorError> {
        let (name, constraint) = spec.split_once('@').unwrap_or((spec, ""));
        Self::from_parts(spec, name, constraint)
    }

    fn from_parts(spec: &str, name: &str, constraint: &str) -> Result<Self, DescriptorError> {
        let constraint =
            VersionConstraint::parse(constraint).map_err(|source| DescriptorError::Dependency {
                spec: spec.to_string(),
                source,
            })?;
        Ok(Self {
            name: name.trim().to_string(),
            constraint,
        })
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.constraint.is_any() {
            f.write_str(&self.name)
        } else {
            write!(f, "{}@{}", self.name, self.constraint)
        }
    }
}

impl From<Dependency> for String {
    fn from(value: Dependency) -> Self {
        value.to_string()
    }
}

/// Either `"python@3.8"` or `{ name = "python", version = "3.8" }`.
#[derive(Deserialize)]
#[serde(untagged)]
enum DependencySpec {
    Short(String),
    Table {
        name: String,
        #[serde(default)]
        version: String,
    },
}

impl TryFrom<DependencySpec> for Dependency {
    type Error = DescriptorError;

    fn try_from(value: DependencySpec) -> Result<Self, Self::Error> {
        match value {
            DependencySpec::Short(s) => Self::parse(&s),
            DependencySpec::Table { name, version } => {
                let spec = format!("{name}@{version}");
                Self::from_parts(&spec, &name, &version)
            }
        }
    }
}

/// A named auxiliary archive bundled with the package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    /// Resource name, unique within the formula.
    pub name: String,
    /// Archive URL.
    pub url: String,
    /// Archive checksum.
    pub sha256: Checksum,
}

/// The smoke test run against an installed package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmokeTest {
    /// Entry point to run; defaults to the package name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bin: Option<String>,

    /// Arguments passed to the entry point.
    #[serde(default)]
    pub args: Vec<String>,

    /// Substring that must appear in the combined stdout/stderr.
    pub expect: String,

    /// Required exit status, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<i32>,
}

/// Whether an archive is the package itself or a bundled resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ArchiveKind {
    Primary,
    Resource,
}

/// A borrowed view of one archive a descriptor needs fetched.
#[derive(Debug, Clone, Copy)]
pub struct ArchiveRef<'a> {
    pub name: &'a str,
    pub url: &'a str,
    pub checksum: &'a Checksum,
    pub kind: ArchiveKind,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const CLICK_SHA: &str = "ca9853ad459e787e2192211578cc907e7594e294c7ccc834310722b41b9ca6de";

    fn sample() -> PackageDescriptor {
        serde_json::from_value(serde_json::json!({
            "name": "mcpverse",
            "desc": "Command-line interface tool for MCP",
            "homepage": "https://github.com/mcp/mcpverse-cli",
            "url": "https://files.pythonhosted.org/packages/source/m/mcpverse/mcpverse-0.1.0.tar.gz",
            "sha256": "placeholder_sha256",
            "license": "MIT",
            "depends_on": ["python@3.8"],
            "resources": [{"name": "click", "url": "https://x/click-8.1.7.tar.gz", "sha256": CLICK_SHA}],
            "test": {"bin": "mcpv", "args": ["proxy", "https://example.com"], "expect": "URL: https://example.com"}
        }))
        .unwrap()
    }

    #[test]
    fn deserialize_full_descriptor() {
        let d = sample();
        assert_eq!(d.description, "Command-line interface tool for MCP");
        assert_eq!(d.version(), "0.1.0");
        assert!(d.sha256.is_placeholder());
        assert_eq!(d.depends_on[0].name, "python");
        assert_eq!(d.depends_on[0].constraint, VersionConstraint::Prefix(vec![3, 8]));
        assert_eq!(d.resources[0].sha256.digest(), Some(CLICK_SHA));
        assert_eq!(d.test_binary(), "mcpv");
        assert!(d.validate().is_ok());
    }

    #[test]
    fn archives_list_resources_then_primary() {
        let d = sample();
        let archives = d.archives();
        assert_eq!(archives.len(), 2);
        assert_eq!(archives[0].name, "click");
        assert_eq!(archives[0].kind, ArchiveKind::Resource);
        assert_eq!(archives[1].name, "mcpverse");
        assert_eq!(archives[1].kind, ArchiveKind::Primary);
    }

    #[test]
    fn resources_are_optional() {
        let d: PackageDescriptor = serde_json::from_value(serde_json::json!({
            "name": "mcpverse",
            "url": "https://x/mcpverse-0.1.0.tar.gz",
            "sha256": CLICK_SHA,
            "license": "BSD-3-Clause"
        }))
        .unwrap();
        assert!(d.resources.is_empty());
        assert_eq!(d.archives().len(), 1);
        assert_eq!(d.test_binary(), "mcpverse");
        assert!(d.validate().is_ok());
    }

    #[test]
    fn dependency_forms() {
        let short = Dependency::parse("python@3.8").unwrap();
        assert_eq!(short.to_string(), "python@3.8");
        let bare = Dependency::parse("git").unwrap();
        assert!(bare.constraint.is_any());
        assert_eq!(bare.to_string(), "git");

        let table: Dependency =
            serde_json::from_value(serde_json::json!({"name": "python", "version": ">=3.9"})).unwrap();
        assert_eq!(table.constraint, VersionConstraint::AtLeast(vec![3, 9]));
        assert!(Dependency::parse("python@three").is_err());
    }

    #[test]
    fn validate_rejects_duplicate_resources() {
        let mut d = sample();
        d.resources.push(d.resources[0].clone());
        let err = d.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate resource 'click'"), "{err}");
    }
}
