//! Formula audit rules.
//!
//! [`lint`] inspects a descriptor and reports every problem it finds.
//! Error-level findings make a formula unusable; warnings are advisory.

use std::collections::HashSet;
use std::fmt;

use serde::Serialize;

use crate::checksum::Checksum;
use crate::descriptor::PackageDescriptor;

/// Longest description accepted without a warning.
const MAX_DESCRIPTION_LEN: usize = 80;

/// URL schemes a formula may fetch from.
const ALLOWED_SCHEMES: &[&str] = &["https", "http", "file"];

/// Articles a description must not start with.
const LEADING_ARTICLES: &[&str] = &["a", "an", "the"];

/// How serious a finding is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

/// One audit finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    pub severity: Severity,
    /// Field the finding is about, e.g. `url` or `resources.click.sha256`.
    pub field: String,
    pub message: String,
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Collects findings for one descriptor.
#[derive(Default)]
struct Audit {
    findings: Vec<Finding>,
}

impl Audit {
    fn error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.push(Severity::Error, field.into(), message.into());
    }

    fn warn(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.push(Severity::Warning, field.into(), message.into());
    }

    fn push(&mut self, severity: Severity, field: String, message: String) {
        self.findings.push(Finding {
            severity,
            field,
            message,
        });
    }
}

/// Audit a descriptor, returning findings in field order.
pub fn lint(descriptor: &PackageDescriptor) -> Vec<Finding> {
    let mut audit = Audit::default();

    check_name(&mut audit, &descriptor.name);
    check_version(&mut audit, &descriptor.version());
    check_description(&mut audit, &descriptor.description);

    if !descriptor.homepage.is_empty() {
        check_url(&mut audit, "homepage", &descriptor.homepage);
    }
    check_url(&mut audit, "url", &descriptor.url);
    check_checksum(&mut audit, "sha256", &descriptor.sha256);

    if descriptor.license.trim().is_empty() {
        audit.warn("license", "license is empty");
    }

    let mut seen = HashSet::new();
    for resource in &descriptor.resources {
        let prefix = format!("resources.{}", resource.name);
        if resource.name.trim().is_empty() {
            audit.error("resources", "resource name is empty");
        } else if !seen.insert(resource.name.as_str()) {
            audit.error("resources", format!("duplicate resource '{}'", resource.name));
        }
        check_url(&mut audit, format!("{prefix}.url"), &resource.url);
        check_checksum(&mut audit, format!("{prefix}.sha256"), &resource.sha256);
    }

    for dep in &descriptor.depends_on {
        if dep.name.is_empty() {
            audit.error("depends_on", "dependency name is empty");
        }
    }

    match &descriptor.test {
        None => audit.warn("test", "formula has no smoke test"),
        Some(test) => {
            if let Some(bin) = test.bin.as_deref() {
                if !is_path_component(bin) {
                    audit.error("test.bin", format!("'{bin}' is not a plain executable name"));
                }
            }
            if test.expect.is_empty() {
                audit.error("test.expect", "expected output must not be empty");
            }
        }
    }

    audit.findings
}

fn check_name(audit: &mut Audit, name: &str) {
    if name.is_empty() {
        audit.error("name", "name is required");
        return;
    }
    let valid = name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '+' | '_' | '.' | '-'));
    if !valid {
        audit.error(
            "name",
            format!("'{name}' may only contain lowercase letters, digits and + _ . -"),
        );
    } else if !is_path_component(name) {
        audit.error(
            "name",
            format!("'{name}' must not start with '.' or contain '..'"),
        );
    }
}

fn check_version(audit: &mut Audit, version: &str) {
    if !is_path_component(version) {
        audit.error(
            "version",
            format!("'{version}' cannot be used as a keg directory name"),
        );
    }
}

fn check_description(audit: &mut Audit, desc: &str) {
    let desc = desc.trim();
    if desc.is_empty() {
        audit.warn("description", "description is empty");
        return;
    }
    if desc.ends_with('.') {
        audit.warn("description", "description should not end with a period");
    }
    if let Some(first) = desc.split_whitespace().next() {
        if LEADING_ARTICLES.contains(&first.to_ascii_lowercase().as_str()) {
            audit.warn(
                "description",
                format!("description should not start with an article ('{first}')"),
            );
        }
    }
    if desc.chars().count() > MAX_DESCRIPTION_LEN {
        audit.warn(
            "description",
            format!("description is longer than {MAX_DESCRIPTION_LEN} characters"),
        );
    }
}

fn check_url(audit: &mut Audit, field: impl Into<String>, url: &str) {
    let field = field.into();
    match url.split_once("://") {
        Some((scheme, rest)) if ALLOWED_SCHEMES.contains(&scheme) && !rest.is_empty() => {
            if scheme == "http" {
                audit.warn(field, format!("'{url}' is fetched without TLS"));
            }
        }
        _ => audit.error(field, format!("'{url}' is not an http, https or file URL")),
    }
}

fn check_checksum(audit: &mut Audit, field: impl Into<String>, checksum: &Checksum) {
    if checksum.is_placeholder() {
        audit.warn(field, "checksum is a placeholder; archive will not be verified");
    }
}

/// Returns `true` if `value` names exactly one directory entry: non-empty,
/// no path separators, no leading `.` and no `..`.
///
/// Package names, versions and entry points are joined onto prefix paths,
/// so each must pass this check.
pub fn is_path_component(value: &str) -> bool {
    !value.is_empty()
        && !value.starts_with('.')
        && !value.contains(['/', '\\', '\0'])
        && !value.contains("..")
}

/// Returns `true` if any finding is an error.
pub fn has_errors(findings: &[Finding]) -> bool {
    findings.iter().any(|f| f.severity == Severity::Error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn descriptor(json: serde_json::Value) -> PackageDescriptor {
        serde_json::from_value(json).unwrap()
    }

    fn fields(findings: &[Finding], severity: Severity) -> Vec<String> {
        findings
            .iter()
            .filter(|f| f.severity == severity)
            .map(|f| f.field.clone())
            .collect()
    }

    #[test]
    fn clean_formula_has_no_findings() {
        let d = descriptor(serde_json::json!({
            "name": "mcpverse",
            "description": "Command-line interface tool for MCP",
            "homepage": "https://github.com/mcp/mcpverse-cli",
            "url": "https://x/mcpverse-0.1.0.tar.gz",
            "sha256": "ca9853ad459e787e2192211578cc907e7594e294c7ccc834310722b41b9ca6de",
            "license": "MIT",
            "test": {"args": ["--help"], "expect": "Usage"}
        }));
        assert_eq!(lint(&d), Vec::<Finding>::new());
    }

    #[test]
    fn flags_placeholder_and_style_warnings() {
        let d = descriptor(serde_json::json!({
            "name": "mcpverse",
            "description": "A tool for MCP.",
            "url": "http://x/mcpverse-0.1.0.tar.gz",
            "sha256": "placeholder_sha256"
        }));
        let findings = lint(&d);
        assert!(!has_errors(&findings));
        assert_eq!(
            fields(&findings, Severity::Warning),
            vec!["description", "description", "url", "sha256", "license", "test"]
        );
    }

    #[test]
    fn flags_errors() {
        let d = descriptor(serde_json::json!({
            "name": "McpVerse",
            "url": "ftp://x/a.tar.gz",
            "homepage": "github.com/mcp",
            "sha256": "placeholder",
            "resources": [
                {"name": "click", "url": "https://x/click-8.1.7.tar.gz", "sha256": ""},
                {"name": "click", "url": "nope", "sha256": ""}
            ],
            "test": {"expect": ""}
        }));
        let findings = lint(&d);
        assert!(has_errors(&findings));
        assert_eq!(
            fields(&findings, Severity::Error),
            vec!["name", "homepage", "url", "resources", "resources.click.url", "test.expect"]
        );
    }

    #[test]
    fn path_components() {
        for ok in ["mcpverse", "0.1.0", "HEAD", "c++", "a.b"] {
            assert!(is_path_component(ok), "{ok}");
        }
        for bad in ["", ".", "..", ".hidden", "../x", "a/b", "a\\b", "1..2", "x\0"] {
            assert!(!is_path_component(bad), "{bad:?}");
        }
    }

    #[test]
    fn rejects_names_and_versions_that_escape_the_cellar() {
        for name in [".", "..", ".mcpverse", "a..b"] {
            let d = descriptor(serde_json::json!({
                "name": name,
                "url": "https://x/mcpverse-0.1.0.tar.gz",
                "sha256": "placeholder",
                "test": {"expect": "URL"}
            }));
            assert_eq!(fields(&lint(&d), Severity::Error), vec!["name"], "{name}");
            assert!(d.validate().is_err());
        }

        for version in ["", ".", "..", "../..", "1.0/evil", "1.0\\evil", "1..0"] {
            let d = descriptor(serde_json::json!({
                "name": "mcpverse",
                "version": version,
                "url": "https://x/mcpverse-0.1.0.tar.gz",
                "sha256": "placeholder",
                "test": {"expect": "URL"}
            }));
            assert_eq!(fields(&lint(&d), Severity::Error), vec!["version"], "{version:?}");
            assert!(d.validate().is_err());
        }
    }

    #[test]
    fn rejects_test_binary_paths() {
        let d = descriptor(serde_json::json!({
            "name": "mcpverse",
            "url": "https://x/mcpverse-0.1.0.tar.gz",
            "sha256": "placeholder",
            "test": {"bin": "../../usr/bin/env", "expect": "URL"}
        }));
        assert_eq!(fields(&lint(&d), Severity::Error), vec!["test.bin"]);
    }
}
