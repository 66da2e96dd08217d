//! Dotted version numbers and the constraints formulas pin runtimes to.
//!
//! Only what installers need: `3.8` style prefix pins, `>=` lower bounds and
//! `==` exact pins over numeric dotted components. This is not semver.

use std::cmp::Ordering;
use std::fmt;

/// Archive suffixes stripped before deriving a version from a file name.
const ARCHIVE_SUFFIXES: &[&str] = &[
    ".tar.gz", ".tgz", ".tar.bz2", ".tbz", ".tar.xz", ".txz", ".tar", ".zip", ".whl",
];

/// Version reported when none can be derived.
pub const HEAD_VERSION: &str = "HEAD";

/// A dotted numeric version such as `3.8.10`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Version(Vec<u64>);

impl Version {
    /// Parse the leading numeric components of a version string.
    ///
    /// Non-numeric tails inside a component (`0rc1`) are dropped; parsing
    /// stops at the first component without leading digits. Returns `None`
    /// if there is no numeric component at all.
    pub fn parse(raw: &str) -> Option<Self> {
        let mut parts = Vec::new();
        for component in raw.trim().split('.') {
            let digits: String = component.chars().take_while(char::is_ascii_digit).collect();
            if digits.is_empty() {
                break;
            }
            parts.push(digits.parse().ok()?);
            if digits.len() != component.len() {
                break;
            }
        }
        if parts.is_empty() {
            None
        } else {
            Some(Self(parts))
        }
    }

    /// Numeric components in order.
    pub fn components(&self) -> &[u64] {
        &self.0
    }

    /// Find the first dotted version inside free-form text such as
    /// `Python 3.8.10`.
    pub fn find_in(text: &str) -> Option<Self> {
        text.split_whitespace()
            .find(|word| word.starts_with(|c: char| c.is_ascii_digit()))
            .and_then(Self::parse)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined: Vec<String> = self.0.iter().map(u64::to_string).collect();
        f.write_str(&joined.join("."))
    }
}

/// Compare two component lists, treating missing components as zero.
fn compare_components(a: &[u64], b: &[u64]) -> Ordering {
    let len = a.len().max(b.len());
    for i in 0..len {
        let x = a.get(i).copied().unwrap_or(0);
        let y = b.get(i).copied().unwrap_or(0);
        match x.cmp(&y) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    Ordering::Equal
}

/// A constraint on a dependency's version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionConstraint {
    /// Any version satisfies.
    Any,
    /// Leading components must equal these (`3.8` accepts `3.8.10`).
    Prefix(Vec<u64>),
    /// Version must be greater than or equal to this.
    AtLeast(Vec<u64>),
    /// Version must equal this exactly (missing components are zero).
    Exact(Vec<u64>),
}

/// Error returned for an unparseable constraint.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid version constraint '{0}'")]
pub struct InvalidConstraint(pub String);

impl VersionConstraint {
    /// Parse a constraint: empty, `3.8`, `>=3.8` or `==3.8.1`.
    pub fn parse(raw: &str) -> Result<Self, InvalidConstraint> {
        let raw = raw.trim();
        if raw.is_empty() || raw == "*" {
            return Ok(Self::Any);
        }
        let (ctor, rest): (fn(Vec<u64>) -> Self, &str) = if let Some(rest) = raw.strip_prefix(">=") {
            (Self::AtLeast, rest)
        } else if let Some(rest) = raw.strip_prefix("==") {
            (Self::Exact, rest)
        } else {
            (Self::Prefix, raw)
        };
        let rest = rest.trim();
        let mut parts = Vec::new();
        for component in rest.split('.') {
            let n = component
                .parse::<u64>()
                .map_err(|_| InvalidConstraint(raw.to_string()))?;
            parts.push(n);
        }
        Ok(ctor(parts))
    }

    /// Returns `true` if `version` satisfies this constraint.
    pub fn matches(&self, version: &Version) -> bool {
        let v = version.components();
        match self {
            Self::Any => true,
            Self::Prefix(want) => v.len() >= want.len() && v[..want.len()] == want[..],
            Self::AtLeast(min) => compare_components(v, min) != Ordering::Less,
            Self::Exact(want) => compare_components(v, want) == Ordering::Equal,
        }
    }

    /// Returns `true` for [`VersionConstraint::Any`].
    pub fn is_any(&self) -> bool {
        matches!(self, Self::Any)
    }

    /// The pinned components, if any (used to guess interpreter names).
    pub fn pinned(&self) -> Option<&[u64]> {
        match self {
            Self::Any => None,
            Self::Prefix(v) | Self::AtLeast(v) | Self::Exact(v) => Some(v),
        }
    }
}

impl fmt::Display for VersionConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let join = |v: &[u64]| v.iter().map(u64::to_string).collect::<Vec<_>>().join(".");
        match self {
            Self::Any => Ok(()),
            Self::Prefix(v) => write!(f, "{}", join(v)),
            Self::AtLeast(v) => write!(f, ">={}", join(v)),
            Self::Exact(v) => write!(f, "=={}", join(v)),
        }
    }
}

/// Derive a package version from a source URL's file name.
///
/// `.../mcpverse-0.1.0.tar.gz` yields `0.1.0`. Returns [`HEAD_VERSION`] when
/// the file name carries no `-<digit>` suffix.
pub fn version_from_url(url: &str) -> String {
    let file = url
        .split(['?', '#'])
        .next()
        .unwrap_or(url)
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default();

    let stem = ARCHIVE_SUFFIXES
        .iter()
        .find_map(|suffix| file.strip_suffix(suffix))
        .unwrap_or(file);

    // Wheels are name-version-pytag-abi-platform; the version is the second field.
    if file.ends_with(".whl") {
        if let Some(v) = stem.split('-').nth(1) {
            return v.to_string();
        }
    }

    stem.char_indices()
        .filter(|&(i, c)| c == '-' && stem[i + 1..].starts_with(|d: char| d.is_ascii_digit()))
        .last()
        .map(|(i, _)| stem[i + 1..].to_string())
        .unwrap_or_else(|| HEAD_VERSION.to_string())
}
