//! Parse formula files (TOML and JSON) and resolve formula paths.

use std::path::{Path, PathBuf};

use formulary_core::PackageDescriptor;
use formulary_core::descriptor::DescriptorError;

/// Errors that can occur while locating and parsing formulas.
#[derive(Debug, thiserror::Error)]
pub enum FormulaError {
    #[error("parse error in {path}: {message}")]
    Parse { path: String, message: String },

    #[error("formula '{name}' not found (searched {searched})")]
    NotFound { name: String, searched: String },

    #[error(transparent)]
    Invalid(#[from] DescriptorError),

    #[error("failed to read formula: {0}")]
    Io(#[from] std::io::Error),
}

/// A specialized `Result` type for formula operations.
pub type Result<T> = std::result::Result<T, FormulaError>;

/// Suffixes tried when a formula is named without an extension.
const SUFFIXES: &[&str] = &[".formula.toml", ".formula.json", ".toml", ".json"];

/// Directory inside a project that holds formulas.
const PROJECT_FORMULA_DIR: &str = "Formula";

/// Parse a formula from a TOML string.
pub fn parse_toml(content: &str) -> Result<PackageDescriptor> {
    toml::from_str(content).map_err(|e| FormulaError::Parse {
        path: "<toml>".to_string(),
        message: e.to_string(),
    })
}

/// Parse a formula from a JSON string.
pub fn parse_json(content: &str) -> Result<PackageDescriptor> {
    serde_json::from_str(content).map_err(|e| FormulaError::Parse {
        path: "<json>".to_string(),
        message: e.to_string(),
    })
}

/// Load and validate a formula from a file path (TOML vs JSON by extension).
///
/// # Errors
///
/// Returns [`FormulaError::Parse`] for malformed files and
/// [`FormulaError::Invalid`] for descriptors with error-level lint findings.
pub fn load_formula(path: &Path) -> Result<PackageDescriptor> {
    let descriptor = load_unvalidated(path)?;
    descriptor.validate()?;
    Ok(descriptor)
}

/// Load a formula without rejecting lint errors (used by `lint` itself).
pub fn load_unvalidated(path: &Path) -> Result<PackageDescriptor> {
    let content = std::fs::read_to_string(path)?;
    let parsed = match path.extension().and_then(|e| e.to_str()) {
        Some("toml") => parse_toml(&content),
        Some("json") => parse_json(&content),
        // Try JSON first, then TOML
        _ => parse_json(&content).or_else(|_| parse_toml(&content)),
    };
    let mut descriptor = parsed.map_err(|e| match e {
        FormulaError::Parse { message, .. } => FormulaError::Parse {
            path: path.display().to_string(),
            message,
        },
        other => other,
    })?;
    descriptor.source = path.display().to_string();
    Ok(descriptor)
}

/// Search for a formula by name.
///
/// Search order:
/// 1. Exact path (absolute, or relative to `cwd`)
/// 2. `cwd` with standard suffixes
/// 3. `Formula/` under `cwd`
/// 4. Each directory in `extra_dirs` (e.g. `<prefix>/formulas`)
pub fn find_formula(name: &str, cwd: &Path, extra_dirs: &[PathBuf]) -> Result<PathBuf> {
    let exact = Path::new(name);
    if exact.is_absolute() && exact.is_file() {
        return Ok(exact.to_path_buf());
    }
    let relative = cwd.join(name);
    if relative.is_file() {
        return Ok(relative);
    }

    let mut dirs = vec![cwd.to_path_buf(), cwd.join(PROJECT_FORMULA_DIR)];
    dirs.extend(extra_dirs.iter().cloned());

    for dir in dirs.iter().filter(|d| d.is_dir()) {
        if let Some(found) = find_in_dir(dir, name) {
            return Ok(found);
        }
    }

    let searched: Vec<String> = dirs.iter().map(|d| d.display().to_string()).collect();
    Err(FormulaError::NotFound {
        name: name.to_string(),
        searched: searched.join(", "),
    })
}

fn find_in_dir(dir: &Path, name: &str) -> Option<PathBuf> {
    SUFFIXES
        .iter()
        .map(|suffix| dir.join(format!("{name}{suffix}")))
        .find(|candidate| candidate.is_file())
}

/// List the formula names available in a directory, sorted.
pub fn list_formulas(dir: &Path) -> Result<Vec<String>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut names: Vec<String> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| {
            let file = entry.file_name().to_string_lossy().into_owned();
            SUFFIXES
                .iter()
                .find_map(|suffix| file.strip_suffix(suffix).map(str::to_string))
        })
        .collect();
    names.sort();
    names.dedup();
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const MCPVERSE_TOML: &str = r#"
name = "mcpverse"
desc = "Command-line interface tool for MCP"
homepage = "https://github.com/mcp/mcpverse-cli"
url = "https://files.pythonhosted.org/packages/source/m/mcpverse/mcpverse-0.1.0.tar.gz"
sha256 = "placeholder_sha256"
license = "MIT"
depends_on = ["python@3.8"]

[[resources]]
name = "click"
url = "https://files.pythonhosted.org/packages/43/0e/92b550d04c96b396bcf24bcbf4dd2b338b35037470a8cc3709a37a817c4b/click-8.1.7.tar.gz"
sha256 = "ca9853ad459e787e2192211578cc907e7594e294c7ccc834310722b41b9ca6de"

[test]
bin = "mcpv"
args = ["proxy", "https://example.com"]
expect = "URL: https://example.com"
"#;

    #[test]
    fn parse_toml_full() {
        let d = parse_toml(MCPVERSE_TOML).unwrap();
        assert_eq!(d.name, "mcpverse");
        assert_eq!(d.license, "MIT");
        assert_eq!(d.resources.len(), 1);
        assert_eq!(d.resources[0].name, "click");
        assert_eq!(d.depends_on[0].to_string(), "python@3.8");
        let test = d.test.unwrap();
        assert_eq!(test.args, vec!["proxy", "https://example.com"]);
        assert_eq!(test.expect, "URL: https://example.com");
    }

    #[test]
    fn parse_json_minimal() {
        let json = r#"{"name": "tool", "url": "https://x/tool-1.0.tar.gz", "sha256": ""}"#;
        let d = parse_json(json).unwrap();
        assert_eq!(d.name, "tool");
        assert!(d.resources.is_empty());
        assert!(d.sha256.is_placeholder());
    }

    #[test]
    fn parse_rejects_bad_checksum() {
        let toml_str = "name = \"x\"\nurl = \"https://x/x-1.tar.gz\"\nsha256 = \"abc\"\n";
        assert!(matches!(parse_toml(toml_str), Err(FormulaError::Parse { .. })));
    }

    #[test]
    fn load_formula_validates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "name = \"Bad Name\"\nurl = \"https://x/a-1.tar.gz\"\nsha256 = \"\"\n")
            .unwrap();
        assert!(matches!(load_formula(&path), Err(FormulaError::Invalid(_))));
        // lint path still loads it
        assert_eq!(load_unvalidated(&path).unwrap().name, "Bad Name");
    }

    #[test]
    fn find_formula_search_order() {
        let dir = tempfile::tempdir().unwrap();
        let extra = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("Formula")).unwrap();
        std::fs::write(dir.path().join("Formula").join("mcpverse.toml"), MCPVERSE_TOML).unwrap();
        std::fs::write(extra.path().join("other.formula.json"), "{}").unwrap();

        let found = find_formula("mcpverse", dir.path(), &[]).unwrap();
        assert!(found.ends_with("Formula/mcpverse.toml"));

        let found = find_formula("other", dir.path(), &[extra.path().to_path_buf()]).unwrap();
        assert!(found.ends_with("other.formula.json"));

        let found = find_formula("Formula/mcpverse.toml", dir.path(), &[]).unwrap();
        assert_eq!(load_formula(&found).unwrap().name, "mcpverse");

        assert!(matches!(
            find_formula("missing", dir.path(), &[]),
            Err(FormulaError::NotFound { .. })
        ));
    }

    #[test]
    fn list_formulas_strips_suffixes() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.toml"), "").unwrap();
        std::fs::write(dir.path().join("a.formula.json"), "").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "").unwrap();
        assert_eq!(list_formulas(dir.path()).unwrap(), vec!["a", "b"]);
    }
}
