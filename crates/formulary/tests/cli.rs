//! End-to-end CLI tests for the `formulary` binary.
//!
//! Every test gets its own home, config directory and prefix, and only
//! fetches `file://` archives or closed local ports.

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use formulary_core::checksum::sha256_hex;
use predicates::prelude::*;
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

struct Sandbox {
    dir: TempDir,
}

impl Sandbox {
    fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    fn prefix(&self) -> PathBuf {
        self.path().join("prefix")
    }

    /// `formulary --prefix <sandbox>/prefix` isolated from the user's setup.
    fn formulary(&self) -> Command {
        let mut cmd = Command::cargo_bin("formulary").unwrap();
        cmd.current_dir(self.path())
            .env("HOME", self.path())
            .env("FORMULARY_CONFIG_DIR", self.path().join("config"))
            .env("NO_COLOR", "1")
            .env_remove("FORMULARY_PREFIX")
            .env_remove("FORMULARY_PYTHON")
            .env_remove("FORMULARY_STRICT_CHECKSUMS")
            .env_remove("RUST_LOG")
            .arg("--prefix")
            .arg(self.prefix());
        cmd
    }

    /// Write a source archive and return its `file://` URL and digest.
    fn archive(&self, file: &str, contents: &[u8]) -> (String, String) {
        let src = self.path().join("src");
        std::fs::create_dir_all(&src).unwrap();
        let path = src.join(file);
        std::fs::write(&path, contents).unwrap();
        (format!("file://{}", path.display()), sha256_hex(contents))
    }

    fn formula(&self, file: &str, toml: &str) -> PathBuf {
        let path = self.path().join(file);
        std::fs::write(&path, toml).unwrap();
        path
    }
}

fn shipped_formula(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../../formulas")
        .join(name)
}

fn demo_formula(url: &str, sha256: &str) -> String {
    format!(
        r#"name = "demo"
description = "Demo package"
url = "{url}"
sha256 = "{sha256}"
license = "MIT"

[test]
args = ["--version"]
expect = "demo"
"#
    )
}

// ---------------------------------------------------------------------------
// Read-only commands
// ---------------------------------------------------------------------------

#[test]
fn version_prints_platform() {
    let sb = Sandbox::new();
    sb.formulary()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("formulary "));
}

#[test]
fn lint_shipped_formulas() {
    let sb = Sandbox::new();
    for name in ["mcpverse.toml", "mcpverse-slim.toml"] {
        // The placeholder checksum is a warning, not an error.
        sb.formulary()
            .arg("lint")
            .arg(shipped_formula(name))
            .assert()
            .success()
            .stdout(predicate::str::contains("placeholder"));

        sb.formulary()
            .args(["lint", "--strict"])
            .arg(shipped_formula(name))
            .assert()
            .failure()
            .stderr(predicate::str::contains("lint found"));
    }
}

#[test]
fn lint_reports_every_error() {
    let sb = Sandbox::new();
    let path = sb.formula(
        "bad.toml",
        r#"name = "Bad Name"
description = "A package."
url = "ftp://example.com/bad-1.0.tar.gz"
sha256 = ""

[[resources]]
name = "dup"
url = "https://example.com/a.tar.gz"
sha256 = ""

[[resources]]
name = "dup"
url = "https://example.com/b.tar.gz"
sha256 = ""
"#,
    );
    let output = sb.formulary().args(["lint", "--json"]).arg(&path).output().unwrap();
    assert!(!output.status.success());
    let reports: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let findings = reports[0]["findings"].as_array().unwrap();
    let fields: Vec<&str> = findings.iter().map(|f| f["field"].as_str().unwrap()).collect();
    assert!(fields.contains(&"name"), "{fields:?}");
    assert!(fields.contains(&"url"), "{fields:?}");
    assert!(fields.iter().any(|f| f.starts_with("resources")), "{fields:?}");
}

#[test]
fn info_json_describes_formula() {
    let sb = Sandbox::new();
    let output = sb
        .formulary()
        .args(["info", "--json"])
        .arg(shipped_formula("mcpverse.toml"))
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let info: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(info["formula"]["name"], "mcpverse");
    assert_eq!(info["formula"]["license"], "MIT");
    assert_eq!(info["formula"]["resources"][0]["name"], "click");
    assert_eq!(info["version"], "0.1.0");
    assert!(info["installed"].is_null());
}

#[test]
fn slim_variant_has_no_resources() {
    let sb = Sandbox::new();
    let output = sb
        .formulary()
        .args(["info", "--json"])
        .arg(shipped_formula("mcpverse-slim.toml"))
        .output()
        .unwrap();
    let info: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(info["formula"]["license"], "BSD-3-Clause");
    assert!(info["formula"].get("resources").map_or(true, |r| r.as_array().unwrap().is_empty()));
}

#[test]
fn missing_formula_fails() {
    let sb = Sandbox::new();
    sb.formulary()
        .args(["info", "no-such-formula"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no-such-formula"));
}

#[test]
fn config_show_reflects_prefix() {
    let sb = Sandbox::new();
    sb.formulary()
        .args(["config", "show"])
        .env("FORMULARY_TEST__TIMEOUT_SECS", "7")
        .assert()
        .success()
        .stdout(predicate::str::contains(sb.prefix().display().to_string()))
        .stdout(predicate::str::contains("timeout_secs: 7"));
}

// ---------------------------------------------------------------------------
// Fetch failures
// ---------------------------------------------------------------------------

#[test]
fn fetch_checksum_mismatch_fails() {
    let sb = Sandbox::new();
    let (url, _) = sb.archive("demo-1.0.tar.gz", b"demo sources");
    let path = sb.formula("demo.toml", &demo_formula(&url, &"0".repeat(64)));

    sb.formulary()
        .args(["fetch", "--json"])
        .arg(&path)
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("\"kind\": \"checksum_mismatch\""));
}

#[test]
fn install_checksum_mismatch_leaves_no_keg() {
    let sb = Sandbox::new();
    let (url, _) = sb.archive("demo-1.0.tar.gz", b"demo sources");
    let path = sb.formula("demo.toml", &demo_formula(&url, &"0".repeat(64)));

    sb.formulary()
        .arg("install")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("checksum mismatch for demo"));
    assert!(!sb.prefix().join("cellar").join("demo").exists());
}

#[test]
fn install_rejects_version_outside_the_cellar() {
    let sb = Sandbox::new();
    let (url, sha) = sb.archive("demo-1.0.tar.gz", b"demo sources");
    let toml = demo_formula(&url, &sha).replace("license = \"MIT\"", "license = \"MIT\"\nversion = \"../..\"");
    let path = sb.formula("demo.toml", &toml);

    sb.formulary()
        .arg("install")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("version: '../..'"));
    assert!(!sb.prefix().join("INSTALL_RECEIPT.json").exists());
}

#[test]
fn uninstall_rejects_names_outside_the_cellar() {
    let sb = Sandbox::new();
    for dir in ["cellar/demo/1.0", "cache/downloads", "bin"] {
        std::fs::create_dir_all(sb.prefix().join(dir)).unwrap();
    }

    for name in ["..", "."] {
        sb.formulary()
            .args(["uninstall", "--json", name])
            .assert()
            .failure()
            .stderr(predicate::str::contains("\"kind\": \"invalid_name\""));
    }
    sb.formulary()
        .args(["uninstall", ""])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not a valid package name"));

    assert!(sb.prefix().join("cellar/demo/1.0").is_dir());
    assert!(sb.prefix().join("cache/downloads").is_dir());
    assert!(sb.prefix().join("bin").is_dir());
}

#[test]
fn unreachable_url_is_a_fetch_error() {
    let sb = Sandbox::new();
    let port = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();
    let url = format!("http://127.0.0.1:{port}/demo-1.0.tar.gz");
    let path = sb.formula("demo.toml", &demo_formula(&url, &"0".repeat(64)));

    sb.formulary()
        .args(["install", "--json"])
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("\"kind\": \"fetch_error\""));
}

#[test]
fn strict_checksums_reject_placeholders() {
    let sb = Sandbox::new();
    let (url, _) = sb.archive("demo-1.0.tar.gz", b"demo sources");
    let path = sb.formula("demo.toml", &demo_formula(&url, "placeholder_sha256"));

    sb.formulary()
        .arg("fetch")
        .arg(&path)
        .env("FORMULARY_STRICT_CHECKSUMS", "true")
        .assert()
        .failure()
        .stderr(predicate::str::contains("placeholder"));
}

// ---------------------------------------------------------------------------
// Full lifecycle with a stand-in interpreter
// ---------------------------------------------------------------------------

#[cfg(unix)]
#[test]
fn install_test_list_uninstall() {
    let sb = Sandbox::new();
    let python = formulary_env::test_utils::write_fake_python(sb.path());
    let (url, sha) = sb.archive("mcpv-0.1.0.tar.gz", b"mcpverse sources");
    let (click_url, click_sha) = sb.archive("click-8.1.7.tar.gz", b"click sources");
    let path = sb.formula(
        "mcpverse.toml",
        &format!(
            r#"name = "mcpverse"
description = "Command-line interface tool for MCP"
url = "{url}"
sha256 = "{sha}"
license = "MIT"
depends_on = ["python@3.8"]

[[resources]]
name = "click"
url = "{click_url}"
sha256 = "{click_sha}"

[test]
bin = "mcpv"
args = ["proxy", "https://example.com"]
expect = "URL: https://example.com"
status = 0
"#
        ),
    );

    sb.formulary()
        .args(["install", "--test"])
        .arg(&path)
        .env("FORMULARY_PYTHON", &python)
        .assert()
        .success()
        .stdout(predicate::str::contains("Installed"))
        .stdout(predicate::str::contains("Smoke test passed"));
    assert!(sb.prefix().join("bin").join("mcpv").exists());
    assert!(sb.prefix().join("cellar/mcpverse/0.1.0/INSTALL_RECEIPT.json").is_file());

    // second install is a no-op
    sb.formulary()
        .arg("install")
        .arg(&path)
        .env("FORMULARY_PYTHON", &python)
        .assert()
        .success()
        .stdout(predicate::str::contains("already installed"));

    sb.formulary().arg("test").arg(&path).assert().success();

    let output = sb.formulary().args(["list", "--json"]).output().unwrap();
    let listed: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let listed = listed.as_array().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["name"], "mcpverse");
    assert_eq!(listed[0]["entry_points"][0], "mcpv");
    assert_eq!(listed[0]["runtime"]["version"], "3.8.10");

    sb.formulary().args(["uninstall", "mcpverse"]).assert().success();
    assert!(!sb.prefix().join("bin").join("mcpv").exists());
    assert!(!sb.prefix().join("cellar").join("mcpverse").exists());

    sb.formulary()
        .arg("test")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("not installed"));
}

#[cfg(unix)]
#[test]
fn failing_smoke_test_is_an_assertion_error() {
    let sb = Sandbox::new();
    let python = formulary_env::test_utils::write_fake_python(sb.path());
    let (url, sha) = sb.archive("mcpv-0.1.0.tar.gz", b"mcpverse sources");
    let path = sb.formula(
        "mcpverse.toml",
        &format!(
            r#"name = "mcpverse"
description = "Command-line interface tool for MCP"
url = "{url}"
sha256 = "{sha}"
license = "MIT"

[test]
bin = "mcpv"
args = ["proxy", "https://elsewhere.example"]
expect = "URL: https://example.com"
"#
        ),
    );

    sb.formulary()
        .args(["install", "--test", "--json"])
        .arg(&path)
        .env("FORMULARY_PYTHON", &python)
        .assert()
        .failure()
        .stderr(predicate::str::contains("\"kind\": \"assertion_error\""));
}
