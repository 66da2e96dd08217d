//! Stand-in interpreters for tests that must not depend on a real Python.
//!
//! The fake understands just enough of `python` for [`VirtualenvInstaller`]:
//! `--version`, `-m venv DIR` and `-m pip install ... ARCHIVE`. Installing
//! an archive named `<cache-key>--<name>-<version>.<ext>` (or without the
//! cache key) drops an executable `<name>` into the venv's `bin`. That
//! executable prints `URL: <second argument>`.
//!
//! [`VirtualenvInstaller`]: crate::VirtualenvInstaller

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

const FAKE_PYTHON: &str = r#"#!/bin/sh
if [ "$1" = "--version" ]; then
  echo "Python 3.8.10"
  exit 0
fi
if [ "$1" = "-m" ] && [ "$2" = "venv" ]; then
  mkdir -p "$3/bin" || exit 1
  cp "$0" "$3/bin/python" || exit 1
  exit 0
fi
if [ "$1" = "-m" ] && [ "$2" = "pip" ]; then
  FAIL_PIP
  for last; do :; done
  name=$(basename "$last")
  name=${name#*--}
  name=${name%%-*}
  bindir=$(dirname "$0")
  printf '#!/bin/sh\necho "%s $*"\necho "URL: $2"\n' "$name" > "$bindir/$name"
  chmod +x "$bindir/$name"
  exit 0
fi
echo "unsupported: $*" >&2
exit 2
"#;

/// Write a fake `python` into `dir` and return its path.
pub fn write_fake_python(dir: &Path) -> PathBuf {
    write_script(dir, "python", &FAKE_PYTHON.replace("FAIL_PIP", ":"))
}

/// Like [`write_fake_python`], but every `pip install` fails.
pub fn write_failing_pip_python(dir: &Path) -> PathBuf {
    write_script(
        dir,
        "python",
        &FAKE_PYTHON.replace("FAIL_PIP", "echo 'ERROR: no matching distribution' >&2; exit 1"),
    )
}

/// Write an executable shell script.
pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, body).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}
