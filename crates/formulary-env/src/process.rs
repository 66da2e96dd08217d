//! Subprocess execution wrappers.
//!
//! Provides a thin wrapper around `std::process::Command` so that the rest
//! of the codebase does not deal with spawning, exit codes and output
//! decoding directly.

use std::ffi::OsStr;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::error::{EnvError, Result};

/// How often a timed child is polled for exit.
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Captured result of a finished child process.
#[derive(Debug, Clone)]
pub struct Captured {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl Captured {
    /// Stdout followed by stderr.
    pub fn combined(&self) -> String {
        let mut out = self.stdout.clone();
        if !self.stderr.is_empty() {
            if !out.is_empty() && !out.ends_with('\n') {
                out.push('\n');
            }
            out.push_str(&self.stderr);
        }
        out
    }
}

/// Execute `program` with `args`, returning trimmed stdout on success.
///
/// # Errors
///
/// Returns [`EnvError::Spawn`] if the program cannot be started, or
/// [`EnvError::CommandFailed`] if it exits with a non-zero status.
pub fn run_command<S: AsRef<OsStr>>(program: &Path, args: &[S], cwd: Option<&Path>) -> Result<String> {
    let captured = capture(program, args, cwd)?;
    if !captured.status.success() {
        return Err(EnvError::CommandFailed {
            program: program.display().to_string(),
            code: captured.status.code(),
            stderr: captured.stderr.trim().to_string(),
        });
    }
    Ok(captured.stdout.trim().to_string())
}

/// Execute `program` and capture its output regardless of exit status.
///
/// # Errors
///
/// Returns [`EnvError::Spawn`] if the program cannot be started.
pub fn capture<S: AsRef<OsStr>>(program: &Path, args: &[S], cwd: Option<&Path>) -> Result<Captured> {
    debug!(program = %program.display(), args = ?display_args(args), "running");
    let mut cmd = Command::new(program);
    cmd.args(args).stdin(Stdio::null());
    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }
    let output = cmd.output().map_err(|source| EnvError::Spawn {
        program: program.display().to_string(),
        source,
    })?;
    Ok(Captured {
        status: output.status,
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

/// Execute `program`, killing it if it runs longer than `timeout`.
///
/// # Errors
///
/// Returns [`EnvError::Spawn`] if the program cannot be started, or
/// [`EnvError::Timeout`] if it had to be killed.
pub fn capture_with_timeout<S: AsRef<OsStr>>(
    program: &Path,
    args: &[S],
    timeout: Duration,
) -> Result<Captured> {
    debug!(program = %program.display(), args = ?display_args(args), ?timeout, "running with timeout");
    let spawn_err = |source| EnvError::Spawn {
        program: program.display().to_string(),
        source,
    };
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(spawn_err)?;

    let stdout = child.stdout.take().map(drain);
    let stderr = child.stderr.take().map(drain);

    let deadline = Instant::now() + timeout;
    let status = loop {
        match child.try_wait().map_err(spawn_err)? {
            Some(status) => break status,
            None if Instant::now() >= deadline => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(EnvError::Timeout {
                    program: program.display().to_string(),
                    timeout,
                });
            }
            None => thread::sleep(POLL_INTERVAL),
        }
    };

    Ok(Captured {
        status,
        stdout: join(stdout),
        stderr: join(stderr),
    })
}

/// Read a pipe to the end on a helper thread.
fn drain<R: Read + Send + 'static>(mut pipe: R) -> thread::JoinHandle<String> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        String::from_utf8_lossy(&buf).into_owned()
    })
}

fn join(handle: Option<thread::JoinHandle<String>>) -> String {
    handle.and_then(|h| h.join().ok()).unwrap_or_default()
}

fn display_args<S: AsRef<OsStr>>(args: &[S]) -> Vec<String> {
    args.iter()
        .map(|a| a.as_ref().to_string_lossy().into_owned())
        .collect()
}

/// Find an executable by name on `PATH`.
///
/// Names containing a path separator are checked directly.
pub fn find_executable(name: &str) -> Option<PathBuf> {
    let direct = Path::new(name);
    if direct.components().count() > 1 {
        return is_executable(direct).then(|| direct.to_path_buf());
    }
    let path = std::env::var_os("PATH")?;
    std::env::split_paths(&path)
        .flat_map(|dir| candidates(&dir, name))
        .find(|candidate| is_executable(candidate))
}

#[cfg(windows)]
fn candidates(dir: &Path, name: &str) -> Vec<PathBuf> {
    vec![dir.join(format!("{name}.exe")), dir.join(name)]
}

#[cfg(not(windows))]
fn candidates(dir: &Path, name: &str) -> Vec<PathBuf> {
    vec![dir.join(name)]
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
