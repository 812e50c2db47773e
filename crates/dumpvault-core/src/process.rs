//! External client tools: binary resolution and time-limited execution.
//!
//! Commands are spawned directly (no shell) with stdin and stdout wired to
//! files, so dumps of any size stream through the kernel instead of being
//! buffered in memory.

use std::ffi::{OsStr, OsString};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::{BackupError, BackupResult};

/// Resolve a client executable from its configured path or from `PATH`.
///
/// A configured path must point to an existing file; it is never replaced by
/// a `PATH` lookup.
pub fn resolve_binary(name: &str, configured: Option<&Path>) -> BackupResult<PathBuf> {
    match configured {
        Some(path) if path.is_file() => Ok(path.to_path_buf()),
        Some(path) => Err(BackupError::BinaryNotFound {
            name: name.to_string(),
            reason: format!("configured path {} is not a file", path.display()),
        }),
        None => which::which(name).map_err(|e| BackupError::BinaryNotFound {
            name: name.to_string(),
            reason: e.to_string(),
        }),
    }
}

/// Captured result of a successful tool run.
#[derive(Debug, Default)]
pub struct ToolOutput {
    /// Empty when stdout was redirected to a file.
    pub stdout: Vec<u8>,
    pub stderr: String,
    pub elapsed: Duration,
}

/// A single invocation of an external tool.
#[derive(Debug)]
pub struct ToolCommand {
    label: String,
    program: PathBuf,
    args: Vec<OsString>,
    stdin: Option<PathBuf>,
    stdout: Option<PathBuf>,
    timeout: Duration,
}

impl ToolCommand {
    /// `label` names the tool in errors and logs (`sqlite3`, `mysql`).
    pub fn new(label: impl Into<String>, program: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            label: label.into(),
            program: program.into(),
            args: Vec::new(),
            stdin: None,
            stdout: None,
            timeout,
        }
    }

    #[must_use]
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    /// Feed the file at `path` to the child's stdin.
    #[must_use]
    pub fn stdin_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.stdin = Some(path.into());
        self
    }

    /// Write the child's stdout into `path`, truncating it first.
    #[must_use]
    pub fn stdout_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.stdout = Some(path.into());
        self
    }

    /// Run to completion.
    ///
    /// # Errors
    ///
    /// - `BinaryNotFound` if the program cannot be spawned because it is missing
    /// - `Timeout` if the limit elapses; the child is killed
    /// - `ExternalProcessFailure` on a non-zero exit, carrying stderr
    pub async fn run(self) -> BackupResult<ToolOutput> {
        let stdin = match &self.stdin {
            Some(path) => Stdio::from(
                std::fs::File::open(path).map_err(|e| BackupError::io(path, e))?,
            ),
            None => Stdio::null(),
        };
        let stdout = match &self.stdout {
            Some(path) => Stdio::from(
                std::fs::OpenOptions::new()
                    .write(true)
                    .truncate(true)
                    .create(true)
                    .open(path)
                    .map_err(|e| BackupError::io(path, e))?,
            ),
            None => Stdio::piped(),
        };

        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .stdin(stdin)
            .stdout(stdout)
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        debug!(
            tool = %self.label,
            program = %self.program.display(),
            args = ?self.args,
            stdin = ?self.stdin,
            stdout = ?self.stdout,
            "Spawning external tool"
        );

        let started = Instant::now();
        let child = command.spawn().map_err(|e| match e.kind() {
            ErrorKind::NotFound | ErrorKind::PermissionDenied => BackupError::BinaryNotFound {
                name: self.label.clone(),
                reason: format!("{}: {}", self.program.display(), e),
            },
            _ => BackupError::io(&self.program, e),
        })?;

        // Dropping the future on timeout drops the child, and kill_on_drop
        // terminates it.
        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(result) => result.map_err(|e| BackupError::io(&self.program, e))?,
            Err(_) => {
                warn!(tool = %self.label, limit = ?self.timeout, "External tool timed out, killed");
                return Err(BackupError::Timeout {
                    program: self.label,
                    limit: self.timeout,
                });
            }
        };

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if !output.status.success() {
            return Err(BackupError::ExternalProcessFailure {
                program: self.label,
                exit_code: output.status.code(),
                stderr,
            });
        }
        if !stderr.is_empty() {
            warn!(tool = %self.label, %stderr, "External tool succeeded with diagnostics");
        }

        Ok(ToolOutput {
            stdout: output.stdout,
            stderr,
            elapsed: started.elapsed(),
        })
    }
}
