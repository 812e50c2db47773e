//! Backup and restore errors.
//!
//! Every failure that aborts an operation is a [`BackupError`]. Table-level
//! failures during dump generation never surface here: they are recorded as
//! [`SkippedTable`](crate::dump::SkippedTable) entries in the dump report and
//! the overall operation still succeeds.

use std::path::PathBuf;
use std::time::Duration;

/// Errors raised by the backup service, catalog and dump loaders.
#[derive(Debug, thiserror::Error)]
pub enum BackupError {
    /// The configured database could not be reached.
    #[error("Failed to connect to database: {0}")]
    ConnectionFailure(String),

    /// The configured engine is neither MySQL-family nor SQLite.
    #[error("Unsupported database driver '{0}' (expected mysql, mariadb or sqlite)")]
    UnsupportedDriver(String),

    /// An external dump/load tool exited unsuccessfully.
    #[error("{program} exited with {}: {stderr}", exit_code_label(.exit_code))]
    ExternalProcessFailure {
        program: String,
        exit_code: Option<i32>,
        stderr: String,
    },

    /// A required client executable could not be resolved.
    #[error("Client executable '{name}' not found: {reason}")]
    BinaryNotFound { name: String, reason: String },

    /// An external tool ran longer than the configured limit and was killed.
    #[error("{program} did not finish within {}", format_limit(.limit))]
    Timeout { program: String, limit: Duration },

    /// Download/delete target is not present in the backups directory.
    #[error("Backup file '{0}' not found")]
    FileNotFound(String),

    /// Input rejected before any processing started.
    #[error("Validation failed: {0}")]
    ValidationFailure(String),

    /// A backup or restore is already running against this database.
    #[error("Another backup or restore is already running for '{0}'")]
    Busy(String),

    /// The generated backup filename is already taken.
    #[error("Backup file '{0}' already exists")]
    AlreadyExists(String),

    /// A query against the live database failed outside per-table extraction.
    #[error("Database query failed: {0}")]
    Query(String),

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn exit_code_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {}", code),
        None => "no exit code (terminated by signal)".to_string(),
    }
}

fn format_limit(limit: &Duration) -> String {
    humantime::format_duration(*limit).to_string()
}

impl BackupError {
    /// Wrap an I/O error with the path it occurred on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        BackupError::Io {
            path: path.into(),
            source,
        }
    }

    /// Short machine-readable code used by the HTTP layer and CLI output.
    pub fn code(&self) -> &'static str {
        match self {
            BackupError::ConnectionFailure(_) => "connection_failure",
            BackupError::UnsupportedDriver(_) => "unsupported_driver",
            BackupError::ExternalProcessFailure { .. } => "external_process_failure",
            BackupError::BinaryNotFound { .. } => "binary_not_found",
            BackupError::Timeout { .. } => "timeout",
            BackupError::FileNotFound(_) => "file_not_found",
            BackupError::ValidationFailure(_) => "validation_failure",
            BackupError::Busy(_) => "busy",
            BackupError::AlreadyExists(_) => "already_exists",
            BackupError::Query(_) => "query_failed",
            BackupError::Io { .. } => "io_error",
        }
    }
}

/// Result alias for backup operations.
pub type BackupResult<T> = Result<T, BackupError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_external_process_failure_message() {
        let err = BackupError::ExternalProcessFailure {
            program: "mysql".to_string(),
            exit_code: Some(1),
            stderr: "ERROR 1045 (28000): Access denied".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "mysql exited with exit code 1: ERROR 1045 (28000): Access denied"
        );
        assert_eq!(err.code(), "external_process_failure");
    }

    #[test]
    fn test_signal_termination_message() {
        let err = BackupError::ExternalProcessFailure {
            program: "sqlite3".to_string(),
            exit_code: None,
            stderr: String::new(),
        };
        assert!(err.to_string().contains("terminated by signal"));
    }

    #[test]
    fn test_timeout_message_is_human_readable() {
        let err = BackupError::Timeout {
            program: "sqlite3".to_string(),
            limit: Duration::from_secs(90),
        };
        assert_eq!(err.to_string(), "sqlite3 did not finish within 1m 30s");
    }
}
