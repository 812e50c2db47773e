//! # Backup Service
//!
//! Orchestrates dump creation, the catalog and restores for one database:
//!
//! - generates `backup_<YYYY-MM-DD_HH-mm-ss>.sql` filenames in local time
//! - claims the target file exclusively so a same-second backup cannot
//!   overwrite an earlier one
//! - removes partially written files when a dump fails
//! - validates restore uploads before anything is spawned
//! - serializes backup and restore through an [`OperationGuard`]

use chrono::{DateTime, Local};
use serde::Serialize;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::fs;
use tracing::{error, info, warn};

use crate::catalog::{BackupCatalog, BackupEntry};
use crate::config::VaultConfig;
use crate::dump::SkippedTable;
use crate::error::{BackupError, BackupResult};
use crate::guard::OperationGuard;
use crate::identifiers::{DUMP_EXTENSION, has_dump_extension};
use crate::loader::{DumpLoader, Operation};

/// Filename prefix for generated backups.
pub const BACKUP_PREFIX: &str = "backup_";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// Filename for a backup taken at `at`.
pub fn backup_filename(at: DateTime<Local>) -> String {
    format!(
        "{}{}.{}",
        BACKUP_PREFIX,
        at.format(TIMESTAMP_FORMAT),
        DUMP_EXTENSION
    )
}

/// Outcome of a successful backup.
#[derive(Debug, Clone, Serialize)]
pub struct DumpReport {
    pub filename: String,
    pub size_bytes: u64,
    pub tables_written: Option<usize>,
    pub skipped: Vec<SkippedTable>,
    #[serde(with = "duration_text")]
    pub elapsed: Duration,
}

/// A dump file uploaded for restore.
#[derive(Debug, Clone)]
pub struct RestoreUpload {
    /// Client-supplied name, used only for the extension check and logs.
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl RestoreUpload {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes: bytes.into(),
        }
    }
}

/// Outcome of a successful restore.
#[derive(Debug, Clone, Serialize)]
pub struct RestoreReport {
    pub source: String,
    pub size_bytes: u64,
    #[serde(with = "duration_text")]
    pub elapsed: Duration,
}

/// Backup, catalog and restore operations for the configured database.
#[derive(Clone)]
pub struct BackupService {
    config: Arc<VaultConfig>,
    loader: Arc<dyn DumpLoader>,
    catalog: BackupCatalog,
    guard: OperationGuard,
}

impl std::fmt::Debug for BackupService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackupService")
            .field("database", &self.config.database.display_name())
            .field("driver", &self.loader.driver())
            .field("backups_dir", &self.catalog.dir())
            .finish()
    }
}

impl BackupService {
    pub fn new(config: VaultConfig, loader: Arc<dyn DumpLoader>) -> Self {
        let catalog = BackupCatalog::new(&config.backups_dir);
        let guard = OperationGuard::new(config.database.display_name());
        Self {
            config: Arc::new(config),
            loader,
            catalog,
            guard,
        }
    }

    pub fn config(&self) -> &VaultConfig {
        &self.config
    }

    pub fn catalog(&self) -> &BackupCatalog {
        &self.catalog
    }

    pub fn guard(&self) -> &OperationGuard {
        &self.guard
    }

    /// Dump the live database into a new timestamped file.
    pub async fn create_backup(&self) -> BackupResult<DumpReport> {
        self.create_backup_at(Local::now()).await
    }

    /// Dump into the file named for `at`.
    ///
    /// # Errors
    ///
    /// - `Busy` if another backup or restore is running
    /// - `AlreadyExists` if a backup with the same timestamp is present
    /// - any loader error; the partially written file is removed first
    pub async fn create_backup_at(&self, at: DateTime<Local>) -> BackupResult<DumpReport> {
        let _permit = self.guard.try_acquire(Operation::Backup)?;
        self.loader.preflight(Operation::Backup).await?;
        self.catalog.ensure_dir().await?;

        let filename = backup_filename(at);
        let path = self.catalog.dir().join(&filename);
        claim_file(&path, &filename).await?;

        let started = Instant::now();
        let summary = match self.loader.dump(&path).await {
            Ok(summary) => summary,
            Err(e) => {
                error!(
                    database = %self.config.database.display_name(),
                    %filename,
                    error = %e,
                    "Backup failed"
                );
                remove_partial(&path).await;
                return Err(e);
            }
        };

        let size_bytes = fs::metadata(&path)
            .await
            .map_err(|e| BackupError::io(&path, e))?
            .len();
        let report = DumpReport {
            filename,
            size_bytes,
            tables_written: summary.tables_written,
            skipped: summary.skipped,
            elapsed: started.elapsed(),
        };

        info!(
            database = %self.config.database.display_name(),
            filename = %report.filename,
            size_bytes = report.size_bytes,
            tables_written = ?report.tables_written,
            skipped = report.skipped.len(),
            elapsed_ms = report.elapsed.as_millis() as u64,
            "Backup created"
        );
        Ok(report)
    }

    /// All backups, newest first.
    pub async fn list_backups(&self) -> BackupResult<Vec<BackupEntry>> {
        self.catalog.list().await
    }

    /// Contents of one backup for download.
    pub async fn read_backup(&self, filename: &str) -> BackupResult<(BackupEntry, Vec<u8>)> {
        self.catalog.read(filename).await
    }

    pub async fn delete_backup(&self, filename: &str) -> BackupResult<()> {
        self.catalog.delete(filename).await
    }

    /// Replay an uploaded dump against the live database.
    ///
    /// The upload is validated (extension, size) before the guard is taken or
    /// any process runs. The bytes are staged in a temporary file that is
    /// removed when the restore finishes.
    pub async fn restore_upload(&self, upload: RestoreUpload) -> BackupResult<RestoreReport> {
        validate_upload(&upload.file_name, upload.bytes.len() as u64, self.config.max_upload_bytes)?;

        let _permit = self.guard.try_acquire(Operation::Restore)?;
        self.loader.preflight(Operation::Restore).await?;

        let staged = tempfile::Builder::new()
            .prefix("dumpvault-restore-")
            .suffix(".sql")
            .tempfile()
            .map_err(|e| BackupError::io(std::env::temp_dir(), e))?;
        fs::write(staged.path(), &upload.bytes)
            .await
            .map_err(|e| BackupError::io(staged.path(), e))?;

        self.load(staged.path(), &upload.file_name, upload.bytes.len() as u64)
            .await
    }

    /// Replay a dump file already on disk (CLI restore).
    pub async fn restore_file(&self, path: &Path) -> BackupResult<RestoreReport> {
        let display = path.display().to_string();
        let metadata = match fs::metadata(path).await {
            Ok(metadata) if metadata.is_file() => metadata,
            Ok(_) => return Err(BackupError::FileNotFound(display)),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(BackupError::FileNotFound(display));
            }
            Err(e) => return Err(BackupError::io(path, e)),
        };
        validate_upload(&display, metadata.len(), self.config.max_upload_bytes)?;

        let _permit = self.guard.try_acquire(Operation::Restore)?;
        self.loader.preflight(Operation::Restore).await?;
        self.load(path, &display, metadata.len()).await
    }

    /// Restore a backup from the catalog by name.
    pub async fn restore_backup(&self, filename: &str) -> BackupResult<RestoreReport> {
        let path: PathBuf = self.catalog.path_for(filename)?;
        self.catalog.entry(filename).await?;
        self.restore_file(&path).await
    }

    async fn load(&self, path: &Path, source: &str, size_bytes: u64) -> BackupResult<RestoreReport> {
        let started = Instant::now();
        if let Err(e) = self.loader.load(path).await {
            error!(
                database = %self.config.database.display_name(),
                %source,
                error = %e,
                "Restore failed"
            );
            return Err(e);
        }

        let report = RestoreReport {
            source: source.to_string(),
            size_bytes,
            elapsed: started.elapsed(),
        };
        info!(
            database = %self.config.database.display_name(),
            source = %report.source,
            size_bytes,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "Database restored"
        );
        Ok(report)
    }
}

/// Check a restore candidate's name and size.
pub fn validate_upload(file_name: &str, size_bytes: u64, max_bytes: u64) -> BackupResult<()> {
    if !has_dump_extension(file_name) {
        return Err(BackupError::ValidationFailure(format!(
            "backup file must have a .{} extension",
            DUMP_EXTENSION
        )));
    }
    if size_bytes == 0 {
        return Err(BackupError::ValidationFailure(
            "backup file is empty".to_string(),
        ));
    }
    if size_bytes > max_bytes {
        return Err(BackupError::ValidationFailure(format!(
            "backup file is {} bytes, larger than the {} byte limit",
            size_bytes, max_bytes
        )));
    }
    Ok(())
}

async fn claim_file(path: &Path, filename: &str) -> BackupResult<()> {
    fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await
        .map(drop)
        .map_err(|e| match e.kind() {
            ErrorKind::AlreadyExists => BackupError::AlreadyExists(filename.to_string()),
            _ => BackupError::io(path, e),
        })
}

async fn remove_partial(path: &Path) {
    match fs::remove_file(path).await {
        Ok(()) => info!(path = %path.display(), "Removed partial backup file"),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "Could not remove partial backup file"),
    }
}

mod duration_text {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&humantime::format_duration(*value).to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_backup_filename_format() {
        let at = Local.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();
        assert_eq!(backup_filename(at), "backup_2024-03-09_07-05-01.sql");
    }

    #[test]
    fn test_validate_upload() {
        assert!(validate_upload("dump.sql", 10, 100).is_ok());
        assert!(validate_upload("DUMP.SQL", 100, 100).is_ok());

        for (name, size) in [("dump.txt", 10), ("dump", 10), ("dump.sql", 101), ("dump.sql", 0)] {
            assert!(
                matches!(
                    validate_upload(name, size, 100),
                    Err(BackupError::ValidationFailure(_))
                ),
                "{} ({} bytes) should be rejected",
                name,
                size
            );
        }
    }
}
