//! Backup catalog: the dump files in the backups directory.

use chrono::{DateTime, Local};
use serde::Serialize;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::info;

use crate::error::{BackupError, BackupResult};
use crate::identifiers::{has_dump_extension, validate_backup_filename};

const SIZE_UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];

/// Format a byte count with binary units, rounded to two decimals.
///
/// The unit is `floor(log(size) / log(1024))`, capped at GB, so
/// `1536` renders as `1.5 KB` and `0` as `0 B`.
pub fn human_size(bytes: u64) -> String {
    let size = bytes as f64;
    let pow = if bytes == 0 {
        0
    } else {
        ((size.ln() / 1024f64.ln()).floor() as usize).min(SIZE_UNITS.len() - 1)
    };
    let scaled = size / 1024f64.powi(pow as i32);
    let rounded = (scaled * 100.0).round() / 100.0;
    format!("{} {}", rounded, SIZE_UNITS[pow])
}

/// A dump file in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BackupEntry {
    pub filename: String,
    pub size_bytes: u64,
    pub size_human: String,
    /// Filesystem modification time.
    pub created_at: DateTime<Local>,
}

/// Lists, opens and deletes dump files in one directory.
#[derive(Debug, Clone)]
pub struct BackupCatalog {
    dir: PathBuf,
}

impl BackupCatalog {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create the backups directory if it does not exist yet.
    pub async fn ensure_dir(&self) -> BackupResult<()> {
        fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| BackupError::io(&self.dir, e))
    }

    /// All dump files, newest first.
    pub async fn list(&self) -> BackupResult<Vec<BackupEntry>> {
        self.ensure_dir().await?;

        let mut entries = Vec::new();
        let mut dir = fs::read_dir(&self.dir)
            .await
            .map_err(|e| BackupError::io(&self.dir, e))?;

        while let Some(item) = dir
            .next_entry()
            .await
            .map_err(|e| BackupError::io(&self.dir, e))?
        {
            let Some(filename) = item.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if !has_dump_extension(&filename) {
                continue;
            }
            let metadata = match item.metadata().await {
                Ok(metadata) if metadata.is_file() => metadata,
                // removed between read_dir and stat, or not a regular file
                _ => continue,
            };
            entries.push(entry_from_metadata(filename, &metadata)?);
        }

        entries.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.filename.cmp(&a.filename))
        });
        Ok(entries)
    }

    /// Resolve a caller-supplied filename to a path inside the directory.
    pub fn path_for(&self, filename: &str) -> BackupResult<PathBuf> {
        validate_backup_filename(filename)?;
        Ok(self.dir.join(filename))
    }

    /// Metadata for one dump file.
    pub async fn entry(&self, filename: &str) -> BackupResult<BackupEntry> {
        let path = self.path_for(filename)?;
        let metadata = match fs::metadata(&path).await {
            Ok(metadata) if metadata.is_file() => metadata,
            Ok(_) => return Err(BackupError::FileNotFound(filename.to_string())),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(BackupError::FileNotFound(filename.to_string()));
            }
            Err(e) => return Err(BackupError::io(path, e)),
        };
        entry_from_metadata(filename.to_string(), &metadata)
    }

    /// Read a dump file for download.
    pub async fn read(&self, filename: &str) -> BackupResult<(BackupEntry, Vec<u8>)> {
        let entry = self.entry(filename).await?;
        let path = self.dir.join(&entry.filename);
        let bytes = fs::read(&path).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => BackupError::FileNotFound(filename.to_string()),
            _ => BackupError::io(&path, e),
        })?;
        Ok((entry, bytes))
    }

    /// Delete a dump file. Absent files are reported, never created or touched.
    pub async fn delete(&self, filename: &str) -> BackupResult<()> {
        let entry = self.entry(filename).await?;
        let path = self.dir.join(&entry.filename);

        fs::remove_file(&path).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => BackupError::FileNotFound(filename.to_string()),
            _ => BackupError::io(&path, e),
        })?;

        info!(filename = %entry.filename, size_bytes = entry.size_bytes, "Backup deleted");
        Ok(())
    }
}

fn entry_from_metadata(filename: String, metadata: &std::fs::Metadata) -> BackupResult<BackupEntry> {
    let modified = metadata
        .modified()
        .map_err(|e| BackupError::io(&filename, e))?;
    Ok(BackupEntry {
        size_bytes: metadata.len(),
        size_human: human_size(metadata.len()),
        created_at: DateTime::<Local>::from(modified),
        filename,
    })
}
