//! Response type definitions for HTTP endpoints
//!
//! Every body carries a `success` flag so clients can branch on it without
//! inspecting the status code.

use dumpvault_core::{BackupEntry, SkippedTable};
use serde::Serialize;
use utoipa::ToSchema;

const CREATED_AT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A dump file in the backups directory
#[derive(Debug, Serialize, ToSchema)]
pub struct BackupInfo {
    #[schema(example = "backup_2024-05-01_10-00-00.sql")]
    pub filename: String,
    #[schema(example = 1536)]
    pub size_bytes: u64,
    #[schema(example = "1.5 KB")]
    pub size_human: String,
    /// Local modification time of the file
    #[schema(example = "2024-05-01 10:00:00")]
    pub created_at: String,
}

impl From<BackupEntry> for BackupInfo {
    fn from(entry: BackupEntry) -> Self {
        Self {
            created_at: entry.created_at.format(CREATED_AT_FORMAT).to_string(),
            filename: entry.filename,
            size_bytes: entry.size_bytes,
            size_human: entry.size_human,
        }
    }
}

/// Response for `GET /backups`
#[derive(Debug, Serialize, ToSchema)]
pub struct ListBackupsResponse {
    pub success: bool,
    /// Newest first
    pub backups: Vec<BackupInfo>,
    #[schema(example = 3)]
    pub total: usize,
}

/// A table left out of a dump
#[derive(Debug, Serialize, ToSchema)]
pub struct SkippedTableInfo {
    #[schema(example = "tbl-bad name")]
    pub name: String,
    pub reason: String,
}

impl From<SkippedTable> for SkippedTableInfo {
    fn from(table: SkippedTable) -> Self {
        Self {
            name: table.name,
            reason: table.reason,
        }
    }
}

/// Response for `POST /backups`
#[derive(Debug, Serialize, ToSchema)]
pub struct CreateBackupResponse {
    pub success: bool,
    #[schema(example = "Backup created successfully")]
    pub message: String,
    #[schema(example = "backup_2024-05-01_10-00-00.sql")]
    pub filename: String,
    pub size_bytes: u64,
    pub size_human: String,
    pub skipped_tables: Vec<SkippedTableInfo>,
}

/// Generic success response
#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub success: bool,
    #[schema(example = "Backup deleted successfully")]
    pub message: String,
}

impl MessageResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

/// Error response
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub success: bool,
    #[schema(example = "Backup file 'backup_2024-05-01_10-00-00.sql' not found")]
    pub message: String,
    /// Machine-readable error code
    #[schema(example = "file_not_found")]
    pub error: String,
}

/// Multipart form for `POST /backups/restore`
#[derive(Debug, ToSchema)]
#[allow(dead_code)]
pub struct RestoreForm {
    /// `.sql` dump file
    #[schema(value_type = String, format = Binary)]
    pub backup_file: Vec<u8>,
}

/// Response for `GET /health`
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    #[schema(example = "healthy")]
    pub status: String,
    #[schema(example = "dumpvault")]
    pub service: String,
    pub version: String,
    pub timestamp: String,
    pub uptime_seconds: u64,
    #[schema(example = "mysql")]
    pub driver: String,
    /// A backup or restore is currently running
    pub operation_in_progress: bool,
}
