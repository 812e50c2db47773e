//! Validation for names that end up in generated SQL or on the filesystem.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::BackupError;

/// File extension for dump files.
pub const DUMP_EXTENSION: &str = "sql";

static TABLE_IDENTIFIER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z_][a-zA-Z0-9_]*$").expect("table identifier pattern is valid")
});

/// Whether `name` may be interpolated into a generated statement.
pub fn is_valid_table_name(name: &str) -> bool {
    TABLE_IDENTIFIER.is_match(name)
}

/// Validate a table name, describing the problem on failure.
pub fn validate_table_name(name: &str) -> Result<(), String> {
    if is_valid_table_name(name) {
        Ok(())
    } else {
        Err(format!(
            "invalid table name {:?}: must match ^[a-zA-Z_][a-zA-Z0-9_]*$",
            name
        ))
    }
}

/// Whether `name` carries the dump extension.
pub fn has_dump_extension(name: &str) -> bool {
    std::path::Path::new(name)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case(DUMP_EXTENSION))
}

/// Validate a backup filename supplied by a caller (download, delete).
///
/// The name must be a bare file name inside the backups directory with the
/// dump extension.
pub fn validate_backup_filename(name: &str) -> Result<(), BackupError> {
    if name.is_empty() || name.len() > 255 {
        return Err(BackupError::ValidationFailure(
            "backup filename must be between 1 and 255 characters".to_string(),
        ));
    }
    if name.contains(['/', '\\', '"'])
        || name.chars().any(char::is_control)
        || name.starts_with('.')
        || name.contains("..")
    {
        return Err(BackupError::ValidationFailure(format!(
            "backup filename {:?} must be a plain file name",
            name
        )));
    }
    if !has_dump_extension(name) {
        return Err(BackupError::ValidationFailure(format!(
            "backup filename {:?} must end with .{}",
            name, DUMP_EXTENSION
        )));
    }
    Ok(())
}
