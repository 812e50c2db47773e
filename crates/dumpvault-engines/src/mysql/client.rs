//! Invocation of the `mysql` command line client for restores.

use std::io::Write;
use std::path::Path;
use std::time::Duration;
use tempfile::NamedTempFile;

use dumpvault_core::{BackupError, BackupResult, DatabaseConfig, ToolCommand};

pub const MYSQL_BINARY: &str = "mysql";

/// Client option file holding the password, so it never appears in the
/// process arguments. Removed when dropped.
#[derive(Debug)]
pub struct CredentialsFile {
    file: NamedTempFile,
}

impl CredentialsFile {
    pub fn write(database: &DatabaseConfig) -> BackupResult<Self> {
        let mut file = tempfile::Builder::new()
            .prefix("dumpvault-mysql-")
            .suffix(".cnf")
            .tempfile()
            .map_err(|e| BackupError::io(std::env::temp_dir(), e))?;

        let mut contents = String::from("[client]\n");
        if let Some(password) = &database.password {
            contents.push_str(&format!("password=\"{}\"\n", escape_option_value(password)));
        }
        file.write_all(contents.as_bytes())
            .and_then(|()| file.flush())
            .map_err(|e| BackupError::io(file.path(), e))?;

        Ok(Self { file })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }
}

fn escape_option_value(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Build the restore command. `--defaults-extra-file` must come first.
pub fn restore_command(
    binary: &Path,
    database: &DatabaseConfig,
    credentials: &CredentialsFile,
    timeout: Duration,
) -> ToolCommand {
    ToolCommand::new(MYSQL_BINARY, binary, timeout)
        .arg(format!("--defaults-extra-file={}", credentials.path().display()))
        .arg(format!("--user={}", database.username))
        .arg(format!("--host={}", database.host))
        .arg(format!("--port={}", database.port))
        .arg("--default-character-set=utf8mb4")
        .arg(&database.database)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_stays_out_of_arguments() {
        let database = DatabaseConfig::mysql(
            "127.0.0.1",
            3306,
            "equipment",
            "root",
            Some("hunter2\"x\\y".to_string()),
        );
        let credentials = CredentialsFile::write(&database).unwrap();
        let command = restore_command(
            Path::new("/usr/bin/mysql"),
            &database,
            &credentials,
            Duration::from_secs(5),
        );

        let rendered = format!("{:?}", command);
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("--user=root"));
        assert!(rendered.contains("--port=3306"));
        assert!(rendered.contains("equipment"));

        let contents = std::fs::read_to_string(credentials.path()).unwrap();
        assert_eq!(contents, "[client]\npassword=\"hunter2\\\"x\\\\y\"\n");
    }

    #[test]
    fn test_credentials_file_removed_on_drop() {
        let database = DatabaseConfig::mysql("localhost", 3306, "app", "root", None);
        let credentials = CredentialsFile::write(&database).unwrap();
        let path = credentials.path().to_path_buf();
        assert!(path.exists());
        drop(credentials);
        assert!(!path.exists());
    }
}
