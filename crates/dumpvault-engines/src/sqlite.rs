//! Embedded engine: dumps and restores go through the `sqlite3` shell.

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use dumpvault_core::{
    BackupError, BackupResult, DriverKind, DumpLoader, DumpSummary, Operation, ToolCommand,
    VaultConfig, resolve_binary,
};

pub const SQLITE_BINARY: &str = "sqlite3";

/// Re-enables the foreign key pragma that `.dump` switches off at the top.
pub const FOREIGN_KEYS_ON: &str = "PRAGMA foreign_keys=ON;\n";

/// Dump loader backed by the `sqlite3` command line tool.
#[derive(Debug, Clone)]
pub struct SqliteLoader {
    database: PathBuf,
    binary: Option<PathBuf>,
    timeout: Duration,
}

impl SqliteLoader {
    pub fn new(config: &VaultConfig) -> Self {
        Self {
            database: config.database.sqlite_path().to_path_buf(),
            binary: config.tools.sqlite.clone(),
            timeout: config.process_timeout,
        }
    }

    pub fn database(&self) -> &Path {
        &self.database
    }

    fn binary(&self) -> BackupResult<PathBuf> {
        resolve_binary(SQLITE_BINARY, self.binary.as_deref())
    }
}

#[async_trait]
impl DumpLoader for SqliteLoader {
    fn driver(&self) -> DriverKind {
        DriverKind::Sqlite
    }

    async fn preflight(&self, operation: Operation) -> BackupResult<()> {
        self.binary()?;
        // sqlite3 silently creates a missing database, which would dump as empty
        if operation == Operation::Backup && !self.database.is_file() {
            return Err(BackupError::ConnectionFailure(format!(
                "database file {} does not exist",
                self.database.display()
            )));
        }
        Ok(())
    }

    async fn dump(&self, target: &Path) -> BackupResult<DumpSummary> {
        let output = ToolCommand::new(SQLITE_BINARY, self.binary()?, self.timeout)
            .arg(&self.database)
            .arg(".dump")
            .stdout_file(target)
            .run()
            .await?;

        let mut file = tokio::fs::OpenOptions::new()
            .append(true)
            .open(target)
            .await
            .map_err(|e| BackupError::io(target, e))?;
        file.write_all(FOREIGN_KEYS_ON.as_bytes())
            .await
            .map_err(|e| BackupError::io(target, e))?;
        file.flush().await.map_err(|e| BackupError::io(target, e))?;

        info!(
            database = %self.database.display(),
            elapsed_ms = output.elapsed.as_millis() as u64,
            "sqlite3 dump finished"
        );
        Ok(DumpSummary::default())
    }

    async fn load(&self, source: &Path) -> BackupResult<()> {
        // `.dump` output has no DROP statements, so it is replayed into an
        // empty file beside the live database and swapped in by rename
        let dir = match self.database.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let staged = tempfile::Builder::new()
            .prefix(".dumpvault-restore-")
            .suffix(".db")
            .tempfile_in(&dir)
            .map_err(|e| BackupError::io(&dir, e))?;

        // -bail stops at the first failing statement; the staged file is
        // discarded and the live database stays untouched
        let output = ToolCommand::new(SQLITE_BINARY, self.binary()?, self.timeout)
            .arg("-bail")
            .arg(staged.path())
            .stdin_file(source)
            .run()
            .await?;

        // a journal left by the old file would be replayed onto the new one
        for suffix in SIDECAR_SUFFIXES {
            let sidecar = sidecar_path(&self.database, suffix);
            match tokio::fs::remove_file(&sidecar).await {
                Ok(()) => debug!(path = %sidecar.display(), "Removed stale sqlite sidecar"),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(BackupError::io(&sidecar, e)),
            }
        }
        if let Ok(live) = tokio::fs::metadata(&self.database).await {
            staged
                .as_file()
                .set_permissions(live.permissions())
                .map_err(|e| BackupError::io(staged.path(), e))?;
        }
        staged
            .persist(&self.database)
            .map_err(|e| BackupError::io(&self.database, e.error))?;

        info!(
            database = %self.database.display(),
            elapsed_ms = output.elapsed.as_millis() as u64,
            "sqlite3 restore finished"
        );
        Ok(())
    }
}

const SIDECAR_SUFFIXES: [&str; 3] = ["-wal", "-shm", "-journal"];

fn sidecar_path(database: &Path, suffix: &str) -> PathBuf {
    let mut name = database.as_os_str().to_os_string();
    name.push(suffix);
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dumpvault_core::{DatabaseConfig, ToolPaths};

    fn config(dir: &Path, sqlite_bin: Option<PathBuf>) -> VaultConfig {
        let mut config = VaultConfig::new(
            DatabaseConfig::sqlite(dir.join("app.db")),
            dir.join("backups"),
        );
        config.tools = ToolPaths {
            sqlite: sqlite_bin,
            mysql: None,
        };
        config
    }

    #[tokio::test]
    async fn test_preflight_reports_missing_binary() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("app.db"), b"").unwrap();
        let loader = SqliteLoader::new(&config(
            dir.path(),
            Some(dir.path().join("bin").join("sqlite3")),
        ));

        for operation in [Operation::Backup, Operation::Restore] {
            let err = loader.preflight(operation).await.unwrap_err();
            assert!(matches!(err, BackupError::BinaryNotFound { ref name, .. } if name == "sqlite3"));
        }
    }

    #[tokio::test]
    async fn test_dump_runs_no_process_without_binary() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("out.sql");
        let loader = SqliteLoader::new(&config(dir.path(), Some(dir.path().join("missing"))));

        assert!(matches!(
            loader.dump(&target).await,
            Err(BackupError::BinaryNotFound { .. })
        ));
        assert!(!target.exists());
    }

    #[test]
    fn test_sidecar_paths() {
        let db = Path::new("/srv/app/app.db");
        assert_eq!(sidecar_path(db, "-wal"), PathBuf::from("/srv/app/app.db-wal"));
        assert_eq!(sidecar_path(db, "-journal"), PathBuf::from("/srv/app/app.db-journal"));
    }
}
