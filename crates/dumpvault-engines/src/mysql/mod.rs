//! MySQL-family engine (MySQL, MariaDB).
//!
//! Dumps are generated in-process over one connection: table list, each
//! table's own `SHOW CREATE TABLE` output and one multi-row insert per table.
//! Restores pipe the dump file into the `mysql` client.

mod client;
mod source;

pub use client::{CredentialsFile, MYSQL_BINARY, restore_command};
pub use source::{MySqlTableSource, connect_options};

use async_trait::async_trait;
use chrono::Local;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use dumpvault_core::{
    BackupError, BackupResult, DatabaseConfig, DriverKind, DumpDocument, DumpLoader, DumpSummary,
    Operation, VaultConfig, build_document, resolve_binary,
};

/// Names the in-process dump in timeout errors.
pub const DUMP_LABEL: &str = "mysql dump";

/// Dump loader for MySQL-compatible servers.
#[derive(Debug, Clone)]
pub struct MySqlLoader {
    database: DatabaseConfig,
    client: Option<PathBuf>,
    timeout: Duration,
    consistent_snapshot: bool,
}

impl MySqlLoader {
    pub fn new(config: &VaultConfig) -> Self {
        Self {
            database: config.database.clone(),
            client: config.tools.mysql.clone(),
            timeout: config.process_timeout,
            consistent_snapshot: config.consistent_snapshot,
        }
    }

    fn client(&self) -> BackupResult<PathBuf> {
        resolve_binary(MYSQL_BINARY, self.client.as_deref())
    }

    async fn generate(&self) -> BackupResult<DumpDocument> {
        let mut source = MySqlTableSource::connect(&self.database, self.consistent_snapshot).await?;
        let document = build_document(&mut source, &self.database.database, Local::now()).await;
        if let Err(e) = source.close().await {
            warn!(error = %e, "Failed to close dump connection cleanly");
        }
        document
    }
}

#[async_trait]
impl DumpLoader for MySqlLoader {
    fn driver(&self) -> DriverKind {
        DriverKind::MySql
    }

    async fn preflight(&self, operation: Operation) -> BackupResult<()> {
        match operation {
            // dumps need only the connection, which `dump` opens itself
            Operation::Backup => Ok(()),
            Operation::Restore => self.client().map(drop),
        }
    }

    async fn dump(&self, target: &Path) -> BackupResult<DumpSummary> {
        // same bound as the client processes; dropping the future drops the connection
        let document = match tokio::time::timeout(self.timeout, self.generate()).await {
            Ok(document) => document?,
            Err(_) => {
                warn!(
                    database = %self.database.display_name(),
                    limit = ?self.timeout,
                    "MySQL dump timed out"
                );
                return Err(BackupError::Timeout {
                    program: DUMP_LABEL.to_string(),
                    limit: self.timeout,
                });
            }
        };

        tokio::fs::write(target, document.render())
            .await
            .map_err(|e| BackupError::io(target, e))?;

        let summary = DumpSummary {
            tables_written: Some(document.tables().count()),
            skipped: document.skipped().cloned().collect(),
        };
        info!(
            database = %self.database.display_name(),
            tables_written = document.tables().count(),
            skipped = summary.skipped.len(),
            consistent_snapshot = self.consistent_snapshot,
            "MySQL dump generated"
        );
        Ok(summary)
    }

    async fn load(&self, source: &Path) -> BackupResult<()> {
        let client = self.client()?;
        let credentials = CredentialsFile::write(&self.database)?;
        let output = restore_command(&client, &self.database, &credentials, self.timeout)
            .stdin_file(source)
            .run()
            .await?;

        info!(
            database = %self.database.display_name(),
            elapsed_ms = output.elapsed.as_millis() as u64,
            "mysql restore finished"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dumpvault_core::ToolPaths;

    #[tokio::test]
    async fn test_restore_preflight_requires_client() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = VaultConfig::new(DatabaseConfig::default(), dir.path());
        config.tools = ToolPaths {
            sqlite: None,
            mysql: Some(dir.path().join("mysql")),
        };
        let loader = MySqlLoader::new(&config);

        assert!(loader.preflight(Operation::Backup).await.is_ok());
        let err = loader.preflight(Operation::Restore).await.unwrap_err();
        assert!(matches!(err, BackupError::BinaryNotFound { ref name, .. } if name == "mysql"));
    }

    #[tokio::test]
    async fn test_dump_against_silent_server_times_out() {
        // accepted by the kernel backlog, but no handshake is ever sent
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let dir = tempfile::tempdir().unwrap();
        let mut config = VaultConfig::new(
            DatabaseConfig::mysql("127.0.0.1", port, "equipment", "backup", None),
            dir.path(),
        );
        config.process_timeout = Duration::from_millis(300);
        let loader = MySqlLoader::new(&config);

        let target = dir.path().join("dump.sql");
        let err = loader.dump(&target).await.unwrap_err();
        assert!(
            matches!(err, BackupError::Timeout { ref program, .. } if program == DUMP_LABEL),
            "{err:?}"
        );
        assert!(!target.exists());
        drop(listener);
    }
}
