//! # Fake Dump Loader
//!
//! A [`DumpLoader`] that never touches a database or spawns a process. It
//! writes a fixed body on dump, records what it was asked to load, and can be
//! told to fail or stall so service and HTTP behavior can be tested in
//! isolation.

use async_trait::async_trait;
use dumpvault_core::{
    BackupError, BackupResult, DriverKind, DumpLoader, DumpSummary, Operation, SkippedTable,
};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Default body written by [`FakeDumpLoader::dump`].
pub const FAKE_DUMP_BODY: &str = "SET FOREIGN_KEY_CHECKS=0;\n\
DROP TABLE IF EXISTS `equipment`;\n\
CREATE TABLE `equipment` (`id` int NOT NULL);\n\
INSERT INTO `equipment` VALUES ('1');\n\
SET FOREIGN_KEY_CHECKS=1;\n";

/// Failure the fake should report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FakeFailure {
    Connection,
    MissingBinary,
    Process { exit_code: i32, stderr: String },
    Timeout,
}

impl FakeFailure {
    fn to_error(&self, driver: DriverKind) -> BackupError {
        let program = match driver {
            DriverKind::MySql => "mysql",
            DriverKind::Sqlite => "sqlite3",
        };
        match self {
            FakeFailure::Connection => {
                BackupError::ConnectionFailure("connection refused".to_string())
            }
            FakeFailure::MissingBinary => BackupError::BinaryNotFound {
                name: program.to_string(),
                reason: "cannot find binary path".to_string(),
            },
            FakeFailure::Process { exit_code, stderr } => BackupError::ExternalProcessFailure {
                program: program.to_string(),
                exit_code: Some(*exit_code),
                stderr: stderr.clone(),
            },
            FakeFailure::Timeout => BackupError::Timeout {
                program: program.to_string(),
                limit: Duration::from_secs(1),
            },
        }
    }
}

/// A recorded call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FakeCall {
    Preflight(Operation),
    Dump(PathBuf),
    /// Path and contents of the file handed to `load`.
    Load(PathBuf, String),
}

/// Scriptable [`DumpLoader`] with call history.
#[derive(Debug, Clone)]
pub struct FakeDumpLoader {
    driver: DriverKind,
    body: String,
    skipped: Vec<SkippedTable>,
    preflight_failure: Option<FakeFailure>,
    dump_failure: Option<FakeFailure>,
    load_failure: Option<FakeFailure>,
    partial_body: Option<String>,
    delay: Option<Duration>,
    calls: Arc<Mutex<Vec<FakeCall>>>,
}

impl Default for FakeDumpLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeDumpLoader {
    pub fn new() -> Self {
        Self {
            driver: DriverKind::Sqlite,
            body: FAKE_DUMP_BODY.to_string(),
            skipped: Vec::new(),
            preflight_failure: None,
            dump_failure: None,
            load_failure: None,
            partial_body: None,
            delay: None,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_driver(mut self, driver: DriverKind) -> Self {
        self.driver = driver;
        self
    }

    /// Body written on a successful dump.
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// Report `table` as skipped in the dump summary.
    pub fn with_skipped(mut self, table: impl Into<String>, reason: impl Into<String>) -> Self {
        self.skipped.push(SkippedTable {
            name: table.into(),
            reason: reason.into(),
        });
        self
    }

    pub fn failing_preflight(mut self, failure: FakeFailure) -> Self {
        self.preflight_failure = Some(failure);
        self
    }

    pub fn failing_dump(mut self, failure: FakeFailure) -> Self {
        self.dump_failure = Some(failure);
        self
    }

    /// Write `partial` into the target before failing the dump.
    pub fn failing_dump_after_writing(
        mut self,
        partial: impl Into<String>,
        failure: FakeFailure,
    ) -> Self {
        self.partial_body = Some(partial.into());
        self.dump_failure = Some(failure);
        self
    }

    pub fn failing_load(mut self, failure: FakeFailure) -> Self {
        self.load_failure = Some(failure);
        self
    }

    /// Stall dump and load for `delay`, to hold the operation guard.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<FakeCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn dump_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, FakeCall::Dump(_)))
            .count()
    }

    pub fn load_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, FakeCall::Load(..)))
            .count()
    }

    /// Contents of every file handed to `load`, in call order.
    pub fn loaded_contents(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                FakeCall::Load(_, contents) => Some(contents),
                _ => None,
            })
            .collect()
    }

    /// Whether any dump or load ran (preflight calls do not count).
    pub fn did_work(&self) -> bool {
        self.dump_count() + self.load_count() > 0
    }

    pub fn reset(&self) {
        self.calls.lock().unwrap().clear();
    }

    fn record(&self, call: FakeCall) {
        self.calls.lock().unwrap().push(call);
    }

    async fn stall(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl DumpLoader for FakeDumpLoader {
    fn driver(&self) -> DriverKind {
        self.driver
    }

    async fn preflight(&self, operation: Operation) -> BackupResult<()> {
        self.record(FakeCall::Preflight(operation));
        match &self.preflight_failure {
            Some(failure) => Err(failure.to_error(self.driver)),
            None => Ok(()),
        }
    }

    async fn dump(&self, target: &Path) -> BackupResult<DumpSummary> {
        self.record(FakeCall::Dump(target.to_path_buf()));
        self.stall().await;

        if let Some(failure) = &self.dump_failure {
            if let Some(partial) = &self.partial_body {
                tokio::fs::write(target, partial)
                    .await
                    .map_err(|e| BackupError::io(target, e))?;
            }
            return Err(failure.to_error(self.driver));
        }

        tokio::fs::write(target, &self.body)
            .await
            .map_err(|e| BackupError::io(target, e))?;
        Ok(DumpSummary {
            tables_written: Some(self.body.matches("CREATE TABLE").count()),
            skipped: self.skipped.clone(),
        })
    }

    async fn load(&self, source: &Path) -> BackupResult<()> {
        let contents = tokio::fs::read_to_string(source)
            .await
            .map_err(|e| BackupError::io(source, e))?;
        self.record(FakeCall::Load(source.to_path_buf(), contents));
        self.stall().await;

        match &self.load_failure {
            Some(failure) => Err(failure.to_error(self.driver)),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_records_dump_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("dump.sql");
        let loader = FakeDumpLoader::new().with_skipped("tbl-bad name", "invalid table name");

        let summary = loader.dump(&target).await.unwrap();
        assert_eq!(summary.tables_written, Some(1));
        assert_eq!(summary.skipped.len(), 1);
        assert_eq!(std::fs::read_to_string(&target).unwrap(), FAKE_DUMP_BODY);

        loader.load(&target).await.unwrap();
        assert_eq!(loader.dump_count(), 1);
        assert_eq!(loader.loaded_contents(), vec![FAKE_DUMP_BODY.to_string()]);

        loader.reset();
        assert!(!loader.did_work());
    }

    #[tokio::test]
    async fn test_scripted_failures() {
        let dir = tempfile::tempdir().unwrap();
        let loader = FakeDumpLoader::new()
            .with_driver(DriverKind::MySql)
            .failing_preflight(FakeFailure::MissingBinary);

        let err = loader.preflight(Operation::Restore).await.unwrap_err();
        assert!(matches!(err, BackupError::BinaryNotFound { ref name, .. } if name == "mysql"));

        let loader = FakeDumpLoader::new().failing_dump_after_writing(
            "-- partial",
            FakeFailure::Process {
                exit_code: 1,
                stderr: "Error: database is locked".to_string(),
            },
        );
        let target = dir.path().join("partial.sql");
        assert!(loader.dump(&target).await.is_err());
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "-- partial");
    }
}
