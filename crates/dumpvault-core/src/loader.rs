//! The seam between the backup service and a database engine.

use async_trait::async_trait;
use std::fmt;
use std::path::Path;

use crate::config::DriverKind;
use crate::dump::SkippedTable;
use crate::error::BackupResult;

/// Kind of operation a loader or guard is asked to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Backup,
    Restore,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Backup => "backup",
            Operation::Restore => "restore",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a loader wrote into a dump file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DumpSummary {
    /// Tables whose structure (and rows, if any) made it into the file.
    /// `None` when the engine's own tool wrote the file and did not report it.
    pub tables_written: Option<usize>,
    pub skipped: Vec<SkippedTable>,
}

/// Produces and replays dump files for one database engine.
///
/// Implementations receive the complete configuration when constructed and
/// never consult process-wide state.
#[async_trait]
pub trait DumpLoader: Send + Sync {
    fn driver(&self) -> DriverKind;

    /// Check that everything `operation` needs (client executables, database
    /// file) is available. Runs before any file is created or process spawned.
    async fn preflight(&self, operation: Operation) -> BackupResult<()>;

    /// Write a dump of the live database into `target`, which already exists
    /// and is empty.
    async fn dump(&self, target: &Path) -> BackupResult<DumpSummary>;

    /// Replay the dump at `source` against the live database.
    async fn load(&self, source: &Path) -> BackupResult<()>;
}
