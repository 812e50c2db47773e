//! # dumpvault-engines
//!
//! [`DumpLoader`] implementations for the supported database engines.
//!
//! ## Feature Flags
//!
//! - `sqlite`: embedded engine through the `sqlite3` command line tool
//! - `mysql`: MySQL/MariaDB through `sqlx` (dump) and the `mysql` client (restore)

use std::sync::Arc;

use dumpvault_core::{BackupError, BackupResult, DriverKind, DumpLoader, VaultConfig};

#[cfg(feature = "mysql")]
pub mod mysql;
#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(feature = "mysql")]
pub use mysql::MySqlLoader;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteLoader;

/// Select the loader for the configured driver.
///
/// # Errors
///
/// Returns `UnsupportedDriver` when the engine was compiled out.
pub fn loader_for(config: &VaultConfig) -> BackupResult<Arc<dyn DumpLoader>> {
    match config.database.driver {
        #[cfg(feature = "mysql")]
        DriverKind::MySql => Ok(Arc::new(MySqlLoader::new(config))),
        #[cfg(feature = "sqlite")]
        DriverKind::Sqlite => Ok(Arc::new(SqliteLoader::new(config))),
        #[allow(unreachable_patterns)]
        other => Err(BackupError::UnsupportedDriver(format!(
            "{} (support not compiled in)",
            other
        ))),
    }
}

#[cfg(all(test, feature = "sqlite", feature = "mysql"))]
mod tests {
    use super::*;
    use dumpvault_core::DatabaseConfig;

    #[test]
    fn test_loader_follows_driver() {
        let sqlite = VaultConfig::new(DatabaseConfig::sqlite("app.db"), "backups");
        assert_eq!(loader_for(&sqlite).unwrap().driver(), DriverKind::Sqlite);

        let mysql = VaultConfig::new(DatabaseConfig::default(), "backups");
        assert_eq!(loader_for(&mysql).unwrap().driver(), DriverKind::MySql);
    }
}
