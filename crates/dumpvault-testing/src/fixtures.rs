//! On-disk fixtures: temporary vault directories and SQLite databases.

use dumpvault_core::{DatabaseConfig, VaultConfig};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tempfile::TempDir;

/// A temporary directory laid out like a deployment: `app.db` plus a
/// `backups/` directory. Removed on drop.
pub struct TestVault {
    dir: TempDir,
    pub config: VaultConfig,
}

impl Default for TestVault {
    fn default() -> Self {
        Self::new()
    }
}

impl TestVault {
    /// SQLite configuration pointing into a fresh temporary directory.
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let config = VaultConfig::new(
            DatabaseConfig::sqlite(dir.path().join("app.db")),
            dir.path().join("backups"),
        );
        Self { dir, config }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn database_path(&self) -> PathBuf {
        self.config.database.sqlite_path().to_path_buf()
    }

    pub fn backups_dir(&self) -> &Path {
        &self.config.backups_dir
    }

    /// Write a file into the backups directory.
    pub fn write_backup(&self, name: &str, contents: &[u8]) -> PathBuf {
        std::fs::create_dir_all(self.backups_dir()).unwrap();
        let path = self.backups_dir().join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    /// Write a backup file with an explicit modification time.
    pub fn write_backup_at(&self, name: &str, contents: &[u8], modified: SystemTime) -> PathBuf {
        let path = self.write_backup(name, contents);
        let file = std::fs::File::options().write(true).open(&path).unwrap();
        file.set_modified(modified).unwrap();
        path
    }

    /// Names of all files in the backups directory, sorted.
    pub fn backup_names(&self) -> Vec<String> {
        let Ok(entries) = std::fs::read_dir(self.backups_dir()) else {
            return Vec::new();
        };
        let mut names: Vec<String> = entries
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }
}

/// Build a small equipment database: two related tables with rows (one
/// holding a NULL and quote characters) and one empty table.
pub fn create_equipment_db(path: &Path) {
    let conn = rusqlite::Connection::open(path).unwrap();
    conn.execute_batch(
        "PRAGMA foreign_keys=ON;
         CREATE TABLE equipment (
             id INTEGER PRIMARY KEY,
             name TEXT NOT NULL,
             notes TEXT
         );
         CREATE TABLE history (
             id INTEGER PRIMARY KEY,
             equipment_id INTEGER NOT NULL REFERENCES equipment(id),
             action TEXT NOT NULL
         );
         CREATE TABLE empty_table (id INTEGER);
         INSERT INTO equipment (id, name, notes) VALUES (1, 'Drill ''XL''', NULL);
         INSERT INTO equipment (id, name, notes) VALUES (2, 'Ladder', 'rack \"B\"');
         INSERT INTO history (equipment_id, action) VALUES (1, 'checked out');
         INSERT INTO history (equipment_id, action) VALUES (1, 'returned');
         INSERT INTO history (equipment_id, action) VALUES (2, 'inspected');",
    )
    .unwrap();
}

/// `SELECT COUNT(*)` of `table` in the SQLite database at `path`.
pub fn row_count(path: &Path, table: &str) -> i64 {
    let conn = rusqlite::Connection::open(path).unwrap();
    conn.query_row(&format!("SELECT COUNT(*) FROM \"{}\"", table), [], |row| row.get(0))
        .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equipment_db() {
        let vault = TestVault::new();
        create_equipment_db(&vault.database_path());
        assert_eq!(row_count(&vault.database_path(), "equipment"), 2);
        assert_eq!(row_count(&vault.database_path(), "history"), 3);
        assert_eq!(row_count(&vault.database_path(), "empty_table"), 0);
    }

    #[test]
    fn test_backup_files() {
        let vault = TestVault::new();
        assert!(vault.backup_names().is_empty());
        vault.write_backup("backup_b.sql", b"b");
        vault.write_backup("backup_a.sql", b"a");
        assert_eq!(vault.backup_names(), ["backup_a.sql", "backup_b.sql"]);
    }
}
