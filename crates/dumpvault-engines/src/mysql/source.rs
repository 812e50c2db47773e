//! Table extraction over a single MySQL connection.

use async_trait::async_trait;
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection, MySqlRow};
use sqlx::{Connection, Executor, Row, ValueRef};
use tracing::debug;

use dumpvault_core::{BackupError, BackupResult, DatabaseConfig, SqlValue, TableSource};

/// Base tables only; views have no rows of their own to dump.
const LIST_TABLES: &str = "SHOW FULL TABLES WHERE Table_type = 'BASE TABLE'";

const START_SNAPSHOT: &str = "START TRANSACTION WITH CONSISTENT SNAPSHOT";

pub fn connect_options(database: &DatabaseConfig) -> MySqlConnectOptions {
    let options = MySqlConnectOptions::new()
        .host(&database.host)
        .port(database.port)
        .username(&database.username)
        .database(&database.database)
        .charset("utf8mb4");
    match &database.password {
        Some(password) => options.password(password),
        None => options,
    }
}

/// Reads tables for a dump. Queries go over the text protocol, so every
/// non-null value arrives as the server's textual rendering.
pub struct MySqlTableSource {
    conn: MySqlConnection,
    in_snapshot: bool,
}

impl MySqlTableSource {
    /// Open the dump connection, optionally inside a consistent snapshot.
    pub async fn connect(database: &DatabaseConfig, consistent_snapshot: bool) -> BackupResult<Self> {
        let mut conn = MySqlConnection::connect_with(&connect_options(database))
            .await
            .map_err(|e| BackupError::ConnectionFailure(e.to_string()))?;

        if consistent_snapshot {
            conn.execute(START_SNAPSHOT).await.map_err(query_error)?;
            debug!(database = %database.display_name(), "Started consistent snapshot");
        }

        Ok(Self {
            conn,
            in_snapshot: consistent_snapshot,
        })
    }

    /// End the snapshot (if any) and close the connection.
    pub async fn close(mut self) -> BackupResult<()> {
        if self.in_snapshot {
            self.conn.execute("COMMIT").await.map_err(query_error)?;
        }
        self.conn
            .close()
            .await
            .map_err(|e| BackupError::ConnectionFailure(e.to_string()))
    }

    async fn fetch(&mut self, sql: &str) -> BackupResult<Vec<MySqlRow>> {
        self.conn.fetch_all(sql).await.map_err(query_error)
    }
}

#[async_trait]
impl TableSource for MySqlTableSource {
    async fn table_names(&mut self) -> BackupResult<Vec<String>> {
        let rows = self.fetch(LIST_TABLES).await?;
        rows.iter().map(|row| text_column(row, 0)).collect()
    }

    async fn create_statement(&mut self, table: &str) -> BackupResult<String> {
        let rows = self
            .fetch(&format!("SHOW CREATE TABLE `{}`", table))
            .await?;
        let row = rows
            .first()
            .ok_or_else(|| BackupError::Query(format!("SHOW CREATE TABLE `{}` returned no rows", table)))?;
        text_column(row, 1)
    }

    async fn rows(&mut self, table: &str) -> BackupResult<Vec<Vec<SqlValue>>> {
        let rows = self.fetch(&format!("SELECT * FROM `{}`", table)).await?;
        rows.iter().map(row_values).collect()
    }
}

fn row_values(row: &MySqlRow) -> BackupResult<Vec<SqlValue>> {
    (0..row.len()).map(|index| cell(row, index)).collect()
}

fn cell(row: &MySqlRow, index: usize) -> BackupResult<SqlValue> {
    if row.try_get_raw(index).map_err(query_error)?.is_null() {
        return Ok(SqlValue::Null);
    }
    let bytes: Vec<u8> = row.try_get_unchecked(index).map_err(query_error)?;
    Ok(SqlValue::from_bytes(bytes))
}

fn text_column(row: &MySqlRow, index: usize) -> BackupResult<String> {
    let bytes: Vec<u8> = row.try_get_unchecked(index).map_err(query_error)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn query_error(e: sqlx::Error) -> BackupError {
    BackupError::Query(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_options_carry_credentials() {
        let database = DatabaseConfig::mysql(
            "db.internal",
            3307,
            "equipment",
            "backup",
            Some("s3cret".to_string()),
        );
        let options = connect_options(&database);
        assert_eq!(options.get_host(), "db.internal");
        assert_eq!(options.get_port(), 3307);
        assert_eq!(options.get_username(), "backup");
        assert_eq!(options.get_database(), Some("equipment"));
    }
}
