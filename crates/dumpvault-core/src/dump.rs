//! SQL dump document model and generation.
//!
//! A [`DumpDocument`] is the in-memory form of a programmatic dump: one
//! section per table, each holding the engine's own create statement and the
//! table's rows. Rendering wraps the sections in a foreign-key-checks
//! disable/enable pair so the replay order of tables does not matter.
//!
//! Tables are read through a [`TableSource`], which keeps the generation logic
//! independent of the database driver.

use async_trait::async_trait;
use chrono::{DateTime, Local};
use std::fmt::Write as _;
use tracing::{debug, warn};

use crate::error::BackupResult;
use crate::identifiers::validate_table_name;

pub const DISABLE_FOREIGN_KEY_CHECKS: &str = "SET FOREIGN_KEY_CHECKS=0;";
pub const ENABLE_FOREIGN_KEY_CHECKS: &str = "SET FOREIGN_KEY_CHECKS=1;";

/// A single cell read from the database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlValue {
    Null,
    Text(String),
    /// Bytes that are not valid UTF-8 (binary columns).
    Bytes(Vec<u8>),
}

impl SqlValue {
    /// Classify raw column bytes as text or binary.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        match String::from_utf8(bytes) {
            Ok(text) => SqlValue::Text(text),
            Err(e) => SqlValue::Bytes(e.into_bytes()),
        }
    }

    /// Render as a SQL literal.
    pub fn to_sql(&self) -> String {
        match self {
            SqlValue::Null => "NULL".to_string(),
            SqlValue::Text(text) => quote_literal(text),
            SqlValue::Bytes(bytes) => hex_literal(bytes),
        }
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::Text(value.to_string())
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(SqlValue::Null, Into::into)
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        SqlValue::Text(value)
    }
}

/// Quote a string the way MySQL's `QUOTE()`/`mysql_real_escape_string` does.
pub fn quote_literal(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('\'');
    for c in value.chars() {
        match c {
            '\0' => quoted.push_str("\\0"),
            '\n' => quoted.push_str("\\n"),
            '\r' => quoted.push_str("\\r"),
            '\\' => quoted.push_str("\\\\"),
            '\'' => quoted.push_str("\\'"),
            '"' => quoted.push_str("\\\""),
            '\u{1a}' => quoted.push_str("\\Z"),
            c => quoted.push(c),
        }
    }
    quoted.push('\'');
    quoted
}

fn hex_literal(bytes: &[u8]) -> String {
    if bytes.is_empty() {
        return "''".to_string();
    }
    let mut hex = String::with_capacity(bytes.len() * 2 + 2);
    hex.push_str("0x");
    for byte in bytes {
        let _ = write!(hex, "{:02X}", byte);
    }
    hex
}

/// Read access to the tables of a live database.
#[async_trait]
pub trait TableSource: Send {
    /// All table names, in dump order. Failure here aborts the dump.
    async fn table_names(&mut self) -> BackupResult<Vec<String>>;

    /// The engine's own create statement for `table`.
    async fn create_statement(&mut self, table: &str) -> BackupResult<String>;

    /// Every row of `table`, columns in table order.
    async fn rows(&mut self, table: &str) -> BackupResult<Vec<Vec<SqlValue>>>;
}

/// Structure and data of one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDump {
    pub name: String,
    pub create_statement: String,
    pub rows: Vec<Vec<SqlValue>>,
}

/// A table left out of the dump, with the reason.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct SkippedTable {
    pub name: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DumpSection {
    Table(TableDump),
    Skipped(SkippedTable),
}

/// Ordered per-table sections making up a dump.
#[derive(Debug, Clone)]
pub struct DumpDocument {
    database: String,
    generated_at: DateTime<Local>,
    sections: Vec<DumpSection>,
}

impl DumpDocument {
    pub fn new(database: impl Into<String>, generated_at: DateTime<Local>) -> Self {
        Self {
            database: database.into(),
            generated_at,
            sections: Vec::new(),
        }
    }

    pub fn push_table(&mut self, table: TableDump) {
        self.sections.push(DumpSection::Table(table));
    }

    pub fn push_skipped(&mut self, name: impl Into<String>, reason: impl Into<String>) {
        self.sections.push(DumpSection::Skipped(SkippedTable {
            name: name.into(),
            reason: reason.into(),
        }));
    }

    pub fn sections(&self) -> &[DumpSection] {
        &self.sections
    }

    pub fn tables(&self) -> impl Iterator<Item = &TableDump> {
        self.sections.iter().filter_map(|s| match s {
            DumpSection::Table(t) => Some(t),
            DumpSection::Skipped(_) => None,
        })
    }

    pub fn skipped(&self) -> impl Iterator<Item = &SkippedTable> {
        self.sections.iter().filter_map(|s| match s {
            DumpSection::Skipped(s) => Some(s),
            DumpSection::Table(_) => None,
        })
    }

    /// Render the whole document as SQL text.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "-- dumpvault SQL dump");
        let _ = writeln!(out, "-- Database: {}", single_line(&self.database));
        let _ = writeln!(
            out,
            "-- Generated: {}",
            self.generated_at.format("%Y-%m-%d %H:%M:%S")
        );
        out.push('\n');
        out.push_str(DISABLE_FOREIGN_KEY_CHECKS);
        out.push_str("\n\n");

        for section in &self.sections {
            match section {
                DumpSection::Table(table) => render_table(&mut out, table),
                DumpSection::Skipped(skipped) => {
                    let _ = writeln!(
                        out,
                        "-- Skipped table {:?}: {}\n",
                        skipped.name,
                        single_line(&skipped.reason)
                    );
                }
            }
        }

        out.push_str(ENABLE_FOREIGN_KEY_CHECKS);
        out.push('\n');
        out
    }
}

fn render_table(out: &mut String, table: &TableDump) {
    let _ = writeln!(out, "-- Table structure for table `{}`", table.name);
    let _ = writeln!(out, "DROP TABLE IF EXISTS `{}`;", table.name);
    let create = table.create_statement.trim_end();
    let _ = writeln!(out, "{};", create.strip_suffix(';').unwrap_or(create));
    out.push('\n');

    if table.rows.is_empty() {
        return;
    }

    let _ = writeln!(out, "-- Dumping data for table `{}`", table.name);
    let _ = write!(out, "INSERT INTO `{}` VALUES ", table.name);
    for (i, row) in table.rows.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push('(');
        for (j, value) in row.iter().enumerate() {
            if j > 0 {
                out.push(',');
            }
            out.push_str(&value.to_sql());
        }
        out.push(')');
    }
    out.push_str(";\n\n");
}

fn single_line(text: &str) -> String {
    text.replace(['\r', '\n'], " ")
}

/// Read every table from `source` into a [`DumpDocument`].
///
/// Tables with invalid names, or whose structure or data cannot be read, are
/// recorded as skipped and the dump continues. Only a failure to list tables
/// aborts.
pub async fn build_document<S: TableSource + ?Sized>(
    source: &mut S,
    database: &str,
    generated_at: DateTime<Local>,
) -> BackupResult<DumpDocument> {
    let mut document = DumpDocument::new(database, generated_at);

    for name in source.table_names().await? {
        if let Err(reason) = validate_table_name(&name) {
            warn!(table = %name, %reason, "Skipping table with invalid name");
            document.push_skipped(name, reason);
            continue;
        }

        let create_statement = match source.create_statement(&name).await {
            Ok(statement) => statement,
            Err(e) => {
                warn!(table = %name, error = %e, "Skipping table: structure unavailable");
                document.push_skipped(name, e.to_string());
                continue;
            }
        };

        match source.rows(&name).await {
            Ok(rows) => {
                debug!(table = %name, rows = rows.len(), "Table dumped");
                document.push_table(TableDump {
                    name,
                    create_statement,
                    rows,
                });
            }
            Err(e) => {
                warn!(table = %name, error = %e, "Skipping table: data unavailable");
                document.push_skipped(name, e.to_string());
            }
        }
    }

    Ok(document)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BackupError;
    use std::collections::HashMap;

    #[derive(Default)]
    struct StaticSource {
        order: Vec<String>,
        creates: HashMap<String, String>,
        rows: HashMap<String, Vec<Vec<SqlValue>>>,
        broken_rows: Vec<String>,
        list_fails: bool,
    }

    impl StaticSource {
        fn table(mut self, name: &str, rows: Vec<Vec<SqlValue>>) -> Self {
            self.order.push(name.to_string());
            self.creates.insert(
                name.to_string(),
                format!("CREATE TABLE `{}` (\n  `id` int NOT NULL\n)", name),
            );
            self.rows.insert(name.to_string(), rows);
            self
        }
    }

    #[async_trait]
    impl TableSource for StaticSource {
        async fn table_names(&mut self) -> BackupResult<Vec<String>> {
            if self.list_fails {
                return Err(BackupError::ConnectionFailure("server has gone away".into()));
            }
            Ok(self.order.clone())
        }

        async fn create_statement(&mut self, table: &str) -> BackupResult<String> {
            self.creates
                .get(table)
                .cloned()
                .ok_or_else(|| BackupError::Query(format!("Table '{}' doesn't exist", table)))
        }

        async fn rows(&mut self, table: &str) -> BackupResult<Vec<Vec<SqlValue>>> {
            if self.broken_rows.iter().any(|t| t == table) {
                return Err(BackupError::Query("Lost connection during query".into()));
            }
            Ok(self.rows.get(table).cloned().unwrap_or_default())
        }
    }

    fn now() -> DateTime<Local> {
        Local::now()
    }

    #[test]
    fn test_quote_literal_escapes() {
        assert_eq!(quote_literal("plain"), "'plain'");
        assert_eq!(quote_literal("O'Brien"), "'O\\'Brien'");
        assert_eq!(quote_literal("say \"hi\""), "'say \\\"hi\\\"'");
        assert_eq!(quote_literal("a\\b"), "'a\\\\b'");
        assert_eq!(quote_literal("line1\nline2\r"), "'line1\\nline2\\r'");
        assert_eq!(quote_literal("nul\0ctrl\u{1a}"), "'nul\\0ctrl\\Z'");
    }

    #[test]
    fn test_sql_value_rendering() {
        assert_eq!(SqlValue::Null.to_sql(), "NULL");
        assert_eq!(SqlValue::from("42").to_sql(), "'42'");
        assert_eq!(SqlValue::from(None::<&str>).to_sql(), "NULL");
        assert_eq!(SqlValue::from_bytes(vec![0xff, 0x00, 0x10]).to_sql(), "0xFF0010");
        assert_eq!(SqlValue::from_bytes(b"text".to_vec()), SqlValue::from("text"));
        assert_eq!(SqlValue::Bytes(Vec::new()).to_sql(), "''");
    }

    #[tokio::test]
    async fn test_dump_has_section_per_table_and_fk_pair() {
        let mut source = StaticSource::default()
            .table("roles", vec![vec!["1".into()]])
            .table("users", vec![vec!["1".into()], vec!["2".into()]])
            .table("equipment", vec![vec!["7".into()]]);

        let doc = build_document(&mut source, "equipment_db", now()).await.unwrap();
        let sql = doc.render();

        assert_eq!(doc.tables().count(), 3);
        assert_eq!(sql.matches("DROP TABLE IF EXISTS").count(), 3);
        assert_eq!(sql.matches("CREATE TABLE").count(), 3);
        assert_eq!(sql.matches(DISABLE_FOREIGN_KEY_CHECKS).count(), 1);
        assert_eq!(sql.matches(ENABLE_FOREIGN_KEY_CHECKS).count(), 1);

        let statements: Vec<&str> = sql
            .lines()
            .filter(|l| !l.starts_with("--") && !l.trim().is_empty())
            .collect();
        assert_eq!(statements.first(), Some(&DISABLE_FOREIGN_KEY_CHECKS));
        assert_eq!(statements.last(), Some(&ENABLE_FOREIGN_KEY_CHECKS));
    }

    #[tokio::test]
    async fn test_invalid_table_name_is_skipped() {
        let mut source = StaticSource::default()
            .table("users", vec![vec!["1".into()]])
            .table("tbl-bad name", vec![vec!["1".into()]]);

        let doc = build_document(&mut source, "db", now()).await.unwrap();
        let sql = doc.render();

        assert_eq!(doc.tables().count(), 1);
        let skipped: Vec<_> = doc.skipped().collect();
        assert_eq!(skipped.len(), 1);
        assert_eq!(skipped[0].name, "tbl-bad name");

        assert!(!sql.contains("DROP TABLE IF EXISTS `tbl-bad name`"));
        assert!(!sql.contains("CREATE TABLE `tbl-bad name`"));
        assert!(sql.contains("-- Skipped table \"tbl-bad name\""));
    }

    #[tokio::test]
    async fn test_empty_table_has_create_but_no_insert() {
        let mut source = StaticSource::default().table("audit_log", Vec::new());

        let sql = build_document(&mut source, "db", now()).await.unwrap().render();

        assert!(sql.contains("CREATE TABLE `audit_log`"));
        assert!(!sql.contains("INSERT INTO"));
    }

    #[tokio::test]
    async fn test_nulls_and_quoting_in_insert() {
        let mut source = StaticSource::default().table(
            "equipment",
            vec![
                vec!["1".into(), "Drill 'XL'".into(), SqlValue::Null],
                vec!["2".into(), SqlValue::Null, "rack \"B\"".into()],
            ],
        );

        let sql = build_document(&mut source, "db", now()).await.unwrap().render();

        assert!(sql.contains(
            "INSERT INTO `equipment` VALUES ('1','Drill \\'XL\\'',NULL),('2',NULL,'rack \\\"B\\\"');"
        ));
        assert!(!sql.contains("'Drill 'XL''"));
        assert_eq!(sql.matches("INSERT INTO").count(), 1);
    }

    #[tokio::test]
    async fn test_table_failure_does_not_abort_dump() {
        let mut source = StaticSource::default()
            .table("users", vec![vec!["1".into()]])
            .table("history", vec![vec!["1".into()]]);
        source.broken_rows.push("history".to_string());
        source.order.push("ghost".to_string());

        let doc = build_document(&mut source, "db", now()).await.unwrap();

        assert_eq!(doc.tables().map(|t| t.name.as_str()).collect::<Vec<_>>(), ["users"]);
        let skipped: Vec<_> = doc.skipped().map(|s| s.name.as_str()).collect();
        assert_eq!(skipped, ["history", "ghost"]);
        assert!(doc.render().contains("Lost connection during query"));
    }

    #[tokio::test]
    async fn test_listing_failure_aborts() {
        let mut source = StaticSource {
            list_fails: true,
            ..Default::default()
        };

        let err = build_document(&mut source, "db", now()).await.unwrap_err();
        assert!(matches!(err, BackupError::ConnectionFailure(_)));
    }

    #[test]
    fn test_create_statement_terminator_not_doubled() {
        let mut doc = DumpDocument::new("db", now());
        doc.push_table(TableDump {
            name: "t".to_string(),
            create_statement: "CREATE TABLE `t` (`id` int);\n".to_string(),
            rows: Vec::new(),
        });
        let sql = doc.render();
        assert!(sql.contains("CREATE TABLE `t` (`id` int);\n"));
        assert!(!sql.contains(";;"));
    }

    #[test]
    fn test_skip_reason_stays_on_one_line() {
        let mut doc = DumpDocument::new("db", now());
        doc.push_skipped("t", "first line\nDROP TABLE users;");
        let sql = doc.render();
        assert!(sql.lines().all(|l| l != "DROP TABLE users;"));
    }
}
