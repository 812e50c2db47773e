//! # dumpvault-core
//!
//! Core of the dumpvault backup subsystem: configuration, the dump document
//! model, the on-disk backup catalog, external tool execution and the
//! [`BackupService`] that ties them together.
//!
//! Engine-specific behavior lives behind the [`DumpLoader`] trait; see the
//! `dumpvault-engines` crate for the SQLite and MySQL implementations.

pub mod catalog;
pub mod config;
pub mod dump;
pub mod error;
pub mod guard;
pub mod identifiers;
pub mod loader;
pub mod process;
pub mod service;

pub use catalog::{BackupCatalog, BackupEntry, human_size};
pub use config::{
    ConfigError, DatabaseConfig, DriverKind, ToolPaths, VaultConfig, VaultConfigBuilder,
};
pub use dump::{DumpDocument, SkippedTable, SqlValue, TableDump, TableSource, build_document};
pub use error::{BackupError, BackupResult};
pub use guard::{OperationGuard, OperationPermit};
pub use loader::{DumpLoader, DumpSummary, Operation};
pub use process::{ToolCommand, ToolOutput, resolve_binary};
pub use service::{BackupService, DumpReport, RestoreReport, RestoreUpload, backup_filename};
