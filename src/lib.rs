//! # dumpvault
//!
//! Database backup, catalog and restore.
//!
//! - [`core`]: configuration, dump document model, backup catalog and the
//!   [`BackupService`](core::BackupService)
//! - [`engines`]: SQLite and MySQL dump loaders
//! - [`http`]: axum API with bearer-token authorization

pub use dumpvault_core as core;
pub use dumpvault_engines as engines;
pub use dumpvault_http as http;

pub use dumpvault_core::{
    BackupError, BackupResult, BackupService, DatabaseConfig, DriverKind, VaultConfig,
    VaultConfigBuilder,
};
pub use dumpvault_engines::loader_for;
