//! # dumpvault Testing Utilities
//!
//! - **[`FakeDumpLoader`]**: scriptable loader with call history, for
//!   exercising the backup service and HTTP layer without a database
//! - **[`TestVault`]**: temporary directory with a SQLite configuration
//! - **[`create_equipment_db`]**: SQLite fixture database
//!
//! ## Usage
//!
//! ```rust
//! use dumpvault_core::BackupService;
//! use dumpvault_testing::{FakeDumpLoader, TestVault};
//! use std::sync::Arc;
//!
//! let vault = TestVault::new();
//! let loader = FakeDumpLoader::new();
//! let service = BackupService::new(vault.config.clone(), Arc::new(loader.clone()));
//! ```

/// Scriptable dump loader
pub mod fake_loader;
/// Temporary directories and fixture databases
pub mod fixtures;

pub use fake_loader::{FAKE_DUMP_BODY, FakeCall, FakeDumpLoader, FakeFailure};
pub use fixtures::{TestVault, create_equipment_db, row_count};
