//! HTTP request handlers

pub mod backups;
pub mod health;

// Re-export handlers for convenience
pub use backups::*;
pub use health::*;
