//! # dumpvault HTTP
//!
//! Axum server exposing the backup catalog, backup creation and restore
//! uploads behind bearer-token authorization.

pub mod runtime;

pub use runtime::{
    ApiError, AppState, AuthContext, Claims, ConfigError, HttpBackupRuntime, HttpRuntimeConfig,
    HttpRuntimeConfigBuilder, JwtAuth, serve, shutdown_signal,
};
