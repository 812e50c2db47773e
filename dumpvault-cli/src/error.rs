//! CLI error type

use std::{io, path::PathBuf};

use dumpvault_core::BackupError;

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    VaultConfig(#[from] dumpvault_core::ConfigError),

    #[error(transparent)]
    HttpConfig(#[from] dumpvault_http::ConfigError),

    #[error(transparent)]
    Backup(#[from] BackupError),

    #[error("failed to sign token: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error("failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("server error: {0}")]
    Server(#[source] io::Error),

    #[error("failed to render output: {0}")]
    Output(#[from] serde_json::Error),
}

pub type CliResult<T> = Result<T, CliError>;
