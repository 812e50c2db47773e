//! Subcommand implementations

use std::path::{Path, PathBuf};

use chrono::Duration;
use dumpvault_core::{BackupError, BackupService, VaultConfig, VaultConfigBuilder};
use dumpvault_http::{HttpBackupRuntime, HttpRuntimeConfigBuilder, JwtAuth};
use tracing::info;

use crate::error::{CliError, CliResult};

/// Load the vault configuration, optionally seeded from a TOML file.
pub fn load_vault_config(config_file: Option<&Path>) -> CliResult<VaultConfig> {
    let builder = match config_file {
        Some(path) => VaultConfigBuilder::from_toml_file(path)?.apply_env()?,
        None => VaultConfigBuilder::from_env()?,
    };
    Ok(builder.build()?)
}

fn backup_service(config: VaultConfig) -> CliResult<BackupService> {
    let loader = dumpvault_engines::loader_for(&config)?;
    Ok(BackupService::new(config, loader))
}

pub async fn serve(config: VaultConfig) -> CliResult<()> {
    let http = HttpRuntimeConfigBuilder::from_env()?.build()?;
    let service = backup_service(config)?;
    dumpvault_http::serve(HttpBackupRuntime::new(service), http)
        .await
        .map_err(CliError::Server)
}

pub async fn create(config: VaultConfig, json: bool) -> CliResult<()> {
    let report = backup_service(config)?.create_backup().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }
    println!(
        "Backup created: {} ({})",
        report.filename,
        dumpvault_core::human_size(report.size_bytes)
    );
    for table in &report.skipped {
        println!("  skipped {}: {}", table.name, table.reason);
    }
    Ok(())
}

pub async fn list(config: VaultConfig, json: bool) -> CliResult<()> {
    let entries = backup_service(config)?.list_backups().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }
    if entries.is_empty() {
        println!("No backups found");
        return Ok(());
    }
    for entry in &entries {
        println!(
            "{:<40} {:>12}  {}",
            entry.filename,
            entry.size_human,
            entry.created_at.format("%Y-%m-%d %H:%M:%S")
        );
    }
    println!("{} backup(s)", entries.len());
    Ok(())
}

pub async fn delete(config: VaultConfig, filename: &str) -> CliResult<()> {
    backup_service(config)?.delete_backup(filename).await?;
    println!("Backup '{}' deleted", filename);
    Ok(())
}

pub async fn download(config: VaultConfig, filename: &str, output: Option<PathBuf>) -> CliResult<()> {
    let (entry, bytes) = backup_service(config)?.read_backup(filename).await?;
    let target = output.unwrap_or_else(|| PathBuf::from(&entry.filename));

    tokio::fs::write(&target, &bytes)
        .await
        .map_err(|source| CliError::Write {
            path: target.clone(),
            source,
        })?;

    info!(filename = %entry.filename, target = %target.display(), "Backup copied");
    println!("Saved {} to {}", entry.filename, target.display());
    Ok(())
}

pub async fn restore(config: VaultConfig, file: Option<PathBuf>, backup: Option<String>) -> CliResult<()> {
    let service = backup_service(config)?;
    let report = match (file, backup) {
        (_, Some(name)) => service.restore_backup(&name).await?,
        (Some(path), None) => service.restore_file(&path).await?,
        (None, None) => {
            return Err(BackupError::ValidationFailure(
                "restore needs a dump file or --backup <name>".to_string(),
            )
            .into());
        }
    };
    println!(
        "Database restored from {} ({})",
        report.source,
        dumpvault_core::human_size(report.size_bytes)
    );
    Ok(())
}

/// Sign a bearer token for the HTTP API with the configured secret.
pub fn token(subject: &str, roles: Vec<String>, ttl_hours: i64) -> CliResult<()> {
    let http = HttpRuntimeConfigBuilder::from_env()?.build()?;
    let roles = if roles.is_empty() {
        vec![http.required_role.clone()]
    } else {
        roles
    };

    let auth = JwtAuth::new(&http.jwt_secret, http.required_role.clone());
    let token = auth.issue_token_with_ttl(subject, roles, Duration::hours(ttl_hours))?;
    println!("{}", token);
    Ok(())
}
