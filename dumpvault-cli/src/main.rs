use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod error;

#[derive(Parser, Debug)]
#[command(name = "dumpvault", version)]
#[command(about = "dumpvault - database backup, catalog and restore")]
struct Cli {
    /// TOML file seeding the configuration; DUMPVAULT_* variables still apply on top
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP API
    Serve,
    /// Dump the configured database into a new backup file
    Create {
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// List backups, newest first
    List {
        /// Print the catalog as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a backup file
    Delete {
        /// Backup file name
        filename: String,
    },
    /// Copy a backup out of the backups directory
    Download {
        /// Backup file name
        filename: String,
        /// Destination path (default: ./<filename>)
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Replay a dump into the configured database
    Restore(RestoreTarget),
    /// Issue a bearer token for the HTTP API
    Token {
        /// Subject recorded in the token
        #[arg(long, default_value = "dumpvault-cli")]
        subject: String,
        /// Role to grant; repeat for several (default: the required role)
        #[arg(long = "role")]
        roles: Vec<String>,
        /// Token lifetime in hours
        #[arg(long, default_value_t = 24, value_parser = clap::value_parser!(i64).range(1..=8760))]
        ttl_hours: i64,
    },
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
struct RestoreTarget {
    /// Dump file on disk
    file: Option<PathBuf>,
    /// Name of a backup in the catalog
    #[arg(long)]
    backup: Option<String>,
}

#[tokio::main]
async fn main() {
    // Load .env before anything reads DUMPVAULT_* variables.
    dotenvy::dotenv().ok();

    // Initialize JSON logging once.
    let env_filter = tracing_subscriber::EnvFilter::from_default_env();
    let env_filter = match "info".parse() {
        Ok(directive) => env_filter.add_directive(directive),
        Err(_) => env_filter, // fallback to default if parsing fails
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .json()
        .with_writer(std::io::stderr)
        .try_init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!(error = %e, "Command failed");
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> error::CliResult<()> {
    let config = || commands::load_vault_config(cli.config.as_deref());

    match cli.command {
        Commands::Serve => commands::serve(config()?).await,
        Commands::Create { json } => commands::create(config()?, json).await,
        Commands::List { json } => commands::list(config()?, json).await,
        Commands::Delete { filename } => commands::delete(config()?, &filename).await,
        Commands::Download { filename, output } => {
            commands::download(config()?, &filename, output).await
        }
        Commands::Restore(target) => {
            commands::restore(config()?, target.file, target.backup).await
        }
        Commands::Token {
            subject,
            roles,
            ttl_hours,
        } => commands::token(&subject, roles, ttl_hours),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_restore_requires_exactly_one_source() {
        assert!(Cli::try_parse_from(["dumpvault", "restore"]).is_err());
        assert!(
            Cli::try_parse_from(["dumpvault", "restore", "dump.sql", "--backup", "b.sql"]).is_err()
        );

        let cli = Cli::try_parse_from(["dumpvault", "restore", "--backup", "backup_x.sql"]).unwrap();
        match cli.command {
            Commands::Restore(target) => {
                assert_eq!(target.backup.as_deref(), Some("backup_x.sql"));
                assert!(target.file.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_token_roles_and_ttl() {
        let cli = Cli::try_parse_from([
            "dumpvault", "token", "--role", "admin", "--role", "ops", "--ttl-hours", "2",
        ])
        .unwrap();
        match cli.command {
            Commands::Token {
                roles, ttl_hours, ..
            } => {
                assert_eq!(roles, vec!["admin", "ops"]);
                assert_eq!(ttl_hours, 2);
            }
            other => panic!("unexpected command: {other:?}"),
        }
        assert!(Cli::try_parse_from(["dumpvault", "token", "--ttl-hours", "0"]).is_err());
    }

    #[test]
    fn test_global_config_flag() {
        let cli = Cli::try_parse_from(["dumpvault", "list", "--config", "dumpvault.toml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("dumpvault.toml")));
    }
}
