//! Database migration commands.

use clap::{Args, Subcommand};

use cloudbox_core::config::AppConfig;
use cloudbox_core::error::AppError;
use cloudbox_database::{DatabasePool, MetadataStore, PgMetadataStore, migration};

use crate::output;

/// Arguments for the migrate command
#[derive(Debug, Args)]
pub struct MigrateArgs {
    /// Migration subcommand
    #[command(subcommand)]
    pub command: MigrateCommand,
}

/// Migration subcommands
#[derive(Debug, Subcommand)]
pub enum MigrateCommand {
    /// Run all pending migrations
    Run,
    /// Check that the database answers
    Check,
}

/// Execute migration commands
pub async fn execute(args: &MigrateArgs, config: &AppConfig) -> Result<(), AppError> {
    let db = DatabasePool::connect(&config.database).await?;

    match &args.command {
        MigrateCommand::Run => {
            println!("Running database migrations...");
            migration::run_migrations(db.pool()).await?;
            output::print_success("All migrations applied successfully.");
        }
        MigrateCommand::Check => {
            let store = PgMetadataStore::new(db.clone());
            if store.health_check().await? {
                output::print_success("Database is reachable and migrated.");
            } else {
                output::print_warning("Database is reachable but not migrated.");
            }
            if let Some(version) = migration::latest_version() {
                output::print_kv("Latest known version", &version.to_string());
            }
        }
    }

    db.close().await;
    Ok(())
}
