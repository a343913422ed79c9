//! CLI command definitions and dispatch.

pub mod dir;
pub mod file;
pub mod migrate;
pub mod reconcile;
pub mod user;

use std::sync::Arc;

use clap::{Parser, Subcommand};

use cloudbox_auth::password::{PasswordHasher, PasswordValidator};
use cloudbox_core::config::AppConfig;
use cloudbox_core::error::AppError;
use cloudbox_database::{DatabasePool, PgMetadataStore, PgUserStore};
use cloudbox_service::{
    DirectoryLifecycle, FileLifecycle, Reconciler, StorageGateway, UserService,
};
use cloudbox_storage::{LocalFilesystem, PathPolicy};

use crate::output::OutputFormat;

/// CloudBox personal file storage
#[derive(Debug, Parser)]
#[command(name = "cloudbox", version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Database migration management
    Migrate(migrate::MigrateArgs),
    /// User accounts
    User(user::UserArgs),
    /// Upload, trash, restore and download files
    File(file::FileArgs),
    /// Create, delete, rename and list directories
    Dir(dir::DirArgs),
    /// Report disagreements between disk and metadata
    Reconcile(reconcile::ReconcileArgs),
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(&self, config: AppConfig) -> Result<(), AppError> {
        match &self.command {
            Commands::Migrate(args) => migrate::execute(args, &config).await,
            Commands::User(args) => user::execute(args, &config, self.format).await,
            Commands::File(args) => file::execute(args, &config, self.format).await,
            Commands::Dir(args) => dir::execute(args, &config, self.format).await,
            Commands::Reconcile(args) => reconcile::execute(args, &config, self.format).await,
        }
    }
}

/// Helper: connect to the database, applying migrations when configured
pub async fn create_db_pool(config: &AppConfig) -> Result<DatabasePool, AppError> {
    let db = DatabasePool::connect(&config.database).await?;
    if config.database.auto_migrate {
        cloudbox_database::migration::run_migrations(db.pool()).await?;
    }
    Ok(db)
}

/// Services wired to PostgreSQL and the local filesystem.
pub struct AppServices {
    /// File and directory requests.
    pub gateway: StorageGateway,
    /// Orphan audit.
    pub reconciler: Reconciler,
}

impl AppServices {
    /// Connect and build the storage services.
    pub async fn connect(config: &AppConfig) -> Result<Self, AppError> {
        let db = create_db_pool(config).await?;
        let store = Arc::new(PgMetadataStore::new(db));
        let fs = Arc::new(LocalFilesystem::new());
        let paths = PathPolicy::from_config(&config.storage);

        let directories = DirectoryLifecycle::new(store.clone(), fs.clone(), paths.clone());
        let files = FileLifecycle::new(
            store.clone(),
            fs.clone(),
            paths.clone(),
            config.storage.max_upload_size_bytes,
        );

        Ok(Self {
            gateway: StorageGateway::new(directories, files),
            reconciler: Reconciler::new(store, fs, paths),
        })
    }
}

/// Helper: build the user service
pub async fn user_service(config: &AppConfig) -> Result<UserService, AppError> {
    let db = create_db_pool(config).await?;
    Ok(UserService::new(
        Arc::new(PgUserStore::new(&db)),
        Arc::new(PasswordHasher::new()),
        Arc::new(PasswordValidator::new(&config.auth)),
    ))
}
