//! Shared PostgreSQL pool behind the metadata and user stores.

use std::time::Duration;

use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use tracing::{debug, info};

use cloudbox_core::config::DatabaseConfig;
use cloudbox_core::error::{AppError, ErrorKind};
use cloudbox_core::result::AppResult;

/// The one database handle injected into every store.
#[derive(Debug, Clone)]
pub struct DatabasePool {
    pool: PgPool,
}

impl DatabasePool {
    /// Open the pool described by the `database` config section.
    pub async fn connect(config: &DatabaseConfig) -> AppResult<Self> {
        let options: PgConnectOptions = config.url.parse().map_err(|e| {
            AppError::with_source(ErrorKind::Configuration, "Invalid database.url", e)
        })?;

        info!(
            target_db = %describe(&options),
            max_connections = config.max_connections,
            min_connections = config.min_connections,
            acquire_timeout_seconds = config.acquire_timeout_seconds,
            idle_timeout_seconds = config.idle_timeout_seconds,
            "Opening metadata database pool"
        );

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_seconds))
            .idle_timeout(Duration::from_secs(config.idle_timeout_seconds))
            .connect_with(options)
            .await
            .map_err(|e| {
                AppError::with_source(
                    ErrorKind::Database,
                    format!("Cannot reach metadata database: {e}"),
                    e,
                )
            })?;

        debug!(size = pool.size(), "Metadata database pool ready");
        Ok(Self { pool })
    }

    /// The underlying sqlx pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Whether the database answers and holds the `files` table.
    ///
    /// `false` means connected but not migrated.
    pub async fn health_check(&self) -> AppResult<bool> {
        sqlx::query_scalar::<_, bool>("SELECT to_regclass('public.files') IS NOT NULL")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Health check failed", e))
    }

    /// Close every connection.
    pub async fn close(&self) {
        self.pool.close().await;
        info!("Metadata database pool closed");
    }
}

/// `user@host:port/database`, never the password.
fn describe(options: &PgConnectOptions) -> String {
    format!(
        "{}@{}:{}/{}",
        options.get_username(),
        options.get_host(),
        options.get_port(),
        options.get_database().unwrap_or("")
    )
}
