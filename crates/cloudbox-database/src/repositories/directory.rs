//! Directory repository implementation.
//!
//! Cascading deletes and subtree renames touch both the `directories`
//! and `files` tables, so they live here and run in one transaction.

use sqlx::PgPool;
use tracing::debug;

use cloudbox_core::error::{AppError, ErrorKind};
use cloudbox_core::result::AppResult;
use cloudbox_entity::directory::Directory;

use crate::store::{CascadeSummary, RenameSummary};

/// Rows whose `path` is `$1` or lies below it, matched on `/` boundaries.
const SUBTREE: &str = "(path = $1 OR left(path, char_length($1) + 1) = $1 || '/')";

/// Repository for directory rows.
#[derive(Debug, Clone)]
pub struct DirectoryRepository {
    pool: PgPool,
}

impl DirectoryRepository {
    /// Create a new directory repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find a directory by its logical path.
    pub async fn find_by_path(&self, path: &str) -> AppResult<Option<Directory>> {
        sqlx::query_as::<_, Directory>("SELECT * FROM directories WHERE path = $1")
            .bind(path)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to find directory by path", e)
            })
    }

    /// List every directory ordered by path.
    pub async fn find_all(&self) -> AppResult<Vec<Directory>> {
        sqlx::query_as::<_, Directory>("SELECT * FROM directories ORDER BY path ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list directories", e))
    }

    /// Insert a directory row.
    pub async fn create(&self, path: &str) -> AppResult<Directory> {
        sqlx::query_as::<_, Directory>("INSERT INTO directories (path) VALUES ($1) RETURNING *")
            .bind(path)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(ref db_err)
                    if db_err.constraint() == Some("directories_path_key") =>
                {
                    AppError::conflict(format!("Directory '{path}' already exists"))
                }
                _ => AppError::with_source(ErrorKind::Database, "Failed to create directory", e),
            })
    }

    /// Delete the directory at `path`, its descendants, and every file row below it.
    pub async fn delete_cascade(&self, path: &str) -> AppResult<CascadeSummary> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to begin transaction", e)
        })?;

        let locked: Vec<(uuid::Uuid,)> =
            sqlx::query_as(&format!("SELECT id FROM directories WHERE {SUBTREE} FOR UPDATE"))
                .bind(path)
                .fetch_all(&mut *tx)
                .await
                .map_err(|e| {
                    AppError::with_source(ErrorKind::Database, "Failed to lock directories", e)
                })?;
        if locked.is_empty() {
            return Err(AppError::not_found(format!("Directory '{path}' not found")));
        }

        let files_removed = sqlx::query(&format!("DELETE FROM files WHERE {SUBTREE}"))
            .bind(path)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                AppError::with_source(
                    ErrorKind::Database,
                    format!("Failed to delete files under '{path}'"),
                    e,
                )
            })?
            .rows_affected();

        let directories_removed = sqlx::query(&format!("DELETE FROM directories WHERE {SUBTREE}"))
            .bind(path)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                AppError::with_source(
                    ErrorKind::Database,
                    format!("Failed to delete directory '{path}'"),
                    e,
                )
            })?
            .rows_affected();

        tx.commit().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to commit directory delete", e)
        })?;

        debug!(path, files_removed, directories_removed, "Directory rows deleted");
        Ok(CascadeSummary {
            files_removed,
            directories_removed,
        })
    }

    /// Rewrite the `from` prefix to `to` on directory and file rows.
    pub async fn rename_subtree(&self, from: &str, to: &str) -> AppResult<RenameSummary> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to begin transaction", e)
        })?;

        let locked: Vec<(uuid::Uuid,)> =
            sqlx::query_as(&format!("SELECT id FROM directories WHERE {SUBTREE} FOR UPDATE"))
                .bind(from)
                .fetch_all(&mut *tx)
                .await
                .map_err(|e| {
                    AppError::with_source(ErrorKind::Database, "Failed to lock directories", e)
                })?;
        if locked.is_empty() {
            return Err(AppError::not_found(format!("Directory '{from}' not found")));
        }

        let taken: Option<(uuid::Uuid,)> =
            sqlx::query_as("SELECT id FROM directories WHERE path = $1")
                .bind(to)
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| {
                    AppError::with_source(ErrorKind::Database, "Failed to check target path", e)
                })?;
        if taken.is_some() {
            return Err(AppError::conflict(format!("Directory '{to}' already exists")));
        }

        let files_moved = sqlx::query(&format!(
            "UPDATE files SET path = $2 || substr(path, char_length($1) + 1), updated_at = NOW() \
             WHERE {SUBTREE}"
        ))
        .bind(from)
        .bind(to)
        .execute(&mut *tx)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err)
                if db_err.constraint() == Some("files_active_key_idx") =>
            {
                AppError::conflict(format!("Files under '{to}' would collide"))
            }
            _ => AppError::with_source(
                ErrorKind::Database,
                format!("Failed to move files from '{from}'"),
                e,
            ),
        })?
        .rows_affected();

        let directories_moved = sqlx::query(&format!(
            "UPDATE directories SET path = $2 || substr(path, char_length($1) + 1), updated_at = NOW() \
             WHERE {SUBTREE}"
        ))
        .bind(from)
        .bind(to)
        .execute(&mut *tx)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err)
                if db_err.constraint() == Some("directories_path_key") =>
            {
                AppError::conflict(format!("Directories under '{to}' already exist"))
            }
            _ => AppError::with_source(
                ErrorKind::Database,
                format!("Failed to rename directory '{from}'"),
                e,
            ),
        })?
        .rows_affected();

        tx.commit().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to commit directory rename", e)
        })?;

        debug!(from, to, files_moved, directories_moved, "Directory rows renamed");
        Ok(RenameSummary {
            files_moved,
            directories_moved,
        })
    }
}
