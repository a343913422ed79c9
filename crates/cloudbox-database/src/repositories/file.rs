//! File repository implementation.

use sqlx::PgPool;

use cloudbox_core::error::{AppError, ErrorKind};
use cloudbox_core::result::AppResult;
use cloudbox_core::types::FileId;
use cloudbox_entity::file::{File, FileKey, FileState};

/// Repository for file rows.
#[derive(Debug, Clone)]
pub struct FileRepository {
    pool: PgPool,
}

impl FileRepository {
    /// Create a new file repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find a file by ID in the given state.
    pub async fn find_by_id(&self, id: FileId, state: FileState) -> AppResult<Option<File>> {
        sqlx::query_as::<_, File>("SELECT * FROM files WHERE id = $1 AND state = $2")
            .bind(id)
            .bind(state)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find file", e))
    }

    /// Find every row with this key in the given state.
    pub async fn find_by_key(&self, key: &FileKey, state: FileState) -> AppResult<Vec<File>> {
        sqlx::query_as::<_, File>(
            "SELECT * FROM files \
             WHERE file_name = $1 AND extension = $2 AND path = $3 AND state = $4 \
             ORDER BY deleted_at DESC NULLS FIRST",
        )
        .bind(&key.file_name)
        .bind(&key.extension)
        .bind(&key.path)
        .bind(state)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find file by key", e))
    }

    /// List active files directly inside a directory path.
    pub async fn find_active_by_path(&self, path: &str) -> AppResult<Vec<File>> {
        sqlx::query_as::<_, File>(
            "SELECT * FROM files WHERE path = $1 AND state = 'active' \
             ORDER BY file_name ASC, extension ASC",
        )
        .bind(path)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list files", e))
    }

    /// List every file row.
    pub async fn find_all(&self) -> AppResult<Vec<File>> {
        sqlx::query_as::<_, File>(
            "SELECT * FROM files ORDER BY path ASC, file_name ASC, extension ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list all files", e))
    }

    /// Insert an active file owned by the directory at `key.path`.
    ///
    /// The directory lookup and the insert are one statement; no row comes
    /// back when the directory does not exist.
    pub async fn create(&self, key: &FileKey) -> AppResult<File> {
        sqlx::query_as::<_, File>(
            "INSERT INTO files (file_name, extension, path, directory_id) \
             SELECT $1, $2, $3, d.id FROM directories d WHERE d.path = $3 \
             RETURNING *",
        )
        .bind(&key.file_name)
        .bind(&key.extension)
        .bind(&key.path)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err)
                if db_err.constraint() == Some("files_active_key_idx") =>
            {
                AppError::conflict(format!("File '{key}' already exists"))
            }
            _ => AppError::with_source(ErrorKind::Database, "Failed to create file", e),
        })?
        .ok_or_else(|| AppError::not_found(format!("Directory '{}' not found", key.path)))
    }

    /// Move an active file to the trashed state.
    pub async fn soft_delete(&self, id: FileId) -> AppResult<File> {
        sqlx::query_as::<_, File>(
            "UPDATE files SET state = 'trashed', deleted_at = NOW(), updated_at = NOW() \
             WHERE id = $1 AND state = 'active' RETURNING *",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to soft-delete file", e))?
        .ok_or_else(|| AppError::not_found(format!("Active file {id} not found")))
    }

    /// Re-activate the single trashed row with this key.
    pub async fn restore(&self, key: &FileKey) -> AppResult<File> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to begin transaction", e)
        })?;

        let located = sqlx::query_as::<_, File>(
            "SELECT * FROM files \
             WHERE file_name = $1 AND extension = $2 AND path = $3 AND state = 'trashed' \
             FOR UPDATE",
        )
        .bind(&key.file_name)
        .bind(&key.extension)
        .bind(&key.path)
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to locate trashed file", e))?;

        let target = exactly_one(located, key)?;

        let restored = sqlx::query_as::<_, File>(
            "UPDATE files SET state = 'active', deleted_at = NULL, updated_at = NOW() \
             WHERE id = $1 RETURNING *",
        )
        .bind(target.id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err)
                if db_err.constraint() == Some("files_active_key_idx") =>
            {
                AppError::conflict(format!("An active file '{key}' already exists"))
            }
            _ => AppError::with_source(ErrorKind::Database, "Failed to restore file", e),
        })?;

        tx.commit().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to commit file restore", e)
        })?;

        Ok(restored)
    }
}

/// Require exactly one trashed row for a key.
pub(crate) fn exactly_one(mut rows: Vec<File>, key: &FileKey) -> AppResult<File> {
    match rows.len() {
        0 => Err(AppError::not_found(format!("No trashed file '{key}'"))),
        1 => Ok(rows.remove(0)),
        n => Err(AppError::conflict(format!(
            "Ambiguous trash entry: {n} trashed rows match '{key}'"
        ))),
    }
}
