//! PostgreSQL-backed store implementations.

use async_trait::async_trait;
use sqlx::PgPool;

use cloudbox_core::error::AppError;
use cloudbox_core::result::AppResult;
use cloudbox_core::types::{FileId, UserId};
use cloudbox_entity::directory::Directory;
use cloudbox_entity::file::{File, FileKey, FileState};
use cloudbox_entity::user::{CreateUser, User, UserStatus};

use crate::connection::DatabasePool;
use crate::repositories::file::exactly_one;
use crate::repositories::{DirectoryRepository, FileRepository, UserRepository};
use crate::store::{CascadeSummary, MetadataStore, RenameSummary, UserStore};

/// [`MetadataStore`] over the `directories` and `files` tables.
#[derive(Debug, Clone)]
pub struct PgMetadataStore {
    db: DatabasePool,
    directories: DirectoryRepository,
    files: FileRepository,
}

impl PgMetadataStore {
    /// Build the store on a shared pool.
    pub fn new(db: DatabasePool) -> Self {
        let pool: PgPool = db.pool().clone();
        Self {
            directories: DirectoryRepository::new(pool.clone()),
            files: FileRepository::new(pool),
            db,
        }
    }
}

#[async_trait]
impl MetadataStore for PgMetadataStore {
    async fn create_directory(&self, path: &str) -> AppResult<Directory> {
        self.directories.create(path).await
    }

    async fn find_directory(&self, path: &str) -> AppResult<Option<Directory>> {
        self.directories.find_by_path(path).await
    }

    async fn list_directories(&self) -> AppResult<Vec<Directory>> {
        self.directories.find_all().await
    }

    async fn delete_directory_cascade(&self, path: &str) -> AppResult<CascadeSummary> {
        self.directories.delete_cascade(path).await
    }

    async fn rename_directory(&self, from: &str, to: &str) -> AppResult<RenameSummary> {
        self.directories.rename_subtree(from, to).await
    }

    async fn create_file(&self, key: &FileKey) -> AppResult<File> {
        self.files.create(key).await
    }

    async fn find_file(&self, key: &FileKey) -> AppResult<Option<File>> {
        Ok(self
            .files
            .find_by_key(key, FileState::Active)
            .await?
            .into_iter()
            .next())
    }

    async fn find_file_by_id(&self, id: FileId) -> AppResult<File> {
        self.files
            .find_by_id(id, FileState::Active)
            .await?
            .ok_or_else(|| AppError::not_found(format!("File {id} not found")))
    }

    async fn list_files_by_path(&self, path: &str) -> AppResult<Vec<File>> {
        self.files.find_active_by_path(path).await
    }

    async fn list_files(&self) -> AppResult<Vec<File>> {
        self.files.find_all().await
    }

    async fn soft_delete_file(&self, id: FileId) -> AppResult<File> {
        self.files.soft_delete(id).await
    }

    async fn find_soft_deleted_file(&self, key: &FileKey) -> AppResult<File> {
        let rows = self.files.find_by_key(key, FileState::Trashed).await?;
        exactly_one(rows, key)
    }

    async fn restore_file(&self, key: &FileKey) -> AppResult<File> {
        self.files.restore(key).await
    }

    async fn health_check(&self) -> AppResult<bool> {
        self.db.health_check().await
    }
}

/// [`UserStore`] over the `users` table.
#[derive(Debug, Clone)]
pub struct PgUserStore {
    users: UserRepository,
}

impl PgUserStore {
    /// Build the store on a shared pool.
    pub fn new(db: &DatabasePool) -> Self {
        Self {
            users: UserRepository::new(db.pool().clone()),
        }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn create_user(&self, data: &CreateUser) -> AppResult<User> {
        self.users.create(data).await
    }

    async fn find_user_by_id(&self, id: UserId) -> AppResult<Option<User>> {
        self.users.find_by_id(id).await
    }

    async fn find_user_by_username(&self, username: &str) -> AppResult<Option<User>> {
        self.users.find_by_username(username).await
    }

    async fn mark_user_deleted(&self, id: UserId) -> AppResult<User> {
        self.users.update_status(id, UserStatus::Deleted).await
    }
}
