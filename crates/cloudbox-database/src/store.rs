//! Store traits consumed by the service layer.
//!
//! The lifecycle services depend on these traits rather than on a
//! concrete driver. [`crate::postgres`] implements them with sqlx and
//! [`crate::memory`] with in-process tables.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use cloudbox_core::result::AppResult;
use cloudbox_core::types::{FileId, UserId};
use cloudbox_entity::directory::Directory;
use cloudbox_entity::file::{File, FileKey};
use cloudbox_entity::user::{CreateUser, User};

/// Rows removed by [`MetadataStore::delete_directory_cascade`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CascadeSummary {
    /// File rows removed, in any state.
    pub files_removed: u64,
    /// Directory rows removed, the target included.
    pub directories_removed: u64,
}

/// Rows rewritten by [`MetadataStore::rename_directory`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenameSummary {
    /// File rows whose path was rewritten.
    pub files_moved: u64,
    /// Directory rows whose path was rewritten, the target included.
    pub directories_moved: u64,
}

/// Persistence for directory and file metadata.
///
/// Errors carry `NotFound`, `Conflict` or `Database` kinds. Multi-row
/// operations are atomic: they commit entirely or not at all.
#[async_trait]
pub trait MetadataStore: Send + Sync + std::fmt::Debug + 'static {
    /// Insert a directory row. `Conflict` if the path already exists.
    async fn create_directory(&self, path: &str) -> AppResult<Directory>;

    /// Look up a directory row by path.
    async fn find_directory(&self, path: &str) -> AppResult<Option<Directory>>;

    /// Every directory row, ordered by path.
    async fn list_directories(&self) -> AppResult<Vec<Directory>>;

    /// Delete every file row and directory row at or below `path`.
    ///
    /// File rows go first; if that step fails no directory row is touched.
    async fn delete_directory_cascade(&self, path: &str) -> AppResult<CascadeSummary>;

    /// Rewrite `from` to `to` on every directory and file row at or below `from`.
    ///
    /// `NotFound` if `from` has no row, `Conflict` if `to` already has one.
    async fn rename_directory(&self, from: &str, to: &str) -> AppResult<RenameSummary>;

    /// Insert an active file row owned by the directory at `key.path`.
    ///
    /// `NotFound` if that directory has no row; directories are never
    /// created implicitly here. `Conflict` on an active duplicate.
    async fn create_file(&self, key: &FileKey) -> AppResult<File>;

    /// The active file row with this key, if any.
    async fn find_file(&self, key: &FileKey) -> AppResult<Option<File>>;

    /// An active file row by id. `NotFound` if absent or trashed.
    async fn find_file_by_id(&self, id: FileId) -> AppResult<File>;

    /// Active files directly inside `path`, ordered by name.
    async fn list_files_by_path(&self, path: &str) -> AppResult<Vec<File>>;

    /// Every file row in any state, ordered by path and name.
    async fn list_files(&self) -> AppResult<Vec<File>>;

    /// Mark an active file as trashed and stamp `deleted_at`.
    async fn soft_delete_file(&self, id: FileId) -> AppResult<File>;

    /// The single trashed row with this key.
    ///
    /// `NotFound` when none matches, `Conflict` when several do.
    async fn find_soft_deleted_file(&self, key: &FileKey) -> AppResult<File>;

    /// Re-activate the single trashed row with this key.
    ///
    /// Fails like [`Self::find_soft_deleted_file`] unless exactly one row is located.
    async fn restore_file(&self, key: &FileKey) -> AppResult<File>;

    /// Check store connectivity.
    async fn health_check(&self) -> AppResult<bool>;
}

/// Persistence for user accounts.
#[async_trait]
pub trait UserStore: Send + Sync + std::fmt::Debug + 'static {
    /// Insert a user. `Conflict` if the username is taken (case-insensitive).
    async fn create_user(&self, data: &CreateUser) -> AppResult<User>;

    /// Find a user by id.
    async fn find_user_by_id(&self, id: UserId) -> AppResult<Option<User>>;

    /// Find a user by username (case-insensitive).
    async fn find_user_by_username(&self, username: &str) -> AppResult<Option<User>>;

    /// Mark a user as deleted. `NotFound` if the id is unknown.
    async fn mark_user_deleted(&self, id: UserId) -> AppResult<User>;
}
