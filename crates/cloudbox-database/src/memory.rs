//! In-memory store implementations.
//!
//! Multi-row operations work on a copy of the tables and swap it in only
//! when every step succeeded, so an injected [`FaultPoint`] leaves the
//! tables exactly as they were.

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use cloudbox_core::error::AppError;
use cloudbox_core::result::AppResult;
use cloudbox_core::types::{DirectoryId, FileId, UserId};
use cloudbox_entity::directory::{Directory, is_within, rebase};
use cloudbox_entity::file::{File, FileKey, FileState};
use cloudbox_entity::user::{CreateUser, User, UserStatus};

use crate::repositories::file::exactly_one;
use crate::store::{CascadeSummary, MetadataStore, RenameSummary, UserStore};

/// A store step that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultPoint {
    /// Inserting a directory row.
    CreateDirectory,
    /// Deleting file rows during a cascade.
    DeleteDirectoryFiles,
    /// Deleting directory rows during a cascade.
    DeleteDirectoryRow,
    /// Rewriting file paths during a rename.
    RenameFiles,
    /// Rewriting directory paths during a rename.
    RenameDirectories,
    /// Inserting a file row.
    CreateFile,
    /// Looking up an active file by key.
    FindFile,
    /// Marking a file trashed.
    SoftDeleteFile,
    /// Re-activating a trashed file.
    RestoreFile,
}

#[derive(Debug, Clone, Default)]
struct Tables {
    directories: Vec<Directory>,
    files: Vec<File>,
}

/// [`MetadataStore`] kept in process memory.
#[derive(Debug, Default)]
pub struct MemoryMetadataStore {
    tables: RwLock<Tables>,
    faults: Mutex<HashSet<FaultPoint>>,
}

impl MemoryMetadataStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every later call through `point` fail with a database error.
    pub fn fail_on(&self, point: FaultPoint) {
        if let Ok(mut faults) = self.faults.lock() {
            faults.insert(point);
        }
    }

    /// Stop failing at `point`.
    pub fn clear_fault(&self, point: FaultPoint) {
        if let Ok(mut faults) = self.faults.lock() {
            faults.remove(&point);
        }
    }

    /// Insert a trashed row directly, bypassing the active-key check.
    ///
    /// Used to seed states the lifecycle never produces on its own, such
    /// as two trashed rows sharing one key.
    pub async fn insert_trashed(&self, key: &FileKey) -> AppResult<File> {
        let mut tables = self.tables.write().await;
        let directory_id = owning_directory(&tables, &key.path)?;
        let now = Utc::now();
        let file = File {
            id: FileId::new(),
            file_name: key.file_name.clone(),
            extension: key.extension.clone(),
            path: key.path.clone(),
            directory_id,
            state: FileState::Trashed,
            created_at: now,
            updated_at: now,
            deleted_at: Some(now),
        };
        tables.files.push(file.clone());
        Ok(file)
    }

    fn check(&self, point: FaultPoint) -> AppResult<()> {
        let armed = self
            .faults
            .lock()
            .map(|faults| faults.contains(&point))
            .unwrap_or(false);
        if armed {
            return Err(AppError::database(format!("Injected fault at {point:?}")));
        }
        Ok(())
    }
}

fn owning_directory(tables: &Tables, path: &str) -> AppResult<DirectoryId> {
    tables
        .directories
        .iter()
        .find(|d| d.path == path)
        .map(|d| d.id)
        .ok_or_else(|| AppError::not_found(format!("Directory '{path}' not found")))
}

fn active_taken(tables: &Tables, key: &FileKey, except: Option<FileId>) -> bool {
    tables
        .files
        .iter()
        .any(|f| f.state == FileState::Active && key.matches(f) && Some(f.id) != except)
}

#[async_trait]
impl MetadataStore for MemoryMetadataStore {
    async fn create_directory(&self, path: &str) -> AppResult<Directory> {
        self.check(FaultPoint::CreateDirectory)?;
        let mut tables = self.tables.write().await;
        if tables.directories.iter().any(|d| d.path == path) {
            return Err(AppError::conflict(format!("Directory '{path}' already exists")));
        }
        let now = Utc::now();
        let directory = Directory {
            id: DirectoryId::new(),
            path: path.to_string(),
            created_at: now,
            updated_at: now,
        };
        tables.directories.push(directory.clone());
        Ok(directory)
    }

    async fn find_directory(&self, path: &str) -> AppResult<Option<Directory>> {
        let tables = self.tables.read().await;
        Ok(tables.directories.iter().find(|d| d.path == path).cloned())
    }

    async fn list_directories(&self) -> AppResult<Vec<Directory>> {
        let tables = self.tables.read().await;
        let mut all = tables.directories.clone();
        all.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(all)
    }

    async fn delete_directory_cascade(&self, path: &str) -> AppResult<CascadeSummary> {
        let mut tables = self.tables.write().await;
        if !tables.directories.iter().any(|d| d.path == path) {
            return Err(AppError::not_found(format!("Directory '{path}' not found")));
        }

        let mut draft = tables.clone();

        self.check(FaultPoint::DeleteDirectoryFiles)?;
        let before = draft.files.len();
        draft.files.retain(|f| !is_within(&f.path, path));
        let files_removed = (before - draft.files.len()) as u64;

        self.check(FaultPoint::DeleteDirectoryRow)?;
        let before = draft.directories.len();
        draft.directories.retain(|d| !is_within(&d.path, path));
        let directories_removed = (before - draft.directories.len()) as u64;

        *tables = draft;
        Ok(CascadeSummary {
            files_removed,
            directories_removed,
        })
    }

    async fn rename_directory(&self, from: &str, to: &str) -> AppResult<RenameSummary> {
        let mut tables = self.tables.write().await;
        if !tables.directories.iter().any(|d| d.path == from) {
            return Err(AppError::not_found(format!("Directory '{from}' not found")));
        }
        if tables.directories.iter().any(|d| d.path == to) {
            return Err(AppError::conflict(format!("Directory '{to}' already exists")));
        }

        let mut draft = tables.clone();
        let now = Utc::now();

        self.check(FaultPoint::RenameFiles)?;
        let mut files_moved = 0;
        for file in draft.files.iter_mut() {
            if let Some(path) = rebase(&file.path, from, to) {
                file.path = path;
                file.updated_at = now;
                files_moved += 1;
            }
        }

        self.check(FaultPoint::RenameDirectories)?;
        let mut directories_moved = 0;
        for directory in draft.directories.iter_mut() {
            if let Some(path) = rebase(&directory.path, from, to) {
                directory.path = path;
                directory.updated_at = now;
                directories_moved += 1;
            }
        }

        let mut seen = HashSet::new();
        if !draft.directories.iter().all(|d| seen.insert(d.path.as_str())) {
            return Err(AppError::conflict(format!(
                "Directories under '{to}' already exist"
            )));
        }

        *tables = draft;
        Ok(RenameSummary {
            files_moved,
            directories_moved,
        })
    }

    async fn create_file(&self, key: &FileKey) -> AppResult<File> {
        self.check(FaultPoint::CreateFile)?;
        let mut tables = self.tables.write().await;
        let directory_id = owning_directory(&tables, &key.path)?;
        if active_taken(&tables, key, None) {
            return Err(AppError::conflict(format!("File '{key}' already exists")));
        }
        let now = Utc::now();
        let file = File {
            id: FileId::new(),
            file_name: key.file_name.clone(),
            extension: key.extension.clone(),
            path: key.path.clone(),
            directory_id,
            state: FileState::Active,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        tables.files.push(file.clone());
        Ok(file)
    }

    async fn find_file(&self, key: &FileKey) -> AppResult<Option<File>> {
        self.check(FaultPoint::FindFile)?;
        let tables = self.tables.read().await;
        Ok(tables
            .files
            .iter()
            .find(|f| f.state == FileState::Active && key.matches(f))
            .cloned())
    }

    async fn find_file_by_id(&self, id: FileId) -> AppResult<File> {
        let tables = self.tables.read().await;
        tables
            .files
            .iter()
            .find(|f| f.id == id && f.state == FileState::Active)
            .cloned()
            .ok_or_else(|| AppError::not_found(format!("File {id} not found")))
    }

    async fn list_files_by_path(&self, path: &str) -> AppResult<Vec<File>> {
        let tables = self.tables.read().await;
        let mut found: Vec<File> = tables
            .files
            .iter()
            .filter(|f| f.path == path && f.state == FileState::Active)
            .cloned()
            .collect();
        found.sort_by(|a, b| {
            (a.file_name.as_str(), a.extension.as_str())
                .cmp(&(b.file_name.as_str(), b.extension.as_str()))
        });
        Ok(found)
    }

    async fn list_files(&self) -> AppResult<Vec<File>> {
        let tables = self.tables.read().await;
        let mut all = tables.files.clone();
        all.sort_by(|a, b| {
            (a.path.as_str(), a.file_name.as_str(), a.extension.as_str()).cmp(&(
                b.path.as_str(),
                b.file_name.as_str(),
                b.extension.as_str(),
            ))
        });
        Ok(all)
    }

    async fn soft_delete_file(&self, id: FileId) -> AppResult<File> {
        self.check(FaultPoint::SoftDeleteFile)?;
        let mut tables = self.tables.write().await;
        let file = tables
            .files
            .iter_mut()
            .find(|f| f.id == id && f.state == FileState::Active)
            .ok_or_else(|| AppError::not_found(format!("Active file {id} not found")))?;
        let now = Utc::now();
        file.state = FileState::Trashed;
        file.deleted_at = Some(now);
        file.updated_at = now;
        Ok(file.clone())
    }

    async fn find_soft_deleted_file(&self, key: &FileKey) -> AppResult<File> {
        let tables = self.tables.read().await;
        let rows = tables
            .files
            .iter()
            .filter(|f| f.state == FileState::Trashed && key.matches(f))
            .cloned()
            .collect();
        exactly_one(rows, key)
    }

    async fn restore_file(&self, key: &FileKey) -> AppResult<File> {
        self.check(FaultPoint::RestoreFile)?;
        let mut tables = self.tables.write().await;
        let rows: Vec<File> = tables
            .files
            .iter()
            .filter(|f| f.state == FileState::Trashed && key.matches(f))
            .cloned()
            .collect();
        let target = exactly_one(rows, key)?;
        if active_taken(&tables, key, Some(target.id)) {
            return Err(AppError::conflict(format!(
                "An active file '{key}' already exists"
            )));
        }
        let file = tables
            .files
            .iter_mut()
            .find(|f| f.id == target.id)
            .ok_or_else(|| AppError::not_found(format!("File {} not found", target.id)))?;
        file.state = FileState::Active;
        file.deleted_at = None;
        file.updated_at = Utc::now();
        Ok(file.clone())
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(true)
    }
}

/// [`UserStore`] kept in process memory.
#[derive(Debug, Default)]
pub struct MemoryUserStore {
    users: RwLock<Vec<User>>,
}

impl MemoryUserStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn create_user(&self, data: &CreateUser) -> AppResult<User> {
        let mut users = self.users.write().await;
        if users
            .iter()
            .any(|u| u.username.eq_ignore_ascii_case(&data.username))
        {
            return Err(AppError::conflict(format!(
                "Username '{}' already exists",
                data.username
            )));
        }
        let now = Utc::now();
        let user = User {
            id: UserId::new(),
            username: data.username.clone(),
            password_hash: data.password_hash.clone(),
            status: UserStatus::Active,
            created_at: now,
            updated_at: now,
        };
        users.push(user.clone());
        Ok(user)
    }

    async fn find_user_by_id(&self, id: UserId) -> AppResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> AppResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users
            .iter()
            .find(|u| u.username.eq_ignore_ascii_case(username))
            .cloned())
    }

    async fn mark_user_deleted(&self, id: UserId) -> AppResult<User> {
        let mut users = self.users.write().await;
        let user = users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or_else(|| AppError::not_found(format!("User {id} not found")))?;
        user.status = UserStatus::Deleted;
        user.updated_at = Utc::now();
        Ok(user.clone())
    }
}
