//! Create, delete and rename of directories.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, warn};

use cloudbox_core::config::TrashLayout;
use cloudbox_core::error::{AppError, ErrorKind};
use cloudbox_core::result::AppResult;
use cloudbox_core::traits::storage::Filesystem;
use cloudbox_database::{CascadeSummary, MetadataStore, RenameSummary};
use cloudbox_entity::directory::{Directory, is_within, rebase};
use cloudbox_storage::providers::DIR_MODE;
use cloudbox_storage::{PathPolicy, validate_logical_path};

/// Outcome of [`DirectoryLifecycle::delete`].
#[derive(Debug, Clone, Serialize)]
pub struct DirectoryDeletion {
    /// Logical path that was deleted.
    pub path: String,
    /// Where the subtree went, or `None` if it was already gone from disk.
    pub trashed_to: Option<PathBuf>,
    /// Where the subtree's trashed files went, if it had any on disk.
    pub trashed_files_to: Option<PathBuf>,
    /// Rows removed from the store.
    pub summary: CascadeSummary,
}

/// Keeps directory rows in step with directories under root.
#[derive(Debug, Clone)]
pub struct DirectoryLifecycle {
    /// Metadata store.
    store: Arc<dyn MetadataStore>,
    /// Filesystem holding root and trash.
    fs: Arc<dyn Filesystem>,
    /// Logical to on-disk path mapping.
    paths: PathPolicy,
}

impl DirectoryLifecycle {
    /// Creates a new directory lifecycle.
    pub fn new(store: Arc<dyn MetadataStore>, fs: Arc<dyn Filesystem>, paths: PathPolicy) -> Self {
        Self { store, fs, paths }
    }

    /// Make sure `path` exists on disk and has a row, ancestors included.
    ///
    /// The root `""` always exists and yields `None`.
    pub async fn create_if_absent(&self, path: &str) -> AppResult<Option<Directory>> {
        if path.is_empty() {
            return Ok(None);
        }
        validate_logical_path(path)?;

        let abs = self.paths.resolve_path(path);
        let pre_existing = match self.fs.stat(&abs).await? {
            Some(meta) if !meta.is_directory => {
                return Err(AppError::conflict(format!(
                    "{} exists and is not a directory",
                    abs.display()
                )));
            }
            Some(_) => true,
            None => {
                self.fs
                    .mkdir_all(&abs, DIR_MODE)
                    .await
                    .map_err(|e| e.context(format!("Creating directory '{path}'")))?;
                false
            }
        };

        let mut directory = None;
        for prefix in ancestors_and_self(path) {
            directory = Some(self.ensure_row(prefix, pre_existing).await?);
        }
        Ok(directory)
    }

    async fn ensure_row(&self, path: &str, pre_existing: bool) -> AppResult<Directory> {
        if let Some(existing) = self.store.find_directory(path).await? {
            return Ok(existing);
        }

        match self.store.create_directory(path).await {
            Ok(directory) => {
                if pre_existing {
                    info!(path, directory_id = %directory.id, "Recorded directory that already existed on disk");
                } else {
                    info!(path, directory_id = %directory.id, "Directory created");
                }
                Ok(directory)
            }
            Err(e) if e.is(ErrorKind::Conflict) => {
                debug!(path, "Directory row inserted concurrently");
                self.store.find_directory(path).await?.ok_or(e)
            }
            Err(e) => Err(e.context(format!("Recording directory '{path}'"))),
        }
    }

    /// Move the directory subtree to the trash, then drop its rows.
    ///
    /// If the subtree is already gone from disk only the rows are removed,
    /// which also completes a delete whose metadata step failed earlier.
    pub async fn delete(&self, path: &str) -> AppResult<DirectoryDeletion> {
        validate_logical_path(path)?;
        self.store
            .find_directory(path)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Directory '{path}' not found")))?;

        let src = self.paths.resolve_path(path);
        let trashed_to = match self.fs.stat(&src).await? {
            Some(meta) if meta.is_directory => {
                let dst = self.trash_destination(path).await?;
                self.ensure_parent(&dst).await?;
                self.move_tree(&src, &dst)
                    .await
                    .map_err(|e| e.context(format!("Moving directory '{path}' to trash")))?;
                Some(dst)
            }
            Some(_) => {
                return Err(AppError::conflict(format!(
                    "{} is not a directory",
                    src.display()
                )));
            }
            None => {
                warn!(path, "Directory missing on disk; removing rows only");
                None
            }
        };

        let trashed_files_to = self.sweep_trashed_files(path, trashed_to.as_deref()).await?;

        let summary = self.store.delete_directory_cascade(path).await.map_err(|e| {
            warn!(
                path,
                error = %e,
                "Directory moved to trash but its rows remain; re-issue delete"
            );
            e.context(format!("Deleting rows under '{path}'"))
        })?;

        info!(
            path,
            files_removed = summary.files_removed,
            directories_removed = summary.directories_removed,
            "Directory deleted"
        );
        Ok(DirectoryDeletion {
            path: path.to_string(),
            trashed_to,
            trashed_files_to,
            summary,
        })
    }

    /// Move the trash bytes of trashed files under `path` next to the
    /// deleted subtree, into `<subtree>.trashed`.
    /// Their rows go away with the cascade.
    async fn sweep_trashed_files(
        &self,
        path: &str,
        subtree: Option<&Path>,
    ) -> AppResult<Option<PathBuf>> {
        let mut pending = Vec::new();
        for file in self.store.list_files().await? {
            if !file.is_trashed() || !is_within(&file.path, path) {
                continue;
            }
            let key = file.key();
            let src = self.paths.trash_file_path(&key);
            match self.fs.stat(&src).await? {
                Some(meta) if !meta.is_directory => pending.push((key, src)),
                _ => debug!(key = %key, "Trashed bytes already gone; nothing to sweep"),
            }
        }
        if pending.is_empty() {
            return Ok(None);
        }

        let base = match subtree {
            Some(dst) => dst.to_path_buf(),
            None => self.trash_destination(path).await?,
        };
        let mut area = base.into_os_string();
        area.push(".trashed");
        let area = PathBuf::from(area);

        for (key, src) in pending {
            let relative = rebase(&key.path, path, "").unwrap_or_default();
            let dst = area
                .join(relative.trim_start_matches('/'))
                .join(format!("{}.{}", key.file_name, key.extension));
            self.ensure_parent(&dst).await?;
            self.move_tree(&src, &dst)
                .await
                .map_err(|e| e.context(format!("Sweeping trashed '{key}' out of '{path}'")))?;
        }
        Ok(Some(area))
    }

    async fn trash_destination(&self, path: &str) -> AppResult<PathBuf> {
        let plain = self.paths.directory_trash_path(path);
        if self.fs.stat(&plain).await?.is_none() {
            return Ok(plain);
        }
        let stamped = self.paths.timestamped_trash_path(path, Utc::now());
        if self.fs.stat(&stamped).await?.is_some() {
            return Err(AppError::conflict(format!(
                "Trash already holds {}",
                stamped.display()
            )));
        }
        Ok(stamped)
    }

    /// Rename `from` to `to` on disk, then rewrite every row under it.
    ///
    /// With the mirrored trash layout the trashed bytes under `from` move
    /// along so they stay restorable.
    pub async fn rename(&self, from: &str, to: &str) -> AppResult<RenameSummary> {
        validate_logical_path(from)?;
        validate_logical_path(to)?;
        if is_within(to, from) {
            return Err(AppError::invalid_field(
                "path",
                format!("Cannot move '{from}' into '{to}'"),
            ));
        }

        self.store
            .find_directory(from)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Directory '{from}' not found")))?;
        if self.store.find_directory(to).await?.is_some() {
            return Err(AppError::conflict(format!("Directory '{to}' already exists")));
        }

        let src = self.paths.resolve_path(from);
        let dst = self.paths.resolve_path(to);
        let needs_move = match (self.fs.stat(&src).await?, self.fs.stat(&dst).await?) {
            (Some(meta), None) if meta.is_directory => true,
            (None, Some(meta)) if meta.is_directory => {
                debug!(from, to, "Directory already renamed on disk; committing metadata only");
                false
            }
            (None, None) => {
                return Err(AppError::not_found(format!(
                    "Directory '{from}' is missing on disk"
                )));
            }
            _ => {
                return Err(AppError::conflict(format!(
                    "Cannot rename '{from}': {} is occupied",
                    dst.display()
                )));
            }
        };

        let trash_move = self.trash_mirror_move(from, to).await?;

        if needs_move {
            if let Some((parent, _)) = to.rsplit_once('/') {
                self.create_if_absent(parent).await?;
            }
            self.move_tree(&src, &dst)
                .await
                .map_err(|e| e.context(format!("Renaming directory '{from}' to '{to}'")))?;
        }

        if let Some((tsrc, tdst)) = trash_move {
            self.ensure_parent(&tdst).await?;
            self.move_tree(&tsrc, &tdst)
                .await
                .map_err(|e| e.context(format!("Renaming trash of '{from}' to '{to}'")))?;
        }

        let summary = self.store.rename_directory(from, to).await.map_err(|e| {
            warn!(
                from,
                to,
                error = %e,
                "Directory renamed on disk but rows still use the old path; re-issue rename"
            );
            e.context(format!("Rewriting rows from '{from}' to '{to}'"))
        })?;

        info!(
            from,
            to,
            files_moved = summary.files_moved,
            directories_moved = summary.directories_moved,
            "Directory renamed"
        );
        Ok(summary)
    }

    async fn trash_mirror_move(&self, from: &str, to: &str) -> AppResult<Option<(PathBuf, PathBuf)>> {
        if self.paths.layout() != TrashLayout::Mirrored {
            return Ok(None);
        }
        let tsrc = self.paths.resolve_trash_path(from);
        let tdst = self.paths.resolve_trash_path(to);
        match (self.fs.stat(&tsrc).await?, self.fs.stat(&tdst).await?) {
            (Some(_), None) => Ok(Some((tsrc, tdst))),
            (Some(_), Some(_)) => Err(AppError::conflict(format!(
                "Trash already holds {}",
                tdst.display()
            ))),
            _ => Ok(None),
        }
    }

    /// Every directory row.
    pub async fn list(&self) -> AppResult<Vec<Directory>> {
        self.store.list_directories().await
    }

    async fn ensure_parent(&self, path: &Path) -> AppResult<()> {
        if let Some(parent) = path.parent() {
            self.fs.mkdir_all(parent, DIR_MODE).await?;
        }
        Ok(())
    }

    async fn move_tree(&self, from: &Path, to: &Path) -> AppResult<()> {
        self.fs.rename(from, to).await.map_err(|e| {
            if e.is(ErrorKind::NotFound) {
                AppError::conflict(format!(
                    "{} was moved by a concurrent operation",
                    from.display()
                ))
            } else {
                e
            }
        })
    }
}

/// `/a/b/c` yields `/a`, `/a/b`, `/a/b/c`.
fn ancestors_and_self(path: &str) -> impl Iterator<Item = &str> {
    path.match_indices('/')
        .map(|(idx, _)| idx)
        .filter(|&idx| idx > 0)
        .map(move |idx| &path[..idx])
        .chain(std::iter::once(path))
}
