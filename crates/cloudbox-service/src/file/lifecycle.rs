//! Upload, trash and restore of single files.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::StreamExt;
use tracing::{debug, info, warn};

use cloudbox_core::error::{AppError, ErrorKind};
use cloudbox_core::result::AppResult;
use cloudbox_core::traits::storage::{BlobSource, ByteStream, Filesystem};
use cloudbox_core::types::FileId;
use cloudbox_database::MetadataStore;
use cloudbox_entity::file::{File, FileKey};
use cloudbox_storage::providers::DIR_MODE;
use cloudbox_storage::{PathPolicy, validate_logical_path, validate_segment};

/// Moves a file between the nonexistent, active and trashed states.
#[derive(Debug, Clone)]
pub struct FileLifecycle {
    /// Metadata store.
    store: Arc<dyn MetadataStore>,
    /// Filesystem holding root and trash.
    fs: Arc<dyn Filesystem>,
    /// Logical to on-disk path mapping.
    paths: PathPolicy,
    /// Largest accepted upload.
    max_upload_size_bytes: u64,
}

impl FileLifecycle {
    /// Creates a new file lifecycle.
    pub fn new(
        store: Arc<dyn MetadataStore>,
        fs: Arc<dyn Filesystem>,
        paths: PathPolicy,
        max_upload_size_bytes: u64,
    ) -> Self {
        Self {
            store,
            fs,
            paths,
            max_upload_size_bytes,
        }
    }

    /// The path policy in use.
    pub fn paths(&self) -> &PathPolicy {
        &self.paths
    }

    /// Check the key fields in the order file name, extension, path.
    pub fn validate(key: &FileKey) -> AppResult<()> {
        validate_segment("file_name", &key.file_name)?;
        validate_segment("extension", &key.extension)?;
        validate_logical_path(&key.path)
    }

    /// Whether an active file already holds this key.
    pub async fn check_duplication(&self, key: &FileKey) -> AppResult<bool> {
        Ok(self
            .store
            .find_file(key)
            .await
            .map_err(|e| e.context(format!("Checking for duplicate of '{key}'")))?
            .is_some())
    }

    /// Write the source's bytes at the key's location, then insert the row.
    ///
    /// The containing directory row must already exist. When the row
    /// insert fails the bytes stay on disk.
    pub async fn upload(&self, key: &FileKey, source: &mut dyn BlobSource) -> AppResult<File> {
        Self::validate(key)?;

        if self.check_duplication(key).await? {
            return Err(AppError::conflict(format!(
                "Duplicate name: '{key}' already exists"
            )));
        }

        if let Some(size) = source.size_hint() {
            if size > self.max_upload_size_bytes {
                return Err(self.too_large());
            }
        }

        self.store
            .find_directory(&key.path)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Directory '{}' not found", key.path)))?;

        let dest = self.paths.file_path(key);
        if let Some(existing) = self.fs.stat(&dest).await? {
            if existing.is_directory {
                return Err(AppError::conflict(format!(
                    "A directory occupies {}",
                    dest.display()
                )));
            }
            warn!(path = %dest.display(), "Overwriting untracked bytes at upload destination");
        }

        let stream = source
            .open()
            .await
            .map_err(|e| e.context(format!("Opening upload source for '{key}'")))?;
        let copied = self.write_bytes(&dest, stream).await;
        if let Err(e) = source.close().await {
            warn!(error = %e, key = %key, "Failed to close upload source");
        }
        let bytes = match copied {
            Ok(bytes) => bytes,
            Err(e) => {
                if let Err(cleanup) = self.fs.remove_file(&dest).await {
                    warn!(
                        path = %dest.display(),
                        error = %cleanup,
                        "Failed to remove partial upload"
                    );
                }
                return Err(e);
            }
        };

        let file = self.store.create_file(key).await.map_err(|e| {
            warn!(
                key = %key,
                path = %dest.display(),
                error = %e,
                "Bytes written but file row insert failed; bytes left on disk"
            );
            e.context(format!("Recording upload of '{key}'"))
        })?;

        info!(file_id = %file.id, key = %key, bytes, "File uploaded");
        Ok(file)
    }

    /// Move an active file's bytes to the trash, then mark its row trashed.
    pub async fn delete(&self, key: &FileKey) -> AppResult<File> {
        Self::validate(key)?;

        let file = self
            .store
            .find_file(key)
            .await?
            .ok_or_else(|| AppError::not_found(format!("File '{key}' not found")))?;

        let src = self.paths.file_path(key);
        let dst = self.paths.trash_file_path(key);
        match self.fs.stat(&src).await? {
            // Another delete of this key renamed the bytes and has not
            // committed yet.
            None if self.fs.stat(&dst).await?.is_some() => {
                return Err(AppError::conflict(format!(
                    "'{key}' was moved to trash by a concurrent operation"
                )));
            }
            None => {
                return Err(AppError::not_found(format!(
                    "Bytes for '{key}' are missing at {}",
                    src.display()
                )));
            }
            Some(meta) if meta.is_directory => {
                return Err(AppError::conflict(format!(
                    "{} is a directory, not a file",
                    src.display()
                )));
            }
            Some(_) => {}
        }

        if self.fs.stat(&dst).await?.is_some() {
            return Err(AppError::conflict(format!(
                "Trash already holds {}",
                dst.display()
            )));
        }
        self.ensure_parent(&dst).await?;

        self.move_bytes(&src, &dst)
            .await
            .map_err(|e| e.context(format!("Moving '{key}' to trash")))?;

        let trashed = self.store.soft_delete_file(file.id).await.map_err(|e| {
            warn!(
                file_id = %file.id,
                trash_path = %dst.display(),
                error = %e,
                "Bytes moved to trash but row was not marked trashed"
            );
            e.context(format!("Marking '{key}' trashed"))
        })?;

        info!(file_id = %trashed.id, key = %key, "File moved to trash");
        Ok(trashed)
    }

    /// The single trashed row for this key.
    pub async fn find_trashed(&self, key: &FileKey) -> AppResult<File> {
        self.store.find_soft_deleted_file(key).await
    }

    /// Move a trashed file's bytes back under root, then re-activate its row.
    ///
    /// Re-issuing a restore whose metadata commit failed skips the move
    /// and retries only the commit.
    pub async fn restore(&self, key: &FileKey) -> AppResult<File> {
        Self::validate(key)?;

        let trashed = self.find_trashed(key).await?;

        if self.check_duplication(key).await? {
            return Err(AppError::conflict(format!(
                "An active file '{key}' already exists"
            )));
        }

        let src = self.paths.trash_file_path(key);
        let dst = self.paths.file_path(key);
        let in_trash = self.fs.stat(&src).await?;
        let at_root = self.fs.stat(&dst).await?;

        match (in_trash, at_root) {
            (Some(meta), None) if !meta.is_directory => {
                self.ensure_parent(&dst).await?;
                self.move_bytes(&src, &dst)
                    .await
                    .map_err(|e| e.context(format!("Moving '{key}' out of trash")))?;
            }
            (None, Some(meta)) if !meta.is_directory => {
                debug!(key = %key, "Bytes already restored; committing metadata only");
            }
            (None, None) => {
                return Err(AppError::not_found(format!(
                    "Trashed bytes for '{key}' are missing at {}",
                    src.display()
                )));
            }
            _ => {
                return Err(AppError::conflict(format!(
                    "Cannot restore '{key}': {} is occupied",
                    dst.display()
                )));
            }
        }

        let restored = self.store.restore_file(key).await.map_err(|e| {
            warn!(
                file_id = %trashed.id,
                path = %dst.display(),
                error = %e,
                "Bytes restored but row is still trashed; re-issue restore"
            );
            e.context(format!("Re-activating '{key}'"))
        })?;

        info!(file_id = %restored.id, key = %key, "File restored");
        Ok(restored)
    }

    /// An active file by id.
    pub async fn get_file(&self, id: FileId) -> AppResult<File> {
        self.store.find_file_by_id(id).await
    }

    /// Active files directly inside a directory.
    pub async fn list_files(&self, path: &str) -> AppResult<Vec<File>> {
        validate_logical_path(path)?;
        self.store.list_files_by_path(path).await
    }

    /// An active file and a stream of its bytes.
    pub async fn open_file(&self, id: FileId) -> AppResult<(File, ByteStream)> {
        let file = self.get_file(id).await?;
        let stream = self
            .fs
            .open(&self.paths.file_path(&file.key()))
            .await
            .map_err(|e| e.context(format!("Opening '{}'", file.key())))?;
        Ok((file, stream))
    }

    async fn write_bytes(&self, dest: &Path, stream: ByteStream) -> AppResult<u64> {
        let limit = self.max_upload_size_bytes;
        let seen = Arc::new(AtomicU64::new(0));
        let counter = seen.clone();
        let limited: ByteStream = Box::pin(stream.map(move |chunk| {
            let chunk = chunk?;
            let total = counter.fetch_add(chunk.len() as u64, Ordering::Relaxed) + chunk.len() as u64;
            if total > limit {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    "upload exceeds size limit",
                ));
            }
            Ok(chunk)
        }));

        let mut sink = self.fs.create(dest).await?;
        let result = self.fs.copy(&mut sink, limited).await;
        drop(sink);

        result.map_err(|e| {
            if seen.load(Ordering::Relaxed) > limit {
                self.too_large()
            } else {
                e.context(format!("Writing {}", dest.display()))
            }
        })
    }

    async fn ensure_parent(&self, path: &Path) -> AppResult<()> {
        if let Some(parent) = path.parent() {
            self.fs.mkdir_all(parent, DIR_MODE).await?;
        }
        Ok(())
    }

    /// Rename that reports a vanished source as a lost race.
    async fn move_bytes(&self, from: &Path, to: &Path) -> AppResult<()> {
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

    fn too_large(&self) -> AppError {
        AppError::invalid_field(
            "content",
            format!(
                "File exceeds maximum upload size of {} bytes",
                self.max_upload_size_bytes
            ),
        )
    }
}
