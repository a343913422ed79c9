//! Entry point for file requests.
//!
//! Runs the per-request checks in order (field validation, duplicate
//! check, containing directory) before handing off to the lifecycles.

use tracing::debug;

use cloudbox_core::error::AppError;
use cloudbox_core::result::AppResult;
use cloudbox_core::traits::storage::BlobSource;
use cloudbox_entity::file::{File, FileKey};

use crate::directory::DirectoryLifecycle;
use crate::file::FileLifecycle;

/// Composes the directory and file lifecycles for callers.
#[derive(Debug, Clone)]
pub struct StorageGateway {
    directories: DirectoryLifecycle,
    files: FileLifecycle,
}

impl StorageGateway {
    /// Creates a new gateway.
    pub fn new(directories: DirectoryLifecycle, files: FileLifecycle) -> Self {
        Self { directories, files }
    }

    /// The directory lifecycle.
    pub fn directories(&self) -> &DirectoryLifecycle {
        &self.directories
    }

    /// The file lifecycle.
    pub fn files(&self) -> &FileLifecycle {
        &self.files
    }

    /// Upload into `key.path`, creating the directory if needed.
    pub async fn upload(&self, key: &FileKey, source: &mut dyn BlobSource) -> AppResult<File> {
        FileLifecycle::validate(key)?;
        if self.files.check_duplication(key).await? {
            return Err(AppError::conflict(format!(
                "Duplicate name: '{key}' already exists"
            )));
        }
        self.directories.create_if_absent(&key.path).await?;
        self.files.upload(key, source).await
    }

    /// Move a file to the trash.
    pub async fn delete(&self, key: &FileKey) -> AppResult<File> {
        self.files.delete(key).await
    }

    /// Restore a trashed file, recreating its directory if needed.
    pub async fn restore(&self, key: &FileKey) -> AppResult<File> {
        FileLifecycle::validate(key)?;
        let trashed = self.files.find_trashed(key).await?;
        debug!(file_id = %trashed.id, key = %key, "Restoring trashed file");
        self.directories.create_if_absent(&key.path).await?;
        self.files.restore(key).await
    }
}

#[cfg(test)]
mod tests {
    use cloudbox_core::config::TrashLayout;
    use cloudbox_core::error::ErrorKind;
    use cloudbox_database::MetadataStore;
    use cloudbox_storage::BytesBlob;

    use crate::testing::{Fixture, read};

    use super::*;

    #[tokio::test]
    async fn test_upload_creates_missing_directories() {
        let fx = Fixture::new(TrashLayout::Mirrored);
        let key = FileKey::new("song", "mp3", "/music/live");
        fx.gateway()
            .upload(&key, &mut BytesBlob::new("la"))
            .await
            .unwrap();

        assert_eq!(read(&fx.root("/music/live/song.mp3")), b"la");
        assert!(fx.store.find_directory("/music").await.unwrap().is_some());
        assert!(fx.store.find_directory("/music/live").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_rejected_upload_creates_nothing() {
        let fx = Fixture::new(TrashLayout::Mirrored);
        let err = fx
            .gateway()
            .upload(&FileKey::new("", "mp3", "/music"), &mut BytesBlob::new("la"))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
        assert!(!fx.root("/music").exists());
        assert!(fx.store.list_directories().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_restore_recreates_deleted_parent() {
        let fx = Fixture::new(TrashLayout::Flat);
        let gateway = fx.gateway();
        let key = FileKey::new("report", "pdf", "/docs");
        gateway
            .upload(&key, &mut BytesBlob::new("pdf"))
            .await
            .unwrap();
        gateway.delete(&key).await.unwrap();
        std::fs::remove_dir(fx.root("/docs")).unwrap();

        gateway.restore(&key).await.unwrap();
        assert_eq!(read(&fx.root("/docs/report.pdf")), b"pdf");
    }

    #[tokio::test]
    async fn test_restore_of_unknown_file_creates_nothing() {
        let fx = Fixture::new(TrashLayout::Flat);
        let err = fx
            .gateway()
            .restore(&FileKey::new("ghost", "txt", "/nowhere"))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
        assert!(!fx.root("/nowhere").exists());
    }
}
