//! Shared fixtures for the service unit tests.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::StreamExt;
use tempfile::TempDir;

use cloudbox_core::config::TrashLayout;
use cloudbox_core::error::AppError;
use cloudbox_core::result::AppResult;
use cloudbox_core::traits::storage::{ByteSink, ByteStream, Filesystem, FsMetadata};
use cloudbox_database::MemoryMetadataStore;
use cloudbox_storage::{LocalFilesystem, PathPolicy};

use crate::directory::DirectoryLifecycle;
use crate::file::FileLifecycle;
use crate::gateway::StorageGateway;
use crate::reconcile::Reconciler;

/// A filesystem step that [`FaultyFilesystem`] can be told to fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FsFault {
    /// Renames whose source lies under this path.
    RenameFrom(PathBuf),
    /// Every stream copy.
    Copy,
}

/// [`LocalFilesystem`] with switchable failures.
#[derive(Debug, Default)]
pub struct FaultyFilesystem {
    inner: LocalFilesystem,
    faults: Mutex<Vec<FsFault>>,
}

impl FaultyFilesystem {
    pub fn fail(&self, fault: FsFault) {
        self.faults.lock().unwrap().push(fault);
    }

    pub fn heal(&self) {
        self.faults.lock().unwrap().clear();
    }

    fn tripped(&self, check: impl Fn(&FsFault) -> bool) -> bool {
        self.faults.lock().unwrap().iter().any(check)
    }
}

#[async_trait]
impl Filesystem for FaultyFilesystem {
    async fn stat(&self, path: &Path) -> AppResult<Option<FsMetadata>> {
        self.inner.stat(path).await
    }

    async fn mkdir_all(&self, path: &Path, mode: u32) -> AppResult<()> {
        self.inner.mkdir_all(path, mode).await
    }

    async fn rename(&self, from: &Path, to: &Path) -> AppResult<()> {
        if self.tripped(|f| matches!(f, FsFault::RenameFrom(prefix) if from.starts_with(prefix))) {
            return Err(AppError::storage(format!(
                "Injected rename failure for {}",
                from.display()
            )));
        }
        self.inner.rename(from, to).await
    }

    async fn create(&self, path: &Path) -> AppResult<ByteSink> {
        self.inner.create(path).await
    }

    async fn copy(&self, dst: &mut ByteSink, src: ByteStream) -> AppResult<u64> {
        if self.tripped(|f| *f == FsFault::Copy) {
            // Write part of the stream so there is something to clean up.
            let partial: ByteStream = Box::pin(src.take(1));
            self.inner.copy(dst, partial).await?;
            return Err(AppError::storage("Injected copy failure"));
        }
        self.inner.copy(dst, src).await
    }

    async fn open(&self, path: &Path) -> AppResult<ByteStream> {
        self.inner.open(path).await
    }

    async fn remove_file(&self, path: &Path) -> AppResult<()> {
        self.inner.remove_file(path).await
    }

    async fn read_dir(&self, path: &Path) -> AppResult<Vec<FsMetadata>> {
        self.inner.read_dir(path).await
    }
}

/// A temp root and trash directory wired to a memory store.
pub struct Fixture {
    _dir: TempDir,
    pub paths: PathPolicy,
    pub store: Arc<MemoryMetadataStore>,
    pub fs: Arc<FaultyFilesystem>,
}

pub const MAX_UPLOAD: u64 = 1024;

impl Fixture {
    pub fn new(layout: TrashLayout) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("root");
        let trash = dir.path().join("trash");
        std::fs::create_dir_all(&root).unwrap();
        std::fs::create_dir_all(&trash).unwrap();
        Self {
            paths: PathPolicy::new(
                root.to_str().unwrap(),
                trash.to_str().unwrap(),
                layout,
            ),
            _dir: dir,
            store: Arc::new(MemoryMetadataStore::new()),
            fs: Arc::new(FaultyFilesystem::default()),
        }
    }

    pub fn files(&self) -> FileLifecycle {
        FileLifecycle::new(
            self.store.clone(),
            self.fs.clone(),
            self.paths.clone(),
            MAX_UPLOAD,
        )
    }

    pub fn directories(&self) -> DirectoryLifecycle {
        DirectoryLifecycle::new(self.store.clone(), self.fs.clone(), self.paths.clone())
    }

    pub fn gateway(&self) -> StorageGateway {
        StorageGateway::new(self.directories(), self.files())
    }

    pub fn reconciler(&self) -> Reconciler {
        Reconciler::new(self.store.clone(), self.fs.clone(), self.paths.clone())
    }

    pub fn root(&self, logical: &str) -> PathBuf {
        self.paths.resolve_path(logical)
    }

    pub fn trash(&self, logical: &str) -> PathBuf {
        self.paths.resolve_trash_path(logical)
    }
}

pub fn read(path: &Path) -> Vec<u8> {
    std::fs::read(path).unwrap()
}
