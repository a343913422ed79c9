//! Shared test helpers for integration tests.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;

use cloudbox_auth::password::{PasswordHasher, PasswordValidator};
use cloudbox_core::config::{AuthConfig, TrashLayout};
use cloudbox_database::{MemoryMetadataStore, MemoryUserStore};
use cloudbox_service::{
    DirectoryLifecycle, FileLifecycle, Reconciler, StorageGateway, UserService,
};
use cloudbox_storage::{LocalFilesystem, PathPolicy};

/// Largest upload the test stack accepts.
pub const MAX_UPLOAD: u64 = 64 * 1024;

/// Services wired to a memory store and a temporary root and trash
pub struct TestApp {
    _dir: TempDir,
    /// Resolves logical paths under the temporary directories
    pub paths: PathPolicy,
    /// Metadata store shared by every service
    pub store: Arc<MemoryMetadataStore>,
    /// File and directory requests
    pub gateway: StorageGateway,
    /// Orphan audit
    pub reconciler: Reconciler,
}

impl TestApp {
    /// Create a new test application
    pub fn new(layout: TrashLayout) -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let root = dir.path().join("root");
        let trash = dir.path().join("trash");
        std::fs::create_dir_all(&root).expect("Failed to create root");
        std::fs::create_dir_all(&trash).expect("Failed to create trash");

        let paths = PathPolicy::new(
            root.to_str().expect("utf-8 temp path"),
            trash.to_str().expect("utf-8 temp path"),
            layout,
        );
        let store = Arc::new(MemoryMetadataStore::new());
        let fs = Arc::new(LocalFilesystem::new());

        let directories = DirectoryLifecycle::new(store.clone(), fs.clone(), paths.clone());
        let files = FileLifecycle::new(store.clone(), fs.clone(), paths.clone(), MAX_UPLOAD);

        Self {
            _dir: dir,
            gateway: StorageGateway::new(directories, files),
            reconciler: Reconciler::new(store.clone(), fs, paths.clone()),
            paths,
            store,
        }
    }

    /// Absolute path under root
    pub fn root(&self, logical: &str) -> PathBuf {
        self.paths.resolve_path(logical)
    }

    /// Absolute path under trash
    pub fn trash(&self, logical: &str) -> PathBuf {
        self.paths.resolve_trash_path(logical)
    }
}

/// A user service over an in-memory account table
pub fn user_service() -> UserService {
    UserService::new(
        Arc::new(MemoryUserStore::new()),
        Arc::new(PasswordHasher::new()),
        Arc::new(PasswordValidator::new(&AuthConfig::default())),
    )
}

/// Read a file's bytes, panicking if it is missing
pub fn read(path: &Path) -> Vec<u8> {
    std::fs::read(path).unwrap_or_else(|e| panic!("read {}: {e}", path.display()))
}
