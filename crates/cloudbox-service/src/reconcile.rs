//! Orphan audit across the filesystem and the metadata store.
//!
//! The audit only reports. Every finding is left for an operator to
//! resolve, usually by re-issuing the lifecycle operation that failed.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use cloudbox_core::result::AppResult;
use cloudbox_core::traits::storage::Filesystem;
use cloudbox_database::MetadataStore;
use cloudbox_entity::file::{FileKey, FileState};
use cloudbox_storage::PathPolicy;

/// What [`Reconciler::reconcile_orphans`] found.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    /// Files under root with no active row.
    pub untracked_files: Vec<PathBuf>,
    /// Active rows whose bytes are missing under root.
    pub missing_files: Vec<FileKey>,
    /// Files under trash with no trashed row.
    pub untracked_trash: Vec<PathBuf>,
    /// Trashed rows whose bytes are missing under trash.
    pub missing_trash: Vec<FileKey>,
    /// Directories under root with no row.
    pub untracked_directories: Vec<String>,
    /// Directory rows with nothing on disk.
    pub missing_directories: Vec<String>,
    /// Files left by completed directory deletes. Safe to purge; not a
    /// disagreement.
    pub deleted_directory_files: Vec<PathBuf>,
}

impl ReconcileReport {
    /// Whether the two stores agree completely.
    pub fn is_clean(&self) -> bool {
        self.untracked_files.is_empty()
            && self.missing_files.is_empty()
            && self.untracked_trash.is_empty()
            && self.missing_trash.is_empty()
            && self.untracked_directories.is_empty()
            && self.missing_directories.is_empty()
    }

    /// Total number of disagreements.
    pub fn len(&self) -> usize {
        self.untracked_files.len()
            + self.missing_files.len()
            + self.untracked_trash.len()
            + self.missing_trash.len()
            + self.untracked_directories.len()
            + self.missing_directories.len()
    }

    /// Whether there are no findings.
    pub fn is_empty(&self) -> bool {
        self.is_clean()
    }
}

/// Compares root, trash and the metadata store.
#[derive(Debug, Clone)]
pub struct Reconciler {
    store: Arc<dyn MetadataStore>,
    fs: Arc<dyn Filesystem>,
    paths: PathPolicy,
}

struct Walk {
    files: Vec<PathBuf>,
    directories: Vec<PathBuf>,
}

impl Reconciler {
    /// Creates a new reconciler.
    pub fn new(store: Arc<dyn MetadataStore>, fs: Arc<dyn Filesystem>, paths: PathPolicy) -> Self {
        Self { store, fs, paths }
    }

    /// List bytes without rows and rows without bytes.
    pub async fn reconcile_orphans(&self) -> AppResult<ReconcileReport> {
        let rows = self.store.list_files().await?;
        let directory_rows = self.store.list_directories().await?;

        let mut expected_root = HashSet::new();
        let mut expected_trash = HashSet::new();
        for file in &rows {
            let key = file.key();
            match file.state {
                FileState::Active => expected_root.insert(self.paths.file_path(&key)),
                FileState::Trashed => expected_trash.insert(self.paths.trash_file_path(&key)),
            };
        }

        let deleted_area = self.paths.deleted_directories_root();
        let root = self.walk(self.paths.resolve_path(""), None).await?;
        let trash = self
            .walk(self.paths.resolve_trash_path(""), Some(&deleted_area))
            .await?;
        let deleted = self.walk(deleted_area.clone(), None).await?;
        let on_disk_root: HashSet<&PathBuf> = root.files.iter().collect();
        let on_disk_trash: HashSet<&PathBuf> = trash.files.iter().collect();

        let mut report = ReconcileReport {
            deleted_directory_files: deleted.files,
            ..ReconcileReport::default()
        };

        report.untracked_files = root
            .files
            .iter()
            .filter(|p| !expected_root.contains(*p))
            .cloned()
            .collect();
        report.untracked_trash = trash
            .files
            .iter()
            .filter(|p| !expected_trash.contains(*p))
            .cloned()
            .collect();

        for file in &rows {
            let key = file.key();
            match file.state {
                FileState::Active if !on_disk_root.contains(&self.paths.file_path(&key)) => {
                    report.missing_files.push(key);
                }
                FileState::Trashed
                    if !on_disk_trash.contains(&self.paths.trash_file_path(&key)) =>
                {
                    report.missing_trash.push(key);
                }
                _ => {}
            }
        }

        let known: HashSet<&str> = directory_rows.iter().map(|d| d.path.as_str()).collect();
        let mut on_disk_dirs = HashSet::new();
        for dir in &root.directories {
            if let Some(logical) = self.paths.logical_path(dir) {
                if !known.contains(logical.as_str()) {
                    report.untracked_directories.push(logical.clone());
                }
                on_disk_dirs.insert(logical);
            }
        }
        report.missing_directories = directory_rows
            .iter()
            .filter(|d| !on_disk_dirs.contains(&d.path))
            .map(|d| d.path.clone())
            .collect();

        if report.is_clean() {
            info!(
                files = rows.len(),
                directories = directory_rows.len(),
                purgeable = report.deleted_directory_files.len(),
                "Reconciliation clean"
            );
        } else {
            warn!(
                untracked_files = report.untracked_files.len(),
                missing_files = report.missing_files.len(),
                untracked_trash = report.untracked_trash.len(),
                missing_trash = report.missing_trash.len(),
                untracked_directories = report.untracked_directories.len(),
                missing_directories = report.missing_directories.len(),
                "Filesystem and metadata disagree"
            );
        }
        Ok(report)
    }

    /// Every file and directory below `top`, depth first, leaving out
    /// `skip` and everything under it.
    async fn walk(&self, top: PathBuf, skip: Option<&Path>) -> AppResult<Walk> {
        let mut walk = Walk {
            files: Vec::new(),
            directories: Vec::new(),
        };
        let mut pending = vec![top];
        while let Some(dir) = pending.pop() {
            for entry in self.fs.read_dir(&dir).await? {
                if skip.is_some_and(|s| entry.path.as_path() == s) {
                    continue;
                }
                if entry.is_directory {
                    walk.directories.push(entry.path.clone());
                    pending.push(entry.path);
                } else {
                    walk.files.push(entry.path);
                }
            }
        }
        walk.files.sort();
        walk.directories.sort();
        Ok(walk)
    }
}

#[cfg(test)]
mod tests {
    use cloudbox_core::config::TrashLayout;
    use cloudbox_database::FaultPoint;
    use cloudbox_storage::BytesBlob;

    use super::*;
    use crate::testing::Fixture;

    #[tokio::test]
    async fn test_clean_after_normal_operations() {
        let fx = Fixture::new(TrashLayout::Mirrored);
        let gateway = fx.gateway();
        let keep = FileKey::new("keep", "txt", "/docs");
        let toss = FileKey::new("toss", "txt", "/docs/old");
        gateway.upload(&keep, &mut BytesBlob::new("k")).await.unwrap();
        gateway.upload(&toss, &mut BytesBlob::new("t")).await.unwrap();
        gateway.delete(&toss).await.unwrap();

        let report = fx.reconciler().reconcile_orphans().await.unwrap();
        assert!(report.is_clean(), "{report:?}");
    }

    #[tokio::test]
    async fn test_reports_failed_upload_and_failed_delete() {
        let fx = Fixture::new(TrashLayout::Mirrored);
        let gateway = fx.gateway();
        let orphan = FileKey::new("orphan", "bin", "/docs");
        let stuck = FileKey::new("stuck", "bin", "/docs");
        gateway.upload(&stuck, &mut BytesBlob::new("s")).await.unwrap();

        fx.store.fail_on(FaultPoint::CreateFile);
        gateway
            .upload(&orphan, &mut BytesBlob::new("o"))
            .await
            .unwrap_err();
        fx.store.clear_fault(FaultPoint::CreateFile);

        fx.store.fail_on(FaultPoint::SoftDeleteFile);
        gateway.delete(&stuck).await.unwrap_err();

        let report = fx.reconciler().reconcile_orphans().await.unwrap();
        assert_eq!(report.untracked_files, vec![fx.root("/docs/orphan.bin")]);
        assert_eq!(report.missing_files, vec![stuck.clone()]);
        assert_eq!(report.untracked_trash, vec![fx.trash("/docs/stuck.bin")]);
        assert_eq!(report.len(), 3);
    }

    #[tokio::test]
    async fn test_clean_after_directory_delete() {
        for layout in [TrashLayout::Mirrored, TrashLayout::Flat] {
            let fx = Fixture::new(layout);
            let gateway = fx.gateway();
            let kept = FileKey::new("a", "txt", "/docs");
            let trashed = FileKey::new("b", "txt", "/docs/old");
            gateway.upload(&kept, &mut BytesBlob::new("a")).await.unwrap();
            gateway.upload(&trashed, &mut BytesBlob::new("b")).await.unwrap();
            gateway.delete(&trashed).await.unwrap();

            fx.directories().delete("/docs").await.unwrap();

            let report = fx.reconciler().reconcile_orphans().await.unwrap();
            assert!(report.is_clean(), "{layout:?}: {report:?}");
            assert_eq!(report.len(), 0);
            assert_eq!(report.deleted_directory_files.len(), 2, "{layout:?}");
        }
    }

    #[tokio::test]
    async fn test_reports_directory_drift() {
        let fx = Fixture::new(TrashLayout::Mirrored);
        fx.directories().create_if_absent("/gone").await.unwrap();
        std::fs::remove_dir(fx.root("/gone")).unwrap();
        std::fs::create_dir(fx.root("/stray")).unwrap();

        let report = fx.reconciler().reconcile_orphans().await.unwrap();
        assert_eq!(report.missing_directories, vec!["/gone".to_string()]);
        assert_eq!(report.untracked_directories, vec!["/stray".to_string()]);
    }
}
