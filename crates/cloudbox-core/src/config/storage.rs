//! Storage configuration: the root and trash directories.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// How trashed file bytes are laid out under the trash directory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrashLayout {
    /// `<trash><path>/<name>.<ext>`: keeps the original directory path.
    #[default]
    Mirrored,
    /// `<trash>/<name>.<ext>`: every trashed file in one directory.
    Flat,
}

/// Top-level storage configuration.
///
/// Both directories are fixed at process start.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Absolute root directory holding active file bytes.
    pub root_path: String,
    /// Absolute trash directory holding soft-deleted bytes.
    pub trash_path: String,
    /// Layout of trashed files.
    #[serde(default)]
    pub trash_layout: TrashLayout,
    /// Maximum upload size in bytes (default 5 GB).
    #[serde(default = "default_max_upload")]
    pub max_upload_size_bytes: u64,
}

impl StorageConfig {
    /// Reject relative, identical or nested root/trash directories.
    pub fn validate(&self) -> Result<(), AppError> {
        let root = Path::new(&self.root_path);
        let trash = Path::new(&self.trash_path);

        if !root.is_absolute() {
            return Err(AppError::configuration(format!(
                "storage.root_path must be absolute, got '{}'",
                self.root_path
            )));
        }
        if !trash.is_absolute() {
            return Err(AppError::configuration(format!(
                "storage.trash_path must be absolute, got '{}'",
                self.trash_path
            )));
        }
        if root.starts_with(trash) || trash.starts_with(root) {
            return Err(AppError::configuration(
                "storage.root_path and storage.trash_path must not contain each other",
            ));
        }
        Ok(())
    }
}

fn default_max_upload() -> u64 {
    5_368_709_120 // 5 GB
}
