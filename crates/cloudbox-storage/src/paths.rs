//! Logical path to on-disk path mapping.
//!
//! Everything here is string arithmetic. Nothing touches the filesystem.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use cloudbox_core::config::{StorageConfig, TrashLayout};
use cloudbox_core::error::AppError;
use cloudbox_core::result::AppResult;
use cloudbox_entity::file::FileKey;

/// Name of the trash subdirectory holding deleted directory subtrees.
///
/// Reserved: no logical path may start with it.
pub const DELETED_DIRECTORIES: &str = ".directories";

/// Computes where bytes live for a logical path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPolicy {
    root: String,
    trash: String,
    layout: TrashLayout,
}

impl PathPolicy {
    /// Build a policy. Trailing slashes on the directories are dropped.
    pub fn new(root: impl Into<String>, trash: impl Into<String>, layout: TrashLayout) -> Self {
        Self {
            root: strip_trailing_slash(root.into()),
            trash: strip_trailing_slash(trash.into()),
            layout,
        }
    }

    /// Build a policy from the storage section of the configuration.
    pub fn from_config(config: &StorageConfig) -> Self {
        Self::new(
            config.root_path.clone(),
            config.trash_path.clone(),
            config.trash_layout,
        )
    }

    /// The configured root directory.
    pub fn root(&self) -> &str {
        &self.root
    }

    /// The configured trash directory.
    pub fn trash(&self) -> &str {
        &self.trash
    }

    /// The configured trash layout.
    pub fn layout(&self) -> TrashLayout {
        self.layout
    }

    /// `root + path`.
    pub fn resolve_path(&self, path: &str) -> PathBuf {
        PathBuf::from(format!("{}{path}", self.root))
    }

    /// `trash + path`.
    pub fn resolve_trash_path(&self, path: &str) -> PathBuf {
        PathBuf::from(format!("{}{path}", self.trash))
    }

    /// Location of an active file's bytes.
    pub fn file_path(&self, key: &FileKey) -> PathBuf {
        PathBuf::from(full_file_path(
            &self.root,
            &key.path,
            &key.file_name,
            &key.extension,
        ))
    }

    /// Location of a trashed file's bytes.
    pub fn trash_file_path(&self, key: &FileKey) -> PathBuf {
        let dir = match self.layout {
            TrashLayout::Mirrored => key.path.as_str(),
            TrashLayout::Flat => "",
        };
        PathBuf::from(full_file_path(
            &self.trash,
            dir,
            &key.file_name,
            &key.extension,
        ))
    }

    /// Area under trash that holds deleted directory subtrees. Disjoint
    /// from every [`Self::trash_file_path`].
    pub fn deleted_directories_root(&self) -> PathBuf {
        PathBuf::from(format!("{}/{DELETED_DIRECTORIES}", self.trash))
    }

    /// Destination of a deleted directory subtree:
    /// `trash + "/.directories" + path`.
    pub fn directory_trash_path(&self, path: &str) -> PathBuf {
        PathBuf::from(format!("{}/{DELETED_DIRECTORIES}{path}", self.trash))
    }

    /// Fallback destination when [`Self::directory_trash_path`] is occupied.
    pub fn timestamped_trash_path(&self, path: &str, deleted_at: DateTime<Utc>) -> PathBuf {
        PathBuf::from(format!(
            "{}/{DELETED_DIRECTORIES}{path}.{}",
            self.trash,
            deleted_at.format("%Y%m%dT%H%M%S%.3fZ")
        ))
    }

    /// The logical path of an absolute path under root, if it is under root.
    pub fn logical_path(&self, absolute: &Path) -> Option<String> {
        let rest = absolute.strip_prefix(&self.root).ok()?;
        let rest = rest.to_str()?;
        if rest.is_empty() {
            return Some(String::new());
        }
        Some(format!("/{rest}"))
    }
}

/// `root + dir_path + "/" + file_name + "." + extension`.
pub fn full_file_path(root: &str, dir_path: &str, file_name: &str, extension: &str) -> String {
    format!("{root}{dir_path}/{file_name}.{extension}")
}

/// Check that `path` is a non-root logical directory path.
///
/// It must start with `/`, must not end with `/`, and every segment must
/// be a plain name.
pub fn validate_logical_path(path: &str) -> AppResult<()> {
    if path.is_empty() {
        return Err(AppError::invalid_field("path", "path is required"));
    }
    if !path.starts_with('/') {
        return Err(AppError::invalid_field(
            "path",
            format!("path '{path}' must start with '/'"),
        ));
    }
    if path.ends_with('/') {
        return Err(AppError::invalid_field(
            "path",
            format!("path '{path}' must not end with '/'"),
        ));
    }
    if path[1..].split('/').next() == Some(DELETED_DIRECTORIES) {
        return Err(AppError::invalid_field(
            "path",
            format!("path '{path}' uses the reserved name '{DELETED_DIRECTORIES}'"),
        ));
    }
    for segment in path[1..].split('/') {
        if segment.is_empty() || segment == "." || segment == ".." || segment.contains('\0') {
            return Err(AppError::invalid_field(
                "path",
                format!("path '{path}' contains an invalid segment"),
            ));
        }
    }
    Ok(())
}

/// Check a single name component such as a file name or an extension.
pub fn validate_segment(field: &'static str, value: &str) -> AppResult<()> {
    if value.is_empty() {
        return Err(AppError::invalid_field(field, format!("{field} is required")));
    }
    if value == "." || value == ".." || value.contains('/') || value.contains('\0') {
        return Err(AppError::invalid_field(
            field,
            format!("{field} '{value}' is not a valid name"),
        ));
    }
    Ok(())
}

fn strip_trailing_slash(mut dir: String) -> String {
    while dir.len() > 1 && dir.ends_with('/') {
        dir.pop();
    }
    dir
}
