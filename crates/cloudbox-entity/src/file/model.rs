//! File entity model.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use cloudbox_core::types::{DirectoryId, FileId};

use super::state::FileState;

/// A file stored in CloudBox.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct File {
    /// Unique file identifier.
    pub id: FileId,
    /// Base name without extension.
    pub file_name: String,
    /// Extension without the leading dot.
    pub extension: String,
    /// Logical path of the containing directory, without the file name.
    pub path: String,
    /// The owning directory row.
    pub directory_id: DirectoryId,
    /// Active or trashed.
    pub state: FileState,
    /// When the file was uploaded.
    pub created_at: DateTime<Utc>,
    /// When the row was last changed.
    pub updated_at: DateTime<Utc>,
    /// When the file was moved to the trash. Set iff `state` is `Trashed`.
    pub deleted_at: Option<DateTime<Utc>>,
}

impl File {
    /// The identifying triple of this file.
    pub fn key(&self) -> FileKey {
        FileKey {
            file_name: self.file_name.clone(),
            extension: self.extension.clone(),
            path: self.path.clone(),
        }
    }

    /// `name.ext`.
    pub fn file_name_with_ext(&self) -> String {
        format!("{}.{}", self.file_name, self.extension)
    }

    /// `root + path + "/" + name.ext`.
    pub fn full_path(&self, root: &str) -> String {
        format!("{root}{}/{}", self.path, self.file_name_with_ext())
    }

    /// `root + path`.
    pub fn dir_path(&self, root: &str) -> String {
        format!("{root}{}", self.path)
    }

    /// Whether the file is currently in the trash.
    pub fn is_trashed(&self) -> bool {
        self.state == FileState::Trashed
    }
}

/// The `(file_name, extension, path)` triple that identifies a file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileKey {
    /// Base name without extension.
    pub file_name: String,
    /// Extension without the leading dot.
    pub extension: String,
    /// Logical directory path.
    pub path: String,
}

impl FileKey {
    /// Build a key from its parts.
    pub fn new(
        file_name: impl Into<String>,
        extension: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            extension: extension.into(),
            path: path.into(),
        }
    }

    /// Whether a row carries this key.
    pub fn matches(&self, file: &File) -> bool {
        file.file_name == self.file_name && file.extension == self.extension && file.path == self.path
    }
}

impl fmt::Display for FileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}.{}", self.path, self.file_name, self.extension)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report() -> File {
        File {
            id: FileId::new(),
            file_name: "report".into(),
            extension: "pdf".into(),
            path: "/docs".into(),
            directory_id: DirectoryId::new(),
            state: FileState::Active,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            deleted_at: None,
        }
    }

    #[test]
    fn test_derived_paths() {
        let file = report();
        assert_eq!(file.full_path("/srv/box"), "/srv/box/docs/report.pdf");
        assert_eq!(file.dir_path("/srv/box"), "/srv/box/docs");
        assert_eq!(file.file_name_with_ext(), "report.pdf");
    }

    #[test]
    fn test_key_matches_and_display() {
        let file = report();
        let key = file.key();
        assert!(key.matches(&file));
        assert!(!FileKey::new("report", "txt", "/docs").matches(&file));
        assert_eq!(key.to_string(), "/docs/report.pdf");
    }
}
