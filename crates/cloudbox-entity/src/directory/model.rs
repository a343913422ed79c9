//! Directory entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use cloudbox_core::types::DirectoryId;

/// A directory known to the metadata store.
///
/// The root directory is the empty path `""` and never has a row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Directory {
    /// Unique directory identifier.
    pub id: DirectoryId,
    /// Logical absolute path without a trailing slash, e.g. `/Users/photos`.
    pub path: String,
    /// When the directory was created.
    pub created_at: DateTime<Utc>,
    /// When the directory was last renamed.
    pub updated_at: DateTime<Utc>,
}

impl Directory {
    /// The last path segment.
    pub fn name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or_default()
    }

    /// The logical path of the parent directory (`""` for top-level ones).
    pub fn parent_path(&self) -> &str {
        self.path
            .rfind('/')
            .map(|idx| &self.path[..idx])
            .unwrap_or_default()
    }
}

/// Whether `path` is `dir` itself or lies somewhere below it.
///
/// Matching happens on `/` boundaries, so `/docs2` is not within `/docs`.
/// Every path is within the root `""`.
pub fn is_within(path: &str, dir: &str) -> bool {
    if dir.is_empty() {
        return true;
    }
    match path.strip_prefix(dir) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

/// Rewrite the `from` prefix of `path` to `to`.
///
/// Returns `None` when `path` is not within `from`.
pub fn rebase(path: &str, from: &str, to: &str) -> Option<String> {
    if !is_within(path, from) {
        return None;
    }
    Some(format!("{to}{}", &path[from.len()..]))
}
