//! File lifecycle state.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Whether a file row is live or sitting in the trash.
///
/// Stored explicitly next to `deleted_at` so that queries filter on the
/// state column instead of inferring it from a nullable timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "file_state", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum FileState {
    /// Bytes live under the storage root.
    Active,
    /// Bytes live under the trash directory, pending restore.
    Trashed,
}

impl FileState {
    /// Return the state as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Trashed => "trashed",
        }
    }
}

impl fmt::Display for FileState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
