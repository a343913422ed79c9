//! Filesystem primitive and upload source traits.
//!
//! The lifecycle services never touch `std::fs` or `tokio::fs` directly;
//! they go through [`Filesystem`] so the ordering of physical and logical
//! mutations can be exercised against failing implementations in tests.

use std::path::{Path, PathBuf};
use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::Stream;
use tokio::io::AsyncWrite;

use crate::result::AppResult;

/// A byte stream type used for reading file contents.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, std::io::Error>> + Send>>;

/// A writable handle returned by [`Filesystem::create`].
pub type ByteSink = Pin<Box<dyn AsyncWrite + Send>>;

/// Metadata about a filesystem entry.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct FsMetadata {
    /// Absolute path of the entry.
    pub path: PathBuf,
    /// Whether this is a directory.
    pub is_directory: bool,
    /// Size in bytes (zero for directories on some platforms).
    pub size_bytes: u64,
    /// Last modified timestamp.
    pub last_modified: Option<DateTime<Utc>>,
}

/// Filesystem operations used by the lifecycle services.
///
/// Paths are absolute; resolving logical paths is the job of the path
/// policy, not of the implementation.
#[async_trait]
pub trait Filesystem: Send + Sync + std::fmt::Debug + 'static {
    /// Stat a path. Returns `None` when nothing exists there.
    async fn stat(&self, path: &Path) -> AppResult<Option<FsMetadata>>;

    /// Create a directory and all missing ancestors with the given mode.
    async fn mkdir_all(&self, path: &Path, mode: u32) -> AppResult<()>;

    /// Rename a file or directory. A missing source yields `NotFound`.
    async fn rename(&self, from: &Path, to: &Path) -> AppResult<()>;

    /// Create (or truncate) a file and return a writable handle.
    async fn create(&self, path: &Path) -> AppResult<ByteSink>;

    /// Copy a byte stream into a writable handle, returning the byte count.
    async fn copy(&self, dst: &mut ByteSink, src: ByteStream) -> AppResult<u64>;

    /// Open a file for streaming reads.
    async fn open(&self, path: &Path) -> AppResult<ByteStream>;

    /// Remove a single file. Missing files are not an error.
    async fn remove_file(&self, path: &Path) -> AppResult<()>;

    /// List the direct children of a directory. A missing directory is empty.
    async fn read_dir(&self, path: &Path) -> AppResult<Vec<FsMetadata>>;
}

/// The source of an upload's bytes.
///
/// `open` is called once; `close` is always called afterwards, whether
/// or not the copy succeeded.
#[async_trait]
pub trait BlobSource: Send {
    /// Open the source for reading.
    async fn open(&mut self) -> AppResult<ByteStream>;

    /// Release the source.
    async fn close(&mut self) -> AppResult<()>;

    /// Total size in bytes, when known before reading.
    fn size_hint(&self) -> Option<u64> {
        None
    }
}
