//! Local filesystem implementation over `tokio::fs`.

use std::io::ErrorKind as IoErrorKind;
use std::path::Path;

use async_trait::async_trait;
use futures::stream::StreamExt;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;
use tracing::debug;

use cloudbox_core::error::{AppError, ErrorKind};
use cloudbox_core::result::AppResult;
use cloudbox_core::traits::storage::{ByteSink, ByteStream, Filesystem, FsMetadata};

/// Mode for directories created under root and trash.
pub const DIR_MODE: u32 = 0o755;

/// The host filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFilesystem;

impl LocalFilesystem {
    /// Create a new local filesystem handle.
    pub fn new() -> Self {
        Self
    }
}

fn to_metadata(path: &Path, meta: &std::fs::Metadata) -> FsMetadata {
    FsMetadata {
        path: path.to_path_buf(),
        is_directory: meta.is_dir(),
        size_bytes: meta.len(),
        last_modified: meta.modified().ok().map(chrono::DateTime::<chrono::Utc>::from),
    }
}

#[async_trait]
impl Filesystem for LocalFilesystem {
    async fn stat(&self, path: &Path) -> AppResult<Option<FsMetadata>> {
        match fs::metadata(path).await {
            Ok(meta) => Ok(Some(to_metadata(path, &meta))),
            Err(e) if e.kind() == IoErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to stat {}", path.display()),
                e,
            )),
        }
    }

    async fn mkdir_all(&self, path: &Path, mode: u32) -> AppResult<()> {
        let mut builder = fs::DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        builder.mode(mode);
        #[cfg(not(unix))]
        let _ = mode;

        builder.create(path).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to create directory {}", path.display()),
                e,
            )
        })?;
        debug!(path = %path.display(), "Created directory");
        Ok(())
    }

    async fn rename(&self, from: &Path, to: &Path) -> AppResult<()> {
        fs::rename(from, to).await.map_err(|e| {
            if e.kind() == IoErrorKind::NotFound {
                AppError::not_found(format!(
                    "Cannot rename {}: source not found",
                    from.display()
                ))
            } else {
                AppError::with_source(
                    ErrorKind::Storage,
                    format!("Failed to rename {} -> {}", from.display(), to.display()),
                    e,
                )
            }
        })?;
        debug!(from = %from.display(), to = %to.display(), "Renamed");
        Ok(())
    }

    async fn create(&self, path: &Path) -> AppResult<ByteSink> {
        let file = fs::File::create(path).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to create file {}", path.display()),
                e,
            )
        })?;
        Ok(Box::pin(file))
    }

    async fn copy(&self, dst: &mut ByteSink, mut src: ByteStream) -> AppResult<u64> {
        let mut total_bytes = 0u64;
        while let Some(chunk) = src.next().await {
            let chunk = chunk
                .map_err(|e| AppError::with_source(ErrorKind::Storage, "Stream read error", e))?;
            total_bytes += chunk.len() as u64;
            dst.write_all(&chunk).await.map_err(|e| {
                AppError::with_source(ErrorKind::Storage, "Failed to write chunk", e)
            })?;
        }

        dst.flush()
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Storage, "Failed to flush file", e))?;
        Ok(total_bytes)
    }

    async fn open(&self, path: &Path) -> AppResult<ByteStream> {
        let file = fs::File::open(path).await.map_err(|e| {
            if e.kind() == IoErrorKind::NotFound {
                AppError::not_found(format!("File not found: {}", path.display()))
            } else {
                AppError::with_source(
                    ErrorKind::Storage,
                    format!("Failed to open {}", path.display()),
                    e,
                )
            }
        })?;
        Ok(Box::pin(ReaderStream::new(file)))
    }

    async fn remove_file(&self, path: &Path) -> AppResult<()> {
        match fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == IoErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to remove {}", path.display()),
                e,
            )),
        }
    }

    async fn read_dir(&self, path: &Path) -> AppResult<Vec<FsMetadata>> {
        let mut dir = match fs::read_dir(path).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == IoErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(AppError::with_source(
                    ErrorKind::Storage,
                    format!("Failed to list directory {}", path.display()),
                    e,
                ));
            }
        };

        let mut entries = Vec::new();
        while let Some(entry) = dir.next_entry().await.map_err(|e| {
            AppError::with_source(ErrorKind::Storage, "Failed to read directory entry", e)
        })? {
            let meta = entry.metadata().await.map_err(|e| {
                AppError::with_source(ErrorKind::Storage, "Failed to get entry metadata", e)
            })?;
            entries.push(to_metadata(&entry.path(), &meta));
        }

        entries.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(entries)
    }
}
