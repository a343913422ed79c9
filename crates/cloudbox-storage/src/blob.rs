//! Upload sources.

use std::path::PathBuf;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs;
use tokio_util::io::ReaderStream;

use cloudbox_core::error::{AppError, ErrorKind};
use cloudbox_core::result::AppResult;
use cloudbox_core::traits::storage::{BlobSource, ByteStream};

/// An upload held entirely in memory.
#[derive(Debug, Clone)]
pub struct BytesBlob {
    data: Option<Bytes>,
    len: u64,
}

impl BytesBlob {
    /// Wrap a buffer.
    pub fn new(data: impl Into<Bytes>) -> Self {
        let data = data.into();
        Self {
            len: data.len() as u64,
            data: Some(data),
        }
    }
}

#[async_trait]
impl BlobSource for BytesBlob {
    async fn open(&mut self) -> AppResult<ByteStream> {
        let data = self
            .data
            .take()
            .ok_or_else(|| AppError::internal("Upload source was already opened"))?;
        Ok(Box::pin(futures::stream::iter([Ok::<_, std::io::Error>(data)])))
    }

    async fn close(&mut self) -> AppResult<()> {
        self.data = None;
        Ok(())
    }

    fn size_hint(&self) -> Option<u64> {
        Some(self.len)
    }
}

/// An upload read from a local file, as used by the CLI.
#[derive(Debug, Clone)]
pub struct LocalFileBlob {
    path: PathBuf,
    len: Option<u64>,
}

impl LocalFileBlob {
    /// Point at a file on the host. Its size is read up front.
    pub async fn new(path: impl Into<PathBuf>) -> AppResult<Self> {
        let path = path.into();
        let meta = fs::metadata(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                AppError::not_found(format!("Upload source not found: {}", path.display()))
            } else {
                AppError::with_source(
                    ErrorKind::Storage,
                    format!("Failed to stat upload source {}", path.display()),
                    e,
                )
            }
        })?;
        if !meta.is_file() {
            return Err(AppError::validation(format!(
                "Upload source {} is not a regular file",
                path.display()
            )));
        }
        Ok(Self {
            path,
            len: Some(meta.len()),
        })
    }
}

#[async_trait]
impl BlobSource for LocalFileBlob {
    async fn open(&mut self) -> AppResult<ByteStream> {
        let file = fs::File::open(&self.path).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to open upload source {}", self.path.display()),
                e,
            )
        })?;
        Ok(Box::pin(ReaderStream::new(file)))
    }

    async fn close(&mut self) -> AppResult<()> {
        Ok(())
    }

    fn size_hint(&self) -> Option<u64> {
        self.len
    }
}
