//! Storage and File System Abstractions
//!
//! Provides the platform-agnostic file I/O the pipeline needs for staged
//! media, thumbnails and the temporary metadata serialization.

use async_trait::async_trait;
use bytes::Bytes;
use std::path::Path;
use tokio::io::{AsyncRead, AsyncSeek, AsyncWrite};

use crate::error::Result;

/// Dynamic async reader type
pub type DynAsyncRead = dyn AsyncRead + Send + Unpin;

/// Writable, seekable destination for downloads
///
/// Seeking lets the downloader rewind to the start of a byte range that has
/// to be fetched again.
pub trait SeekableWrite: AsyncWrite + AsyncSeek + Send + Unpin {}

impl<T> SeekableWrite for T where T: AsyncWrite + AsyncSeek + Send + Unpin {}

/// File metadata information
#[derive(Debug, Clone)]
pub struct FileMetadata {
    pub size: u64,
    pub modified_at: Option<i64>,
    pub is_directory: bool,
}

/// File system access trait
///
/// # Example
///
/// ```ignore
/// use bridge_traits::storage::FileSystemAccess;
///
/// async fn stage(fs: &dyn FileSystemAccess, dir: &Path, data: Bytes) -> Result<()> {
///     fs.create_dir_all(dir).await?;
///     fs.write_file(&dir.join("metadata.json"), data).await
/// }
/// ```
#[async_trait]
pub trait FileSystemAccess: Send + Sync {
    /// Check if a file or directory exists
    async fn exists(&self, path: &Path) -> Result<bool>;

    /// Get metadata for a file or directory
    async fn metadata(&self, path: &Path) -> Result<FileMetadata>;

    /// Create a directory and all parent directories if they don't exist
    async fn create_dir_all(&self, path: &Path) -> Result<()>;

    /// Read entire file contents into memory
    async fn read_file(&self, path: &Path) -> Result<Bytes>;

    /// Write data to a file, creating or truncating it
    async fn write_file(&self, path: &Path, data: Bytes) -> Result<()>;

    /// Delete a file
    async fn delete_file(&self, path: &Path) -> Result<()>;

    /// Create (or truncate) a file and open it for seekable streaming writes
    async fn create_write_stream(&self, path: &Path) -> Result<Box<dyn SeekableWrite>>;

    /// Delete a file if it is present
    ///
    /// Returns whether a file was removed.
    async fn remove_if_exists(&self, path: &Path) -> Result<bool> {
        if self.exists(path).await? {
            self.delete_file(path).await?;
            Ok(true)
        } else {
            Ok(false)
        }
    }
}
