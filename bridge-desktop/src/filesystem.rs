//! File System Access Implementation using Tokio

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    storage::{FileMetadata, FileSystemAccess, SeekableWrite},
};
use bytes::Bytes;
use core_runtime::logging::strip_path;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Tokio-based file system implementation
///
/// Relative paths handed to the accessor are used as-is; the staging root is
/// only a default for hosts that do not configure one.
pub struct TokioFileSystem {
    staging_root: PathBuf,
}

impl TokioFileSystem {
    /// Create a new file system accessor with the platform cache directory as
    /// staging root
    pub fn new() -> Self {
        let staging_root = dirs::cache_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("video-archive-importer");

        Self { staging_root }
    }

    /// Create a new file system accessor with a custom staging root
    pub fn with_staging_root(staging_root: PathBuf) -> Self {
        Self { staging_root }
    }

    /// Default location for downloaded media
    pub fn staging_root(&self) -> &Path {
        &self.staging_root
    }

    fn map_io_error(e: std::io::Error) -> BridgeError {
        BridgeError::Io(e)
    }

    async fn ensure_parent(&self, path: &Path) -> Result<()> {
        match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => self.create_dir_all(parent).await,
            _ => Ok(()),
        }
    }
}

impl Default for TokioFileSystem {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FileSystemAccess for TokioFileSystem {
    async fn exists(&self, path: &Path) -> Result<bool> {
        fs::try_exists(path).await.map_err(Self::map_io_error)
    }

    async fn metadata(&self, path: &Path) -> Result<FileMetadata> {
        let metadata = fs::metadata(path).await.map_err(Self::map_io_error)?;

        Ok(FileMetadata {
            size: metadata.len(),
            modified_at: metadata
                .modified()
                .ok()
                .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
                .map(|d| d.as_secs() as i64),
            is_directory: metadata.is_dir(),
        })
    }

    async fn create_dir_all(&self, path: &Path) -> Result<()> {
        fs::create_dir_all(path).await.map_err(Self::map_io_error)?;
        debug!(file = %strip_path(path), "Created directory");
        Ok(())
    }

    async fn read_file(&self, path: &Path) -> Result<Bytes> {
        let data = fs::read(path).await.map_err(Self::map_io_error)?;
        debug!(file = %strip_path(path), size = data.len(), "Read file");
        Ok(Bytes::from(data))
    }

    async fn write_file(&self, path: &Path, data: Bytes) -> Result<()> {
        self.ensure_parent(path).await?;

        fs::write(path, data.as_ref())
            .await
            .map_err(Self::map_io_error)?;
        debug!(file = %strip_path(path), size = data.len(), "Wrote file");
        Ok(())
    }

    async fn delete_file(&self, path: &Path) -> Result<()> {
        fs::remove_file(path).await.map_err(Self::map_io_error)?;
        debug!(file = %strip_path(path), "Deleted file");
        Ok(())
    }

    async fn create_write_stream(&self, path: &Path) -> Result<Box<dyn SeekableWrite>> {
        self.ensure_parent(path).await?;

        let file = fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)
            .await
            .map_err(Self::map_io_error)?;
        debug!(file = %strip_path(path), "Opened file for writing");
        Ok(Box::new(file))
    }
}
