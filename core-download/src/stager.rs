//! Asset staging
//!
//! Downloads every candidate variant of a source into the staging directory
//! and derives what publication needs from the local files.

use bridge_traits::media::{DurationExtractor, VariantCandidate, VariantSource};
use bridge_traits::storage::FileSystemAccess;
use core_runtime::events::ProgressSink;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, instrument};

use crate::downloader::ChunkedDownloader;
use crate::error::{DownloadError, Result};
use crate::thumbnail::ThumbnailFetcher;

/// A variant downloaded into the staging directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedVariant {
    /// Quality label, `{resolution}p`
    pub label: String,
    pub resolution: u32,
    /// Bits per second, rounded up
    pub bitrate: u64,
    pub path: PathBuf,
    pub size: u64,
    pub duration: u64,
}

/// Everything a publication run needs from local disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedMedia {
    /// In source order, best first
    pub variants: Vec<StagedVariant>,
    pub thumbnail_path: PathBuf,
    /// Duration of the first variant, in seconds
    pub duration: u64,
}

pub struct AssetStager {
    downloader: ChunkedDownloader,
    thumbnails: ThumbnailFetcher,
    fs: Arc<dyn FileSystemAccess>,
    source: Arc<dyn VariantSource>,
    durations: Arc<dyn DurationExtractor>,
    staging_dir: PathBuf,
    max_filesize_mb: Option<u64>,
}

impl AssetStager {
    pub fn new(
        downloader: ChunkedDownloader,
        thumbnails: ThumbnailFetcher,
        fs: Arc<dyn FileSystemAccess>,
        source: Arc<dyn VariantSource>,
        durations: Arc<dyn DurationExtractor>,
        staging_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            downloader,
            thumbnails,
            fs,
            source,
            durations,
            staging_dir: staging_dir.into(),
            max_filesize_mb: None,
        }
    }

    /// Skip variants larger than `size_mb`
    pub fn with_max_filesize_mb(mut self, size_mb: Option<u64>) -> Self {
        self.max_filesize_mb = size_mb;
        self
    }

    pub fn staging_dir(&self) -> &Path {
        &self.staging_dir
    }

    /// Download all variants of `source_url` and the thumbnail of
    /// `external_id`
    #[instrument(skip(self, progress))]
    pub async fn stage(
        &self,
        external_id: &str,
        source_url: &str,
        progress: &dyn ProgressSink,
    ) -> Result<StagedMedia> {
        let candidates = self
            .source
            .variants(source_url, self.max_filesize_mb)
            .await?;
        if candidates.is_empty() {
            return Err(DownloadError::NoVariants {
                source_url: source_url.to_string(),
            });
        }

        self.fs.create_dir_all(&self.staging_dir).await?;

        let mut variants = Vec::with_capacity(candidates.len());
        for candidate in &candidates {
            variants.push(self.stage_variant(candidate, progress).await?);
        }

        let thumbnail_path = self
            .thumbnails
            .download_thumbnail(external_id, &self.staging_dir)
            .await?;

        let duration = variants[0].duration;
        info!(variants = variants.len(), duration, "Asset staged");

        Ok(StagedMedia {
            variants,
            thumbnail_path,
            duration,
        })
    }

    async fn stage_variant(
        &self,
        candidate: &VariantCandidate,
        progress: &dyn ProgressSink,
    ) -> Result<StagedVariant> {
        let file_name = Path::new(&candidate.filename)
            .file_name()
            .ok_or_else(|| DownloadError::InvalidFileName(candidate.filename.clone()))?;
        let path = self.staging_dir.join(file_name);

        info!(resolution = candidate.resolution, "Downloading variant");
        self.downloader
            .download(&candidate.uri, &path, progress)
            .await?;

        let size = self.fs.metadata(&path).await?.size;
        let duration = self.durations.duration_secs(&path).await?;
        if duration == 0 {
            return Err(DownloadError::InvalidDuration { path, duration });
        }

        Ok(StagedVariant {
            label: format!("{}p", candidate.resolution),
            resolution: candidate.resolution,
            bitrate: bitrate(size, duration),
            path,
            size,
            duration,
        })
    }
}

/// `ceil(size * 8 / duration)`
fn bitrate(size: u64, duration_secs: u64) -> u64 {
    size.saturating_mul(8).div_ceil(duration_secs.max(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bitrate_rounds_up() {
        assert_eq!(bitrate(50_000_000, 120), 3_333_334);
        assert_eq!(bitrate(1_000, 8), 1_000);
        assert_eq!(bitrate(1, 3), 3);
    }
}
