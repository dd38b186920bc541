//! Media Collaborator Abstractions
//!
//! Source enumeration, thumbnail inspection and duration probing are provided
//! by the host; the pipeline only consumes their results.

use async_trait::async_trait;
use std::path::Path;

use crate::error::Result;

/// One downloadable rendition offered by a video source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantCandidate {
    pub uri: String,
    /// Vertical resolution in pixels (720 for 720p)
    pub resolution: u32,
    pub audio_bitrate: i32,
    pub filename: String,
}

/// Dimensions and perceptual hash of a thumbnail image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThumbnailInfo {
    pub hash: String,
    pub width: u32,
    pub height: u32,
}

/// Asset source enumerator
#[async_trait]
pub trait VariantSource: Send + Sync {
    /// Candidate renditions, best first, excluding audio-less streams and
    /// anything above `max_filesize_mb`
    async fn variants(
        &self,
        source_url: &str,
        max_filesize_mb: Option<u64>,
    ) -> Result<Vec<VariantCandidate>>;
}

#[async_trait]
pub trait ThumbnailInspector: Send + Sync {
    async fn inspect(&self, path: &Path) -> Result<ThumbnailInfo>;
}

#[async_trait]
pub trait DurationExtractor: Send + Sync {
    /// Duration in whole seconds; zero when it cannot be determined
    async fn duration_secs(&self, path: &Path) -> Result<u64>;
}
