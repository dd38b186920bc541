//! Publication domain models

use bridge_traits::gateway::ContentAddress;
use core_download::{StagedMedia, StagedVariant};
use std::path::{Path, PathBuf};

use crate::error::{PublishError, Result};

/// One encoded resolution of an asset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionVariant {
    /// Quality label such as `720p`
    pub label: String,
    /// Bits per second
    pub bitrate: u64,
    pub path: PathBuf,
    pub size: u64,
    /// Set once the variant has been uploaded
    pub address: Option<ContentAddress>,
}

impl ResolutionVariant {
    pub fn new(label: impl Into<String>, bitrate: u64, path: impl Into<PathBuf>, size: u64) -> Self {
        Self {
            label: label.into(),
            bitrate,
            path: path.into(),
            size,
            address: None,
        }
    }
}

impl From<StagedVariant> for ResolutionVariant {
    fn from(staged: StagedVariant) -> Self {
        Self::new(staged.label, staged.bitrate, staged.path, staged.size)
    }
}

/// A video asset on its way to the storage network
///
/// Variant addresses, the permalink and the index id are filled in as the
/// publication advances.
#[derive(Debug, Clone)]
pub struct Asset {
    title: String,
    description: String,
    duration: u64,
    variants: Vec<ResolutionVariant>,
    thumbnail_path: PathBuf,
    index_id: Option<String>,
    permalink: Option<String>,
}

impl Asset {
    /// # Errors
    ///
    /// Returns `PublishError::Validation` when the duration is zero or no
    /// variant is given.
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        duration: u64,
        variants: Vec<ResolutionVariant>,
        thumbnail_path: impl Into<PathBuf>,
    ) -> Result<Self> {
        if duration == 0 {
            return Err(PublishError::Validation(
                "Asset duration must be greater than 0".to_string(),
            ));
        }

        if variants.is_empty() {
            return Err(PublishError::Validation(
                "Asset needs at least one resolution variant".to_string(),
            ));
        }

        Ok(Self {
            title: title.into(),
            description: description.into(),
            duration,
            variants,
            thumbnail_path: thumbnail_path.into(),
            index_id: None,
            permalink: None,
        })
    }

    /// Build an asset from media staged on local disk
    pub fn from_staged(
        title: impl Into<String>,
        description: impl Into<String>,
        staged: StagedMedia,
    ) -> Result<Self> {
        let variants = staged.variants.into_iter().map(Into::into).collect();
        Self::new(
            title,
            description,
            staged.duration,
            variants,
            staged.thumbnail_path,
        )
    }

    /// Id of an index entry published by an earlier run
    pub fn with_index_id(mut self, index_id: Option<String>) -> Self {
        self.index_id = index_id.filter(|id| !id.trim().is_empty());
        self
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Seconds
    pub fn duration(&self) -> u64 {
        self.duration
    }

    pub fn variants(&self) -> &[ResolutionVariant] {
        &self.variants
    }

    pub fn thumbnail_path(&self) -> &Path {
        &self.thumbnail_path
    }

    pub fn index_id(&self) -> Option<&str> {
        self.index_id.as_deref()
    }

    pub fn permalink(&self) -> Option<&str> {
        self.permalink.as_deref()
    }

    /// Label of the best variant
    pub fn original_quality(&self) -> &str {
        self.variants
            .first()
            .map(|variant| variant.label.as_str())
            .unwrap_or_default()
    }

    pub(crate) fn variants_mut(&mut self) -> &mut [ResolutionVariant] {
        &mut self.variants
    }

    pub(crate) fn set_permalink(&mut self, permalink: String) {
        self.permalink = Some(permalink);
    }

    pub(crate) fn set_index_id(&mut self, index_id: String) {
        self.index_id = Some(index_id);
    }
}
