//! # Media Download Module
//!
//! Brings remote media into the staging directory before publication.
//!
//! ## Overview
//!
//! - [`ChunkedDownloader`] fetches a byte stream in fixed-size ranges,
//!   retrying only the range that failed and reporting monotone progress
//! - [`ThumbnailFetcher`] saves the thumbnail for an external asset id
//! - [`AssetStager`] downloads every variant offered by a
//!   [`VariantSource`](bridge_traits::media::VariantSource), measures it and
//!   derives its quality label and bitrate

pub mod downloader;
pub mod error;
pub mod stager;
pub mod thumbnail;

pub use downloader::{byte_ranges, ChunkedDownloader};
pub use error::{DownloadError, Result};
pub use stager::{AssetStager, StagedMedia, StagedVariant};
pub use thumbnail::ThumbnailFetcher;
