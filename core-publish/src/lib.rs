//! # Publication Module
//!
//! Turns a staged asset into a durably stored, publicly indexed resource.
//!
//! ## Overview
//!
//! - [`BatchProvisioner`] reserves capacity and waits until it is usable
//! - [`Publisher`] uploads the thumbnail, every variant and the manifest
//!   against the batch, registering offers when configured
//! - [`IndexSynchronizer`] creates the index entry or updates the existing one
//!
//! Every network-mutating step runs under the configured
//! [`RetryPolicy`](core_runtime::retry::RetryPolicy).

pub mod batch;
pub mod error;
pub mod indexer;
pub mod manifest;
pub mod models;
pub mod pipeline;

pub use batch::{batch_amount, BatchProvisioner, BatchState, ReadyBatch};
pub use error::{PublishError, Result};
pub use indexer::{IndexAction, IndexOutcome, IndexSynchronizer};
pub use manifest::{ManifestSource, ManifestThumbnail, VideoManifest};
pub use models::{Asset, ResolutionVariant};
pub use pipeline::{
    BatchReady, ManifestUploaded, Pending, Publication, PublishOptions, PublishOutcome,
    PublishServices, Publisher, ThumbnailUploaded, VariantsUploaded,
};
