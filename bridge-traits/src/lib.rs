//! # Host Bridge Traits
//!
//! Abstraction traits the importer core depends on.
//!
//! ## Overview
//!
//! This crate defines the contract between the publication pipeline and the
//! implementations that talk to the outside world. Platform capabilities
//! (HTTP, filesystem, time) are implemented in `bridge-desktop`; the storage
//! gateway and the video index are implemented by the `provider-*` crates;
//! media collaborators (source enumeration, thumbnail inspection, duration
//! probing) are supplied by the host.
//!
//! ## Traits
//!
//! ### Networking & I/O
//! - [`HttpClient`](http::HttpClient) - Async HTTP with buffered and streamed bodies
//! - [`FileSystemAccess`](storage::FileSystemAccess) - Staged media and temporary files
//!
//! ### Remote services
//! - [`PostageGateway`](gateway::PostageGateway) - Batch reservation, lookup, offers
//! - [`ContentStore`](gateway::ContentStore) - Uploads returning content addresses
//! - [`VideoIndex`](index::VideoIndex) - Index entry create, read and update
//!
//! ### Media collaborators
//! - [`VariantSource`](media::VariantSource)
//! - [`ThumbnailInspector`](media::ThumbnailInspector)
//! - [`DurationExtractor`](media::DurationExtractor)
//!
//! ### Utilities
//! - [`Clock`](time::Clock) and [`Timer`](time::Timer) - Injectable time for polling loops
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). Implementations
//! convert their own errors into it and keep the failing status code when
//! there is one.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so a single instance can be shared
//! through `Arc` by every stage of a publication run.

pub mod error;
pub mod gateway;
pub mod http;
pub mod index;
pub mod media;
pub mod storage;
pub mod time;

pub use error::BridgeError;

// Re-export commonly used types
pub use gateway::{BatchId, BatchReference, ContentAddress, ContentStore, PostageGateway, UploadFile};
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, StreamingResponse};
pub use index::{IndexEntry, VideoIndex};
pub use media::{DurationExtractor, ThumbnailInfo, ThumbnailInspector, VariantCandidate, VariantSource};
pub use storage::{FileMetadata, FileSystemAccess, SeekableWrite};
pub use time::{Clock, ManualClock, SystemClock, Timer};
