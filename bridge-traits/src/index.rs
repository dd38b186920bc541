//! Video Index Abstractions
//!
//! The index maps an entry id to the manifest currently published for it.

use async_trait::async_trait;

use crate::error::Result;
use crate::gateway::ContentAddress;

/// Entry as returned by the index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    pub id: String,
    /// Manifest hash of the last valid manifest, when the index has one
    pub manifest_hash: Option<String>,
}

#[async_trait]
pub trait VideoIndex: Send + Sync {
    /// Look up an entry; `Ok(None)` when the index has no entry with this id
    async fn get_entry(&self, id: &str) -> Result<Option<IndexEntry>>;

    /// Create an entry and return its newly assigned id
    async fn create_entry(&self, manifest: &ContentAddress) -> Result<String>;

    /// Point an existing entry at a new manifest
    async fn update_entry(&self, id: &str, manifest: &ContentAddress) -> Result<()>;
}
