//! Index synchronization
//!
//! Publishing the same asset twice must update its entry, never add a second
//! one. The asset carries the id of the entry it was published under.

use bridge_traits::gateway::ContentAddress;
use bridge_traits::index::VideoIndex;
use std::sync::Arc;
use tracing::{debug, info, instrument};

use crate::error::{PublishError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexAction {
    Created,
    Updated,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexOutcome {
    pub entry_id: String,
    pub action: IndexAction,
}

pub struct IndexSynchronizer {
    index: Arc<dyn VideoIndex>,
}

impl IndexSynchronizer {
    pub fn new(index: Arc<dyn VideoIndex>) -> Self {
        Self { index }
    }

    /// Point the asset's entry at `manifest`, creating the entry when the
    /// index does not know `index_id`
    #[instrument(skip(self), fields(manifest = %manifest))]
    pub async fn publish(
        &self,
        manifest: &ContentAddress,
        index_id: Option<&str>,
    ) -> Result<IndexOutcome> {
        if let Some(id) = index_id.filter(|id| !id.trim().is_empty()) {
            let existing = self.index.get_entry(id).await.map_err(PublishError::Index)?;

            if let Some(entry) = existing {
                debug!(previous = ?entry.manifest_hash, "Index entry found");
                self.index
                    .update_entry(id, manifest)
                    .await
                    .map_err(PublishError::Index)?;
                info!(entry_id = id, "Index entry updated");
                return Ok(IndexOutcome {
                    entry_id: id.to_string(),
                    action: IndexAction::Updated,
                });
            }

            info!(entry_id = id, "Index entry not found, creating a new one");
        }

        let entry_id = self
            .index
            .create_entry(manifest)
            .await
            .map_err(PublishError::Index)?;
        info!(entry_id = %entry_id, "Index entry created");

        Ok(IndexOutcome {
            entry_id,
            action: IndexAction::Created,
        })
    }
}
