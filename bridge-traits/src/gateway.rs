//! Storage Network Gateway Abstractions
//!
//! Postage batches reserve capacity on the content-addressed network; every
//! upload is stamped against a usable batch and answered with a content
//! address.

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::Result;

macro_rules! opaque_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// True when the value is empty or only whitespace
            pub fn is_blank(&self) -> bool {
                self.0.trim().is_empty()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

opaque_id!(
    /// Opaque token returned immediately when a batch is reserved
    BatchReference
);

opaque_id!(
    /// Batch identifier assigned once the reservation reaches the chain
    BatchId
);

opaque_id!(
    /// Address of an uploaded byte stream
    ContentAddress
);

/// File handed to the storage network
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub name: String,
    pub mime_type: String,
    pub data: Bytes,
}

impl UploadFile {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, data: Bytes) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            data,
        }
    }
}

/// Capacity reservation and resource offers
#[async_trait]
pub trait PostageGateway: Send + Sync {
    /// Current price per chunk per block
    async fn chain_price(&self) -> Result<u64>;

    /// Reserve a batch; the reservation is asynchronous on the remote side
    async fn create_batch(&self, depth: u8, amount: u64) -> Result<BatchReference>;

    /// Resolve the batch id for a reference
    ///
    /// `Ok(None)` means the id has not been assigned yet.
    async fn batch_id_for_reference(&self, reference: &BatchReference)
        -> Result<Option<BatchId>>;

    /// Whether the batch can stamp uploads; non-success statuses read as `false`
    async fn is_batch_usable(&self, batch_id: &BatchId) -> Result<bool>;

    /// Register a public offer so the resource stays retrievable
    async fn offer_resource(&self, address: &ContentAddress) -> Result<()>;
}

/// Storage network client
#[async_trait]
pub trait ContentStore: Send + Sync {
    async fn upload_file(
        &self,
        batch_id: &BatchId,
        file: UploadFile,
        pin: bool,
    ) -> Result<ContentAddress>;
}
