use bridge_traits::error::BridgeError;
use core_runtime::retry::RetryError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PublishError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Batch creation failed while {stage}: {source}")]
    BatchCreation {
        stage: &'static str,
        #[source]
        source: BridgeError,
    },

    #[error("Batch reference {reference} got no identifier within {waited_secs}s")]
    BatchIdentifierTimeout { reference: String, waited_secs: u64 },

    #[error("Batch {batch_id} was not usable within {waited_secs}s")]
    BatchUsabilityTimeout { batch_id: String, waited_secs: u64 },

    #[error("Invalid batch state transition from {from} to {to}: {reason}")]
    InvalidStateTransition {
        from: String,
        to: String,
        reason: String,
    },

    #[error("Upload of {resource} failed: {source}")]
    UploadFailed {
        resource: String,
        #[source]
        source: Box<RetryError<BridgeError>>,
    },

    #[error("Metadata upload failed: {0}")]
    ManifestUploadFailed(#[source] Box<RetryError<PublishError>>),

    #[error("Offer of {address} failed: {source}")]
    OfferFailed {
        address: String,
        #[source]
        source: Box<RetryError<BridgeError>>,
    },

    #[error("Index synchronization failed: {0}")]
    Index(#[source] BridgeError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Bridge(#[from] BridgeError),
}

impl PublishError {
    /// Stage name used in failure events
    pub fn stage(&self) -> &'static str {
        match self {
            PublishError::Validation(_) | PublishError::Serialization(_) => "validation",
            PublishError::BatchCreation { .. }
            | PublishError::BatchIdentifierTimeout { .. }
            | PublishError::BatchUsabilityTimeout { .. }
            | PublishError::InvalidStateTransition { .. } => "batch",
            PublishError::UploadFailed { .. } | PublishError::ManifestUploadFailed(_) => "upload",
            PublishError::OfferFailed { .. } => "offer",
            PublishError::Index(_) => "index",
            PublishError::Bridge(_) => "io",
        }
    }
}

pub type Result<T> = std::result::Result<T, PublishError>;
