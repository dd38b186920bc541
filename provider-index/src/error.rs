//! Error types for the index provider

use bridge_traits::error::BridgeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IndexError {
    #[error("Index API error (status {status_code}): {message}")]
    ApiError { status_code: u16, message: String },

    #[error("Failed to parse index response: {0}")]
    ParseError(String),

    /// Entry creation succeeded without returning an id
    #[error("Index returned an empty entry id")]
    MissingEntryId,

    #[error(transparent)]
    BridgeError(#[from] BridgeError),
}

pub type Result<T> = std::result::Result<T, IndexError>;

impl From<IndexError> for BridgeError {
    fn from(error: IndexError) -> Self {
        match error {
            IndexError::ApiError {
                status_code,
                message,
            } => BridgeError::HttpStatus {
                status: status_code,
                message,
            },
            IndexError::ParseError(msg) => {
                BridgeError::OperationFailed(format!("Parse error: {}", msg))
            }
            IndexError::MissingEntryId => {
                BridgeError::OperationFailed("Index returned an empty entry id".to_string())
            }
            IndexError::BridgeError(e) => e,
        }
    }
}
