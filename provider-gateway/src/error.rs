//! Error types for the gateway provider

use bridge_traits::error::BridgeError;
use thiserror::Error;

/// Gateway provider errors
#[derive(Error, Debug)]
pub enum GatewayError {
    /// API request returned a non-success status
    #[error("Gateway API error (status {status_code}): {message}")]
    ApiError { status_code: u16, message: String },

    /// Failed to parse API response
    #[error("Failed to parse gateway response: {0}")]
    ParseError(String),

    /// The gateway answered successfully but without the expected value
    #[error("Gateway returned an empty {0}")]
    EmptyResponse(&'static str),

    #[error(transparent)]
    BridgeError(#[from] BridgeError),
}

/// Result type for gateway operations
pub type Result<T> = std::result::Result<T, GatewayError>;

impl From<GatewayError> for BridgeError {
    fn from(error: GatewayError) -> Self {
        match error {
            GatewayError::ApiError {
                status_code,
                message,
            } => BridgeError::HttpStatus {
                status: status_code,
                message,
            },
            GatewayError::ParseError(msg) => {
                BridgeError::OperationFailed(format!("Parse error: {}", msg))
            }
            GatewayError::EmptyResponse(what) => {
                BridgeError::OperationFailed(format!("Gateway returned an empty {}", what))
            }
            GatewayError::BridgeError(e) => e,
        }
    }
}
