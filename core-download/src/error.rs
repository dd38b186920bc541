use bridge_traits::error::BridgeError;
use core_runtime::retry::RetryError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("No content length reported for {uri}")]
    MissingContentLength { uri: String },

    #[error("{uri} has no content")]
    EmptyContent { uri: String },

    /// Server answered a partial request with the full body
    #[error("{uri} ignored the range request (status {status})")]
    RangeIgnored { uri: String, status: u16 },

    #[error("Unexpected status {status} downloading {uri}")]
    UnexpectedStatus { uri: String, status: u16 },

    /// Body ended before the requested range was complete
    #[error("Range {start}-{end} of {uri} ended after {received} bytes")]
    ShortRange {
        uri: String,
        start: u64,
        end: u64,
        received: u64,
    },

    #[error("Downloaded {actual} bytes from {uri}, expected {expected}")]
    LengthMismatch {
        uri: String,
        expected: u64,
        actual: u64,
    },

    #[error("Invalid duration {duration}s for {path:?}")]
    InvalidDuration { path: PathBuf, duration: u64 },

    #[error("No downloadable variant found for {source_url}")]
    NoVariants { source_url: String },

    #[error("Invalid staging file name: {0}")]
    InvalidFileName(String),

    #[error("{0}")]
    Retry(Box<RetryError<DownloadError>>),

    #[error(transparent)]
    Config(#[from] core_runtime::Error),

    #[error(transparent)]
    Bridge(#[from] BridgeError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DownloadError {
    /// Whether another attempt at the same request could succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DownloadError::UnexpectedStatus { .. }
                | DownloadError::ShortRange { .. }
                | DownloadError::Bridge(_)
                | DownloadError::Io(_)
        )
    }
}

impl From<RetryError<DownloadError>> for DownloadError {
    fn from(error: RetryError<DownloadError>) -> Self {
        DownloadError::Retry(Box::new(error))
    }
}

pub type Result<T> = std::result::Result<T, DownloadError>;
