use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Core initialization failed: {0}")]
    InitializationFailed(String),

    #[error("Configuration error: {0}")]
    Config(#[from] core_runtime::Error),

    #[error("Staging failed: {0}")]
    Download(#[from] core_download::DownloadError),

    #[error("Publication failed: {0}")]
    Publish(#[from] core_publish::PublishError),
}

pub type Result<T> = std::result::Result<T, CoreError>;
