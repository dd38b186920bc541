//! # Importer Configuration Module
//!
//! The configuration system uses a builder pattern to construct an
//! [`ImporterConfig`] holding the remote endpoints, publication flags and
//! the tuning of the batch poller and the chunked downloader. Validation is
//! fail-fast: `build()` rejects anything the pipeline could not run with.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::ImporterConfig;
//!
//! let config = ImporterConfig::builder()
//!     .staging_dir("/tmp/importer")
//!     .access_token(token)
//!     .offer_video(true)
//!     .build()?;
//! ```
//!
//! Every setting except the staging directory has a default matching the
//! public gateway deployment.

use crate::error::{Error, Result};
use crate::retry::{RetryPolicy, DEFAULT_MAX_ATTEMPTS};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_GATEWAY_URL: &str = "https://gateway.etherna.io/";
pub const DEFAULT_INDEX_URL: &str = "https://index.etherna.io/";
pub const DEFAULT_PERMALINK_PREFIX: &str = "https://etherna.io/embed/";
pub const DEFAULT_THUMBNAIL_URL_TEMPLATE: &str = "https://img.youtube.com/vi/{id}/maxresdefault.jpg";

/// Placeholder replaced by the asset's external id in the thumbnail template
pub const THUMBNAIL_ID_PLACEHOLDER: &str = "{id}";

/// Capacity reservation and polling settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchSettings {
    /// Delay between two polls
    pub poll_interval: Duration,
    /// Wall-clock budget for each of the two polling phases
    pub timeout: Duration,
    /// Batch depth (capacity is 2^depth chunks)
    pub depth: u8,
    /// How long the reserved capacity should stay paid for
    pub duration: Duration,
    /// Chain block time used to convert `duration` into an amount
    pub block_time: Duration,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(10),
            timeout: Duration::from_secs(7 * 60),
            depth: 20,
            duration: Duration::from_secs(365 * 24 * 60 * 60),
            block_time: Duration::from_secs(5),
        }
    }
}

impl BatchSettings {
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval.is_zero() {
            return Err(Error::Config("Batch poll interval must be greater than 0".to_string()));
        }

        if self.timeout < self.poll_interval {
            return Err(Error::Config(format!(
                "Batch timeout ({}s) must be at least one poll interval ({}s)",
                self.timeout.as_secs(),
                self.poll_interval.as_secs()
            )));
        }

        if self.depth == 0 || self.depth > 64 {
            return Err(Error::Config(format!(
                "Batch depth must be between 1 and 64, got {}",
                self.depth
            )));
        }

        if self.duration.as_secs() == 0 || self.block_time.as_secs() == 0 {
            return Err(Error::Config(
                "Batch duration and block time must be at least one second".to_string(),
            ));
        }

        Ok(())
    }
}

/// Chunked download settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferSettings {
    /// Size of each range request in bytes
    pub chunk_size: u64,
    /// Size of the copy buffer; progress is reported once per buffer
    pub buffer_size: usize,
    /// Per-request timeout handed to the HTTP client, if any
    pub request_timeout: Option<Duration>,
}

impl Default for TransferSettings {
    fn default() -> Self {
        Self {
            chunk_size: 10_485_760,
            buffer_size: 81_920,
            request_timeout: None,
        }
    }
}

impl TransferSettings {
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::Config("Chunk size must be greater than 0".to_string()));
        }

        if self.buffer_size == 0 {
            return Err(Error::Config("Buffer size must be greater than 0".to_string()));
        }

        Ok(())
    }
}

/// Importer configuration.
///
/// Use [`ImporterConfigBuilder`] to construct instances.
#[derive(Debug, Clone)]
pub struct ImporterConfig {
    /// Gateway base URL, always ending with `/`
    pub gateway_url: String,
    /// Index base URL, always ending with `/`
    pub index_url: String,
    /// Bearer token attached to gateway and index requests
    pub access_token: Option<String>,
    pub permalink_prefix: String,
    /// Thumbnail URL with an `{id}` placeholder
    pub thumbnail_url_template: String,
    /// Directory downloads and temporary files are written to
    pub staging_dir: PathBuf,
    /// Largest variant the source may offer, in megabytes
    pub max_filesize_mb: Option<u64>,
    /// Pin uploads on the gateway node
    pub pin_video: bool,
    /// Register public offers for every uploaded resource
    pub offer_video: bool,
    pub batch: BatchSettings,
    pub transfer: TransferSettings,
    pub retry_attempts: u32,
}

impl ImporterConfig {
    pub fn builder() -> ImporterConfigBuilder {
        ImporterConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    pub fn validate(&self) -> Result<()> {
        validate_base_url("Gateway", &self.gateway_url)?;
        validate_base_url("Index", &self.index_url)?;

        if self.staging_dir.as_os_str().is_empty() {
            return Err(Error::Config("Staging directory cannot be empty".to_string()));
        }

        if !self.thumbnail_url_template.contains(THUMBNAIL_ID_PLACEHOLDER) {
            return Err(Error::Config(format!(
                "Thumbnail URL template must contain the {} placeholder",
                THUMBNAIL_ID_PLACEHOLDER
            )));
        }

        if matches!(self.max_filesize_mb, Some(0)) {
            return Err(Error::Config(
                "Max file size must be greater than 0 MB when set".to_string(),
            ));
        }

        if matches!(self.access_token.as_deref(), Some(token) if token.trim().is_empty()) {
            return Err(Error::Config("Access token cannot be blank".to_string()));
        }

        if self.retry_attempts == 0 {
            return Err(Error::Config("Retry attempts must be at least 1".to_string()));
        }

        self.batch.validate()?;
        self.transfer.validate()?;

        Ok(())
    }

    /// Retry policy shared by every network-mutating operation
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.retry_attempts)
    }
}

fn validate_base_url(name: &str, url: &str) -> Result<()> {
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(Error::Config(format!(
            "{} URL must start with http:// or https://, got '{}'",
            name, url
        )));
    }
    Ok(())
}

fn normalize_base_url(url: String) -> String {
    let trimmed = url.trim();
    if trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{}/", trimmed)
    }
}

/// Builder for constructing [`ImporterConfig`] instances.
#[derive(Default)]
pub struct ImporterConfigBuilder {
    gateway_url: Option<String>,
    index_url: Option<String>,
    access_token: Option<String>,
    permalink_prefix: Option<String>,
    thumbnail_url_template: Option<String>,
    staging_dir: Option<PathBuf>,
    max_filesize_mb: Option<u64>,
    pin_video: bool,
    offer_video: bool,
    batch: Option<BatchSettings>,
    transfer: Option<TransferSettings>,
    retry_attempts: Option<u32>,
}

impl ImporterConfigBuilder {
    /// Gateway base URL; a missing trailing `/` is added
    pub fn gateway_url(mut self, url: impl Into<String>) -> Self {
        self.gateway_url = Some(url.into());
        self
    }

    /// Index base URL; a missing trailing `/` is added
    pub fn index_url(mut self, url: impl Into<String>) -> Self {
        self.index_url = Some(url.into());
        self
    }

    pub fn access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    pub fn permalink_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.permalink_prefix = Some(prefix.into());
        self
    }

    pub fn thumbnail_url_template(mut self, template: impl Into<String>) -> Self {
        self.thumbnail_url_template = Some(template.into());
        self
    }

    /// Sets the staging directory (required).
    pub fn staging_dir<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.staging_dir = Some(path.into());
        self
    }

    pub fn max_filesize_mb(mut self, size_mb: u64) -> Self {
        self.max_filesize_mb = Some(size_mb);
        self
    }

    pub fn pin_video(mut self, pin: bool) -> Self {
        self.pin_video = pin;
        self
    }

    pub fn offer_video(mut self, offer: bool) -> Self {
        self.offer_video = offer;
        self
    }

    pub fn batch(mut self, settings: BatchSettings) -> Self {
        self.batch = Some(settings);
        self
    }

    pub fn transfer(mut self, settings: TransferSettings) -> Self {
        self.transfer = Some(settings);
        self
    }

    /// Default: 3
    pub fn retry_attempts(mut self, attempts: u32) -> Self {
        self.retry_attempts = Some(attempts);
        self
    }

    /// Builds the configuration.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the staging directory was not set or any
    /// value fails validation.
    pub fn build(self) -> Result<ImporterConfig> {
        let staging_dir = self.staging_dir.ok_or_else(|| {
            Error::Config("Staging directory is required. Use .staging_dir() to set it.".to_string())
        })?;

        let config = ImporterConfig {
            gateway_url: normalize_base_url(
                self.gateway_url
                    .unwrap_or_else(|| DEFAULT_GATEWAY_URL.to_string()),
            ),
            index_url: normalize_base_url(
                self.index_url.unwrap_or_else(|| DEFAULT_INDEX_URL.to_string()),
            ),
            access_token: self.access_token,
            permalink_prefix: self
                .permalink_prefix
                .unwrap_or_else(|| DEFAULT_PERMALINK_PREFIX.to_string()),
            thumbnail_url_template: self
                .thumbnail_url_template
                .unwrap_or_else(|| DEFAULT_THUMBNAIL_URL_TEMPLATE.to_string()),
            staging_dir,
            max_filesize_mb: self.max_filesize_mb,
            pin_video: self.pin_video,
            offer_video: self.offer_video,
            batch: self.batch.unwrap_or_default(),
            transfer: self.transfer.unwrap_or_default(),
            retry_attempts: self.retry_attempts.unwrap_or(DEFAULT_MAX_ATTEMPTS),
        };

        config.validate()?;

        Ok(config)
    }
}
