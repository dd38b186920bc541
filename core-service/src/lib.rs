//! Core service façade and bootstrap helpers.
//!
//! This crate wires host-provided bridge implementations (HTTP, filesystem,
//! clock, timer) and the media collaborators (variant source, thumbnail
//! inspector, duration extractor) into the staging and publication core.
//! Desktop hosts typically enable the `desktop-shims` feature, which supplies
//! the reqwest/tokio bridges from `bridge-desktop`.
//!
//! ```ignore
//! let config = ImporterConfig::builder()
//!     .staging_dir("/tmp/importer")
//!     .offer_video(true)
//!     .build()?;
//! let deps = ImporterDependencies::desktop(source, inspector, durations)?;
//! let service = ImporterService::new(config, deps)?;
//!
//! let report = service.import(&descriptor, &NullProgress).await?;
//! println!("{}", report.outcome.permalink);
//! ```

pub mod error;

pub use error::{CoreError, Result};

use std::sync::Arc;

use bridge_traits::{
    http::HttpClient,
    media::{DurationExtractor, ThumbnailInspector, VariantSource},
    storage::FileSystemAccess,
    time::{Clock, Timer},
};
use core_download::{AssetStager, ChunkedDownloader, ThumbnailFetcher};
use core_publish::{Asset, PublishOptions, PublishOutcome, PublishServices, Publisher};
use core_runtime::config::ImporterConfig;
use core_runtime::events::{EventBus, ProgressSink};
use core_runtime::logging::redact_if_sensitive;
use provider_gateway::GatewayConnector;
use provider_index::IndexConnector;
use tracing::{debug, info, instrument};

/// Aggregated handle to all bridge dependencies the core requires.
pub struct ImporterDependencies {
    pub http_client: Arc<dyn HttpClient>,
    pub filesystem: Arc<dyn FileSystemAccess>,
    pub clock: Arc<dyn Clock>,
    pub timer: Arc<dyn Timer>,
    pub variant_source: Arc<dyn VariantSource>,
    pub thumbnail_inspector: Arc<dyn ThumbnailInspector>,
    pub duration_extractor: Arc<dyn DurationExtractor>,
}

#[cfg(feature = "desktop-shims")]
impl ImporterDependencies {
    /// Desktop bridges around the given media collaborators
    pub fn desktop(
        variant_source: Arc<dyn VariantSource>,
        thumbnail_inspector: Arc<dyn ThumbnailInspector>,
        duration_extractor: Arc<dyn DurationExtractor>,
    ) -> Result<Self> {
        let http_client = bridge_desktop::ReqwestHttpClient::new()
            .map_err(|err| CoreError::InitializationFailed(err.to_string()))?;

        Ok(Self {
            http_client: Arc::new(http_client),
            filesystem: Arc::new(bridge_desktop::TokioFileSystem::new()),
            clock: Arc::new(bridge_traits::time::SystemClock),
            timer: Arc::new(bridge_desktop::TokioTimer),
            variant_source,
            thumbnail_inspector,
            duration_extractor,
        })
    }
}

/// Source-side description of one asset to import
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetDescriptor {
    /// Id of the asset on the source platform
    pub external_id: String,
    pub source_url: String,
    pub title: String,
    pub description: String,
    /// Index entry left by a previous import of the same asset
    pub index_id: Option<String>,
}

/// A finished import
#[derive(Debug, Clone)]
pub struct ImportReport {
    /// The asset with addresses, permalink and index id filled in
    pub asset: Asset,
    pub outcome: PublishOutcome,
}

/// Primary façade exposed to host applications.
pub struct ImporterService {
    config: ImporterConfig,
    stager: AssetStager,
    publisher: Publisher,
    events: EventBus,
}

impl ImporterService {
    /// Wire connectors, downloader and publisher around `deps`
    pub fn new(config: ImporterConfig, deps: ImporterDependencies) -> Result<Self> {
        config.validate()?;

        let mut gateway = GatewayConnector::new(deps.http_client.clone(), &config.gateway_url);
        let mut index = IndexConnector::new(deps.http_client.clone(), &config.index_url);
        if let Some(token) = &config.access_token {
            debug!(
                access_token = %redact_if_sensitive("access_token", token),
                "Gateway and index requests carry a bearer token"
            );
            gateway = gateway.with_access_token(token.clone());
            index = index.with_access_token(token.clone());
        }
        let gateway = Arc::new(gateway);

        let retry = config.retry_policy();
        let downloader = ChunkedDownloader::new(
            deps.http_client.clone(),
            deps.filesystem.clone(),
            config.transfer.clone(),
            retry,
        )?;
        let thumbnails = ThumbnailFetcher::new(
            deps.http_client.clone(),
            deps.filesystem.clone(),
            config.thumbnail_url_template.clone(),
            retry,
        );
        let stager = AssetStager::new(
            downloader,
            thumbnails,
            deps.filesystem.clone(),
            deps.variant_source,
            deps.duration_extractor,
            config.staging_dir.clone(),
        )
        .with_max_filesize_mb(config.max_filesize_mb);

        let events = EventBus::default();
        let publisher = Publisher::new(
            PublishServices {
                gateway: gateway.clone(),
                store: gateway,
                index: Arc::new(index),
                fs: deps.filesystem,
                inspector: deps.thumbnail_inspector,
                clock: deps.clock,
                timer: deps.timer,
            },
            PublishOptions::from_config(&config),
        )
        .with_events(events.clone());

        Ok(Self {
            config,
            stager,
            publisher,
            events,
        })
    }

    pub fn config(&self) -> &ImporterConfig {
        &self.config
    }

    /// Batch and publication events of every import run by this service
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Stage `descriptor` into the staging directory, then publish it
    #[instrument(skip(self, descriptor, progress), fields(external_id = %descriptor.external_id))]
    pub async fn import(
        &self,
        descriptor: &AssetDescriptor,
        progress: &dyn ProgressSink,
    ) -> Result<ImportReport> {
        let staged = self
            .stager
            .stage(&descriptor.external_id, &descriptor.source_url, progress)
            .await?;

        let mut asset = Asset::from_staged(&descriptor.title, &descriptor.description, staged)?
            .with_index_id(descriptor.index_id.clone());
        let outcome = self.publisher.publish(&mut asset).await?;

        info!(
            entry_id = %outcome.index.entry_id,
            permalink = %outcome.permalink,
            "Import complete"
        );
        Ok(ImportReport { asset, outcome })
    }
}
