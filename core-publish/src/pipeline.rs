//! # Publication Pipeline
//!
//! Publishes one staged asset against a fresh batch. The sequence is encoded
//! in the type of [`Publication`]:
//!
//! ```text
//! Pending → BatchReady → ThumbnailUploaded → VariantsUploaded
//!         → ManifestUploaded → PublishOutcome
//! ```
//!
//! Each stage consumes the previous one, so uploads cannot start before the
//! batch is usable and the manifest cannot be assembled before every variant
//! has an address. A failure aborts the remaining stages.
//!
//! ## Usage
//!
//! ```ignore
//! let publisher = Publisher::new(services, PublishOptions::from_config(&config));
//! let outcome = publisher.publish(&mut asset).await?;
//! println!("{}", outcome.permalink);
//! ```

use bridge_traits::error::BridgeError;
use bridge_traits::gateway::{BatchId, ContentAddress, ContentStore, PostageGateway, UploadFile};
use bridge_traits::index::VideoIndex;
use bridge_traits::media::{ThumbnailInfo, ThumbnailInspector};
use bridge_traits::storage::FileSystemAccess;
use bridge_traits::time::{Clock, Timer};
use bytes::Bytes;
use core_runtime::config::{BatchSettings, ImporterConfig};
use core_runtime::events::{CoreEvent, EventBus, PublishEvent};
use core_runtime::logging::strip_path;
use core_runtime::retry::RetryPolicy;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::batch::{BatchProvisioner, ReadyBatch};
use crate::error::{PublishError, Result};
use crate::indexer::{IndexAction, IndexOutcome, IndexSynchronizer};
use crate::manifest::VideoManifest;
use crate::models::Asset;

const MANIFEST_FILE_NAME: &str = "metadata.json";
const MANIFEST_MIME_TYPE: &str = "application/json";

/// Remote services and host bridges a publication talks to
#[derive(Clone)]
pub struct PublishServices {
    pub gateway: Arc<dyn PostageGateway>,
    pub store: Arc<dyn ContentStore>,
    pub index: Arc<dyn VideoIndex>,
    pub fs: Arc<dyn FileSystemAccess>,
    pub inspector: Arc<dyn ThumbnailInspector>,
    pub clock: Arc<dyn Clock>,
    pub timer: Arc<dyn Timer>,
}

#[derive(Debug, Clone)]
pub struct PublishOptions {
    /// Pin uploads on the gateway node
    pub pin: bool,
    /// Register public offers for every uploaded resource
    pub offer: bool,
    pub permalink_prefix: String,
    /// Where temporary manifest files are written
    pub staging_dir: PathBuf,
    pub batch: BatchSettings,
    pub retry: RetryPolicy,
}

impl PublishOptions {
    pub fn from_config(config: &ImporterConfig) -> Self {
        Self {
            pin: config.pin_video,
            offer: config.offer_video,
            permalink_prefix: config.permalink_prefix.clone(),
            staging_dir: config.staging_dir.clone(),
            batch: config.batch.clone(),
            retry: config.retry_policy(),
        }
    }
}

/// Result of a completed publication
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishOutcome {
    pub batch: ReadyBatch,
    pub thumbnail_address: ContentAddress,
    pub manifest_address: ContentAddress,
    pub permalink: String,
    pub index: IndexOutcome,
}

pub struct Publisher {
    services: PublishServices,
    options: PublishOptions,
    index: IndexSynchronizer,
    events: Option<EventBus>,
}

impl Publisher {
    pub fn new(services: PublishServices, options: PublishOptions) -> Self {
        let index = IndexSynchronizer::new(services.index.clone());
        Self {
            services,
            options,
            index,
            events: None,
        }
    }

    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    /// Start a staged publication of `asset`
    pub fn begin<'a>(&'a self, asset: &'a mut Asset) -> Publication<'a, Pending> {
        Publication {
            publisher: self,
            asset,
            stage: Pending,
        }
    }

    /// Run every stage for `asset`
    ///
    /// On success the asset carries its variant addresses, permalink and
    /// index id.
    #[instrument(skip(self, asset), fields(title = %asset.title()))]
    pub async fn publish(&self, asset: &mut Asset) -> Result<PublishOutcome> {
        match self.run_all(asset).await {
            Ok(outcome) => {
                info!(permalink = %outcome.permalink, "Publication complete");
                Ok(outcome)
            }
            Err(e) => {
                warn!(stage = e.stage(), error = %e, "Publication failed");
                self.emit(PublishEvent::Failed {
                    stage: e.stage().to_string(),
                    message: e.to_string(),
                });
                Err(e)
            }
        }
    }

    async fn run_all(&self, asset: &mut Asset) -> Result<PublishOutcome> {
        self.begin(asset)
            .provision_batch()
            .await?
            .upload_thumbnail()
            .await?
            .upload_variants()
            .await?
            .upload_manifest()
            .await?
            .sync_index()
            .await
    }

    fn emit(&self, event: PublishEvent) {
        if let Some(bus) = &self.events {
            bus.emit(CoreEvent::Publish(event)).ok();
        }
    }

    /// Upload under the retry policy; a blank address counts as a failure
    async fn upload(
        &self,
        resource: &str,
        batch_id: &BatchId,
        file: UploadFile,
    ) -> Result<ContentAddress> {
        let operation = format!("upload {}", resource);
        let file = &file;
        let store = &self.services.store;
        let pin = self.options.pin;

        self.options
            .retry
            .run(&operation, move |_| async move {
                let address = store.upload_file(batch_id, file.clone(), pin).await?;
                if address.is_blank() {
                    return Err(BridgeError::OperationFailed(
                        "Gateway returned an empty address".to_string(),
                    ));
                }
                Ok::<_, BridgeError>(address)
            })
            .await
            .map_err(|e| PublishError::UploadFailed {
                resource: resource.to_string(),
                source: Box::new(e),
            })
    }

    async fn offer_if_requested(&self, address: &ContentAddress) -> Result<()> {
        if !self.options.offer {
            return Ok(());
        }

        let gateway = &self.services.gateway;
        self.options
            .retry
            .run("offer resource", move |_| async move {
                gateway.offer_resource(address).await
            })
            .await
            .map_err(|e| PublishError::OfferFailed {
                address: address.to_string(),
                source: Box::new(e),
            })?;

        self.emit(PublishEvent::Offered {
            address: address.to_string(),
        });
        Ok(())
    }

    async fn read_upload_file(&self, path: &Path) -> Result<UploadFile> {
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| PublishError::Validation(format!("{:?} has no file name", path)))?;
        let mime_type = mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        let data = self.services.fs.read_file(path).await?;

        Ok(UploadFile::new(name, mime_type, data))
    }

    async fn remove_quietly(&self, path: &Path) {
        if let Err(e) = self.services.fs.remove_if_exists(path).await {
            warn!(file = %strip_path(path), error = %e, "Failed to remove staged file");
        }
    }

    /// One manifest attempt: write the temporary file, upload it, and remove
    /// it whatever happened
    async fn upload_manifest_attempt(&self, json: &Bytes, batch_id: &BatchId) -> Result<ContentAddress> {
        let temp_path = self
            .options
            .staging_dir
            .join(format!("{}.json", Uuid::new_v4()));

        let result = async {
            self.services.fs.write_file(&temp_path, json.clone()).await?;
            let data = self.services.fs.read_file(&temp_path).await?;
            let file = UploadFile::new(MANIFEST_FILE_NAME, MANIFEST_MIME_TYPE, data);
            self.upload("metadata", batch_id, file).await
        }
        .await;

        self.remove_quietly(&temp_path).await;
        result
    }
}

// ============================================================================
// Stages
// ============================================================================

/// Nothing done yet
pub struct Pending;

pub struct BatchReady {
    batch: ReadyBatch,
}

pub struct ThumbnailUploaded {
    batch: ReadyBatch,
    thumbnail: ThumbnailInfo,
    thumbnail_address: ContentAddress,
}

pub struct VariantsUploaded {
    batch: ReadyBatch,
    thumbnail: ThumbnailInfo,
    thumbnail_address: ContentAddress,
}

pub struct ManifestUploaded {
    batch: ReadyBatch,
    thumbnail_address: ContentAddress,
    manifest_address: ContentAddress,
}

/// A publication in stage `S`
pub struct Publication<'a, S> {
    publisher: &'a Publisher,
    asset: &'a mut Asset,
    stage: S,
}

impl<S> Publication<'_, S> {
    pub fn asset(&self) -> &Asset {
        &*self.asset
    }
}

impl<'a> Publication<'a, Pending> {
    /// Create a batch and wait until it is usable
    pub async fn provision_batch(self) -> Result<Publication<'a, BatchReady>> {
        let Publication {
            publisher, asset, ..
        } = self;
        let services = &publisher.services;

        let mut provisioner = BatchProvisioner::new(
            services.gateway.clone(),
            services.clock.clone(),
            services.timer.clone(),
            publisher.options.batch.clone(),
        );
        if let Some(bus) = &publisher.events {
            provisioner = provisioner.with_events(bus.clone());
        }

        let batch = provisioner.provision().await?;
        Ok(Publication {
            publisher,
            asset,
            stage: BatchReady { batch },
        })
    }

    /// Continue with a batch provisioned elsewhere
    pub fn with_batch(self, batch: ReadyBatch) -> Publication<'a, BatchReady> {
        Publication {
            publisher: self.publisher,
            asset: self.asset,
            stage: BatchReady { batch },
        }
    }
}

impl<'a> Publication<'a, BatchReady> {
    pub fn batch(&self) -> &ReadyBatch {
        &self.stage.batch
    }

    /// Inspect and upload the thumbnail, then offer it
    ///
    /// The local thumbnail is removed once this stage ends, whether
    /// inspection, reading or the upload failed.
    #[instrument(skip(self), fields(batch_id = %self.stage.batch.batch_id))]
    pub async fn upload_thumbnail(self) -> Result<Publication<'a, ThumbnailUploaded>> {
        let Publication {
            publisher,
            asset,
            stage: BatchReady { batch },
        } = self;
        let path = asset.thumbnail_path().to_path_buf();

        let result = async {
            let thumbnail = publisher.services.inspector.inspect(&path).await?;
            let file = publisher.read_upload_file(&path).await?;
            let address = publisher.upload("thumbnail", &batch.batch_id, file).await?;
            Ok::<_, PublishError>((thumbnail, address))
        }
        .await;
        publisher.remove_quietly(&path).await;
        let (thumbnail, thumbnail_address) = result?;

        info!(address = %thumbnail_address, "Thumbnail uploaded");
        publisher.emit(PublishEvent::ThumbnailUploaded {
            address: thumbnail_address.to_string(),
        });
        publisher.offer_if_requested(&thumbnail_address).await?;

        Ok(Publication {
            publisher,
            asset,
            stage: ThumbnailUploaded {
                batch,
                thumbnail,
                thumbnail_address,
            },
        })
    }
}

impl<'a> Publication<'a, ThumbnailUploaded> {
    pub fn thumbnail_address(&self) -> &ContentAddress {
        &self.stage.thumbnail_address
    }

    /// Upload every variant in order
    ///
    /// A staged file is removed only once its upload succeeded.
    #[instrument(skip(self), fields(variants = self.asset.variants().len()))]
    pub async fn upload_variants(self) -> Result<Publication<'a, VariantsUploaded>> {
        let Publication {
            publisher,
            asset,
            stage:
                ThumbnailUploaded {
                    batch,
                    thumbnail,
                    thumbnail_address,
                },
        } = self;

        for position in 0..asset.variants().len() {
            let (label, path) = {
                let variant = &asset.variants()[position];
                (variant.label.clone(), variant.path.clone())
            };

            let file = publisher.read_upload_file(&path).await?;
            let address = publisher
                .upload(&format!("variant {}", label), &batch.batch_id, file)
                .await?;
            asset.variants_mut()[position].address = Some(address.clone());

            info!(label = %label, address = %address, "Variant uploaded");
            publisher.emit(PublishEvent::VariantUploaded {
                label,
                address: address.to_string(),
            });
            publisher.offer_if_requested(&address).await?;

            publisher.services.fs.remove_if_exists(&path).await?;
        }

        Ok(Publication {
            publisher,
            asset,
            stage: VariantsUploaded {
                batch,
                thumbnail,
                thumbnail_address,
            },
        })
    }
}

impl<'a> Publication<'a, VariantsUploaded> {
    /// Assemble and upload the manifest, then offer it
    ///
    /// Every outer attempt serializes to a fresh temporary file and uploads
    /// it under its own retry budget.
    #[instrument(skip(self))]
    pub async fn upload_manifest(self) -> Result<Publication<'a, ManifestUploaded>> {
        let Publication {
            publisher,
            asset,
            stage:
                VariantsUploaded {
                    batch,
                    thumbnail,
                    thumbnail_address,
                },
        } = self;

        let manifest = VideoManifest::build(&*asset, &batch.batch_id, &thumbnail_address, &thumbnail)?;
        let json = Bytes::from(manifest.to_json()?);
        let json = &json;
        let batch_id = &batch.batch_id;

        let manifest_address = publisher
            .options
            .retry
            .run("write and upload metadata", move |_| async move {
                publisher.upload_manifest_attempt(json, batch_id).await
            })
            .await
            .map_err(|e| PublishError::ManifestUploadFailed(Box::new(e)))?;

        info!(address = %manifest_address, "Manifest uploaded");
        publisher.emit(PublishEvent::ManifestUploaded {
            address: manifest_address.to_string(),
        });
        publisher.offer_if_requested(&manifest_address).await?;

        Ok(Publication {
            publisher,
            asset,
            stage: ManifestUploaded {
                batch,
                thumbnail_address,
                manifest_address,
            },
        })
    }
}

impl Publication<'_, ManifestUploaded> {
    pub fn manifest_address(&self) -> &ContentAddress {
        &self.stage.manifest_address
    }

    /// Set the permalink and point the index entry at the manifest
    #[instrument(skip(self), fields(manifest = %self.stage.manifest_address))]
    pub async fn sync_index(self) -> Result<PublishOutcome> {
        let Publication {
            publisher,
            asset,
            stage:
                ManifestUploaded {
                    batch,
                    thumbnail_address,
                    manifest_address,
                },
        } = self;

        let permalink = format!("{}{}", publisher.options.permalink_prefix, manifest_address);
        asset.set_permalink(permalink.clone());

        let index = publisher
            .index
            .publish(&manifest_address, asset.index_id())
            .await?;
        asset.set_index_id(index.entry_id.clone());

        publisher.emit(PublishEvent::Indexed {
            entry_id: index.entry_id.clone(),
            created: index.action == IndexAction::Created,
        });

        Ok(PublishOutcome {
            batch,
            thumbnail_address,
            manifest_address,
            permalink,
            index,
        })
    }
}
