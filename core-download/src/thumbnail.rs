//! Thumbnail download

use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest};
use bridge_traits::storage::FileSystemAccess;
use core_runtime::config::THUMBNAIL_ID_PLACEHOLDER;
use core_runtime::logging::strip_path;
use core_runtime::retry::RetryPolicy;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, instrument};

use crate::error::{DownloadError, Result};

/// Saves the thumbnail of an external asset as `{folder}/{id}.jpg`
///
/// Thumbnails are small: one buffered GET, retried as a whole.
pub struct ThumbnailFetcher {
    http: Arc<dyn HttpClient>,
    fs: Arc<dyn FileSystemAccess>,
    url_template: String,
    retry: RetryPolicy,
}

impl ThumbnailFetcher {
    pub fn new(
        http: Arc<dyn HttpClient>,
        fs: Arc<dyn FileSystemAccess>,
        url_template: impl Into<String>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            http,
            fs,
            url_template: url_template.into(),
            retry,
        }
    }

    pub fn thumbnail_url(&self, external_id: &str) -> String {
        self.url_template
            .replace(THUMBNAIL_ID_PLACEHOLDER, external_id)
    }

    #[instrument(skip(self, destination_folder))]
    pub async fn download_thumbnail(
        &self,
        external_id: &str,
        destination_folder: &Path,
    ) -> Result<PathBuf> {
        let url = self.thumbnail_url(external_id);
        let path = destination_folder.join(format!("{}.jpg", external_id));

        let url_ref = url.as_str();
        let path_ref = path.as_path();
        self.retry
            .run("download thumbnail", move |_| async move {
                let response = self
                    .http
                    .execute(HttpRequest::new(HttpMethod::Get, url_ref))
                    .await?
                    .error_for_status()?;

                if response.body.is_empty() {
                    return Err(DownloadError::EmptyContent {
                        uri: url_ref.to_string(),
                    });
                }

                self.fs.write_file(path_ref, response.body).await?;
                Ok::<_, DownloadError>(())
            })
            .await?;

        info!(file = %strip_path(&path), "Thumbnail downloaded");
        Ok(path)
    }
}
