//! Index API connector implementation

use async_trait::async_trait;
use bridge_traits::error::Result;
use bridge_traits::gateway::ContentAddress;
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
use bridge_traits::index::{IndexEntry, VideoIndex};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::error::IndexError;
use crate::types::{CreateEntryRequest, VideoEntryResponse};

const VIDEOS_PATH: &str = "api/v0.3/videos";

/// Index API connector
///
/// Probing an entry distinguishes three outcomes: `200` is an existing
/// entry, `404` is a missing one, and any other status is an error so a
/// flaky index never leads to a duplicate entry.
pub struct IndexConnector {
    http_client: Arc<dyn HttpClient>,
    base_url: String,
    access_token: Option<String>,
}

impl IndexConnector {
    pub fn new(http_client: Arc<dyn HttpClient>, base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }

        Self {
            http_client,
            base_url,
            access_token: None,
        }
    }

    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    fn entry_url(&self, id: &str) -> String {
        format!("{}{}/{}", self.base_url, VIDEOS_PATH, urlencoding::encode(id))
    }

    fn request(&self, method: HttpMethod, url: String) -> HttpRequest {
        HttpRequest::new(method, url).maybe_bearer_token(self.access_token.as_deref())
    }

    fn api_error(response: &HttpResponse) -> IndexError {
        IndexError::ApiError {
            status_code: response.status,
            message: String::from_utf8_lossy(&response.body).to_string(),
        }
    }
}

#[async_trait]
impl VideoIndex for IndexConnector {
    #[instrument(skip(self))]
    async fn get_entry(&self, id: &str) -> Result<Option<IndexEntry>> {
        let response = self
            .http_client
            .execute(self.request(HttpMethod::Get, self.entry_url(id)))
            .await?;

        match response.status {
            200 => {
                let manifest_hash = match serde_json::from_slice::<VideoEntryResponse>(&response.body)
                {
                    Ok(entry) => entry
                        .last_valid_manifest
                        .and_then(|manifest| manifest.hash)
                        .filter(|hash| !hash.trim().is_empty()),
                    Err(e) => {
                        debug!(error = %e, "Index entry body not understood");
                        None
                    }
                };

                Ok(Some(IndexEntry {
                    id: id.to_string(),
                    manifest_hash,
                }))
            }
            404 => Ok(None),
            _ => {
                warn!(status = response.status, "Index probe failed");
                Err(Self::api_error(&response).into())
            }
        }
    }

    #[instrument(skip(self), fields(manifest = %manifest))]
    async fn create_entry(&self, manifest: &ContentAddress) -> Result<String> {
        let url = format!("{}{}", self.base_url, VIDEOS_PATH);
        let request = self.request(HttpMethod::Post, url).json(&CreateEntryRequest {
            manifest_hash: manifest.to_string(),
        })?;

        let response = self.http_client.execute(request).await?;
        if !response.is_success() {
            return Err(Self::api_error(&response).into());
        }

        let text = response.text()?;
        let id = text.trim().trim_matches('"').trim();
        if id.is_empty() {
            return Err(IndexError::MissingEntryId.into());
        }

        info!(entry_id = %id, "Index entry created");
        Ok(id.to_string())
    }

    #[instrument(skip(self), fields(manifest = %manifest))]
    async fn update_entry(&self, id: &str, manifest: &ContentAddress) -> Result<()> {
        let url = format!(
            "{}?newHash={}",
            self.entry_url(id),
            urlencoding::encode(manifest.as_str())
        );
        let request = self
            .request(HttpMethod::Put, url)
            .json(&serde_json::json!({}))?;

        let response = self.http_client.execute(request).await?;
        if !response.is_success() {
            return Err(Self::api_error(&response).into());
        }

        info!(entry_id = %id, "Index entry updated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::http::StreamingResponse;
    use bytes::Bytes;
    use mockall::mock;
    use std::collections::HashMap;

    mock! {
        HttpClient {}

        #[async_trait]
        impl HttpClient for HttpClient {
            async fn execute(&self, request: HttpRequest) -> Result<HttpResponse>;
            async fn execute_stream(&self, request: HttpRequest) -> Result<StreamingResponse>;
        }
    }

    fn response(status: u16, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            headers: HashMap::new(),
            body: Bytes::from(body.to_string()),
        }
    }

    fn connector(mock_http: MockHttpClient) -> IndexConnector {
        IndexConnector::new(Arc::new(mock_http), "https://index.test/")
    }

    #[tokio::test]
    async fn test_get_entry_found_with_manifest() {
        let mut mock_http = MockHttpClient::new();
        mock_http
            .expect_execute()
            .times(1)
            .returning(|req| {
                assert_eq!(req.url, "https://index.test/api/v0.3/videos/42");
                Ok(response(
                    200,
                    r#"{"id":"42","lastValidManifest":{"hash":"oldhash"}}"#,
                ))
            });

        let entry = connector(mock_http).get_entry("42").await.unwrap().unwrap();
        assert_eq!(entry.id, "42");
        assert_eq!(entry.manifest_hash.as_deref(), Some("oldhash"));
    }

    #[tokio::test]
    async fn test_get_entry_not_found() {
        let mut mock_http = MockHttpClient::new();
        mock_http
            .expect_execute()
            .times(1)
            .returning(|_| Ok(response(404, "")));

        assert!(connector(mock_http).get_entry("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_get_entry_server_error_is_fatal() {
        let mut mock_http = MockHttpClient::new();
        mock_http
            .expect_execute()
            .times(1)
            .returning(|_| Ok(response(502, "bad gateway")));

        let err = connector(mock_http).get_entry("42").await.unwrap_err();
        assert_eq!(err.status(), Some(502));
    }

    #[tokio::test]
    async fn test_create_entry() {
        let mut mock_http = MockHttpClient::new();
        mock_http
            .expect_execute()
            .times(1)
            .returning(|req| {
                assert_eq!(req.method, HttpMethod::Post);
                assert_eq!(req.url, "https://index.test/api/v0.3/videos");
                assert_eq!(
                    req.body.as_deref(),
                    Some(&br#"{"manifestHash":"manifest1"}"#[..])
                );
                Ok(response(200, "\"new-id\""))
            });

        let id = connector(mock_http)
            .create_entry(&ContentAddress::new("manifest1"))
            .await
            .unwrap();
        assert_eq!(id, "new-id");
    }

    #[tokio::test]
    async fn test_create_entry_empty_id() {
        let mut mock_http = MockHttpClient::new();
        mock_http
            .expect_execute()
            .times(1)
            .returning(|_| Ok(response(200, "")));

        let result = connector(mock_http)
            .create_entry(&ContentAddress::new("manifest1"))
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_update_entry() {
        let mut mock_http = MockHttpClient::new();
        mock_http
            .expect_execute()
            .times(1)
            .returning(|req| {
                assert_eq!(req.method, HttpMethod::Put);
                assert_eq!(
                    req.url,
                    "https://index.test/api/v0.3/videos/42?newHash=manifest2"
                );
                Ok(response(200, ""))
            });

        connector(mock_http)
            .with_access_token("token")
            .update_entry("42", &ContentAddress::new("manifest2"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_update_entry_failure() {
        let mut mock_http = MockHttpClient::new();
        mock_http
            .expect_execute()
            .times(1)
            .returning(|_| Ok(response(400, "invalid hash")));

        let err = connector(mock_http)
            .update_entry("42", &ContentAddress::new("manifest2"))
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(400));
    }
}
