//! Gateway API connector implementation
//!
//! Implements `PostageGateway` and `ContentStore` over an injected
//! `HttpClient`.

use async_trait::async_trait;
use bridge_traits::error::Result;
use bridge_traits::gateway::{
    BatchId, BatchReference, ContentAddress, ContentStore, PostageGateway, UploadFile,
};
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
use bytes::Bytes;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::error::GatewayError;
use crate::types::{unquote, BatchInfoResponse, ChainStateResponse, UploadResponse};

const CHAIN_STATE_PATH: &str = "api/v0.3/system/chainstate";
const BATCHES_PATH: &str = "api/v0.3/users/current/batches";
const BATCH_REFERENCE_PATH: &str = "api/v0.3/System/postageBatchRef";
const RESOURCES_PATH: &str = "api/v0.3/Resources";
const UPLOAD_PATH: &str = "bzz";

const POSTAGE_BATCH_HEADER: &str = "swarm-postage-batch-id";
const PIN_HEADER: &str = "swarm-pin";

/// Gateway API connector
///
/// # Example
///
/// ```ignore
/// use provider_gateway::GatewayConnector;
/// use bridge_traits::gateway::PostageGateway;
///
/// let gateway = GatewayConnector::new(http_client, "https://gateway.etherna.io/")
///     .with_access_token(token);
/// let price = gateway.chain_price().await?;
/// ```
pub struct GatewayConnector {
    http_client: Arc<dyn HttpClient>,
    /// Base URL ending with `/`
    base_url: String,
    access_token: Option<String>,
}

impl GatewayConnector {
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

    /// Attach a bearer token to every request
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request(&self, method: HttpMethod, url: String) -> HttpRequest {
        HttpRequest::new(method, url).maybe_bearer_token(self.access_token.as_deref())
    }

    /// POST with an empty JSON object, as the mutating endpoints expect
    fn empty_json_post(&self, url: String) -> Result<HttpRequest> {
        self.request(HttpMethod::Post, url)
            .json(&serde_json::json!({}))
    }

    fn ensure_success(response: HttpResponse) -> std::result::Result<HttpResponse, GatewayError> {
        if response.is_success() {
            Ok(response)
        } else {
            warn!(status = response.status, "Gateway request failed");
            Err(GatewayError::ApiError {
                status_code: response.status,
                message: String::from_utf8_lossy(&response.body).to_string(),
            })
        }
    }
}

#[async_trait]
impl PostageGateway for GatewayConnector {
    #[instrument(skip(self))]
    async fn chain_price(&self) -> Result<u64> {
        let request = self.request(HttpMethod::Get, self.url(CHAIN_STATE_PATH));
        let response = Self::ensure_success(self.http_client.execute(request).await?)?;

        let state: ChainStateResponse = serde_json::from_slice(&response.body).map_err(|e| {
            GatewayError::ParseError(format!("Failed to parse chain state: {}", e))
        })?;

        debug!(current_price = state.current_price, "Fetched chain state");
        Ok(state.current_price)
    }

    #[instrument(skip(self))]
    async fn create_batch(&self, depth: u8, amount: u64) -> Result<BatchReference> {
        let url = format!(
            "{}?depth={}&amount={}",
            self.url(BATCHES_PATH),
            depth,
            amount
        );
        let request = self.empty_json_post(url)?;
        let response = Self::ensure_success(self.http_client.execute(request).await?)?;

        let text = response.text()?;
        let reference = unquote(&text);
        if reference.is_empty() {
            return Err(GatewayError::EmptyResponse("batch reference").into());
        }

        info!(reference = %reference, "Batch reservation accepted");
        Ok(BatchReference::new(reference))
    }

    #[instrument(skip(self), fields(reference = %reference))]
    async fn batch_id_for_reference(
        &self,
        reference: &BatchReference,
    ) -> Result<Option<BatchId>> {
        let url = format!(
            "{}/{}",
            self.url(BATCH_REFERENCE_PATH),
            urlencoding::encode(reference.as_str())
        );
        let response = self
            .http_client
            .execute(self.request(HttpMethod::Get, url))
            .await?;

        if response.status != 200 {
            debug!(status = response.status, "Batch id not assigned yet");
            return Ok(None);
        }

        let text = response.text()?;
        let batch_id = unquote(&text);
        if batch_id.is_empty() {
            return Ok(None);
        }

        Ok(Some(BatchId::new(batch_id)))
    }

    #[instrument(skip(self), fields(batch_id = %batch_id))]
    async fn is_batch_usable(&self, batch_id: &BatchId) -> Result<bool> {
        let url = format!(
            "{}/{}",
            self.url(BATCHES_PATH),
            urlencoding::encode(batch_id.as_str())
        );
        let response = self
            .http_client
            .execute(self.request(HttpMethod::Get, url))
            .await?;

        if !response.is_success() {
            debug!(status = response.status, "Batch not usable yet");
            return Ok(false);
        }

        let info: BatchInfoResponse = serde_json::from_slice(&response.body).map_err(|e| {
            GatewayError::ParseError(format!("Failed to parse batch info: {}", e))
        })?;

        Ok(info.usable)
    }

    #[instrument(skip(self), fields(address = %address))]
    async fn offer_resource(&self, address: &ContentAddress) -> Result<()> {
        let url = format!(
            "{}/{}/offers",
            self.url(RESOURCES_PATH),
            urlencoding::encode(address.as_str())
        );
        let request = self.empty_json_post(url)?;
        Self::ensure_success(self.http_client.execute(request).await?)?;

        debug!("Resource offered");
        Ok(())
    }
}

#[async_trait]
impl ContentStore for GatewayConnector {
    #[instrument(skip(self, file), fields(batch_id = %batch_id, name = %file.name, size = file.data.len()))]
    async fn upload_file(
        &self,
        batch_id: &BatchId,
        file: UploadFile,
        pin: bool,
    ) -> Result<ContentAddress> {
        let url = format!(
            "{}?name={}",
            self.url(UPLOAD_PATH),
            urlencoding::encode(&file.name)
        );
        let body: Bytes = file.data;
        let request = self
            .request(HttpMethod::Post, url)
            .header(POSTAGE_BATCH_HEADER, batch_id.as_str())
            .header(PIN_HEADER, pin.to_string())
            .header("Content-Type", file.mime_type)
            .body(body);

        let response = Self::ensure_success(self.http_client.execute(request).await?)?;
        let upload: UploadResponse = serde_json::from_slice(&response.body).map_err(|e| {
            GatewayError::ParseError(format!("Failed to parse upload response: {}", e))
        })?;

        let address = ContentAddress::new(upload.reference);
        if address.is_blank() {
            return Err(GatewayError::EmptyResponse("content reference").into());
        }

        info!(address = %address, "Upload stored");
        Ok(address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::http::StreamingResponse;
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

    fn connector(mock_http: MockHttpClient) -> GatewayConnector {
        GatewayConnector::new(Arc::new(mock_http), "https://gateway.test")
    }

    #[tokio::test]
    async fn test_chain_price() {
        let mut mock_http = MockHttpClient::new();
        mock_http
            .expect_execute()
            .times(1)
            .returning(|req| {
                assert_eq!(req.method, HttpMethod::Get);
                assert_eq!(req.url, "https://gateway.test/api/v0.3/system/chainstate");
                Ok(response(200, r#"{"currentPrice": 24000}"#))
            });

        let price = connector(mock_http).chain_price().await.unwrap();
        assert_eq!(price, 24000);
    }

    #[tokio::test]
    async fn test_chain_price_error_status() {
        let mut mock_http = MockHttpClient::new();
        mock_http
            .expect_execute()
            .times(1)
            .returning(|_| Ok(response(500, "boom")));

        let err = connector(mock_http).chain_price().await.unwrap_err();
        assert_eq!(err.status(), Some(500));
    }

    #[tokio::test]
    async fn test_create_batch_sends_depth_and_amount() {
        let mut mock_http = MockHttpClient::new();
        mock_http
            .expect_execute()
            .times(1)
            .returning(|req| {
                assert_eq!(req.method, HttpMethod::Post);
                assert_eq!(
                    req.url,
                    "https://gateway.test/api/v0.3/users/current/batches?depth=20&amount=6570"
                );
                assert_eq!(req.body.as_deref(), Some(&b"{}"[..]));
                Ok(response(200, "\"ref-123\""))
            });

        let reference = connector(mock_http).create_batch(20, 6570).await.unwrap();
        assert_eq!(reference.as_str(), "ref-123");
    }

    #[tokio::test]
    async fn test_create_batch_empty_body_is_error() {
        let mut mock_http = MockHttpClient::new();
        mock_http
            .expect_execute()
            .times(1)
            .returning(|_| Ok(response(200, "  ")));

        assert!(connector(mock_http).create_batch(20, 1).await.is_err());
    }

    #[tokio::test]
    async fn test_batch_id_not_ready_on_non_ok_or_empty() {
        let mut mock_http = MockHttpClient::new();
        let mut calls = 0;
        mock_http
            .expect_execute()
            .times(3)
            .returning(move |req| {
                assert_eq!(
                    req.url,
                    "https://gateway.test/api/v0.3/System/postageBatchRef/ref-123"
                );
                calls += 1;
                match calls {
                    1 => Ok(response(404, "")),
                    2 => Ok(response(200, "")),
                    _ => Ok(response(200, "f00dbatch")),
                }
            });

        let gateway = connector(mock_http);
        let reference = BatchReference::new("ref-123");

        assert_eq!(gateway.batch_id_for_reference(&reference).await.unwrap(), None);
        assert_eq!(gateway.batch_id_for_reference(&reference).await.unwrap(), None);
        assert_eq!(
            gateway.batch_id_for_reference(&reference).await.unwrap(),
            Some(BatchId::new("f00dbatch"))
        );
    }

    #[tokio::test]
    async fn test_batch_usability() {
        let mut mock_http = MockHttpClient::new();
        let mut calls = 0;
        mock_http
            .expect_execute()
            .times(2)
            .returning(move |req| {
                assert_eq!(
                    req.url,
                    "https://gateway.test/api/v0.3/users/current/batches/f00d"
                );
                calls += 1;
                if calls == 1 {
                    Ok(response(404, "not found"))
                } else {
                    Ok(response(200, r#"{"id":"f00d","usable":true}"#))
                }
            });

        let gateway = connector(mock_http);
        let batch_id = BatchId::new("f00d");

        assert!(!gateway.is_batch_usable(&batch_id).await.unwrap());
        assert!(gateway.is_batch_usable(&batch_id).await.unwrap());
    }

    #[tokio::test]
    async fn test_offer_resource() {
        let mut mock_http = MockHttpClient::new();
        mock_http
            .expect_execute()
            .times(1)
            .returning(|req| {
                assert_eq!(req.method, HttpMethod::Post);
                assert_eq!(
                    req.url,
                    "https://gateway.test/api/v0.3/Resources/abc123/offers"
                );
                Ok(response(200, ""))
            });

        connector(mock_http)
            .offer_resource(&ContentAddress::new("abc123"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_upload_file_headers() {
        let mut mock_http = MockHttpClient::new();
        mock_http
            .expect_execute()
            .times(1)
            .returning(|req| {
                assert_eq!(req.url, "https://gateway.test/bzz?name=my%20video.mp4");
                assert_eq!(
                    req.headers.get("swarm-postage-batch-id"),
                    Some(&"f00d".to_string())
                );
                assert_eq!(req.headers.get("swarm-pin"), Some(&"true".to_string()));
                assert_eq!(req.headers.get("Content-Type"), Some(&"video/mp4".to_string()));
                assert!(req.headers.contains_key("Authorization"));
                assert_eq!(req.body.as_deref(), Some(&b"data"[..]));
                Ok(response(201, r#"{"reference":"cafebabe"}"#))
            });

        let gateway = connector(mock_http).with_access_token("token");
        let file = UploadFile::new("my video.mp4", "video/mp4", Bytes::from_static(b"data"));

        let address = gateway
            .upload_file(&BatchId::new("f00d"), file, true)
            .await
            .unwrap();
        assert_eq!(address.as_str(), "cafebabe");
    }

    #[tokio::test]
    async fn test_upload_failure_status() {
        let mut mock_http = MockHttpClient::new();
        mock_http
            .expect_execute()
            .times(1)
            .returning(|_| Ok(response(402, "batch overissued")));

        let file = UploadFile::new("thumb.jpg", "image/jpeg", Bytes::from_static(b"jpg"));
        let err = connector(mock_http)
            .upload_file(&BatchId::new("f00d"), file, false)
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(402));
    }
}
