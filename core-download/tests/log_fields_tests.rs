//! Log output of the download path, kept in its own binary so the captured
//! subscriber sees every event.

use async_trait::async_trait;
use bridge_desktop::TokioFileSystem;
use bridge_traits::error::{BridgeError, Result as BridgeResult};
use bridge_traits::http::{HttpClient, HttpRequest, HttpResponse, StreamingResponse};
use bytes::Bytes;
use core_download::ThumbnailFetcher;
use core_runtime::retry::RetryPolicy;
use std::collections::HashMap;
use std::io;
use std::sync::{Arc, Mutex};

struct JpegServer;

#[async_trait]
impl HttpClient for JpegServer {
    async fn execute(&self, _request: HttpRequest) -> BridgeResult<HttpResponse> {
        Ok(HttpResponse {
            status: 200,
            headers: HashMap::new(),
            body: Bytes::from_static(b"\xff\xd8jpeg"),
        })
    }

    async fn execute_stream(&self, _request: HttpRequest) -> BridgeResult<StreamingResponse> {
        Err(BridgeError::NotAvailable("streaming".to_string()))
    }
}

#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl CapturedLogs {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

#[tokio::test]
async fn thumbnail_logs_record_file_names_only() {
    let logs = CapturedLogs::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let dir = tempfile::tempdir().unwrap();
    let fetcher = ThumbnailFetcher::new(
        Arc::new(JpegServer),
        Arc::new(TokioFileSystem::new()),
        "https://img.test/vi/{id}/maxresdefault.jpg",
        RetryPolicy::default(),
    );

    let path = fetcher
        .download_thumbnail("abc123", dir.path())
        .await
        .unwrap();
    assert!(path.ends_with("abc123.jpg"));

    let output = logs.contents();
    assert!(output.contains("Thumbnail downloaded"));
    assert!(output.contains("Wrote file"));
    assert!(output.contains("file=abc123.jpg"));
    assert!(!output.contains(&*dir.path().to_string_lossy()));
}
