//! Chunked download and staging against an in-memory range server

use async_trait::async_trait;
use bridge_desktop::TokioFileSystem;
use bridge_traits::error::{BridgeError, Result as BridgeResult};
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, StreamingResponse};
use bridge_traits::media::{DurationExtractor, VariantCandidate, VariantSource};
use bytes::Bytes;
use core_download::{AssetStager, ChunkedDownloader, DownloadError, ThumbnailFetcher};
use core_runtime::config::TransferSettings;
use core_runtime::events::NullProgress;
use core_runtime::retry::RetryPolicy;
use std::collections::HashMap;
use std::io::Cursor;
use std::path::Path;
use std::sync::{Arc, Mutex};

const THUMBNAIL_BYTES: &[u8] = b"\xff\xd8thumbnail";

/// Serves one resource with `Range` support
///
/// `truncate_next` makes the next N range responses stop halfway through
/// the body, like a dropped connection.
struct RangeServer {
    data: Bytes,
    ignore_range: bool,
    report_length: bool,
    truncate_next: Mutex<HashMap<u64, u32>>,
    ranges_served: Mutex<Vec<(u64, u64)>>,
    head_requests: Mutex<u32>,
}

impl RangeServer {
    fn new(data: Vec<u8>) -> Self {
        Self {
            data: Bytes::from(data),
            ignore_range: false,
            report_length: true,
            truncate_next: Mutex::new(HashMap::new()),
            ranges_served: Mutex::new(Vec::new()),
            head_requests: Mutex::new(0),
        }
    }

    fn truncate_range(self, start: u64, times: u32) -> Self {
        self.truncate_next.lock().unwrap().insert(start, times);
        self
    }

    fn ranges(&self) -> Vec<(u64, u64)> {
        self.ranges_served.lock().unwrap().clone()
    }
}

fn parse_range(request: &HttpRequest) -> Option<(u64, u64)> {
    let value = request.headers.get("Range")?;
    let (start, end) = value.strip_prefix("bytes=")?.split_once('-')?;
    Some((start.parse().ok()?, end.parse().ok()?))
}

#[async_trait]
impl HttpClient for RangeServer {
    async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse> {
        if request.url.ends_with(".jpg") {
            return Ok(HttpResponse {
                status: 200,
                headers: HashMap::new(),
                body: Bytes::from_static(THUMBNAIL_BYTES),
            });
        }

        assert_eq!(request.method, HttpMethod::Head);
        *self.head_requests.lock().unwrap() += 1;

        let mut headers = HashMap::new();
        if self.report_length {
            headers.insert("content-length".to_string(), self.data.len().to_string());
        }
        Ok(HttpResponse {
            status: 200,
            headers,
            body: Bytes::new(),
        })
    }

    async fn execute_stream(&self, request: HttpRequest) -> BridgeResult<StreamingResponse> {
        let (start, end) = parse_range(&request)
            .ok_or_else(|| BridgeError::OperationFailed("missing Range header".to_string()))?;
        self.ranges_served.lock().unwrap().push((start, end));

        if self.ignore_range {
            return Ok(StreamingResponse {
                status: 200,
                headers: HashMap::new(),
                body: Box::new(Cursor::new(self.data.to_vec())),
            });
        }

        let end = end.min(self.data.len() as u64 - 1);
        let mut body = self.data.slice(start as usize..=end as usize).to_vec();

        let mut truncations = self.truncate_next.lock().unwrap();
        if let Some(remaining) = truncations.get_mut(&start) {
            if *remaining > 0 {
                *remaining -= 1;
                body.truncate(body.len() / 2);
            }
        }

        Ok(StreamingResponse {
            status: 206,
            headers: HashMap::new(),
            body: Box::new(Cursor::new(body)),
        })
    }
}

fn sample_data(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

fn settings(chunk_size: u64, buffer_size: usize) -> TransferSettings {
    TransferSettings {
        chunk_size,
        buffer_size,
        request_timeout: None,
    }
}

fn downloader(server: Arc<RangeServer>, chunk_size: u64, buffer_size: usize) -> ChunkedDownloader {
    ChunkedDownloader::new(
        server,
        Arc::new(TokioFileSystem::new()),
        settings(chunk_size, buffer_size),
        RetryPolicy::default(),
    )
    .unwrap()
}

#[tokio::test]
async fn downloads_all_ranges_in_order() {
    let data = sample_data(2_500);
    let server = Arc::new(RangeServer::new(data.clone()));
    let dir = tempfile::tempdir().unwrap();
    let destination = dir.path().join("video.mp4");

    let seen = Mutex::new(Vec::new());
    let progress = |done: u64, total: u64| seen.lock().unwrap().push((done, total));

    let written = downloader(server.clone(), 1_000, 256)
        .download("https://cdn.test/video.mp4", &destination, &progress)
        .await
        .unwrap();

    assert_eq!(written, 2_500);
    assert_eq!(std::fs::read(&destination).unwrap(), data);
    assert_eq!(server.ranges(), vec![(0, 999), (1_000, 1_999), (2_000, 2_499)]);

    let reports = seen.into_inner().unwrap();
    assert!(reports.windows(2).all(|pair| pair[0].0 <= pair[1].0));
    assert!(reports.iter().all(|(_, total)| *total == 2_500));
    assert_eq!(reports.last(), Some(&(2_500, 2_500)));
}

#[tokio::test]
async fn failed_range_is_refetched_alone() {
    let data = sample_data(3_000);
    let server = Arc::new(RangeServer::new(data.clone()).truncate_range(1_000, 2));
    let dir = tempfile::tempdir().unwrap();
    let destination = dir.path().join("video.mp4");

    let seen = Mutex::new(Vec::new());
    let progress = |done: u64, _total: u64| seen.lock().unwrap().push(done);

    downloader(server.clone(), 1_000, 128)
        .download("https://cdn.test/video.mp4", &destination, &progress)
        .await
        .unwrap();

    assert_eq!(std::fs::read(&destination).unwrap(), data);
    assert_eq!(
        server.ranges(),
        vec![
            (0, 999),
            (1_000, 1_999),
            (1_000, 1_999),
            (1_000, 1_999),
            (2_000, 2_999)
        ]
    );

    let reports = seen.into_inner().unwrap();
    assert!(reports.windows(2).all(|pair| pair[0] <= pair[1]));
    assert_eq!(reports.last(), Some(&3_000));
}

#[tokio::test]
async fn range_failing_every_attempt_is_fatal() {
    let server = Arc::new(RangeServer::new(sample_data(2_000)).truncate_range(0, 3));
    let dir = tempfile::tempdir().unwrap();

    let err = downloader(server.clone(), 1_000, 128)
        .download("https://cdn.test/video.mp4", &dir.path().join("v.mp4"), &NullProgress)
        .await
        .unwrap_err();

    match err {
        DownloadError::Retry(retry) => {
            assert_eq!(retry.attempts(), 3);
            assert!(matches!(retry.last_error(), DownloadError::ShortRange { .. }));
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(server.ranges().len(), 3);
}

#[tokio::test]
async fn ignored_range_on_multi_range_download_is_fatal() {
    let mut server = RangeServer::new(sample_data(2_000));
    server.ignore_range = true;
    let server = Arc::new(server);
    let dir = tempfile::tempdir().unwrap();

    let err = downloader(server.clone(), 1_000, 128)
        .download("https://cdn.test/video.mp4", &dir.path().join("v.mp4"), &NullProgress)
        .await
        .unwrap_err();

    match err {
        DownloadError::Retry(retry) => {
            assert_eq!(retry.attempts(), 1);
            assert!(matches!(
                retry.last_error(),
                DownloadError::RangeIgnored { status: 200, .. }
            ));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn single_range_accepts_full_response() {
    let data = sample_data(700);
    let mut server = RangeServer::new(data.clone());
    server.ignore_range = true;
    let server = Arc::new(server);
    let dir = tempfile::tempdir().unwrap();
    let destination = dir.path().join("v.mp4");

    let written = downloader(server, 1_000, 128)
        .download("https://cdn.test/video.mp4", &destination, &NullProgress)
        .await
        .unwrap();

    assert_eq!(written, 700);
    assert_eq!(std::fs::read(&destination).unwrap(), data);
}

#[tokio::test]
async fn missing_content_length_is_fatal() {
    let mut server = RangeServer::new(sample_data(10));
    server.report_length = false;
    let server = Arc::new(server);
    let dir = tempfile::tempdir().unwrap();

    let err = downloader(server.clone(), 1_000, 128)
        .download("https://cdn.test/video.mp4", &dir.path().join("v.mp4"), &NullProgress)
        .await
        .unwrap_err();

    assert!(matches!(err, DownloadError::MissingContentLength { .. }));
    assert!(server.ranges().is_empty());
}

#[tokio::test]
async fn empty_resource_is_fatal() {
    let server = Arc::new(RangeServer::new(Vec::new()));
    let dir = tempfile::tempdir().unwrap();

    let err = downloader(server, 1_000, 128)
        .download("https://cdn.test/video.mp4", &dir.path().join("v.mp4"), &NullProgress)
        .await
        .unwrap_err();

    assert!(matches!(err, DownloadError::EmptyContent { .. }));
}

#[test]
fn zero_sized_settings_are_rejected() {
    for (chunk_size, buffer_size) in [(0, 128), (1_000, 0)] {
        let result = ChunkedDownloader::new(
            Arc::new(RangeServer::new(sample_data(10))),
            Arc::new(TokioFileSystem::new()),
            settings(chunk_size, buffer_size),
            RetryPolicy::default(),
        );

        assert!(matches!(result, Err(DownloadError::Config(_))));
    }
}

// ---------------------------------------------------------------------------
// Staging
// ---------------------------------------------------------------------------

struct FixedSource {
    candidates: Vec<VariantCandidate>,
    seen_max_mb: Mutex<Option<Option<u64>>>,
}

#[async_trait]
impl VariantSource for FixedSource {
    async fn variants(
        &self,
        _source_url: &str,
        max_filesize_mb: Option<u64>,
    ) -> BridgeResult<Vec<VariantCandidate>> {
        *self.seen_max_mb.lock().unwrap() = Some(max_filesize_mb);
        Ok(self.candidates.clone())
    }
}

struct FixedDuration(u64);

#[async_trait]
impl DurationExtractor for FixedDuration {
    async fn duration_secs(&self, _path: &Path) -> BridgeResult<u64> {
        Ok(self.0)
    }
}

fn candidate(resolution: u32) -> VariantCandidate {
    VariantCandidate {
        uri: format!("https://cdn.test/{}.mp4", resolution),
        resolution,
        audio_bitrate: 128,
        filename: format!("{}_talk.mp4", resolution),
    }
}

fn stager(
    server: Arc<RangeServer>,
    source: Arc<FixedSource>,
    duration: u64,
    staging_dir: &Path,
) -> AssetStager {
    let fs = Arc::new(TokioFileSystem::new());
    AssetStager::new(
        downloader(server.clone(), 1_000, 256),
        ThumbnailFetcher::new(
            server,
            fs.clone(),
            "https://img.test/vi/{id}/maxresdefault.jpg",
            RetryPolicy::default(),
        ),
        fs,
        source,
        Arc::new(FixedDuration(duration)),
        staging_dir,
    )
}

#[tokio::test]
async fn stages_variants_and_thumbnail() {
    let server = Arc::new(RangeServer::new(sample_data(4_000)));
    let source = Arc::new(FixedSource {
        candidates: vec![candidate(720), candidate(480)],
        seen_max_mb: Mutex::new(None),
    });
    let dir = tempfile::tempdir().unwrap();
    let staging = dir.path().join("staging");

    let staged = stager(server, source.clone(), 120, &staging)
        .with_max_filesize_mb(Some(500))
        .stage("abc123", "https://www.youtube.com/watch?v=abc123", &NullProgress)
        .await
        .unwrap();

    assert_eq!(*source.seen_max_mb.lock().unwrap(), Some(Some(500)));
    assert_eq!(staged.duration, 120);
    assert_eq!(staged.variants.len(), 2);

    let first = &staged.variants[0];
    assert_eq!(first.label, "720p");
    assert_eq!(first.size, 4_000);
    assert_eq!(first.bitrate, 267);
    assert_eq!(first.path, staging.join("720_talk.mp4"));
    assert!(first.path.exists());
    assert_eq!(staged.variants[1].label, "480p");

    assert_eq!(staged.thumbnail_path, staging.join("abc123.jpg"));
    assert_eq!(std::fs::read(&staged.thumbnail_path).unwrap(), THUMBNAIL_BYTES);
}

#[tokio::test]
async fn zero_duration_stops_staging() {
    let server = Arc::new(RangeServer::new(sample_data(100)));
    let source = Arc::new(FixedSource {
        candidates: vec![candidate(720)],
        seen_max_mb: Mutex::new(None),
    });
    let dir = tempfile::tempdir().unwrap();

    let err = stager(server, source, 0, dir.path())
        .stage("abc123", "https://www.youtube.com/watch?v=abc123", &NullProgress)
        .await
        .unwrap_err();

    assert!(matches!(err, DownloadError::InvalidDuration { duration: 0, .. }));
    assert!(!dir.path().join("abc123.jpg").exists());
}

#[tokio::test]
async fn no_candidates_is_an_error() {
    let server = Arc::new(RangeServer::new(sample_data(100)));
    let source = Arc::new(FixedSource {
        candidates: Vec::new(),
        seen_max_mb: Mutex::new(None),
    });
    let dir = tempfile::tempdir().unwrap();

    let err = stager(server, source, 60, dir.path())
        .stage("abc123", "https://www.youtube.com/watch?v=abc123", &NullProgress)
        .await
        .unwrap_err();

    assert!(matches!(err, DownloadError::NoVariants { .. }));
}
