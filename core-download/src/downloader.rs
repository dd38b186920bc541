//! Chunked, range-resumable downloader

use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest};
use bridge_traits::storage::{FileSystemAccess, SeekableWrite};
use core_runtime::config::TransferSettings;
use core_runtime::events::ProgressSink;
use core_runtime::logging::strip_path;
use core_runtime::retry::RetryPolicy;
use std::io::SeekFrom;
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tracing::{debug, info, instrument};

use crate::error::{DownloadError, Result};

/// Inclusive `(start, end)` byte windows covering `[0, length)`
///
/// The last window is clipped to the length.
pub fn byte_ranges(length: u64, chunk_size: u64) -> Vec<(u64, u64)> {
    let chunk_size = chunk_size.max(1);
    let mut ranges = Vec::with_capacity(length.div_ceil(chunk_size) as usize);
    let mut start = 0;

    while start < length {
        let end = (start + chunk_size).min(length) - 1;
        ranges.push((start, end));
        start = end + 1;
    }

    ranges
}

/// Keeps reported progress from moving backwards when a range is re-fetched
struct ProgressTracker<'a> {
    sink: &'a dyn ProgressSink,
    total: u64,
    high_water: u64,
}

impl ProgressTracker<'_> {
    fn report(&mut self, position: u64) {
        self.high_water = self.high_water.max(position);
        self.sink.report(self.high_water, self.total);
    }
}

/// Downloads a remote resource through sequential range requests
///
/// The destination is opened once and written in place; a failed range is
/// fetched again from its first byte under the retry policy, other ranges
/// are never repeated.
pub struct ChunkedDownloader {
    http: Arc<dyn HttpClient>,
    fs: Arc<dyn FileSystemAccess>,
    settings: TransferSettings,
    retry: RetryPolicy,
}

impl ChunkedDownloader {
    pub fn new(
        http: Arc<dyn HttpClient>,
        fs: Arc<dyn FileSystemAccess>,
        settings: TransferSettings,
        retry: RetryPolicy,
    ) -> Result<Self> {
        settings.validate()?;
        Ok(Self {
            http,
            fs,
            settings,
            retry,
        })
    }

    fn request(&self, method: HttpMethod, uri: &str) -> HttpRequest {
        let request = HttpRequest::new(method, uri);
        match self.settings.request_timeout {
            Some(timeout) => request.timeout(timeout),
            None => request,
        }
    }

    /// Total size of the resource from a `HEAD` request
    ///
    /// The request is retried; a missing or zero length is fatal.
    #[instrument(skip(self))]
    pub async fn content_length(&self, uri: &str) -> Result<u64> {
        let response = self
            .retry
            .run("probe content length", move |_| async move {
                let response = self.http.execute(self.request(HttpMethod::Head, uri)).await?;
                response.error_for_status().map_err(DownloadError::from)
            })
            .await?;

        match response.content_length() {
            Some(0) => Err(DownloadError::EmptyContent {
                uri: uri.to_string(),
            }),
            Some(length) => Ok(length),
            None => Err(DownloadError::MissingContentLength {
                uri: uri.to_string(),
            }),
        }
    }

    /// Download `uri` into `destination`, returning the number of bytes written
    ///
    /// `progress` receives `(bytes_so_far, total)` after every buffer.
    #[instrument(skip(self, destination, progress), fields(destination = %strip_path(destination)))]
    pub async fn download(
        &self,
        uri: &str,
        destination: &Path,
        progress: &dyn ProgressSink,
    ) -> Result<u64> {
        let total = self.content_length(uri).await?;
        let ranges = byte_ranges(total, self.settings.chunk_size);
        let single_range = ranges.len() == 1;
        debug!(total, ranges = ranges.len(), "Starting chunked download");

        let mut writer = self.fs.create_write_stream(destination).await?;
        let mut tracker = ProgressTracker {
            sink: progress,
            total,
            high_water: 0,
        };
        let mut written = 0u64;

        for (start, end) in ranges {
            let mut budget = self.retry.budget(format!("download range {}-{}", start, end));

            loop {
                match self
                    .copy_range(uri, start, end, single_range, &mut writer, &mut tracker)
                    .await
                {
                    Ok(copied) => {
                        written += copied;
                        break;
                    }
                    Err(error) if !error.is_retryable() => return Err(budget.abort(error).into()),
                    Err(error) => budget.record_failure(error)?,
                }
            }
        }

        writer.flush().await?;

        if written != total {
            return Err(DownloadError::LengthMismatch {
                uri: uri.to_string(),
                expected: total,
                actual: written,
            });
        }

        info!(bytes = written, "Download complete");
        Ok(written)
    }

    async fn copy_range(
        &self,
        uri: &str,
        start: u64,
        end: u64,
        single_range: bool,
        writer: &mut Box<dyn SeekableWrite>,
        tracker: &mut ProgressTracker<'_>,
    ) -> Result<u64> {
        writer.seek(SeekFrom::Start(start)).await?;

        let request = self.request(HttpMethod::Get, uri).range(start, end);
        let mut response = self.http.execute_stream(request).await?;

        match response.status {
            206 => {}
            200 if single_range => {}
            200 => {
                return Err(DownloadError::RangeIgnored {
                    uri: uri.to_string(),
                    status: 200,
                })
            }
            status => {
                return Err(DownloadError::UnexpectedStatus {
                    uri: uri.to_string(),
                    status,
                })
            }
        }

        let expected = end - start + 1;
        let mut buffer = vec![0u8; self.settings.buffer_size];
        let mut copied = 0u64;

        while copied < expected {
            let read = response.body.read(&mut buffer).await?;
            if read == 0 {
                break;
            }

            let take = (read as u64).min(expected - copied) as usize;
            writer.write_all(&buffer[..take]).await?;
            copied += take as u64;
            tracker.report(start + copied);
        }

        if copied != expected {
            return Err(DownloadError::ShortRange {
                uri: uri.to_string(),
                start,
                end,
                received: copied,
            });
        }

        Ok(copied)
    }
}
