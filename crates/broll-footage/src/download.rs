//! Streaming clip downloader.

use futures::StreamExt;
use reqwest::Client;
use std::path::Path;
use std::time::Duration;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::error::{ProviderError, ProviderResult};
use crate::provider::check_status;

/// Default per-clip download timeout.
pub const DEFAULT_DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(90);

/// Default upper bound on a single clip's size.
pub const DEFAULT_MAX_DOWNLOAD_BYTES: u64 = 300 * 1024 * 1024;

/// Downloads clip renditions to local files with a hard time and size limit.
#[derive(Debug, Clone)]
pub struct ClipDownloader {
    http: Client,
    timeout: Duration,
    max_bytes: u64,
}

impl ClipDownloader {
    pub fn new(timeout: Duration) -> ProviderResult<Self> {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(15))
            .build()
            .map_err(ProviderError::Network)?;
        Ok(Self {
            http,
            timeout,
            max_bytes: DEFAULT_MAX_DOWNLOAD_BYTES,
        })
    }

    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    /// Download `url` into `dest`, returning the number of bytes written.
    ///
    /// A partially written file is removed on any failure, including the
    /// timeout.
    pub async fn download(&self, provider: &str, url: &str, dest: &Path) -> ProviderResult<u64> {
        let result = match tokio::time::timeout(self.timeout, self.stream_to_file(provider, url, dest)).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout(self.timeout.as_secs())),
        };

        match &result {
            Ok(bytes) => debug!(provider, url, bytes, "Downloaded clip"),
            Err(e) => {
                warn!(provider, url, "Clip download failed: {}", e);
                if let Err(rm) = tokio::fs::remove_file(dest).await {
                    if rm.kind() != std::io::ErrorKind::NotFound {
                        warn!("Failed to remove partial download {}: {}", dest.display(), rm);
                    }
                }
            }
        }

        crate::metrics::record_download(provider, result.as_ref().ok().copied());
        result
    }

    async fn stream_to_file(&self, provider: &str, url: &str, dest: &Path) -> ProviderResult<u64> {
        let response = self.http.get(url).send().await?;
        let response = check_status(provider, response).await?;

        if let Some(len) = response.content_length() {
            if len > self.max_bytes {
                return Err(ProviderError::download_failed(format!(
                    "clip is {} bytes, limit is {}",
                    len, self.max_bytes
                )));
            }
        }

        let mut file = File::create(dest).await?;
        let mut stream = response.bytes_stream();
        let mut written = 0u64;

        while let Some(chunk) = stream.next().await {
            let data = chunk?;
            written += data.len() as u64;
            if written > self.max_bytes {
                return Err(ProviderError::download_failed(format!(
                    "clip exceeded {} bytes",
                    self.max_bytes
                )));
            }
            file.write_all(&data).await?;
        }
        file.flush().await?;

        if written == 0 {
            return Err(ProviderError::download_failed("empty response body"));
        }

        Ok(written)
    }
}
