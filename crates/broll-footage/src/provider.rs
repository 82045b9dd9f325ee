//! Footage provider abstraction and shared HTTP plumbing.

use async_trait::async_trait;
use reqwest::{Client, Response};
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::warn;

use broll_models::ClipCandidate;

use crate::error::{ProviderError, ProviderResult};
use crate::metrics;

/// A stock-footage search service.
#[async_trait]
pub trait FootageProvider: Send + Sync {
    /// Short provider name used in logs, metrics and file names.
    fn name(&self) -> &str;

    /// Search for clips matching `query`.
    ///
    /// Candidates are returned in provider ranking order and may still fail
    /// the acquisition filters.
    async fn search(&self, query: &str) -> ProviderResult<Vec<ClipCandidate>>;
}

/// Configuration shared by the HTTP providers.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Base URL of the provider API
    pub base_url: String,
    /// API key
    pub api_key: Option<String>,
    /// Search request timeout
    pub timeout: Duration,
    /// Max retries on transient errors
    pub max_retries: u32,
    /// Results requested per search
    pub per_page: u32,
    /// Minimum rendition width in pixels
    pub min_width: u32,
}

impl ProviderConfig {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key,
            timeout: Duration::from_secs(20),
            max_retries: 1,
            per_page: 15,
            min_width: 1280,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_min_width(mut self, min_width: u32) -> Self {
        self.min_width = min_width;
        self
    }

    pub fn with_per_page(mut self, per_page: u32) -> Self {
        self.per_page = per_page;
        self
    }

    /// API key, or [`ProviderError::MissingApiKey`].
    pub(crate) fn require_key(&self, provider: &str) -> ProviderResult<String> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_string)
            .ok_or_else(|| ProviderError::MissingApiKey(provider.to_string()))
    }

    pub(crate) fn build_client(&self) -> ProviderResult<Client> {
        Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(ProviderError::Network)
    }
}

/// Turn a non-2xx response into [`ProviderError::Status`].
pub(crate) async fn check_status(provider: &str, response: Response) -> ProviderResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ProviderError::Status {
        provider: provider.to_string(),
        status: status.as_u16(),
        body: body.chars().take(200).collect(),
    })
}

/// Execute a search with retry on transient errors, recording metrics.
pub(crate) async fn search_with_retry<F, Fut>(
    provider: &str,
    max_retries: u32,
    operation: F,
) -> ProviderResult<Vec<ClipCandidate>>
where
    F: Fn() -> Fut,
    Fut: Future<Output = ProviderResult<Vec<ClipCandidate>>>,
{
    let started = Instant::now();
    let mut attempt = 0u32;

    let result = loop {
        match operation().await {
            Err(e) if e.is_retryable() && attempt < max_retries => {
                let delay = Duration::from_millis(500 * 2u64.pow(attempt));
                warn!(
                    "{} search failed (attempt {}), retrying in {:?}: {}",
                    provider,
                    attempt + 1,
                    delay,
                    e
                );
                metrics::record_retry(provider);
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            other => break other,
        }
    };

    let status = match &result {
        Ok(candidates) if candidates.is_empty() => "empty",
        Ok(_) => "ok",
        Err(_) => "error",
    };
    metrics::record_search(provider, status, started.elapsed().as_secs_f64());

    result
}
