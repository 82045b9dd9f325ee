//! Footage provider metrics.
//!
//! Provides standardized metrics for monitoring provider traffic:
//! - Search counters by provider and outcome
//! - Search latency histograms
//! - Download counters and sizes

use metrics::{counter, histogram};

/// Metric name constants for consistency.
pub mod names {
    /// Total searches by provider and status (ok, empty, error).
    pub const SEARCHES_TOTAL: &str = "footage_searches_total";

    /// Search latency in seconds by provider, including retries.
    pub const SEARCH_LATENCY_SECONDS: &str = "footage_search_latency_seconds";

    /// Total retry attempts by provider.
    pub const RETRIES_TOTAL: &str = "footage_retries_total";

    /// Total downloads by provider and status.
    pub const DOWNLOADS_TOTAL: &str = "footage_downloads_total";

    /// Downloaded clip size in bytes by provider.
    pub const DOWNLOAD_BYTES: &str = "footage_download_bytes";
}

pub fn record_search(provider: &str, status: &'static str, latency_secs: f64) {
    counter!(
        names::SEARCHES_TOTAL,
        "provider" => provider.to_string(),
        "status" => status
    )
    .increment(1);

    histogram!(
        names::SEARCH_LATENCY_SECONDS,
        "provider" => provider.to_string()
    )
    .record(latency_secs);
}

pub fn record_retry(provider: &str) {
    counter!(names::RETRIES_TOTAL, "provider" => provider.to_string()).increment(1);
}

pub fn record_download(provider: &str, bytes: Option<u64>) {
    let status = if bytes.is_some() { "ok" } else { "error" };
    counter!(
        names::DOWNLOADS_TOTAL,
        "provider" => provider.to_string(),
        "status" => status
    )
    .increment(1);

    if let Some(bytes) = bytes {
        histogram!(names::DOWNLOAD_BYTES, "provider" => provider.to_string()).record(bytes as f64);
    }
}
