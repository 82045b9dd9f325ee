//! Pexels video search client.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use broll_models::{ClipCandidate, ClipMetadata};

use crate::error::{ProviderError, ProviderResult};
use crate::provider::{check_status, search_with_retry, FootageProvider, ProviderConfig};

pub const PEXELS_NAME: &str = "pexels";
pub const PEXELS_BASE_URL: &str = "https://api.pexels.com";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    videos: Vec<PexelsVideo>,
}

#[derive(Debug, Deserialize)]
struct PexelsVideo {
    /// Public page URL; its slug describes the clip
    #[serde(default)]
    url: String,
    #[serde(default)]
    duration: f64,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    video_files: Vec<PexelsVideoFile>,
}

#[derive(Debug, Deserialize)]
struct PexelsVideoFile {
    #[serde(default)]
    link: String,
    width: Option<u32>,
    height: Option<u32>,
    #[serde(default)]
    file_type: String,
}

/// Client for the Pexels video API.
pub struct PexelsProvider {
    http: Client,
    config: ProviderConfig,
    api_key: String,
}

impl PexelsProvider {
    pub fn new(config: ProviderConfig) -> ProviderResult<Self> {
        let api_key = config.require_key(PEXELS_NAME)?;
        let http = config.build_client()?;
        Ok(Self { http, config, api_key })
    }

    async fn search_once(&self, query: &str) -> ProviderResult<Vec<ClipCandidate>> {
        let url = format!("{}/videos/search", self.config.base_url.trim_end_matches('/'));
        let per_page = self.config.per_page.to_string();

        let response = self
            .http
            .get(&url)
            .header("Authorization", &self.api_key)
            .query(&[
                ("query", query),
                ("orientation", "landscape"),
                ("size", "medium"),
                ("per_page", per_page.as_str()),
            ])
            .send()
            .await?;
        let response = check_status(PEXELS_NAME, response).await?;

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(format!("pexels: {}", e)))?;

        let candidates: Vec<ClipCandidate> = body
            .videos
            .into_iter()
            .filter_map(|video| to_candidate(video, self.config.min_width))
            .collect();

        debug!(query, count = candidates.len(), "Pexels search returned candidates");
        Ok(candidates)
    }
}

#[async_trait]
impl FootageProvider for PexelsProvider {
    fn name(&self) -> &str {
        PEXELS_NAME
    }

    async fn search(&self, query: &str) -> ProviderResult<Vec<ClipCandidate>> {
        search_with_retry(PEXELS_NAME, self.config.max_retries, || self.search_once(query)).await
    }
}

/// Pick the smallest landscape MP4 rendition at least `min_width` wide.
fn to_candidate(video: PexelsVideo, min_width: u32) -> Option<ClipCandidate> {
    let file = video
        .video_files
        .iter()
        .filter(|f| !f.link.is_empty())
        .filter(|f| f.file_type.is_empty() || f.file_type == "video/mp4")
        .filter_map(|f| Some((f, f.width?, f.height?)))
        .filter(|(_, w, h)| *w >= min_width && w > h)
        .min_by_key(|(_, w, _)| *w)?;

    let (file, width, height) = file;
    Some(ClipCandidate {
        provider: PEXELS_NAME.to_string(),
        remote_url: file.link.clone(),
        metadata: ClipMetadata {
            tags: video.tags,
            description: description_from_page_url(&video.url),
        },
        width,
        height,
        duration: video.duration,
    })
}

/// `https://www.pexels.com/video/woman-doing-yoga-3327806/` becomes
/// `woman doing yoga`.
fn description_from_page_url(page_url: &str) -> String {
    let slug = url::Url::parse(page_url)
        .ok()
        .and_then(|u| {
            u.path_segments()
                .and_then(|mut segments| segments.rfind(|s| !s.is_empty()).map(str::to_string))
        })
        .unwrap_or_default();

    slug.split('-')
        .filter(|part| !part.chars().all(|c| c.is_ascii_digit()))
        .collect::<Vec<_>>()
        .join(" ")
}
