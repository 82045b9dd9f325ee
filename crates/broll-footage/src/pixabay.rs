//! Pixabay video search client.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use broll_models::{ClipCandidate, ClipMetadata};

use crate::error::{ProviderError, ProviderResult};
use crate::provider::{check_status, search_with_retry, FootageProvider, ProviderConfig};

pub const PIXABAY_NAME: &str = "pixabay";
pub const PIXABAY_BASE_URL: &str = "https://pixabay.com";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    hits: Vec<PixabayHit>,
}

#[derive(Debug, Deserialize)]
struct PixabayHit {
    /// Comma-separated tag list
    #[serde(default)]
    tags: String,
    #[serde(default)]
    duration: f64,
    videos: Option<PixabayRenditions>,
}

#[derive(Debug, Deserialize)]
struct PixabayRenditions {
    large: Option<PixabayRendition>,
    medium: Option<PixabayRendition>,
    small: Option<PixabayRendition>,
}

#[derive(Debug, Deserialize)]
struct PixabayRendition {
    #[serde(default)]
    url: String,
    #[serde(default)]
    width: u32,
    #[serde(default)]
    height: u32,
}

/// Client for the Pixabay video API.
pub struct PixabayProvider {
    http: Client,
    config: ProviderConfig,
    api_key: String,
}

impl PixabayProvider {
    pub fn new(config: ProviderConfig) -> ProviderResult<Self> {
        let api_key = config.require_key(PIXABAY_NAME)?;
        let http = config.build_client()?;
        Ok(Self { http, config, api_key })
    }

    async fn search_once(&self, query: &str) -> ProviderResult<Vec<ClipCandidate>> {
        let url = format!("{}/api/videos/", self.config.base_url.trim_end_matches('/'));
        let per_page = self.config.per_page.clamp(3, 200).to_string();
        let min_width = self.config.min_width.to_string();

        let response = self
            .http
            .get(&url)
            .query(&[
                ("key", self.api_key.as_str()),
                ("q", query),
                ("video_type", "film"),
                ("per_page", per_page.as_str()),
                ("min_width", min_width.as_str()),
                ("safesearch", "true"),
            ])
            .send()
            .await?;
        let response = check_status(PIXABAY_NAME, response).await?;

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(format!("pixabay: {}", e)))?;

        let candidates: Vec<ClipCandidate> = body
            .hits
            .into_iter()
            .filter_map(|hit| to_candidate(hit, self.config.min_width))
            .collect();

        debug!(query, count = candidates.len(), "Pixabay search returned candidates");
        Ok(candidates)
    }
}

#[async_trait]
impl FootageProvider for PixabayProvider {
    fn name(&self) -> &str {
        PIXABAY_NAME
    }

    async fn search(&self, query: &str) -> ProviderResult<Vec<ClipCandidate>> {
        search_with_retry(PIXABAY_NAME, self.config.max_retries, || self.search_once(query)).await
    }
}

/// Prefer the medium rendition, then large, then small.
fn to_candidate(hit: PixabayHit, min_width: u32) -> Option<ClipCandidate> {
    let renditions = hit.videos?;
    let rendition = [renditions.medium, renditions.large, renditions.small]
        .into_iter()
        .flatten()
        .find(|r| !r.url.is_empty() && r.width >= min_width)?;

    let tags: Vec<String> = hit
        .tags
        .split(',')
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();

    Some(ClipCandidate {
        provider: PIXABAY_NAME.to_string(),
        remote_url: rendition.url,
        metadata: ClipMetadata {
            description: tags.join(" "),
            tags,
        },
        width: rendition.width,
        height: rendition.height,
        duration: hit.duration,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_search_prefers_medium_rendition() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/videos/"))
            .and(query_param("key", "pix-key"))
            .and(query_param("q", "woman sleeping"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "total": 2,
                "hits": [
                    {
                        "tags": "woman, bed, sleep",
                        "duration": 15,
                        "videos": {
                            "large": {"url": "https://cdn/large.mp4", "width": 3840, "height": 2160},
                            "medium": {"url": "https://cdn/medium.mp4", "width": 1920, "height": 1080},
                            "small": {"url": "https://cdn/small.mp4", "width": 1280, "height": 720}
                        }
                    },
                    {
                        "tags": "night",
                        "duration": 9,
                        "videos": {
                            "medium": {"url": "", "width": 0, "height": 0}
                        }
                    }
                ]
            })))
            .mount(&server)
            .await;

        let provider =
            PixabayProvider::new(ProviderConfig::new(server.uri(), Some("pix-key".to_string()))).unwrap();
        let candidates = provider.search("woman sleeping").await.unwrap();

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].remote_url, "https://cdn/medium.mp4");
        assert_eq!(candidates[0].metadata.tags, vec!["woman", "bed", "sleep"]);
        assert_eq!(candidates[0].duration, 15.0);
    }

    #[tokio::test]
    async fn test_malformed_body_is_invalid_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let provider =
            PixabayProvider::new(ProviderConfig::new(server.uri(), Some("k".to_string()))).unwrap();
        let err = provider.search("stress").await.unwrap_err();
        assert!(matches!(err, ProviderError::InvalidResponse(_)));
    }
}
