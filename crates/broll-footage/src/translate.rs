//! Keyword translation for footage search queries.
//!
//! Stock footage libraries index English metadata, while operator keywords
//! are usually Italian.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::error::{ProviderError, ProviderResult};
use crate::provider::check_status;

pub const MYMEMORY_BASE_URL: &str = "https://api.mymemory.translated.net";

/// Translates a single keyword or short phrase into English.
#[async_trait]
pub trait KeywordTranslator: Send + Sync {
    async fn translate(&self, keyword: &str) -> ProviderResult<String>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MyMemoryResponse {
    response_data: Option<MyMemoryData>,
    /// Number or string depending on the error path
    response_status: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MyMemoryData {
    #[serde(default)]
    translated_text: String,
}

/// MyMemory-compatible HTTP translation client.
pub struct HttpTranslator {
    http: Client,
    base_url: String,
    langpair: String,
}

impl HttpTranslator {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> ProviderResult<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ProviderError::Network)?;
        Ok(Self {
            http,
            base_url: base_url.into(),
            langpair: "it|en".to_string(),
        })
    }

    pub fn with_langpair(mut self, langpair: impl Into<String>) -> Self {
        self.langpair = langpair.into();
        self
    }
}

#[async_trait]
impl KeywordTranslator for HttpTranslator {
    async fn translate(&self, keyword: &str) -> ProviderResult<String> {
        let url = format!("{}/get", self.base_url.trim_end_matches('/'));

        let response = self
            .http
            .get(&url)
            .query(&[("q", keyword), ("langpair", self.langpair.as_str())])
            .send()
            .await?;
        let response = check_status("translator", response).await?;
        let body: MyMemoryResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(format!("translator: {}", e)))?;

        let status_ok = match &body.response_status {
            Some(serde_json::Value::Number(n)) => n.as_u64() == Some(200),
            Some(serde_json::Value::String(s)) => s == "200",
            _ => true,
        };
        let text = body
            .response_data
            .map(|d| d.translated_text.trim().to_string())
            .unwrap_or_default();

        if !status_ok || text.is_empty() {
            return Err(ProviderError::InvalidResponse(format!(
                "no translation for '{}'",
                keyword
            )));
        }

        debug!(keyword, translated = %text, "Translated keyword");
        Ok(text.to_lowercase())
    }
}

/// Built-in Italian to English wellness vocabulary.
const DEFAULT_TERMS: &[(&str, &str)] = &[
    ("menopausa", "menopause"),
    ("ormoni", "hormones"),
    ("ormone", "hormone"),
    ("sonno", "sleep"),
    ("dormire", "sleep"),
    ("insonnia", "insomnia"),
    ("stress", "stress"),
    ("ansia", "anxiety"),
    ("benessere", "wellness"),
    ("salute", "health"),
    ("alimentazione", "healthy food"),
    ("dieta", "diet"),
    ("nutrizione", "nutrition"),
    ("acqua", "water"),
    ("idratazione", "hydration"),
    ("pelle", "skin care"),
    ("capelli", "hair"),
    ("energia", "energy"),
    ("stanchezza", "tiredness"),
    ("fitness", "fitness"),
    ("allenamento", "workout"),
    ("esercizio", "exercise"),
    ("yoga", "yoga"),
    ("meditazione", "meditation"),
    ("respirazione", "breathing"),
    ("peso", "weight loss"),
    ("metabolismo", "metabolism"),
    ("donna", "woman"),
    ("donne", "women"),
    ("cuore", "heart"),
    ("ossa", "bones"),
    ("umore", "mood"),
    ("rilassamento", "relaxation"),
    ("natura", "nature"),
    ("camminata", "walking"),
];

/// Static keyword table used when the translator is unavailable.
#[derive(Debug, Clone)]
pub struct StaticTermTable {
    entries: Vec<(String, String)>,
}

impl Default for StaticTermTable {
    fn default() -> Self {
        Self {
            entries: DEFAULT_TERMS
                .iter()
                .map(|(from, to)| (from.to_string(), to.to_string()))
                .collect(),
        }
    }
}

impl StaticTermTable {
    /// Add or override an entry.
    pub fn with_entry(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        let from = from.into().to_lowercase();
        self.entries.retain(|(k, _)| *k != from);
        self.entries.push((from, to.into()));
        self
    }

    /// Exact, case-insensitive lookup.
    pub fn lookup(&self, keyword: &str) -> Option<&str> {
        let key = keyword.trim().to_lowercase();
        self.entries
            .iter()
            .find(|(from, _)| *from == key)
            .map(|(_, to)| to.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_static_lookup() {
        let table = StaticTermTable::default();
        assert_eq!(table.lookup("Menopausa"), Some("menopause"));
        assert_eq!(table.lookup(" sonno "), Some("sleep"));
        assert_eq!(table.lookup("astronave"), None);

        let table = table.with_entry("Sonno", "restful sleep");
        assert_eq!(table.lookup("sonno"), Some("restful sleep"));
    }

    #[tokio::test]
    async fn test_http_translation() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/get"))
            .and(query_param("q", "vampate"))
            .and(query_param("langpair", "it|en"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "responseData": {"translatedText": "Hot Flashes", "match": 0.98},
                "responseStatus": 200
            })))
            .mount(&server)
            .await;

        let translator = HttpTranslator::new(server.uri(), Duration::from_secs(2)).unwrap();
        assert_eq!(translator.translate("vampate").await.unwrap(), "hot flashes");
    }

    #[tokio::test]
    async fn test_http_translation_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "responseData": {"translatedText": ""},
                "responseStatus": "403"
            })))
            .mount(&server)
            .await;

        let translator = HttpTranslator::new(server.uri(), Duration::from_secs(2)).unwrap();
        assert!(translator.translate("vampate").await.is_err());
    }
}
