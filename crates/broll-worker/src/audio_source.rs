//! Narration intake.
//!
//! Brings the job's audio onto local disk so ffmpeg can read it.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use futures::StreamExt;
use reqwest::Client;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use broll_models::AudioSource;

use crate::error::{PipelineError, PipelineResult};

/// Materializes [`AudioSource`]s into the job's scratch directory.
#[derive(Debug, Clone)]
pub struct AudioFetcher {
    http: Client,
}

impl AudioFetcher {
    pub fn new(timeout: Duration) -> PipelineResult<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PipelineError::config_error(format!("audio http client: {}", e)))?;
        Ok(Self { http })
    }

    /// Local path of the narration. `dest` is used for URL and inline sources.
    pub async fn materialize(&self, source: &AudioSource, dest: &Path) -> PipelineResult<PathBuf> {
        match source {
            AudioSource::Path(path) => {
                if !tokio::fs::try_exists(path).await.unwrap_or(false) {
                    return Err(PipelineError::input_invalid(format!(
                        "audio file not found: {}",
                        path.display()
                    )));
                }
                Ok(path.clone())
            }
            AudioSource::Bytes(encoded) => {
                let bytes = STANDARD
                    .decode(encoded.trim())
                    .map_err(|e| PipelineError::input_invalid(format!("audio is not valid base64: {}", e)))?;
                if bytes.is_empty() {
                    return Err(PipelineError::input_invalid("audio payload is empty"));
                }
                tokio::fs::write(dest, &bytes).await?;
                debug!(bytes = bytes.len(), "Wrote inline audio");
                Ok(dest.to_path_buf())
            }
            AudioSource::Url(url) => {
                self.fetch(url, dest).await?;
                Ok(dest.to_path_buf())
            }
        }
    }

    async fn fetch(&self, url: &str, dest: &Path) -> PipelineResult<()> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| PipelineError::input_invalid(format!("audio fetch failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PipelineError::input_invalid(format!(
                "audio fetch returned HTTP {}",
                status.as_u16()
            )));
        }

        let mut file = tokio::fs::File::create(dest).await?;
        let mut stream = response.bytes_stream();
        let mut written: u64 = 0;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk
                .map_err(|e| PipelineError::input_invalid(format!("audio fetch interrupted: {}", e)))?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;

        if written == 0 {
            return Err(PipelineError::input_invalid("audio fetch returned no data"));
        }
        info!(bytes = written, "Fetched narration audio");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fetcher() -> AudioFetcher {
        AudioFetcher::new(Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_path_used_in_place() {
        let dir = TempDir::new().unwrap();
        let audio = dir.path().join("voice.mp3");
        tokio::fs::write(&audio, b"id3").await.unwrap();

        let local = fetcher()
            .materialize(&AudioSource::Path(audio.clone()), &dir.path().join("unused"))
            .await
            .unwrap();
        assert_eq!(local, audio);
    }

    #[tokio::test]
    async fn test_missing_path_is_input_invalid() {
        let dir = TempDir::new().unwrap();
        let err = fetcher()
            .materialize(
                &AudioSource::Path(dir.path().join("missing.mp3")),
                &dir.path().join("out"),
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InputInvalid);
    }

    #[tokio::test]
    async fn test_inline_bytes_decoded() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("narration.input");
        let encoded = STANDARD.encode(b"RIFF....WAVE");

        fetcher()
            .materialize(&AudioSource::Bytes(encoded), &dest)
            .await
            .unwrap();
        assert_eq!(tokio::fs::read(&dest).await.unwrap(), b"RIFF....WAVE");
    }

    #[tokio::test]
    async fn test_bad_base64_rejected() {
        let dir = TempDir::new().unwrap();
        let err = fetcher()
            .materialize(&AudioSource::Bytes("%%%".to_string()), &dir.path().join("x"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InputInvalid);
    }

    #[tokio::test]
    async fn test_url_fetched() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/voice.mp3"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![7u8; 2048]))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("narration.input");
        let url = format!("{}/voice.mp3", server.uri());
        fetcher()
            .materialize(&AudioSource::Url(url), &dest)
            .await
            .unwrap();
        assert_eq!(tokio::fs::metadata(&dest).await.unwrap().len(), 2048);
    }

    #[tokio::test]
    async fn test_url_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let err = fetcher()
            .materialize(
                &AudioSource::Url(format!("{}/gone.mp3", server.uri())),
                &dir.path().join("x"),
            )
            .await
            .unwrap_err();
        assert!(err.to_string().contains("404"));
    }
}
