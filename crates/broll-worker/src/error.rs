//! Pipeline error types.

use serde::Serialize;
use thiserror::Error;

use broll_media::MediaError;
use broll_models::RequestError;

pub type PipelineResult<T> = Result<T, PipelineError>;

/// Coarse failure classification reported with job outcomes and metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InputInvalid,
    ProviderUnavailable,
    SceneUnfillable,
    TranscodeFailed,
    NoUsableClips,
    MuxFailed,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InputInvalid => "input_invalid",
            ErrorKind::ProviderUnavailable => "provider_unavailable",
            ErrorKind::SceneUnfillable => "scene_unfillable",
            ErrorKind::TranscodeFailed => "transcode_failed",
            ErrorKind::NoUsableClips => "no_usable_clips",
            ErrorKind::MuxFailed => "mux_failed",
            ErrorKind::Internal => "internal",
        }
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Invalid input: {0}")]
    InputInvalid(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("No usable clips: every scene failed to produce footage")]
    NoUsableClips,

    #[error("Transcode failed: {0}")]
    TranscodeFailed(String),

    #[error("Mux failed: {0}")]
    MuxFailed(String),

    #[error("Scene budget exhausted with {completed}/{total} scenes filled")]
    BudgetExhausted { completed: usize, total: usize },

    #[error("Job exceeded its {secs}s deadline")]
    JobTimeout { secs: u64 },

    #[error("Publishing failed: {0}")]
    PublishFailed(String),

    #[error("Illegal stage transition: {from} -> {to}")]
    IllegalTransition { from: String, to: String },

    #[error("Footage provider error: {0}")]
    Provider(#[from] broll_footage::ProviderError),

    #[error("Storage error: {0}")]
    Storage(#[from] broll_storage::StorageError),

    #[error("Media error: {0}")]
    Media(MediaError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<RequestError> for PipelineError {
    fn from(e: RequestError) -> Self {
        Self::InputInvalid(e.to_string())
    }
}

impl From<MediaError> for PipelineError {
    fn from(e: MediaError) -> Self {
        match e {
            MediaError::NoUsableClips => Self::NoUsableClips,
            MediaError::MuxFailed(msg) => Self::MuxFailed(msg),
            MediaError::TranscodeFailed(msg) => Self::TranscodeFailed(msg),
            MediaError::AudioDecodeFailed(msg) => Self::InputInvalid(msg),
            MediaError::Unreadable { path, reason } => {
                Self::InputInvalid(format!("{}: {}", path.display(), reason))
            }
            other => Self::Media(other),
        }
    }
}

impl PipelineError {
    pub fn input_invalid(msg: impl Into<String>) -> Self {
        Self::InputInvalid(msg.into())
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::InputInvalid(_) => ErrorKind::InputInvalid,
            PipelineError::NoUsableClips | PipelineError::BudgetExhausted { .. } => {
                ErrorKind::NoUsableClips
            }
            PipelineError::TranscodeFailed(_) => ErrorKind::TranscodeFailed,
            PipelineError::MuxFailed(_) => ErrorKind::MuxFailed,
            PipelineError::Provider(_) => ErrorKind::ProviderUnavailable,
            PipelineError::ConfigError(_)
            | PipelineError::JobTimeout { .. }
            | PipelineError::PublishFailed(_)
            | PipelineError::IllegalTransition { .. }
            | PipelineError::Storage(_)
            | PipelineError::Media(_)
            | PipelineError::Io(_) => ErrorKind::Internal,
        }
    }

    /// Check if error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            PipelineError::Provider(e) => e.is_retryable(),
            PipelineError::Storage(_) | PipelineError::Io(_) => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_errors_map_to_kinds() {
        assert_eq!(
            PipelineError::from(MediaError::NoUsableClips).kind(),
            ErrorKind::NoUsableClips
        );
        assert_eq!(
            PipelineError::from(MediaError::mux_failed("empty output")).kind(),
            ErrorKind::MuxFailed
        );
        assert_eq!(
            PipelineError::from(MediaError::AudioDecodeFailed("bad header".into())).kind(),
            ErrorKind::InputInvalid
        );
        assert_eq!(
            PipelineError::from(MediaError::Timeout(30)).kind(),
            ErrorKind::Internal
        );
    }

    #[test]
    fn test_request_error_is_input_invalid() {
        let err = PipelineError::from(RequestError::EmptyAudioPath);
        assert_eq!(err.kind(), ErrorKind::InputInvalid);
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_deadline_and_publish_errors_are_fatal() {
        let timeout = PipelineError::JobTimeout { secs: 1800 };
        assert_eq!(timeout.kind(), ErrorKind::Internal);
        assert!(!timeout.is_retryable());
        assert!(timeout.to_string().contains("1800s deadline"));

        let publish = PipelineError::PublishFailed("disk full".into());
        assert!(!publish.is_retryable());
        assert!(publish.to_string().starts_with("Publishing failed"));
    }

    #[test]
    fn test_kind_serializes_snake_case() {
        let json = serde_json::to_string(&ErrorKind::NoUsableClips).unwrap();
        assert_eq!(json, "\"no_usable_clips\"");
        assert_eq!(ErrorKind::MuxFailed.as_str(), "mux_failed");
    }
}
