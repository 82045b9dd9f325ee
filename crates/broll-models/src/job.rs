//! Job request, lifecycle and outcome definitions.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;
use uuid::Uuid;

use crate::ScriptText;

/// Narration length assumed when the audio cannot be probed and the caller
/// supplied no hint.
pub const DEFAULT_AUDIO_DURATION_SECS: f64 = 60.0;

/// Unique identifier for a job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Generate a new random job ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Non-empty and limited to ASCII letters, digits, `-` and `_`, so the
    /// ID is safe as a single path component or object key.
    pub fn is_valid(&self) -> bool {
        !self.0.is_empty()
            && self
                .0
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where the narration audio comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum AudioSource {
    /// Local file readable by the worker
    Path(PathBuf),
    /// Remote file fetched over HTTP(S)
    Url(String),
    /// Base64-encoded audio bytes
    Bytes(String),
}

/// Reasons a job request is rejected before any work starts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    #[error("job id must be non-empty and use only [A-Za-z0-9_-]: {0:?}")]
    InvalidJobId(String),

    #[error("audio path is empty")]
    EmptyAudioPath,

    #[error("audio payload is empty")]
    EmptyAudioBytes,

    #[error("audio URL is invalid: {0}")]
    InvalidAudioUrl(String),

    #[error("duration hint must be a finite, non-negative number of seconds")]
    InvalidDurationHint,
}

/// A narration-to-video job.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct JobRequest {
    /// Job ID; generated when omitted
    #[serde(default)]
    pub job_id: JobId,

    /// Narration audio
    pub audio: AudioSource,

    /// Narration script
    #[serde(default)]
    pub script: ScriptText,

    /// Caller's estimate of the narration length in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_hint: Option<f64>,

    /// Operator keywords used when no scene rule matches
    #[serde(default)]
    pub keywords: Vec<String>,
}

impl JobRequest {
    /// Create a request with a fresh job ID.
    pub fn new(audio: AudioSource, script: ScriptText) -> Self {
        Self {
            job_id: JobId::new(),
            audio,
            script,
            duration_hint: None,
            keywords: Vec::new(),
        }
    }

    pub fn with_keywords(mut self, keywords: Vec<String>) -> Self {
        self.keywords = keywords;
        self
    }

    pub fn with_duration_hint(mut self, seconds: f64) -> Self {
        self.duration_hint = Some(seconds);
        self
    }

    /// Check the request shape. Does not touch the filesystem or network.
    pub fn validate(&self) -> Result<(), RequestError> {
        if !self.job_id.is_valid() {
            return Err(RequestError::InvalidJobId(self.job_id.0.clone()));
        }

        match &self.audio {
            AudioSource::Path(path) if path.as_os_str().is_empty() => {
                return Err(RequestError::EmptyAudioPath)
            }
            AudioSource::Bytes(data) if data.trim().is_empty() => {
                return Err(RequestError::EmptyAudioBytes)
            }
            AudioSource::Url(raw) => {
                let parsed = url::Url::parse(raw)
                    .map_err(|e| RequestError::InvalidAudioUrl(e.to_string()))?;
                if !matches!(parsed.scheme(), "http" | "https") {
                    return Err(RequestError::InvalidAudioUrl(format!(
                        "unsupported scheme: {}",
                        parsed.scheme()
                    )));
                }
            }
            _ => {}
        }

        if let Some(hint) = self.duration_hint {
            if !hint.is_finite() || hint < 0.0 {
                return Err(RequestError::InvalidDurationHint);
            }
        }

        Ok(())
    }

    /// First non-blank operator keyword.
    pub fn primary_keyword(&self) -> Option<&str> {
        self.keywords
            .iter()
            .map(|k| k.trim())
            .find(|k| !k.is_empty())
    }
}

/// Pipeline stage of a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum JobStage {
    Planning,
    Acquiring,
    Normalizing,
    Assembling,
    Muxing,
    Done,
    Failed { reason: String },
}

impl JobStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStage::Planning => "planning",
            JobStage::Acquiring => "acquiring",
            JobStage::Normalizing => "normalizing",
            JobStage::Assembling => "assembling",
            JobStage::Muxing => "muxing",
            JobStage::Done => "done",
            JobStage::Failed { .. } => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStage::Done | JobStage::Failed { .. })
    }

    /// The stage that follows this one on the success path.
    pub fn next(&self) -> Option<JobStage> {
        match self {
            JobStage::Planning => Some(JobStage::Acquiring),
            JobStage::Acquiring => Some(JobStage::Normalizing),
            JobStage::Normalizing => Some(JobStage::Assembling),
            JobStage::Assembling => Some(JobStage::Muxing),
            JobStage::Muxing => Some(JobStage::Done),
            JobStage::Done | JobStage::Failed { .. } => None,
        }
    }

    /// Whether moving from `self` to `next` is a legal transition.
    ///
    /// Stages only advance one step at a time; `Failed` is reachable from
    /// every non-terminal stage.
    pub fn can_transition_to(&self, next: &JobStage) -> bool {
        if self.is_terminal() {
            return false;
        }
        match next {
            JobStage::Failed { .. } => true,
            other => self.next().as_ref() == Some(other),
        }
    }
}

impl fmt::Display for JobStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStage::Failed { reason } => write!(f, "failed: {}", reason),
            other => f.write_str(other.as_str()),
        }
    }
}

/// Final result of a job as reported to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobOutcome {
    Done {
        job_id: JobId,
        /// Artifact store reference for the final video
        reference: String,
        /// Final video duration in seconds
        duration: f64,
        scenes_filled: usize,
        scenes_total: usize,
        finished_at: DateTime<Utc>,
    },
    Failed {
        job_id: JobId,
        /// Stage the job was in when it failed
        stage: String,
        reason: String,
        finished_at: DateTime<Utc>,
    },
}

impl JobOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, JobOutcome::Done { .. })
    }

    pub fn job_id(&self) -> &JobId {
        match self {
            JobOutcome::Done { job_id, .. } | JobOutcome::Failed { job_id, .. } => job_id,
        }
    }

    /// Artifact reference, present only on success.
    pub fn reference(&self) -> Option<&str> {
        match self {
            JobOutcome::Done { reference, .. } => Some(reference),
            JobOutcome::Failed { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_id_generation() {
        let id1 = JobId::new();
        let id2 = JobId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_request_from_json_defaults() {
        let request: JobRequest = serde_json::from_str(
            r#"{"audio":{"url":"https://cdn.example.com/voice.mp3"},"script":["uno","due"]}"#,
        )
        .unwrap();

        assert!(!request.job_id.as_str().is_empty());
        assert!(request.keywords.is_empty());
        assert!(request.duration_hint.is_none());
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_input() {
        let empty = JobRequest::new(AudioSource::Bytes("  ".to_string()), ScriptText::default());
        assert_eq!(empty.validate(), Err(RequestError::EmptyAudioBytes));

        let ftp = JobRequest::new(
            AudioSource::Url("ftp://example.com/a.mp3".to_string()),
            ScriptText::default(),
        );
        assert!(matches!(ftp.validate(), Err(RequestError::InvalidAudioUrl(_))));

        let negative = JobRequest::new(AudioSource::Path("voice.wav".into()), ScriptText::default())
            .with_duration_hint(-1.0);
        assert_eq!(negative.validate(), Err(RequestError::InvalidDurationHint));
    }

    #[test]
    fn test_validate_rejects_unsafe_job_ids() {
        for bad in ["", "..", "../victim", "/tmp/work", "job.1", "a/b", "job 1"] {
            let mut request =
                JobRequest::new(AudioSource::Path("voice.wav".into()), ScriptText::default());
            request.job_id = JobId::from_string(bad);
            assert_eq!(
                request.validate(),
                Err(RequestError::InvalidJobId(bad.to_string())),
                "job id {:?} should be rejected",
                bad
            );
        }

        let mut request = JobRequest::new(AudioSource::Path("voice.wav".into()), ScriptText::default());
        request.job_id = JobId::from_string("job_2026-10-18");
        assert!(request.validate().is_ok());
        assert!(JobId::new().is_valid());
    }

    #[test]
    fn test_primary_keyword_skips_blank() {
        let request = JobRequest::new(AudioSource::Path("a.wav".into()), ScriptText::default())
            .with_keywords(vec!["  ".to_string(), "menopausa".to_string()]);
        assert_eq!(request.primary_keyword(), Some("menopausa"));
    }

    #[test]
    fn test_stage_transitions() {
        assert!(JobStage::Planning.can_transition_to(&JobStage::Acquiring));
        assert!(!JobStage::Planning.can_transition_to(&JobStage::Muxing));
        assert!(JobStage::Assembling.can_transition_to(&JobStage::Failed {
            reason: "x".to_string()
        }));
        assert!(!JobStage::Done.can_transition_to(&JobStage::Failed {
            reason: "x".to_string()
        }));
        assert!(!JobStage::Muxing.can_transition_to(&JobStage::Planning));
    }

    #[test]
    fn test_outcome_serialization() {
        let outcome = JobOutcome::Failed {
            job_id: JobId::from_string("job-1"),
            stage: "assembling".to_string(),
            reason: "no usable clips".to_string(),
            finished_at: Utc::now(),
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["job_id"], "job-1");
        assert!(outcome.reference().is_none());
    }
}
