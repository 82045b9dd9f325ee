//! Worker configuration.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use broll_footage::{
    AcquisitionConfig, CandidateChoice, ProviderOrder, MYMEMORY_BASE_URL, PEXELS_BASE_URL,
    PIXABAY_BASE_URL,
};
use broll_media::MediaLimits;
use broll_models::CanonicalFormat;

/// What to do with the scenes already filled when the scene budget runs out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BudgetPolicy {
    /// Assemble from whatever clips finished in time
    #[default]
    UseCompleted,
    /// Fail the job
    Fail,
}

impl FromStr for BudgetPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "use_completed" | "completed" => Ok(BudgetPolicy::UseCompleted),
            "fail" => Ok(BudgetPolicy::Fail),
            other => Err(format!("unknown budget policy: {}", other)),
        }
    }
}

/// Provider API key. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Scenes planned per job
    pub scene_count: usize,
    /// Words captured in each scene's context snippet
    pub snippet_window: usize,
    /// Maximum scenes acquired in parallel within a job
    pub max_scene_parallel: usize,
    /// Maximum concurrent FFmpeg processes per job
    pub max_ffmpeg_processes: usize,
    /// Wall-clock budget for acquisition and normalization of all scenes
    pub scene_budget: Duration,
    pub budget_policy: BudgetPolicy,
    /// Wall-clock deadline for a whole job, scene budget included
    pub job_timeout: Duration,
    /// Work directory for per-job scratch space
    pub work_dir: String,
    /// Directory finished videos are published into
    pub artifact_dir: PathBuf,
    /// Public URL prefix serving `artifact_dir`
    pub artifact_base_url: Option<String>,

    pub pexels_api_key: Option<ApiKey>,
    pub pexels_base_url: String,
    pub pixabay_api_key: Option<ApiKey>,
    pub pixabay_base_url: String,
    pub search_timeout: Duration,
    /// Retries per search on transient provider failures
    pub search_retries: u32,
    pub results_per_page: u32,
    pub download_timeout: Duration,
    pub min_clip_width: u32,
    pub max_clip_duration: f64,
    pub max_attempts_per_provider: usize,
    pub provider_order: ProviderOrder,
    pub candidate_choice: CandidateChoice,
    /// Metadata terms a clip must mention (any of)
    pub include_terms: Vec<String>,
    /// Metadata terms that reject a clip
    pub exclude_terms: Vec<String>,

    /// Keyword translation endpoint; `None` disables online translation
    pub translator_url: Option<String>,
    pub translator_timeout: Duration,
    pub audio_fetch_timeout: Duration,

    pub format: CanonicalFormat,
    pub media_limits: MediaLimits,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            scene_count: 25,
            snippet_window: 6,
            max_scene_parallel: 4,
            max_ffmpeg_processes: 4,
            scene_budget: Duration::from_secs(600),
            budget_policy: BudgetPolicy::UseCompleted,
            job_timeout: Duration::from_secs(1800), // 30 minutes
            work_dir: "/tmp/broll".to_string(),
            artifact_dir: PathBuf::from("./output"),
            artifact_base_url: None,
            pexels_api_key: None,
            pexels_base_url: PEXELS_BASE_URL.to_string(),
            pixabay_api_key: None,
            pixabay_base_url: PIXABAY_BASE_URL.to_string(),
            search_timeout: Duration::from_secs(20),
            search_retries: 1,
            results_per_page: 15,
            download_timeout: Duration::from_secs(90),
            min_clip_width: 1280,
            max_clip_duration: 4.0,
            max_attempts_per_provider: 3,
            provider_order: ProviderOrder::default(),
            candidate_choice: CandidateChoice::default(),
            include_terms: Vec::new(),
            exclude_terms: Vec::new(),
            translator_url: Some(MYMEMORY_BASE_URL.to_string()),
            translator_timeout: Duration::from_secs(10),
            audio_fetch_timeout: Duration::from_secs(60),
            format: CanonicalFormat::default(),
            media_limits: MediaLimits::default(),
        }
    }
}

fn env_parse<T: FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|s| s.trim().parse().ok())
}

fn env_secs(name: &str, default: u64) -> Duration {
    Duration::from_secs(env_parse(name).unwrap_or(default))
}

fn env_key(name: &str) -> Option<ApiKey> {
    std::env::var(name)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .map(ApiKey::new)
}

/// Comma separated, trimmed, lowercased, empties dropped.
fn env_list(name: &str) -> Vec<String> {
    std::env::var(name)
        .map(|raw| split_terms(&raw))
        .unwrap_or_default()
}

pub(crate) fn split_terms(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect()
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let mut format = CanonicalFormat::default();
        if let Some(crf) = env_parse::<u8>("BROLL_CRF") {
            format = format.with_crf(crf);
        }
        if let Ok(preset) = std::env::var("BROLL_PRESET") {
            format = format.with_preset(preset);
        }

        let max_clip_duration = env_parse("BROLL_MAX_CLIP_SECS").unwrap_or(defaults.max_clip_duration);
        let media_limits = MediaLimits {
            max_clip_duration,
            max_concat_entries: env_parse("BROLL_MAX_CONCAT_ENTRIES")
                .unwrap_or(defaults.media_limits.max_concat_entries),
            audio_timeout_secs: env_parse("FFMPEG_AUDIO_TIMEOUT_SECS")
                .unwrap_or(defaults.media_limits.audio_timeout_secs),
            normalize_timeout_secs: env_parse("FFMPEG_NORMALIZE_TIMEOUT_SECS")
                .unwrap_or(defaults.media_limits.normalize_timeout_secs),
            assemble_timeout_secs: env_parse("FFMPEG_ASSEMBLE_TIMEOUT_SECS")
                .unwrap_or(defaults.media_limits.assemble_timeout_secs),
            mux_timeout_secs: env_parse("FFMPEG_MUX_TIMEOUT_SECS")
                .unwrap_or(defaults.media_limits.mux_timeout_secs),
        };

        let translator_url = match std::env::var("TRANSLATOR_URL") {
            Ok(v) if v.trim().is_empty() || v.trim().eq_ignore_ascii_case("off") => None,
            Ok(v) => Some(v.trim().to_string()),
            Err(_) => defaults.translator_url.clone(),
        };

        Self {
            scene_count: env_parse("BROLL_SCENE_COUNT").unwrap_or(defaults.scene_count),
            snippet_window: env_parse("BROLL_SNIPPET_WINDOW").unwrap_or(defaults.snippet_window),
            max_scene_parallel: env_parse("WORKER_MAX_SCENE_PARALLEL")
                .unwrap_or(defaults.max_scene_parallel),
            max_ffmpeg_processes: env_parse("WORKER_MAX_FFMPEG")
                .unwrap_or(defaults.max_ffmpeg_processes),
            scene_budget: env_secs("WORKER_SCENE_BUDGET_SECS", 600),
            budget_policy: env_parse("WORKER_BUDGET_POLICY").unwrap_or_default(),
            job_timeout: env_secs("WORKER_JOB_TIMEOUT", 1800),
            work_dir: std::env::var("WORKER_WORK_DIR").unwrap_or(defaults.work_dir),
            artifact_dir: std::env::var("ARTIFACT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.artifact_dir),
            artifact_base_url: std::env::var("ARTIFACT_PUBLIC_BASE_URL")
                .ok()
                .filter(|s| !s.trim().is_empty()),
            pexels_api_key: env_key("PEXELS_API_KEY"),
            pexels_base_url: std::env::var("PEXELS_BASE_URL").unwrap_or(defaults.pexels_base_url),
            pixabay_api_key: env_key("PIXABAY_API_KEY"),
            pixabay_base_url: std::env::var("PIXABAY_BASE_URL")
                .unwrap_or(defaults.pixabay_base_url),
            search_timeout: env_secs("FOOTAGE_SEARCH_TIMEOUT_SECS", 20),
            search_retries: env_parse("FOOTAGE_MAX_RETRIES").unwrap_or(defaults.search_retries),
            results_per_page: env_parse("FOOTAGE_PER_PAGE").unwrap_or(defaults.results_per_page),
            download_timeout: env_secs("FOOTAGE_DOWNLOAD_TIMEOUT_SECS", 90),
            min_clip_width: env_parse("FOOTAGE_MIN_WIDTH").unwrap_or(defaults.min_clip_width),
            max_clip_duration,
            max_attempts_per_provider: env_parse("FOOTAGE_ATTEMPTS_PER_PROVIDER")
                .unwrap_or(defaults.max_attempts_per_provider),
            provider_order: env_parse("FOOTAGE_PROVIDER_ORDER").unwrap_or_default(),
            candidate_choice: env_parse("FOOTAGE_CANDIDATE_CHOICE").unwrap_or_default(),
            include_terms: env_list("FOOTAGE_INCLUDE_TERMS"),
            exclude_terms: env_list("FOOTAGE_EXCLUDE_TERMS"),
            translator_url,
            translator_timeout: env_secs("TRANSLATOR_TIMEOUT_SECS", 10),
            audio_fetch_timeout: env_secs("AUDIO_FETCH_TIMEOUT_SECS", 60),
            format,
            media_limits,
        }
    }

    /// Acquisition settings derived from this config.
    pub fn acquisition(&self) -> AcquisitionConfig {
        AcquisitionConfig {
            min_width: self.min_clip_width,
            max_clip_duration: self.max_clip_duration,
            max_attempts_per_provider: self.max_attempts_per_provider,
            order: self.provider_order,
            choice: self.candidate_choice,
        }
    }

    pub fn has_any_provider(&self) -> bool {
        self.pexels_api_key.is_some() || self.pixabay_api_key.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = WorkerConfig::default();
        assert_eq!(config.scene_count, 25);
        assert_eq!(config.snippet_window, 6);
        assert_eq!(config.scene_budget, Duration::from_secs(600));
        assert_eq!(config.budget_policy, BudgetPolicy::UseCompleted);
        assert!(config.job_timeout > config.scene_budget);
        assert_eq!(config.media_limits.max_concat_entries, 150);
        assert!(!config.has_any_provider());
    }

    #[test]
    fn test_budget_policy_parse() {
        assert_eq!("fail".parse::<BudgetPolicy>().unwrap(), BudgetPolicy::Fail);
        assert_eq!(
            " Use_Completed ".parse::<BudgetPolicy>().unwrap(),
            BudgetPolicy::UseCompleted
        );
        assert!("later".parse::<BudgetPolicy>().is_err());
    }

    #[test]
    fn test_split_terms() {
        assert_eq!(
            split_terms(" Woman, wellness ,,YOGA "),
            vec!["woman", "wellness", "yoga"]
        );
        assert!(split_terms("").is_empty());
    }

    #[test]
    fn test_api_key_is_redacted() {
        let config = WorkerConfig {
            pexels_api_key: Some(ApiKey::new("super-secret")),
            ..Default::default()
        };
        let printed = format!("{:?}", config);
        assert!(!printed.contains("super-secret"));
        assert!(printed.contains("ApiKey(***)"));
    }
}
