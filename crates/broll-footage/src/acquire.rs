//! Clip acquisition with cross-provider fallback.

use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

use broll_models::{AcquiredClip, ClipCandidate};

use crate::download::ClipDownloader;
use crate::filter::{is_acceptable, MetadataFilter};
use crate::provider::FootageProvider;

/// Order in which providers are consulted for a scene.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderOrder {
    /// Always the configured order
    Fixed,
    /// Rotate the starting provider by scene index to spread load
    #[default]
    AlternateByScene,
}

impl ProviderOrder {
    /// Provider indices to try for `scene_index`, given `count` providers.
    pub fn sequence(&self, scene_index: usize, count: usize) -> Vec<usize> {
        if count == 0 {
            return Vec::new();
        }
        let start = match self {
            ProviderOrder::Fixed => 0,
            ProviderOrder::AlternateByScene => scene_index % count,
        };
        (0..count).map(|offset| (start + offset) % count).collect()
    }
}

impl std::str::FromStr for ProviderOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fixed" => Ok(ProviderOrder::Fixed),
            "alternate" | "alternate_by_scene" => Ok(ProviderOrder::AlternateByScene),
            other => Err(format!("unknown provider order: {}", other)),
        }
    }
}

/// How a candidate is chosen among those that pass the filters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateChoice {
    /// Provider ranking order
    First,
    /// Uniformly shuffled, so repeated queries yield varied footage
    #[default]
    Random,
}

impl std::str::FromStr for CandidateChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "first" => Ok(CandidateChoice::First),
            "random" => Ok(CandidateChoice::Random),
            other => Err(format!("unknown candidate choice: {}", other)),
        }
    }
}

/// Acquisition tuning.
#[derive(Debug, Clone)]
pub struct AcquisitionConfig {
    /// Minimum rendition width in pixels
    pub min_width: u32,
    /// Longest stretch of a clip that will be used, in seconds
    pub max_clip_duration: f64,
    /// Accepted candidates tried per provider before moving on
    pub max_attempts_per_provider: usize,
    pub order: ProviderOrder,
    pub choice: CandidateChoice,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            min_width: 1280,
            max_clip_duration: 4.0,
            max_attempts_per_provider: 3,
            order: ProviderOrder::default(),
            choice: CandidateChoice::default(),
        }
    }
}

/// Finds, validates and downloads one clip per scene.
pub struct AcquisitionEngine {
    providers: Vec<Arc<dyn FootageProvider>>,
    downloader: ClipDownloader,
    filter: MetadataFilter,
    config: AcquisitionConfig,
}

impl AcquisitionEngine {
    pub fn new(
        providers: Vec<Arc<dyn FootageProvider>>,
        downloader: ClipDownloader,
        filter: MetadataFilter,
        config: AcquisitionConfig,
    ) -> Self {
        Self {
            providers,
            downloader,
            filter,
            config,
        }
    }

    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Filter candidates and order them for download attempts.
    pub fn select_candidates(&self, candidates: Vec<ClipCandidate>) -> Vec<ClipCandidate> {
        let mut accepted: Vec<ClipCandidate> = candidates
            .into_iter()
            .filter(|c| is_acceptable(c, self.config.min_width, &self.filter))
            .collect();

        if self.config.choice == CandidateChoice::Random {
            accepted.shuffle(&mut rand::rng());
        }

        accepted.truncate(self.config.max_attempts_per_provider.max(1));
        accepted
    }

    /// Acquire a clip for one scene, trying providers in policy order.
    ///
    /// Returns `None` when every provider is exhausted; the scene is then
    /// unfillable and the caller omits it.
    pub async fn acquire(&self, query: &str, scene_index: usize, dest_dir: &Path) -> Option<AcquiredClip> {
        for provider_idx in self.config.order.sequence(scene_index, self.providers.len()) {
            let provider = &self.providers[provider_idx];
            let name = provider.name();

            let candidates = match provider.search(query).await {
                Ok(candidates) => candidates,
                Err(e) => {
                    warn!(scene_index, provider = name, query, "Provider unavailable: {}", e);
                    continue;
                }
            };

            let found = candidates.len();
            let selected = self.select_candidates(candidates);
            if selected.is_empty() {
                debug!(scene_index, provider = name, query, found, "No acceptable candidates");
                continue;
            }

            for (attempt, candidate) in selected.into_iter().enumerate() {
                let dest = dest_dir.join(format!("raw_{:03}_{}_{}.mp4", scene_index, name, attempt));
                match self.downloader.download(name, &candidate.remote_url, &dest).await {
                    Ok(_) => {
                        let raw_duration = capped_duration(candidate.duration, self.config.max_clip_duration);
                        info!(scene_index, provider = name, query, raw_duration, "Acquired clip");
                        return Some(AcquiredClip {
                            local_path: dest,
                            raw_duration,
                            source_scene_index: scene_index,
                            provider: name.to_string(),
                        });
                    }
                    Err(_) => continue,
                }
            }
        }

        warn!(scene_index, query, "Scene unfillable: all providers exhausted");
        None
    }
}

/// Provider duration capped at `max`; unknown durations use the cap.
fn capped_duration(duration: f64, max: f64) -> f64 {
    if duration.is_finite() && duration > 0.0 {
        duration.min(max)
    } else {
        max
    }
}
