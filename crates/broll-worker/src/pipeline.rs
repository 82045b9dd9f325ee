//! Pipeline orchestration.
//!
//! One job runs: narration intake, timeline planning, per-scene query
//! resolution and clip acquisition, normalization, assembly, muxing and
//! publication.
//!
//! Scene work is a two-stage pipeline. Acquisitions run as a bounded
//! fan-out and hand each downloaded clip to a second fan-out bounded by the
//! ffmpeg process limit, so normalization of early scenes overlaps the
//! downloads of later ones. A single wall-clock budget covers both; when it
//! expires the in-flight futures are dropped, which aborts HTTP transfers
//! and kills ffmpeg children. A failed scene is logged and left out.

use async_trait::async_trait;
use chrono::Utc;
use futures::future::join_all;
use futures::stream::{FuturesUnordered, StreamExt};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, Semaphore};
use tracing::{info, warn, Instrument};

use broll_footage::{
    AcquisitionEngine, ClipDownloader, FootageProvider, HttpTranslator, KeywordTranslator,
    MetadataFilter, PexelsProvider, PixabayProvider, ProviderConfig,
};
use broll_media::{FfmpegBackend, MediaBackend};
use broll_models::{
    AcquiredClip, AudioTrack, JobOutcome, JobRequest, JobStage, NormalizedClip, SceneDescriptor,
};
use broll_storage::{ArtifactStore, LocalArtifactStore, LocalStoreConfig};

use crate::audio_source::AudioFetcher;
use crate::config::{ApiKey, BudgetPolicy, WorkerConfig};
use crate::error::{PipelineError, PipelineResult};
use crate::logging::JobLogger;
use crate::metrics;
use crate::query::QueryResolver;
use crate::retry::{retry_pipeline, RetryConfig};
use crate::scratch::ScratchDir;
use crate::state::JobStateMachine;
use crate::timeline;

const OPERATION: &str = "broll_assembly";

/// Source of one downloaded clip per scene.
#[async_trait]
pub trait ClipAcquirer: Send + Sync {
    /// `None` means every provider was exhausted for this scene.
    async fn acquire(&self, query: &str, scene_index: usize, dest_dir: &Path) -> Option<AcquiredClip>;
}

#[async_trait]
impl ClipAcquirer for AcquisitionEngine {
    async fn acquire(&self, query: &str, scene_index: usize, dest_dir: &Path) -> Option<AcquiredClip> {
        AcquisitionEngine::acquire(self, query, scene_index, dest_dir).await
    }
}

/// What the scene fan-out produced.
struct SceneFill {
    /// Canonical clips keyed, and therefore ordered, by scene index
    clips: BTreeMap<usize, NormalizedClip>,
    unfillable: usize,
    transcode_failed: usize,
    budget_expired: bool,
}

/// Successful job summary.
struct Completed {
    reference: String,
    duration: f64,
    scenes_filled: usize,
    scenes_total: usize,
}

/// Runs b-roll jobs end to end.
pub struct Pipeline {
    config: Arc<WorkerConfig>,
    resolver: Arc<QueryResolver>,
    acquirer: Arc<dyn ClipAcquirer>,
    media: Arc<dyn MediaBackend>,
    store: Arc<dyn ArtifactStore>,
    audio: AudioFetcher,
}

impl Pipeline {
    pub fn new(
        config: Arc<WorkerConfig>,
        resolver: Arc<QueryResolver>,
        acquirer: Arc<dyn ClipAcquirer>,
        media: Arc<dyn MediaBackend>,
        store: Arc<dyn ArtifactStore>,
    ) -> PipelineResult<Self> {
        let audio = AudioFetcher::new(config.audio_fetch_timeout)?;
        Ok(Self {
            config,
            resolver,
            acquirer,
            media,
            store,
            audio,
        })
    }

    /// Wire up the production collaborators described by `config`.
    pub fn from_config(config: Arc<WorkerConfig>) -> PipelineResult<Self> {
        let provider_config = |base_url: &str, key: &ApiKey| {
            ProviderConfig::new(base_url, Some(key.expose().to_string()))
                .with_timeout(config.search_timeout)
                .with_max_retries(config.search_retries)
                .with_min_width(config.min_clip_width)
                .with_per_page(config.results_per_page)
        };

        let mut providers: Vec<Arc<dyn FootageProvider>> = Vec::new();
        match &config.pexels_api_key {
            Some(key) => providers.push(Arc::new(PexelsProvider::new(provider_config(
                &config.pexels_base_url,
                key,
            ))?)),
            None => warn!("PEXELS_API_KEY not set, Pexels disabled"),
        }
        match &config.pixabay_api_key {
            Some(key) => providers.push(Arc::new(PixabayProvider::new(provider_config(
                &config.pixabay_base_url,
                key,
            ))?)),
            None => warn!("PIXABAY_API_KEY not set, Pixabay disabled"),
        }
        if providers.is_empty() {
            return Err(PipelineError::config_error(
                "no footage provider configured (set PEXELS_API_KEY or PIXABAY_API_KEY)",
            ));
        }

        let engine = AcquisitionEngine::new(
            providers,
            ClipDownloader::new(config.download_timeout)?,
            MetadataFilter::new(&config.include_terms, &config.exclude_terms),
            config.acquisition(),
        );
        info!(providers = ?engine.provider_names(), "Footage providers ready");

        let translator = match &config.translator_url {
            Some(url) => Some(
                Arc::new(HttpTranslator::new(url.as_str(), config.translator_timeout)?)
                    as Arc<dyn KeywordTranslator>,
            ),
            None => None,
        };

        let media = FfmpegBackend::new(config.format.clone(), config.media_limits.clone());
        let store = LocalArtifactStore::new(LocalStoreConfig {
            root: config.artifact_dir.clone(),
            public_base_url: config.artifact_base_url.clone(),
        });

        Self::new(
            config,
            Arc::new(QueryResolver::with_defaults(translator)),
            Arc::new(engine),
            Arc::new(media),
            Arc::new(store),
        )
    }

    /// Run one job to completion. Never panics on job errors; every failure
    /// becomes [`JobOutcome::Failed`].
    pub async fn run(&self, request: JobRequest) -> JobOutcome {
        let logger = JobLogger::new(&request.job_id, OPERATION);
        let span = logger.create_span();
        self.run_logged(request, logger).instrument(span).await
    }

    async fn run_logged(&self, request: JobRequest, logger: JobLogger) -> JobOutcome {
        let started = Instant::now();
        let mut sm = JobStateMachine::new(logger.clone());
        logger.log_start(&format!(
            "{} scenes, primary keyword {:?}",
            self.config.scene_count,
            request.primary_keyword()
        ));

        let result = match request.validate() {
            Err(e) => Err(PipelineError::from(e)),
            Ok(()) => match ScratchDir::create(&self.config.work_dir, &request.job_id).await {
                Err(e) => Err(PipelineError::Io(e)),
                Ok(scratch) => {
                    let deadline = self.config.job_timeout;
                    let result = match tokio::time::timeout(
                        deadline,
                        self.execute(&request, &scratch, &mut sm, &logger),
                    )
                    .await
                    {
                        Ok(result) => result,
                        Err(_) => Err(PipelineError::JobTimeout {
                            secs: deadline.as_secs(),
                        }),
                    };
                    scratch.cleanup().await;
                    result
                }
            },
        };

        let elapsed = started.elapsed().as_secs_f64();
        match result {
            Ok(done) => {
                metrics::record_job("done", None, elapsed);
                logger.log_completion(&format!(
                    "{}/{} scenes filled, {:.2}s video at {}",
                    done.scenes_filled, done.scenes_total, done.duration, done.reference
                ));
                JobOutcome::Done {
                    job_id: request.job_id,
                    reference: done.reference,
                    duration: done.duration,
                    scenes_filled: done.scenes_filled,
                    scenes_total: done.scenes_total,
                    finished_at: Utc::now(),
                }
            }
            Err(e) => {
                let reason = e.to_string();
                let stage = sm.fail(reason.clone()).unwrap_or("done");
                metrics::record_job("failed", Some(e.kind().as_str()), elapsed);
                JobOutcome::Failed {
                    job_id: request.job_id,
                    stage: stage.to_string(),
                    reason,
                    finished_at: Utc::now(),
                }
            }
        }
    }

    async fn execute(
        &self,
        request: &JobRequest,
        scratch: &ScratchDir,
        sm: &mut JobStateMachine,
        logger: &JobLogger,
    ) -> PipelineResult<Completed> {
        let audio = self.prepare_audio(request, scratch, logger).await?;

        let words = request.script.words();
        let scenes = timeline::plan_with_window(
            &words,
            audio.duration,
            self.config.scene_count,
            self.config.snippet_window,
        );
        let scenes_total = scenes.len();
        logger.log_progress(&format!(
            "planned {} scenes over {:.2}s of narration ({} words)",
            scenes_total,
            audio.duration,
            words.len()
        ));

        sm.advance(JobStage::Acquiring)?;
        let fill = self
            .fill_scenes(scenes, &request.keywords, scratch, sm, logger)
            .await?;
        if sm.stage() == &JobStage::Acquiring {
            sm.advance(JobStage::Normalizing)?;
        }

        let scenes_filled = fill.clips.len();
        let cancelled = scenes_total
            .saturating_sub(scenes_filled + fill.unfillable + fill.transcode_failed);
        metrics::record_scenes("cancelled", cancelled);
        logger.log_progress(&format!(
            "{} filled, {} unfillable, {} failed to transcode, {} cancelled",
            scenes_filled, fill.unfillable, fill.transcode_failed, cancelled
        ));

        if fill.budget_expired {
            let policy = self.config.budget_policy;
            metrics::record_budget_exhausted(match policy {
                BudgetPolicy::UseCompleted => "use_completed",
                BudgetPolicy::Fail => "fail",
            });
            if policy == BudgetPolicy::Fail {
                return Err(PipelineError::BudgetExhausted {
                    completed: scenes_filled,
                    total: scenes_total,
                });
            }
            logger.log_warning(&format!(
                "scene budget of {:?} exhausted, continuing with {} completed scenes",
                self.config.scene_budget, scenes_filled
            ));
        }

        if fill.clips.is_empty() {
            return Err(PipelineError::NoUsableClips);
        }
        let clips: Vec<NormalizedClip> = fill.clips.into_values().collect();

        sm.advance(JobStage::Assembling)?;
        let video = self
            .media
            .assemble(clips, audio.duration, &scratch.file("assembled.mp4"))
            .await?;

        sm.advance(JobStage::Muxing)?;
        let artifact = self
            .media
            .mux(video, &audio, &scratch.file("final.mp4"))
            .await?;

        logger.log_progress("publishing artifact");
        let retry = RetryConfig::new("artifact_store").with_max_retries(2);
        let stored = retry_pipeline(&retry, || async {
            self.store
                .store(&request.job_id, &artifact.local_path)
                .await
                .map_err(PipelineError::from)
        })
        .await
        .map_err(|e| PipelineError::PublishFailed(e.to_string()))?;

        sm.advance(JobStage::Done)?;
        Ok(Completed {
            reference: stored.reference,
            duration: audio.duration,
            scenes_filled,
            scenes_total,
        })
    }

    async fn prepare_audio(
        &self,
        request: &JobRequest,
        scratch: &ScratchDir,
        logger: &JobLogger,
    ) -> PipelineResult<AudioTrack> {
        let input = self
            .audio
            .materialize(&request.audio, &scratch.file("narration.input"))
            .await?;
        let audio = self
            .media
            .prepare_audio(&input, &scratch.file("narration.wav"), request.duration_hint)
            .await?;
        if !audio.measured {
            logger.log_warning(&format!(
                "narration duration could not be measured, using {:.2}s",
                audio.duration
            ));
        }
        Ok(audio)
    }

    /// Acquire and normalize every scene within the scene budget.
    async fn fill_scenes(
        &self,
        scenes: Vec<SceneDescriptor>,
        keywords: &[String],
        scratch: &ScratchDir,
        sm: &mut JobStateMachine,
        logger: &JobLogger,
    ) -> PipelineResult<SceneFill> {
        let raw_dir = scratch.raw_dir();
        let normalized_dir = scratch.normalized_dir();
        let scene_permits = Semaphore::new(self.config.max_scene_parallel.max(1));
        let ffmpeg_permits = Semaphore::new(self.config.max_ffmpeg_processes.max(1));
        let unfillable = AtomicUsize::new(0);

        let (tx, mut rx) = mpsc::unbounded_channel::<AcquiredClip>();
        let acquisitions = join_all(scenes.into_iter().map(|scene| {
            self.acquire_scene(
                scene,
                keywords,
                &raw_dir,
                &scene_permits,
                tx.clone(),
                &unfillable,
                logger,
            )
        }));
        drop(tx);
        tokio::pin!(acquisitions);

        let mut normalizing = FuturesUnordered::new();
        let mut acquiring_done = false;
        let mut clips = BTreeMap::new();
        let mut transcode_failed = 0usize;

        let fan_out = async {
            loop {
                tokio::select! {
                    Some(clip) = rx.recv() => {
                        normalizing.push(self.normalize_scene(clip, &normalized_dir, &ffmpeg_permits));
                    }
                    _ = &mut acquisitions, if !acquiring_done => {
                        acquiring_done = true;
                        sm.advance(JobStage::Normalizing)?;
                    }
                    Some((index, result)) = normalizing.next(), if !normalizing.is_empty() => {
                        match result {
                            Ok(clip) => {
                                metrics::record_scene("filled");
                                clips.insert(index, clip);
                            }
                            Err(e) => {
                                metrics::record_scene("transcode_failed");
                                transcode_failed += 1;
                                logger.log_scene_failure(index, &e.to_string());
                            }
                        }
                    }
                    else => break,
                }
            }
            Ok::<(), PipelineError>(())
        };

        let budget_expired = match tokio::time::timeout(self.config.scene_budget, fan_out).await {
            Ok(result) => {
                result?;
                false
            }
            Err(_) => true,
        };

        Ok(SceneFill {
            clips,
            unfillable: unfillable.load(Ordering::SeqCst),
            transcode_failed,
            budget_expired,
        })
    }

    #[allow(clippy::too_many_arguments)]
    async fn acquire_scene(
        &self,
        scene: SceneDescriptor,
        keywords: &[String],
        raw_dir: &Path,
        permits: &Semaphore,
        clips: mpsc::UnboundedSender<AcquiredClip>,
        unfillable: &AtomicUsize,
        logger: &JobLogger,
    ) {
        let Ok(_permit) = permits.acquire().await else {
            return;
        };

        let scene = self.resolver.resolve(&scene, keywords).await;
        match self.acquirer.acquire(&scene.query, scene.index, raw_dir).await {
            Some(clip) => {
                // Receiver only goes away when the budget expired.
                let _ = clips.send(clip);
            }
            None => {
                unfillable.fetch_add(1, Ordering::SeqCst);
                metrics::record_scene("unfillable");
                logger.log_scene_failure(
                    scene.index,
                    &format!("no usable footage for query '{}'", scene.query),
                );
            }
        }
    }

    async fn normalize_scene(
        &self,
        clip: AcquiredClip,
        dir: &Path,
        permits: &Semaphore,
    ) -> (usize, PipelineResult<NormalizedClip>) {
        let index = clip.source_scene_index;
        let Ok(_permit) = permits.acquire().await else {
            return (index, Err(PipelineError::TranscodeFailed("ffmpeg permits closed".into())));
        };
        let output = dir.join(format!("scene_{:03}.mp4", index));
        let result = self
            .media
            .normalize(clip, &output)
            .await
            .map_err(PipelineError::from);
        (index, result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use broll_media::{MediaError, MediaResult};
    use broll_models::{AssembledVideo, AudioSource, FinalArtifact, JobId, ScriptText};
    use broll_storage::{ArtifactRef, StorageError, StorageResult};
    use std::collections::HashSet;
    use std::path::PathBuf;
    use std::sync::Mutex;
    use std::time::Duration;
    use tempfile::TempDir;

    /// Writes a fake raw file per scene, failing the listed scenes.
    struct FakeAcquirer {
        unfillable: HashSet<usize>,
        /// Per-scene delay before the clip "arrives"
        delay: fn(usize) -> Duration,
        calls: AtomicUsize,
    }

    impl FakeAcquirer {
        fn new(unfillable: impl IntoIterator<Item = usize>) -> Self {
            Self {
                unfillable: unfillable.into_iter().collect(),
                delay: |_| Duration::ZERO,
                calls: AtomicUsize::new(0),
            }
        }

        fn with_delay(mut self, delay: fn(usize) -> Duration) -> Self {
            self.delay = delay;
            self
        }
    }

    #[async_trait]
    impl ClipAcquirer for FakeAcquirer {
        async fn acquire(&self, query: &str, scene_index: usize, dest_dir: &Path) -> Option<AcquiredClip> {
            assert!(!query.is_empty());
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep((self.delay)(scene_index)).await;
            if self.unfillable.contains(&scene_index) {
                return None;
            }
            let local_path = dest_dir.join(format!("raw_{:03}.mp4", scene_index));
            tokio::fs::write(&local_path, b"raw").await.ok()?;
            Some(AcquiredClip {
                local_path,
                raw_duration: 4.0,
                source_scene_index: scene_index,
                provider: "fake".to_string(),
            })
        }
    }

    /// In-memory media backend recording the assembly order.
    struct FakeMedia {
        broken_clips: HashSet<usize>,
        assembled_order: Mutex<Vec<usize>>,
        /// Stall inside `assemble` before producing output
        assemble_delay: Duration,
        fail_mux: bool,
    }

    impl FakeMedia {
        fn new() -> Self {
            Self {
                broken_clips: HashSet::new(),
                assembled_order: Mutex::new(Vec::new()),
                assemble_delay: Duration::ZERO,
                fail_mux: false,
            }
        }
    }

    #[async_trait]
    impl MediaBackend for FakeMedia {
        async fn prepare_audio(
            &self,
            input: &Path,
            output: &Path,
            duration_hint: Option<f64>,
        ) -> MediaResult<AudioTrack> {
            assert!(input.exists());
            tokio::fs::write(output, b"wav").await?;
            Ok(AudioTrack {
                local_path: output.to_path_buf(),
                duration: duration_hint.unwrap_or(60.0),
                measured: duration_hint.is_some(),
            })
        }

        async fn normalize(&self, clip: AcquiredClip, output: &Path) -> MediaResult<NormalizedClip> {
            tokio::fs::remove_file(&clip.local_path).await?;
            if self.broken_clips.contains(&clip.source_scene_index) {
                return Err(MediaError::transcode_failed("corrupt stream"));
            }
            tokio::fs::write(output, b"canonical").await?;
            Ok(NormalizedClip {
                local_path: output.to_path_buf(),
                duration: clip.raw_duration,
                source_scene_index: clip.source_scene_index,
            })
        }

        async fn assemble(
            &self,
            clips: Vec<NormalizedClip>,
            target: f64,
            output: &Path,
        ) -> MediaResult<AssembledVideo> {
            if clips.is_empty() {
                return Err(MediaError::NoUsableClips);
            }
            tokio::time::sleep(self.assemble_delay).await;
            *self.assembled_order.lock().unwrap() =
                clips.iter().map(|c| c.source_scene_index).collect();
            tokio::fs::write(output, b"video").await?;
            Ok(AssembledVideo {
                local_path: output.to_path_buf(),
                duration: target,
            })
        }

        async fn mux(
            &self,
            video: AssembledVideo,
            audio: &AudioTrack,
            output: &Path,
        ) -> MediaResult<FinalArtifact> {
            tokio::fs::remove_file(&video.local_path).await?;
            if self.fail_mux {
                return Err(MediaError::mux_failed("ffmpeg exited with 1"));
            }
            tokio::fs::write(output, b"final").await?;
            Ok(FinalArtifact {
                local_path: output.to_path_buf(),
                duration: audio.duration,
            })
        }
    }

    /// Store that always refuses the artifact.
    struct FailingStore {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ArtifactStore for FailingStore {
        async fn store(&self, _job_id: &JobId, _path: &Path) -> StorageResult<ArtifactRef> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(StorageError::store_failed("disk full"))
        }
    }

    struct Harness {
        _dir: TempDir,
        work_dir: PathBuf,
        audio: PathBuf,
        config: WorkerConfig,
    }

    impl Harness {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let audio = dir.path().join("voice.mp3");
            std::fs::write(&audio, b"id3").unwrap();
            let work_dir = dir.path().join("work");
            let config = WorkerConfig {
                work_dir: work_dir.to_string_lossy().into_owned(),
                artifact_dir: dir.path().join("published"),
                translator_url: None,
                ..Default::default()
            };
            Self {
                _dir: dir,
                work_dir,
                audio,
                config,
            }
        }

        fn pipeline(&self, acquirer: Arc<FakeAcquirer>, media: Arc<FakeMedia>) -> Pipeline {
            let store = LocalArtifactStore::new(LocalStoreConfig {
                root: self.config.artifact_dir.clone(),
                public_base_url: None,
            });
            self.pipeline_with_store(acquirer, media, Arc::new(store))
        }

        fn pipeline_with_store(
            &self,
            acquirer: Arc<FakeAcquirer>,
            media: Arc<FakeMedia>,
            store: Arc<dyn ArtifactStore>,
        ) -> Pipeline {
            Pipeline::new(
                Arc::new(self.config.clone()),
                Arc::new(QueryResolver::with_defaults(None)),
                acquirer,
                media,
                store,
            )
            .unwrap()
        }

        fn request(&self, job: &str) -> JobRequest {
            let mut request = JobRequest::new(
                AudioSource::Path(self.audio.clone()),
                ScriptText::Single("dormire bene aiuta a gestire lo stress e le vampate".into()),
            )
            .with_duration_hint(72.0)
            .with_keywords(vec!["menopausa".to_string()]);
            request.job_id = JobId::from_string(job);
            request
        }
    }

    #[tokio::test]
    async fn test_three_unfillable_scenes_still_succeed() {
        let harness = Harness::new();
        let acquirer = Arc::new(FakeAcquirer::new([3, 10, 17]));
        let media = Arc::new(FakeMedia::new());
        let pipeline = harness.pipeline(acquirer.clone(), media.clone());

        let outcome = pipeline.run(harness.request("job-d")).await;

        match &outcome {
            JobOutcome::Done {
                duration,
                scenes_filled,
                scenes_total,
                reference,
                ..
            } => {
                assert_eq!(*scenes_total, 25);
                assert_eq!(*scenes_filled, 22);
                assert_eq!(*duration, 72.0);
                assert!(reference.starts_with("file://"));
                assert!(reference.ends_with("job-d.mp4"));
            }
            other => panic!("expected success, got {:?}", other),
        }
        assert_eq!(acquirer.calls.load(Ordering::SeqCst), 25);

        let expected: Vec<usize> = (0..25).filter(|i| ![3, 10, 17].contains(i)).collect();
        assert_eq!(*media.assembled_order.lock().unwrap(), expected);
    }

    #[tokio::test]
    async fn test_no_clips_is_a_hard_failure() {
        let harness = Harness::new();
        let pipeline = harness.pipeline(
            Arc::new(FakeAcquirer::new(0..25)),
            Arc::new(FakeMedia::new()),
        );

        let outcome = pipeline.run(harness.request("job-empty")).await;

        assert!(!outcome.is_success());
        assert!(outcome.reference().is_none());
        match outcome {
            JobOutcome::Failed { stage, reason, .. } => {
                assert_eq!(stage, "normalizing");
                assert!(reason.contains("No usable clips"));
            }
            other => panic!("expected failure, got {:?}", other),
        }
        assert!(!harness.config.artifact_dir.exists());
    }

    #[tokio::test]
    async fn test_order_independent_of_completion_order() {
        let harness = Harness::new();
        // Lower scene indices finish last.
        let acquirer = Arc::new(
            FakeAcquirer::new([]).with_delay(|i| Duration::from_millis(5 * (25 - i as u64))),
        );
        let media = Arc::new(FakeMedia::new());
        let pipeline = harness.pipeline(acquirer, media.clone());

        let outcome = pipeline.run(harness.request("job-order")).await;

        assert!(outcome.is_success());
        assert_eq!(
            *media.assembled_order.lock().unwrap(),
            (0..25).collect::<Vec<_>>()
        );
    }

    #[tokio::test]
    async fn test_transcode_failures_are_omitted() {
        let harness = Harness::new();
        let mut media = FakeMedia::new();
        media.broken_clips = [0, 24].into_iter().collect();
        let media = Arc::new(media);
        let pipeline = harness.pipeline(Arc::new(FakeAcquirer::new([])), media.clone());

        let outcome = pipeline.run(harness.request("job-transcode")).await;

        match outcome {
            JobOutcome::Done { scenes_filled, .. } => assert_eq!(scenes_filled, 23),
            other => panic!("expected success, got {:?}", other),
        }
        let order = media.assembled_order.lock().unwrap();
        assert_eq!(order.first(), Some(&1));
        assert_eq!(order.last(), Some(&23));
    }

    fn slow_after_second_scene(index: usize) -> Duration {
        if index < 2 {
            Duration::ZERO
        } else {
            Duration::from_secs(30)
        }
    }

    #[tokio::test]
    async fn test_budget_expiry_uses_completed_scenes() {
        let mut harness = Harness::new();
        harness.config.scene_budget = Duration::from_millis(300);
        harness.config.max_scene_parallel = 25;
        let media = Arc::new(FakeMedia::new());
        let pipeline = harness.pipeline(
            Arc::new(FakeAcquirer::new([]).with_delay(slow_after_second_scene)),
            media.clone(),
        );

        let started = Instant::now();
        let outcome = pipeline.run(harness.request("job-budget")).await;

        assert!(started.elapsed() < Duration::from_secs(10));
        match outcome {
            JobOutcome::Done { scenes_filled, scenes_total, .. } => {
                assert_eq!(scenes_filled, 2);
                assert_eq!(scenes_total, 25);
            }
            other => panic!("expected success, got {:?}", other),
        }
        assert_eq!(*media.assembled_order.lock().unwrap(), vec![0, 1]);
    }

    #[tokio::test]
    async fn test_budget_expiry_can_fail_the_job() {
        let mut harness = Harness::new();
        harness.config.scene_budget = Duration::from_millis(300);
        harness.config.budget_policy = BudgetPolicy::Fail;
        let pipeline = harness.pipeline(
            Arc::new(FakeAcquirer::new([]).with_delay(slow_after_second_scene)),
            Arc::new(FakeMedia::new()),
        );

        let outcome = pipeline.run(harness.request("job-budget-fail")).await;

        match outcome {
            JobOutcome::Failed { stage, reason, .. } => {
                assert_eq!(stage, "normalizing");
                assert!(reason.contains("budget"));
            }
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_scratch_removed_on_success_and_failure() {
        let harness = Harness::new();

        let ok = harness.pipeline(Arc::new(FakeAcquirer::new([])), Arc::new(FakeMedia::new()));
        assert!(ok.run(harness.request("job-ok")).await.is_success());
        assert!(!harness.work_dir.join("job-ok").exists());

        let mut media = FakeMedia::new();
        media.fail_mux = true;
        let failing = harness.pipeline(Arc::new(FakeAcquirer::new([])), Arc::new(media));
        let outcome = failing.run(harness.request("job-mux")).await;
        match outcome {
            JobOutcome::Failed { stage, .. } => assert_eq!(stage, "muxing"),
            other => panic!("expected failure, got {:?}", other),
        }
        assert!(!harness.work_dir.join("job-mux").exists());
    }

    #[tokio::test]
    async fn test_invalid_input_fails_fast() {
        let harness = Harness::new();
        let acquirer = Arc::new(FakeAcquirer::new([]));
        let pipeline = harness.pipeline(acquirer.clone(), Arc::new(FakeMedia::new()));

        let mut request = harness.request("job-invalid");
        request.audio = AudioSource::Url("ftp://example.com/voice.mp3".to_string());
        let outcome = pipeline.run(request).await;

        match outcome {
            JobOutcome::Failed { stage, reason, .. } => {
                assert_eq!(stage, "planning");
                assert!(reason.starts_with("Invalid input"));
            }
            other => panic!("expected failure, got {:?}", other),
        }
        assert_eq!(acquirer.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unmeasured_audio_uses_fallback_duration() {
        let harness = Harness::new();
        let pipeline = harness.pipeline(Arc::new(FakeAcquirer::new([])), Arc::new(FakeMedia::new()));

        let mut request = harness.request("job-nohint");
        request.duration_hint = None;
        match pipeline.run(request).await {
            JobOutcome::Done { duration, .. } => assert_eq!(duration, 60.0),
            other => panic!("expected success, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_job_id_cannot_reach_outside_work_dir() {
        let harness = Harness::new();
        let root = harness.work_dir.parent().unwrap().to_path_buf();
        std::fs::create_dir_all(root.join("victim")).unwrap();
        std::fs::write(root.join("victim").join("precious.txt"), b"keep").unwrap();
        std::fs::create_dir_all(harness.work_dir.join("other-job")).unwrap();

        let acquirer = Arc::new(FakeAcquirer::new([]));
        let pipeline = harness.pipeline(acquirer.clone(), Arc::new(FakeMedia::new()));

        for bad in ["../victim", "..", "", "job.1"] {
            match pipeline.run(harness.request(bad)).await {
                JobOutcome::Failed { stage, reason, .. } => {
                    assert_eq!(stage, "planning");
                    assert!(reason.starts_with("Invalid input"), "{}", reason);
                }
                other => panic!("expected failure for {:?}, got {:?}", bad, other),
            }
        }

        assert!(root.join("victim").join("precious.txt").exists());
        assert!(harness.work_dir.join("other-job").exists());
        assert_eq!(acquirer.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_job_deadline_covers_assembly() {
        let mut harness = Harness::new();
        harness.config.job_timeout = Duration::from_secs(1);
        let mut media = FakeMedia::new();
        media.assemble_delay = Duration::from_secs(30);
        let pipeline = harness.pipeline(Arc::new(FakeAcquirer::new([])), Arc::new(media));

        let started = Instant::now();
        let outcome = pipeline.run(harness.request("job-slow")).await;

        assert!(started.elapsed() < Duration::from_secs(10));
        match outcome {
            JobOutcome::Failed { stage, reason, .. } => {
                assert_eq!(stage, "assembling");
                assert!(reason.contains("deadline"), "{}", reason);
            }
            other => panic!("expected failure, got {:?}", other),
        }
        assert!(!harness.work_dir.join("job-slow").exists());
        assert!(!harness.config.artifact_dir.exists());
    }

    #[tokio::test]
    async fn test_store_failure_reported_as_publishing() {
        let harness = Harness::new();
        let store = Arc::new(FailingStore {
            calls: AtomicUsize::new(0),
        });
        let pipeline = harness.pipeline_with_store(
            Arc::new(FakeAcquirer::new([])),
            Arc::new(FakeMedia::new()),
            store.clone(),
        );

        let outcome = pipeline.run(harness.request("job-publish")).await;

        match outcome {
            JobOutcome::Failed { reason, .. } => {
                assert!(reason.starts_with("Publishing failed"), "{}", reason);
                assert!(reason.contains("disk full"));
            }
            other => panic!("expected failure, got {:?}", other),
        }
        // first attempt plus two retries
        assert_eq!(store.calls.load(Ordering::SeqCst), 3);
        assert!(!harness.work_dir.join("job-publish").exists());
    }
}
