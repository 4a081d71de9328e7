//! Concurrent ingestion pipeline.
//!
//! Turns a list of video IDs into stored recipes, each at most once. A fixed
//! number of workers pull jobs from a shared queue and run each one through
//! download, transcription, extraction and the store write. Failures stay
//! inside their job; only a store failure stops the run.

mod job;
mod limiter;
mod report;
mod retry;

pub use job::{IngestionJob, JobState, NextStep};
pub use limiter::{LimiterPermit, RateLimiter, ServiceLimiters};
pub use report::{FailedVideo, RunReport};
pub use retry::RetryPolicy;

use crate::audio::remove_video_files;
use crate::error::{LarderError, Result, Service, ServiceError, ServiceResult};
use crate::extraction::{
    ingredients_from_description, ExtractedRecipe, ExtractionMode, ExtractionResult, Extractor,
};
use crate::source::{MediaFetcher, VideoMetadata};
use crate::store::{Recipe, RecipeStore, UpsertOutcome, WriteMode};
use crate::transcription::Transcriber;
use chrono::Utc;
use futures::future::join_all;
use indicatif::ProgressBar;
use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn, Span};
use uuid::Uuid;

/// Per-run options.
#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    /// Number of workers, i.e. jobs in flight at once. Must be at least 1.
    pub concurrency: usize,
    /// Reprocess videos that already have a recipe and overwrite them.
    pub force: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            concurrency: 1,
            force: false,
        }
    }
}

/// The ingestion pipeline and the collaborators it drives.
pub struct IngestionPipeline {
    store: Arc<dyn RecipeStore>,
    media: Arc<dyn MediaFetcher>,
    transcriber: Arc<dyn Transcriber>,
    extractor: Arc<dyn Extractor>,
    limiters: ServiceLimiters,
    policy: RetryPolicy,
    temp_dir: PathBuf,
    grace_period: Duration,
    description_fallback: bool,
    progress: Option<ProgressBar>,
}

impl IngestionPipeline {
    pub fn new(
        store: Arc<dyn RecipeStore>,
        media: Arc<dyn MediaFetcher>,
        transcriber: Arc<dyn Transcriber>,
        extractor: Arc<dyn Extractor>,
        temp_dir: PathBuf,
    ) -> Self {
        Self {
            store,
            media,
            transcriber,
            extractor,
            limiters: ServiceLimiters::default(),
            policy: RetryPolicy::default(),
            temp_dir,
            grace_period: Duration::from_secs(30),
            description_fallback: false,
            progress: None,
        }
    }

    pub fn with_limiters(mut self, limiters: ServiceLimiters) -> Self {
        self.limiters = limiters;
        self
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// How long in-flight jobs may keep running once the run is cancelled.
    pub fn with_grace_period(mut self, grace_period: Duration) -> Self {
        self.grace_period = grace_period;
        self
    }

    /// Store a recipe from the description's ingredient section when the
    /// audio of a video cannot be processed.
    pub fn with_description_fallback(mut self, enabled: bool) -> Self {
        self.description_fallback = enabled;
        self
    }

    /// Advance `progress` once per finished job.
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Process `video_ids` and report what happened to each.
    ///
    /// Returns `Err` for invalid input or when the store fails; every other
    /// failure is reported per video.
    #[instrument(skip_all, fields(run_id = tracing::field::Empty, videos = video_ids.len()))]
    pub async fn run(
        &self,
        video_ids: &[String],
        options: RunOptions,
        cancel: CancellationToken,
    ) -> Result<RunReport> {
        if options.concurrency == 0 {
            return Err(LarderError::InvalidInput(
                "concurrency must be at least 1".to_string(),
            ));
        }
        if video_ids.iter().any(|id| id.trim().is_empty()) {
            return Err(LarderError::InvalidInput("empty video ID".to_string()));
        }

        let run_id = Uuid::new_v4();
        Span::current().record("run_id", tracing::field::display(run_id));
        let mut report = RunReport::new(run_id);

        if video_ids.is_empty() {
            return Ok(report);
        }

        let queue = self.admit(video_ids, options.force, &mut report).await?;
        if queue.is_empty() {
            info!("Nothing to ingest: {} already stored", report.skipped.len());
            return Ok(report);
        }

        let workers = options.concurrency.min(queue.len());
        info!(
            "Ingesting {} videos with {} workers ({} skipped)",
            queue.len(),
            workers,
            report.skipped.len()
        );
        if let Some(progress) = &self.progress {
            progress.set_length(queue.len() as u64);
        }

        let mode = if options.force {
            WriteMode::Overwrite
        } else {
            WriteMode::KeepExisting
        };
        let queue = Mutex::new(queue);
        // Stops workers from taking new jobs: external cancel or store failure.
        let stop = cancel.child_token();
        // Aborts jobs already in flight.
        let abort = CancellationToken::new();
        let done = CancellationToken::new();

        let pool = async {
            let results = join_all(
                (0..workers).map(|_| self.worker(&queue, mode, &stop, &abort)),
            )
            .await;
            done.cancel();
            results
        };

        let watchdog = async {
            tokio::select! {
                _ = stop.cancelled() => {
                    tokio::select! {
                        _ = tokio::time::sleep(self.grace_period) => {
                            warn!("Grace period elapsed, aborting in-flight jobs");
                            abort.cancel();
                        }
                        _ = done.cancelled() => {}
                    }
                }
                _ = done.cancelled() => {}
            }
        };

        let (results, ()) = tokio::join!(pool, watchdog);

        let mut finished = Vec::new();
        for result in results {
            finished.extend(result?);
        }

        for job in finished {
            match job.state {
                JobState::Stored => report.succeeded.push(job.video_id),
                JobState::Skipped => report.skipped.push(job.video_id),
                _ => {
                    let reason = job.failure_reason();
                    report.failed.push(FailedVideo {
                        video_id: job.video_id,
                        reason,
                    });
                }
            }
        }
        report
            .cancelled
            .extend(queue.into_inner().into_iter().map(|job| job.video_id));

        info!(
            "Run finished: {} stored, {} skipped, {} failed, {} cancelled",
            report.succeeded.len(),
            report.skipped.len(),
            report.failed.len(),
            report.cancelled.len()
        );
        Ok(report)
    }

    /// Dedup against the store and against IDs already seen in this run.
    ///
    /// IDs already stored become `Skipped` jobs right here and go straight to
    /// the report; only the rest are queued.
    async fn admit(
        &self,
        video_ids: &[String],
        force: bool,
        report: &mut RunReport,
    ) -> Result<VecDeque<IngestionJob>> {
        let mut seen = HashSet::new();
        let mut queue = VecDeque::new();

        for video_id in video_ids {
            let video_id = video_id.trim();
            if !seen.insert(video_id) {
                debug!("Duplicate {} in input, already handled this run", video_id);
                continue;
            }
            if !force && self.store.exists(video_id).await? {
                debug!("Skipping {}: already stored", video_id);
                let mut job = IngestionJob::new(video_id);
                job.advance(JobState::Skipped);
                report.skipped.push(job.video_id);
                continue;
            }
            queue.push_back(IngestionJob::new(video_id));
        }

        Ok(queue)
    }

    async fn worker(
        &self,
        queue: &Mutex<VecDeque<IngestionJob>>,
        mode: WriteMode,
        stop: &CancellationToken,
        abort: &CancellationToken,
    ) -> Result<Vec<IngestionJob>> {
        let mut finished = Vec::new();

        loop {
            if stop.is_cancelled() {
                break;
            }
            let Some(job) = queue.lock().await.pop_front() else {
                break;
            };
            let video_id = job.video_id.clone();

            let job = tokio::select! {
                biased;
                _ = abort.cancelled() => {
                    // The job's future and any child processes are gone by now.
                    remove_video_files(&self.temp_dir, &video_id);
                    let mut aborted = IngestionJob::new(video_id);
                    aborted.fail("cancelled before completion");
                    aborted
                }
                result = self.process(job, mode) => match result {
                    Ok(job) => job,
                    Err(e) => {
                        stop.cancel();
                        abort.cancel();
                        return Err(e);
                    }
                },
            };

            if let Some(progress) = &self.progress {
                progress.inc(1);
            }
            finished.push(job);
        }

        Ok(finished)
    }

    /// Run one job to a terminal state. `Err` only for store failures.
    #[instrument(skip_all, fields(video_id = %job.video_id))]
    async fn process(&self, mut job: IngestionJob, mode: WriteMode) -> Result<IngestionJob> {
        loop {
            job.begin_attempt();

            let error = match self.attempt(&mut job).await {
                Ok(extracted) => {
                    self.persist(&mut job, extracted, mode).await?;
                    break;
                }
                Err(error) => error,
            };

            match job.on_failure(&error, &self.policy) {
                NextStep::RetryAfter(delay) => {
                    warn!(
                        "Attempt {} failed ({}), retrying in {:?}",
                        job.attempt, error, delay
                    );
                    tokio::time::sleep(delay).await;
                }
                NextStep::Fail => {
                    match self.fallback_recipe(&job, &error) {
                        Some(extracted) => {
                            info!("Using description ingredients after: {}", error);
                            self.persist(&mut job, extracted, mode).await?;
                        }
                        None => {
                            warn!("Failed after {} attempts: {}", job.attempt, error);
                            job.fail(error.to_string());
                        }
                    }
                    break;
                }
            }
        }

        if let Some(path) = job.audio_path.take() {
            remove_audio(&path).await;
        }
        Ok(job)
    }

    /// One pass through the chain, resuming after the last completed stage.
    async fn attempt(&self, job: &mut IngestionJob) -> ServiceResult<ExtractedRecipe> {
        let metadata = match job.metadata.clone() {
            Some(metadata) => metadata,
            None => {
                job.advance(JobState::Downloading);
                let metadata = self.media.metadata(&job.video_id).await?;
                job.metadata = Some(metadata.clone());
                metadata
            }
        };

        let transcript = match job.transcript.clone() {
            Some(transcript) => transcript,
            None => {
                let audio_path = match job.audio_path.clone() {
                    Some(path) => path,
                    None => {
                        job.advance(JobState::Downloading);
                        let path = self.media.download_audio(&metadata, &self.temp_dir).await?;
                        job.audio_path = Some(path.clone());
                        path
                    }
                };

                job.advance(JobState::Transcribing);
                let transcript = {
                    let _permit = self.limiters.transcriber.acquire().await?;
                    self.transcriber.transcribe(&audio_path).await?
                };
                if transcript.trim().is_empty() {
                    return Err(ServiceError::permanent(
                        Service::Transcriber,
                        "transcript is empty",
                    ));
                }

                if let Some(path) = job.audio_path.take() {
                    remove_audio(&path).await;
                }
                job.transcript = Some(transcript.clone());
                transcript
            }
        };

        job.advance(JobState::Extracting);
        match self.extract(&transcript, &metadata, ExtractionMode::Standard).await? {
            ExtractionResult::Extracted(recipe) => Ok(recipe),
            ExtractionResult::MalformedOutput { .. } => {
                debug!("Malformed extraction output, reformulating");
                match self.extract(&transcript, &metadata, ExtractionMode::Reformulated).await? {
                    ExtractionResult::Extracted(recipe) => Ok(recipe),
                    ExtractionResult::MalformedOutput { raw_text } => {
                        let preview: String = raw_text.chars().take(80).collect();
                        Err(ServiceError::permanent(
                            Service::Extractor,
                            format!("unparsable output after reformulation: {}", preview),
                        ))
                    }
                }
            }
        }
    }

    async fn extract(
        &self,
        transcript: &str,
        metadata: &VideoMetadata,
        mode: ExtractionMode,
    ) -> ServiceResult<ExtractionResult> {
        let _permit = self.limiters.extractor.acquire().await?;
        self.extractor.extract(transcript, metadata, mode).await
    }

    /// Ingredients from the description, when enabled and the audio side of
    /// the chain is what failed.
    fn fallback_recipe(&self, job: &IngestionJob, error: &ServiceError) -> Option<ExtractedRecipe> {
        if !self.description_fallback || error.service() == Service::Extractor {
            return None;
        }
        let metadata = job.metadata.as_ref()?;
        let ingredients = ingredients_from_description(metadata.description.as_deref()?);
        if ingredients.is_empty() {
            return None;
        }

        Some(ExtractedRecipe {
            dish_name: metadata.title.clone(),
            ingredients,
        })
    }

    async fn persist(
        &self,
        job: &mut IngestionJob,
        extracted: ExtractedRecipe,
        mode: WriteMode,
    ) -> Result<()> {
        let Some(metadata) = job.metadata.as_ref() else {
            job.fail("no metadata for recipe");
            return Ok(());
        };
        let recipe = build_recipe(metadata, extracted);

        match self.store.upsert(&recipe, mode).await? {
            UpsertOutcome::Inserted | UpsertOutcome::Replaced => {
                info!(
                    "Stored '{}' ({} ingredients)",
                    recipe.dish_name,
                    recipe.ingredients.len()
                );
                job.advance(JobState::Stored);
            }
            UpsertOutcome::AlreadyPresent => {
                debug!("Stored concurrently by another run");
                job.advance(JobState::Skipped);
            }
        }
        Ok(())
    }
}

fn build_recipe(metadata: &VideoMetadata, extracted: ExtractedRecipe) -> Recipe {
    Recipe {
        video_id: metadata.video_id.clone(),
        title: metadata.title.clone(),
        description: metadata.description.clone(),
        dish_name: extracted.dish_name,
        ingredients: extracted.ingredients,
        url: metadata.url.clone(),
        created_at: Utc::now(),
    }
}

async fn remove_audio(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        debug!("Could not remove {:?}: {}", path, e);
    }
}
