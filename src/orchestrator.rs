//! Caller-facing entry points for Larder.
//!
//! Builds the production components from settings and exposes playlist
//! ingestion and recipe recommendation.

use crate::config::{Prompts, Settings};
use crate::error::{LarderError, Result};
use crate::extraction::{Extractor, OpenAIExtractor};
use crate::matching::{AliasNormalizer, IngredientNormalizer, MatchResult, Recommender};
use crate::pipeline::{IngestionPipeline, RetryPolicy, RunOptions, RunReport, ServiceLimiters};
use crate::source::{MediaFetcher, PlaylistResolver, YoutubeSource};
use crate::store::{Recipe, RecipeStore, SqliteRecipeStore};
use crate::transcription::{Transcriber, WhisperTranscriber};
use indicatif::ProgressBar;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

/// External collaborators the orchestrator drives.
pub struct Components {
    pub store: Arc<dyn RecipeStore>,
    pub resolver: Arc<dyn PlaylistResolver>,
    pub media: Arc<dyn MediaFetcher>,
    pub transcriber: Arc<dyn Transcriber>,
    pub extractor: Arc<dyn Extractor>,
}

/// The main orchestrator for Larder.
pub struct Orchestrator {
    settings: Settings,
    components: Components,
    /// Shared by every run started from this orchestrator.
    limiters: ServiceLimiters,
    normalizer: Arc<dyn IngredientNormalizer>,
}

impl Orchestrator {
    /// Create an orchestrator backed by yt-dlp, OpenAI and SQLite.
    pub fn new(settings: Settings) -> Result<Self> {
        settings.validate()?;

        let prompts = Prompts::load(settings.prompts.custom_dir.as_deref())?;
        let youtube = Arc::new(YoutubeSource::new());

        let components = Components {
            store: Arc::new(SqliteRecipeStore::new(&settings.sqlite_path())?),
            resolver: youtube.clone(),
            media: youtube,
            transcriber: Arc::new(WhisperTranscriber::with_config(&settings.transcription)?),
            extractor: Arc::new(OpenAIExtractor::with_config(
                &settings.extraction,
                &prompts.extraction,
            )?),
        };

        std::fs::create_dir_all(settings.temp_dir())?;
        info!(
            "Using {} for transcription, {} for extraction",
            settings.transcription.model, settings.extraction.model
        );

        Ok(Self::with_components(settings, components))
    }

    /// Create an orchestrator with custom components (useful for testing).
    pub fn with_components(settings: Settings, components: Components) -> Self {
        let limiters = ServiceLimiters::from_settings(&settings.limits);
        let normalizer = Arc::new(AliasNormalizer::new(&settings.matching.aliases));

        Self {
            settings,
            components,
            limiters,
            normalizer,
        }
    }

    /// Open only the recipe store, for read-only commands.
    pub fn open_store(settings: &Settings) -> Result<Arc<dyn RecipeStore>> {
        Ok(Arc::new(SqliteRecipeStore::new(&settings.sqlite_path())?))
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn store(&self) -> Arc<dyn RecipeStore> {
        self.components.store.clone()
    }

    /// Run options from settings, before CLI overrides.
    pub fn default_run_options(&self) -> RunOptions {
        RunOptions {
            concurrency: self.settings.ingestion.concurrency,
            force: false,
        }
    }

    fn pipeline(&self, progress: Option<ProgressBar>) -> IngestionPipeline {
        let ingestion = &self.settings.ingestion;
        let pipeline = IngestionPipeline::new(
            self.components.store.clone(),
            self.components.media.clone(),
            self.components.transcriber.clone(),
            self.components.extractor.clone(),
            self.settings.temp_dir(),
        )
        .with_limiters(self.limiters.clone())
        .with_retry_policy(RetryPolicy::from(&ingestion.retry))
        .with_grace_period(Duration::from_secs(ingestion.grace_period_seconds))
        .with_description_fallback(ingestion.description_fallback);

        match progress {
            Some(progress) => pipeline.with_progress(progress),
            None => pipeline,
        }
    }

    /// Resolve a playlist into video IDs.
    pub async fn resolve_playlist(&self, playlist_url: &str, limit: Option<usize>) -> Result<Vec<String>> {
        let playlist_url = playlist_url.trim();
        if playlist_url.is_empty() {
            return Err(LarderError::InvalidInput("playlist URL is empty".to_string()));
        }
        if limit == Some(0) {
            return Err(LarderError::InvalidInput(
                "limit must be a positive integer".to_string(),
            ));
        }
        self.components.resolver.resolve(playlist_url, limit).await
    }

    /// Resolve a playlist and ingest every video in it.
    #[instrument(skip(self, cancel, progress))]
    pub async fn ingest_playlist(
        &self,
        playlist_url: &str,
        limit: Option<usize>,
        options: RunOptions,
        cancel: CancellationToken,
        progress: Option<ProgressBar>,
    ) -> Result<RunReport> {
        let video_ids = self.resolve_playlist(playlist_url, limit).await?;
        self.ingest_videos(&video_ids, options, cancel, progress).await
    }

    /// Ingest the given video IDs.
    pub async fn ingest_videos(
        &self,
        video_ids: &[String],
        options: RunOptions,
        cancel: CancellationToken,
        progress: Option<ProgressBar>,
    ) -> Result<RunReport> {
        self.pipeline(progress).run(video_ids, options, cancel).await
    }

    /// Rank stored recipes for the ingredients the user has.
    pub async fn recommend(&self, owned: &[String], limit: Option<usize>) -> Result<Vec<MatchResult>> {
        Recommender::new(self.components.store.clone(), self.normalizer.clone())
            .recommend(owned, limit)
            .await
    }

    /// All stored recipes, newest first.
    pub async fn recipes(&self) -> Result<Vec<Recipe>> {
        self.components.store.all().await
    }

    /// Number of stored recipes.
    pub async fn count(&self) -> Result<usize> {
        self.components.store.count().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ServiceError, ServiceResult};
    use crate::extraction::{ExtractedRecipe, ExtractionMode, ExtractionResult};
    use crate::source::{canonical_video_url, VideoMetadata};
    use crate::store::MemoryRecipeStore;
    use async_trait::async_trait;
    use std::path::{Path, PathBuf};

    struct Fixed;

    #[async_trait]
    impl PlaylistResolver for Fixed {
        async fn resolve(&self, _url: &str, limit: Option<usize>) -> Result<Vec<String>> {
            let ids = vec!["stew".to_string(), "roll".to_string()];
            Ok(ids.into_iter().take(limit.unwrap_or(usize::MAX)).collect())
        }
    }

    #[async_trait]
    impl MediaFetcher for Fixed {
        async fn metadata(&self, video_id: &str) -> ServiceResult<VideoMetadata> {
            Ok(VideoMetadata {
                video_id: video_id.to_string(),
                title: video_id.to_string(),
                description: None,
                url: canonical_video_url(video_id),
            })
        }

        async fn download_audio(&self, media: &VideoMetadata, dir: &Path) -> ServiceResult<PathBuf> {
            Ok(dir.join(format!("{}.mp3", media.video_id)))
        }
    }

    #[async_trait]
    impl Transcriber for Fixed {
        async fn transcribe(&self, audio_path: &Path) -> ServiceResult<String> {
            Ok(audio_path.display().to_string())
        }
    }

    #[async_trait]
    impl Extractor for Fixed {
        async fn extract(
            &self,
            _transcript: &str,
            metadata: &VideoMetadata,
            _mode: ExtractionMode,
        ) -> ServiceResult<ExtractionResult> {
            let ingredients = match metadata.video_id.as_str() {
                "stew" => vec!["김치", "돼지고기", "두부", "대파"],
                "roll" => vec!["계란", "파"],
                other => {
                    return Err(ServiceError::permanent(
                        crate::error::Service::Extractor,
                        format!("unknown video {}", other),
                    ))
                }
            };
            Ok(ExtractionResult::Extracted(ExtractedRecipe {
                dish_name: metadata.video_id.clone(),
                ingredients: ingredients.into_iter().map(String::from).collect(),
            }))
        }
    }

    fn orchestrator() -> Orchestrator {
        let fixed = Arc::new(Fixed);
        let mut settings = Settings::default();
        settings.general.temp_dir = std::env::temp_dir().display().to_string();
        settings.matching.aliases.insert("pork".to_string(), "돼지고기".to_string());

        Orchestrator::with_components(
            settings,
            Components {
                store: Arc::new(MemoryRecipeStore::new()),
                resolver: fixed.clone(),
                media: fixed.clone(),
                transcriber: fixed.clone(),
                extractor: fixed,
            },
        )
    }

    #[tokio::test]
    async fn test_empty_playlist_url_rejected() {
        let orchestrator = orchestrator();
        let err = orchestrator
            .ingest_playlist("  ", None, RunOptions::default(), CancellationToken::new(), None)
            .await
            .unwrap_err();

        assert!(matches!(err, LarderError::InvalidInput(_)));
        assert_eq!(orchestrator.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_ingest_then_recommend() {
        let orchestrator = orchestrator();
        let report = orchestrator
            .ingest_playlist(
                "https://www.youtube.com/playlist?list=PLxyz",
                None,
                orchestrator.default_run_options(),
                CancellationToken::new(),
                None,
            )
            .await
            .unwrap();

        assert_eq!(report.succeeded.len(), 2);
        assert_eq!(orchestrator.count().await.unwrap(), 2);

        let owned = vec!["김치".to_string(), "pork".to_string()];
        let results = orchestrator.recommend(&owned, None).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].recipe.video_id, "stew");
        assert_eq!(results[0].matched, vec!["김치", "돼지고기"]);
    }

    #[tokio::test]
    async fn test_playlist_limit() {
        let orchestrator = orchestrator();
        let report = orchestrator
            .ingest_playlist("PLxyz", Some(1), RunOptions::default(), CancellationToken::new(), None)
            .await
            .unwrap();
        assert_eq!(report.succeeded, vec!["stew"]);
    }
}
