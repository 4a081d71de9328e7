//! Configuration settings for Larder.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub ingestion: IngestionSettings,
    pub limits: LimitSettings,
    pub transcription: TranscriptionSettings,
    pub extraction: ExtractionSettings,
    pub store: StoreSettings,
    pub matching: MatchingSettings,
    pub prompts: PromptSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory for storing application data.
    pub data_dir: String,
    /// Directory for temporary audio files.
    pub temp_dir: String,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            data_dir: "~/.larder".to_string(),
            temp_dir: "/tmp/larder".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Retry schedule for transient external failures.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    /// Maximum attempts per job, including the first.
    pub max_attempts: u32,
    /// Delay before the second attempt.
    pub initial_delay_ms: u64,
    /// Upper bound on any single delay.
    pub max_delay_ms: u64,
    /// Delay multiplier per attempt.
    pub backoff_multiplier: f64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 1000,
            max_delay_ms: 30_000,
            backoff_multiplier: 2.0,
        }
    }
}

/// Ingestion pipeline settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestionSettings {
    /// Number of videos processed in parallel.
    pub concurrency: usize,
    /// Retry schedule.
    pub retry: RetrySettings,
    /// How long in-flight jobs may keep running after cancellation.
    pub grace_period_seconds: u64,
    /// Fall back to the video description when audio processing fails.
    pub description_fallback: bool,
}

impl Default for IngestionSettings {
    fn default() -> Self {
        Self {
            concurrency: 1,
            retry: RetrySettings::default(),
            grace_period_seconds: 30,
            description_fallback: false,
        }
    }
}

/// Throttle for one external service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceLimit {
    /// Maximum calls in flight at once.
    pub max_concurrent: usize,
    /// Minimum spacing between call starts (0 disables).
    pub min_interval_ms: u64,
}

impl Default for ServiceLimit {
    fn default() -> Self {
        Self {
            max_concurrent: 2,
            min_interval_ms: 0,
        }
    }
}

/// Per-service rate limits, independent of ingestion concurrency.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct LimitSettings {
    pub transcriber: ServiceLimit,
    pub extractor: ServiceLimit,
}

/// Speech-to-text settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptionSettings {
    /// Whisper model to use.
    pub model: String,
    /// Spoken language hint (ISO-639-1).
    pub language: Option<String>,
}

impl Default for TranscriptionSettings {
    fn default() -> Self {
        Self {
            model: "whisper-1".to_string(),
            language: Some("ko".to_string()),
        }
    }
}

/// Recipe extraction settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionSettings {
    /// Chat model used to pull the dish name and ingredients out of a transcript.
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Transcripts are cut to this many characters before being sent.
    pub max_transcript_chars: usize,
}

impl Default for ExtractionSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            temperature: 0.1,
            max_tokens: 300,
            max_transcript_chars: 1500,
        }
    }
}

/// Recipe store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    /// Path to the SQLite database.
    pub sqlite_path: String,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            sqlite_path: "~/.larder/recipes.db".to_string(),
        }
    }
}

/// Ingredient matching settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct MatchingSettings {
    /// Term rewrites applied after normalization (e.g. "scallion" = "대파").
    pub aliases: HashMap<String, String>,
}

/// Prompt customization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct PromptSettings {
    /// Directory for custom prompts (overrides defaults).
    pub custom_dir: Option<String>,
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::LarderError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("larder")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded data directory path.
    pub fn data_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.data_dir)
    }

    /// Get the expanded temp directory path.
    pub fn temp_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.temp_dir)
    }

    /// Get the expanded SQLite database path.
    pub fn sqlite_path(&self) -> PathBuf {
        Self::expand_path(&self.store.sqlite_path)
    }

    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> crate::error::Result<()> {
        use crate::error::LarderError;

        if self.ingestion.concurrency == 0 {
            return Err(LarderError::Config(
                "ingestion.concurrency must be at least 1".to_string(),
            ));
        }
        if self.ingestion.retry.max_attempts == 0 {
            return Err(LarderError::Config(
                "ingestion.retry.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.limits.transcriber.max_concurrent == 0 || self.limits.extractor.max_concurrent == 0 {
            return Err(LarderError::Config(
                "limits.*.max_concurrent must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.ingestion.concurrency, 1);
        assert_eq!(settings.ingestion.retry.max_attempts, 3);
        assert_eq!(settings.extraction.max_transcript_chars, 1500);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_partial_toml() {
        let toml_str = r#"
[ingestion]
concurrency = 4

[limits.transcriber]
max_concurrent = 1
min_interval_ms = 500

[matching.aliases]
"scallion" = "대파"
"#;
        let settings: Settings = toml::from_str(toml_str).unwrap();
        assert_eq!(settings.ingestion.concurrency, 4);
        assert_eq!(settings.ingestion.retry.max_attempts, 3);
        assert_eq!(settings.limits.transcriber.min_interval_ms, 500);
        assert_eq!(settings.limits.extractor.max_concurrent, 2);
        assert_eq!(settings.matching.aliases.get("scallion").map(String::as_str), Some("대파"));
    }

    #[test]
    fn test_validate_rejects_zero_concurrency() {
        let mut settings = Settings::default();
        settings.ingestion.concurrency = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut settings = Settings::default();
        settings.ingestion.concurrency = 3;
        settings.save_to(&path).unwrap();

        let loaded = Settings::load_from(Some(&path)).unwrap();
        assert_eq!(loaded.ingestion.concurrency, 3);
    }
}
