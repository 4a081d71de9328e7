//! OpenAI Whisper transcription implementation.

use super::Transcriber;
use crate::config::TranscriptionSettings;
use crate::error::{Result, Service, ServiceError, ServiceResult};
use crate::openai::{classify_error, create_client};
use async_openai::types::{AudioInput, AudioResponseFormat, CreateTranscriptionRequestArgs};
use async_trait::async_trait;
use std::path::Path;
use tracing::{debug, instrument};

/// OpenAI Whisper-based transcriber.
pub struct WhisperTranscriber {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
    language: Option<String>,
}

impl WhisperTranscriber {
    /// Create a transcriber from settings.
    pub fn with_config(settings: &TranscriptionSettings) -> Result<Self> {
        Ok(Self {
            client: create_client()?,
            model: settings.model.clone(),
            language: settings.language.clone().filter(|l| !l.is_empty()),
        })
    }
}

#[async_trait]
impl Transcriber for WhisperTranscriber {
    #[instrument(skip(self), fields(audio_path = %audio_path.display()))]
    async fn transcribe(&self, audio_path: &Path) -> ServiceResult<String> {
        let file_bytes = tokio::fs::read(audio_path).await.map_err(|e| {
            ServiceError::permanent(Service::Transcriber, format!("Cannot read audio: {}", e))
        })?;

        if file_bytes.is_empty() {
            return Err(ServiceError::permanent(
                Service::Transcriber,
                "Audio file is empty",
            ));
        }

        let mut request_builder = CreateTranscriptionRequestArgs::default();
        request_builder
            .file(AudioInput::from_vec_u8(
                audio_path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or("audio.mp3")
                    .to_string(),
                file_bytes,
            ))
            .model(&self.model)
            .response_format(AudioResponseFormat::Json);

        if let Some(lang) = &self.language {
            request_builder.language(lang);
        }

        let request = request_builder.build().map_err(|e| {
            ServiceError::permanent(Service::Transcriber, format!("Failed to build request: {}", e))
        })?;

        let response = self
            .client
            .audio()
            .transcribe(request)
            .await
            .map_err(|e| classify_error(Service::Transcriber, e))?;

        let text = response.text.trim().to_string();
        debug!("Transcribed {} chars", text.chars().count());
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_audio_is_permanent() {
        let transcriber = WhisperTranscriber::with_config(&TranscriptionSettings::default()).unwrap();
        let err = transcriber
            .transcribe(Path::new("/nonexistent/larder/audio.mp3"))
            .await
            .unwrap_err();

        assert!(!err.is_transient());
        assert_eq!(err.service(), Service::Transcriber);
    }

    #[test]
    fn test_empty_language_is_dropped() {
        let settings = TranscriptionSettings {
            language: Some(String::new()),
            ..Default::default()
        };
        let transcriber = WhisperTranscriber::with_config(&settings).unwrap();
        assert!(transcriber.language.is_none());
    }
}
