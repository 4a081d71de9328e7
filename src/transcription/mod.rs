//! Transcription module for Larder.
//!
//! Turns a downloaded audio file into plain transcript text.

mod whisper;

pub use whisper::WhisperTranscriber;

use crate::error::ServiceResult;
use async_trait::async_trait;
use std::path::Path;

/// Trait for speech-to-text services.
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe an audio file into text.
    async fn transcribe(&self, audio_path: &Path) -> ServiceResult<String>;
}
