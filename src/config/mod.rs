//! Configuration module for Larder.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{ExtractionPrompts, Prompts};
pub use settings::{
    ExtractionSettings, GeneralSettings, IngestionSettings, LimitSettings, MatchingSettings,
    PromptSettings, RetrySettings, ServiceLimit, Settings, StoreSettings, TranscriptionSettings,
};
