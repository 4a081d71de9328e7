//! Recipe extraction from transcripts.
//!
//! The language model's answer is loosely typed. Adapters coerce it into an
//! [`ExtractionResult`] before it reaches the pipeline, so the pipeline only
//! ever sees either a clean recipe or the raw text it could not make sense of.

mod description;
mod openai;
mod parse;

pub use description::ingredients_from_description;
pub use openai::OpenAIExtractor;
pub use parse::{clean_ingredients, parse_model_output};

use crate::error::ServiceResult;
use crate::source::VideoMetadata;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Dish name and ingredients pulled out of a transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedRecipe {
    pub dish_name: String,
    pub ingredients: Vec<String>,
}

/// Outcome of one extraction call that reached the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionResult {
    /// The answer was coerced into a recipe. `ingredients` may be empty.
    Extracted(ExtractedRecipe),
    /// The answer could not be parsed.
    MalformedOutput { raw_text: String },
}

/// How hard the extractor should insist on a strict answer format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionMode {
    /// First try.
    Standard,
    /// Single follow-up after a malformed answer.
    Reformulated,
}

/// Trait for dish name / ingredient extraction services.
#[async_trait]
pub trait Extractor: Send + Sync {
    async fn extract(
        &self,
        transcript: &str,
        metadata: &VideoMetadata,
        mode: ExtractionMode,
    ) -> ServiceResult<ExtractionResult>;
}
