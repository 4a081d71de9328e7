//! Chat-completion based recipe extraction.

use super::{parse_model_output, ExtractionMode, ExtractionResult, Extractor};
use crate::config::{ExtractionPrompts, ExtractionSettings};
use crate::error::{Result, Service, ServiceError, ServiceResult};
use crate::openai::{classify_error, create_client};
use crate::source::VideoMetadata;
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs, ResponseFormat,
};
use async_trait::async_trait;
use std::collections::HashMap;
use tracing::{debug, instrument, warn};

/// Extracts dish name and ingredients with an OpenAI chat model.
pub struct OpenAIExtractor {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    settings: ExtractionSettings,
    prompts: ExtractionPrompts,
}

impl OpenAIExtractor {
    pub fn with_config(settings: &ExtractionSettings, prompts: &ExtractionPrompts) -> Result<Self> {
        Ok(Self {
            client: create_client()?,
            settings: settings.clone(),
            prompts: prompts.clone(),
        })
    }

    fn build_messages(
        &self,
        transcript: &str,
        metadata: &VideoMetadata,
        mode: ExtractionMode,
    ) -> ServiceResult<Vec<ChatCompletionRequestMessage>> {
        let mut vars = HashMap::new();
        vars.insert("title".to_string(), metadata.title.clone());
        vars.insert(
            "transcript".to_string(),
            truncate_chars(transcript, self.settings.max_transcript_chars).to_string(),
        );

        let template = match mode {
            ExtractionMode::Standard => &self.prompts.user,
            ExtractionMode::Reformulated => &self.prompts.reformulate,
        };
        let user_prompt = crate::config::Prompts::render(template, &vars);

        let build_err = |e: async_openai::error::OpenAIError| {
            ServiceError::permanent(Service::Extractor, e.to_string())
        };

        Ok(vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(self.prompts.system.clone())
                .build()
                .map_err(build_err)?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(user_prompt)
                .build()
                .map_err(build_err)?
                .into(),
        ])
    }
}

/// Cut `text` to at most `max_chars` characters on a char boundary.
fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[async_trait]
impl Extractor for OpenAIExtractor {
    #[instrument(skip(self, transcript, metadata), fields(video_id = %metadata.video_id))]
    async fn extract(
        &self,
        transcript: &str,
        metadata: &VideoMetadata,
        mode: ExtractionMode,
    ) -> ServiceResult<ExtractionResult> {
        let messages = self.build_messages(transcript, metadata, mode)?;

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.settings.model)
            .messages(messages)
            .temperature(self.settings.temperature)
            .max_completion_tokens(self.settings.max_tokens)
            .response_format(ResponseFormat::JsonObject)
            .build()
            .map_err(|e| ServiceError::permanent(Service::Extractor, e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| classify_error(Service::Extractor, e))?;

        let content = response
            .choices
            .first()
            .and_then(|c| c.message.content.as_ref())
            .map(|c| c.trim().to_string())
            .unwrap_or_default();

        let result = parse_model_output(&content, &metadata.title);
        match &result {
            ExtractionResult::Extracted(recipe) => {
                debug!("Extracted '{}' with {} ingredients", recipe.dish_name, recipe.ingredients.len())
            }
            ExtractionResult::MalformedOutput { raw_text } => {
                let preview: String = raw_text.chars().take(200).collect();
                warn!("Unparsable extraction output ({:?}): {}", mode, preview);
            }
        }
        Ok(result)
    }
}
