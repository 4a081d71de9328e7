//! OpenAI client configuration and error classification.

use crate::error::{LarderError, Result, Service, ServiceError};
use async_openai::error::OpenAIError;
use async_openai::{config::OpenAIConfig, Client};
use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};
use std::time::Duration;

/// Default timeout for OpenAI API requests (5 minutes).
const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Create an OpenAI client with configured timeout.
pub fn create_client() -> Result<Client<OpenAIConfig>> {
    create_client_with_timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
}

/// Create an OpenAI client with a custom timeout.
pub fn create_client_with_timeout(timeout: Duration) -> Result<Client<OpenAIConfig>> {
    let http_client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| LarderError::Config(format!("Failed to create HTTP client: {}", e)))?;

    Ok(Client::with_config(OpenAIConfig::default())
        .with_http_client(http_client)
        .with_backoff(no_retry_backoff()))
}

/// Backoff that gives up on the first failure. Rate limits and server errors
/// go back to the caller, whose job retry policy decides what happens next.
fn no_retry_backoff() -> ExponentialBackoff {
    ExponentialBackoffBuilder::new()
        .with_max_elapsed_time(Some(Duration::ZERO))
        .build()
}

/// Check if the OpenAI API key is configured.
pub fn is_api_key_configured() -> bool {
    std::env::var("OPENAI_API_KEY").is_ok_and(|key| !key.is_empty())
}

/// Map an OpenAI client error onto the transient/permanent split.
pub fn classify_error(service: Service, err: OpenAIError) -> ServiceError {
    match err {
        OpenAIError::Reqwest(e) => ServiceError::transient(service, e.to_string()),
        OpenAIError::ApiError(api) => {
            let kind = api.r#type.clone().unwrap_or_default();
            let code = api.code.clone().unwrap_or_default();
            if is_transient_api_error(&kind, &code, &api.message) {
                ServiceError::transient(service, api.message)
            } else {
                ServiceError::permanent(service, api.message)
            }
        }
        // A truncated or garbled body is usually a flaky upstream
        OpenAIError::JSONDeserialize(e) => ServiceError::transient(service, e.to_string()),
        other => ServiceError::permanent(service, other.to_string()),
    }
}

fn is_transient_api_error(kind: &str, code: &str, message: &str) -> bool {
    const TRANSIENT_MARKERS: [&str; 5] = [
        "rate_limit",
        "server_error",
        "overloaded",
        "timeout",
        "service_unavailable",
    ];

    let haystack = format!("{} {} {}", kind, code, message).to_lowercase();
    TRANSIENT_MARKERS.iter().any(|m| haystack.contains(m))
        || haystack.contains("rate limit")
        || haystack.contains("try again")
}
