//! Error types for Larder.

use thiserror::Error;

/// External collaborator that produced a [`ServiceError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Service {
    /// Video metadata lookup and audio download (yt-dlp).
    Media,
    /// Speech-to-text.
    Transcriber,
    /// Dish name / ingredient extraction.
    Extractor,
}

impl std::fmt::Display for Service {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Service::Media => write!(f, "media"),
            Service::Transcriber => write!(f, "transcriber"),
            Service::Extractor => write!(f, "extractor"),
        }
    }
}

/// Failure reported by an external service adapter.
///
/// Transient failures (network, timeouts, rate limits, 5xx) are retried by the
/// ingestion pipeline. Permanent failures end the job.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    #[error("{service} temporarily unavailable: {message}")]
    Transient { service: Service, message: String },

    #[error("{service} failed: {message}")]
    Permanent { service: Service, message: String },
}

impl ServiceError {
    pub fn transient(service: Service, message: impl Into<String>) -> Self {
        Self::Transient {
            service,
            message: message.into(),
        }
    }

    pub fn permanent(service: Service, message: impl Into<String>) -> Self {
        Self::Permanent {
            service,
            message: message.into(),
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }

    pub fn service(&self) -> Service {
        match self {
            Self::Transient { service, .. } | Self::Permanent { service, .. } => *service,
        }
    }
}

/// Library-level error type for Larder operations.
#[derive(Error, Debug)]
pub enum LarderError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Could not resolve playlist: {0}")]
    Resolution(String),

    #[error("Recipe store failure: {0}")]
    Persistence(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("External tool not found: {0}. Please install it and ensure it's in your PATH.")]
    ToolNotFound(String),
}

impl LarderError {
    /// Whether this error means the recipe store itself is unreliable.
    pub fn is_persistence(&self) -> bool {
        matches!(self, Self::Persistence(_) | Self::Database(_))
    }
}

/// Result type alias for Larder operations.
pub type Result<T> = std::result::Result<T, LarderError>;

/// Result type alias for external service adapters.
pub type ServiceResult<T> = std::result::Result<T, ServiceError>;
