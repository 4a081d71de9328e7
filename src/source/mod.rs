//! Video source abstraction for Larder.
//!
//! Two narrow contracts sit between the ingestion pipeline and the outside
//! world: resolving a playlist into video IDs, and fetching a single video's
//! metadata and audio.

mod youtube;

pub use youtube::{canonical_video_url, YoutubeSource};

use crate::error::{Result, ServiceResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Metadata about a single video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoMetadata {
    /// Stable external video ID.
    pub video_id: String,
    /// Title (may be empty).
    pub title: String,
    /// Description (if available).
    pub description: Option<String>,
    /// Canonical playback link.
    pub url: String,
}

/// Turns a playlist URL into an ordered list of video IDs.
#[async_trait]
pub trait PlaylistResolver: Send + Sync {
    /// Resolve a playlist. Fails with [`crate::LarderError::Resolution`] on an
    /// invalid or inaccessible URL.
    async fn resolve(&self, playlist_url: &str, limit: Option<usize>) -> Result<Vec<String>>;
}

/// Fetches what the pipeline needs to know about one video.
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    /// Look up title, description and canonical URL.
    async fn metadata(&self, video_id: &str) -> ServiceResult<VideoMetadata>;

    /// Download the audio track into `output_dir` and return the file path.
    async fn download_audio(&self, media: &VideoMetadata, output_dir: &Path) -> ServiceResult<PathBuf>;
}
