//! YouTube source implementation backed by yt-dlp.

use super::{MediaFetcher, PlaylistResolver, VideoMetadata};
use crate::audio::{classify_ytdlp_failure, download_audio};
use crate::error::{LarderError, Result, Service, ServiceError, ServiceResult};
use async_trait::async_trait;
use regex::Regex;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};

/// Build the canonical playback link for a video ID.
pub fn canonical_video_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={}", video_id)
}

/// YouTube playlists and videos via yt-dlp.
pub struct YoutubeSource {
    video_id_regex: Regex,
    playlist_id_regex: Regex,
}

impl YoutubeSource {
    pub fn new() -> Self {
        // Matches various YouTube URL formats and bare video IDs
        let video_id_regex = Regex::new(
            r"(?x)
            (?:
                (?:https?://)?
                (?:www\.|m\.)?
                (?:youtube\.com/watch\?v=|youtu\.be/|youtube\.com/embed/|youtube\.com/shorts/)
                ([a-zA-Z0-9_-]{11})
            )
            |
            ^([a-zA-Z0-9_-]{11})$
        ",
        )
        .expect("Invalid regex");

        let playlist_id_regex = Regex::new(r"^[a-zA-Z0-9_-]{12,}$").expect("Invalid regex");

        Self {
            video_id_regex,
            playlist_id_regex,
        }
    }

    /// Extract video ID from a YouTube URL or bare ID.
    pub fn extract_video_id(&self, input: &str) -> Option<String> {
        let caps = self.video_id_regex.captures(input.trim())?;

        caps.get(1)
            .or_else(|| caps.get(2))
            .map(|m| m.as_str().to_string())
    }

    /// Extract the playlist ID from a playlist URL (`list=` parameter) or a bare ID.
    pub fn extract_playlist_id(&self, input: &str) -> Option<String> {
        let input = input.trim();

        if let Ok(parsed) = url::Url::parse(input) {
            return parsed
                .query_pairs()
                .find(|(key, _)| key == "list")
                .map(|(_, value)| value.into_owned())
                .filter(|id| self.playlist_id_regex.is_match(id));
        }

        self.playlist_id_regex
            .is_match(input)
            .then(|| input.to_string())
    }

    /// Fetch metadata using yt-dlp.
    async fn fetch_metadata_ytdlp(&self, video_id: &str) -> ServiceResult<VideoMetadata> {
        let url = canonical_video_url(video_id);

        let output = tokio::process::Command::new("yt-dlp")
            .args(["--dump-json", "--no-download", "--no-warnings", &url])
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    ServiceError::permanent(Service::Media, "yt-dlp is not installed")
                } else {
                    ServiceError::transient(Service::Media, format!("Failed to run yt-dlp: {}", e))
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(classify_ytdlp_failure(&stderr));
        }

        let json_str = String::from_utf8_lossy(&output.stdout);
        parse_video_json(video_id, &json_str)
    }
}

impl Default for YoutubeSource {
    fn default() -> Self {
        Self::new()
    }
}

/// Build metadata from a yt-dlp `--dump-json` document.
fn parse_video_json(video_id: &str, json_str: &str) -> ServiceResult<VideoMetadata> {
    let json: serde_json::Value = serde_json::from_str(json_str).map_err(|e| {
        ServiceError::permanent(Service::Media, format!("Failed to parse yt-dlp output: {}", e))
    })?;

    if !json.is_object() {
        return Err(ServiceError::permanent(
            Service::Media,
            format!("No metadata for video {}", video_id),
        ));
    }

    Ok(VideoMetadata {
        video_id: video_id.to_string(),
        title: json["title"].as_str().unwrap_or_default().to_string(),
        description: json["description"]
            .as_str()
            .filter(|s| !s.trim().is_empty())
            .map(|s| s.to_string()),
        url: canonical_video_url(video_id),
    })
}

#[async_trait]
impl PlaylistResolver for YoutubeSource {
    #[instrument(skip(self))]
    async fn resolve(&self, playlist_url: &str, limit: Option<usize>) -> Result<Vec<String>> {
        let playlist_id = self.extract_playlist_id(playlist_url).ok_or_else(|| {
            LarderError::Resolution(format!("Not a YouTube playlist: {}", playlist_url))
        })?;
        let list_url = format!("https://www.youtube.com/playlist?list={}", playlist_id);

        let mut cmd = tokio::process::Command::new("yt-dlp");
        cmd.args(["--dump-json", "--no-download", "--no-warnings", "--flat-playlist"]);
        if let Some(limit) = limit {
            cmd.arg("--playlist-end").arg(limit.to_string());
        }
        cmd.arg(&list_url).kill_on_drop(true);

        let output = cmd.output().await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                LarderError::ToolNotFound("yt-dlp".to_string())
            } else {
                LarderError::Resolution(format!("Failed to run yt-dlp: {}", e))
            }
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(LarderError::Resolution(format!(
                "Failed to list playlist {}: {}",
                playlist_id,
                stderr.trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let ids = self.parse_flat_playlist(&stdout);

        info!("Playlist {} has {} videos", playlist_id, ids.len());
        Ok(ids)
    }
}

impl YoutubeSource {
    /// Pull video IDs out of `--flat-playlist --dump-json` output (one JSON document per line).
    fn parse_flat_playlist(&self, stdout: &str) -> Vec<String> {
        stdout
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| serde_json::from_str::<serde_json::Value>(line).ok())
            .filter_map(|json| {
                json["id"]
                    .as_str()
                    .or_else(|| json["url"].as_str())
                    .map(|s| self.extract_video_id(s).unwrap_or_else(|| s.to_string()))
            })
            .collect()
    }
}

#[async_trait]
impl MediaFetcher for YoutubeSource {
    async fn metadata(&self, video_id: &str) -> ServiceResult<VideoMetadata> {
        let id = self.extract_video_id(video_id).ok_or_else(|| {
            ServiceError::permanent(Service::Media, format!("Invalid YouTube video ID: {}", video_id))
        })?;

        debug!("Fetching metadata for {}", id);
        self.fetch_metadata_ytdlp(&id).await
    }

    async fn download_audio(&self, media: &VideoMetadata, output_dir: &Path) -> ServiceResult<PathBuf> {
        download_audio(&media.url, &media.video_id, output_dir).await
    }
}
