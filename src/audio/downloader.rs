//! Audio download and processing utilities.
//!
//! Downloads the audio track of a video with yt-dlp and normalizes it to MP3
//! with ffmpeg. Failures are classified so the pipeline knows whether a retry
//! can help.

use crate::error::{Service, ServiceError, ServiceResult};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info, instrument};

/// yt-dlp stderr fragments that mean the media will never become available.
const PERMANENT_MARKERS: [&str; 10] = [
    "video unavailable",
    "private video",
    "has been removed",
    "is not available",
    "members-only",
    "sign in to confirm your age",
    "copyright",
    "does not exist",
    "unsupported url",
    "not a valid url",
];

/// Downloads audio from a URL and saves it as MP3.
///
/// If the file already exists it is returned without re-downloading, so a
/// retried job does not fetch the same audio twice. Downloads and conversions
/// write under a staging name and are renamed into place only once complete,
/// so a killed download never leaves a file that looks cached.
#[instrument(skip(output_dir), fields(video_id = %video_id))]
pub async fn download_audio(url: &str, video_id: &str, output_dir: &Path) -> ServiceResult<PathBuf> {
    std::fs::create_dir_all(output_dir).map_err(|e| {
        ServiceError::permanent(Service::Media, format!("Cannot create {:?}: {e}", output_dir))
    })?;

    let target_path = output_dir.join(format!("{}.mp3", video_id));

    if target_path.exists() {
        info!("Using cached audio file");
        return Ok(target_path);
    }

    remove_partial_files(output_dir, video_id);
    info!("Downloading audio from {}", url);

    let staging = staging_stem(video_id);
    let template = output_dir.join(format!("{}.%(ext)s", staging));

    let result = Command::new("yt-dlp")
        .arg("--extract-audio")
        .arg("--audio-format").arg("mp3")
        .arg("--audio-quality").arg("5")
        .arg("--output").arg(template.to_str().unwrap_or_default())
        .arg("--no-playlist")
        .arg("--quiet")
        .arg("--no-warnings")
        .arg(url)
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await;

    let output = match result {
        Ok(o) => o,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ServiceError::permanent(Service::Media, "yt-dlp is not installed"));
        }
        Err(e) => {
            return Err(ServiceError::transient(
                Service::Media,
                format!("yt-dlp execution failed: {e}"),
            ));
        }
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(classify_ytdlp_failure(&stderr));
    }

    let downloaded = find_audio_file(output_dir, &staging)?;

    if downloaded.extension().is_some_and(|ext| ext == "mp3") {
        promote(&downloaded, &target_path)?;
    } else {
        let converting = output_dir.join(format!("{}.mp3.part", staging));
        normalize_to_mp3(&downloaded, &converting).await?;
        let _ = std::fs::remove_file(&downloaded);
        promote(&converting, &target_path)?;
    }

    Ok(target_path)
}

fn staging_stem(video_id: &str) -> String {
    format!("{}.download", video_id)
}

fn promote(from: &Path, to: &Path) -> ServiceResult<()> {
    std::fs::rename(from, to).map_err(|e| {
        ServiceError::transient(Service::Media, format!("Cannot move {:?} into place: {e}", from))
    })
}

/// Remove leftovers of an interrupted download of `video_id`.
pub fn remove_partial_files(dir: &Path, video_id: &str) {
    let prefix = format!("{}.", staging_stem(video_id));
    remove_matching(dir, |name| name.starts_with(&prefix));
}

/// Remove every temporary file belonging to `video_id`, finished or not.
pub fn remove_video_files(dir: &Path, video_id: &str) {
    let prefix = format!("{}.", video_id);
    remove_matching(dir, |name| name.starts_with(&prefix));
}

fn remove_matching(dir: &Path, matches: impl Fn(&str) -> bool) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        if !matches(&entry.file_name().to_string_lossy()) {
            continue;
        }
        if let Err(e) = std::fs::remove_file(entry.path()) {
            debug!("Could not remove {:?}: {}", entry.path(), e);
        }
    }
}

/// Turn yt-dlp stderr into a transient or permanent media failure.
pub fn classify_ytdlp_failure(stderr: &str) -> ServiceError {
    let lowered = stderr.to_lowercase();
    let message = format!("yt-dlp failed: {}", stderr.trim());

    if PERMANENT_MARKERS.iter().any(|m| lowered.contains(m)) {
        ServiceError::permanent(Service::Media, message)
    } else {
        ServiceError::transient(Service::Media, message)
    }
}

/// Locates a downloaded audio file by video ID.
fn find_audio_file(dir: &Path, video_id: &str) -> ServiceResult<PathBuf> {
    for ext in &["mp3", "opus", "m4a", "webm", "ogg"] {
        let candidate = dir.join(format!("{}.{}", video_id, ext));
        if candidate.exists() {
            return Ok(candidate);
        }
    }

    let entries = std::fs::read_dir(dir).map_err(|e| {
        ServiceError::transient(Service::Media, format!("Cannot read directory: {e}"))
    })?;

    for entry in entries.flatten() {
        let name = entry.file_name();
        if name.to_string_lossy().starts_with(video_id) {
            return Ok(entry.path());
        }
    }

    Err(ServiceError::transient(
        Service::Media,
        "Audio file not found after download",
    ))
}

/// Converts an audio file to MP3 using ffmpeg.
async fn normalize_to_mp3(source: &Path, dest: &Path) -> ServiceResult<()> {
    debug!("Converting {:?} to MP3", source);

    let result = Command::new("ffmpeg")
        .arg("-i").arg(source)
        .arg("-vn")
        .arg("-codec:a").arg("libmp3lame")
        .arg("-qscale:a").arg("5")
        .arg("-y")
        .arg("-loglevel").arg("error")
        .arg("-f").arg("mp3")
        .arg(dest)
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await;

    match result {
        Ok(out) if out.status.success() => Ok(()),
        Ok(out) => {
            let err = String::from_utf8_lossy(&out.stderr);
            Err(ServiceError::permanent(
                Service::Media,
                format!("ffmpeg conversion failed: {err}"),
            ))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(ServiceError::permanent(
            Service::Media,
            "ffmpeg is not installed",
        )),
        Err(e) => Err(ServiceError::transient(Service::Media, format!("ffmpeg error: {e}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_unavailable_video() {
        let err = classify_ytdlp_failure("ERROR: [youtube] abc: Video unavailable");
        assert!(!err.is_transient());
        assert_eq!(err.service(), Service::Media);
    }

    #[test]
    fn test_classify_network_error() {
        let err = classify_ytdlp_failure("ERROR: Unable to download webpage: timed out");
        assert!(err.is_transient());
    }

    #[test]
    fn test_find_audio_file_prefers_known_extensions() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("vid123.m4a"), b"x").unwrap();

        let found = find_audio_file(dir.path(), "vid123").unwrap();
        assert_eq!(found, dir.path().join("vid123.m4a"));
    }

    #[test]
    fn test_find_audio_file_missing() {
        let dir = tempfile::tempdir().unwrap();
        assert!(find_audio_file(dir.path(), "nothing").is_err());
    }

    #[test]
    fn test_partial_files_removed() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("vid123.download.webm"), b"half").unwrap();
        std::fs::write(dir.path().join("vid123.download.mp3.part"), b"half").unwrap();
        std::fs::write(dir.path().join("vid123.mp3"), b"done").unwrap();
        std::fs::write(dir.path().join("other.download.webm"), b"x").unwrap();

        remove_partial_files(dir.path(), "vid123");

        assert!(!dir.path().join("vid123.download.webm").exists());
        assert!(!dir.path().join("vid123.download.mp3.part").exists());
        assert!(dir.path().join("vid123.mp3").exists());
        assert!(dir.path().join("other.download.webm").exists());
    }

    #[test]
    fn test_video_files_removed() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("vid123.mp3"), b"done").unwrap();
        std::fs::write(dir.path().join("vid123.download.webm"), b"half").unwrap();
        std::fs::write(dir.path().join("vid1234.mp3"), b"x").unwrap();

        remove_video_files(dir.path(), "vid123");

        assert!(!dir.path().join("vid123.mp3").exists());
        assert!(!dir.path().join("vid123.download.webm").exists());
        assert!(dir.path().join("vid1234.mp3").exists());
    }

    #[tokio::test]
    async fn test_cached_audio_is_reused() {
        let dir = tempfile::tempdir().unwrap();
        let cached = dir.path().join("cached01.mp3");
        std::fs::write(&cached, b"mp3").unwrap();

        let path = download_audio("https://example.invalid", "cached01", dir.path())
            .await
            .unwrap();
        assert_eq!(path, cached);
    }
}
