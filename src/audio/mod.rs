//! Audio download via yt-dlp and ffmpeg.

mod downloader;

pub use downloader::{
    classify_ytdlp_failure, download_audio, remove_partial_files, remove_video_files,
};
