//! Ingest command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use crate::pipeline::RunReport;
use crate::source::YoutubeSource;
use anyhow::Result;
use tokio_util::sync::CancellationToken;

/// What to ingest.
#[derive(Debug)]
pub enum IngestSource<'a> {
    Playlist(&'a str),
    Videos(&'a [String]),
}

/// Run the ingest command.
pub async fn run_ingest(
    source: IngestSource<'_>,
    force: bool,
    concurrency: Option<usize>,
    limit: Option<usize>,
    settings: Settings,
) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Ingest) {
        Output::error(&format!("{}", e));
        Output::info("Run 'larder doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let orchestrator = Orchestrator::new(settings)?;
    let mut options = orchestrator.default_run_options();
    options.force = force;
    if let Some(concurrency) = concurrency {
        options.concurrency = concurrency;
    }

    let video_ids = match source {
        IngestSource::Playlist(url) => {
            Output::info(&format!("Fetching playlist: {}", url));
            let spinner = Output::spinner("Fetching video list...");
            let ids = orchestrator.resolve_playlist(url, limit).await;
            spinner.finish_and_clear();
            ids?
        }
        IngestSource::Videos(inputs) => video_ids_from_inputs(inputs)?,
    };

    if video_ids.is_empty() {
        Output::warning("No videos found");
        return Ok(());
    }
    Output::info(&format!(
        "Found {} videos, processing with {} workers",
        video_ids.len(),
        options.concurrency
    ));

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            Output::warning("Cancelling: finishing videos in progress...");
            ctrl_c.cancel();
        }
    });

    let progress = Output::progress_bar(video_ids.len() as u64, "videos");
    let report = orchestrator
        .ingest_videos(&video_ids, options, cancel, Some(progress.clone()))
        .await;
    progress.finish_and_clear();

    let report = report?;
    print_report(&report, force);
    Ok(())
}

/// Accept video URLs as well as bare IDs.
fn video_ids_from_inputs(inputs: &[String]) -> Result<Vec<String>> {
    let youtube = YoutubeSource::new();
    inputs
        .iter()
        .map(|input| {
            youtube
                .extract_video_id(input)
                .ok_or_else(|| anyhow::anyhow!("Not a YouTube video: {}", input))
        })
        .collect()
}

fn print_report(report: &RunReport, force: bool) {
    println!();
    for video_id in &report.succeeded {
        Output::success(&format!("Stored {}", video_id));
    }
    for failure in &report.failed {
        Output::error(&format!("Failed {}: {}", failure.video_id, failure.reason));
    }
    if !report.cancelled.is_empty() {
        Output::warning(&format!(
            "Cancelled before start: {}",
            report.cancelled.join(", ")
        ));
    }
    if !report.skipped.is_empty() && !force {
        Output::info(&format!(
            "{} already stored. Use --force to reprocess.",
            report.skipped.len()
        ));
    }

    println!();
    Output::info(&format!(
        "Run {}: {} stored, {} skipped, {} failed, {} cancelled",
        report.run_id,
        report.succeeded.len(),
        report.skipped.len(),
        report.failed.len(),
        report.cancelled.len()
    ));
}
