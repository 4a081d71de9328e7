//! Larder CLI entry point.

use anyhow::Result;
use clap::Parser;
use larder::cli::commands::{self, IngestSource};
use larder::cli::{Cli, Commands};
use larder::config::Settings;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("larder={}", log_level)),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    // Load configuration
    let mut settings = match &cli.config {
        Some(path) => Settings::load_from(Some(&std::path::PathBuf::from(path)))?,
        None => Settings::load()?,
    };
    if let Some(db) = &cli.db {
        settings.store.sqlite_path = db.clone();
    }

    // Ensure data directories exist
    std::fs::create_dir_all(settings.data_dir())?;
    std::fs::create_dir_all(settings.temp_dir())?;

    // Execute command
    match &cli.command {
        Commands::Ingest {
            playlist,
            video,
            force,
            concurrency,
            limit,
        } => {
            let source = match playlist {
                Some(url) => IngestSource::Playlist(url),
                None => IngestSource::Videos(video),
            };
            commands::run_ingest(source, *force, *concurrency, *limit, settings).await?;
        }

        Commands::Recommend { ingredients, limit } => {
            commands::run_recommend(ingredients, *limit, settings).await?;
        }

        Commands::List => {
            commands::run_list(settings).await?;
        }

        Commands::Stats => {
            commands::run_stats(settings).await?;
        }

        Commands::Doctor => {
            commands::run_doctor(&settings).await?;
        }

        Commands::Config { action } => {
            commands::run_config(action, settings, cli.config.as_deref())?;
        }
    }

    Ok(())
}
