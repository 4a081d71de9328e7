//! Larder - recipes from cooking videos
//!
//! A local-first CLI tool that turns a YouTube playlist of cooking videos into
//! a searchable recipe collection, and recommends recipes for the ingredients
//! you already have.
//!
//! # Overview
//!
//! Larder allows you to:
//! - Ingest a playlist: download audio, transcribe it, and extract the dish
//!   name and ingredients with a language model
//! - Re-run ingestion safely: videos that already have a recipe are skipped
//! - Rank stored recipes by how many of their ingredients you have
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - `config` - Configuration management
//! - `source` - Playlist resolution and video metadata (YouTube)
//! - `audio` - Audio download and processing
//! - `transcription` - Speech-to-text transcription
//! - `extraction` - Dish name and ingredient extraction
//! - `store` - Recipe persistence
//! - `pipeline` - Concurrent ingestion with retry and rate limiting
//! - `matching` - Ingredient matching and recipe ranking
//! - `orchestrator` - Component wiring and caller-facing entry points
//!
//! # Example
//!
//! ```rust,no_run
//! use larder::config::Settings;
//! use larder::orchestrator::Orchestrator;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let orchestrator = Orchestrator::new(settings)?;
//!
//!     let report = orchestrator
//!         .ingest_playlist(
//!             "https://www.youtube.com/playlist?list=PL...",
//!             None,
//!             orchestrator.default_run_options(),
//!             CancellationToken::new(),
//!             None,
//!         )
//!         .await?;
//!     println!("Stored {} recipes", report.succeeded.len());
//!
//!     let owned = vec!["김치".to_string(), "두부".to_string()];
//!     for result in orchestrator.recommend(&owned, Some(5)).await? {
//!         println!("{} ({:.0}%)", result.recipe.dish_name, result.score * 100.0);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod audio;
pub mod cli;
pub mod config;
pub mod error;
pub mod extraction;
pub mod matching;
pub mod openai;
pub mod orchestrator;
pub mod pipeline;
pub mod source;
pub mod store;
pub mod transcription;

pub use error::{LarderError, Result};
