//! CLI module for Larder.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};

/// Larder - recipes from cooking videos
///
/// Ingests a YouTube playlist of cooking videos, extracts each dish and its
/// ingredients, and recommends recipes for what is already in your kitchen.
#[derive(Parser, Debug)]
#[command(name = "larder")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Path to the recipe database (overrides store.sqlite_path)
    #[arg(long, global = true, env = "LARDER_DATABASE_PATH")]
    pub db: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ingest cooking videos from a playlist (or individual videos)
    Ingest {
        /// YouTube playlist URL or ID
        #[arg(required_unless_present = "video", conflicts_with = "video")]
        playlist: Option<String>,

        /// Ingest these videos instead of a playlist (URL or ID, repeatable)
        #[arg(long = "video", value_name = "VIDEO")]
        video: Vec<String>,

        /// Reprocess videos that already have a recipe
        #[arg(short, long)]
        force: bool,

        /// Number of videos processed in parallel
        #[arg(short = 'j', long, env = "LARDER_MAX_WORKERS")]
        concurrency: Option<usize>,

        /// Maximum number of playlist videos to ingest (default: all)
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Recommend recipes for the ingredients you have
    Recommend {
        /// Comma separated ingredients, e.g. "김치, 두부, 대파"
        ingredients: String,

        /// Maximum number of recipes (default: every recipe with a match)
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// List stored recipes
    List,

    /// Show recipe store statistics
    Stats,

    /// Check system requirements and configuration
    Doctor,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Write the current configuration to the config file
    Init,

    /// Show configuration file path
    Path,
}
