//! CLI output formatting utilities.

use crate::matching::MatchResult;
use crate::store::Recipe;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

/// Output helper for CLI formatting.
pub struct Output;

impl Output {
    /// Print an info message.
    pub fn info(msg: &str) {
        println!("{} {}", style(">>").cyan().bold(), msg);
    }

    /// Print a success message.
    pub fn success(msg: &str) {
        println!("{} {}", style(">>").green().bold(), msg);
    }

    /// Print a warning message.
    pub fn warning(msg: &str) {
        eprintln!("{} {}", style(">>").yellow().bold(), msg);
    }

    /// Print an error message.
    pub fn error(msg: &str) {
        eprintln!("{} {}", style(">>").red().bold(), msg);
    }

    /// Print a header.
    pub fn header(msg: &str) {
        println!("\n{}", style(msg).bold().underlined());
    }

    /// Print a key-value pair.
    pub fn kv(key: &str, value: &str) {
        println!("  {}: {}", style(key).dim(), value);
    }

    /// Print a list item.
    pub fn list_item(msg: &str) {
        println!("  {} {}", style("*").cyan(), msg);
    }

    /// Print one stored recipe.
    pub fn recipe(recipe: &Recipe) {
        println!(
            "  {} {} ({}, {} ingredients)",
            style("*").cyan(),
            style(display_name(recipe)).bold(),
            style(&recipe.video_id).dim(),
            recipe.ingredients.len()
        );
        if !recipe.ingredients.is_empty() {
            println!("    {}", preview(&recipe.ingredients.join(", "), 120));
        }
    }

    /// Print one recommendation.
    pub fn match_result(rank: usize, result: &MatchResult) {
        println!(
            "\n{} {} {} (score: {:.2}, {}/{})",
            style(format!("{}.", rank)).green(),
            style(display_name(&result.recipe)).bold(),
            style(&result.recipe.video_id).dim(),
            result.score,
            result.matched_count,
            result.total_ingredients
        );
        if !result.matched.is_empty() {
            println!("   {} {}", style("have:").green(), result.matched.join(", "));
        }
        if !result.missing.is_empty() {
            println!("   {} {}", style("need:").yellow(), result.missing.join(", "));
        }
        println!("   {}", style(&result.recipe.url).dim());
    }

    /// Create a progress bar.
    pub fn progress_bar(len: u64, msg: &str) -> ProgressBar {
        let pb = ProgressBar::new(len);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap()
                .progress_chars("#>-"),
        );
        pb.set_message(msg.to_string());
        pb
    }

    /// Create a spinner.
    pub fn spinner(msg: &str) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap(),
        );
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        pb
    }
}

/// Dish name, or the video title when extraction found none.
fn display_name(recipe: &Recipe) -> &str {
    if recipe.dish_name.trim().is_empty() {
        &recipe.title
    } else {
        &recipe.dish_name
    }
}

/// Truncate text to `max_chars` characters with an ellipsis.
fn preview(text: &str, max_chars: usize) -> String {
    let text = text.replace('\n', " ");
    if text.chars().count() <= max_chars {
        text
    } else {
        let cut: String = text.chars().take(max_chars).collect();
        format!("{}...", cut)
    }
}
