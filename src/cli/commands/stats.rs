//! Stats command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;

/// Run the stats command.
pub async fn run_stats(settings: Settings) -> Result<()> {
    let store = Orchestrator::open_store(&settings)?;
    let recipes = store.all().await?;

    let with_ingredients = recipes.iter().filter(|r| !r.ingredients.is_empty()).count();
    let total_ingredients: usize = recipes.iter().map(|r| r.ingredients.len()).sum();

    Output::header("Recipe Store");
    Output::kv("Database", &settings.sqlite_path().display().to_string());
    Output::kv("Total recipes", &store.count().await?.to_string());
    Output::kv("With ingredients", &with_ingredients.to_string());
    if let Some(newest) = recipes.first() {
        Output::kv(
            "Last ingested",
            &newest.created_at.format("%Y-%m-%d %H:%M UTC").to_string(),
        );
    }
    if with_ingredients > 0 {
        Output::kv(
            "Avg ingredients",
            &format!("{:.1}", total_ingredients as f64 / with_ingredients as f64),
        );
    }

    Ok(())
}
