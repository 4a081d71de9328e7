//! List command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;

/// Run the list command.
pub async fn run_list(settings: Settings) -> Result<()> {
    let store = Orchestrator::open_store(&settings)?;

    match store.all().await {
        Ok(recipes) => {
            if recipes.is_empty() {
                Output::info("No recipes stored yet. Use 'larder ingest <playlist>' to add some.");
            } else {
                Output::header(&format!("Stored Recipes ({})", recipes.len()));
                println!();

                for recipe in &recipes {
                    Output::recipe(recipe);
                }
            }
        }
        Err(e) => {
            Output::error(&format!("Failed to list recipes: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
