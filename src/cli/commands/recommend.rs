//! Recommend command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::matching::{parse_ingredient_list, AliasNormalizer, Recommender};
use crate::orchestrator::Orchestrator;
use anyhow::Result;
use std::sync::Arc;

/// Run the recommend command.
pub async fn run_recommend(ingredients: &str, limit: Option<usize>, settings: Settings) -> Result<()> {
    let owned = parse_ingredient_list(ingredients);
    if owned.is_empty() {
        Output::warning("No ingredients given; showing the closest recipes anyway.");
    }

    // Recommendation only needs the store, not the OpenAI clients.
    let store = Orchestrator::open_store(&settings)?;
    let normalizer = Arc::new(AliasNormalizer::new(&settings.matching.aliases));
    let results = Recommender::new(store, normalizer)
        .recommend(&owned, limit)
        .await?;

    if results.is_empty() {
        Output::info("No recipes stored yet. Use 'larder ingest <playlist>' to add some.");
        return Ok(());
    }

    Output::header(&format!("Recipes for: {}", owned.join(", ")));
    for (i, result) in results.iter().enumerate() {
        Output::match_result(i + 1, result);
    }
    println!();

    Ok(())
}
