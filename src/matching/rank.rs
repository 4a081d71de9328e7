//! Scoring and ranking recipes against the ingredients a user has.

use super::normalize::{ingredients_match, IngredientNormalizer};
use crate::error::{LarderError, Result};
use crate::store::{Recipe, RecipeStore};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, instrument};

/// How well one recipe fits the owned ingredients.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchResult {
    pub recipe: Recipe,
    /// Recipe ingredients covered by at least one owned ingredient.
    pub matched_count: usize,
    /// Distinct non-empty ingredients in the recipe after normalization.
    pub total_ingredients: usize,
    /// `matched_count / total_ingredients`, or 0 for a recipe with none.
    pub score: f64,
    /// Covered ingredients, as written in the recipe.
    pub matched: Vec<String>,
    /// Ingredients still needed, as written in the recipe.
    pub missing: Vec<String>,
}

/// Normalize a list, dropping empties and later duplicates.
///
/// Returns `(normalized, original)` pairs in first-seen order.
fn normalized_set<'a>(
    items: impl IntoIterator<Item = &'a str>,
    normalizer: &dyn IngredientNormalizer,
) -> Vec<(String, &'a str)> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter_map(|raw| {
            let norm = normalizer.normalize(raw);
            (!norm.is_empty() && seen.insert(norm.clone())).then_some((norm, raw.trim()))
        })
        .collect()
}

/// Score one recipe against already normalized owned ingredients.
pub fn score_recipe(
    recipe: &Recipe,
    owned: &[String],
    normalizer: &dyn IngredientNormalizer,
) -> MatchResult {
    let needed = normalized_set(recipe.ingredients.iter().map(String::as_str), normalizer);

    let (matched, missing): (Vec<_>, Vec<_>) = needed
        .iter()
        .partition(|(norm, _)| owned.iter().any(|o| ingredients_match(o, norm)));

    let total = needed.len();
    let matched_count = matched.len();
    let score = if total == 0 {
        0.0
    } else {
        matched_count as f64 / total as f64
    };

    MatchResult {
        recipe: recipe.clone(),
        matched_count,
        total_ingredients: total,
        score,
        matched: matched.into_iter().map(|(_, raw)| raw.to_string()).collect(),
        missing: missing.into_iter().map(|(_, raw)| raw.to_string()).collect(),
    }
}

/// Total order used for recommendations.
///
/// Recipes with ingredients first, then higher score, then more matches, then
/// newer, then video ID so equal inputs always rank the same way.
fn compare(a: &MatchResult, b: &MatchResult) -> Ordering {
    (b.total_ingredients > 0)
        .cmp(&(a.total_ingredients > 0))
        .then_with(|| b.score.total_cmp(&a.score))
        .then_with(|| b.matched_count.cmp(&a.matched_count))
        .then_with(|| b.recipe.created_at.cmp(&a.recipe.created_at))
        .then_with(|| a.recipe.video_id.cmp(&b.recipe.video_id))
}

/// Rank `recipes` for the `owned` ingredients.
///
/// With a `limit`, the top `limit` results are returned whatever their score.
/// Without one, only recipes with a positive score are returned, unless none
/// has one, in which case the full ranking is returned so the caller still
/// has something to show.
pub fn rank_recipes(
    recipes: &[Recipe],
    owned: &[String],
    limit: Option<usize>,
    normalizer: &dyn IngredientNormalizer,
) -> Vec<MatchResult> {
    let owned: Vec<String> = normalized_set(owned.iter().map(String::as_str), normalizer)
        .into_iter()
        .map(|(norm, _)| norm)
        .collect();

    let mut ranked: Vec<MatchResult> = recipes
        .iter()
        .map(|r| score_recipe(r, &owned, normalizer))
        .collect();
    ranked.sort_by(compare);

    match limit {
        Some(n) => {
            ranked.truncate(n);
            ranked
        }
        None if ranked.iter().any(|m| m.score > 0.0) => {
            ranked.retain(|m| m.score > 0.0);
            ranked
        }
        None => ranked,
    }
}

/// Ranks stored recipes for a set of owned ingredients.
///
/// Read-only; safe to call while an ingestion run is writing.
pub struct Recommender {
    store: Arc<dyn RecipeStore>,
    normalizer: Arc<dyn IngredientNormalizer>,
}

impl Recommender {
    pub fn new(store: Arc<dyn RecipeStore>, normalizer: Arc<dyn IngredientNormalizer>) -> Self {
        Self { store, normalizer }
    }

    /// Recommend recipes for `owned`. `limit` must be at least 1 when given.
    #[instrument(skip(self, owned), fields(owned = owned.len()))]
    pub async fn recommend(&self, owned: &[String], limit: Option<usize>) -> Result<Vec<MatchResult>> {
        if limit == Some(0) {
            return Err(LarderError::InvalidInput(
                "limit must be a positive integer".to_string(),
            ));
        }

        let recipes = self.store.all().await?;
        let ranked = rank_recipes(&recipes, owned, limit, self.normalizer.as_ref());

        debug!("Ranked {} of {} recipes", ranked.len(), recipes.len());
        Ok(ranked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::{AliasNormalizer, BasicNormalizer};
    use crate::store::MemoryRecipeStore;
    use chrono::{Duration, TimeZone, Utc};

    fn recipe(video_id: &str, ingredients: &[&str], day: i64) -> Recipe {
        Recipe {
            video_id: video_id.to_string(),
            title: format!("{} title", video_id),
            description: None,
            dish_name: video_id.to_string(),
            ingredients: ingredients.iter().map(|s| s.to_string()).collect(),
            url: format!("https://www.youtube.com/watch?v={}", video_id),
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::days(day),
        }
    }

    fn owned(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn ids(results: &[MatchResult]) -> Vec<&str> {
        results.iter().map(|m| m.recipe.video_id.as_str()).collect()
    }

    #[test]
    fn test_score_with_containment() {
        let r = recipe("a", &["김치", "돼지고기", "두부", "대파"], 0);
        let owned = owned(&["김치", "고기"]);
        let result = score_recipe(&r, &owned, &BasicNormalizer);

        assert_eq!(result.matched_count, 2);
        assert_eq!(result.total_ingredients, 4);
        assert!((result.score - 0.5).abs() < f64::EPSILON);
        assert_eq!(result.matched, vec!["김치", "돼지고기"]);
        assert_eq!(result.missing, vec!["두부", "대파"]);
    }

    #[test]
    fn test_duplicate_recipe_ingredients_count_once() {
        let r = recipe("a", &["김치", " 김치 ", "", "두부"], 0);
        let result = score_recipe(&r, &owned(&["김치"]), &BasicNormalizer);

        assert_eq!(result.total_ingredients, 2);
        assert_eq!(result.matched_count, 1);
    }

    #[test]
    fn test_empty_recipe_scores_zero_and_ranks_last() {
        let results = rank_recipes(
            &[recipe("empty", &[], 10), recipe("miss", &["두부"], 0)],
            &owned(&["김치"]),
            Some(10),
            &BasicNormalizer,
        );

        assert_eq!(ids(&results), vec!["miss", "empty"]);
        assert_eq!(results[1].score, 0.0);
    }

    #[test]
    fn test_ranking_order_and_ties() {
        let recipes = vec![
            recipe("half", &["김치", "두부"], 0),
            recipe("full", &["김치"], 0),
            recipe("half_more", &["김치", "두부", "계란", "파"], 0),
            recipe("half_newer", &["김치", "두부"], 5),
        ];
        let owned = owned(&["김치", "계란"]);
        let results = rank_recipes(&recipes, &owned, None, &BasicNormalizer);

        assert_eq!(ids(&results), vec!["full", "half_more", "half_newer", "half"]);
    }

    #[test]
    fn test_no_limit_drops_zero_scores() {
        let recipes = vec![recipe("hit", &["김치"], 0), recipe("miss", &["두부"], 0)];
        let results = rank_recipes(&recipes, &owned(&["김치"]), None, &BasicNormalizer);
        assert_eq!(ids(&results), vec!["hit"]);
    }

    #[test]
    fn test_no_limit_all_zero_returns_everything() {
        let recipes = vec![recipe("a", &["두부"], 0), recipe("b", &["계란"], 1)];
        let results = rank_recipes(&recipes, &owned(&["김치"]), None, &BasicNormalizer);
        assert_eq!(ids(&results), vec!["b", "a"]);
    }

    #[test]
    fn test_limit_includes_zero_scores() {
        let recipes = vec![recipe("hit", &["김치"], 0), recipe("miss", &["두부"], 0)];
        let results = rank_recipes(&recipes, &owned(&["김치"]), Some(2), &BasicNormalizer);
        assert_eq!(ids(&results), vec!["hit", "miss"]);
    }

    #[test]
    fn test_owned_empty_strings_ignored() {
        let recipes = vec![recipe("a", &["두부"], 0)];
        let results = rank_recipes(&recipes, &owned(&["", "  "]), Some(1), &BasicNormalizer);
        assert_eq!(results[0].matched_count, 0);
    }

    #[test]
    fn test_adding_owned_never_lowers_score() {
        let recipes = vec![
            recipe("a", &["김치", "돼지고기", "두부"], 0),
            recipe("b", &["계란", "우유"], 0),
        ];
        let before = rank_recipes(&recipes, &owned(&["김치"]), Some(2), &BasicNormalizer);
        let after = rank_recipes(&recipes, &owned(&["김치", "우유"]), Some(2), &BasicNormalizer);

        for b in &before {
            let a = after
                .iter()
                .find(|m| m.recipe.video_id == b.recipe.video_id)
                .unwrap();
            assert!(a.score >= b.score);
        }
    }

    #[test]
    fn test_ranking_is_deterministic() {
        let recipes: Vec<Recipe> = (0..6)
            .map(|i| recipe(&format!("v{}", i), &["김치", "두부"], 0))
            .collect();
        let mut reversed = recipes.clone();
        reversed.reverse();

        let a = rank_recipes(&recipes, &owned(&["김치"]), None, &BasicNormalizer);
        let b = rank_recipes(&reversed, &owned(&["김치"]), None, &BasicNormalizer);
        assert_eq!(ids(&a), ids(&b));
        assert_eq!(ids(&a), vec!["v0", "v1", "v2", "v3", "v4", "v5"]);
    }

    #[test]
    fn test_aliases_apply_to_both_sides() {
        let normalizer = AliasNormalizer::new([("scallion", "대파")]);
        let recipes = vec![recipe("a", &["대파", "두부"], 0)];
        let results = rank_recipes(&recipes, &owned(&["Scallion"]), None, &normalizer);
        assert_eq!(results[0].matched, vec!["대파"]);
    }

    #[tokio::test]
    async fn test_recommender_rejects_zero_limit() {
        let recommender = Recommender::new(
            Arc::new(MemoryRecipeStore::new()),
            Arc::new(BasicNormalizer),
        );
        let err = recommender.recommend(&owned(&["김치"]), Some(0)).await.unwrap_err();
        assert!(matches!(err, LarderError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_recommender_empty_store() {
        let recommender = Recommender::new(
            Arc::new(MemoryRecipeStore::new()),
            Arc::new(BasicNormalizer),
        );
        assert!(recommender.recommend(&owned(&["김치"]), None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_recommender_reads_store() {
        let store = MemoryRecipeStore::with_recipes([
            recipe("stew", &["김치", "돼지고기", "두부", "대파"], 0),
            recipe("roll", &["계란", "파"], 1),
        ]);
        let recommender = Recommender::new(Arc::new(store), Arc::new(BasicNormalizer));

        let results = recommender
            .recommend(&owned(&["김치", "고기"]), Some(1))
            .await
            .unwrap();
        assert_eq!(ids(&results), vec!["stew"]);
        assert_eq!(results[0].matched_count, 2);
    }
}
