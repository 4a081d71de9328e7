//! In-memory recipe store implementation.
//!
//! Useful for testing and dry runs.

use super::{Recipe, RecipeStore, UpsertOutcome, WriteMode};
use crate::error::{LarderError, Result};
use async_trait::async_trait;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::RwLock;

/// In-memory recipe store.
pub struct MemoryRecipeStore {
    recipes: RwLock<HashMap<String, Recipe>>,
}

impl MemoryRecipeStore {
    /// Create an empty in-memory store.
    pub fn new() -> Self {
        Self {
            recipes: RwLock::new(HashMap::new()),
        }
    }

    /// Create a store pre-populated with recipes.
    pub fn with_recipes(recipes: impl IntoIterator<Item = Recipe>) -> Self {
        Self {
            recipes: RwLock::new(
                recipes
                    .into_iter()
                    .map(|r| (r.video_id.clone(), r))
                    .collect(),
            ),
        }
    }
}

impl Default for MemoryRecipeStore {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned<E: std::fmt::Display>(e: E) -> LarderError {
    LarderError::Persistence(format!("Recipe map lock poisoned: {}", e))
}

#[async_trait]
impl RecipeStore for MemoryRecipeStore {
    async fn upsert(&self, recipe: &Recipe, mode: WriteMode) -> Result<UpsertOutcome> {
        let mut recipes = self.recipes.write().map_err(poisoned)?;

        match recipes.entry(recipe.video_id.clone()) {
            Entry::Vacant(slot) => {
                slot.insert(recipe.clone());
                Ok(UpsertOutcome::Inserted)
            }
            Entry::Occupied(mut slot) => match mode {
                WriteMode::KeepExisting => Ok(UpsertOutcome::AlreadyPresent),
                WriteMode::Overwrite => {
                    let created_at = slot.get().created_at;
                    slot.insert(Recipe {
                        created_at,
                        ..recipe.clone()
                    });
                    Ok(UpsertOutcome::Replaced)
                }
            },
        }
    }

    async fn exists(&self, video_id: &str) -> Result<bool> {
        Ok(self.recipes.read().map_err(poisoned)?.contains_key(video_id))
    }

    async fn get(&self, video_id: &str) -> Result<Option<Recipe>> {
        Ok(self.recipes.read().map_err(poisoned)?.get(video_id).cloned())
    }

    async fn all(&self) -> Result<Vec<Recipe>> {
        let mut recipes: Vec<Recipe> = self.recipes.read().map_err(poisoned)?.values().cloned().collect();
        recipes.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.video_id.cmp(&b.video_id))
        });
        Ok(recipes)
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.recipes.read().map_err(poisoned)?.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn recipe(video_id: &str, dish: &str, year: i32) -> Recipe {
        Recipe {
            video_id: video_id.to_string(),
            title: String::new(),
            description: None,
            dish_name: dish.to_string(),
            ingredients: vec![],
            url: String::new(),
            created_at: Utc.with_ymd_and_hms(year, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_memory_store_modes() {
        let store = MemoryRecipeStore::new();

        assert_eq!(
            store.upsert(&recipe("a", "one", 2020), WriteMode::KeepExisting).await.unwrap(),
            UpsertOutcome::Inserted
        );
        assert_eq!(
            store.upsert(&recipe("a", "two", 2021), WriteMode::KeepExisting).await.unwrap(),
            UpsertOutcome::AlreadyPresent
        );
        assert_eq!(
            store.upsert(&recipe("a", "three", 2022), WriteMode::Overwrite).await.unwrap(),
            UpsertOutcome::Replaced
        );

        let stored = store.get("a").await.unwrap().unwrap();
        assert_eq!(stored.dish_name, "three");
        assert_eq!(stored.created_at.format("%Y").to_string(), "2020");
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_all_newest_first() {
        let store = MemoryRecipeStore::with_recipes([
            recipe("old", "x", 2019),
            recipe("new", "y", 2024),
        ]);

        let ids: Vec<String> = store.all().await.unwrap().into_iter().map(|r| r.video_id).collect();
        assert_eq!(ids, vec!["new", "old"]);
    }
}
