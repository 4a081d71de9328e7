//! Recipe store abstraction for Larder.
//!
//! The store is the single writer of truth for recipes. It enforces one
//! recipe per video ID: writes are upserts keyed on the ID, and each write is
//! atomic so readers never see a half-written recipe.

mod memory;
mod sqlite;

pub use memory::MemoryRecipeStore;
pub use sqlite::SqliteRecipeStore;

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A recipe extracted from one video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    /// Stable external video ID (unique).
    pub video_id: String,
    /// Video title (may be empty).
    pub title: String,
    /// Video description.
    pub description: Option<String>,
    /// Dish name produced by extraction (may be empty).
    pub dish_name: String,
    /// Ingredient names in the order they were extracted.
    pub ingredients: Vec<String>,
    /// Canonical playback link.
    pub url: String,
    /// When the recipe was first stored.
    pub created_at: DateTime<Utc>,
}

/// What to do when a recipe for the video already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Keep the stored recipe; the write is a no-op.
    KeepExisting,
    /// Replace every field except `created_at`.
    Overwrite,
}

/// Result of an upsert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    /// A recipe already existed and was left untouched.
    AlreadyPresent,
    Replaced,
}

/// Trait for recipe store implementations.
#[async_trait]
pub trait RecipeStore: Send + Sync {
    /// Insert or update a recipe keyed on its video ID.
    ///
    /// Fails only on storage failure, never on a duplicate key.
    async fn upsert(&self, recipe: &Recipe, mode: WriteMode) -> Result<UpsertOutcome>;

    /// Check if a recipe exists for the video.
    async fn exists(&self, video_id: &str) -> Result<bool>;

    /// Get a recipe by video ID.
    async fn get(&self, video_id: &str) -> Result<Option<Recipe>>;

    /// All stored recipes, newest first.
    async fn all(&self) -> Result<Vec<Recipe>>;

    /// Number of stored recipes.
    async fn count(&self) -> Result<usize>;
}
