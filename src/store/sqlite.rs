//! SQLite-based recipe store implementation.

use super::{Recipe, RecipeStore, UpsertOutcome, WriteMode};
use crate::error::{LarderError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, instrument};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS recipes (
    video_id TEXT PRIMARY KEY NOT NULL,
    title TEXT NOT NULL,
    description TEXT,
    dish_name TEXT NOT NULL,
    ingredients TEXT NOT NULL,
    url TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_recipes_created_at ON recipes(created_at);
"#;

const SELECT_COLUMNS: &str =
    "SELECT video_id, title, description, dish_name, ingredients, url, created_at FROM recipes";

/// SQLite-based recipe store.
pub struct SqliteRecipeStore {
    conn: Mutex<Connection>,
}

impl SqliteRecipeStore {
    /// Open (or create) a recipe store at `path`.
    #[instrument(skip_all)]
    pub fn new(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        // WAL lets readers see committed recipes while a run is writing
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        conn.execute_batch(SCHEMA)?;

        info!("Initialized SQLite recipe store at {:?}", path);

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite store (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| LarderError::Persistence(format!("Failed to acquire lock: {}", e)))
    }

    fn row_to_recipe(row: &Row<'_>) -> rusqlite::Result<Recipe> {
        let ingredients_json: String = row.get(4)?;
        let created_at_str: String = row.get(6)?;

        let ingredients: Vec<String> = serde_json::from_str(&ingredients_json)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(e)))?;
        let created_at = DateTime::parse_from_rfc3339(&created_at_str)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(6, Type::Text, Box::new(e)))?;

        Ok(Recipe {
            video_id: row.get(0)?,
            title: row.get(1)?,
            description: row.get(2)?,
            dish_name: row.get(3)?,
            ingredients,
            url: row.get(5)?,
            created_at,
        })
    }
}

#[async_trait]
impl RecipeStore for SqliteRecipeStore {
    #[instrument(skip(self, recipe), fields(video_id = %recipe.video_id))]
    async fn upsert(&self, recipe: &Recipe, mode: WriteMode) -> Result<UpsertOutcome> {
        let ingredients_json = serde_json::to_string(&recipe.ingredients)?;
        let conn = self.lock()?;

        let outcome = match mode {
            WriteMode::KeepExisting => {
                let inserted = conn.execute(
                    r#"
                    INSERT INTO recipes
                    (video_id, title, description, dish_name, ingredients, url, created_at)
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                    ON CONFLICT(video_id) DO NOTHING
                    "#,
                    params![
                        recipe.video_id,
                        recipe.title,
                        recipe.description,
                        recipe.dish_name,
                        ingredients_json,
                        recipe.url,
                        recipe.created_at.to_rfc3339(),
                    ],
                )?;
                if inserted == 1 {
                    UpsertOutcome::Inserted
                } else {
                    UpsertOutcome::AlreadyPresent
                }
            }
            WriteMode::Overwrite => {
                let tx = conn.unchecked_transaction()?;
                let existed: bool = tx.query_row(
                    "SELECT EXISTS(SELECT 1 FROM recipes WHERE video_id = ?1)",
                    params![recipe.video_id],
                    |row| row.get(0),
                )?;
                tx.execute(
                    r#"
                    INSERT INTO recipes
                    (video_id, title, description, dish_name, ingredients, url, created_at)
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                    ON CONFLICT(video_id) DO UPDATE SET
                        title = excluded.title,
                        description = excluded.description,
                        dish_name = excluded.dish_name,
                        ingredients = excluded.ingredients,
                        url = excluded.url
                    "#,
                    params![
                        recipe.video_id,
                        recipe.title,
                        recipe.description,
                        recipe.dish_name,
                        ingredients_json,
                        recipe.url,
                        recipe.created_at.to_rfc3339(),
                    ],
                )?;
                tx.commit()?;
                if existed {
                    UpsertOutcome::Replaced
                } else {
                    UpsertOutcome::Inserted
                }
            }
        };

        debug!("Upserted recipe {} ({:?})", recipe.video_id, outcome);
        Ok(outcome)
    }

    async fn exists(&self, video_id: &str) -> Result<bool> {
        let conn = self.lock()?;
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM recipes WHERE video_id = ?1)",
            params![video_id],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    async fn get(&self, video_id: &str) -> Result<Option<Recipe>> {
        let conn = self.lock()?;
        let recipe = conn
            .query_row(
                &format!("{} WHERE video_id = ?1", SELECT_COLUMNS),
                params![video_id],
                Self::row_to_recipe,
            )
            .optional()?;
        Ok(recipe)
    }

    #[instrument(skip(self))]
    async fn all(&self) -> Result<Vec<Recipe>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "{} ORDER BY created_at DESC, video_id ASC",
            SELECT_COLUMNS
        ))?;

        let recipes = stmt
            .query_map([], Self::row_to_recipe)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        debug!("Loaded {} recipes", recipes.len());
        Ok(recipes)
    }

    async fn count(&self) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM recipes", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn recipe(video_id: &str, dish: &str) -> Recipe {
        Recipe {
            video_id: video_id.to_string(),
            title: format!("{} 만들기", dish),
            description: Some("재료: 김치".to_string()),
            dish_name: dish.to_string(),
            ingredients: vec!["김치".to_string(), "두부".to_string()],
            url: format!("https://www.youtube.com/watch?v={}", video_id),
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_insert_and_read_back() {
        let store = SqliteRecipeStore::in_memory().unwrap();
        let original = recipe("vid1", "김치찌개");

        assert_eq!(
            store.upsert(&original, WriteMode::KeepExisting).await.unwrap(),
            UpsertOutcome::Inserted
        );
        assert!(store.exists("vid1").await.unwrap());
        assert!(!store.exists("vid2").await.unwrap());
        assert_eq!(store.get("vid1").await.unwrap(), Some(original));
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_keep_existing_is_noop() {
        let store = SqliteRecipeStore::in_memory().unwrap();
        store.upsert(&recipe("vid1", "김치찌개"), WriteMode::KeepExisting).await.unwrap();

        let outcome = store
            .upsert(&recipe("vid1", "된장찌개"), WriteMode::KeepExisting)
            .await
            .unwrap();

        assert_eq!(outcome, UpsertOutcome::AlreadyPresent);
        assert_eq!(store.count().await.unwrap(), 1);
        assert_eq!(store.get("vid1").await.unwrap().unwrap().dish_name, "김치찌개");
    }

    #[tokio::test]
    async fn test_overwrite_keeps_created_at() {
        let store = SqliteRecipeStore::in_memory().unwrap();
        let first = recipe("vid1", "김치찌개");
        store.upsert(&first, WriteMode::KeepExisting).await.unwrap();

        let mut second = recipe("vid1", "된장찌개");
        second.created_at = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(
            store.upsert(&second, WriteMode::Overwrite).await.unwrap(),
            UpsertOutcome::Replaced
        );

        let stored = store.get("vid1").await.unwrap().unwrap();
        assert_eq!(stored.dish_name, "된장찌개");
        assert_eq!(stored.created_at, first.created_at);
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_all_is_newest_first() {
        let store = SqliteRecipeStore::in_memory().unwrap();
        let mut older = recipe("old", "계란찜");
        older.created_at = Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap();
        let newer = recipe("new", "라면");

        store.upsert(&older, WriteMode::KeepExisting).await.unwrap();
        store.upsert(&newer, WriteMode::KeepExisting).await.unwrap();

        let ids: Vec<String> = store.all().await.unwrap().into_iter().map(|r| r.video_id).collect();
        assert_eq!(ids, vec!["new", "old"]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_upserts_leave_one_row() {
        let dir = tempfile::tempdir().unwrap();
        let store = std::sync::Arc::new(SqliteRecipeStore::new(&dir.path().join("r.db")).unwrap());

        let writes = (0..8).map(|i| {
            let store = store.clone();
            tokio::spawn(async move {
                store
                    .upsert(&recipe("same", &format!("dish{}", i)), WriteMode::KeepExisting)
                    .await
                    .unwrap()
            })
        });
        let outcomes = futures::future::join_all(writes).await;

        let inserted = outcomes
            .into_iter()
            .filter(|o| matches!(o, Ok(UpsertOutcome::Inserted)))
            .count();
        assert_eq!(inserted, 1);
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_corrupt_row_is_surfaced() {
        let store = SqliteRecipeStore::in_memory().unwrap();
        {
            let conn = store.lock().unwrap();
            conn.execute(
                "INSERT INTO recipes VALUES ('bad', 't', NULL, 'd', 'not json', 'u', '2024-01-01T00:00:00Z')",
                [],
            )
            .unwrap();
        }

        let err = store.all().await.unwrap_err();
        assert!(err.is_persistence());
    }
}
