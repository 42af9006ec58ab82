use serde::{Deserialize, Serialize};
use sqlx::{Pool, Sqlite, SqlitePool};

/// Nutrient values per 100 g of an ingredient in its reference state.
/// Rows are immutable once stored; corrections happen out-of-band.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, sqlx::FromRow)]
pub struct NutrientProfile {
    pub kcal: f64,
    pub protein: f64,
    pub fat: f64,
    pub saturated_fat: f64,
    pub carbs: f64,
    pub sugar: f64,
    pub fiber: f64,
    pub salt: f64,
}

/// Persistent cache of per-100 g nutrient profiles, keyed by ingredient slug
/// (normalized lowercase hyphenated English, e.g. `olive-oil`).
#[derive(Clone)]
pub struct NutrientStore {
    pool: Pool<Sqlite>,
}

impl NutrientStore {
    /// Open (and if necessary create) the backing database and run the
    /// table migration.
    pub async fn new(database_url: &str) -> Result<Self, sqlx::Error> {
        // Ensure SQLite creates the database file if it doesn't exist
        let connection_options =
            if database_url.starts_with("sqlite:") && !database_url.contains('?') {
                format!("{database_url}?mode=rwc")
            } else {
                database_url.to_string()
            };

        let pool = SqlitePool::connect(&connection_options).await?;

        let store = Self { pool };
        store.migrate().await?;

        Ok(store)
    }

    /// Get a reference to the underlying pool for advanced operations.
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    async fn migrate(&self) -> Result<(), sqlx::Error> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS ingredient_nutrients (
                slug TEXT PRIMARY KEY,
                kcal REAL NOT NULL,
                protein REAL NOT NULL,
                fat REAL NOT NULL,
                saturated_fat REAL NOT NULL,
                carbs REAL NOT NULL,
                sugar REAL NOT NULL,
                fiber REAL NOT NULL,
                salt REAL NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get(&self, slug: &str) -> Result<Option<NutrientProfile>, sqlx::Error> {
        sqlx::query_as::<_, NutrientProfile>(
            r"
            SELECT kcal, protein, fat, saturated_fat, carbs, sugar, fiber, salt
            FROM ingredient_nutrients
            WHERE slug = $1
            ",
        )
        .bind(slug)
        .fetch_optional(&self.pool)
        .await
    }

    /// Idempotent create: inserting an already-present slug is a no-op and
    /// the value that ends up stored is returned. Concurrent `put` calls for
    /// a never-seen slug create at most one row (the primary key plus
    /// `ON CONFLICT DO NOTHING` makes the insert race-free); all callers
    /// observe the winning row.
    pub async fn put(
        &self,
        slug: &str,
        profile: &NutrientProfile,
    ) -> Result<NutrientProfile, sqlx::Error> {
        sqlx::query(
            r"
            INSERT INTO ingredient_nutrients
                (slug, kcal, protein, fat, saturated_fat, carbs, sugar, fiber, salt)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT(slug) DO NOTHING
            ",
        )
        .bind(slug)
        .bind(profile.kcal)
        .bind(profile.protein)
        .bind(profile.fat)
        .bind(profile.saturated_fat)
        .bind(profile.carbs)
        .bind(profile.sugar)
        .bind(profile.fiber)
        .bind(profile.salt)
        .execute(&self.pool)
        .await?;

        // Re-read rather than trusting the input: on conflict the earlier
        // row wins and that is what every caller must see.
        self.get(slug).await?.ok_or(sqlx::Error::RowNotFound)
    }
}
