//! SQLite-based persistence store

use crate::persistence::{BuildSummary, PersistenceBackend};
use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

/// SQLite build store
pub struct SqliteBuildStore {
    pool: SqlitePool,
}

impl SqliteBuildStore {
    /// Create a new SQLite store
    pub async fn new(db_path: &str) -> Result<Self> {
        let pool = SqlitePool::connect(&format!("sqlite:{}", db_path))
            .await
            .context("Failed to connect to database")?;

        let store = Self { pool };
        store.init().await?;

        Ok(store)
    }

    /// Create store with default path
    pub async fn with_default_path() -> Result<Self> {
        let data_dir = dirs::data_local_dir().unwrap_or_else(|| std::path::PathBuf::from("."));
        let db_dir = data_dir.join("bake");
        std::fs::create_dir_all(&db_dir)?;

        let db_path = db_dir.join("builds.db");
        Self::new(db_path.to_str().context("Non-UTF-8 database path")?).await
    }

    /// Initialize database schema
    async fn init(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS builds (
                id TEXT PRIMARY KEY,
                recipe_name TEXT NOT NULL,
                base_image TEXT NOT NULL,
                status TEXT NOT NULL,
                started_at TEXT NOT NULL,
                completed_at TEXT,
                progress REAL NOT NULL DEFAULT 0.0,
                completed_steps INTEGER NOT NULL DEFAULT 0,
                total_steps INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE INDEX IF NOT EXISTS idx_recipe_name ON builds(recipe_name);
            CREATE INDEX IF NOT EXISTS idx_status ON builds(status);
            CREATE INDEX IF NOT EXISTS idx_started_at ON builds(started_at);
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Convert DateTime<Utc> to NaiveDateTime for SQLite
    fn to_naive(dt: DateTime<Utc>) -> NaiveDateTime {
        dt.naive_utc()
    }

    /// Convert NaiveDateTime to DateTime<Utc>
    fn from_naive(dt: NaiveDateTime) -> DateTime<Utc> {
        DateTime::from_naive_utc_and_offset(dt, Utc)
    }

    fn status_from_str(status: &str) -> crate::core::BuildStatus {
        match status {
            "Pending" => crate::core::BuildStatus::Pending,
            "Running" => crate::core::BuildStatus::Running,
            "Completed" => crate::core::BuildStatus::Completed,
            "Aborted" => crate::core::BuildStatus::Aborted,
            _ => crate::core::BuildStatus::Pending,
        }
    }

    fn row_to_summary(row: &sqlx::sqlite::SqliteRow) -> Result<BuildSummary> {
        Ok(BuildSummary {
            build_id: Uuid::parse_str(&row.get::<String, _>("id"))?,
            recipe_name: row.get("recipe_name"),
            base_image: row.get("base_image"),
            status: Self::status_from_str(&row.get::<String, _>("status")),
            started_at: Self::from_naive(row.get("started_at")),
            completed_at: row
                .get::<Option<NaiveDateTime>, _>("completed_at")
                .map(Self::from_naive),
            progress: row.get("progress"),
            completed_steps: row.get::<i64, _>("completed_steps") as usize,
            total_steps: row.get::<i64, _>("total_steps") as usize,
        })
    }
}

#[async_trait::async_trait]
impl PersistenceBackend for SqliteBuildStore {
    async fn save_build(&self, build: &BuildSummary) -> Result<()> {
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO builds
            (id, recipe_name, base_image, status, started_at, completed_at, progress, completed_steps, total_steps)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(build.build_id.to_string())
        .bind(&build.recipe_name)
        .bind(&build.base_image)
        .bind(format!("{:?}", build.status))
        .bind(Self::to_naive(build.started_at))
        .bind(build.completed_at.map(Self::to_naive))
        .bind(build.progress)
        .bind(build.completed_steps as i64)
        .bind(build.total_steps as i64)
        .execute(&self.pool)
        .await
        .context("Failed to save build")?;

        Ok(())
    }

    async fn load_build(&self, build_id: Uuid) -> Result<Option<BuildSummary>> {
        let row = sqlx::query(
            r#"
            SELECT id, recipe_name, base_image, status, started_at, completed_at, progress, completed_steps, total_steps
            FROM builds
            WHERE id = ?1
            "#,
        )
        .bind(build_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to load build")?;

        row.as_ref().map(Self::row_to_summary).transpose()
    }

    async fn list_builds(&self, recipe_name: &str) -> Result<Vec<BuildSummary>> {
        let rows = sqlx::query(
            r#"
            SELECT id, recipe_name, base_image, status, started_at, completed_at, progress, completed_steps, total_steps
            FROM builds
            WHERE recipe_name = ?1
            ORDER BY started_at DESC
            "#,
        )
        .bind(recipe_name)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list builds")?;

        rows.iter().map(Self::row_to_summary).collect()
    }

    async fn list_recipes(&self) -> Result<Vec<String>> {
        let rows = sqlx::query(
            r#"
            SELECT DISTINCT recipe_name
            FROM builds
            ORDER BY recipe_name ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to list recipes")?;

        Ok(rows.iter().map(|row| row.get("recipe_name")).collect())
    }
}
