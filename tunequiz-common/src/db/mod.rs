//! Database access layer
//!
//! Owns the SQLite pool and the schema. All persisted Song and Player state
//! lives behind this module; components receive a `Database` value at
//! construction time instead of reaching for ambient global state.

use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;

pub mod models;
pub mod players;
pub mod songs;

pub use models::{
    Player, PublicProfile, RankingEntry, Song, SongHints, SongSource, SongView, DAILY_LEVEL_ID,
    UNASSIGNED_LEVEL_ID,
};

/// Handle to the backing store with an explicit open/close lifecycle
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open (creating if missing) the database at `path` and ensure the
    /// schema exists.
    pub async fn open(path: &Path) -> Result<Database> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let db = Database { pool };
        db.init_schema().await?;

        tracing::info!(path = %path.display(), "Database opened");
        Ok(db)
    }

    /// Open an in-memory database with the full schema. Test use.
    /// Single connection: every pooled connection to `:memory:` would
    /// otherwise get its own empty database.
    pub async fn open_in_memory() -> Result<Database> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(":memory:")
            .await?;
        let db = Database { pool };
        db.init_schema().await?;
        Ok(db)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close the pool, flushing outstanding connections.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS players (
                username TEXT PRIMARY KEY,
                email TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                is_active INTEGER NOT NULL DEFAULT 1,
                total_score INTEGER NOT NULL DEFAULT 0,
                completed_levels TEXT NOT NULL DEFAULT '',
                played_levels TEXT NOT NULL DEFAULT '',
                last_daily_completed TEXT,
                provider_client_id TEXT,
                provider_client_secret TEXT,
                provider_access_token TEXT,
                provider_refresh_token TEXT,
                provider_token_expires_at INTEGER
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        // Immutable guest catalog, seeded once at startup
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS local_songs (
                id INTEGER PRIMARY KEY,
                title TEXT NOT NULL,
                artists TEXT NOT NULL,
                album TEXT NOT NULL,
                year INTEGER NOT NULL DEFAULT 0,
                genre TEXT NOT NULL DEFAULT '',
                audio_url TEXT NOT NULL,
                image_url TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        // Provider-backed catalog: rows start as placeholders (track_id +
        // level_id only) and are completed in place on first access
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS provider_songs (
                track_id TEXT PRIMARY KEY,
                title TEXT,
                artists TEXT,
                album TEXT,
                year INTEGER,
                genre TEXT,
                audio_url TEXT,
                image_url TEXT,
                level_id INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_provider_songs_level ON provider_songs(level_id)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn open_creates_schema() {
        let db = Database::open_in_memory().await.unwrap();

        let tables: Vec<(String,)> = sqlx::query_as(
            "SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name",
        )
        .fetch_all(db.pool())
        .await
        .unwrap();

        let names: Vec<&str> = tables.iter().map(|(n,)| n.as_str()).collect();
        assert!(names.contains(&"players"));
        assert!(names.contains(&"local_songs"));
        assert!(names.contains(&"provider_songs"));
    }

    #[tokio::test]
    async fn open_on_disk_creates_file_and_reopens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tunequiz.db");

        let db = Database::open(&path).await.unwrap();
        db.close().await;
        assert!(path.exists());

        // Second open must tolerate the existing schema
        let db = Database::open(&path).await.unwrap();
        db.close().await;
    }
}
