//! Song catalog queries and seeding
//!
//! Two backing tables: `local_songs` (immutable guest catalog) and
//! `provider_songs` (placeholder rows completed in place on first access).

use super::models::{Song, SongSource, DAILY_LEVEL_ID};
use super::Database;
use crate::Result;
use serde::Deserialize;

type ProviderSongRow = (
    String,         // track_id
    Option<String>, // title
    Option<String>, // artists
    Option<String>, // album
    Option<i64>,    // year
    Option<String>, // genre
    Option<String>, // audio_url
    Option<String>, // image_url
    i64,            // level_id
);

fn provider_row_to_song(row: ProviderSongRow) -> Song {
    let (track_id, title, artists, album, year, genre, audio_url, image_url, level_id) = row;
    Song {
        id: track_id,
        title: title.unwrap_or_default(),
        artists: artists.unwrap_or_default(),
        album: album.unwrap_or_default(),
        year: year.unwrap_or(0),
        genre: genre.unwrap_or_default(),
        audio_url: audio_url.unwrap_or_default(),
        image_url: image_url.unwrap_or_default(),
        level_id,
        source: SongSource::Provider,
    }
}

#[derive(Deserialize)]
struct LocalSeedFile {
    songs: Vec<LocalSeedSong>,
}

#[derive(Deserialize)]
struct LocalSeedSong {
    id: i64,
    title: String,
    artists: String,
    album: String,
    year: i64,
    genre: String,
    audio_url: String,
    image_url: String,
}

#[derive(Deserialize)]
struct ProviderSeedFile {
    levels: Vec<ProviderSeedLevel>,
}

#[derive(Deserialize)]
struct ProviderSeedLevel {
    track_id: String,
    level_id: i64,
}

impl Database {
    /// Local catalog lookup; the local id IS the level index.
    pub async fn local_song_by_level(&self, level_id: i64) -> Result<Option<Song>> {
        let row: Option<(i64, String, String, String, i64, String, String, String)> =
            sqlx::query_as(
                "SELECT id, title, artists, album, year, genre, audio_url, image_url \
                 FROM local_songs WHERE id = ?",
            )
            .bind(level_id)
            .fetch_optional(self.pool())
            .await?;

        Ok(row.map(
            |(id, title, artists, album, year, genre, audio_url, image_url)| Song {
                id: id.to_string(),
                title,
                artists,
                album,
                year,
                genre,
                audio_url,
                image_url,
                level_id: id,
                source: SongSource::Local,
            },
        ))
    }

    /// Provider catalog lookup by level. Placeholder rows come back with
    /// empty display fields.
    pub async fn provider_song_by_level(&self, level_id: i64) -> Result<Option<Song>> {
        let row: Option<ProviderSongRow> = sqlx::query_as(
            "SELECT track_id, title, artists, album, year, genre, audio_url, image_url, level_id \
             FROM provider_songs WHERE level_id = ? LIMIT 1",
        )
        .bind(level_id)
        .fetch_optional(self.pool())
        .await?;

        Ok(row.map(provider_row_to_song))
    }

    /// Canonical title for a provider-backed level, if cached.
    /// Placeholder rows yield `None`.
    pub async fn provider_title_by_level(&self, level_id: i64) -> Result<Option<String>> {
        let row: Option<(Option<String>,)> =
            sqlx::query_as("SELECT title FROM provider_songs WHERE level_id = ? LIMIT 1")
                .bind(level_id)
                .fetch_optional(self.pool())
                .await?;

        Ok(row.and_then(|(title,)| title).filter(|t| !t.is_empty()))
    }

    /// Write a completed provider song keyed by its track id (cache-fill).
    /// Last writer wins; the fetched content is idempotent per track id.
    pub async fn upsert_provider_song(&self, song: &Song) -> Result<()> {
        sqlx::query(
            "INSERT OR REPLACE INTO provider_songs \
             (track_id, title, artists, album, year, genre, audio_url, image_url, level_id) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&song.id)
        .bind(&song.title)
        .bind(&song.artists)
        .bind(&song.album)
        .bind(song.year)
        .bind(&song.genre)
        .bind(&song.audio_url)
        .bind(&song.image_url)
        .bind(song.level_id)
        .execute(self.pool())
        .await?;

        tracing::debug!(track_id = %song.id, level_id = song.level_id, "Provider song stored");
        Ok(())
    }

    /// Clear the reserved daily level ahead of a rotation
    pub async fn delete_daily_songs(&self) -> Result<()> {
        sqlx::query("DELETE FROM provider_songs WHERE level_id = ?")
            .bind(DAILY_LEVEL_ID)
            .execute(self.pool())
            .await?;
        Ok(())
    }

    /// Install a fresh placeholder at the daily level; the Resolver treats
    /// it like any other provider-backed level from here on.
    pub async fn insert_daily_placeholder(&self, track_id: &str) -> Result<()> {
        sqlx::query(
            "INSERT OR REPLACE INTO provider_songs (track_id, level_id) VALUES (?, ?)",
        )
        .bind(track_id)
        .bind(DAILY_LEVEL_ID)
        .execute(self.pool())
        .await?;

        tracing::info!(track_id = %track_id, "Daily challenge song installed");
        Ok(())
    }

    /// Seed the immutable guest catalog. Existing rows are left untouched.
    pub async fn seed_local_songs(&self, json: &str) -> Result<usize> {
        let seed: LocalSeedFile = serde_json::from_str(json)
            .map_err(|e| crate::Error::Config(format!("Bad local song seed: {}", e)))?;

        let mut inserted = 0;
        for song in &seed.songs {
            let result = sqlx::query(
                "INSERT OR IGNORE INTO local_songs \
                 (id, title, artists, album, year, genre, audio_url, image_url) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(song.id)
            .bind(&song.title)
            .bind(&song.artists)
            .bind(&song.album)
            .bind(song.year)
            .bind(&song.genre)
            .bind(&song.audio_url)
            .bind(&song.image_url)
            .execute(self.pool())
            .await?;
            inserted += result.rows_affected() as usize;
        }

        tracing::info!(total = seed.songs.len(), inserted, "Local catalog seeded");
        Ok(inserted)
    }

    /// Seed provider level placeholders (track id + level id pairs).
    /// Existing rows, including already cache-filled ones, are kept.
    pub async fn seed_provider_levels(&self, json: &str) -> Result<usize> {
        let seed: ProviderSeedFile = serde_json::from_str(json)
            .map_err(|e| crate::Error::Config(format!("Bad provider level seed: {}", e)))?;

        let mut inserted = 0;
        for level in &seed.levels {
            let result = sqlx::query(
                "INSERT OR IGNORE INTO provider_songs (track_id, level_id) VALUES (?, ?)",
            )
            .bind(&level.track_id)
            .bind(level.level_id)
            .execute(self.pool())
            .await?;
            inserted += result.rows_affected() as usize;
        }

        tracing::info!(total = seed.levels.len(), inserted, "Provider levels seeded");
        Ok(inserted)
    }
}
