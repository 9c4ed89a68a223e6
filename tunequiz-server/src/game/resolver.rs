//! Song catalog resolution
//!
//! Maps a parsed level reference onto one of two backing sources: the
//! immutable local catalog for guest levels, or the provider-backed catalog
//! for authenticated levels. Provider rows begin life as placeholders
//! (track id + level id only) and are completed in place the first time
//! they are requested.

use crate::game::level::LevelRef;
use crate::services::provider::TrackProvider;
use std::sync::Arc;
use tunequiz_common::db::{Player, Song};
use tunequiz_common::{Database, Error, Result};

const UNKNOWN_GENRE: &str = "Unknown";

pub struct CatalogResolver {
    db: Database,
    provider: Arc<dyn TrackProvider>,
}

impl CatalogResolver {
    pub fn new(db: Database, provider: Arc<dyn TrackProvider>) -> Self {
        Self { db, provider }
    }

    /// Resolve a level to its canonical song.
    ///
    /// Local levels need no authentication. Provider-backed levels require
    /// a verified requester, and completing a placeholder additionally
    /// requires an unexpired provider token on file for that requester.
    pub async fn resolve_level_song(
        &self,
        level: &LevelRef,
        requester: Option<&Player>,
    ) -> Result<Song> {
        match level {
            LevelRef::Local(index) => self
                .db
                .local_song_by_level(*index)
                .await?
                .ok_or_else(|| Error::NotFound(format!("No guest level {}", index))),
            LevelRef::Provider(index) => self.resolve_provider_song(*index, requester).await,
            LevelRef::Daily => {
                self.resolve_provider_song(tunequiz_common::db::DAILY_LEVEL_ID, requester)
                    .await
            }
        }
    }

    async fn resolve_provider_song(
        &self,
        index: i64,
        requester: Option<&Player>,
    ) -> Result<Song> {
        let player = requester.ok_or_else(|| {
            Error::Unauthorized("Authentication required for this level".to_string())
        })?;

        let song = self
            .db
            .provider_song_by_level(index)
            .await?
            .ok_or_else(|| Error::NotFound(format!("No level {}", index)))?;

        if song.is_complete() {
            tracing::debug!(level_id = index, track_id = %song.id, "Catalog cache hit");
            return Ok(song);
        }

        self.fill_from_provider(song, player).await
    }

    /// Complete a placeholder row from the music provider and write it back
    /// (cache-fill). Two concurrent fills for the same level overwrite each
    /// other with identical content; last writer wins.
    async fn fill_from_provider(&self, placeholder: Song, player: &Player) -> Result<Song> {
        let access_token = self
            .db
            .provider_access_token(&player.username)
            .await?
            .ok_or_else(|| {
                Error::Forbidden(
                    "No active music-provider session; complete the authorization flow first"
                        .to_string(),
                )
            })?;

        let track = self
            .provider
            .fetch_track(&placeholder.id, &access_token)
            .await
            .map_err(|e| {
                tracing::warn!(track_id = %placeholder.id, error = %e, "Track fetch failed");
                Error::NotFound(format!("Level {} unavailable", placeholder.level_id))
            })?;

        // Best-effort genre via the lead artist; the track endpoint does
        // not carry genres itself
        let genre = match track.artists.first() {
            Some(artist) => self
                .provider
                .fetch_artist_genres(&artist.id, &access_token)
                .await
                .ok()
                .and_then(|genres| genres.into_iter().next())
                .unwrap_or_else(|| UNKNOWN_GENRE.to_string()),
            None => UNKNOWN_GENRE.to_string(),
        };

        let audio_url = self
            .provider
            .fetch_preview_audio(&placeholder.id)
            .await
            .unwrap_or_default();

        let artists = track
            .artists
            .iter()
            .map(|a| a.name.as_str())
            .collect::<Vec<_>>()
            .join(", ");

        let song = Song {
            title: track.title,
            artists,
            album: track.album,
            year: track.release_year,
            genre,
            audio_url,
            image_url: track.image_url,
            ..placeholder
        };

        self.db.upsert_provider_song(&song).await?;
        tracing::info!(level_id = song.level_id, track_id = %song.id, "Catalog cache filled");

        Ok(song)
    }
}
