//! Daily challenge rotation
//!
//! Picks one provider track id from a candidate pool and installs it as a
//! placeholder at the reserved daily level. From that point the level
//! behaves like any other provider-backed level, cache-filling on first
//! access. Runs once at service start; an operator action may re-invoke it.

use rand::seq::SliceRandom;
use serde::Deserialize;
use tunequiz_common::{Database, Result};

/// Single candidate used when the pool cannot be loaded, so the feature
/// degrades instead of failing startup
pub const DAILY_FALLBACK_TRACK: &str = "4blQLWBwNYjL3Z0x8ctMBq";

#[derive(Deserialize)]
struct DailyPoolFile {
    tracks: Vec<String>,
}

/// Candidate pool for the daily challenge
pub struct DailyChallenge {
    pool: Vec<String>,
}

impl DailyChallenge {
    /// Parse the candidate pool; a bad or empty pool falls back to the
    /// single hard-coded candidate.
    pub fn from_json(json: &str) -> Self {
        let pool = match serde_json::from_str::<DailyPoolFile>(json) {
            Ok(file) if !file.tracks.is_empty() => file.tracks,
            Ok(_) => {
                tracing::warn!("Daily pool is empty; using fallback track");
                vec![DAILY_FALLBACK_TRACK.to_string()]
            }
            Err(e) => {
                tracing::warn!(error = %e, "Cannot parse daily pool; using fallback track");
                vec![DAILY_FALLBACK_TRACK.to_string()]
            }
        };
        Self { pool }
    }

    pub fn pool_size(&self) -> usize {
        self.pool.len()
    }

    /// Pick a track uniformly at random, clear the reserved daily level,
    /// and install the fresh placeholder. Returns the chosen track id.
    pub async fn rotate(&self, db: &Database) -> Result<String> {
        let track_id = self
            .pool
            .choose(&mut rand::thread_rng())
            .cloned()
            .unwrap_or_else(|| DAILY_FALLBACK_TRACK.to_string());

        db.delete_daily_songs().await?;
        db.insert_daily_placeholder(&track_id).await?;

        tracing::info!(track_id = %track_id, "Daily challenge rotated");
        Ok(track_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tunequiz_common::db::DAILY_LEVEL_ID;

    #[test]
    fn pool_parses_from_json() {
        let daily = DailyChallenge::from_json(r#"{"tracks": ["a", "b", "c"]}"#);
        assert_eq!(daily.pool_size(), 3);
    }

    #[test]
    fn bad_json_falls_back_to_single_candidate() {
        let daily = DailyChallenge::from_json("not json");
        assert_eq!(daily.pool_size(), 1);

        let daily = DailyChallenge::from_json(r#"{"tracks": []}"#);
        assert_eq!(daily.pool_size(), 1);
    }

    #[tokio::test]
    async fn rotate_installs_a_pool_member_at_the_daily_level() {
        let db = Database::open_in_memory().await.unwrap();
        let daily = DailyChallenge::from_json(r#"{"tracks": ["t1", "t2", "t3"]}"#);

        let chosen = daily.rotate(&db).await.unwrap();
        assert!(["t1", "t2", "t3"].contains(&chosen.as_str()));

        let song = db
            .provider_song_by_level(DAILY_LEVEL_ID)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(song.id, chosen);
        assert!(!song.is_complete());
    }

    #[tokio::test]
    async fn rotate_replaces_the_previous_daily_song() {
        let db = Database::open_in_memory().await.unwrap();
        db.insert_daily_placeholder("stale-track").await.unwrap();

        let daily = DailyChallenge::from_json(r#"{"tracks": ["fresh-track"]}"#);
        daily.rotate(&db).await.unwrap();

        let song = db
            .provider_song_by_level(DAILY_LEVEL_ID)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(song.id, "fresh-track");
    }
}
