//! Domain models: songs, players, and their API projections

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Level id reserved for the rotating daily challenge
pub const DAILY_LEVEL_ID: i64 = 0;

/// Sentinel for a provider song not yet assigned to a level
pub const UNASSIGNED_LEVEL_ID: i64 = -999;

/// Which catalog a song came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SongSource {
    /// Bundled guest catalog, immutable after seeding
    Local,
    /// Provider-backed catalog, lazily completed from the music provider
    Provider,
}

impl SongSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            SongSource::Local => "local",
            SongSource::Provider => "provider",
        }
    }
}

/// A catalog entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Song {
    /// Local integer id or provider track id
    pub id: String,
    pub title: String,
    /// Display string, comma-joined
    pub artists: String,
    pub album: String,
    /// 0 when unknown
    pub year: i64,
    pub genre: String,
    /// URL or encoded payload
    pub audio_url: String,
    pub image_url: String,
    pub level_id: i64,
    pub source: SongSource,
}

impl Song {
    /// A provider row counts as complete only when every display field is
    /// populated; anything less triggers a fetch-and-cache-fill.
    pub fn is_complete(&self) -> bool {
        !self.title.is_empty()
            && !self.artists.is_empty()
            && !self.album.is_empty()
            && self.year != 0
            && !self.genre.is_empty()
            && !self.audio_url.is_empty()
            && !self.image_url.is_empty()
    }

    /// First half of the title's characters
    pub fn title_hint(&self) -> String {
        let half = self.title.chars().count() / 2;
        self.title.chars().take(half).collect()
    }

    /// Projection safe to hand to a guesser: answer fields omitted.
    pub fn hint_view(&self) -> SongView {
        SongView {
            id: self.id.clone(),
            audio_url: self.audio_url.clone(),
            image_url: self.image_url.clone(),
            hints: SongHints {
                year: self.year,
                genre: self.genre.clone(),
                album: self.album.clone(),
                artist: self.artists.clone(),
                title_hint: self.title_hint(),
            },
            title: None,
            artists: None,
        }
    }

    /// Projection including the answer; only for the correct-guess path or
    /// an explicit reveal.
    pub fn full_view(&self) -> SongView {
        let mut view = self.hint_view();
        view.title = Some(self.title.clone());
        view.artists = Some(self.artists.clone());
        view
    }
}

/// Derived hints included in every song payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SongHints {
    pub year: i64,
    pub genre: String,
    pub album: String,
    pub artist: String,
    pub title_hint: String,
}

/// Wire projection of a song
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SongView {
    pub id: String,
    pub audio_url: String,
    pub image_url: String,
    pub hints: SongHints,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artists: Option<String>,
}

/// A registered player
#[derive(Debug, Clone)]
pub struct Player {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub is_active: bool,
    pub total_score: i64,
    pub completed_levels: BTreeSet<String>,
    pub played_levels: BTreeSet<String>,
    /// `dd-mm-yyyy`, server local time
    pub last_daily_completed: Option<String>,
    pub provider_client_id: Option<String>,
    pub provider_client_secret: Option<String>,
    pub provider_access_token: Option<String>,
    pub provider_refresh_token: Option<String>,
    /// Unix timestamp
    pub provider_token_expires_at: Option<i64>,
}

impl Player {
    pub fn new(username: impl Into<String>, email: impl Into<String>, password_hash: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            email: email.into(),
            password_hash: password_hash.into(),
            is_active: true,
            total_score: 0,
            completed_levels: BTreeSet::new(),
            played_levels: BTreeSet::new(),
            last_daily_completed: None,
            provider_client_id: None,
            provider_client_secret: None,
            provider_access_token: None,
            provider_refresh_token: None,
            provider_token_expires_at: None,
        }
    }

    pub fn has_played(&self, level_id: &str) -> bool {
        self.played_levels.contains(level_id)
    }

    /// Record an attempt without awarding anything. Idempotent.
    pub fn mark_played(&mut self, level_id: &str) {
        self.played_levels.insert(level_id.to_string());
    }

    /// Record a scoring completion: the level lands in both sets.
    pub fn complete_level(&mut self, level_id: &str) {
        self.played_levels.insert(level_id.to_string());
        self.completed_levels.insert(level_id.to_string());
    }

    /// `total_score` only grows through here
    pub fn add_score(&mut self, delta: i64) {
        self.total_score += delta;
    }

    /// Stamp today's date as the last daily completion
    pub fn complete_daily(&mut self) {
        self.last_daily_completed = Some(today_stamp());
    }

    pub fn is_daily_completed_today(&self) -> bool {
        self.last_daily_completed.as_deref() == Some(today_stamp().as_str())
    }

    /// Public projection without credential material
    pub fn public_profile(&self) -> PublicProfile {
        PublicProfile {
            username: self.username.clone(),
            email: self.email.clone(),
            total_score: self.total_score,
            levels_completed: self.completed_levels.len(),
            daily_completed: self.is_daily_completed_today(),
        }
    }
}

/// Player projection for API responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicProfile {
    pub username: String,
    pub email: String,
    pub total_score: i64,
    pub levels_completed: usize,
    pub daily_completed: bool,
}

/// One row of the score ranking
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingEntry {
    pub username: String,
    pub total_score: i64,
    /// Cardinality of the completed set, not the raw set
    pub levels_completed: usize,
}

/// Current calendar date as `dd-mm-yyyy` in server local time
pub fn today_stamp() -> String {
    chrono::Local::now().format("%d-%m-%Y").to_string()
}

/// Storage-boundary encoding of a level set: comma-joined tokens.
/// The underlying store has no native array columns.
pub fn join_levels(levels: &BTreeSet<String>) -> String {
    levels.iter().cloned().collect::<Vec<_>>().join(",")
}

/// Inverse of [`join_levels`]; empty string decodes to the empty set
pub fn split_levels(encoded: &str) -> BTreeSet<String> {
    encoded
        .split(',')
        .filter(|token| !token.is_empty())
        .map(|token| token.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_song() -> Song {
        Song {
            id: "3".to_string(),
            title: "Bad Guy".to_string(),
            artists: "Billie Eilish".to_string(),
            album: "When We All Fall Asleep, Where Do We Go?".to_string(),
            year: 2019,
            genre: "Electropop".to_string(),
            audio_url: "/media/local/3.mp3".to_string(),
            image_url: "https://images.example/bad-guy.jpg".to_string(),
            level_id: 3,
            source: SongSource::Local,
        }
    }

    #[test]
    fn completeness_requires_every_display_field() {
        let song = sample_song();
        assert!(song.is_complete());

        let mut missing_year = song.clone();
        missing_year.year = 0;
        assert!(!missing_year.is_complete());

        let mut missing_audio = song.clone();
        missing_audio.audio_url.clear();
        assert!(!missing_audio.is_complete());
    }

    #[test]
    fn title_hint_is_first_half_of_chars() {
        let song = sample_song();
        // "Bad Guy" has 7 chars; half rounds down to 3
        assert_eq!(song.title_hint(), "Bad");
    }

    #[test]
    fn hint_view_omits_the_answer() {
        let view = sample_song().hint_view();
        assert!(view.title.is_none());
        assert!(view.artists.is_none());
        assert_eq!(view.hints.artist, "Billie Eilish");

        let json = serde_json::to_value(&view).unwrap();
        assert!(json.get("title").is_none());
    }

    #[test]
    fn full_view_includes_the_answer() {
        let view = sample_song().full_view();
        assert_eq!(view.title.as_deref(), Some("Bad Guy"));
        assert_eq!(view.artists.as_deref(), Some("Billie Eilish"));
    }

    #[test]
    fn level_set_codec_round_trips() {
        let mut levels = BTreeSet::new();
        levels.insert("0".to_string());
        levels.insert("3_local".to_string());
        levels.insert("7".to_string());

        let encoded = join_levels(&levels);
        assert_eq!(split_levels(&encoded), levels);

        assert!(split_levels("").is_empty());
        assert_eq!(split_levels("5").len(), 1);
    }

    #[test]
    fn completed_set_stays_within_played_set() {
        let mut player = Player::new("alice", "alice@example.com", "hash");
        player.complete_level("3_local");
        player.mark_played("7");

        assert!(player.completed_levels.is_subset(&player.played_levels));
        assert!(player.has_played("7"));
        assert!(!player.completed_levels.contains("7"));
    }

    #[test]
    fn mark_played_is_idempotent() {
        let mut player = Player::new("alice", "alice@example.com", "hash");
        player.mark_played("5_local");
        player.mark_played("5_local");
        assert_eq!(player.played_levels.len(), 1);
    }

    #[test]
    fn daily_completion_tracks_today_only() {
        let mut player = Player::new("alice", "alice@example.com", "hash");
        assert!(!player.is_daily_completed_today());

        player.complete_daily();
        assert!(player.is_daily_completed_today());

        let yesterday = (chrono::Local::now() - chrono::Duration::days(1))
            .format("%d-%m-%Y")
            .to_string();
        player.last_daily_completed = Some(yesterday);
        assert!(!player.is_daily_completed_today());
    }
}
