//! Answer validation
//!
//! Decides whether a submitted guess matches the canonical title of a
//! level. Returns only a boolean: a level that does not exist, has no
//! cached title yet, or cannot be parsed is indistinguishable from a wrong
//! guess, so the verdict channel never leaks catalog existence.

use crate::game::level::LevelRef;
use crate::game::matcher::is_title_match;
use crate::game::normalizer::normalize_title;
use tunequiz_common::Database;

pub struct AnswerValidator {
    db: Database,
}

impl AnswerValidator {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Validate a raw guess against the canonical title of `level_id`.
    /// Never errors: every failure mode collapses to `false`.
    pub async fn validate(&self, level_id: &str, raw_guess: &str) -> bool {
        let level: LevelRef = match level_id.parse() {
            Ok(level) => level,
            Err(_) => return false,
        };

        let canonical = match self.canonical_title(&level).await {
            Some(title) => title,
            None => return false,
        };

        let guess = normalize_title(raw_guess);
        let title = normalize_title(&canonical);
        if title.is_empty() {
            return false;
        }

        let correct = is_title_match(&guess, &title);
        tracing::debug!(level = %level, correct, "Guess validated");
        correct
    }

    /// Canonical title via the same source-selection rule as resolution,
    /// but reading only the stored title field. A provider level whose
    /// metadata has not been cache-filled yet has no title to compare.
    async fn canonical_title(&self, level: &LevelRef) -> Option<String> {
        match level {
            LevelRef::Local(index) => self
                .db
                .local_song_by_level(*index)
                .await
                .ok()
                .flatten()
                .map(|song| song.title),
            LevelRef::Provider(_) | LevelRef::Daily => {
                let index = level.provider_index()?;
                self.db.provider_title_by_level(index).await.ok().flatten()
            }
        }
    }
}
