//! Player progress tracking
//!
//! Per (player, level) the state machine is Unplayed -> Played ->
//! Completed. Scoring is one-shot per level; the daily level additionally
//! stamps the completion date. Score deltas are accepted as sent; callers
//! own their plausibility.

use tunequiz_common::db::{Player, RankingEntry};
use tunequiz_common::{Database, Error, Result};

/// Wire token of the daily level, as it appears in level sets
pub const DAILY_LEVEL_TOKEN: &str = "0";

pub struct ProgressTracker {
    db: Database,
}

impl ProgressTracker {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Record a scoring completion for a level.
    ///
    /// Rejected with `Conflict` when the player already has an attempt on
    /// file for this level; the check runs before any mutation, so a
    /// replayed submission leaves the record untouched. Returns the
    /// updated total score.
    pub async fn submit_score(
        &self,
        player: &mut Player,
        level_id: &str,
        score: i64,
    ) -> Result<i64> {
        if player.has_played(level_id) {
            return Err(Error::Conflict(format!("Level {} already played", level_id)));
        }

        player.complete_level(level_id);
        player.add_score(score);
        if level_id == DAILY_LEVEL_TOKEN {
            player.complete_daily();
        }

        self.db.save_player(player).await?;

        tracing::info!(
            username = %player.username,
            level = %level_id,
            score,
            total = player.total_score,
            "Score recorded"
        );
        Ok(player.total_score)
    }

    /// Record an attempt without awarding score (reveal or skip).
    /// Idempotent.
    pub async fn mark_played(&self, player: &mut Player, level_id: &str) -> Result<()> {
        player.mark_played(level_id);
        self.db.save_player(player).await?;
        Ok(())
    }

    /// Stamp today's daily completion without touching the score
    pub async fn complete_daily(&self, player: &mut Player) -> Result<()> {
        player.complete_daily();
        self.db.save_player(player).await?;
        Ok(())
    }

    /// Top `limit` players by total score, completed sets projected to
    /// their count
    pub async fn ranking(&self, limit: i64) -> Result<Vec<RankingEntry>> {
        self.db.top_players_by_score(limit).await
    }
}
