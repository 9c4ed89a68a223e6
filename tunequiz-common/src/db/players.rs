//! Player persistence
//!
//! The domain model keeps level sets as `BTreeSet<String>`; the comma-joined
//! encoding exists only here, at the storage boundary.

use super::models::{join_levels, split_levels, Player, RankingEntry};
use super::Database;
use crate::Result;

const PLAYER_COLUMNS: &str = "username, email, password_hash, is_active, total_score, \
     completed_levels, played_levels, last_daily_completed, \
     provider_client_id, provider_client_secret, \
     provider_access_token, provider_refresh_token, provider_token_expires_at";

type PlayerRow = (
    String,         // username
    String,         // email
    String,         // password_hash
    bool,           // is_active
    i64,            // total_score
    String,         // completed_levels
    String,         // played_levels
    Option<String>, // last_daily_completed
    Option<String>, // provider_client_id
    Option<String>, // provider_client_secret
    Option<String>, // provider_access_token
    Option<String>, // provider_refresh_token
    Option<i64>,    // provider_token_expires_at
);

fn row_to_player(row: PlayerRow) -> Player {
    let (
        username,
        email,
        password_hash,
        is_active,
        total_score,
        completed_levels,
        played_levels,
        last_daily_completed,
        provider_client_id,
        provider_client_secret,
        provider_access_token,
        provider_refresh_token,
        provider_token_expires_at,
    ) = row;
    Player {
        username,
        email,
        password_hash,
        is_active,
        total_score,
        completed_levels: split_levels(&completed_levels),
        played_levels: split_levels(&played_levels),
        last_daily_completed,
        provider_client_id,
        provider_client_secret,
        provider_access_token,
        provider_refresh_token,
        provider_token_expires_at,
    }
}

impl Database {
    /// Insert a new player record
    pub async fn create_player(&self, player: &Player) -> Result<()> {
        sqlx::query(
            "INSERT INTO players \
             (username, email, password_hash, is_active, total_score, \
              completed_levels, played_levels, last_daily_completed, \
              provider_client_id, provider_client_secret) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&player.username)
        .bind(&player.email)
        .bind(&player.password_hash)
        .bind(player.is_active)
        .bind(player.total_score)
        .bind(join_levels(&player.completed_levels))
        .bind(join_levels(&player.played_levels))
        .bind(&player.last_daily_completed)
        .bind(&player.provider_client_id)
        .bind(&player.provider_client_secret)
        .execute(self.pool())
        .await?;

        tracing::info!(username = %player.username, "Player created");
        Ok(())
    }

    pub async fn player_by_username(&self, username: &str) -> Result<Option<Player>> {
        let row: Option<PlayerRow> = sqlx::query_as(&format!(
            "SELECT {} FROM players WHERE username = ?",
            PLAYER_COLUMNS
        ))
        .bind(username)
        .fetch_optional(self.pool())
        .await?;

        Ok(row.map(row_to_player))
    }

    pub async fn player_by_email(&self, email: &str) -> Result<Option<Player>> {
        let row: Option<PlayerRow> = sqlx::query_as(&format!(
            "SELECT {} FROM players WHERE email = ?",
            PLAYER_COLUMNS
        ))
        .bind(email)
        .fetch_optional(self.pool())
        .await?;

        Ok(row.map(row_to_player))
    }

    /// Look up the owner of a provider client id (OAuth callback path)
    pub async fn player_by_client_id(&self, client_id: &str) -> Result<Option<Player>> {
        let row: Option<PlayerRow> = sqlx::query_as(&format!(
            "SELECT {} FROM players WHERE provider_client_id = ? LIMIT 1",
            PLAYER_COLUMNS
        ))
        .bind(client_id)
        .fetch_optional(self.pool())
        .await?;

        Ok(row.map(row_to_player))
    }

    /// Persist the full player record, keyed by username
    pub async fn save_player(&self, player: &Player) -> Result<()> {
        sqlx::query(
            "UPDATE players SET email = ?, password_hash = ?, is_active = ?, \
             total_score = ?, completed_levels = ?, played_levels = ?, \
             last_daily_completed = ?, provider_client_id = ?, \
             provider_client_secret = ?, provider_access_token = ?, \
             provider_refresh_token = ?, provider_token_expires_at = ? \
             WHERE username = ?",
        )
        .bind(&player.email)
        .bind(&player.password_hash)
        .bind(player.is_active)
        .bind(player.total_score)
        .bind(join_levels(&player.completed_levels))
        .bind(join_levels(&player.played_levels))
        .bind(&player.last_daily_completed)
        .bind(&player.provider_client_id)
        .bind(&player.provider_client_secret)
        .bind(&player.provider_access_token)
        .bind(&player.provider_refresh_token)
        .bind(player.provider_token_expires_at)
        .bind(&player.username)
        .execute(self.pool())
        .await?;

        Ok(())
    }

    /// Rename and/or change the password hash of an existing player
    pub async fn update_player_credentials(
        &self,
        current_username: &str,
        new_username: Option<&str>,
        new_password_hash: Option<&str>,
    ) -> Result<()> {
        match (new_username, new_password_hash) {
            (Some(username), Some(hash)) => {
                sqlx::query(
                    "UPDATE players SET username = ?, password_hash = ? WHERE username = ?",
                )
                .bind(username)
                .bind(hash)
                .bind(current_username)
                .execute(self.pool())
                .await?;
            }
            (Some(username), None) => {
                sqlx::query("UPDATE players SET username = ? WHERE username = ?")
                    .bind(username)
                    .bind(current_username)
                    .execute(self.pool())
                    .await?;
            }
            (None, Some(hash)) => {
                sqlx::query("UPDATE players SET password_hash = ? WHERE username = ?")
                    .bind(hash)
                    .bind(current_username)
                    .execute(self.pool())
                    .await?;
            }
            (None, None) => {}
        }
        Ok(())
    }

    /// Top players by score, completed sets projected to their cardinality
    pub async fn top_players_by_score(&self, limit: i64) -> Result<Vec<RankingEntry>> {
        let rows: Vec<(String, i64, String)> = sqlx::query_as(
            "SELECT username, total_score, completed_levels FROM players \
             WHERE is_active = 1 ORDER BY total_score DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(self.pool())
        .await?;

        Ok(rows
            .into_iter()
            .map(|(username, total_score, completed)| RankingEntry {
                username,
                total_score,
                levels_completed: split_levels(&completed).len(),
            })
            .collect())
    }

    /// Store a fresh provider token grant for a player
    pub async fn save_provider_tokens(
        &self,
        username: &str,
        access_token: &str,
        refresh_token: Option<&str>,
        expires_in: i64,
    ) -> Result<()> {
        let expires_at = chrono::Utc::now().timestamp() + expires_in;
        sqlx::query(
            "UPDATE players SET provider_access_token = ?, \
             provider_refresh_token = COALESCE(?, provider_refresh_token), \
             provider_token_expires_at = ? WHERE username = ?",
        )
        .bind(access_token)
        .bind(refresh_token)
        .bind(expires_at)
        .bind(username)
        .execute(self.pool())
        .await?;

        tracing::debug!(username = %username, expires_at, "Provider tokens stored");
        Ok(())
    }

    /// Unexpired provider access token for a player, if one is on file
    pub async fn provider_access_token(&self, username: &str) -> Result<Option<String>> {
        let row: Option<(Option<String>, Option<i64>)> = sqlx::query_as(
            "SELECT provider_access_token, provider_token_expires_at \
             FROM players WHERE username = ?",
        )
        .bind(username)
        .fetch_optional(self.pool())
        .await?;

        let now = chrono::Utc::now().timestamp();
        Ok(row.and_then(|(token, expires_at)| match (token, expires_at) {
            (Some(token), Some(expires_at)) if expires_at > now => Some(token),
            _ => None,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn setup() -> (Database, Player) {
        let db = Database::open_in_memory().await.unwrap();
        let player = Player::new("alice", "alice@example.com", "phc-hash");
        db.create_player(&player).await.unwrap();
        (db, player)
    }

    #[tokio::test]
    async fn create_and_fetch_round_trip() {
        let (db, _) = setup().await;

        let stored = db.player_by_username("alice").await.unwrap().unwrap();
        assert_eq!(stored.email, "alice@example.com");
        assert!(stored.is_active);
        assert_eq!(stored.total_score, 0);
        assert!(stored.played_levels.is_empty());

        let by_email = db.player_by_email("alice@example.com").await.unwrap();
        assert!(by_email.is_some());
        assert!(db.player_by_username("bob").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn save_persists_level_sets_and_score() {
        let (db, mut player) = setup().await;

        player.complete_level("3_local");
        player.mark_played("7");
        player.add_score(150);
        player.complete_daily();
        db.save_player(&player).await.unwrap();

        let stored = db.player_by_username("alice").await.unwrap().unwrap();
        assert_eq!(stored.total_score, 150);
        assert!(stored.completed_levels.contains("3_local"));
        assert!(stored.played_levels.contains("7"));
        assert!(stored.is_daily_completed_today());
    }

    #[tokio::test]
    async fn duplicate_username_is_rejected_by_the_store() {
        let (db, player) = setup().await;
        let mut duplicate = player.clone();
        duplicate.email = "other@example.com".to_string();
        assert!(db.create_player(&duplicate).await.is_err());
    }

    #[tokio::test]
    async fn rename_moves_the_record() {
        let (db, _) = setup().await;

        db.update_player_credentials("alice", Some("alicia"), None)
            .await
            .unwrap();

        assert!(db.player_by_username("alice").await.unwrap().is_none());
        let renamed = db.player_by_username("alicia").await.unwrap().unwrap();
        assert_eq!(renamed.email, "alice@example.com");
    }

    #[tokio::test]
    async fn ranking_orders_by_score_and_counts_levels() {
        let db = Database::open_in_memory().await.unwrap();
        for (name, score, completed) in [
            ("alice", 300, "1_local,2_local,7"),
            ("bob", 500, "1_local"),
            ("carol", 100, ""),
        ] {
            let mut player = Player::new(name, format!("{}@example.com", name), "hash");
            player.total_score = score;
            player.completed_levels = split_levels(completed);
            db.create_player(&player).await.unwrap();
            db.save_player(&player).await.unwrap();
        }

        let ranking = db.top_players_by_score(2).await.unwrap();
        assert_eq!(ranking.len(), 2);
        assert_eq!(ranking[0].username, "bob");
        assert_eq!(ranking[0].levels_completed, 1);
        assert_eq!(ranking[1].username, "alice");
        assert_eq!(ranking[1].levels_completed, 3);
    }

    #[tokio::test]
    async fn provider_token_expiry_is_enforced() {
        let (db, _) = setup().await;

        // No token on file
        assert!(db.provider_access_token("alice").await.unwrap().is_none());

        // Fresh token
        db.save_provider_tokens("alice", "access-1", Some("refresh-1"), 3600)
            .await
            .unwrap();
        assert_eq!(
            db.provider_access_token("alice").await.unwrap().as_deref(),
            Some("access-1")
        );

        // Expired token
        db.save_provider_tokens("alice", "access-2", None, -60)
            .await
            .unwrap();
        assert!(db.provider_access_token("alice").await.unwrap().is_none());

        // Refresh token survived the COALESCE
        let stored = db.player_by_username("alice").await.unwrap().unwrap();
        assert_eq!(stored.provider_refresh_token.as_deref(), Some("refresh-1"));
    }
}
