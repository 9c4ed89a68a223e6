//! Bearer authentication helpers
//!
//! Handlers pull the verified player out of the `Authorization` header via
//! these helpers; token mechanics stay in the credential manager.

use crate::AppState;
use axum::http::{header, HeaderMap};
use tunequiz_common::credentials::bearer_token;
use tunequiz_common::db::Player;
use tunequiz_common::{Error, Result};

/// Resolve the authenticated player or fail with the taxonomy error the
/// situation calls for: `Unauthorized` when no usable header is present,
/// `InvalidCredential` when the token fails verification.
pub async fn require_player(state: &AppState, headers: &HeaderMap) -> Result<Player> {
    let header_value = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| Error::Unauthorized("Bearer token required".to_string()))?;

    let token = bearer_token(header_value)?;
    let claims = state.credentials.verify(token)?;

    state
        .db
        .player_by_username(&claims.sub)
        .await?
        .ok_or_else(|| Error::InvalidCredential("Unknown player".to_string()))
}

/// Like [`require_player`], but absence of credentials is not an error.
/// A present-but-invalid token still fails: a client that sends a token
/// expects it to count.
pub async fn optional_player(state: &AppState, headers: &HeaderMap) -> Result<Option<Player>> {
    if headers.get(header::AUTHORIZATION).is_none() {
        return Ok(None);
    }
    require_player(state, headers).await.map(Some)
}
