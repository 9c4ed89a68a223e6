//! Music-provider authorization endpoints
//!
//! Players bring their own provider client credentials at registration;
//! these endpoints drive the OAuth code exchange and token refresh against
//! the provider on their behalf and persist the resulting grants.

use crate::api::auth::require_player;
use crate::api::error::ApiResult;
use crate::AppState;
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tunequiz_common::Error;

#[derive(Debug, Deserialize)]
pub struct ClientIdQuery {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct TokenExchangeRequest {
    pub code: String,
    pub client_id: String,
}

#[derive(Debug, Serialize)]
pub struct TokenExchangeResponse {
    pub access_token: String,
    pub expires_in: i64,
}

/// GET /api/v1/provider/client-id?email=
///
/// OAuth bootstrap before login: the front end needs the stored client id
/// to build the provider authorization URL.
pub async fn client_id(
    State(state): State<AppState>,
    Query(query): Query<ClientIdQuery>,
) -> ApiResult<Json<Value>> {
    if query.email.trim().is_empty() {
        return Err(Error::BadRequest("Email required".to_string()).into());
    }

    let player = state
        .db
        .player_by_email(&query.email.trim().to_lowercase())
        .await?;

    match player.and_then(|p| p.provider_client_id) {
        Some(client_id) => Ok(Json(json!({ "client_id": client_id }))),
        None => Err(Error::NotFound(
            "No provider credentials on file for this account".to_string(),
        )
        .into()),
    }
}

/// POST /api/v1/provider/token
///
/// Exchange an authorization code for a token grant and persist it for the
/// owning player (looked up by client id, matching the callback flow).
pub async fn exchange_token(
    State(state): State<AppState>,
    Json(request): Json<TokenExchangeRequest>,
) -> ApiResult<Json<TokenExchangeResponse>> {
    if request.code.is_empty() || request.client_id.is_empty() {
        return Err(Error::BadRequest("code and client_id are required".to_string()).into());
    }

    let player = state
        .db
        .player_by_client_id(&request.client_id)
        .await?
        .ok_or_else(|| Error::NotFound("Unknown provider client id".to_string()))?;

    let client_secret = player
        .provider_client_secret
        .as_deref()
        .ok_or_else(|| Error::Forbidden("No provider client secret on file".to_string()))?;

    let grant = state
        .provider
        .exchange_authorization_code(
            &request.code,
            &request.client_id,
            client_secret,
            &state.settings.provider_redirect_uri,
        )
        .await
        .map_err(|e| Error::BadRequest(format!("Authorization exchange failed: {}", e)))?;

    state
        .db
        .save_provider_tokens(
            &player.username,
            &grant.access_token,
            grant.refresh_token.as_deref(),
            grant.expires_in,
        )
        .await?;

    tracing::info!(username = %player.username, "Provider authorization completed");
    Ok(Json(TokenExchangeResponse {
        access_token: grant.access_token,
        expires_in: grant.expires_in,
    }))
}

/// POST /api/v1/provider/refresh
///
/// Refresh the authenticated player's access token from the stored refresh
/// token.
pub async fn refresh_token(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<TokenExchangeResponse>> {
    let player = require_player(&state, &headers).await?;

    let refresh = player
        .provider_refresh_token
        .as_deref()
        .ok_or_else(|| Error::Forbidden("No refresh token on file".to_string()))?;
    let client_id = player
        .provider_client_id
        .as_deref()
        .ok_or_else(|| Error::Forbidden("No provider client id on file".to_string()))?;
    let client_secret = player
        .provider_client_secret
        .as_deref()
        .ok_or_else(|| Error::Forbidden("No provider client secret on file".to_string()))?;

    let grant = state
        .provider
        .refresh_access_token(refresh, client_id, client_secret)
        .await
        .map_err(|e| Error::Provider(format!("Token refresh failed: {}", e)))?;

    state
        .db
        .save_provider_tokens(
            &player.username,
            &grant.access_token,
            grant.refresh_token.as_deref(),
            grant.expires_in,
        )
        .await?;

    Ok(Json(TokenExchangeResponse {
        access_token: grant.access_token,
        expires_in: grant.expires_in,
    }))
}
