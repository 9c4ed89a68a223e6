//! Account endpoints: registration, login, profile

use crate::api::auth::require_player;
use crate::api::error::ApiResult;
use crate::AppState;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::{Deserialize, Serialize};
use tunequiz_common::credentials::{hash_password, verify_password};
use tunequiz_common::db::{Player, PublicProfile};
use tunequiz_common::Error;

const MIN_USERNAME_LEN: usize = 3;
const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub password_confirm: String,
    pub provider_client_id: String,
    pub provider_client_secret: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub player: PublicProfile,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub player: PublicProfile,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_type: Option<&'static str>,
}

fn validate_username(username: &str) -> Result<(), Error> {
    if username.len() < MIN_USERNAME_LEN {
        return Err(Error::BadRequest(format!(
            "Username must be at least {} characters",
            MIN_USERNAME_LEN
        )));
    }
    Ok(())
}

fn validate_password(password: &str) -> Result<(), Error> {
    if password.len() < MIN_PASSWORD_LEN {
        return Err(Error::BadRequest(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

fn validate_email(email: &str) -> Result<(), Error> {
    if !email.contains('@') || !email.contains('.') {
        return Err(Error::BadRequest("Invalid email".to_string()));
    }
    Ok(())
}

/// POST /api/v1/auth/register
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<SessionResponse>)> {
    let username = request.username.trim().to_string();
    let email = request.email.trim().to_lowercase();
    let client_id = request.provider_client_id.trim().to_string();
    let client_secret = request.provider_client_secret.trim().to_string();

    validate_username(&username)?;
    validate_email(&email)?;
    if request.password != request.password_confirm {
        return Err(Error::BadRequest("Passwords do not match".to_string()).into());
    }
    validate_password(&request.password)?;
    if client_id.is_empty() {
        return Err(Error::BadRequest("Provider client id is required".to_string()).into());
    }
    if client_secret.is_empty() {
        return Err(Error::BadRequest("Provider client secret is required".to_string()).into());
    }

    if state.db.player_by_username(&username).await?.is_some() {
        return Err(Error::Conflict("Username already taken".to_string()).into());
    }
    if state.db.player_by_email(&email).await?.is_some() {
        return Err(Error::Conflict("Email already registered".to_string()).into());
    }

    let mut player = Player::new(username, email, hash_password(&request.password)?);
    player.provider_client_id = Some(client_id);
    player.provider_client_secret = Some(client_secret);
    state.db.create_player(&player).await?;

    let access_token = state.credentials.issue(&player.username, &player.email)?;
    Ok((
        StatusCode::CREATED,
        Json(SessionResponse {
            access_token,
            token_type: "bearer",
            player: player.public_profile(),
        }),
    ))
}

/// POST /api/v1/auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> ApiResult<Json<SessionResponse>> {
    let email = request.email.trim().to_lowercase();

    let player = state
        .db
        .player_by_email(&email)
        .await?
        .filter(|player| verify_password(&request.password, &player.password_hash))
        .ok_or_else(|| Error::InvalidCredential("Invalid email or password".to_string()))?;

    let access_token = state.credentials.issue(&player.username, &player.email)?;
    Ok(Json(SessionResponse {
        access_token,
        token_type: "bearer",
        player: player.public_profile(),
    }))
}

/// GET /api/v1/auth/me
pub async fn me(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<PublicProfile>> {
    let player = require_player(&state, &headers).await?;
    Ok(Json(player.public_profile()))
}

/// PUT /api/v1/auth/update-profile
///
/// Optional username rename and/or password change. A rename invalidates
/// the presented token's subject, so a fresh token rides along.
pub async fn update_profile(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<UpdateProfileRequest>,
) -> ApiResult<Json<ProfileResponse>> {
    let player = require_player(&state, &headers).await?;

    let new_username = request
        .username
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty());
    let new_password = request.password.as_deref().filter(|pwd| !pwd.is_empty());

    if new_username.is_none() && new_password.is_none() {
        return Err(Error::BadRequest("Nothing to update".to_string()).into());
    }
    if let Some(username) = new_username {
        validate_username(username)?;
        if username != player.username
            && state.db.player_by_username(username).await?.is_some()
        {
            return Err(Error::Conflict("Username already taken".to_string()).into());
        }
    }
    if let Some(password) = new_password {
        validate_password(password)?;
    }

    let new_hash = match new_password {
        Some(password) => Some(hash_password(password)?),
        None => None,
    };
    state
        .db
        .update_player_credentials(&player.username, new_username, new_hash.as_deref())
        .await?;

    let effective_username = new_username.unwrap_or(&player.username);
    let updated = state
        .db
        .player_by_username(effective_username)
        .await?
        .ok_or_else(|| Error::Internal("Updated player vanished".to_string()))?;

    let (access_token, token_type) = if new_username.is_some() {
        let token = state.credentials.issue(&updated.username, &updated.email)?;
        (Some(token), Some("bearer"))
    } else {
        (None, None)
    };

    Ok(Json(ProfileResponse {
        player: updated.public_profile(),
        access_token,
        token_type,
    }))
}
