//! tunequiz-server library
//!
//! Song-guessing game backend: per-level song metadata from a local guest
//! catalog or a lazily-filled provider cache, fuzzy answer validation,
//! score tracking, and daily-challenge rotation.

pub mod api;
pub mod game;
pub mod services;

use axum::routing::{get, post, put};
use axum::Router;
use services::provider::TrackProvider;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tunequiz_common::config::Settings;
use tunequiz_common::credentials::CredentialManager;
use tunequiz_common::Database;

/// Bundled guest catalog (levels 1-10)
pub const LOCAL_SONGS_JSON: &str = include_str!("../assets/local_songs.json");
/// Provider track id / level placeholder pairs
pub const PROVIDER_LEVELS_JSON: &str = include_str!("../assets/provider_levels.json");
/// Daily-challenge candidate pool
pub const DAILY_POOL_JSON: &str = include_str!("../assets/daily_pool.json");

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Backing store for songs and players
    pub db: Database,
    /// Token issue/verify collaborator
    pub credentials: Arc<CredentialManager>,
    /// Music-provider collaborator
    pub provider: Arc<dyn TrackProvider>,
    pub settings: Arc<Settings>,
}

impl AppState {
    pub fn new(
        db: Database,
        credentials: CredentialManager,
        provider: Arc<dyn TrackProvider>,
        settings: Settings,
    ) -> Self {
        Self {
            db,
            credentials: Arc::new(credentials),
            provider,
            settings: Arc::new(settings),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(api::health))
        // Accounts
        .route("/api/v1/auth/register", post(api::users::register))
        .route("/api/v1/auth/login", post(api::users::login))
        .route("/api/v1/auth/me", get(api::users::me))
        .route("/api/v1/auth/update-profile", put(api::users::update_profile))
        // Provider authorization
        .route("/api/v1/provider/client-id", get(api::provider::client_id))
        .route("/api/v1/provider/token", post(api::provider::exchange_token))
        .route("/api/v1/provider/refresh", post(api::provider::refresh_token))
        // Gameplay
        .route("/api/v1/songs/:level_id", get(api::game::level_song))
        .route("/api/v1/game/validate", post(api::game::validate_answer))
        .route("/api/v1/game/reveal", post(api::game::reveal))
        .route("/api/v1/game/submit-score", post(api::game::submit_score))
        .route(
            "/api/v1/game/mark-level-played",
            post(api::game::mark_level_played),
        )
        .route("/api/v1/game/daily", get(api::game::daily_status))
        .route("/api/v1/game/daily/complete", post(api::game::complete_daily))
        .route("/api/v1/ranking", get(api::game::ranking))
        .with_state(state)
        // Browser front end runs on a different origin
        .layer(CorsLayer::permissive())
}
