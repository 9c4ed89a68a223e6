//! Gameplay endpoints
//!
//! Song payloads follow the exposure rule: the hint view (no title, no
//! artists) is what a guesser sees; the full view only goes out on an
//! explicit reveal. Guess verdicts are plain booleans.

use crate::api::auth::{optional_player, require_player};
use crate::api::error::ApiResult;
use crate::game::{AnswerValidator, CatalogResolver, LevelRef, ProgressTracker};
use crate::AppState;
use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::{Deserialize, Serialize};
use tunequiz_common::db::{RankingEntry, SongView};

#[derive(Debug, Deserialize)]
pub struct GuessRequest {
    pub level_id: String,
    pub answer: String,
}

#[derive(Debug, Serialize)]
pub struct GuessResponse {
    pub correct: bool,
}

#[derive(Debug, Deserialize)]
pub struct LevelRequest {
    pub level_id: String,
}

#[derive(Debug, Deserialize)]
pub struct ScoreRequest {
    pub level_id: String,
    pub score: i64,
}

#[derive(Debug, Serialize)]
pub struct ScoreResponse {
    pub total_score: i64,
}

#[derive(Debug, Serialize)]
pub struct SongResponse {
    pub song: SongView,
    pub source: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct RankingQuery {
    #[serde(default = "default_ranking_limit")]
    pub limit: i64,
}

fn default_ranking_limit() -> i64 {
    10
}

#[derive(Debug, Serialize)]
pub struct RankingResponse {
    pub ranking: Vec<RankingEntry>,
}

#[derive(Debug, Serialize)]
pub struct DailyStatusResponse {
    pub completed_today: bool,
}

/// GET /api/v1/songs/:level_id
///
/// Resolve a level and return its hint view. Guests reach local levels
/// only; provider-backed levels require a bearer token and cache-fill on
/// first access.
pub async fn level_song(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(level_id): Path<String>,
) -> ApiResult<Json<SongResponse>> {
    let level: LevelRef = level_id.parse()?;
    let requester = optional_player(&state, &headers).await?;

    let resolver = CatalogResolver::new(state.db.clone(), state.provider.clone());
    let song = resolver
        .resolve_level_song(&level, requester.as_ref())
        .await?;

    Ok(Json(SongResponse {
        source: song.source.as_str(),
        song: song.hint_view(),
    }))
}

/// POST /api/v1/game/validate
///
/// Always 200 with a boolean verdict; a missing level is indistinguishable
/// from a wrong guess.
pub async fn validate_answer(
    State(state): State<AppState>,
    Json(request): Json<GuessRequest>,
) -> Json<GuessResponse> {
    let validator = AnswerValidator::new(state.db.clone());
    let correct = validator.validate(&request.level_id, &request.answer).await;
    Json(GuessResponse { correct })
}

/// POST /api/v1/game/reveal
///
/// Explicitly expose the full (answer-including) view. Records a played
/// attempt for authenticated players so a revealed level cannot be scored
/// afterwards.
pub async fn reveal(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<LevelRequest>,
) -> ApiResult<Json<SongResponse>> {
    let level: LevelRef = request.level_id.parse()?;
    let mut requester = optional_player(&state, &headers).await?;

    let resolver = CatalogResolver::new(state.db.clone(), state.provider.clone());
    let song = resolver
        .resolve_level_song(&level, requester.as_ref())
        .await?;

    if let Some(player) = requester.as_mut() {
        let tracker = ProgressTracker::new(state.db.clone());
        tracker.mark_played(player, &request.level_id).await?;
    }

    Ok(Json(SongResponse {
        source: song.source.as_str(),
        song: song.full_view(),
    }))
}

/// POST /api/v1/game/submit-score
pub async fn submit_score(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<ScoreRequest>,
) -> ApiResult<Json<ScoreResponse>> {
    let mut player = require_player(&state, &headers).await?;

    let tracker = ProgressTracker::new(state.db.clone());
    let total_score = tracker
        .submit_score(&mut player, &request.level_id, request.score)
        .await?;

    Ok(Json(ScoreResponse { total_score }))
}

/// POST /api/v1/game/mark-level-played
pub async fn mark_level_played(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<LevelRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    let mut player = require_player(&state, &headers).await?;

    let tracker = ProgressTracker::new(state.db.clone());
    tracker.mark_played(&mut player, &request.level_id).await?;

    Ok(Json(serde_json::json!({ "message": "Level marked as played" })))
}

/// POST /api/v1/game/daily/complete
pub async fn complete_daily(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<DailyStatusResponse>> {
    let mut player = require_player(&state, &headers).await?;

    let tracker = ProgressTracker::new(state.db.clone());
    tracker.complete_daily(&mut player).await?;

    Ok(Json(DailyStatusResponse {
        completed_today: player.is_daily_completed_today(),
    }))
}

/// GET /api/v1/game/daily
pub async fn daily_status(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<DailyStatusResponse>> {
    let player = require_player(&state, &headers).await?;
    Ok(Json(DailyStatusResponse {
        completed_today: player.is_daily_completed_today(),
    }))
}

/// GET /api/v1/ranking?limit=
pub async fn ranking(
    State(state): State<AppState>,
    Query(query): Query<RankingQuery>,
) -> ApiResult<Json<RankingResponse>> {
    let limit = query.limit.clamp(1, 100);
    let tracker = ProgressTracker::new(state.db.clone());
    let ranking = tracker.ranking(limit).await?;
    Ok(Json(RankingResponse { ranking }))
}
