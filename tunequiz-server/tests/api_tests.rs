//! Integration tests for the tunequiz HTTP API
//!
//! Drives the full router against an in-memory database and a seeded
//! provider double; no network traffic.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tower::util::ServiceExt; // for `oneshot`
use tunequiz_common::config::Settings;
use tunequiz_common::credentials::CredentialManager;
use tunequiz_common::Database;
use tunequiz_server::services::provider::{
    ArtistRef, ProviderError, TokenGrant, TrackInfo, TrackProvider,
};
use tunequiz_server::{build_router, AppState};

/// Provider double: serves one fixed track and counts metadata fetches
#[derive(Default)]
struct StubProvider {
    fetches: AtomicUsize,
}

#[async_trait]
impl TrackProvider for StubProvider {
    async fn fetch_track(
        &self,
        _track_id: &str,
        _access_token: &str,
    ) -> Result<TrackInfo, ProviderError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Ok(TrackInfo {
            title: "Mr. Brightside".to_string(),
            artists: vec![ArtistRef {
                id: "artist-1".to_string(),
                name: "The Killers".to_string(),
            }],
            album: "Hot Fuss".to_string(),
            release_year: 2004,
            image_url: "https://images.example/hot-fuss.jpg".to_string(),
        })
    }

    async fn fetch_artist_genres(
        &self,
        _artist_id: &str,
        _access_token: &str,
    ) -> Result<Vec<String>, ProviderError> {
        Ok(vec!["Rock".to_string()])
    }

    async fn fetch_preview_audio(&self, _track_id: &str) -> Option<String> {
        Some("https://cdn.example/preview.mp3".to_string())
    }

    async fn exchange_authorization_code(
        &self,
        code: &str,
        _client_id: &str,
        _client_secret: &str,
        _redirect_uri: &str,
    ) -> Result<TokenGrant, ProviderError> {
        if code == "bad-code" {
            return Err(ProviderError::Api(400, "invalid_grant".to_string()));
        }
        Ok(TokenGrant {
            access_token: "granted-access".to_string(),
            refresh_token: Some("granted-refresh".to_string()),
            expires_in: 3600,
        })
    }

    async fn refresh_access_token(
        &self,
        _refresh_token: &str,
        _client_id: &str,
        _client_secret: &str,
    ) -> Result<TokenGrant, ProviderError> {
        Ok(TokenGrant {
            access_token: "refreshed-access".to_string(),
            refresh_token: None,
            expires_in: 3600,
        })
    }
}

/// Test helper: in-memory state with seeded catalogs and the stub provider
async fn setup_state(provider: Arc<StubProvider>) -> AppState {
    let db = Database::open_in_memory().await.unwrap();
    db.seed_local_songs(tunequiz_server::LOCAL_SONGS_JSON)
        .await
        .unwrap();
    db.seed_provider_levels(tunequiz_server::PROVIDER_LEVELS_JSON)
        .await
        .unwrap();

    AppState::new(
        db,
        CredentialManager::new("test-secret", 24),
        provider,
        Settings::default(),
    )
}

async fn setup_app() -> (axum::Router, AppState) {
    let state = setup_state(Arc::new(StubProvider::default())).await;
    (build_router(state.clone()), state)
}

fn get_request(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

fn json_request(method: &str, uri: &str, body: &Value, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    builder
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap()
}

async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}

/// Register a player and return their bearer token
async fn register_player(app: &axum::Router, username: &str) -> String {
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/auth/register",
            &json!({
                "username": username,
                "email": format!("{}@example.com", username),
                "password": "secret99",
                "password_confirm": "secret99",
                "provider_client_id": format!("{}-client-id", username),
                "provider_client_secret": format!("{}-client-secret", username),
            }),
            None,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = extract_json(response.into_body()).await;
    body["access_token"].as_str().unwrap().to_string()
}

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn health_endpoint_needs_no_auth() {
    let (app, _) = setup_app().await;

    let response = app.oneshot(get_request("/health", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "tunequiz-server");
    assert!(body["version"].is_string());
}

// =============================================================================
// Accounts
// =============================================================================

#[tokio::test]
async fn register_login_me_flow() {
    let (app, _) = setup_app().await;

    let token = register_player(&app, "alice").await;

    // me with the registration token
    let response = app
        .clone()
        .oneshot(get_request("/api/v1/auth/me", Some(&token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["username"], "alice");
    assert_eq!(body["total_score"], 0);
    assert_eq!(body["daily_completed"], false);

    // fresh login
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/auth/login",
            &json!({"email": "alice@example.com", "password": "secret99"}),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["token_type"], "bearer");
    assert!(body["access_token"].is_string());
}

#[tokio::test]
async fn register_rejects_bad_input() {
    let (app, _) = setup_app().await;

    let cases = [
        json!({"username": "al", "email": "a@b.com", "password": "secret99",
               "password_confirm": "secret99", "provider_client_id": "x",
               "provider_client_secret": "y"}),
        json!({"username": "alice", "email": "not-an-email", "password": "secret99",
               "password_confirm": "secret99", "provider_client_id": "x",
               "provider_client_secret": "y"}),
        json!({"username": "alice", "email": "a@b.com", "password": "secret99",
               "password_confirm": "different", "provider_client_id": "x",
               "provider_client_secret": "y"}),
        json!({"username": "alice", "email": "a@b.com", "password": "short",
               "password_confirm": "short", "provider_client_id": "x",
               "provider_client_secret": "y"}),
        json!({"username": "alice", "email": "a@b.com", "password": "secret99",
               "password_confirm": "secret99", "provider_client_id": "",
               "provider_client_secret": "y"}),
    ];

    for payload in &cases {
        let response = app
            .clone()
            .oneshot(json_request("POST", "/api/v1/auth/register", payload, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "payload {}", payload);
    }
}

#[tokio::test]
async fn duplicate_registration_conflicts() {
    let (app, _) = setup_app().await;
    register_player(&app, "alice").await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/auth/register",
            &json!({
                "username": "alice",
                "email": "alice2@example.com",
                "password": "secret99",
                "password_confirm": "secret99",
                "provider_client_id": "x",
                "provider_client_secret": "y",
            }),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn login_with_wrong_password_is_unauthorized() {
    let (app, _) = setup_app().await;
    register_player(&app, "alice").await;

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/v1/auth/login",
            &json!({"email": "alice@example.com", "password": "wrong-password"}),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn profile_rename_returns_fresh_token() {
    let (app, _) = setup_app().await;
    let token = register_player(&app, "alice").await;

    let response = app
        .clone()
        .oneshot(json_request(
            "PUT",
            "/api/v1/auth/update-profile",
            &json!({"username": "alicia"}),
            Some(&token),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["player"]["username"], "alicia");
    let new_token = body["access_token"].as_str().unwrap();

    // Old subject is gone; the fresh token works
    let response = app
        .clone()
        .oneshot(get_request("/api/v1/auth/me", Some(new_token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

// =============================================================================
// Song serving and the exposure rule
// =============================================================================

#[tokio::test]
async fn local_level_serves_hint_view_to_guests() {
    let (app, _) = setup_app().await;

    let response = app
        .oneshot(get_request("/api/v1/songs/3_local", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["source"], "local");
    // Answer fields are omitted entirely
    assert!(body["song"].get("title").is_none());
    assert!(body["song"].get("artists").is_none());
    // Hints are present; "Bad Guy" has 7 chars, half rounds down to 3
    assert_eq!(body["song"]["hints"]["title_hint"], "Bad");
    assert_eq!(body["song"]["hints"]["year"], 2019);
    assert_eq!(body["song"]["hints"]["artist"], "Billie Eilish");
}

#[tokio::test]
async fn unknown_local_level_is_not_found() {
    let (app, _) = setup_app().await;
    let response = app
        .oneshot(get_request("/api/v1/songs/42_local", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn malformed_level_id_is_bad_request() {
    let (app, _) = setup_app().await;
    let response = app
        .oneshot(get_request("/api/v1/songs/abc", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn provider_level_requires_bearer_token() {
    let (app, _) = setup_app().await;
    let response = app.oneshot(get_request("/api/v1/songs/7", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn provider_level_without_provider_session_is_forbidden() {
    let (app, _) = setup_app().await;
    let token = register_player(&app, "alice").await;

    let response = app
        .oneshot(get_request("/api/v1/songs/7", Some(&token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn provider_level_cache_fills_once() {
    let provider = Arc::new(StubProvider::default());
    let state = setup_state(provider.clone()).await;
    let app = build_router(state.clone());

    let token = register_player(&app, "alice").await;
    state
        .db
        .save_provider_tokens("alice", "provider-access", None, 3600)
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(get_request("/api/v1/songs/7", Some(&token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["source"], "provider");
    assert!(body["song"].get("title").is_none());
    assert_eq!(body["song"]["hints"]["album"], "Hot Fuss");
    assert_eq!(body["song"]["hints"]["genre"], "Rock");
    assert_eq!(body["song"]["audio_url"], "https://cdn.example/preview.mp3");
    assert_eq!(provider.fetches.load(Ordering::SeqCst), 1);

    // Second request is served from storage
    let response = app
        .clone()
        .oneshot(get_request("/api/v1/songs/7", Some(&token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(provider.fetches.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn reveal_exposes_the_answer_and_burns_the_level() {
    let (app, _) = setup_app().await;

    // Guests may reveal local levels
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/game/reveal",
            &json!({"level_id": "3_local"}),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["song"]["title"], "Bad Guy");
    assert_eq!(body["song"]["artists"], "Billie Eilish");

    // An authenticated reveal records the attempt; scoring then conflicts
    let token = register_player(&app, "bob").await;
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/game/reveal",
            &json!({"level_id": "5_local"}),
            Some(&token),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/game/submit-score",
            &json!({"level_id": "5_local", "score": 100}),
            Some(&token),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

// =============================================================================
// Guess validation
// =============================================================================

#[tokio::test]
async fn validate_accepts_exact_and_fuzzy_guesses() {
    let (app, _) = setup_app().await;

    for (answer, expected) in [
        ("bad guy", true),
        ("Bad Guy", true),
        ("Bad Guys", true),
        ("Yellow Submarine", false),
    ] {
        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/v1/game/validate",
                &json!({"level_id": "3_local", "answer": answer}),
                None,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = extract_json(response.into_body()).await;
        assert_eq!(body["correct"], expected, "answer {:?}", answer);
    }
}

#[tokio::test]
async fn validate_fails_closed_for_unknown_levels() {
    let (app, _) = setup_app().await;

    for level in ["42_local", "999", "not-a-level"] {
        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/v1/game/validate",
                &json!({"level_id": level, "answer": "bad guy"}),
                None,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = extract_json(response.into_body()).await;
        assert_eq!(body["correct"], false, "level {:?}", level);
    }
}

// =============================================================================
// Scoring, daily, ranking
// =============================================================================

#[tokio::test]
async fn score_submission_is_one_shot() {
    let (app, _) = setup_app().await;
    let token = register_player(&app, "alice").await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/game/submit-score",
            &json!({"level_id": "3_local", "score": 100}),
            Some(&token),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["total_score"], 100);

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/game/submit-score",
            &json!({"level_id": "3_local", "score": 100}),
            Some(&token),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    // Total is unchanged after the rejected replay
    let response = app
        .clone()
        .oneshot(get_request("/api/v1/auth/me", Some(&token)))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["total_score"], 100);
    assert_eq!(body["levels_completed"], 1);
}

#[tokio::test]
async fn scoring_requires_authentication() {
    let (app, _) = setup_app().await;
    let response = app
        .oneshot(json_request(
            "POST",
            "/api/v1/game/submit-score",
            &json!({"level_id": "3_local", "score": 100}),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn daily_submission_stamps_completion() {
    let (app, _) = setup_app().await;
    let token = register_player(&app, "alice").await;

    let response = app
        .clone()
        .oneshot(get_request("/api/v1/game/daily", Some(&token)))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["completed_today"], false);

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/game/submit-score",
            &json!({"level_id": "0", "score": 100}),
            Some(&token),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(get_request("/api/v1/game/daily", Some(&token)))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["completed_today"], true);
}

#[tokio::test]
async fn explicit_daily_completion_endpoint() {
    let (app, _) = setup_app().await;
    let token = register_player(&app, "alice").await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/game/daily/complete",
            &json!({}),
            Some(&token),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["completed_today"], true);
}

#[tokio::test]
async fn ranking_orders_players_and_counts_levels() {
    let (app, _) = setup_app().await;
    let alice = register_player(&app, "alice").await;
    let bob = register_player(&app, "bob").await;

    for (token, level, score) in [
        (&alice, "1_local", 100),
        (&alice, "2_local", 150),
        (&bob, "1_local", 400),
    ] {
        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/v1/game/submit-score",
                &json!({"level_id": level, "score": score}),
                Some(token),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app
        .clone()
        .oneshot(get_request("/api/v1/ranking?limit=10", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    let ranking = body["ranking"].as_array().unwrap();
    assert_eq!(ranking.len(), 2);
    assert_eq!(ranking[0]["username"], "bob");
    assert_eq!(ranking[0]["total_score"], 400);
    assert_eq!(ranking[0]["levels_completed"], 1);
    assert_eq!(ranking[1]["username"], "alice");
    assert_eq!(ranking[1]["levels_completed"], 2);
}

// =============================================================================
// Provider authorization
// =============================================================================

#[tokio::test]
async fn client_id_lookup_by_email() {
    let (app, _) = setup_app().await;
    register_player(&app, "alice").await;

    let response = app
        .clone()
        .oneshot(get_request(
            "/api/v1/provider/client-id?email=alice@example.com",
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["client_id"], "alice-client-id");

    let response = app
        .clone()
        .oneshot(get_request(
            "/api/v1/provider/client-id?email=nobody@example.com",
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn code_exchange_persists_tokens() {
    let (app, state) = setup_app().await;
    let token = register_player(&app, "alice").await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/provider/token",
            &json!({"code": "auth-code", "client_id": "alice-client-id"}),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["access_token"], "granted-access");

    // The stored grant now unlocks provider-backed levels
    let response = app
        .clone()
        .oneshot(get_request("/api/v1/songs/7", Some(&token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let stored = state
        .db
        .provider_access_token("alice")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored, "granted-access");
}

#[tokio::test]
async fn refresh_rotates_the_access_token() {
    let (app, state) = setup_app().await;
    let token = register_player(&app, "alice").await;
    state
        .db
        .save_provider_tokens("alice", "stale-access", Some("refresh-1"), 60)
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/provider/refresh",
            &json!({}),
            Some(&token),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let stored = state
        .db
        .provider_access_token("alice")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored, "refreshed-access");
}
