//! tunequiz-server - Song-guessing game backend
//!
//! Serves per-level song metadata (bundled guest catalog or provider-backed
//! cache), validates guesses with fuzzy matching, tracks scores and daily
//! completion, and rotates the daily-challenge song at startup.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tunequiz_common::config::Settings;
use tunequiz_common::credentials::CredentialManager;
use tunequiz_common::Database;
use tunequiz_server::game::DailyChallenge;
use tunequiz_server::services::HttpTrackProvider;
use tunequiz_server::{build_router, AppState};

#[derive(Parser, Debug)]
#[command(name = "tunequiz-server", about = "Song-guessing game backend")]
struct Args {
    /// Path to a TOML config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the bind port
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!(
        "Starting tunequiz-server v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let args = Args::parse();
    let mut settings = Settings::load(args.config.as_deref())?;
    if let Some(port) = args.port {
        settings.port = port;
    }

    let db = Database::open(&settings.database_path).await?;

    // Seed the catalogs; existing rows are left untouched
    db.seed_local_songs(tunequiz_server::LOCAL_SONGS_JSON).await?;
    db.seed_provider_levels(tunequiz_server::PROVIDER_LEVELS_JSON)
        .await?;

    // One-shot daily rotation; the level cache-fills on first access
    let daily = DailyChallenge::from_json(tunequiz_server::DAILY_POOL_JSON);
    daily.rotate(&db).await?;

    let credentials = CredentialManager::new(&settings.token_secret, settings.token_ttl_hours);
    let provider = HttpTrackProvider::new(
        &settings.provider_api_url,
        &settings.provider_token_url,
        &settings.provider_embed_url,
    )
    .map_err(|e| anyhow::anyhow!("Provider client init failed: {}", e))?;

    let bind_addr = format!("{}:{}", settings.host, settings.port);
    let state = AppState::new(db, credentials, Arc::new(provider), settings);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("tunequiz-server listening on http://{}", bind_addr);
    info!("Health check: http://{}/health", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
