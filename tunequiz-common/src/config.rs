//! Configuration loading
//!
//! Settings resolve with the following priority order:
//! 1. Command-line argument (highest priority, applied by the binary)
//! 2. Environment variables (`TUNEQUIZ_*`)
//! 3. TOML config file (`~/.config/tunequiz/config.toml` or the path given
//!    on the command line)
//! 4. Compiled defaults (fallback)

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Service configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Bind host for the HTTP server
    pub host: String,
    /// Bind port for the HTTP server
    pub port: u16,
    /// SQLite database file path
    pub database_path: PathBuf,
    /// HMAC secret for bearer tokens
    pub token_secret: String,
    /// Bearer token lifetime in hours
    pub token_ttl_hours: i64,
    /// Music-provider REST API base URL
    pub provider_api_url: String,
    /// Music-provider OAuth token endpoint
    pub provider_token_url: String,
    /// Music-provider embed-page base URL (preview-audio scrape)
    pub provider_embed_url: String,
    /// OAuth redirect URI registered with the provider
    pub provider_redirect_uri: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5730,
            database_path: default_database_path(),
            token_secret: "tunequiz-dev-secret".to_string(),
            token_ttl_hours: 24,
            provider_api_url: "https://api.spotify.com/v1".to_string(),
            provider_token_url: "https://accounts.spotify.com/api/token".to_string(),
            provider_embed_url: "https://open.spotify.com/embed".to_string(),
            provider_redirect_uri: "http://localhost:4200/callback".to_string(),
        }
    }
}

impl Settings {
    /// Load settings: config file (explicit path or platform default),
    /// then environment-variable overrides on top.
    pub fn load(config_path: Option<&Path>) -> Result<Settings> {
        let mut settings = match config_path {
            Some(path) => Self::from_file(path)?,
            None => match default_config_path() {
                Some(path) if path.exists() => Self::from_file(&path)?,
                _ => Settings::default(),
            },
        };
        settings.apply_env();

        if settings.token_secret == Settings::default().token_secret {
            tracing::warn!("Using built-in token secret; set TUNEQUIZ_TOKEN_SECRET in production");
        }

        Ok(settings)
    }

    fn from_file(path: &Path) -> Result<Settings> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Cannot read {}: {}", path.display(), e)))?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Cannot parse {}: {}", path.display(), e)))
    }

    fn apply_env(&mut self) {
        if let Ok(host) = std::env::var("TUNEQUIZ_HOST") {
            self.host = host;
        }
        if let Ok(port) = std::env::var("TUNEQUIZ_PORT") {
            if let Ok(port) = port.parse() {
                self.port = port;
            }
        }
        if let Ok(path) = std::env::var("TUNEQUIZ_DB") {
            self.database_path = PathBuf::from(path);
        }
        if let Ok(secret) = std::env::var("TUNEQUIZ_TOKEN_SECRET") {
            self.token_secret = secret;
        }
        if let Ok(url) = std::env::var("TUNEQUIZ_PROVIDER_API_URL") {
            self.provider_api_url = url;
        }
        if let Ok(url) = std::env::var("TUNEQUIZ_PROVIDER_TOKEN_URL") {
            self.provider_token_url = url;
        }
        if let Ok(url) = std::env::var("TUNEQUIZ_PROVIDER_EMBED_URL") {
            self.provider_embed_url = url;
        }
        if let Ok(uri) = std::env::var("TUNEQUIZ_PROVIDER_REDIRECT_URI") {
            self.provider_redirect_uri = uri;
        }
    }
}

/// Default config file location for the platform
fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("tunequiz").join("config.toml"))
}

/// Default database location: platform data dir, falling back to the
/// working directory.
fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("tunequiz").join("tunequiz.db"))
        .unwrap_or_else(|| PathBuf::from("tunequiz.db"))
}
