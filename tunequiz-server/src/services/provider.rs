//! Music-provider API client
//!
//! Talks to the external music provider for track metadata, artist genres,
//! preview audio, and OAuth token grants. The trait boundary exists so the
//! resolver and the HTTP tests can run against a seeded double instead of
//! the network.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

const HTTP_TIMEOUT_SECS: u64 = 30;

/// Extracts the preview URL from the provider's embed page
static AUDIO_PREVIEW_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#""audioPreview":\s*\{\s*"url":\s*"([^"]+)""#).expect("audio-preview regex")
});

/// Provider client errors
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Track not found: {0}")]
    TrackNotFound(String),

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),
}

/// Artist reference within a track credit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtistRef {
    pub id: String,
    pub name: String,
}

/// Display metadata for one track, as fetched from the provider
#[derive(Debug, Clone)]
pub struct TrackInfo {
    pub title: String,
    pub artists: Vec<ArtistRef>,
    pub album: String,
    /// 0 when the release date could not be parsed
    pub release_year: i64,
    pub image_url: String,
}

/// An OAuth token grant from the provider
#[derive(Debug, Clone)]
pub struct TokenGrant {
    pub access_token: String,
    /// The provider may or may not rotate the refresh token
    pub refresh_token: Option<String>,
    pub expires_in: i64,
}

/// Music-provider collaborator interface
#[async_trait]
pub trait TrackProvider: Send + Sync {
    /// Fetch display metadata for a track
    async fn fetch_track(
        &self,
        track_id: &str,
        access_token: &str,
    ) -> Result<TrackInfo, ProviderError>;

    /// Genres attributed to an artist (used as a best-effort track genre)
    async fn fetch_artist_genres(
        &self,
        artist_id: &str,
        access_token: &str,
    ) -> Result<Vec<String>, ProviderError>;

    /// Best-effort preview-audio URL; previews are not guaranteed by the
    /// provider, so absence is `None`, never an error.
    async fn fetch_preview_audio(&self, track_id: &str) -> Option<String>;

    /// Exchange an authorization code for a token grant
    async fn exchange_authorization_code(
        &self,
        code: &str,
        client_id: &str,
        client_secret: &str,
        redirect_uri: &str,
    ) -> Result<TokenGrant, ProviderError>;

    /// Obtain a fresh access token from a refresh token
    async fn refresh_access_token(
        &self,
        refresh_token: &str,
        client_id: &str,
        client_secret: &str,
    ) -> Result<TokenGrant, ProviderError>;
}

// Wire shapes for the provider's track endpoint

#[derive(Debug, Deserialize)]
struct TrackResponse {
    name: String,
    artists: Vec<ArtistResponse>,
    album: AlbumResponse,
}

#[derive(Debug, Deserialize)]
struct ArtistResponse {
    id: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct AlbumResponse {
    name: String,
    release_date: Option<String>,
    #[serde(default)]
    images: Vec<ImageResponse>,
}

#[derive(Debug, Deserialize)]
struct ImageResponse {
    url: String,
}

#[derive(Debug, Deserialize)]
struct ArtistDetailResponse {
    #[serde(default)]
    genres: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    3600
}

/// HTTP implementation of [`TrackProvider`]
pub struct HttpTrackProvider {
    http_client: reqwest::Client,
    api_url: String,
    token_url: String,
    embed_url: String,
}

impl HttpTrackProvider {
    pub fn new(
        api_url: impl Into<String>,
        token_url: impl Into<String>,
        embed_url: impl Into<String>,
    ) -> Result<Self, ProviderError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
            .build()
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            api_url: api_url.into(),
            token_url: token_url.into(),
            embed_url: embed_url.into(),
        })
    }

    async fn request_token_grant(
        &self,
        form: &[(&str, &str)],
        client_id: &str,
        client_secret: &str,
    ) -> Result<TokenGrant, ProviderError> {
        let response = self
            .http_client
            .post(&self.token_url)
            .basic_auth(client_id, Some(client_secret))
            .form(form)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api(status.as_u16(), error_text));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        Ok(TokenGrant {
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            expires_in: token.expires_in,
        })
    }
}

#[async_trait]
impl TrackProvider for HttpTrackProvider {
    async fn fetch_track(
        &self,
        track_id: &str,
        access_token: &str,
    ) -> Result<TrackInfo, ProviderError> {
        let url = format!("{}/tracks/{}", self.api_url, track_id);
        tracing::debug!(track_id = %track_id, "Fetching track from provider");

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let status = response.status();
        if status == 404 {
            return Err(ProviderError::TrackNotFound(track_id.to_string()));
        }
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api(status.as_u16(), error_text));
        }

        let track: TrackResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        // Release dates arrive as YYYY, YYYY-MM, or YYYY-MM-DD
        let release_year = track
            .album
            .release_date
            .as_deref()
            .and_then(|date| date.get(..4))
            .and_then(|year| year.parse().ok())
            .unwrap_or(0);

        let info = TrackInfo {
            title: track.name,
            artists: track
                .artists
                .into_iter()
                .map(|a| ArtistRef { id: a.id, name: a.name })
                .collect(),
            album: track.album.name,
            release_year,
            image_url: track
                .album
                .images
                .into_iter()
                .next()
                .map(|i| i.url)
                .unwrap_or_default(),
        };

        tracing::info!(
            track_id = %track_id,
            title = %info.title,
            artist = %info.artists.first().map(|a| a.name.as_str()).unwrap_or("Unknown"),
            "Retrieved track from provider"
        );

        Ok(info)
    }

    async fn fetch_artist_genres(
        &self,
        artist_id: &str,
        access_token: &str,
    ) -> Result<Vec<String>, ProviderError> {
        let url = format!("{}/artists/{}", self.api_url, artist_id);

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api(status.as_u16(), error_text));
        }

        let artist: ArtistDetailResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        Ok(artist.genres)
    }

    async fn fetch_preview_audio(&self, track_id: &str) -> Option<String> {
        // The provider's REST API stopped serving preview URLs; the embed
        // page still carries one in its inline JSON.
        let url = format!("{}/track/{}", self.embed_url, track_id);

        let html = match self.http_client.get(&url).send().await {
            Ok(response) if response.status().is_success() => {
                response.text().await.ok()?
            }
            Ok(response) => {
                tracing::debug!(track_id = %track_id, status = %response.status(), "Embed page unavailable");
                return None;
            }
            Err(e) => {
                tracing::debug!(track_id = %track_id, error = %e, "Embed page fetch failed");
                return None;
            }
        };

        AUDIO_PREVIEW_URL
            .captures(&html)
            .map(|captures| captures[1].to_string())
    }

    async fn exchange_authorization_code(
        &self,
        code: &str,
        client_id: &str,
        client_secret: &str,
        redirect_uri: &str,
    ) -> Result<TokenGrant, ProviderError> {
        self.request_token_grant(
            &[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", redirect_uri),
            ],
            client_id,
            client_secret,
        )
        .await
    }

    async fn refresh_access_token(
        &self,
        refresh_token: &str,
        client_id: &str,
        client_secret: &str,
    ) -> Result<TokenGrant, ProviderError> {
        self.request_token_grant(
            &[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
            ],
            client_id,
            client_secret,
        )
        .await
    }
}
