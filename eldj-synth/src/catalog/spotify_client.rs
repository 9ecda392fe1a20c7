//! Spotify Web API client
//!
//! Track search for the catalog stage and the playlist write calls used by
//! materialization. All requests use the user's access token and share one
//! client-side rate limiter.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use super::{CatalogError, CatalogSearch, CatalogTrack, SearchPage};
use crate::auth::AccessToken;
use crate::materializer::{MaterializeError, MaterializedPlaylist, PlaylistMaterializer};
use crate::types::{PlaylistSpec, SearchQuery};

pub const SPOTIFY_API_BASE_URL: &str = "https://api.spotify.com/v1";
const USER_AGENT: &str = concat!("eldj-synth/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT_SECS: u64 = 15;
/// Playlist write API accepts at most this many URIs per call
const TRACKS_PER_WRITE: usize = 100;
const SAMPLE_TRACKS: usize = 5;

/// Minimum spacing between outbound requests
struct RateLimiter {
    last_request: Mutex<Option<Instant>>,
    min_interval: Duration,
}

impl RateLimiter {
    fn new(min_interval_ms: u64) -> Self {
        Self {
            last_request: Mutex::new(None),
            min_interval: Duration::from_millis(min_interval_ms),
        }
    }

    async fn wait(&self) {
        let mut last = self.last_request.lock().await;

        if let Some(last_time) = *last {
            let elapsed = last_time.elapsed();
            if elapsed < self.min_interval {
                let wait_time = self.min_interval - elapsed;
                tracing::trace!("Rate limiting: waiting {:?}", wait_time);
                tokio::time::sleep(wait_time).await;
            }
        }

        *last = Some(Instant::now());
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    tracks: TrackPaging,
}

#[derive(Debug, Deserialize)]
struct TrackPaging {
    #[serde(default)]
    items: Vec<Option<RawTrack>>,
    #[serde(default)]
    next: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawTrack {
    id: Option<String>,
    uri: String,
    name: String,
    #[serde(default)]
    popularity: u32,
    #[serde(default)]
    artists: Vec<RawArtist>,
}

#[derive(Debug, Deserialize)]
struct RawArtist {
    name: String,
}

/// The authenticated account
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct SpotifyUser {
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

impl SpotifyUser {
    pub fn label(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.id)
    }
}

#[derive(Debug, Serialize)]
struct CreatePlaylistBody<'a> {
    name: &'a str,
    description: &'a str,
    public: bool,
}

#[derive(Debug, Serialize)]
struct AddTracksBody<'a> {
    uris: &'a [String],
}

#[derive(Debug, Deserialize)]
struct CreatedPlaylist {
    id: String,
    name: String,
    #[serde(default)]
    external_urls: ExternalUrls,
}

#[derive(Debug, Default, Deserialize)]
struct ExternalUrls {
    spotify: Option<String>,
}

/// Spotify Web API client
pub struct SpotifyClient {
    http_client: reqwest::Client,
    base_url: String,
    rate_limiter: Arc<RateLimiter>,
}

impl SpotifyClient {
    pub fn new(min_interval_ms: u64) -> Result<Self, CatalogError> {
        Self::with_base_url(SPOTIFY_API_BASE_URL, min_interval_ms)
    }

    /// Client against a non-default API root (mock servers in tests)
    pub fn with_base_url(base_url: &str, min_interval_ms: u64) -> Result<Self, CatalogError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| CatalogError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            rate_limiter: Arc::new(RateLimiter::new(min_interval_ms)),
        })
    }

    /// Send a request and map non-success statuses to `CatalogError`
    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, CatalogError> {
        self.rate_limiter.wait().await;

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                CatalogError::Timeout
            } else {
                CatalogError::Network(e.to_string())
            }
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        if status.as_u16() == 401 {
            return Err(CatalogError::Unauthorized);
        }

        if status.as_u16() == 429 {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.trim().parse::<u64>().ok())
                .map(Duration::from_secs);
            return Err(CatalogError::RateLimited { retry_after });
        }

        let message = response.text().await.unwrap_or_default();
        if status.is_server_error() {
            Err(CatalogError::Server(status.as_u16(), message))
        } else {
            Err(CatalogError::Api(status.as_u16(), message))
        }
    }

    /// Account that owns `token`
    pub async fn current_user(&self, token: &AccessToken) -> Result<SpotifyUser, CatalogError> {
        let url = format!("{}/me", self.base_url);
        let response = self
            .send(self.http_client.get(&url).bearer_auth(token.secret()))
            .await?;

        response
            .json()
            .await
            .map_err(|e| CatalogError::Parse(e.to_string()))
    }

    async fn create_playlist(
        &self,
        user_id: &str,
        spec: &PlaylistSpec,
        token: &AccessToken,
    ) -> Result<CreatedPlaylist, CatalogError> {
        let url = format!("{}/users/{}/playlists", self.base_url, user_id);
        let body = CreatePlaylistBody {
            name: &spec.name,
            description: &spec.description,
            public: false,
        };
        let response = self
            .send(self.http_client.post(&url).bearer_auth(token.secret()).json(&body))
            .await?;

        response
            .json()
            .await
            .map_err(|e| CatalogError::Parse(e.to_string()))
    }

    async fn add_tracks(
        &self,
        playlist_id: &str,
        uris: &[String],
        token: &AccessToken,
    ) -> Result<(), CatalogError> {
        let url = format!("{}/playlists/{}/tracks", self.base_url, playlist_id);
        for chunk in uris.chunks(TRACKS_PER_WRITE) {
            self.send(
                self.http_client
                    .post(&url)
                    .bearer_auth(token.secret())
                    .json(&AddTracksBody { uris: chunk }),
            )
            .await?;
        }
        Ok(())
    }
}

#[async_trait]
impl CatalogSearch for SpotifyClient {
    async fn search_page(
        &self,
        query: &SearchQuery,
        limit: u32,
        offset: u32,
        token: &AccessToken,
    ) -> Result<SearchPage, CatalogError> {
        let url = format!("{}/search", self.base_url);
        let mut params = vec![
            ("q", query.text.clone()),
            ("type", "track".to_string()),
            ("limit", limit.to_string()),
            ("offset", offset.to_string()),
        ];
        if let Some(market) = &query.market {
            params.push(("market", market.clone()));
        }

        let response = self
            .send(self.http_client.get(&url).bearer_auth(token.secret()).query(&params))
            .await?;

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| CatalogError::Parse(e.to_string()))?;

        let has_more = body.tracks.next.is_some();
        let tracks = body
            .tracks
            .items
            .into_iter()
            .flatten()
            .filter_map(|raw| {
                // Local files and unavailable tracks have no catalog id
                let id = raw.id?;
                Some(CatalogTrack {
                    id,
                    uri: raw.uri,
                    name: raw.name,
                    artists: raw.artists.into_iter().map(|a| a.name).collect(),
                    popularity: raw.popularity.min(100) as u8,
                })
            })
            .collect();

        Ok(SearchPage { tracks, has_more })
    }
}

#[async_trait]
impl PlaylistMaterializer for SpotifyClient {
    async fn materialize(
        &self,
        spec: &PlaylistSpec,
        token: &AccessToken,
    ) -> Result<MaterializedPlaylist, MaterializeError> {
        let user = self.current_user(token).await?;
        let created = self.create_playlist(&user.id, spec, token).await?;

        tracing::info!(
            playlist_id = %created.id,
            user = %user.id,
            tracks = spec.tracks.len(),
            "Playlist created"
        );

        if let Err(e) = self.add_tracks(&created.id, &spec.track_uris(), token).await {
            tracing::warn!(playlist_id = %created.id, error = %e, "Playlist created but tracks were not added");
            return Err(e.into());
        }

        let url = created
            .external_urls
            .spotify
            .unwrap_or_else(|| format!("https://open.spotify.com/playlist/{}", created.id));

        Ok(MaterializedPlaylist {
            id: created.id,
            name: created.name,
            url,
            track_count: spec.tracks.len(),
            sample_tracks: spec.sample_tracks(SAMPLE_TRACKS),
        })
    }
}
