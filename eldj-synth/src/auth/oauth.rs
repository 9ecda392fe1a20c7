//! Authorization-code flow against the Spotify accounts service

use async_trait::async_trait;
use eldj_common::config::SpotifyCredentials;
use reqwest::Url;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use super::session::{Session, SessionStore, TokenSet};
use super::{AccessToken, AuthError, CredentialProvider};
use crate::catalog::SpotifyClient;

pub const SPOTIFY_ACCOUNTS_BASE_URL: &str = "https://accounts.spotify.com";
pub const SPOTIFY_SCOPES: &str = "playlist-modify-public playlist-modify-private";

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    3600
}

#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// Spotify OAuth client plus the session it maintains
pub struct SpotifyOAuth {
    http_client: reqwest::Client,
    credentials: SpotifyCredentials,
    accounts_base_url: String,
    api: Arc<SpotifyClient>,
    store: SessionStore,
}

impl SpotifyOAuth {
    pub fn new(credentials: SpotifyCredentials, api: Arc<SpotifyClient>) -> Result<Self, AuthError> {
        Self::with_accounts_url(credentials, api, SPOTIFY_ACCOUNTS_BASE_URL)
    }

    pub fn with_accounts_url(
        credentials: SpotifyCredentials,
        api: Arc<SpotifyClient>,
        accounts_base_url: &str,
    ) -> Result<Self, AuthError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| AuthError::Exchange(e.to_string()))?;

        Ok(Self {
            http_client,
            credentials,
            accounts_base_url: accounts_base_url.trim_end_matches('/').to_string(),
            api,
            store: SessionStore::new(),
        })
    }

    pub fn redirect_uri(&self) -> &str {
        &self.credentials.redirect_uri
    }

    /// URL the user opens to grant access
    pub fn authorize_url(&self) -> Result<String, AuthError> {
        let base = format!("{}/authorize", self.accounts_base_url);
        Url::parse_with_params(
            &base,
            &[
                ("client_id", self.credentials.client_id.as_str()),
                ("response_type", "code"),
                ("redirect_uri", self.credentials.redirect_uri.as_str()),
                ("scope", SPOTIFY_SCOPES),
                ("show_dialog", "true"),
            ],
        )
        .map(String::from)
        .map_err(|e| AuthError::InvalidCallback(e.to_string()))
    }

    /// Extract the authorization code from a pasted redirect URL
    pub fn parse_callback(callback_url: &str) -> Result<String, AuthError> {
        let url = Url::parse(callback_url.trim())
            .map_err(|e| AuthError::InvalidCallback(e.to_string()))?;

        let mut code = None;
        let mut error = None;
        let mut description = None;
        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "code" => code = Some(value.into_owned()),
                "error" => error = Some(value.into_owned()),
                "error_description" => description = Some(value.into_owned()),
                _ => {}
            }
        }

        if let Some(error) = error {
            return Err(AuthError::Denied(description.unwrap_or(error)));
        }

        code.filter(|c| !c.is_empty())
            .ok_or_else(|| AuthError::InvalidCallback("no authorization code in URL".to_string()))
    }

    async fn token_request(&self, form: &[(&str, &str)]) -> Result<TokenResponse, AuthError> {
        let url = format!("{}/api/token", self.accounts_base_url);
        let response = self
            .http_client
            .post(&url)
            .basic_auth(&self.credentials.client_id, Some(&self.credentials.client_secret))
            .form(form)
            .send()
            .await
            .map_err(|e| AuthError::Exchange(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<TokenErrorResponse>(&text)
                .map(|e| e.error_description.unwrap_or(e.error))
                .unwrap_or(text);
            return Err(AuthError::Exchange(format!("status {}: {}", status.as_u16(), message)));
        }

        response
            .json()
            .await
            .map_err(|e| AuthError::Exchange(e.to_string()))
    }

    /// Exchange an authorization code for tokens
    pub async fn exchange_code(&self, code: &str) -> Result<TokenSet, AuthError> {
        let tokens = self
            .token_request(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", self.credentials.redirect_uri.as_str()),
            ])
            .await?;

        Ok(TokenSet::new(
            AccessToken::new(tokens.access_token),
            tokens.refresh_token,
            Duration::from_secs(tokens.expires_in),
        ))
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenSet, AuthError> {
        let tokens = self
            .token_request(&[("grant_type", "refresh_token"), ("refresh_token", refresh_token)])
            .await?;

        Ok(TokenSet::new(
            AccessToken::new(tokens.access_token),
            // The accounts service may omit a new refresh token
            tokens.refresh_token.or_else(|| Some(refresh_token.to_string())),
            Duration::from_secs(tokens.expires_in),
        ))
    }

    /// Complete sign-in from a callback URL; returns the account label
    pub async fn authenticate(&self, callback_url: &str) -> Result<String, AuthError> {
        let code = Self::parse_callback(callback_url)?;
        self.authenticate_code(&code).await
    }

    /// Complete sign-in from a bare authorization code
    pub async fn authenticate_code(&self, code: &str) -> Result<String, AuthError> {
        let tokens = self.exchange_code(code).await?;
        let user = self
            .api
            .current_user(&tokens.access_token)
            .await
            .map_err(|e| AuthError::Exchange(format!("profile lookup failed: {}", e)))?;
        let label = user.label().to_string();

        self.store
            .set(Session {
                tokens,
                user: label.clone(),
            })
            .await;

        info!(user = %label, "Spotify session established");
        Ok(label)
    }

    /// Forget the session; the next request needs a fresh sign-in
    pub async fn sign_out(&self) {
        self.store.clear().await;
    }
}

#[async_trait]
impl CredentialProvider for SpotifyOAuth {
    async fn access_token(&self) -> Result<AccessToken, AuthError> {
        let session = self.store.get().await.ok_or(AuthError::NotAuthenticated)?;
        if !session.tokens.is_expired() {
            return Ok(session.tokens.access_token);
        }

        let Some(refresh_token) = session.tokens.refresh_token.as_deref() else {
            self.store.clear().await;
            return Err(AuthError::Expired);
        };

        match self.refresh(refresh_token).await {
            Ok(tokens) => {
                let token = tokens.access_token.clone();
                self.store.update_tokens(tokens).await;
                info!(user = %session.user, "Spotify token refreshed");
                Ok(token)
            }
            Err(e) => {
                warn!(user = %session.user, error = %e, "Token refresh failed, clearing session");
                self.store.clear().await;
                Err(AuthError::Expired)
            }
        }
    }

    async fn is_authenticated(&self) -> bool {
        self.store.is_present().await
    }
}
