//! Spotify user authorization
//!
//! The pipeline only sees [`CredentialProvider`]. Token acquisition, storage
//! and refresh live behind it in [`SpotifyOAuth`].

mod oauth;
mod session;

pub use oauth::{SpotifyOAuth, SPOTIFY_ACCOUNTS_BASE_URL, SPOTIFY_SCOPES};
pub use session::{Session, SessionStore, TokenSet};

use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

/// Bearer token for the catalog API
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(***)")
    }
}

/// Authorization failures; all of them mean "ask the user to sign in again"
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("Not authenticated with Spotify")]
    NotAuthenticated,

    #[error("Spotify session expired")]
    Expired,

    #[error("Spotify rejected the credential")]
    Rejected,

    #[error("Authorization denied: {0}")]
    Denied(String),

    #[error("Invalid callback URL: {0}")]
    InvalidCallback(String),

    #[error("Token exchange failed: {0}")]
    Exchange(String),
}

/// Supplies a usable access token or an `AuthError`
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn access_token(&self) -> Result<AccessToken, AuthError>;

    async fn is_authenticated(&self) -> bool;
}
