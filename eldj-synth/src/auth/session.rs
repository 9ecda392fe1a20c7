//! In-memory token storage for the single signed-in user

use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use super::AccessToken;

/// Tokens are treated as expired this long before the server says so
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct TokenSet {
    pub access_token: AccessToken,
    pub refresh_token: Option<String>,
    pub expires_at: Instant,
}

impl TokenSet {
    pub fn new(access_token: AccessToken, refresh_token: Option<String>, expires_in: Duration) -> Self {
        Self {
            access_token,
            refresh_token,
            expires_at: Instant::now() + expires_in,
        }
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() + EXPIRY_MARGIN >= self.expires_at
    }
}

#[derive(Debug, Clone)]
pub struct Session {
    pub tokens: TokenSet,
    /// Display name or id of the signed-in account
    pub user: String,
}

/// Current session, shared by all requests
#[derive(Debug, Default)]
pub struct SessionStore {
    session: RwLock<Option<Session>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self) -> Option<Session> {
        self.session.read().await.clone()
    }

    pub async fn set(&self, session: Session) {
        *self.session.write().await = Some(session);
    }

    /// Replace the tokens of the current session, keeping the user
    pub async fn update_tokens(&self, tokens: TokenSet) {
        if let Some(session) = self.session.write().await.as_mut() {
            session.tokens = tokens;
        }
    }

    pub async fn clear(&self) {
        *self.session.write().await = None;
    }

    pub async fn is_present(&self) -> bool {
        self.session.read().await.is_some()
    }
}
