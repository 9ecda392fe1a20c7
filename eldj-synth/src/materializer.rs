//! Playlist materialization boundary
//!
//! Creates the playlist in the user's account and appends the assembled
//! tracks in order. An invalid credential is reported, never retried.

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::auth::AccessToken;
use crate::catalog::CatalogError;
use crate::types::PlaylistSpec;

/// A playlist that now exists in the user's account
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MaterializedPlaylist {
    pub id: String,
    pub name: String,
    /// Public playlist URL
    pub url: String,
    pub track_count: usize,
    /// "Title by Artist" lines for the first few tracks
    pub sample_tracks: Vec<String>,
}

#[derive(Debug, Error)]
pub enum MaterializeError {
    #[error("Access token rejected")]
    Unauthorized,

    #[error("Playlist API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

impl From<CatalogError> for MaterializeError {
    fn from(error: CatalogError) -> Self {
        match error {
            CatalogError::Unauthorized => MaterializeError::Unauthorized,
            CatalogError::RateLimited { .. } => MaterializeError::Api {
                status: 429,
                message: "rate limited".to_string(),
            },
            CatalogError::Server(status, message) | CatalogError::Api(status, message) => {
                MaterializeError::Api { status, message }
            }
            CatalogError::Network(message) => MaterializeError::Network(message),
            CatalogError::Timeout => MaterializeError::Network("request timeout".to_string()),
            CatalogError::Parse(message) => MaterializeError::Parse(message),
        }
    }
}

/// Write side of the catalog
#[async_trait]
pub trait PlaylistMaterializer: Send + Sync {
    async fn materialize(
        &self,
        spec: &PlaylistSpec,
        token: &AccessToken,
    ) -> Result<MaterializedPlaylist, MaterializeError>;
}
