//! eldj-synth library interface
//!
//! Turns free-text moods and playlist ideas into Spotify playlists. Exposed
//! as a library so integration tests can drive the router and pipeline.

pub mod analysis;
pub mod api;
pub mod assembler;
pub mod auth;
pub mod catalog;
pub mod config;
pub mod engine;
pub mod error;
pub mod filter;
pub mod llm;
pub mod materializer;
pub mod planner;
pub mod types;
pub mod utils;

pub use crate::engine::{SynthesisEngine, SynthesisError, SynthesisOutcome, SynthesisRequest};
pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth::SpotifyOAuth;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<SynthesisEngine>,
    /// Sign-in flow; the engine reads the same session through its credential provider
    pub oauth: Arc<SpotifyOAuth>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Last synthesis failure, for diagnostics
    pub last_error: Arc<RwLock<Option<String>>>,
}

impl AppState {
    pub fn new(engine: Arc<SynthesisEngine>, oauth: Arc<SpotifyOAuth>) -> Self {
        Self {
            engine,
            oauth,
            startup_time: Utc::now(),
            last_error: Arc::new(RwLock::new(None)),
        }
    }

    pub async fn record_error(&self, message: String) {
        *self.last_error.write().await = Some(message);
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::auth_routes())
        .merge(api::playlist_routes())
        .merge(api::health_routes())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
