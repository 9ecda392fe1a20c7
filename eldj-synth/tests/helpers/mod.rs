//! Shared mock collaborators for integration tests
//!
//! Every mock counts its calls so tests can assert which stages ran.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::NaiveDate;
use eldj_common::config::{SpotifyCredentials, SynthesisSettings};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use eldj_synth::analysis::{RecoveryPolicy, SemanticAnalyzer};
use eldj_synth::auth::{AccessToken, AuthError, CredentialProvider, SpotifyOAuth};
use eldj_synth::catalog::{CatalogError, CatalogSearch, CatalogTrack, SearchPage, SpotifyClient};
use eldj_synth::config::{MarketTable, SynthesisConfig};
use eldj_synth::llm::{ChatMessage, CompletionOptions, LanguageModel, LlmError};
use eldj_synth::materializer::{MaterializeError, MaterializedPlaylist, PlaylistMaterializer};
use eldj_synth::types::{PlaylistSpec, SearchQuery};
use eldj_synth::{AppState, SynthesisEngine};

// ============================================================================
// Language model
// ============================================================================

pub struct ScriptedModel {
    answers: Mutex<VecDeque<Result<String, LlmError>>>,
    /// Time spent before each answer
    delay: Duration,
    pub calls: AtomicUsize,
}

impl ScriptedModel {
    pub fn new(answers: Vec<Result<String, LlmError>>) -> Arc<Self> {
        Arc::new(Self {
            answers: Mutex::new(answers.into()),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn slow(json: &str, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            answers: Mutex::new(vec![Ok(json.to_string())].into()),
            delay,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn answering(json: &str) -> Arc<Self> {
        Self::new(vec![Ok(json.to_string())])
    }

    pub fn unreachable() -> Arc<Self> {
        Self::new(vec![Err(LlmError::Connection("connection refused".to_string()))])
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

/// Newtype so the model can be shared with the analyzer and the test
pub struct SharedModel(pub Arc<ScriptedModel>);

#[async_trait]
impl LanguageModel for SharedModel {
    fn model(&self) -> &str {
        "scripted"
    }

    async fn complete(
        &self,
        _messages: &[ChatMessage],
        _options: &CompletionOptions,
    ) -> Result<String, LlmError> {
        self.0.calls.fetch_add(1, Ordering::SeqCst);
        if !self.0.delay.is_zero() {
            tokio::time::sleep(self.0.delay).await;
        }
        self.0
            .answers
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::InvalidResponse("no scripted answer".to_string())))
    }
}

// ============================================================================
// Catalog
// ============================================================================

/// Serves `per_query` tracks for every query
pub struct FakeCatalog {
    per_query: u32,
    unauthorized: bool,
    pub calls: AtomicUsize,
}

impl FakeCatalog {
    pub fn new(per_query: u32) -> Arc<Self> {
        Arc::new(Self {
            per_query,
            unauthorized: false,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn rejecting() -> Arc<Self> {
        Arc::new(Self {
            per_query: 0,
            unauthorized: true,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CatalogSearch for FakeCatalog {
    async fn search_page(
        &self,
        query: &SearchQuery,
        limit: u32,
        offset: u32,
        _token: &AccessToken,
    ) -> Result<SearchPage, CatalogError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.unauthorized {
            return Err(CatalogError::Unauthorized);
        }

        let key = query.genre_hint.clone().unwrap_or_else(|| "free".to_string()).replace(' ', "_");
        let end = (offset + limit).min(self.per_query);
        let tracks = (offset..end)
            .map(|i| CatalogTrack {
                id: format!("{}-{}", key, i),
                uri: format!("spotify:track:{}-{}", key, i),
                name: format!("{} song {}", key, i),
                artists: vec![format!("{} artist {}", key, i % 8)],
                popularity: (30 + (i * 13) % 70) as u8,
            })
            .collect();

        Ok(SearchPage {
            tracks,
            has_more: end < self.per_query,
        })
    }
}

// ============================================================================
// Materializer
// ============================================================================

#[derive(Default)]
pub struct RecordingMaterializer {
    unauthorized: bool,
    /// Time spent between creating and filling the playlist
    delay: Duration,
    pub calls: AtomicUsize,
    pub last_spec: Mutex<Option<PlaylistSpec>>,
}

impl RecordingMaterializer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn rejecting() -> Arc<Self> {
        Arc::new(Self {
            unauthorized: true,
            ..Self::default()
        })
    }

    pub fn slow(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay,
            ..Self::default()
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_spec(&self) -> Option<PlaylistSpec> {
        self.last_spec.lock().unwrap().clone()
    }
}

#[async_trait]
impl PlaylistMaterializer for RecordingMaterializer {
    async fn materialize(
        &self,
        spec: &PlaylistSpec,
        _token: &AccessToken,
    ) -> Result<MaterializedPlaylist, MaterializeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.unauthorized {
            return Err(MaterializeError::Unauthorized);
        }
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        *self.last_spec.lock().unwrap() = Some(spec.clone());

        Ok(MaterializedPlaylist {
            id: "pl-1".to_string(),
            name: spec.name.clone(),
            url: "https://open.spotify.com/playlist/pl-1".to_string(),
            track_count: spec.tracks.len(),
            sample_tracks: spec.sample_tracks(5),
        })
    }
}

// ============================================================================
// Credentials
// ============================================================================

/// Signed-in session whose token can be invalidated mid-request
pub struct StaticCredentials {
    authenticated: AtomicBool,
    /// Token requests answered before the session turns invalid
    valid_tokens: AtomicUsize,
    pub calls: AtomicUsize,
}

impl StaticCredentials {
    pub fn signed_in() -> Arc<Self> {
        Self::valid_for(usize::MAX)
    }

    pub fn signed_out() -> Arc<Self> {
        Arc::new(Self {
            authenticated: AtomicBool::new(false),
            valid_tokens: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn valid_for(tokens: usize) -> Arc<Self> {
        Arc::new(Self {
            authenticated: AtomicBool::new(true),
            valid_tokens: AtomicUsize::new(tokens),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CredentialProvider for StaticCredentials {
    async fn access_token(&self) -> Result<AccessToken, AuthError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.authenticated.load(Ordering::SeqCst) {
            return Err(AuthError::NotAuthenticated);
        }
        if call >= self.valid_tokens.load(Ordering::SeqCst) {
            return Err(AuthError::Expired);
        }
        Ok(AccessToken::new("test-token"))
    }

    async fn is_authenticated(&self) -> bool {
        self.authenticated.load(Ordering::SeqCst)
    }
}

// ============================================================================
// Wiring
// ============================================================================

pub fn fixed_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
}

pub fn test_settings() -> SynthesisSettings {
    SynthesisSettings {
        search_initial_backoff_ms: 1,
        search_max_backoff_ms: 2,
        catalog_min_interval_ms: 0,
        request_timeout_secs: 10,
        ..SynthesisSettings::default()
    }
}

pub struct Harness {
    pub model: Arc<ScriptedModel>,
    pub catalog: Arc<FakeCatalog>,
    pub materializer: Arc<RecordingMaterializer>,
    pub credentials: Arc<StaticCredentials>,
    pub engine: Arc<SynthesisEngine>,
}

pub fn harness(
    model: Arc<ScriptedModel>,
    catalog: Arc<FakeCatalog>,
    materializer: Arc<RecordingMaterializer>,
    credentials: Arc<StaticCredentials>,
) -> Harness {
    harness_with(test_settings(), model, catalog, materializer, credentials)
}

pub fn harness_with(
    settings: SynthesisSettings,
    model: Arc<ScriptedModel>,
    catalog: Arc<FakeCatalog>,
    materializer: Arc<RecordingMaterializer>,
    credentials: Arc<StaticCredentials>,
) -> Harness {
    let config = Arc::new(SynthesisConfig::new(settings));
    let analyzer = Arc::new(SemanticAnalyzer::new(
        SharedModel(model.clone()),
        RecoveryPolicy::default(),
        MarketTable::new(),
        0.3,
    ));
    let engine = SynthesisEngine::new(
        config,
        analyzer,
        catalog.clone(),
        materializer.clone(),
        credentials.clone(),
    )
    .with_clock(fixed_date);

    Harness {
        model,
        catalog,
        materializer,
        credentials,
        engine: Arc::new(engine),
    }
}

/// OAuth client pointed at an unroutable address; only local operations work
pub fn offline_oauth() -> Arc<SpotifyOAuth> {
    let credentials = SpotifyCredentials {
        client_id: "0123456789abcdef0123456789abcdef".to_string(),
        client_secret: "fedcba9876543210fedcba9876543210".to_string(),
        redirect_uri: "http://127.0.0.1:5000/api/spotify-callback".to_string(),
    };
    let api = Arc::new(SpotifyClient::with_base_url("http://127.0.0.1:9/v1", 0).unwrap());
    Arc::new(SpotifyOAuth::with_accounts_url(credentials, api, "http://127.0.0.1:9").unwrap())
}

/// Settings with the shortest request deadline the engine accepts
pub fn one_second_deadline() -> SynthesisSettings {
    SynthesisSettings {
        request_timeout_secs: 1,
        ..test_settings()
    }
}

pub fn app_state(harness: &Harness) -> AppState {
    AppState::new(harness.engine.clone(), offline_oauth())
}

pub const ENERGETIC_ANSWER: &str = r#"{"emotion": "energetic", "themes": ["victory", "motivation"], "genres": ["dance pop", "edm", "power pop", "rock"], "energy_level": 8, "mood_description": "Charged up and unstoppable"}"#;

pub const COZY_ANSWER: &str = r#"{"playlist_name": "Coffee Shop Corner", "description": "Warm indie and acoustic tunes for a slow afternoon", "genres": ["indie folk", "acoustic", "indie pop"], "themes": ["coffee", "cozy"], "energy_level": 3}"#;
