//! Synthesis engine: one request from free text to a materialized playlist
//!
//! Stage order: validate → analyze → plan → search → filter → assemble →
//! materialize. Validation runs before any network call. Every stage up to
//! assembly is bounded by the configured request timeout. Materialization is
//! bounded by the catalog client's per-call timeout instead, so a deadline
//! never cuts between creating a playlist and filling it.

use chrono::{Local, NaiveDate};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::analysis::{AnalysisError, IntentRequest, TextToIntent};
use crate::assembler::{Assembler, Assembly, AssemblyStatus};
use crate::auth::{AuthError, CredentialProvider};
use crate::catalog::{CatalogSearch, CatalogSearcher};
use crate::config::SynthesisConfig;
use crate::filter::QualityFilter;
use crate::materializer::{MaterializeError, MaterializedPlaylist, PlaylistMaterializer};
use crate::planner;
use crate::types::IntentDescriptor;

pub const MIN_MOOD_CHARS: usize = 3;
pub const MIN_CUSTOM_PROMPT_CHARS: usize = 5;
pub const MIN_NUM_SONGS: usize = 10;
pub const MAX_NUM_SONGS: usize = 50;
pub const DEFAULT_NUM_SONGS: usize = 25;

/// Clamp a caller-supplied playlist size; missing means the default
pub fn clamp_num_songs(num_songs: Option<i64>) -> usize {
    match num_songs {
        Some(n) => n.clamp(MIN_NUM_SONGS as i64, MAX_NUM_SONGS as i64) as usize,
        None => DEFAULT_NUM_SONGS,
    }
}

/// What the caller should do about a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserAction {
    Rephrase,
    Reauthenticate,
    RetryLater,
}

impl UserAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserAction::Rephrase => "rephrase",
            UserAction::Reauthenticate => "reauthenticate",
            UserAction::RetryLater => "retry_later",
        }
    }
}

/// Failures surfaced by a synthesis request
#[derive(Debug, Error)]
pub enum SynthesisError {
    #[error("{0}")]
    Input(String),

    #[error("Could not interpret the request: {0}")]
    Analysis(#[from] AnalysisError),

    #[error("Music search failed for every query")]
    Search,

    #[error("No tracks matched the request")]
    EmptyResult,

    #[error("{0}")]
    Auth(#[from] AuthError),

    #[error("Request timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("Playlist creation failed: {0}")]
    Materialize(MaterializeError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<MaterializeError> for SynthesisError {
    fn from(error: MaterializeError) -> Self {
        match error {
            MaterializeError::Unauthorized => SynthesisError::Auth(AuthError::Rejected),
            other => SynthesisError::Materialize(other),
        }
    }
}

impl SynthesisError {
    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            SynthesisError::Input(_) => "INPUT_ERROR",
            SynthesisError::Analysis(_) => "ANALYSIS_ERROR",
            SynthesisError::Search => "SEARCH_ERROR",
            SynthesisError::EmptyResult => "NO_RESULTS",
            SynthesisError::Auth(_) => "AUTH_REQUIRED",
            SynthesisError::Timeout(_) => "TIMEOUT",
            SynthesisError::Materialize(_) => "PLAYLIST_ERROR",
            SynthesisError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn action(&self) -> UserAction {
        match self {
            SynthesisError::Input(_) | SynthesisError::EmptyResult => UserAction::Rephrase,
            SynthesisError::Auth(_) => UserAction::Reauthenticate,
            _ => UserAction::RetryLater,
        }
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, SynthesisError::Auth(_))
    }
}

/// One synthesis request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesisRequest {
    pub text: String,
    pub language: String,
    pub kind: IntentRequest,
}

impl SynthesisRequest {
    pub fn mood(mood_text: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            text: mood_text.into(),
            language: language.into(),
            kind: IntentRequest::Mood,
        }
    }

    /// Custom playlist; `num_songs` is clamped to the supported range
    pub fn custom(prompt: impl Into<String>, num_songs: Option<i64>, language: impl Into<String>) -> Self {
        Self {
            text: prompt.into(),
            language: language.into(),
            kind: IntentRequest::Custom {
                num_songs: clamp_num_songs(num_songs),
            },
        }
    }

    fn requested_count(&self, config: &SynthesisConfig) -> usize {
        match self.kind {
            IntentRequest::Mood => config.settings.mood_track_count,
            IntentRequest::Custom { num_songs } => num_songs,
        }
    }

    /// Reject unusable input before any network call
    pub fn validate(&self) -> Result<(), SynthesisError> {
        let text = self.text.trim();
        match self.kind {
            IntentRequest::Mood if text.is_empty() => {
                Err(SynthesisError::Input("Please describe your mood".to_string()))
            }
            IntentRequest::Mood if text.chars().count() < MIN_MOOD_CHARS => {
                Err(SynthesisError::Input(format!(
                    "Please describe your mood in at least {} characters",
                    MIN_MOOD_CHARS
                )))
            }
            IntentRequest::Custom { .. } if text.chars().count() < MIN_CUSTOM_PROMPT_CHARS => {
                Err(SynthesisError::Input(format!(
                    "Please describe the playlist in at least {} characters",
                    MIN_CUSTOM_PROMPT_CHARS
                )))
            }
            _ => Ok(()),
        }
    }
}

/// A successfully materialized playlist and how it was derived
#[derive(Debug, Clone)]
pub struct SynthesisOutcome {
    pub request_id: Uuid,
    pub descriptor: IntentDescriptor,
    pub playlist: MaterializedPlaylist,
    pub requested_count: usize,
    /// Fewer tracks than requested were available
    pub short: bool,
    /// Popularity floors tried while filtering
    pub floors: Vec<u8>,
}

/// Everything decided before the playlist is written to the catalog
struct Prepared {
    descriptor: IntentDescriptor,
    assembly: Assembly,
    requested_count: usize,
    floors: Vec<u8>,
}

type Clock = Arc<dyn Fn() -> NaiveDate + Send + Sync>;

/// Owns the pipeline stages and their collaborators
pub struct SynthesisEngine {
    config: Arc<SynthesisConfig>,
    analyzer: Arc<dyn TextToIntent>,
    searcher: CatalogSearcher,
    materializer: Arc<dyn PlaylistMaterializer>,
    credentials: Arc<dyn CredentialProvider>,
    filter: QualityFilter,
    today: Clock,
}

impl SynthesisEngine {
    pub fn new(
        config: Arc<SynthesisConfig>,
        analyzer: Arc<dyn TextToIntent>,
        catalog: Arc<dyn CatalogSearch>,
        materializer: Arc<dyn PlaylistMaterializer>,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Self {
        let settings = &config.settings;
        let searcher = CatalogSearcher::new(catalog, config.search_backoff(), settings.search_concurrency);
        let filter = QualityFilter {
            min_popularity: settings.min_popularity,
            max_per_artist: settings.max_per_artist,
            max_relaxation_steps: settings.max_relaxation_steps,
        };

        Self {
            config,
            analyzer,
            searcher,
            materializer,
            credentials,
            filter,
            today: Arc::new(|| Local::now().date_naive()),
        }
    }

    /// Replace the date source used for playlist titles
    pub fn with_clock(mut self, today: impl Fn() -> NaiveDate + Send + Sync + 'static) -> Self {
        self.today = Arc::new(today);
        self
    }

    pub fn config(&self) -> &SynthesisConfig {
        &self.config
    }

    pub fn credentials(&self) -> &Arc<dyn CredentialProvider> {
        &self.credentials
    }

    /// Run one request under the request timeout
    pub async fn synthesize(&self, request: SynthesisRequest) -> Result<SynthesisOutcome, SynthesisError> {
        request.validate()?;

        let request_id = Uuid::new_v4();
        let kind = match request.kind {
            IntentRequest::Mood => "mood",
            IntentRequest::Custom { .. } => "custom",
        };
        let span = info_span!("synthesis", request_id = %request_id, kind);
        let timeout = self.config.request_timeout();

        let result = async {
            let prepared = tokio::time::timeout(timeout, self.prepare(&request))
                .await
                .unwrap_or(Err(SynthesisError::Timeout(timeout)))?;
            self.materialize(prepared, request_id).await
        }
        .instrument(span.clone())
        .await;

        if let Err(e) = &result {
            span.in_scope(|| error!(code = e.code(), error = %e, "Synthesis failed"));
        }
        result
    }

    /// Run a request on its own task
    ///
    /// If the caller goes away the task still finishes, its result is
    /// dropped with the handle.
    pub async fn synthesize_detached(
        self: &Arc<Self>,
        request: SynthesisRequest,
    ) -> Result<SynthesisOutcome, SynthesisError> {
        let engine = Arc::clone(self);
        tokio::spawn(async move { engine.synthesize(request).await })
            .await
            .map_err(|e| SynthesisError::Internal(format!("synthesis task failed: {}", e)))?
    }

    async fn prepare(&self, request: &SynthesisRequest) -> Result<Prepared, SynthesisError> {
        if !self.credentials.is_authenticated().await {
            return Err(AuthError::NotAuthenticated.into());
        }

        let requested_count = request.requested_count(&self.config);
        let descriptor = self
            .analyzer
            .analyze(&request.text, &request.language, request.kind)
            .await?;

        let plan = planner::plan(&descriptor, &request.language, &self.config.markets);

        let token = self.credentials.access_token().await?;
        let report = self
            .searcher
            .search_all(&plan, self.config.settings.search_limit, &token)
            .await;

        if report.all_failed(plan.len()) {
            if report.auth_rejected > 0 {
                return Err(AuthError::Rejected.into());
            }
            return Err(SynthesisError::Search);
        }

        let outcome = self
            .filter
            .with_min_popularity(self.config.initial_floor(&request.language))
            .filter(&report.candidates, requested_count);
        let assembly = Assembler::new((self.today)()).assemble(
            &outcome.pool,
            &descriptor,
            requested_count,
            &request.language,
            request.kind,
        );

        match assembly.status {
            AssemblyStatus::Empty => return Err(SynthesisError::EmptyResult),
            AssemblyStatus::Short { available } => {
                warn!(available, requested = requested_count, "Returning a short playlist")
            }
            AssemblyStatus::Complete => {}
        }

        Ok(Prepared {
            descriptor,
            assembly,
            requested_count,
            floors: outcome.floors,
        })
    }

    async fn materialize(&self, prepared: Prepared, request_id: Uuid) -> Result<SynthesisOutcome, SynthesisError> {
        let Prepared {
            descriptor,
            assembly,
            requested_count,
            floors,
        } = prepared;

        let token = self.credentials.access_token().await?;
        let playlist = self.materializer.materialize(&assembly.spec, &token).await?;

        info!(
            playlist_id = %playlist.id,
            tracks = playlist.track_count,
            requested = requested_count,
            source = descriptor.source.as_str(),
            "Playlist synthesized"
        );

        Ok(SynthesisOutcome {
            request_id,
            descriptor,
            requested_count,
            short: playlist.track_count < requested_count,
            floors,
            playlist,
        })
    }
}
