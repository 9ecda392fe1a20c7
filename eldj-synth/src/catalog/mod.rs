//! Catalog search with retry, pagination and bounded fan-out
//!
//! `CatalogSearch` is the raw one-page network call. `CatalogSearcher` layers
//! the pipeline semantics on top: backoff on transient failures, paging up to
//! a per-query limit, and tolerating failed queries as empty results.

pub mod spotify_client;

pub use spotify_client::{SpotifyClient, SpotifyUser};

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::auth::AccessToken;
use crate::types::{SearchQuery, TrackCandidate};
use crate::utils::retry::{retry_with_backoff, BackoffPolicy, RetryDecision};

/// Largest page the catalog returns per request
pub const MAX_PAGE_SIZE: u32 = 50;

/// Catalog search errors
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CatalogError {
    #[error("Catalog rejected the access token")]
    Unauthorized,

    #[error("Rate limited (retry after {retry_after:?})")]
    RateLimited { retry_after: Option<Duration> },

    #[error("Server error {0}: {1}")]
    Server(u16, String),

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timeout")]
    Timeout,

    #[error("Parse error: {0}")]
    Parse(String),
}

impl CatalogError {
    /// Timeouts, network failures, 5xx and 429 are worth retrying
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            CatalogError::RateLimited { .. }
                | CatalogError::Server(..)
                | CatalogError::Network(_)
                | CatalogError::Timeout
        )
    }

    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            CatalogError::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }

    fn retry_decision(&self) -> RetryDecision {
        if self.is_transient() {
            RetryDecision::Retry {
                after: self.retry_after(),
            }
        } else {
            RetryDecision::Fail
        }
    }
}

/// A track as the catalog reports it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogTrack {
    pub id: String,
    pub uri: String,
    pub name: String,
    pub artists: Vec<String>,
    pub popularity: u8,
}

/// One page of search results
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchPage {
    pub tracks: Vec<CatalogTrack>,
    /// Whether the catalog has results past this page
    pub has_more: bool,
}

/// Raw catalog search call
#[async_trait]
pub trait CatalogSearch: Send + Sync {
    /// Fetch one page of track results for `query`
    async fn search_page(
        &self,
        query: &SearchQuery,
        limit: u32,
        offset: u32,
        token: &AccessToken,
    ) -> Result<SearchPage, CatalogError>;
}

/// Merged results of a whole search plan
#[derive(Debug, Clone, Default)]
pub struct SearchReport {
    /// All candidates, grouped by query rank
    pub candidates: Vec<TrackCandidate>,
    /// Queries that produced nothing because they failed
    pub failed_queries: usize,
    /// Failed queries whose failure was an authorization rejection
    pub auth_rejected: usize,
}

impl SearchReport {
    /// Every planned query failed outright
    pub fn all_failed(&self, planned: usize) -> bool {
        planned > 0 && self.failed_queries == planned
    }
}

/// Pipeline-facing searcher over a `CatalogSearch` backend
#[derive(Clone)]
pub struct CatalogSearcher {
    backend: Arc<dyn CatalogSearch>,
    backoff: BackoffPolicy,
    concurrency: usize,
}

impl CatalogSearcher {
    pub fn new(backend: Arc<dyn CatalogSearch>, backoff: BackoffPolicy, concurrency: usize) -> Self {
        Self {
            backend,
            backoff,
            concurrency: concurrency.clamp(1, 6),
        }
    }

    /// Search one query, treating failure as an empty result
    pub async fn search(
        &self,
        query: Arc<SearchQuery>,
        limit: u32,
        token: &AccessToken,
    ) -> Vec<TrackCandidate> {
        self.try_search(query, limit, token).await.unwrap_or_default()
    }

    /// Search one query, paging until `limit` tracks or the catalog runs out
    ///
    /// A failure after the first page keeps the tracks already collected.
    pub async fn try_search(
        &self,
        query: Arc<SearchQuery>,
        limit: u32,
        token: &AccessToken,
    ) -> Result<Vec<TrackCandidate>, CatalogError> {
        let mut candidates: Vec<TrackCandidate> = Vec::new();
        let mut offset = 0u32;

        while (candidates.len() as u32) < limit {
            let page_size = (limit - candidates.len() as u32).min(MAX_PAGE_SIZE);
            let result = retry_with_backoff(
                "catalog_search",
                &self.backoff,
                |attempt| {
                    debug!(query = %query.text, offset, attempt, "Searching catalog");
                    self.backend.search_page(&query, page_size, offset, token)
                },
                CatalogError::retry_decision,
            )
            .await;

            let page = match result {
                Ok(page) => page,
                Err(e) if candidates.is_empty() => {
                    warn!(query = %query.text, error = %e, "Catalog query failed");
                    return Err(e);
                }
                Err(e) => {
                    warn!(
                        query = %query.text,
                        collected = candidates.len(),
                        error = %e,
                        "Catalog paging stopped early"
                    );
                    break;
                }
            };

            let received = page.tracks.len() as u32;
            candidates.extend(page.tracks.into_iter().map(|track| TrackCandidate {
                id: track.id,
                uri: track.uri,
                title: track.name,
                artists: track.artists,
                popularity: track.popularity.min(100),
                market: query.market.clone(),
                source_query: Arc::clone(&query),
            }));

            if received == 0 || !page.has_more {
                break;
            }
            offset += received;
        }

        candidates.truncate(limit as usize);
        Ok(candidates)
    }

    /// Run a whole plan with bounded concurrency
    ///
    /// Waits for every query. Results are merged in query-rank order, so the
    /// output does not depend on completion order.
    pub async fn search_all(
        &self,
        plan: &[SearchQuery],
        limit: u32,
        token: &AccessToken,
    ) -> SearchReport {
        let mut results: Vec<(usize, Result<Vec<TrackCandidate>, CatalogError>)> =
            stream::iter(plan.iter().cloned().map(Arc::new))
                .map(|query| async move {
                    let rank = query.rank;
                    (rank, self.try_search(query, limit, token).await)
                })
                .buffer_unordered(self.concurrency)
                .collect()
                .await;

        results.sort_by_key(|(rank, _)| *rank);

        let mut report = SearchReport::default();
        for (_, result) in results {
            match result {
                Ok(candidates) => report.candidates.extend(candidates),
                Err(e) => {
                    report.failed_queries += 1;
                    if e == CatalogError::Unauthorized {
                        report.auth_rejected += 1;
                    }
                }
            }
        }

        info!(
            queries = plan.len(),
            failed = report.failed_queries,
            candidates = report.candidates.len(),
            "Catalog search complete"
        );
        report
    }
}
