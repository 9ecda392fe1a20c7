//! Core data model of the synthesis pipeline
//!
//! Every value here lives for one synthesis request:
//! - `IntentDescriptor`: produced once by the analyzer, immutable afterwards
//! - `SearchQuery`: planned from the descriptor
//! - `TrackCandidate`: one catalog hit, identity by `id`
//! - `RankedPool`: filtered, deduplicated, diversity-bounded candidates
//! - `PlaylistSpec`: the assembled tracklist handed to the materializer

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use thiserror::Error;

// ============================================================================
// Intent
// ============================================================================

/// Lowest and highest energy level a descriptor may carry
pub const ENERGY_MIN: u8 = 1;
pub const ENERGY_MAX: u8 = 10;

/// Most genres a descriptor keeps; bounds the planned query count
pub const MAX_GENRES: usize = 6;

/// Which path produced a descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DescriptorSource {
    /// First model answer parsed cleanly
    Model,
    /// Model answer parsed after the correction follow-up
    ModelRetry,
    /// Keyword heuristic on the raw text
    Heuristic,
}

impl DescriptorSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            DescriptorSource::Model => "model",
            DescriptorSource::ModelRetry => "model_retry",
            DescriptorSource::Heuristic => "heuristic",
        }
    }
}

/// Descriptor construction failures
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DescriptorError {
    #[error("no usable genres")]
    NoGenres,

    #[error("empty description")]
    EmptyDescription,
}

/// Structured musical intent extracted from free text
///
/// Built only through [`IntentDescriptor::new`], which guarantees `genres` is
/// non-empty, case-insensitively unique and at most [`MAX_GENRES`] long, and
/// that `energy_level` is within [`ENERGY_MIN`]..=[`ENERGY_MAX`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentDescriptor {
    pub description: String,
    pub genres: Vec<String>,
    pub energy_level: u8,
    pub themes: Vec<String>,
    /// Primary emotion (mood requests)
    pub emotion: Option<String>,
    /// Model-suggested playlist title (custom requests)
    pub playlist_name: Option<String>,
    pub source: DescriptorSource,
}

impl IntentDescriptor {
    /// Validate and normalize raw descriptor parts
    ///
    /// Energy values outside the supported range are clamped, not rejected.
    pub fn new(
        description: &str,
        genres: impl IntoIterator<Item = String>,
        energy_level: i64,
        themes: impl IntoIterator<Item = String>,
        source: DescriptorSource,
    ) -> Result<Self, DescriptorError> {
        let description = collapse_whitespace(description);
        if description.is_empty() {
            return Err(DescriptorError::EmptyDescription);
        }

        let mut genres = dedup_case_insensitive(genres);
        if genres.is_empty() {
            return Err(DescriptorError::NoGenres);
        }
        genres.truncate(MAX_GENRES);

        Ok(Self {
            description,
            genres,
            energy_level: clamp_energy(energy_level),
            themes: dedup_case_insensitive(themes),
            emotion: None,
            playlist_name: None,
            source,
        })
    }

    pub fn with_emotion(mut self, emotion: Option<String>) -> Self {
        self.emotion = non_blank(emotion);
        self
    }

    pub fn with_playlist_name(mut self, name: Option<String>) -> Self {
        self.playlist_name = non_blank(name);
        self
    }
}

/// Clamp any integer into the descriptor energy range
pub fn clamp_energy(value: i64) -> u8 {
    value.clamp(ENERGY_MIN as i64, ENERGY_MAX as i64) as u8
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| collapse_whitespace(&v))
        .filter(|v| !v.is_empty())
}

/// Trim, collapse inner whitespace
pub fn collapse_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Drop blanks and case-insensitive duplicates, keeping first occurrence
fn dedup_case_insensitive(values: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    values
        .into_iter()
        .map(|v| collapse_whitespace(&v))
        .filter(|v| !v.is_empty())
        .filter(|v| seen.insert(v.to_lowercase()))
        .collect()
}

// ============================================================================
// Search
// ============================================================================

/// One planned catalog search
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchQuery {
    pub text: String,
    /// Catalog market (ISO 3166-1 alpha-2); `None` searches globally
    pub market: Option<String>,
    pub genre_hint: Option<String>,
    /// Position in the planned order, 0 = most specific
    pub rank: usize,
}

/// A catalog track found by a search query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackCandidate {
    /// Catalog-unique track id
    pub id: String,
    /// Catalog URI used by the playlist write API
    pub uri: String,
    pub title: String,
    pub artists: Vec<String>,
    /// 0-100
    pub popularity: u8,
    pub market: Option<String>,
    pub source_query: Arc<SearchQuery>,
}

impl TrackCandidate {
    pub fn query_rank(&self) -> usize {
        self.source_query.rank
    }

    /// "Title by Artist, Artist"
    pub fn display_line(&self) -> String {
        if self.artists.is_empty() {
            self.title.clone()
        } else {
            format!("{} by {}", self.title, self.artists.join(", "))
        }
    }
}

// ============================================================================
// Pool and playlist
// ============================================================================

/// Deduplicated, diversity-bounded candidates ready for selection
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RankedPool {
    /// Unique by `id`, in filter order
    pub tracks: Vec<TrackCandidate>,
    /// Normalized artist name → admitted track count
    pub artist_counts: BTreeMap<String, usize>,
    /// Popularity floor that produced this pool
    pub floor: u8,
}

impl RankedPool {
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}

/// Final ordered tracklist plus playlist metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistSpec {
    pub name: String,
    pub description: String,
    pub language: String,
    pub requested_count: usize,
    /// At most `requested_count` tracks, no duplicate ids
    pub tracks: Vec<TrackCandidate>,
}

impl PlaylistSpec {
    pub fn track_uris(&self) -> Vec<String> {
        self.tracks.iter().map(|t| t.uri.clone()).collect()
    }

    /// Human-readable lines for the first `n` tracks
    pub fn sample_tracks(&self, n: usize) -> Vec<String> {
        self.tracks.iter().take(n).map(|t| t.display_line()).collect()
    }
}
