//! Quality and diversity filtering with progressive popularity relaxation
//!
//! **Single pass** ([`filter_once`]):
//! 1. Drop candidates below the popularity floor
//! 2. Deduplicate by id, keeping the most popular instance
//!    (ties: the one found by the more specific query)
//! 3. Order by popularity desc, query rank asc, id asc
//! 4. Admit in order unless a credited artist already reached the cap
//!
//! **Relaxation** ([`QualityFilter::filter`]): while the pool is short of the
//! requested size, halve the floor and rerun on the full candidate set. The
//! last allowed step drops the floor to zero. At most `max_relaxation_steps`
//! reruns, floors never increase.

use std::cmp::{Ordering, Reverse};
use std::collections::{BTreeMap, HashMap};

use crate::types::{collapse_whitespace, RankedPool, TrackCandidate};

/// Artist key used for the diversity cap
pub fn normalize_artist(name: &str) -> String {
    collapse_whitespace(name).to_lowercase()
}

/// Filter order: most popular first, then most specific query, then id
fn pool_order(a: &TrackCandidate, b: &TrackCandidate) -> Ordering {
    (Reverse(a.popularity), a.query_rank(), &a.id).cmp(&(Reverse(b.popularity), b.query_rank(), &b.id))
}

/// One filtering pass at a fixed floor
pub fn filter_once(candidates: &[TrackCandidate], min_popularity: u8, max_per_artist: usize) -> RankedPool {
    let mut best: HashMap<&str, &TrackCandidate> = HashMap::new();
    for candidate in candidates.iter().filter(|c| c.popularity >= min_popularity) {
        best.entry(candidate.id.as_str())
            .and_modify(|current| {
                if pool_order(candidate, *current) == Ordering::Less {
                    *current = candidate;
                }
            })
            .or_insert(candidate);
    }

    let mut unique: Vec<&TrackCandidate> = best.into_values().collect();
    unique.sort_by(|a, b| pool_order(a, b));

    let mut tracks = Vec::new();
    let mut artist_counts: BTreeMap<String, usize> = BTreeMap::new();
    for candidate in unique {
        let mut artists: Vec<String> = candidate.artists.iter().map(|a| normalize_artist(a)).collect();
        artists.retain(|a| !a.is_empty());
        artists.sort();
        artists.dedup();

        let saturated = artists
            .iter()
            .any(|a| artist_counts.get(a).copied().unwrap_or(0) >= max_per_artist);
        if saturated {
            continue;
        }

        for artist in artists {
            *artist_counts.entry(artist).or_insert(0) += 1;
        }
        tracks.push(candidate.clone());
    }

    RankedPool {
        tracks,
        artist_counts,
        floor: min_popularity,
    }
}

/// Result of the relaxation loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterOutcome {
    pub pool: RankedPool,
    /// Floors tried, in order; first is the configured floor
    pub floors: Vec<u8>,
    /// Pool ended smaller than requested
    pub short: bool,
}

/// Filter parameters taken from configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QualityFilter {
    pub min_popularity: u8,
    pub max_per_artist: usize,
    pub max_relaxation_steps: u8,
}

impl Default for QualityFilter {
    fn default() -> Self {
        Self {
            min_popularity: 20,
            max_per_artist: 3,
            max_relaxation_steps: 3,
        }
    }
}

impl QualityFilter {
    /// Same limits starting from another popularity floor
    pub fn with_min_popularity(self, min_popularity: u8) -> Self {
        Self {
            min_popularity: min_popularity.min(100),
            ..self
        }
    }

    /// Floor for relaxation step `step` (1-based) of `max_steps`
    fn relaxed_floor(previous: u8, step: u8, max_steps: u8) -> u8 {
        if step >= max_steps {
            0
        } else {
            previous / 2
        }
    }

    /// Filter with progressive relaxation until `requested_count` or floor 0
    pub fn filter(&self, candidates: &[TrackCandidate], requested_count: usize) -> FilterOutcome {
        let max_per_artist = self.max_per_artist.max(1);
        let mut floor = self.min_popularity;
        let mut floors = vec![floor];
        let mut pool = filter_once(candidates, floor, max_per_artist);

        let mut step = 0u8;
        while pool.len() < requested_count && floor > 0 && step < self.max_relaxation_steps {
            step += 1;
            floor = Self::relaxed_floor(floor, step, self.max_relaxation_steps);
            floors.push(floor);
            pool = filter_once(candidates, floor, max_per_artist);

            tracing::debug!(step, floor, pool = pool.len(), requested = requested_count, "Relaxed popularity floor");
        }

        let short = pool.len() < requested_count;
        if short {
            tracing::info!(
                pool = pool.len(),
                requested = requested_count,
                floor,
                "Candidate pool is short of the requested size"
            );
        }

        FilterOutcome { pool, floors, short }
    }
}
