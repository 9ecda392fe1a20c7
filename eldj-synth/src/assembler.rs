//! Final track selection, ordering and playlist metadata
//!
//! Tracks are ordered by how close a coarse energy proxy lands to the
//! descriptor's energy level. Title and description come from fixed
//! templates. The clock is injected so assembly is a pure function.

use chrono::NaiveDate;
use std::cmp::Reverse;

use crate::analysis::{genre_energy, IntentRequest};
use crate::config::is_auto_detect;
use crate::types::{IntentDescriptor, PlaylistSpec, RankedPool, TrackCandidate};

/// Provider limit on playlist descriptions
pub const MAX_DESCRIPTION_CHARS: usize = 300;
/// Provider limit on playlist names
pub const MAX_NAME_CHARS: usize = 100;
const CURATOR_SIGNATURE: &str = "Curated by Elena - Your DJ";
const TITLE_WORDS: usize = 5;
/// Energy proxy weights, in tenths
const GENRE_WEIGHT: u32 = 7;
const POPULARITY_WEIGHT: u32 = 3;

/// Assembly result status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssemblyStatus {
    Complete,
    /// Fewer tracks than requested were available
    Short { available: usize },
    /// Nothing survived filtering
    Empty,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assembly {
    pub spec: PlaylistSpec,
    pub status: AssemblyStatus,
}

pub struct Assembler {
    today: NaiveDate,
}

impl Assembler {
    pub fn new(today: NaiveDate) -> Self {
        Self { today }
    }

    /// Select and order `min(requested_count, pool.len())` tracks
    pub fn assemble(
        &self,
        pool: &RankedPool,
        descriptor: &IntentDescriptor,
        requested_count: usize,
        language: &str,
        request: IntentRequest,
    ) -> Assembly {
        let target = u32::from(descriptor.energy_level) * 100;
        let fallback_energy = mean_genre_energy(descriptor);

        let mut ranked: Vec<(u32, &TrackCandidate)> = pool
            .tracks
            .iter()
            .map(|track| (energy_proxy(track, fallback_energy).abs_diff(target), track))
            .collect();
        ranked.sort_by(|(da, a), (db, b)| {
            (da, Reverse(a.popularity), a.query_rank(), &a.id).cmp(&(db, Reverse(b.popularity), b.query_rank(), &b.id))
        });

        let tracks: Vec<TrackCandidate> = ranked
            .into_iter()
            .take(requested_count)
            .map(|(_, track)| track.clone())
            .collect();

        let status = if tracks.is_empty() {
            AssemblyStatus::Empty
        } else if tracks.len() < requested_count {
            AssemblyStatus::Short {
                available: tracks.len(),
            }
        } else {
            AssemblyStatus::Complete
        };

        let spec = PlaylistSpec {
            name: self.title(descriptor, request),
            description: description(descriptor, language),
            language: language.trim().to_string(),
            requested_count,
            tracks,
        };

        Assembly { spec, status }
    }

    fn title(&self, descriptor: &IntentDescriptor, request: IntentRequest) -> String {
        let title = match request {
            IntentRequest::Mood => {
                let emotion = descriptor
                    .emotion
                    .as_deref()
                    .map(title_case)
                    .unwrap_or_else(|| "Mixed".to_string());
                format!("{} Vibes – {}", emotion, self.today.format("%B %Y"))
            }
            IntentRequest::Custom { .. } => match &descriptor.playlist_name {
                Some(name) => name.clone(),
                None => {
                    let words: Vec<&str> = descriptor.description.split_whitespace().take(TITLE_WORDS).collect();
                    title_case(&words.join(" "))
                }
            },
        };
        truncate_chars(&title, MAX_NAME_CHARS)
    }
}

/// Energy proxy scaled to 0..=1000: 70% genre energy, 30% popularity
fn energy_proxy(track: &TrackCandidate, fallback_energy: u32) -> u32 {
    let genre = track
        .source_query
        .genre_hint
        .as_deref()
        .and_then(genre_energy)
        .map(|e| e.clamp(1, 10) as u32 * 10)
        .unwrap_or(fallback_energy);
    GENRE_WEIGHT * genre + POPULARITY_WEIGHT * u32::from(track.popularity.min(100))
}

/// Mean energy (0..=100) of the descriptor genres we recognize, else 50
fn mean_genre_energy(descriptor: &IntentDescriptor) -> u32 {
    let known: Vec<i64> = descriptor.genres.iter().filter_map(|g| genre_energy(g)).collect();
    if known.is_empty() {
        return 50;
    }
    let mean = known.iter().sum::<i64>() as f64 / known.len() as f64;
    (mean * 10.0).round().clamp(10.0, 100.0) as u32
}

fn description(descriptor: &IntentDescriptor, language: &str) -> String {
    let mut parts = vec![descriptor.description.clone()];
    if !descriptor.themes.is_empty() {
        parts.push(descriptor.themes.join(", "));
    }

    let mut signature = CURATOR_SIGNATURE.to_string();
    let language = language.trim();
    if !language.is_empty() && !is_auto_detect(language) {
        signature.push_str(&format!(" with {} preference", language));
    }
    parts.push(signature);

    truncate_chars(&parts.join(" | "), MAX_DESCRIPTION_CHARS)
}

fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}
