//! Descriptor → ordered catalog search plan
//!
//! One genre query per descriptor genre, most specific first, then a single
//! free-text query built from themes and description. The plan is a pure
//! function of its inputs.

use crate::config::MarketTable;
use crate::types::{collapse_whitespace, IntentDescriptor, SearchQuery};

/// Longest free-text query sent to the catalog
pub const MAX_FREE_TEXT_CHARS: usize = 100;

/// Number of words in a genre name; "lo-fi hip hop" counts 4
pub fn genre_specificity(genre: &str) -> usize {
    genre
        .split(|c: char| c.is_whitespace() || c == '-' || c == '/')
        .filter(|token| !token.is_empty())
        .count()
}

/// Catalog query text restricting results to a genre
fn genre_query_text(genre: &str) -> String {
    format!("genre:\"{}\"", genre.replace('"', ""))
}

/// Themes followed by description, capped on a char boundary
fn free_text_query(descriptor: &IntentDescriptor) -> Option<String> {
    let joined = descriptor
        .themes
        .iter()
        .map(String::as_str)
        .chain(std::iter::once(descriptor.description.as_str()))
        .collect::<Vec<_>>()
        .join(" ");
    let text: String = collapse_whitespace(&joined).chars().take(MAX_FREE_TEXT_CHARS).collect();
    let text = text.trim_end().to_string();
    (!text.is_empty()).then_some(text)
}

/// Build the search plan for a descriptor
///
/// Output has at most `genres.len() + 1` queries with ranks `0..n` in order.
pub fn plan(descriptor: &IntentDescriptor, language: &str, markets: &MarketTable) -> Vec<SearchQuery> {
    let market = markets.market_for(language).map(str::to_string);

    let mut genres: Vec<&String> = descriptor.genres.iter().collect();
    // Stable: equally specific genres keep descriptor order
    genres.sort_by_key(|genre| std::cmp::Reverse(genre_specificity(genre)));

    let mut queries: Vec<SearchQuery> = genres
        .into_iter()
        .map(|genre| SearchQuery {
            text: genre_query_text(genre),
            market: market.clone(),
            genre_hint: Some(genre.clone()),
            rank: 0,
        })
        .collect();

    if let Some(text) = free_text_query(descriptor) {
        queries.push(SearchQuery {
            text,
            market: market.clone(),
            genre_hint: None,
            rank: 0,
        });
    }

    for (rank, query) in queries.iter_mut().enumerate() {
        query.rank = rank;
    }

    tracing::debug!(queries = queries.len(), market = ?market, "Search plan built");
    queries
}
