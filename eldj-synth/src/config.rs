//! Process-wide read-only configuration for the synthesis pipeline
//!
//! Built once at startup from the TOML `[synthesis]` section and shared by
//! `Arc` with every request. Nothing here is mutated after construction.

use eldj_common::config::SynthesisSettings;
use std::collections::HashMap;
use std::time::Duration;

use crate::utils::retry::BackoffPolicy;

/// Language passed by the UI when the user did not pick one
pub const AUTO_DETECT: &str = "Auto-detect";

/// UI language → catalog market and that market's starting popularity floor
///
/// Smaller markets start lower so regional catalogs are not filtered away.
const LANGUAGE_MARKETS: &[(&str, &str, Option<u8>)] = &[
    ("English", "US", Some(60)),
    ("Spanish", "ES", Some(45)),
    ("French", "FR", Some(45)),
    ("German", "DE", Some(45)),
    ("Italian", "IT", Some(45)),
    ("Portuguese", "BR", Some(45)),
    ("Turkish", "TR", Some(45)),
    ("Japanese", "JP", Some(40)),
    ("Korean", "KR", Some(40)),
    ("Arabic", "SA", None),
    ("Hindi", "IN", None),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct MarketEntry {
    market: &'static str,
    min_popularity: Option<u8>,
}

/// Static language → market lookup
#[derive(Debug, Clone)]
pub struct MarketTable {
    by_language: HashMap<String, MarketEntry>,
}

impl MarketTable {
    pub fn new() -> Self {
        let by_language = LANGUAGE_MARKETS
            .iter()
            .map(|(language, market, min_popularity)| {
                let entry = MarketEntry {
                    market: *market,
                    min_popularity: *min_popularity,
                };
                (language.to_lowercase(), entry)
            })
            .collect();
        Self { by_language }
    }

    fn entry(&self, language: &str) -> Option<&MarketEntry> {
        self.by_language.get(&language.trim().to_lowercase())
    }

    /// Market for a UI language; `None` for unknown languages and auto-detect
    pub fn market_for(&self, language: &str) -> Option<&'static str> {
        self.entry(language).map(|e| e.market)
    }

    /// Starting popularity floor for a language, if it has its own
    pub fn min_popularity_for(&self, language: &str) -> Option<u8> {
        self.entry(language).and_then(|e| e.min_popularity)
    }

    /// Whether a language names a concrete, known language
    pub fn is_known(&self, language: &str) -> bool {
        self.entry(language).is_some()
    }
}

impl Default for MarketTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Whether the caller asked for language auto-detection
pub fn is_auto_detect(language: &str) -> bool {
    language.trim().eq_ignore_ascii_case(AUTO_DETECT)
}

/// Read-only configuration passed by reference to every pipeline stage
#[derive(Debug, Clone)]
pub struct SynthesisConfig {
    pub settings: SynthesisSettings,
    pub markets: MarketTable,
}

impl SynthesisConfig {
    pub fn new(settings: SynthesisSettings) -> Self {
        Self {
            settings: settings.sanitized(),
            markets: MarketTable::new(),
        }
    }

    /// Popularity floor the filter starts from for a request language
    pub fn initial_floor(&self, language: &str) -> u8 {
        let own = self
            .settings
            .language_floors
            .then(|| self.markets.min_popularity_for(language))
            .flatten();
        own.unwrap_or(self.settings.min_popularity)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.settings.request_timeout_secs)
    }

    pub fn search_backoff(&self) -> BackoffPolicy {
        BackoffPolicy {
            max_attempts: self.settings.search_max_attempts,
            initial_delay: Duration::from_millis(self.settings.search_initial_backoff_ms),
            max_delay: Duration::from_millis(self.settings.search_max_backoff_ms),
            multiplier: 2,
        }
    }
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self::new(SynthesisSettings::default())
    }
}
