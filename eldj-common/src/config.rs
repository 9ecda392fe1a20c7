//! Configuration loading and credential resolution
//!
//! The service reads a single TOML file. Every section and field carries a
//! serde default, so a missing file or a partial file never prevents startup.
//!
//! Config file resolution order:
//! 1. Command-line `--config` path (highest priority, must exist)
//! 2. `ELDJ_CONFIG` environment variable (must exist)
//! 3. `~/.config/eldj/config.toml`
//! 4. `/etc/eldj/config.toml`
//! 5. Compiled defaults (fallback)
//!
//! Secrets resolve ENV → TOML.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "ELDJ_CONFIG";

/// Root TOML document
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct TomlConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub synthesis: SynthesisSettings,
    pub llm: LlmConfig,
    pub spotify: SpotifyConfig,
}

/// `[server]` section
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
        }
    }
}

/// `[logging]` section
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default tracing level, overridden by `RUST_LOG`
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// `[synthesis]` section: tunables of the playlist synthesis pipeline
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct SynthesisSettings {
    /// Initial popularity floor (0-100) for languages without their own
    pub min_popularity: u8,
    /// Start from the language's own floor where the market table has one
    pub language_floors: bool,
    /// Maximum tracks admitted per normalized artist name
    pub max_per_artist: usize,
    /// Maximum number of popularity-floor relaxations
    pub max_relaxation_steps: u8,
    /// Tracks requested from the catalog per query
    pub search_limit: u32,
    /// Concurrent outbound catalog searches
    pub search_concurrency: usize,
    /// Whole-request deadline
    pub request_timeout_secs: u64,
    /// Attempts per catalog query, including the first
    pub search_max_attempts: u32,
    pub search_initial_backoff_ms: u64,
    pub search_max_backoff_ms: u64,
    /// Minimum spacing between catalog requests
    pub catalog_min_interval_ms: u64,
    /// Track count for mood playlists
    pub mood_track_count: usize,
}

impl Default for SynthesisSettings {
    fn default() -> Self {
        Self {
            min_popularity: 20,
            language_floors: true,
            max_per_artist: 3,
            max_relaxation_steps: 3,
            search_limit: 20,
            search_concurrency: 4,
            request_timeout_secs: 30,
            search_max_attempts: 3,
            search_initial_backoff_ms: 250,
            search_max_backoff_ms: 4000,
            catalog_min_interval_ms: 50,
            mood_track_count: 25,
        }
    }
}

impl SynthesisSettings {
    /// Clamp every tunable into its supported range
    pub fn sanitized(mut self) -> Self {
        self.min_popularity = self.min_popularity.min(100);
        self.max_per_artist = self.max_per_artist.max(1);
        self.max_relaxation_steps = self.max_relaxation_steps.min(8);
        self.search_limit = self.search_limit.clamp(1, 200);
        self.search_concurrency = self.search_concurrency.clamp(1, 6);
        self.request_timeout_secs = self.request_timeout_secs.max(1);
        self.search_max_attempts = self.search_max_attempts.clamp(1, 10);
        self.search_max_backoff_ms = self
            .search_max_backoff_ms
            .max(self.search_initial_backoff_ms);
        self.mood_track_count = self.mood_track_count.clamp(1, 100);
        self
    }
}

/// `[llm]` section: OpenAI-compatible chat completion endpoint
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct LlmConfig {
    pub api_url: String,
    pub model: String,
    pub temperature: f32,
    pub timeout_secs: u64,
    pub api_key: Option<String>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.groq.com/openai/v1/chat/completions".to_string(),
            model: "llama3-70b-8192".to_string(),
            temperature: 0.3,
            timeout_secs: 20,
            api_key: None,
        }
    }
}

impl LlmConfig {
    /// Resolve the model API key (`GROQ_API_KEY` → TOML)
    pub fn resolve_api_key(&self) -> Result<String> {
        resolve_secret("GROQ_API_KEY", self.api_key.as_deref()).ok_or_else(|| {
            Error::Config(
                "Language model API key not configured. Set GROQ_API_KEY or [llm] api_key"
                    .to_string(),
            )
        })
    }
}

/// `[spotify]` section
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct SpotifyConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub redirect_uri: Option<String>,
}

/// Validated Spotify application credentials
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpotifyCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
}

/// Redirect used when neither ENV nor TOML provides one
pub const DEFAULT_REDIRECT_URI: &str = "http://127.0.0.1:5000/api/spotify-callback";

impl SpotifyConfig {
    /// Resolve and validate the Spotify application credentials
    pub fn resolve(&self) -> Result<SpotifyCredentials> {
        let client_id = resolve_secret("SPOTIFY_CLIENT_ID", self.client_id.as_deref())
            .ok_or_else(|| Error::Config("Spotify client id not configured".to_string()))?;
        let client_secret = resolve_secret("SPOTIFY_CLIENT_SECRET", self.client_secret.as_deref())
            .ok_or_else(|| Error::Config("Spotify client secret not configured".to_string()))?;

        validate_spotify_credential("client id", &client_id)?;
        validate_spotify_credential("client secret", &client_secret)?;

        let redirect_uri = resolve_secret("SPOTIFY_REDIRECT_URI", self.redirect_uri.as_deref())
            .unwrap_or_else(|| DEFAULT_REDIRECT_URI.to_string());

        info!(
            client_id_prefix = %&client_id[..8],
            redirect_uri = %redirect_uri,
            "Spotify credentials resolved"
        );

        Ok(SpotifyCredentials {
            client_id,
            client_secret,
            redirect_uri,
        })
    }
}

// ============================================================================
// File resolution
// ============================================================================

/// Find the config file to load, if any
///
/// Explicit locations (CLI, ENV) are returned even when missing so that
/// `load_config` can report them; implicit locations are skipped when absent.
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    let user_config = dirs::config_dir().map(|d| d.join("eldj").join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    let system_config = PathBuf::from("/etc/eldj/config.toml");
    if system_config.exists() {
        return Some(system_config);
    }

    None
}

/// Load configuration following the resolution order
pub fn load_config(cli_arg: Option<&Path>) -> Result<TomlConfig> {
    match resolve_config_path(cli_arg) {
        Some(path) => load_config_file(&path),
        None => {
            warn!("No config file found, using compiled defaults");
            Ok(TomlConfig::default())
        }
    }
}

/// Parse one TOML config file
pub fn load_config_file(path: &Path) -> Result<TomlConfig> {
    if !path.exists() {
        return Err(Error::Config(format!("Config file not found: {}", path.display())));
    }
    let content = std::fs::read_to_string(path)?;
    let mut config: TomlConfig = toml::from_str(&content)?;
    config.synthesis = config.synthesis.sanitized();
    info!("Loaded configuration from {}", path.display());
    Ok(config)
}

// ============================================================================
// Credentials
// ============================================================================

/// Strip copy-paste artifacts from a credential
///
/// Removes non-ASCII characters (including zero-width spaces and ellipses),
/// surrounding whitespace, embedded newlines and one trailing punctuation mark.
pub fn clean_credential(raw: &str) -> String {
    let ascii: String = raw
        .chars()
        .filter(|c| c.is_ascii())
        .filter(|c| *c != '\n' && *c != '\r')
        .collect();
    let mut cleaned = ascii.trim().to_string();

    if let Some(last) = cleaned.chars().last() {
        if !(last.is_ascii_alphanumeric() || last == '_' || last == '-') {
            cleaned.pop();
        }
    }

    cleaned
}

/// Resolve a secret from the environment, then TOML
///
/// Values are cleaned before use; empty values count as absent.
pub fn resolve_secret(env_var: &str, toml_value: Option<&str>) -> Option<String> {
    let env_value = std::env::var(env_var)
        .ok()
        .map(|v| clean_credential(&v))
        .filter(|v| !v.is_empty());
    let toml_value = toml_value
        .map(clean_credential)
        .filter(|v| !v.is_empty());

    if env_value.is_some() && toml_value.is_some() {
        warn!(
            "{} found in both environment and TOML. Using environment (highest priority).",
            env_var
        );
    }

    env_value.or(toml_value)
}

/// Spotify ids and secrets are 32 ASCII alphanumeric characters
pub fn validate_spotify_credential(name: &str, value: &str) -> Result<()> {
    if value.len() != 32 || !value.chars().all(|c| c.is_ascii_alphanumeric()) {
        warn!(
            length = value.len(),
            "Spotify {} format seems incorrect",
            name
        );
        return Err(Error::Config(format!("Spotify {} format is invalid", name)));
    }
    Ok(())
}
