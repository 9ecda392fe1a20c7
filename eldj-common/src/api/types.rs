//! HTTP request/response types
//!
//! Field names are fixed by the web frontend and must not be renamed.

use serde::{Deserialize, Deserializer, Serialize};

fn default_language() -> String {
    "English".to_string()
}

/// Song counts as browsers and scripts actually send them
#[derive(Deserialize)]
#[serde(untagged)]
enum LenientCount {
    Integer(i64),
    Float(f64),
    Text(String),
}

/// Accept `20`, `20.0`, `"20"` and out-of-range numbers; unreadable text is
/// treated as absent. Range clamping is left to the server.
fn lenient_count<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<LenientCount>::deserialize(deserializer)?;
    Ok(raw.and_then(|raw| match raw {
        LenientCount::Integer(value) => Some(value),
        LenientCount::Float(value) if value.is_finite() => Some(value.round() as i64),
        LenientCount::Float(_) => None,
        LenientCount::Text(text) => text
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .map(|v| v.round() as i64),
    }))
}

// ========================================
// Authentication Types
// ========================================

/// `GET /api/auth-url` response
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct AuthUrlResponse {
    pub auth_url: String,
    pub redirect_uri: String,
}

/// `POST /api/authenticate` request
///
/// # Examples
///
/// ```
/// use eldj_common::api::types::AuthenticateRequest;
///
/// let request: AuthenticateRequest = serde_json::from_str(
///     r#"{"callback_url": "http://127.0.0.1:5000/api/spotify-callback?code=abc"}"#,
/// ).unwrap();
/// assert!(request.callback_url.contains("code=abc"));
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthenticateRequest {
    #[serde(default)]
    pub callback_url: String,
}

/// `POST /api/authenticate` response
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct AuthenticateResponse {
    pub success: bool,
    pub message: String,
}

/// `GET /api/auth-status` response
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct AuthStatusResponse {
    pub authenticated: bool,
}

// ========================================
// Playlist Types
// ========================================

/// `POST /api/mood-playlist` request
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MoodPlaylistRequest {
    #[serde(default)]
    pub mood_text: String,
    #[serde(default = "default_language")]
    pub language: String,
}

/// `POST /api/custom-playlist` request
///
/// `num_songs` is read leniently and left unclamped here; the server clamps it.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CustomPlaylistRequest {
    #[serde(default)]
    pub user_prompt: String,
    #[serde(default, deserialize_with = "lenient_count")]
    pub num_songs: Option<i64>,
    #[serde(default = "default_language")]
    pub language: String,
}

/// Materialized playlist summary
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct PlaylistView {
    pub playlist_name: String,
    pub playlist_url: String,
    pub track_count: usize,
    pub requested_count: usize,
    /// Fewer tracks than requested were available
    pub short: bool,
    pub sample_tracks: Vec<String>,
}

/// Analysis summary returned with a mood playlist
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct MoodAnalysisView {
    pub mood_description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emotion: Option<String>,
    pub genres: Vec<String>,
    pub themes: Vec<String>,
    pub energy_level: u8,
    /// "model", "model_retry" or "heuristic"
    pub analysis_source: String,
}

/// Concept summary returned with a custom playlist
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct PlaylistConceptView {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub playlist_name: Option<String>,
    pub description: String,
    pub genres: Vec<String>,
    pub themes: Vec<String>,
    pub energy_level: u8,
    pub analysis_source: String,
}

/// `POST /api/mood-playlist` response
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct MoodPlaylistResponse {
    pub success: bool,
    pub playlist: PlaylistView,
    pub mood_analysis: MoodAnalysisView,
}

/// `POST /api/custom-playlist` response
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct CustomPlaylistResponse {
    pub success: bool,
    pub playlist: PlaylistView,
    pub playlist_concept: PlaylistConceptView,
}

// ========================================
// Error Response Types
// ========================================

/// Error body for every failed API call
///
/// `auth_needed` is only present (and `true`) when the caller must restart
/// the authorization flow.
///
/// # Examples
///
/// ```
/// use eldj_common::api::types::ErrorResponse;
///
/// let body = ErrorResponse::new("INPUT_ERROR", "Too short", "rephrase");
/// let json = serde_json::to_value(&body).unwrap();
/// assert!(json.get("auth_needed").is_none());
/// ```
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    /// Suggested user action: "reauthenticate", "rephrase" or "retry_later"
    pub action: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub auth_needed: bool,
}

impl ErrorResponse {
    pub fn new(code: &str, error: impl Into<String>, action: &str) -> Self {
        Self {
            error: error.into(),
            code: code.to_string(),
            action: action.to_string(),
            auth_needed: false,
        }
    }

    pub fn with_auth_needed(mut self) -> Self {
        self.auth_needed = true;
        self
    }
}
