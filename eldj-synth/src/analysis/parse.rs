//! Model answer parsing and validation
//!
//! Models wrap JSON in prose or code fences, so the outermost `{ … }` span is
//! extracted before deserializing. Wrong types and missing required fields are
//! parse failures; out-of-range energy is clamped later by the descriptor.

use serde::Deserialize;
use thiserror::Error;

use crate::types::{DescriptorError, DescriptorSource, IntentDescriptor};

/// Why a model answer was rejected
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ParseFailure {
    #[error("no JSON object found")]
    NoJson,

    #[error("malformed JSON: {0}")]
    Malformed(String),

    #[error("missing required field \"{0}\"")]
    MissingField(&'static str),

    #[error("energy_level is not a number: {0}")]
    BadEnergy(String),

    #[error("invalid descriptor: {0}")]
    Invalid(#[from] DescriptorError),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawEnergy {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl RawEnergy {
    fn to_level(&self) -> Result<i64, ParseFailure> {
        match self {
            RawEnergy::Integer(value) => Ok(*value),
            RawEnergy::Float(value) if value.is_finite() => Ok(value.round() as i64),
            RawEnergy::Float(value) => Err(ParseFailure::BadEnergy(value.to_string())),
            RawEnergy::Text(text) => text
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .map(|v| v.round() as i64)
                .ok_or_else(|| ParseFailure::BadEnergy(text.clone())),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawDescriptor {
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    mood_description: Option<String>,
    #[serde(default)]
    genres: Option<Vec<String>>,
    #[serde(default)]
    energy_level: Option<RawEnergy>,
    #[serde(default)]
    themes: Option<Vec<String>>,
    #[serde(default)]
    emotion: Option<String>,
    #[serde(default)]
    playlist_name: Option<String>,
}

/// Outermost `{ … }` span of a model answer
pub fn extract_json_object(content: &str) -> Option<&str> {
    let start = content.find('{')?;
    let end = content.rfind('}')?;
    (end > start).then(|| &content[start..=end])
}

/// Parse and validate a model answer into a descriptor
pub fn parse_descriptor(
    content: &str,
    source: DescriptorSource,
) -> Result<IntentDescriptor, ParseFailure> {
    let json = extract_json_object(content).ok_or(ParseFailure::NoJson)?;
    let raw: RawDescriptor =
        serde_json::from_str(json).map_err(|e| ParseFailure::Malformed(e.to_string()))?;

    let description = raw
        .mood_description
        .or(raw.description)
        .ok_or(ParseFailure::MissingField("description"))?;
    let genres = raw.genres.ok_or(ParseFailure::MissingField("genres"))?;
    let energy = raw
        .energy_level
        .ok_or(ParseFailure::MissingField("energy_level"))?
        .to_level()?;

    let descriptor = IntentDescriptor::new(
        &description,
        genres,
        energy,
        raw.themes.unwrap_or_default(),
        source,
    )?
    .with_emotion(raw.emotion)
    .with_playlist_name(raw.playlist_name);

    Ok(descriptor)
}
