//! Deterministic keyword fallback for intent extraction
//!
//! Used when the model is unreachable or keeps answering with unusable
//! output. Explicit genre words in the text come first, then genres implied
//! by mood words.

use crate::types::{DescriptorSource, IntentDescriptor, MAX_GENRES};

/// Genres emitted when the text matches no keyword
const DEFAULT_GENRES: &[&str] = &["pop", "indie"];
const DEFAULT_ENERGY: i64 = 5;

struct MoodKeyword {
    words: &'static [&'static str],
    emotion: &'static str,
    theme: &'static str,
    genres: &'static [&'static str],
    energy: i64,
}

const MOOD_KEYWORDS: &[MoodKeyword] = &[
    MoodKeyword {
        words: &["energetic", "energy", "pumped", "hyped", "conquer", "unstoppable", "motivated", "powerful"],
        emotion: "energetic",
        theme: "motivation",
        genres: &["dance pop", "edm", "rock"],
        energy: 8,
    },
    MoodKeyword {
        words: &["party", "dance", "dancing", "club"],
        emotion: "euphoric",
        theme: "party",
        genres: &["dance pop", "house", "edm"],
        energy: 9,
    },
    MoodKeyword {
        words: &["workout", "gym", "running", "training"],
        emotion: "determined",
        theme: "workout",
        genres: &["edm", "hip hop", "rock"],
        energy: 9,
    },
    MoodKeyword {
        words: &["angry", "rage", "furious", "mad"],
        emotion: "angry",
        theme: "release",
        genres: &["metal", "hard rock", "punk"],
        energy: 9,
    },
    MoodKeyword {
        words: &["happy", "joy", "joyful", "cheerful", "sunny", "upbeat"],
        emotion: "happy",
        theme: "joy",
        genres: &["pop", "funk"],
        energy: 7,
    },
    MoodKeyword {
        words: &["road trip", "driving", "drive"],
        emotion: "adventurous",
        theme: "road trip",
        genres: &["indie rock", "rock", "pop"],
        energy: 6,
    },
    MoodKeyword {
        words: &["nostalgic", "nostalgia", "memories", "throwback"],
        emotion: "nostalgic",
        theme: "nostalgia",
        genres: &["classic rock", "synthpop"],
        energy: 5,
    },
    MoodKeyword {
        words: &["romantic", "love", "date"],
        emotion: "romantic",
        theme: "romance",
        genres: &["r&b", "soul", "pop"],
        energy: 4,
    },
    MoodKeyword {
        words: &["focus", "study", "studying", "concentrate", "concentration"],
        emotion: "focused",
        theme: "focus",
        genres: &["lo-fi", "ambient", "classical"],
        energy: 4,
    },
    MoodKeyword {
        words: &["sad", "heartbroken", "lonely", "crying", "melancholic", "melancholy", "blue"],
        emotion: "melancholic",
        theme: "heartbreak",
        genres: &["indie folk", "acoustic", "singer-songwriter"],
        energy: 3,
    },
    MoodKeyword {
        words: &["cozy", "coffee", "cafe", "rainy", "rain"],
        emotion: "cozy",
        theme: "cozy",
        genres: &["acoustic", "indie folk", "jazz"],
        energy: 3,
    },
    MoodKeyword {
        words: &["calm", "peaceful", "relaxed", "relax", "relaxing", "chill", "serene"],
        emotion: "peaceful",
        theme: "calm",
        genres: &["ambient", "lo-fi", "acoustic"],
        energy: 3,
    },
    MoodKeyword {
        words: &["sleep", "sleepy", "tired", "bedtime"],
        emotion: "sleepy",
        theme: "rest",
        genres: &["ambient", "classical"],
        energy: 2,
    },
];

/// Genre words recognized verbatim, with their typical energy
const GENRE_WORDS: &[(&str, i64)] = &[
    ("hip hop", 7),
    ("lo-fi", 3),
    ("r&b", 5),
    ("k-pop", 7),
    ("indie", 5),
    ("acoustic", 3),
    ("jazz", 4),
    ("blues", 4),
    ("rock", 7),
    ("metal", 9),
    ("punk", 8),
    ("rap", 7),
    ("classical", 2),
    ("electronic", 7),
    ("edm", 9),
    ("house", 8),
    ("techno", 8),
    ("pop", 6),
    ("folk", 3),
    ("soul", 5),
    ("reggae", 5),
    ("reggaeton", 8),
    ("country", 5),
    ("latin", 7),
    ("ambient", 2),
    ("funk", 7),
    ("disco", 8),
];

/// Typical energy (1-10) of a genre name, if recognized
///
/// Multi-word genres match on any recognized word ("indie folk" → folk
/// wins over indie because it is listed later in the name).
pub fn genre_energy(genre: &str) -> Option<i64> {
    let padded = normalize(genre);
    GENRE_WORDS
        .iter()
        .filter(|(word, _)| contains_phrase(&padded, word))
        .map(|(word, energy)| (padded.rfind(&format!(" {} ", word)), *energy))
        .max_by_key(|(position, _)| *position)
        .map(|(_, energy)| energy)
}

/// Lowercase, keep letters/digits/`&`/`-`, pad with spaces for phrase matching
fn normalize(text: &str) -> String {
    let cleaned: String = text
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '&' || c == '-' {
                c
            } else {
                ' '
            }
        })
        .collect();
    format!(" {} ", cleaned.split_whitespace().collect::<Vec<_>>().join(" "))
}

fn contains_phrase(padded: &str, phrase: &str) -> bool {
    padded.contains(&format!(" {} ", phrase))
}

fn push_unique(values: &mut Vec<String>, value: &str) {
    if !values.iter().any(|v| v.eq_ignore_ascii_case(value)) {
        values.push(value.to_string());
    }
}

/// Build a descriptor from keywords alone
///
/// Returns `None` when the text has no alphabetic content to work with.
pub fn heuristic_descriptor(free_text: &str) -> Option<IntentDescriptor> {
    if !free_text.chars().any(char::is_alphabetic) {
        return None;
    }

    let padded = normalize(free_text);
    let mut genres = Vec::new();
    let mut themes = Vec::new();
    let mut energies = Vec::new();
    let mut emotion = None;

    for (word, energy) in GENRE_WORDS {
        if contains_phrase(&padded, word) {
            push_unique(&mut genres, word);
            energies.push(*energy);
        }
    }

    for keyword in MOOD_KEYWORDS {
        if keyword.words.iter().any(|w| contains_phrase(&padded, w)) {
            emotion.get_or_insert(keyword.emotion);
            push_unique(&mut themes, keyword.theme);
            for genre in keyword.genres {
                push_unique(&mut genres, genre);
            }
            energies.push(keyword.energy);
        }
    }

    if genres.is_empty() {
        genres.extend(DEFAULT_GENRES.iter().map(|g| g.to_string()));
    }
    genres.truncate(MAX_GENRES);

    let energy = if energies.is_empty() {
        DEFAULT_ENERGY
    } else {
        let sum: i64 = energies.iter().sum();
        (sum as f64 / energies.len() as f64).round() as i64
    };

    let summary: String = free_text.trim().chars().take(80).collect();
    let description = format!("Inspired by \"{}\"", summary.trim());

    IntentDescriptor::new(&description, genres, energy, themes, DescriptorSource::Heuristic)
        .ok()
        .map(|d| d.with_emotion(emotion.map(str::to_string)))
}
