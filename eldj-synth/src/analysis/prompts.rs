//! Fixed instruction templates for intent extraction

use super::parse::ParseFailure;
use super::IntentRequest;
use crate::config::{is_auto_detect, MarketTable};
use crate::llm::{ChatMessage, CompletionOptions};

const MOOD_INSTRUCTIONS: &str = r#"You are a music curator. Analyze the listener's mood and describe music that fits it.

Return ONLY valid JSON with these keys:
- "emotion": primary emotion (e.g. "melancholic", "energetic", "peaceful")
- "themes": array of 2-3 themes (e.g. ["nostalgia", "chill"])
- "genres": array of 4-6 SPECIFIC music genres (e.g. ["indie rock", "acoustic folk", "lo-fi hip hop"])
- "energy_level": integer from 1 (very calm) to 10 (very intense)
- "mood_description": one short sentence describing the mood

Example:
{"emotion": "melancholic", "themes": ["nostalgia", "introspective"], "genres": ["indie folk", "acoustic pop", "singer-songwriter", "alternative rock"], "energy_level": 4, "mood_description": "Reflective and nostalgic"}"#;

const CUSTOM_INSTRUCTIONS: &str = r#"You are a music curator. Design a playlist concept for the listener's request.

Return ONLY valid JSON with these keys:
- "playlist_name": a creative playlist name
- "description": one or two sentences describing the playlist
- "genres": array of 3-6 SPECIFIC music genres
- "themes": array of 2-3 themes
- "energy_level": integer from 1 (very calm) to 10 (very intense)

Example:
{"playlist_name": "Late Night Drive", "description": "Smooth synths for empty highways", "genres": ["synthwave", "dream pop", "chillwave"], "themes": ["night", "freedom"], "energy_level": 6}"#;

/// Language guidance appended to the request
fn language_context(language: &str, markets: &MarketTable) -> String {
    if is_auto_detect(language) {
        "Language: detect it from the text and favor music from that language's region.".to_string()
    } else if markets.is_known(language) && !language.trim().eq_ignore_ascii_case("English") {
        format!(
            "Language: {}. Focus on {} music and popular artists from that region.",
            language.trim(),
            language.trim()
        )
    } else {
        format!("Language: {}.", language.trim())
    }
}

/// Initial conversation for one analysis
pub fn build_messages(
    free_text: &str,
    language: &str,
    request: IntentRequest,
    markets: &MarketTable,
) -> Vec<ChatMessage> {
    let (instructions, subject) = match request {
        IntentRequest::Mood => (MOOD_INSTRUCTIONS, "Mood".to_string()),
        IntentRequest::Custom { num_songs } => (
            CUSTOM_INSTRUCTIONS,
            format!("Playlist request ({} songs)", num_songs),
        ),
    };

    vec![
        ChatMessage::system(instructions),
        ChatMessage::user(format!(
            "{}: \"\"\"{}\"\"\"\n{}",
            subject,
            free_text.trim(),
            language_context(language, markets)
        )),
    ]
}

/// Follow-up sent after an unparsable answer
pub fn correction_message(failure: &ParseFailure) -> ChatMessage {
    ChatMessage::user(format!(
        "Your previous answer could not be used: {}. \
         Reply with ONLY the JSON object described above, no prose and no code fences. \
         \"genres\" must be a non-empty array of strings and \"energy_level\" an integer from 1 to 10.",
        failure
    ))
}

/// Completion options per request kind
pub fn completion_options(request: IntentRequest, temperature: f32) -> CompletionOptions {
    let max_tokens = match request {
        IntentRequest::Mood => 1024,
        IntentRequest::Custom { .. } => 1536,
    };
    CompletionOptions {
        temperature,
        max_tokens,
    }
}
