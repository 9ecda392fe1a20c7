//! Playlist synthesis endpoints

use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};
use eldj_common::api::{
    CustomPlaylistRequest, CustomPlaylistResponse, MoodAnalysisView, MoodPlaylistRequest,
    MoodPlaylistResponse, PlaylistConceptView, PlaylistView,
};

use crate::engine::{SynthesisOutcome, SynthesisRequest};
use crate::error::{ApiError, ApiResult};
use crate::AppState;

fn playlist_view(outcome: &SynthesisOutcome) -> PlaylistView {
    PlaylistView {
        playlist_name: outcome.playlist.name.clone(),
        playlist_url: outcome.playlist.url.clone(),
        track_count: outcome.playlist.track_count,
        requested_count: outcome.requested_count,
        short: outcome.short,
        sample_tracks: outcome.playlist.sample_tracks.clone(),
    }
}

/// Run a request, recording failures for `/health`
async fn run(state: &AppState, request: SynthesisRequest) -> ApiResult<SynthesisOutcome> {
    match state.engine.synthesize_detached(request).await {
        Ok(outcome) => Ok(outcome),
        Err(e) => {
            state.record_error(format!("{}: {}", e.code(), e)).await;
            Err(ApiError::from(e))
        }
    }
}

/// POST /api/mood-playlist
pub async fn mood_playlist(
    State(state): State<AppState>,
    body: Result<Json<MoodPlaylistRequest>, JsonRejection>,
) -> ApiResult<Json<MoodPlaylistResponse>> {
    let Json(request) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let outcome = run(&state, SynthesisRequest::mood(request.mood_text, request.language)).await?;

    let descriptor = &outcome.descriptor;
    Ok(Json(MoodPlaylistResponse {
        success: true,
        playlist: playlist_view(&outcome),
        mood_analysis: MoodAnalysisView {
            mood_description: descriptor.description.clone(),
            emotion: descriptor.emotion.clone(),
            genres: descriptor.genres.clone(),
            themes: descriptor.themes.clone(),
            energy_level: descriptor.energy_level,
            analysis_source: descriptor.source.as_str().to_string(),
        },
    }))
}

/// POST /api/custom-playlist
pub async fn custom_playlist(
    State(state): State<AppState>,
    body: Result<Json<CustomPlaylistRequest>, JsonRejection>,
) -> ApiResult<Json<CustomPlaylistResponse>> {
    let Json(request) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let synthesis = SynthesisRequest::custom(request.user_prompt, request.num_songs, request.language);
    let outcome = run(&state, synthesis).await?;

    let descriptor = &outcome.descriptor;
    Ok(Json(CustomPlaylistResponse {
        success: true,
        playlist: playlist_view(&outcome),
        playlist_concept: PlaylistConceptView {
            playlist_name: descriptor.playlist_name.clone(),
            description: descriptor.description.clone(),
            genres: descriptor.genres.clone(),
            themes: descriptor.themes.clone(),
            energy_level: descriptor.energy_level,
            analysis_source: descriptor.source.as_str().to_string(),
        },
    }))
}

pub fn playlist_routes() -> Router<AppState> {
    Router::new()
        .route("/api/mood-playlist", post(mood_playlist))
        .route("/api/custom-playlist", post(custom_playlist))
}
