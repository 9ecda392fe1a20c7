//! Spotify sign-in endpoints
//!
//! The UI opens `auth_url`, Spotify redirects the browser to the callback,
//! and either the callback page completes sign-in directly or the user pastes
//! the redirect URL into `/api/authenticate`.

use axum::{
    extract::{Query, State},
    response::Html,
    routing::{get, post},
    Json, Router,
};
use eldj_common::api::{AuthStatusResponse, AuthUrlResponse, AuthenticateRequest, AuthenticateResponse};
use serde::Deserialize;
use tracing::{info, warn};

use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// GET /api/auth-url
pub async fn auth_url(State(state): State<AppState>) -> ApiResult<Json<AuthUrlResponse>> {
    let auth_url = state.oauth.authorize_url()?;
    Ok(Json(AuthUrlResponse {
        auth_url,
        redirect_uri: state.oauth.redirect_uri().to_string(),
    }))
}

/// POST /api/authenticate
pub async fn authenticate(
    State(state): State<AppState>,
    Json(request): Json<AuthenticateRequest>,
) -> ApiResult<Json<AuthenticateResponse>> {
    if request.callback_url.trim().is_empty() {
        return Err(ApiError::BadRequest("callback_url is required".to_string()));
    }

    let user = state.oauth.authenticate(&request.callback_url).await.map_err(|e| {
        warn!(error = %e, "Spotify sign-in failed");
        ApiError::from(e)
    })?;

    Ok(Json(AuthenticateResponse {
        success: true,
        message: format!("Connected to Spotify as {}", user),
    }))
}

/// GET /api/auth-status
pub async fn auth_status(State(state): State<AppState>) -> Json<AuthStatusResponse> {
    Json(AuthStatusResponse {
        authenticated: state.engine.credentials().is_authenticated().await,
    })
}

/// POST /api/sign-out
pub async fn sign_out(State(state): State<AppState>) -> Json<AuthenticateResponse> {
    state.oauth.sign_out().await;
    info!("Signed out of Spotify");
    Json(AuthenticateResponse {
        success: true,
        message: "Signed out of Spotify".to_string(),
    })
}

#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    code: Option<String>,
    error: Option<String>,
}

/// GET /api/spotify-callback
///
/// Browser redirect target. Completes sign-in when a code is present.
pub async fn spotify_callback(
    State(state): State<AppState>,
    Query(params): Query<CallbackParams>,
) -> Html<String> {
    let outcome = match (params.code, params.error) {
        (_, Some(error)) => Err(format!("Spotify reported: {}", error)),
        (Some(code), None) => state.oauth.authenticate_code(&code).await.map_err(|e| e.to_string()),
        (None, None) => Err("No authorization code received".to_string()),
    };

    match outcome {
        Ok(user) => {
            info!(user = %user, "Sign-in completed from callback page");
            Html(callback_page(
                "Connected to Spotify",
                &format!("Signed in as {}. You can close this tab and return to the app.", escape_html(&user)),
            ))
        }
        Err(message) => {
            warn!(error = %message, "Callback sign-in failed");
            Html(callback_page(
                "Spotify sign-in failed",
                &format!("{}. Return to the app and try connecting again.", escape_html(&message)),
            ))
        }
    }
}

fn callback_page(title: &str, message: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\"><title>{title}</title></head>\
         <body style=\"font-family: sans-serif; text-align: center; margin-top: 15%\">\
         <h1>{title}</h1><p>{message}</p></body></html>"
    )
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/api/auth-url", get(auth_url))
        .route("/api/authenticate", post(authenticate))
        .route("/api/auth-status", get(auth_status))
        .route("/api/sign-out", post(sign_out))
        .route("/api/spotify-callback", get(spotify_callback))
}
