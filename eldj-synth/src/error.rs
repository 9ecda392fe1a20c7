//! HTTP error mapping
//!
//! Every error body is flat: `{ error, code, action, auth_needed? }`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use eldj_common::api::ErrorResponse;
use thiserror::Error;

use crate::auth::AuthError;
use crate::engine::{SynthesisError, UserAction};

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed request body (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Pipeline failure, status by kind
    #[error(transparent)]
    Synthesis(#[from] SynthesisError),

    /// Sign-in failure (400)
    #[error("Authentication failed: {0}")]
    Auth(#[from] AuthError),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Auth(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Synthesis(e) => match e {
                SynthesisError::Input(_) => StatusCode::BAD_REQUEST,
                SynthesisError::Analysis(_) | SynthesisError::Search | SynthesisError::Materialize(_) => {
                    StatusCode::BAD_GATEWAY
                }
                SynthesisError::EmptyResult => StatusCode::NOT_FOUND,
                SynthesisError::Auth(_) => StatusCode::UNAUTHORIZED,
                SynthesisError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
                SynthesisError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    fn body(&self) -> ErrorResponse {
        match self {
            ApiError::BadRequest(msg) => {
                ErrorResponse::new("BAD_REQUEST", msg.clone(), UserAction::Rephrase.as_str())
            }
            ApiError::Auth(e) => {
                ErrorResponse::new("AUTH_FAILED", e.to_string(), UserAction::Reauthenticate.as_str())
                    .with_auth_needed()
            }
            ApiError::Internal(msg) => {
                ErrorResponse::new("INTERNAL_ERROR", msg.clone(), UserAction::RetryLater.as_str())
            }
            ApiError::Synthesis(e) => {
                let body = ErrorResponse::new(e.code(), e.to_string(), e.action().as_str());
                if e.is_auth() {
                    body.with_auth_needed()
                } else {
                    body
                }
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self.body())).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
