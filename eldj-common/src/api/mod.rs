//! API types shared between the HTTP layer and its clients

pub mod types;

pub use types::{
    AuthStatusResponse, AuthUrlResponse, AuthenticateRequest, AuthenticateResponse,
    CustomPlaylistRequest, CustomPlaylistResponse, ErrorResponse, MoodAnalysisView,
    MoodPlaylistRequest, MoodPlaylistResponse, PlaylistConceptView, PlaylistView,
};
