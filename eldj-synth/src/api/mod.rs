//! HTTP API handlers

pub mod auth;
pub mod health;
pub mod playlists;

pub use auth::auth_routes;
pub use health::health_routes;
pub use playlists::playlist_routes;
