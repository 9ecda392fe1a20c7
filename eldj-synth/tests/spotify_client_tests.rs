//! Spotify client and OAuth tests against a local mock of the Web API

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Form, Json, Router,
};
use eldj_common::config::SpotifyCredentials;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use eldj_synth::auth::{AccessToken, AuthError, CredentialProvider, SpotifyOAuth};
use eldj_synth::catalog::{CatalogSearch, CatalogSearcher, SpotifyClient};
use eldj_synth::materializer::{MaterializeError, PlaylistMaterializer};
use eldj_synth::types::{PlaylistSpec, SearchQuery, TrackCandidate};
use eldj_synth::utils::BackoffPolicy;

const TOTAL_RESULTS: u32 = 75;

#[derive(Default)]
struct MockSpotify {
    search_calls: AtomicUsize,
    rate_limit_next: AtomicBool,
    last_search: Mutex<HashMap<String, String>>,
    track_batches: Mutex<Vec<usize>>,
    token_grants: Mutex<Vec<String>>,
}

type Shared = Arc<MockSpotify>;

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.starts_with("Bearer ") && v != "Bearer bad")
        .unwrap_or(false)
}

async fn search(
    State(mock): State<Shared>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    mock.search_calls.fetch_add(1, Ordering::SeqCst);
    if !authorized(&headers) {
        return (StatusCode::UNAUTHORIZED, HeaderMap::new(), Json(json!({}))).into_response();
    }
    if mock.rate_limit_next.swap(false, Ordering::SeqCst) {
        let mut headers = HeaderMap::new();
        headers.insert(header::RETRY_AFTER, "0".parse().unwrap());
        return (StatusCode::TOO_MANY_REQUESTS, headers, Json(json!({}))).into_response();
    }

    *mock.last_search.lock().unwrap() = params.clone();
    let limit: u32 = params["limit"].parse().unwrap();
    let offset: u32 = params["offset"].parse().unwrap();
    let end = (offset + limit).min(TOTAL_RESULTS);
    let items: Vec<Value> = (offset..end)
        .map(|i| {
            json!({
                "id": format!("id{}", i),
                "uri": format!("spotify:track:id{}", i),
                "name": format!("Song {}", i),
                "popularity": 40 + i % 50,
                "artists": [{ "name": format!("Artist {}", i % 10) }]
            })
        })
        .collect();
    let next = if end < TOTAL_RESULTS { json!("https://api.spotify.com/v1/search?next") } else { Value::Null };

    Json(json!({ "tracks": { "items": items, "next": next, "total": TOTAL_RESULTS } })).into_response()
}

async fn me(headers: HeaderMap) -> impl IntoResponse {
    if !authorized(&headers) {
        return (StatusCode::UNAUTHORIZED, Json(json!({ "error": { "status": 401 } })));
    }
    (StatusCode::OK, Json(json!({ "id": "user1", "display_name": "Listener" })))
}

async fn create_playlist(Path(user): Path<String>, Json(body): Json<Value>) -> impl IntoResponse {
    assert_eq!(user, "user1");
    assert_eq!(body["public"], false);
    (
        StatusCode::CREATED,
        Json(json!({
            "id": "pl9",
            "name": body["name"],
            "external_urls": { "spotify": "https://open.spotify.com/playlist/pl9" }
        })),
    )
}

async fn add_tracks(State(mock): State<Shared>, Json(body): Json<Value>) -> impl IntoResponse {
    let count = body["uris"].as_array().map(|u| u.len()).unwrap_or(0);
    mock.track_batches.lock().unwrap().push(count);
    (StatusCode::CREATED, Json(json!({ "snapshot_id": "snap" })))
}

async fn token(State(mock): State<Shared>, Form(form): Form<HashMap<String, String>>) -> impl IntoResponse {
    let grant = form.get("grant_type").cloned().unwrap_or_default();
    mock.token_grants.lock().unwrap().push(grant.clone());
    match grant.as_str() {
        "authorization_code" if form.get("code").map(String::as_str) == Some("good-code") => (
            StatusCode::OK,
            // Already inside the expiry margin, so the next use refreshes
            Json(json!({ "access_token": "tok1", "refresh_token": "ref1", "expires_in": 0 })),
        ),
        "refresh_token" => (
            StatusCode::OK,
            Json(json!({ "access_token": "tok2", "expires_in": 3600 })),
        ),
        _ => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "invalid_grant", "error_description": "Invalid authorization code" })),
        ),
    }
}

/// Start the mock on an ephemeral port; returns its base URL
async fn start_mock() -> (String, Shared) {
    let mock: Shared = Arc::new(MockSpotify::default());
    let app = Router::new()
        .route("/v1/search", get(search))
        .route("/v1/me", get(me))
        .route("/v1/users/:user/playlists", post(create_playlist))
        .route("/v1/playlists/:id/tracks", post(add_tracks))
        .route("/api/token", post(token))
        .with_state(mock.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}", addr), mock)
}

fn query(market: Option<&str>) -> SearchQuery {
    SearchQuery {
        text: "genre:\"indie rock\"".to_string(),
        market: market.map(str::to_string),
        genre_hint: Some("indie rock".to_string()),
        rank: 0,
    }
}

fn spec(track_count: usize) -> PlaylistSpec {
    let source = Arc::new(query(Some("US")));
    PlaylistSpec {
        name: "Test Vibes".to_string(),
        description: "desc".to_string(),
        language: "English".to_string(),
        requested_count: track_count,
        tracks: (0..track_count)
            .map(|i| TrackCandidate {
                id: format!("id{}", i),
                uri: format!("spotify:track:id{}", i),
                title: format!("Song {}", i),
                artists: vec!["Artist".to_string()],
                popularity: 50,
                market: Some("US".to_string()),
                source_query: source.clone(),
            })
            .collect(),
    }
}

#[tokio::test]
async fn test_search_page_maps_tracks_and_forwards_market() {
    let (base, mock) = start_mock().await;
    let client = SpotifyClient::with_base_url(&format!("{}/v1", base), 0).unwrap();

    let page = client
        .search_page(&query(Some("ES")), 50, 0, &AccessToken::new("good"))
        .await
        .unwrap();

    assert_eq!(page.tracks.len(), 50);
    assert!(page.has_more);
    assert_eq!(page.tracks[3].artists, vec!["Artist 3"]);
    let params = mock.last_search.lock().unwrap().clone();
    assert_eq!(params["market"], "ES");
    assert_eq!(params["type"], "track");
}

#[tokio::test]
async fn test_searcher_pages_and_honors_rate_limit() {
    let (base, mock) = start_mock().await;
    mock.rate_limit_next.store(true, Ordering::SeqCst);
    let client = Arc::new(SpotifyClient::with_base_url(&format!("{}/v1", base), 0).unwrap());
    let backoff = BackoffPolicy {
        max_attempts: 3,
        initial_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(5),
        multiplier: 2,
    };
    let searcher = CatalogSearcher::new(client, backoff, 4);

    let tracks = searcher
        .search(Arc::new(query(None)), 100, &AccessToken::new("good"))
        .await;

    assert_eq!(tracks.len(), TOTAL_RESULTS as usize);
    // 429, then pages at offset 0 and 50
    assert_eq!(mock.search_calls.load(Ordering::SeqCst), 3);
    assert!(!mock.last_search.lock().unwrap().contains_key("market"));
}

#[tokio::test]
async fn test_search_unauthorized_token() {
    let (base, _mock) = start_mock().await;
    let client = SpotifyClient::with_base_url(&format!("{}/v1", base), 0).unwrap();

    let result = client.search_page(&query(None), 10, 0, &AccessToken::new("bad")).await;

    assert_eq!(result, Err(eldj_synth::catalog::CatalogError::Unauthorized));
}

#[tokio::test]
async fn test_materialize_writes_tracks_in_chunks() {
    let (base, mock) = start_mock().await;
    let client = SpotifyClient::with_base_url(&format!("{}/v1", base), 0).unwrap();

    let playlist = client.materialize(&spec(230), &AccessToken::new("good")).await.unwrap();

    assert_eq!(playlist.id, "pl9");
    assert_eq!(playlist.url, "https://open.spotify.com/playlist/pl9");
    assert_eq!(playlist.name, "Test Vibes");
    assert_eq!(playlist.track_count, 230);
    assert_eq!(playlist.sample_tracks[0], "Song 0 by Artist");
    assert_eq!(*mock.track_batches.lock().unwrap(), vec![100, 100, 30]);
}

#[tokio::test]
async fn test_materialize_with_rejected_token() {
    let (base, mock) = start_mock().await;
    let client = SpotifyClient::with_base_url(&format!("{}/v1", base), 0).unwrap();

    let result = client.materialize(&spec(3), &AccessToken::new("bad")).await;

    assert!(matches!(result, Err(MaterializeError::Unauthorized)));
    assert!(mock.track_batches.lock().unwrap().is_empty());
}

fn oauth(base: &str) -> SpotifyOAuth {
    let credentials = SpotifyCredentials {
        client_id: "0123456789abcdef0123456789abcdef".to_string(),
        client_secret: "fedcba9876543210fedcba9876543210".to_string(),
        redirect_uri: "http://127.0.0.1:5000/api/spotify-callback".to_string(),
    };
    let api = Arc::new(SpotifyClient::with_base_url(&format!("{}/v1", base), 0).unwrap());
    SpotifyOAuth::with_accounts_url(credentials, api, base).unwrap()
}

#[tokio::test]
async fn test_oauth_sign_in_then_refresh() {
    let (base, mock) = start_mock().await;
    let oauth = oauth(&base);

    let user = oauth
        .authenticate("http://127.0.0.1:5000/api/spotify-callback?code=good-code")
        .await
        .unwrap();
    assert_eq!(user, "Listener");
    assert!(oauth.is_authenticated().await);

    let token = oauth.access_token().await.unwrap();
    assert_eq!(token.secret(), "tok2");
    assert_eq!(oauth.access_token().await.unwrap().secret(), "tok2");
    assert_eq!(
        *mock.token_grants.lock().unwrap(),
        vec!["authorization_code".to_string(), "refresh_token".to_string()]
    );
}

#[tokio::test]
async fn test_oauth_sign_out_forgets_session() {
    let (base, _mock) = start_mock().await;
    let oauth = oauth(&base);

    oauth
        .authenticate("http://127.0.0.1:5000/api/spotify-callback?code=good-code")
        .await
        .unwrap();
    assert!(oauth.is_authenticated().await);

    oauth.sign_out().await;

    assert!(!oauth.is_authenticated().await);
    assert_eq!(oauth.access_token().await.unwrap_err(), AuthError::NotAuthenticated);
}

#[tokio::test]
async fn test_oauth_bad_code_leaves_session_empty() {
    let (base, _mock) = start_mock().await;
    let oauth = oauth(&base);

    let err = oauth
        .authenticate("http://127.0.0.1:5000/api/spotify-callback?code=wrong")
        .await
        .unwrap_err();

    assert!(err.to_string().contains("Invalid authorization code"));
    assert!(!oauth.is_authenticated().await);
}
