//! HTTP API integration tests
//!
//! Router driven with `oneshot`; pipeline collaborators are mocks.

mod helpers;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use eldj_synth::build_router;
use helpers::*;

fn signed_in_harness(answer: &str) -> Harness {
    harness(
        ScriptedModel::answering(answer),
        FakeCatalog::new(20),
        RecordingMaterializer::new(),
        StaticCredentials::signed_in(),
    )
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health_reports_module_and_auth() {
    let h = signed_in_harness(ENERGETIC_ANSWER);
    let app = build_router(app_state(&h));

    let response = app.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["module"], "eldj-synth");
    assert_eq!(json["spotify_authenticated"], true);
    assert!(json.get("last_error").is_none());
}

#[tokio::test]
async fn test_auth_url_contains_client_and_redirect() {
    let h = signed_in_harness(ENERGETIC_ANSWER);
    let app = build_router(app_state(&h));

    let response = app.oneshot(get("/api/auth-url")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    let auth_url = json["auth_url"].as_str().unwrap();
    assert!(auth_url.contains("client_id=0123456789abcdef0123456789abcdef"));
    assert!(auth_url.contains("response_type=code"));
    assert_eq!(json["redirect_uri"], "http://127.0.0.1:5000/api/spotify-callback");
}

#[tokio::test]
async fn test_auth_status_reflects_credentials() {
    let h = harness(
        ScriptedModel::answering(ENERGETIC_ANSWER),
        FakeCatalog::new(20),
        RecordingMaterializer::new(),
        StaticCredentials::signed_out(),
    );
    let app = build_router(app_state(&h));

    let response = app.oneshot(get("/api/auth-status")).await.unwrap();
    assert_eq!(body_json(response).await, json!({ "authenticated": false }));
}

#[tokio::test]
async fn test_authenticate_rejects_callback_without_code() {
    let h = signed_in_harness(ENERGETIC_ANSWER);
    let app = build_router(app_state(&h));

    let response = app
        .oneshot(post_json(
            "/api/authenticate",
            json!({ "callback_url": "http://127.0.0.1:5000/api/spotify-callback?error=access_denied" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "AUTH_FAILED");
    assert_eq!(json["auth_needed"], true);
}

#[tokio::test]
async fn test_mood_playlist_success_shape() {
    let h = signed_in_harness(ENERGETIC_ANSWER);
    let app = build_router(app_state(&h));

    let response = app
        .oneshot(post_json(
            "/api/mood-playlist",
            json!({ "mood_text": "energetic and ready to conquer the world", "language": "English" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["playlist"]["track_count"], 25);
    assert_eq!(json["playlist"]["requested_count"], 25);
    assert_eq!(json["playlist"]["short"], false);
    assert_eq!(json["playlist"]["sample_tracks"].as_array().unwrap().len(), 5);
    assert_eq!(json["mood_analysis"]["emotion"], "energetic");
    assert_eq!(json["mood_analysis"]["energy_level"], 8);
    assert_eq!(json["mood_analysis"]["analysis_source"], "model");
}

#[tokio::test]
async fn test_custom_playlist_clamps_num_songs() {
    let h = signed_in_harness(COZY_ANSWER);
    let app = build_router(app_state(&h));

    let response = app
        .oneshot(post_json(
            "/api/custom-playlist",
            json!({ "user_prompt": "Cozy coffee shop atmosphere", "num_songs": 500 }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["playlist"]["requested_count"], 50);
    assert_eq!(json["playlist_concept"]["playlist_name"], "Coffee Shop Corner");
    assert!(json["playlist_concept"]["genres"]
        .as_array()
        .unwrap()
        .iter()
        .any(|g| g.as_str().unwrap().contains("acoustic")));
}

#[tokio::test]
async fn test_short_custom_prompt_is_input_error() {
    let h = signed_in_harness(COZY_ANSWER);
    let app = build_router(app_state(&h));

    let response = app
        .oneshot(post_json("/api/custom-playlist", json!({ "user_prompt": "abc", "num_songs": 20 })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "INPUT_ERROR");
    assert_eq!(json["action"], "rephrase");
    assert!(json.get("auth_needed").is_none());
    assert_eq!(h.model.calls(), 0);
}

#[tokio::test]
async fn test_expired_credential_sets_auth_needed() {
    let h = harness(
        ScriptedModel::answering(ENERGETIC_ANSWER),
        FakeCatalog::new(20),
        RecordingMaterializer::new(),
        StaticCredentials::valid_for(1),
    );
    let state = app_state(&h);
    let app = build_router(state.clone());

    let response = app
        .oneshot(post_json("/api/mood-playlist", json!({ "mood_text": "pumped up" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = body_json(response).await;
    assert_eq!(json["auth_needed"], true);
    assert_eq!(json["code"], "AUTH_REQUIRED");
    assert_eq!(h.materializer.calls(), 0);
    assert!(state.last_error.read().await.as_deref().unwrap().starts_with("AUTH_REQUIRED"));
}

#[tokio::test]
async fn test_malformed_body_is_bad_request() {
    let h = signed_in_harness(ENERGETIC_ANSWER);
    let app = build_router(app_state(&h));

    let request = Request::builder()
        .method("POST")
        .uri("/api/mood-playlist")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"mood_text\": "))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "BAD_REQUEST");
    assert_eq!(h.model.calls(), 0);
}

#[tokio::test]
async fn test_missing_mood_text_is_input_error() {
    let h = signed_in_harness(ENERGETIC_ANSWER);
    let app = build_router(app_state(&h));

    let response = app
        .oneshot(post_json("/api/mood-playlist", json!({ "language": "English" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "INPUT_ERROR");
}

#[tokio::test]
async fn test_callback_page_reports_denied_sign_in() {
    let h = signed_in_harness(ENERGETIC_ANSWER);
    let app = build_router(app_state(&h));

    let response = app
        .oneshot(get("/api/spotify-callback?error=access_denied"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let page = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(page.contains("sign-in failed"));
    assert!(page.contains("access_denied"));
}

#[tokio::test]
async fn test_request_deadline_is_gateway_timeout() {
    let h = harness_with(
        one_second_deadline(),
        ScriptedModel::slow(ENERGETIC_ANSWER, std::time::Duration::from_secs(3)),
        FakeCatalog::new(20),
        RecordingMaterializer::new(),
        StaticCredentials::signed_in(),
    );
    let app = build_router(app_state(&h));

    let response = app
        .oneshot(post_json(
            "/api/mood-playlist",
            json!({ "mood_text": "energetic and ready to conquer the world" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
    let json = body_json(response).await;
    assert_eq!(json["code"], "TIMEOUT");
    assert_eq!(json["action"], "retry_later");
    assert_eq!(h.materializer.calls(), 0);
}

#[tokio::test]
async fn test_custom_playlist_accepts_textual_num_songs() {
    for num_songs in [json!("20"), json!(20.0)] {
        let h = signed_in_harness(COZY_ANSWER);
        let app = build_router(app_state(&h));

        let response = app
            .oneshot(post_json(
                "/api/custom-playlist",
                json!({ "user_prompt": "Cozy coffee shop atmosphere", "num_songs": num_songs }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["playlist"]["requested_count"], 20);
    }
}

#[tokio::test]
async fn test_sign_out_route() {
    let h = signed_in_harness(ENERGETIC_ANSWER);
    let app = build_router(app_state(&h));

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/sign-out")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["success"], true);
}
