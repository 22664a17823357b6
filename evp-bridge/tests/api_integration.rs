//! Integration tests for the evp-bridge HTTP API
//!
//! Drives the router with `tower::ServiceExt::oneshot`; no socket is bound.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::StatusCode;
use evp_bridge::api::{create_router, AppContext};
use evp_bridge::assets::BundleAssetResolver;
use evp_bridge::engine::SimulatedEngine;
use evp_bridge::surface::LocalSurfaceAllocator;
use evp_bridge::CommandDispatcher;
use http::{Method, Request};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

/// Test helper to create a router over a fresh dispatcher
fn setup_test_server() -> (axum::Router, Arc<CommandDispatcher>, SimulatedEngine) {
    let engine = SimulatedEngine::default();
    let dispatcher = Arc::new(CommandDispatcher::new(
        Arc::new(LocalSurfaceAllocator::new()),
        Arc::new(engine.clone()),
        Arc::new(BundleAssetResolver::default()),
    ));

    let router = create_router(AppContext {
        dispatcher: Arc::clone(&dispatcher),
        port: 5740,
    });
    (router, dispatcher, engine)
}

/// Helper function to make HTTP requests to the test server
async fn make_request(
    app: &axum::Router,
    method: Method,
    path: &str,
    body: Option<Value>,
) -> (StatusCode, Option<Value>) {
    let request = Request::builder().method(method).uri(path);
    let request = match body {
        Some(json_body) => request
            .header("content-type", "application/json")
            .body(Body::from(json_body.to_string()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = serde_json::from_slice(&bytes).ok();

    (status, value)
}

async fn create_asset(app: &axum::Router, asset: &str) -> i64 {
    let (status, body) = make_request(
        app,
        Method::POST,
        "/api/v1/player/create",
        Some(json!({ "asset": asset })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body.unwrap()["textureId"].as_i64().unwrap()
}

#[tokio::test]
async fn test_health_endpoint() {
    let (app, _, _) = setup_test_server();

    let (status, body) = make_request(&app, Method::GET, "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    let body = body.unwrap();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["module"], "evp-bridge");
    assert_eq!(body["sessions"], 0);
}

#[tokio::test]
async fn test_create_and_snapshot() {
    let (app, _, _) = setup_test_server();
    let id = create_asset(&app, "videos/intro.mp4").await;

    let (status, body) =
        make_request(&app, Method::GET, &format!("/api/v1/player/{}", id), None).await;

    assert_eq!(status, StatusCode::OK);
    let body = body.unwrap();
    assert_eq!(body["textureId"], id);
    assert_eq!(body["volume"], 1.0);
    assert_eq!(body["isLooping"], false);
}

#[tokio::test]
async fn test_create_with_both_sources_is_bad_request() {
    let (app, dispatcher, _) = setup_test_server();

    let (status, body) = make_request(
        &app,
        Method::POST,
        "/api/v1/player/create",
        Some(json!({ "asset": "a.mp4", "uri": "https://example.com/a.mp4" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.unwrap()["status"]
        .as_str()
        .unwrap()
        .starts_with("Invalid argument"));
    assert_eq!(dispatcher.session_count(), 0);
}

#[tokio::test]
async fn test_playback_commands() {
    let (app, dispatcher, engine) = setup_test_server();
    let id = create_asset(&app, "a.mp4").await;

    // Let the session process its readiness notifications
    tokio::time::sleep(Duration::from_millis(20)).await;

    let (status, _) = make_request(
        &app,
        Method::POST,
        "/api/v1/player/play",
        Some(json!({ "textureId": id })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    engine.advance(Duration::from_millis(1_500));

    let (status, body) = make_request(
        &app,
        Method::POST,
        "/api/v1/player/position",
        Some(json!({ "textureId": id })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.unwrap()["position"], 1_500);

    let (status, _) = make_request(
        &app,
        Method::POST,
        "/api/v1/player/seekTo",
        Some(json!({ "textureId": id, "position": 500 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = make_request(
        &app,
        Method::POST,
        "/api/v1/player/setLooping",
        Some(json!({ "textureId": id, "isLooping": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = make_request(
        &app,
        Method::POST,
        "/api/v1/player/pause",
        Some(json!({ "textureId": id })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let snapshot = dispatcher.snapshot(evp_common::Handle(id)).unwrap();
    assert_eq!(snapshot.position, 500);
    assert!(snapshot.is_looping);
    assert_eq!(snapshot.status, evp_common::PlaybackStatus::Paused);
}

#[tokio::test]
async fn test_volume_and_speed_validation() {
    let (app, _, engine) = setup_test_server();
    let id = create_asset(&app, "a.mp4").await;

    let (status, _) = make_request(
        &app,
        Method::POST,
        "/api/v1/player/setVolume",
        Some(json!({ "textureId": id, "volume": 3.5 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(engine.volume_of(evp_common::Handle(id)), Some(1.0));

    let (status, _) = make_request(
        &app,
        Method::POST,
        "/api/v1/player/setPlaybackSpeed",
        Some(json!({ "textureId": id, "speed": 0.0 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = make_request(
        &app,
        Method::POST,
        "/api/v1/player/setPlaybackSpeed",
        Some(json!({ "textureId": id, "speed": 1.5 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(engine.speed_of(evp_common::Handle(id)), Some(1.5));
}

#[tokio::test]
async fn test_unknown_handle() {
    let (app, _, _) = setup_test_server();

    let (status, _) = make_request(
        &app,
        Method::POST,
        "/api/v1/player/play",
        Some(json!({ "textureId": 4242 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = make_request(
        &app,
        Method::POST,
        "/api/v1/player/position",
        Some(json!({ "textureId": 4242 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.unwrap()["position"], 0);

    let (status, _) = make_request(&app, Method::GET, "/api/v1/player/4242", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = make_request(&app, Method::GET, "/api/v1/events/4242", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_dispose_then_snapshot_is_not_found() {
    let (app, dispatcher, _) = setup_test_server();
    let id = create_asset(&app, "a.mp4").await;

    for _ in 0..2 {
        let (status, _) = make_request(
            &app,
            Method::POST,
            "/api/v1/player/dispose",
            Some(json!({ "textureId": id })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, _) =
        make_request(&app, Method::GET, &format!("/api/v1/player/{}", id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(dispatcher.session_count(), 0);
}

#[tokio::test]
async fn test_mix_with_others() {
    let (app, dispatcher, _) = setup_test_server();

    let (status, _) = make_request(
        &app,
        Method::POST,
        "/api/v1/player/setMixWithOthers",
        Some(json!({ "mixWithOthers": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(dispatcher.global_options().snapshot().mix_with_others);

    let id = create_asset(&app, "a.mp4").await;
    let (_, body) =
        make_request(&app, Method::GET, &format!("/api/v1/player/{}", id), None).await;
    assert_eq!(body.unwrap()["mixWithOthers"], true);
}

#[tokio::test]
async fn test_event_stream_delivers_and_ends_on_dispose() {
    let (app, dispatcher, _) = setup_test_server();
    let id = create_asset(&app, "a.mp4").await;

    let request = Request::builder()
        .method(Method::GET)
        .uri(format!("/api/v1/events/{}", id))
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["content-type"],
        "text/event-stream"
    );

    let mut body = response.into_body();
    let mut received = String::new();
    while !received.contains("event: bufferingEnd") {
        let frame = tokio::time::timeout(Duration::from_secs(2), body.frame())
            .await
            .expect("timed out waiting for SSE frame")
            .expect("stream ended early")
            .unwrap();
        if let Ok(data) = frame.into_data() {
            received.push_str(&String::from_utf8_lossy(&data));
        }
    }

    assert!(received.contains("event: initialized"));
    assert!(received.contains(r#""duration":10000"#));

    dispatcher.dispose(evp_common::messages::TextureMessage {
        texture_id: evp_common::Handle(id),
    });

    let end = tokio::time::timeout(Duration::from_secs(2), body.frame())
        .await
        .expect("stream did not end after dispose");
    assert!(end.is_none());
}
