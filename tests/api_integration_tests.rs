//! Integration Tests for API Endpoints
//!
//! Tests full request/response cycle for each message and endpoint.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use reader_cache::{
    api::create_router,
    storage::{MemoryBlobCache, MemoryKvStore},
    AppState, Config,
};
use serde_json::{json, Value};
use tower::ServiceExt;

// == Helper Functions ==

fn create_test_app(config: &Config) -> Router {
    let state = AppState::from_config(
        config,
        Arc::new(MemoryKvStore::new()),
        Arc::new(MemoryBlobCache::new()),
    );
    create_router(state)
}

fn small_config() -> Config {
    Config {
        budget_bytes: 100,
        chunk_size: 4,
        chunk_threshold: 20,
        ..Config::default()
    }
}

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn send_message(app: &Router, message: Value) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/message")
                .header("content-type", "application/json")
                .body(Body::from(message.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    (status, body_to_json(response.into_body()).await)
}

async fn send(app: &Router, method: &str, uri: &str) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    (status, body_to_json(response.into_body()).await)
}

// == cacheResource / getCachedResource ==

#[tokio::test]
async fn test_cache_then_get_resource() {
    let app = create_test_app(&small_config());

    let (status, json) = send_message(
        &app,
        json!({"action": "cacheResource", "url": "https://x/ch1.xhtml", "data": "aGVsbG8="}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, json!({"success": true}));

    let (status, json) = send_message(
        &app,
        json!({"action": "getCachedResource", "url": "https://x/ch1.xhtml"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    assert_eq!(json["data"], "aGVsbG8=");
}

#[tokio::test]
async fn test_get_resource_not_cached() {
    let app = create_test_app(&small_config());

    let (status, json) = send_message(
        &app,
        json!({"action": "getCachedResource", "url": "https://x/missing.css"}),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["success"], false);
    assert!(json["error"].as_str().unwrap().contains("missing.css"));
}

#[tokio::test]
async fn test_get_unknown_key_creates_no_record() {
    let app = create_test_app(&small_config());

    send_message(
        &app,
        json!({"action": "getCachedResource", "url": "https://x/ghost"}),
    )
    .await;

    let (_, usage) = send(&app, "GET", "/usage").await;
    assert_eq!(usage["resource_count"], 0);
    assert_eq!(usage["stats"]["misses"], 1);
}

#[tokio::test]
async fn test_rewrite_replaces_size() {
    let app = create_test_app(&small_config());

    // 8 bytes, then 3 bytes under the same url
    send_message(
        &app,
        json!({"action": "cacheResource", "url": "u", "data": "AAAAAAAAAAA="}),
    )
    .await;
    send_message(&app, json!({"action": "cacheResource", "url": "u", "data": "AQID"})).await;

    let (_, usage) = send(&app, "GET", "/usage").await;
    assert_eq!(usage["total_bytes"], 3);
    assert_eq!(usage["resources"]["u"]["size"], 3);
}

#[tokio::test]
async fn test_remove_resource() {
    let app = create_test_app(&small_config());

    send_message(&app, json!({"action": "cacheResource", "url": "u", "data": "AQID"})).await;
    let (status, _) = send_message(&app, json!({"action": "removeResource", "url": "u"})).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send_message(&app, json!({"action": "getCachedResource", "url": "u"})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, usage) = send(&app, "GET", "/usage").await;
    assert_eq!(usage["total_bytes"], 0);
}

// == processEpub ==

#[tokio::test]
async fn test_process_small_and_large_buffers() {
    let app = create_test_app(&small_config());

    // 3 bytes, under the 20 byte threshold
    let (status, json) = send_message(&app, json!({"action": "processEpub", "data": "AQID"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"], "AQID");

    // 30 bytes, chunked in 4 byte pieces
    let large = "QUJDREVGR0hJSktMTU5PUFFSU1RVVldYWVphYmNk";
    let (status, json) = send_message(&app, json!({"action": "processEpub", "data": large})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"], large);
}

// == Validation ==

#[tokio::test]
async fn test_empty_url_request() {
    let app = create_test_app(&small_config());

    let (status, json) = send_message(
        &app,
        json!({"action": "cacheResource", "url": "", "data": "AQID"}),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["success"], false);
}

#[tokio::test]
async fn test_invalid_json_request() {
    let app = create_test_app(&small_config());

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/message")
                .header("content-type", "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert!(response.status().is_client_error());
}

// == Eviction Endpoints ==

#[tokio::test]
async fn test_evict_endpoint_brings_usage_under_budget() {
    let app = create_test_app(&small_config());

    // Three 40 byte resources, total 120 over a 100 byte budget
    let payload = base64_of_len(40);
    for url in ["a", "b", "c"] {
        send_message(
            &app,
            json!({"action": "cacheResource", "url": url, "data": payload}),
        )
        .await;
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }

    let (status, plan) = send(&app, "POST", "/evict?dry_run=true").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(plan["planned"][0]["key"], "a");

    let (status, json) = send(&app, "POST", "/evict").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["report"]["evicted"], json!(["a"]));
    assert_eq!(json["report"]["bytes_after"], 80);

    let (status, _) = send_message(&app, json!({"action": "getCachedResource", "url": "a"})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send_message(&app, json!({"action": "getCachedResource", "url": "b"})).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_reconcile_endpoint_on_consistent_cache() {
    let app = create_test_app(&small_config());

    send_message(&app, json!({"action": "cacheResource", "url": "u", "data": "AQID"})).await;

    let (status, json) = send(&app, "POST", "/reconcile").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["removed_records"], json!([]));
    assert_eq!(json["removed_blobs"], json!([]));
}

// == Health ==

#[tokio::test]
async fn test_health_endpoint() {
    let app = create_test_app(&small_config());

    let (status, json) = send(&app, "GET", "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"].as_str().unwrap(), "healthy");
    assert!(json.get("timestamp").is_some());
}

fn base64_of_len(len: usize) -> String {
    use base64::Engine;
    base64::engine::general_purpose::STANDARD.encode(vec![0u8; len])
}
