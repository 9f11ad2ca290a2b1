//! Gateway integration tests.
//!
//! These tests drive the HTTP surface end-to-end using axum's test utilities.

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use location_relay::api::{create_router, create_router_with_state, AppState};
use location_relay::security::ApiKeyStore;
use serde_json::{json, Value};
use tower::ServiceExt;

/// Helper to create a JSON request.
fn json_request(method: Method, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");

    match body {
        Some(json) => builder.body(Body::from(json.to_string())).unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// Helper to extract body as string.
async fn response_text(response: axum::response::Response) -> String {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8_lossy(&body).to_string()
}

/// Helper to extract JSON from response.
async fn response_json(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap_or(Value::Null)
}

/// Send one request through a clone of the router.
async fn call(app: &Router, request: Request<Body>) -> axum::response::Response {
    app.clone().oneshot(request).await.unwrap()
}

/// Router with Alice (100) and Bob (200) registered.
async fn app_with_peers() -> Router {
    let app = create_router();
    for (id, name) in [(100, "Alice"), (200, "Bob")] {
        let response = call(
            &app,
            json_request(
                Method::POST,
                "/api/v1/peers",
                Some(json!({ "id": id, "name": name })),
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }
    app
}

async fn start_share(app: &Router, sender: i64, receiver: &str) -> Value {
    let response = call(
        app,
        json_request(
            Method::POST,
            "/api/v1/events",
            Some(json!({ "type": "start_share", "sender": sender, "receiver": receiver })),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    response_json(response).await
}

// ============================================================================
// Health & Info Tests
// ============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let app = create_router();

    let response = app
        .oneshot(json_request(Method::GET, "/health", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response_text(response).await, "OK");
}

#[tokio::test]
async fn test_api_info_endpoint() {
    let app = app_with_peers().await;

    let response = call(&app, json_request(Method::GET, "/api/v1", None)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = response_json(response).await;
    assert_eq!(json["name"], "location-relay");
    assert_eq!(json["status"], "running");
    assert_eq!(json["peers"], 2);
    assert_eq!(json["active_sessions"], 0);
}

// ============================================================================
// Peer Tests
// ============================================================================

#[tokio::test]
async fn test_register_peer_twice_renames() {
    let app = app_with_peers().await;

    let response = call(
        &app,
        json_request(
            Method::POST,
            "/api/v1/peers",
            Some(json!({ "id": 200, "name": "Robert" })),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = response_json(response).await;
    assert_eq!(json["created"], false);
    assert_eq!(json["name"], "Robert");
}

#[tokio::test]
async fn test_register_peer_blank_name() {
    let app = create_router();

    let response = call(
        &app,
        json_request(
            Method::POST,
            "/api/v1/peers",
            Some(json!({ "id": 1, "name": "  " })),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(response_json(response).await["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_inbox_unknown_peer() {
    let app = create_router();

    let response = call(&app, json_request(Method::GET, "/api/v1/peers/404/inbox", None)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(response_json(response).await["code"], "PEER_NOT_FOUND");
}

#[tokio::test]
async fn test_block_unknown_peer() {
    let app = create_router();

    let response = call(&app, json_request(Method::DELETE, "/api/v1/peers/404", None)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ============================================================================
// Relay Flow Tests
// ============================================================================

#[tokio::test]
async fn test_share_and_relay_over_http() {
    let app = app_with_peers().await;

    let report = start_share(&app, 100, "200").await;
    assert_eq!(report["outcome"], "OK");
    assert_eq!(report["origin"], 100);
    assert_eq!(report["reply_delivered"], true);

    let response = call(&app, json_request(Method::GET, "/api/v1/sessions", None)).await;
    let json = response_json(response).await;
    assert_eq!(json["count"], 1);
    assert_eq!(json["sessions"][0]["sender"], 100);
    assert_eq!(json["sessions"][0]["receiver"], 200);

    // Bob was told about the incoming share.
    let response = call(&app, json_request(Method::GET, "/api/v1/peers/200/inbox", None)).await;
    let json = response_json(response).await;
    assert_eq!(json["count"], 1);
    assert_eq!(json["deliveries"][0]["payload"]["kind"], "message");

    let response = call(
        &app,
        json_request(
            Method::POST,
            "/api/v1/events",
            Some(json!({ "type": "location", "sender": 100, "latitude": 41.0, "longitude": -8.0 })),
        ),
    )
    .await;
    assert_eq!(response_json(response).await["outcome"], "OK");

    let response = call(&app, json_request(Method::GET, "/api/v1/peers/200/inbox", None)).await;
    let json = response_json(response).await;
    assert_eq!(json["count"], 2);
    assert_eq!(json["deliveries"][0]["payload"]["kind"], "location");
    assert_eq!(json["deliveries"][0]["payload"]["latitude"], 41.0);
    assert_eq!(json["deliveries"][0]["payload"]["longitude"], -8.0);

    // The inbox is drained by reading it.
    let response = call(&app, json_request(Method::GET, "/api/v1/peers/200/inbox", None)).await;
    assert_eq!(response_json(response).await["count"], 0);
}

#[tokio::test]
async fn test_commands_endpoint() {
    let app = app_with_peers().await;

    let response = call(
        &app,
        json_request(
            Method::POST,
            "/api/v1/peers/100/commands",
            Some(json!({ "text": "/share 200" })),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response_json(response).await["outcome"], "OK");

    let response = call(
        &app,
        json_request(
            Method::POST,
            "/api/v1/peers/200/commands",
            Some(json!({ "text": "/stop" })),
        ),
    )
    .await;
    assert_eq!(response_json(response).await["outcome"], "OK");

    let response = call(
        &app,
        json_request(
            Method::POST,
            "/api/v1/peers/100/commands",
            Some(json!({ "text": "/dance" })),
        ),
    )
    .await;
    assert_eq!(response_json(response).await["outcome"], "UNKNOWN_COMMAND");
}

#[tokio::test]
async fn test_location_out_of_range() {
    let app = app_with_peers().await;
    start_share(&app, 100, "200").await;

    let response = call(
        &app,
        json_request(
            Method::POST,
            "/api/v1/events",
            Some(json!({ "type": "location", "sender": 100, "latitude": 91.0, "longitude": 0.0 })),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_blocked_receiver_reports_delivery_failure() {
    let app = app_with_peers().await;
    start_share(&app, 100, "200").await;

    let response = call(&app, json_request(Method::DELETE, "/api/v1/peers/200", None)).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = call(
        &app,
        json_request(
            Method::POST,
            "/api/v1/events",
            Some(json!({ "type": "location", "sender": 100, "latitude": 1.0, "longitude": 2.0 })),
        ),
    )
    .await;
    assert_eq!(response_json(response).await["outcome"], "DELIVERY_FAILED");

    let response = call(&app, json_request(Method::GET, "/api/v1/sessions", None)).await;
    assert_eq!(response_json(response).await["count"], 1);
}

#[tokio::test]
async fn test_unknown_event_type_rejected() {
    let app = create_router();

    let response = call(
        &app,
        json_request(
            Method::POST,
            "/api/v1/events",
            Some(json!({ "type": "teleport", "sender": 1 })),
        ),
    )
    .await;
    assert!(response.status().is_client_error());
}

// ============================================================================
// Authentication Tests
// ============================================================================

fn secured_app() -> Router {
    let state = AppState::new().with_auth(ApiKeyStore::with_keys(["test-key"]));
    create_router_with_state(state)
}

#[tokio::test]
async fn test_auth_rejects_missing_key() {
    let app = secured_app();

    let response = call(&app, json_request(Method::GET, "/api/v1", None)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_auth_rejects_wrong_key() {
    let app = secured_app();

    let request = Request::builder()
        .method(Method::GET)
        .uri("/api/v1/sessions")
        .header(header::AUTHORIZATION, "Bearer wrong-key")
        .body(Body::empty())
        .unwrap();
    let response = call(&app, request).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_auth_accepts_valid_key() {
    let app = secured_app();

    let request = Request::builder()
        .method(Method::GET)
        .uri("/api/v1/sessions")
        .header(header::AUTHORIZATION, "Bearer test-key")
        .body(Body::empty())
        .unwrap();
    let response = call(&app, request).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_health_skips_auth() {
    let app = secured_app();

    let response = call(&app, json_request(Method::GET, "/health", None)).await;
    assert_eq!(response.status(), StatusCode::OK);
}
