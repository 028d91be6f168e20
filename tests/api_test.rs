//! Integration tests for the HTTP API.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::json;
use tower::ServiceExt;

mod common;

use common::{body_json, delete, get, post_json, test_app, test_app_state};

// ============================================================================
// Health Endpoints
// ============================================================================

#[tokio::test]
async fn test_livez() {
    let app = test_app(test_app_state());

    let response = get(&app, "/livez").await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&body[..], b"ok");
}

#[tokio::test]
async fn test_readyz() {
    let app = test_app(test_app_state());

    let response = get(&app, "/readyz").await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn test_version() {
    let app = test_app(test_app_state());

    let response = get(&app, "/version").await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert!(json.get("version").is_some());
}

// ============================================================================
// Admin Auth
// ============================================================================

#[tokio::test]
async fn admin_routes_require_bearer_when_token_configured() {
    let mut state = test_app_state();
    state.admin_token = Some("secret".to_string());
    let app = test_app(state);

    let response = get(&app, "/api/v1/chat/sessions").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .clone()
        .oneshot(
            Request::get("/api/v1/chat/sessions")
                .header("authorization", "Bearer secret")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn visitor_routes_skip_admin_auth() {
    let mut state = test_app_state();
    state.admin_token = Some("secret".to_string());
    let app = test_app(state);

    let response = post_json(
        &app,
        "/api/v1/chat/messages",
        json!({"session_token": "tok-1", "content": "hi"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
}

// ============================================================================
// Visitor Ingress
// ============================================================================

#[tokio::test]
async fn visitor_message_creates_session_and_hides_internal_id() {
    let app = test_app(test_app_state());

    let response = post_json(
        &app,
        "/api/v1/chat/messages",
        json!({"session_token": "tok-1", "content": "hello", "current_page": "/pricing"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let json = body_json(response).await;
    assert!(json["message_id"].as_str().unwrap().starts_with("msg_"));
    assert!(json.get("session_id").is_none());

    // Session is visible on the admin side
    let json = body_json(get(&app, "/api/v1/chat/sessions").await).await;
    let sessions = json["sessions"].as_array().unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0]["session_token"], "tok-1");
    assert_eq!(sessions[0]["status"], "active");
    assert_eq!(sessions[0]["current_page"], "/pricing");
}

#[tokio::test]
async fn visitor_message_validation() {
    let app = test_app(test_app_state());

    let response = post_json(
        &app,
        "/api/v1/chat/messages",
        json!({"session_token": "tok-1", "content": ""}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "application/problem+json"
    );

    let over_limit = "x".repeat(5001);
    let response = post_json(
        &app,
        "/api/v1/chat/messages",
        json!({"session_token": "tok-1", "content": over_limit}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = post_json(
        &app,
        "/api/v1/chat/messages",
        json!({"session_token": "", "content": "hi"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Nothing was persisted
    let json = body_json(get(&app, "/api/v1/chat/sessions").await).await;
    assert!(json["sessions"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn visitor_contact_collection() {
    let app = test_app(test_app_state());
    post_json(
        &app,
        "/api/v1/chat/messages",
        json!({"session_token": "tok-1", "content": "hi"}),
    )
    .await;

    let response = post_json(
        &app,
        "/api/v1/chat/visitor/contact",
        json!({"session_token": "tok-1", "name": "Ada", "email": "ada@example.com"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json["name"], "Ada");

    // Unknown token is a 404
    let response = post_json(
        &app,
        "/api/v1/chat/visitor/contact",
        json!({"session_token": "tok-unknown", "name": "Ada"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ============================================================================
// Admin Session API
// ============================================================================

async fn seed_session(app: &axum::Router, token: &str) -> String {
    let response = post_json(
        app,
        "/api/v1/chat/messages",
        json!({"session_token": token, "content": "hi"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let json = body_json(get(app, "/api/v1/chat/sessions").await).await;
    json["sessions"]
        .as_array()
        .unwrap()
        .iter()
        .find(|s| s["session_token"] == token)
        .unwrap()["id"]
        .as_str()
        .unwrap()
        .to_string()
}

#[tokio::test]
async fn get_session_and_messages() {
    let app = test_app(test_app_state());
    let session_id = seed_session(&app, "tok-1").await;

    let json = body_json(get(&app, &format!("/api/v1/chat/sessions/{session_id}")).await).await;
    assert_eq!(json["id"], session_id.as_str());

    let json = body_json(
        get(&app, &format!("/api/v1/chat/sessions/{session_id}/messages")).await,
    )
    .await;
    let messages = json["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0]["role"], "user");

    let response = get(&app, "/api/v1/chat/sessions/chs_missing").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn admin_message_requires_takeover_then_succeeds() {
    let app = test_app(test_app_state());
    let session_id = seed_session(&app, "tok-1").await;

    // Precondition unmet: 400
    let response = post_json(
        &app,
        &format!("/api/v1/chat/sessions/{session_id}/messages"),
        json!({"content": "hello"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = post_json(
        &app,
        &format!("/api/v1/chat/sessions/{session_id}/takeover"),
        json!({}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(
            Request::post(format!("/api/v1/chat/sessions/{session_id}/messages"))
                .header("content-type", "application/json")
                .header("x-admin-id", "ops-7")
                .body(Body::from(json!({"content": "hello"}).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json["role"], "admin");
    assert_eq!(json["metadata"]["admin_id"], "ops-7");
}

#[tokio::test]
async fn release_without_takeover_conflicts() {
    let app = test_app(test_app_state());
    let session_id = seed_session(&app, "tok-1").await;

    let response = delete(&app, &format!("/api/v1/chat/sessions/{session_id}/takeover")).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn end_session_is_terminal() {
    let app = test_app(test_app_state());
    let session_id = seed_session(&app, "tok-1").await;

    let response = delete(&app, &format!("/api/v1/chat/sessions/{session_id}")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "ended");
    assert!(json.get("ended_at").is_some());

    // Further visitor messages are rejected
    let response = post_json(
        &app,
        "/api/v1/chat/messages",
        json!({"session_token": "tok-1", "content": "anyone?"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    // Ended sessions drop out of the active listing
    let json = body_json(get(&app, "/api/v1/chat/sessions?active=true").await).await;
    assert!(json["sessions"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn list_sessions_pagination_and_status_filter() {
    let app = test_app(test_app_state());
    for token in ["tok-1", "tok-2", "tok-3"] {
        seed_session(&app, token).await;
    }

    let json = body_json(get(&app, "/api/v1/chat/sessions?limit=2").await).await;
    assert_eq!(json["sessions"].as_array().unwrap().len(), 2);

    let json = body_json(get(&app, "/api/v1/chat/sessions?limit=2&offset=2").await).await;
    assert_eq!(json["sessions"].as_array().unwrap().len(), 1);

    let json = body_json(get(&app, "/api/v1/chat/sessions?status=ended").await).await;
    assert!(json["sessions"].as_array().unwrap().is_empty());
}

// ============================================================================
// Audit Trail
// ============================================================================

#[tokio::test]
async fn admin_actions_are_audit_logged() {
    let app = test_app(test_app_state());
    let session_id = seed_session(&app, "tok-1").await;

    post_json(
        &app,
        &format!("/api/v1/chat/sessions/{session_id}/takeover"),
        json!({}),
    )
    .await;
    delete(&app, &format!("/api/v1/chat/sessions/{session_id}/takeover")).await;
    delete(&app, &format!("/api/v1/chat/sessions/{session_id}")).await;

    let entries = body_json(get(&app, "/api/v1/chat/audit").await).await;
    let entries = entries.as_array().unwrap().clone();
    assert_eq!(entries.len(), 3);
    // Newest first
    assert_eq!(entries[0]["action"], "end_session");
    assert_eq!(entries[1]["action"], "release");
    assert_eq!(entries[2]["action"], "takeover");
    for entry in &entries {
        assert_eq!(entry["target"], session_id.as_str());
        assert_eq!(entry["admin_id"], "admin");
        assert_eq!(entry["remote_addr"], "127.0.0.1");
    }
}
