//! Common test utilities.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::extract::connect_info::MockConnectInfo;
use axum::http::Request;
use axum::response::Response;
use http_body_util::BodyExt;
use tokio::sync::Mutex;
use tower::ServiceExt;

use chatrelay::background::BackgroundTasks;
use chatrelay::broadcast::EventBroadcaster;
use chatrelay::chat::ChatService;
use chatrelay::config::ChatConfig;
use chatrelay::server::{self, AppState};
use chatrelay::store::MemoryStore;

/// Create a test `AppState` with sensible defaults.
pub fn test_app_state() -> AppState {
    let chat = ChatService::new(
        Arc::new(MemoryStore::new()),
        EventBroadcaster::new(),
        ChatConfig::default(),
    );
    let (shutdown_tx, _shutdown_rx) = server::shutdown_channel();

    AppState {
        chat,
        admin_token: None,
        keep_alive_interval_seconds: 30,
        max_connections: 64,
        background_tasks: BackgroundTasks::new(),
        shutdown_tx: Arc::new(Mutex::new(Some(shutdown_tx))),
    }
}

/// Build the router for a state, with mocked connection info so the
/// loopback-only auth fallback accepts requests in `oneshot` tests.
pub fn test_app(state: AppState) -> Router {
    server::build_app(state, 30).layer(MockConnectInfo(SocketAddr::from(([127, 0, 0, 1], 40000))))
}

#[allow(dead_code)]
pub async fn get(app: &Router, uri: &str) -> Response {
    app.clone()
        .oneshot(Request::get(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

#[allow(dead_code)]
pub async fn post_json(app: &Router, uri: &str, body: serde_json::Value) -> Response {
    app.clone()
        .oneshot(
            Request::post(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap()
}

#[allow(dead_code)]
pub async fn delete(app: &Router, uri: &str) -> Response {
    app.clone()
        .oneshot(Request::delete(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

#[allow(dead_code)]
pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
