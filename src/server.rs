use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use tokio::sync::{Mutex, oneshot};
use tower::limit::ConcurrencyLimitLayer;
use tower_http::timeout::TimeoutLayer;

use crate::background::BackgroundTasks;
use crate::chat::ChatService;
use crate::handlers;

// ============================================================================
// Application State
// ============================================================================

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub chat: ChatService,
    pub admin_token: Option<String>,
    pub keep_alive_interval_seconds: u64,
    pub max_connections: usize,
    pub background_tasks: BackgroundTasks,
    pub shutdown_tx: Arc<Mutex<Option<oneshot::Sender<()>>>>,
}

// ============================================================================
// Server Setup
// ============================================================================

/// Create a shutdown channel pair.
///
/// Returns (sender for AppState, receiver for shutdown_signal).
pub fn shutdown_channel() -> (oneshot::Sender<()>, oneshot::Receiver<()>) {
    oneshot::channel()
}

pub fn build_app(state: AppState, request_timeout_seconds: u64) -> Router {
    let max_connections = state.max_connections;
    let timeout = TimeoutLayer::new(Duration::from_secs(request_timeout_seconds));

    // Admin SSE stream - no request timeout (long-lived by design)
    let admin_streaming = Router::new()
        .route("/stream", get(handlers::v1::admin_stream))
        .with_state(state.clone());

    // Admin session management - with request timeout
    let admin_api = Router::new()
        .route("/sessions", get(handlers::v1::list_sessions))
        .route(
            "/sessions/{session_id}",
            get(handlers::v1::get_session).delete(handlers::v1::end_session),
        )
        .route(
            "/sessions/{session_id}/messages",
            get(handlers::v1::get_messages).post(handlers::v1::send_message),
        )
        .route(
            "/sessions/{session_id}/takeover",
            post(handlers::v1::take_over).delete(handlers::v1::release),
        )
        .route("/audit", get(handlers::v1::list_audit))
        .with_state(state.clone())
        .layer(timeout.clone());

    let admin_routes = Router::new()
        .merge(admin_streaming)
        .merge(admin_api)
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            handlers::api_auth::require_admin_token,
        ));

    // Visitor SSE stream - unauthenticated, no timeout
    let visitor_streaming = Router::new()
        .route("/visitor/stream", get(handlers::v1::visitor_stream))
        .with_state(state.clone());

    // Visitor ingress - unauthenticated, with request timeout
    let visitor_api = Router::new()
        .route("/messages", post(handlers::v1::send_visitor_message))
        .route("/visitor/contact", post(handlers::v1::collect_contact))
        .with_state(state.clone())
        .layer(timeout);

    let chat_routes = Router::new()
        .merge(admin_routes)
        .merge(visitor_streaming)
        .merge(visitor_api)
        .layer(DefaultBodyLimit::max(64 * 1024)) // 64 KB
        .layer(ConcurrencyLimitLayer::new(max_connections));

    // Admin server management (shutdown)
    let admin_ops = Router::new()
        .route("/shutdown", post(handlers::shutdown))
        .with_state(state.clone())
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            handlers::api_auth::require_admin_token,
        ));

    Router::new()
        .route("/livez", get(handlers::livez))
        .route("/readyz", get(handlers::readyz))
        .route("/version", get(handlers::version))
        .with_state(state)
        .nest("/api/v1/chat", chat_routes)
        .nest("/api/admin/v1", admin_ops)
}
