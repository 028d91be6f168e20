//! Visitor-facing HTTP handlers.
//!
//! No authentication: possession of the opaque session token is the
//! capability. Responses never expose internal session IDs.

use std::net::SocketAddr;
use std::time::Duration;

use axum::Json;
use axum::extract::{ConnectInfo, Query, State};
use axum::http::StatusCode;
use axum::response::sse::Sse;
use axum::response::{IntoResponse, Response};
use tracing::debug;

use crate::api::{ContactRequest, VisitorMessageRequest, VisitorMessageResponse, VisitorStreamQuery};
use crate::handlers::problem_details;
use crate::server::AppState;

use super::error_response;
use super::streams::EventStream;

/// POST /api/v1/chat/messages
///
/// Visitor message ingress. Creates the visitor and session on first
/// contact; reopens an abandoned session. Persistence only — the assistant
/// reply is produced by an external pipeline.
pub async fn send_visitor_message(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(req): Json<VisitorMessageRequest>,
) -> Response {
    if req.session_token.is_empty() {
        return problem_details::bad_request("session_token is required").into_response();
    }

    match state
        .chat
        .record_visitor_message(
            &req.session_token,
            &req.content,
            req.current_page,
            req.locale,
            Some(addr.ip().to_string()),
        )
        .await
    {
        Ok((_, message)) => (
            StatusCode::CREATED,
            Json(VisitorMessageResponse {
                message_id: message.id,
                created_at: message.created_at.to_rfc3339(),
            }),
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}

/// POST /api/v1/chat/visitor/contact
pub async fn collect_contact(
    State(state): State<AppState>,
    Json(req): Json<ContactRequest>,
) -> Response {
    if req.name.trim().is_empty() {
        return problem_details::bad_request("name is required").into_response();
    }

    match state
        .chat
        .collect_contact(&req.session_token, &req.name, req.email, req.phone)
        .await
    {
        Ok(contact) => (StatusCode::CREATED, Json(contact)).into_response(),
        Err(e) => error_response(e),
    }
}

/// GET /api/v1/chat/visitor/stream
///
/// Visitor event feed, subscribed to the session-token channel. Only
/// visitor-visible event kinds pass through; session-management events
/// stay on the admin side.
pub async fn visitor_stream(
    State(state): State<AppState>,
    Query(query): Query<VisitorStreamQuery>,
) -> Response {
    let Some(token) = query.session_token.filter(|t| !t.is_empty()) else {
        return problem_details::bad_request("session_token query parameter is required")
            .into_response();
    };

    let subscription = state.chat.broadcaster().subscribe(&token);
    debug!(channel = %token, "Visitor stream opened");

    Sse::new(EventStream::new(
        subscription,
        Duration::from_secs(state.keep_alive_interval_seconds),
        true,
    ))
    .into_response()
}
