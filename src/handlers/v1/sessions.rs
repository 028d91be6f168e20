//! Admin session management HTTP handlers.

use std::net::SocketAddr;

use axum::Json;
use axum::extract::{ConnectInfo, Path as PathExtract, Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};

use crate::api::{
    AuditQuery, GetMessagesResponse, ListSessionsQuery, ListSessionsResponse, SendMessageRequest,
};
use crate::audit::AuditAction;
use crate::handlers::api_auth;
use crate::server::AppState;
use crate::store::SessionQuery;

use super::error_response;

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/v1/chat/sessions
pub async fn list_sessions(
    State(state): State<AppState>,
    Query(query): Query<ListSessionsQuery>,
) -> Response {
    let session_query = SessionQuery {
        active_only: query.active.unwrap_or(false),
        status: query.status,
        limit: query.limit,
        offset: query.offset.unwrap_or(0),
    };

    match state.chat.list_sessions(&session_query).await {
        Ok(sessions) => Json(ListSessionsResponse { sessions }).into_response(),
        Err(e) => error_response(e),
    }
}

/// GET /api/v1/chat/sessions/{session_id}
pub async fn get_session(
    State(state): State<AppState>,
    PathExtract(session_id): PathExtract<String>,
) -> Response {
    match state.chat.get_session(&session_id).await {
        Ok(session) => Json(session).into_response(),
        Err(e) => error_response(e),
    }
}

/// GET /api/v1/chat/sessions/{session_id}/messages
pub async fn get_messages(
    State(state): State<AppState>,
    PathExtract(session_id): PathExtract<String>,
) -> Response {
    match state.chat.list_messages(&session_id).await {
        Ok(messages) => Json(GetMessagesResponse { messages }).into_response(),
        Err(e) => error_response(e),
    }
}

/// POST /api/v1/chat/sessions/{session_id}/messages
pub async fn send_message(
    State(state): State<AppState>,
    PathExtract(session_id): PathExtract<String>,
    headers: HeaderMap,
    Json(req): Json<SendMessageRequest>,
) -> Response {
    let admin_id = api_auth::admin_identity(&headers);

    match state
        .chat
        .send_admin_message(&session_id, &admin_id, &req.content)
        .await
    {
        Ok(message) => (StatusCode::CREATED, Json(message)).into_response(),
        Err(e) => error_response(e),
    }
}

/// POST /api/v1/chat/sessions/{session_id}/takeover
pub async fn take_over(
    State(state): State<AppState>,
    PathExtract(session_id): PathExtract<String>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> Response {
    let admin_id = api_auth::admin_identity(&headers);

    match state.chat.take_over(&session_id, &admin_id).await {
        Ok(session) => {
            state
                .chat
                .record_audit(
                    &admin_id,
                    AuditAction::Takeover,
                    &session.id,
                    Some(addr.ip().to_string()),
                    user_agent(&headers),
                )
                .await;
            Json(session).into_response()
        }
        Err(e) => error_response(e),
    }
}

/// DELETE /api/v1/chat/sessions/{session_id}/takeover
pub async fn release(
    State(state): State<AppState>,
    PathExtract(session_id): PathExtract<String>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> Response {
    let admin_id = api_auth::admin_identity(&headers);

    match state.chat.release(&session_id, &admin_id).await {
        Ok(session) => {
            state
                .chat
                .record_audit(
                    &admin_id,
                    AuditAction::Release,
                    &session.id,
                    Some(addr.ip().to_string()),
                    user_agent(&headers),
                )
                .await;
            Json(session).into_response()
        }
        Err(e) => error_response(e),
    }
}

/// DELETE /api/v1/chat/sessions/{session_id}
pub async fn end_session(
    State(state): State<AppState>,
    PathExtract(session_id): PathExtract<String>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> Response {
    let admin_id = api_auth::admin_identity(&headers);

    match state.chat.end_session(&session_id, &admin_id).await {
        Ok(session) => {
            state
                .chat
                .record_audit(
                    &admin_id,
                    AuditAction::EndSession,
                    &session.id,
                    Some(addr.ip().to_string()),
                    user_agent(&headers),
                )
                .await;
            Json(session).into_response()
        }
        Err(e) => error_response(e),
    }
}

/// GET /api/v1/chat/audit
pub async fn list_audit(
    State(state): State<AppState>,
    Query(query): Query<AuditQuery>,
) -> Response {
    match state.chat.list_audit(query.limit).await {
        Ok(entries) => Json(entries).into_response(),
        Err(e) => error_response(e),
    }
}

// ============================================================================
// Implementation Details
// ============================================================================

fn user_agent(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}
